//! Estimate sheet template
//!
//! The calculator works the way the estimating spreadsheet does: measurements
//! go into input cells, and formula cells derive areas, paint volume, labor
//! and tier prices from them.
//!
//! | Sheet     | Contents |
//! |-----------|----------|
//! | `ROOM`    | inputs in column B, derived measurements in column D, tier prices in column F |
//! | `RATES`   | pricing constants in column B, lookup tables to the right |
//! | `PROJECT` | one row per room, project totals in column J |
//!
//! Rate cells are reached through names (`DOOR_AREA`, `PAINT_TABLE`, ...), so
//! the formulas read like the spreadsheet they replace.

use crate::config::RateTable;
use crate::error::Result;
use crate::room::RoomInput;
use paintbox_core::{CellAddress, CellKey, CellRange, CellValue, RawValue, SheetName};
use paintbox_formula::{Engine, ResultCache};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

pub const ROOM_SHEET: &str = "ROOM";
pub const RATES_SHEET: &str = "RATES";
pub const PROJECT_SHEET: &str = "PROJECT";

/// Derived cells of the room sheet
const ROOM_FORMULAS: &[(&str, &str)] = &[
    // Inputs usable at all
    ("D1", "=AND(B2>0,B3>0,B4>0,B9>=1)"),
    ("D2", "=IF(D1,2*(B2+B3),NA())"),
    ("D3", "=D2*B4"),
    ("D4", "=B5*DOOR_AREA+B6*WINDOW_AREA"),
    ("D5", "=MAX(0,D3-D4)"),
    ("D6", "=IF(D1,IF(B10,B2*B3,0),NA())"),
    ("D7", "=IF(B11,D2,0)"),
    ("D8", "=D5+D6"),
    ("D9", "=VLOOKUP(B8,PAINT_TABLE,2,FALSE)"),
    ("D10", "=CEILING(D8*B9/D9,1)"),
    ("D11", "=VLOOKUP(B7,CONDITION_TABLE,2,FALSE)"),
    (
        "D12",
        "=ROUND((D8*B9/PRODUCTIVITY+(B5+B6)*OPENING_HOURS+D7/TRIM_SPEED)*D11,2)",
    ),
    ("E2", "good"),
    ("E3", "better"),
    ("E4", "best"),
    (
        "F2",
        "=ROUND(MAX(MIN_CHARGE,(D8*INDEX(TIER_LABOR,1)*D11+D10*VLOOKUP(B8,PAINT_TABLE,3,FALSE)+D8*MATERIAL_RATE+D7*TRIM_RATE+PREP_FEE)*(1+MARKUP)),2)",
    ),
    (
        "F3",
        "=ROUND(MAX(MIN_CHARGE,(D8*INDEX(TIER_LABOR,2)*D11+D10*VLOOKUP(B8,PAINT_TABLE,4,FALSE)+D8*MATERIAL_RATE+D7*TRIM_RATE+PREP_FEE)*(1+MARKUP)),2)",
    ),
    (
        "F4",
        "=ROUND(MAX(MIN_CHARGE,(D8*INDEX(TIER_LABOR,3)*D11+D10*VLOOKUP(B8,PAINT_TABLE,5,FALSE)+D8*MATERIAL_RATE+D7*TRIM_RATE+PREP_FEE)*(1+MARKUP)),2)",
    ),
];

/// Cells of the room sheet the calculator reads back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomOutput {
    Perimeter,
    GrossWallArea,
    OpeningArea,
    WallArea,
    CeilingArea,
    TrimLength,
    PaintableArea,
    Gallons,
    LaborHours,
    Good,
    Better,
    Best,
}

impl RoomOutput {
    pub const ALL: [RoomOutput; 12] = [
        RoomOutput::Perimeter,
        RoomOutput::GrossWallArea,
        RoomOutput::OpeningArea,
        RoomOutput::WallArea,
        RoomOutput::CeilingArea,
        RoomOutput::TrimLength,
        RoomOutput::PaintableArea,
        RoomOutput::Gallons,
        RoomOutput::LaborHours,
        RoomOutput::Good,
        RoomOutput::Better,
        RoomOutput::Best,
    ];

    pub fn address(self) -> &'static str {
        match self {
            RoomOutput::Perimeter => "D2",
            RoomOutput::GrossWallArea => "D3",
            RoomOutput::OpeningArea => "D4",
            RoomOutput::WallArea => "D5",
            RoomOutput::CeilingArea => "D6",
            RoomOutput::TrimLength => "D7",
            RoomOutput::PaintableArea => "D8",
            RoomOutput::Gallons => "D10",
            RoomOutput::LaborHours => "D12",
            RoomOutput::Good => "F2",
            RoomOutput::Better => "F3",
            RoomOutput::Best => "F4",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RoomOutput::Perimeter => "perimeter",
            RoomOutput::GrossWallArea => "gross_wall_area",
            RoomOutput::OpeningArea => "opening_area",
            RoomOutput::WallArea => "wall_area",
            RoomOutput::CeilingArea => "ceiling_area",
            RoomOutput::TrimLength => "trim_length",
            RoomOutput::PaintableArea => "paintable_area",
            RoomOutput::Gallons => "gallons",
            RoomOutput::LaborHours => "labor_hours",
            RoomOutput::Good => "good",
            RoomOutput::Better => "better",
            RoomOutput::Best => "best",
        }
    }

    pub fn key(self) -> Result<CellKey> {
        cell_key(ROOM_SHEET, self.address())
    }
}

/// Cells of the project sheet the calculator reads back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectOutput {
    PaintableArea,
    Gallons,
    LaborHours,
    Discount,
    Good,
    Better,
    Best,
}

impl ProjectOutput {
    pub const ALL: [ProjectOutput; 7] = [
        ProjectOutput::PaintableArea,
        ProjectOutput::Gallons,
        ProjectOutput::LaborHours,
        ProjectOutput::Discount,
        ProjectOutput::Good,
        ProjectOutput::Better,
        ProjectOutput::Best,
    ];

    pub fn address(self) -> &'static str {
        match self {
            ProjectOutput::PaintableArea => "J2",
            ProjectOutput::Gallons => "J3",
            ProjectOutput::LaborHours => "J4",
            ProjectOutput::Discount => "J6",
            ProjectOutput::Good => "J7",
            ProjectOutput::Better => "J8",
            ProjectOutput::Best => "J9",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProjectOutput::PaintableArea => "total_paintable_area",
            ProjectOutput::Gallons => "total_gallons",
            ProjectOutput::LaborHours => "total_labor_hours",
            ProjectOutput::Discount => "discount",
            ProjectOutput::Good => "good",
            ProjectOutput::Better => "better",
            ProjectOutput::Best => "best",
        }
    }

    pub fn key(self) -> Result<CellKey> {
        cell_key(PROJECT_SHEET, self.address())
    }
}

/// One room's contribution to the project sheet
///
/// Outputs that failed for the room carry its error value, so project totals
/// fail the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRow {
    pub name: String,
    pub paintable_area: CellValue,
    pub gallons: CellValue,
    pub labor_hours: CellValue,
    pub good: CellValue,
    pub better: CellValue,
    pub best: CellValue,
}

fn cell_key(sheet: &str, address: &str) -> Result<CellKey> {
    Ok(CellKey::new(SheetName::new(sheet)?, CellAddress::parse(address)?))
}

/// Accumulates the contents of one sheet
struct SheetWriter {
    sheet: SheetName,
    cells: Vec<(CellKey, RawValue)>,
}

impl SheetWriter {
    fn new(sheet: &str) -> Result<Self> {
        Ok(Self {
            sheet: SheetName::new(sheet)?,
            cells: Vec::new(),
        })
    }

    fn put(&mut self, address: &str, value: impl Into<RawValue>) -> Result<()> {
        let address = CellAddress::parse(address)?;
        self.put_at(address.row, address.col, value);
        Ok(())
    }

    /// 0-based row and column
    fn put_at(&mut self, row: u32, col: u16, value: impl Into<RawValue>) {
        let key = CellKey::new(self.sheet.clone(), CellAddress::new(row, col));
        self.cells.push((key, value.into()));
    }

    /// Text that must never be read as a formula
    fn put_text(&mut self, row: u32, col: u16, text: &str) {
        self.put_at(row, col, CellValue::text(text));
    }

    fn finish(self) -> Vec<(CellKey, RawValue)> {
        self.cells
    }
}

/// `RATES!<range>` text for a block of rows
fn rates_range(first_row: u32, rows: usize, first_col: u16, last_col: u16) -> String {
    let last_row = first_row + rows.saturating_sub(1) as u32;
    let range = CellRange::from_indices(first_row, first_col, last_row, last_col);
    format!("{}!{}:{}", RATES_SHEET, range.start, range.end)
}

// RATES layout: scalars in B2:B12, tier rates in B14:D14, tables from row 2
const TIER_ROW: u32 = 13;
const CONDITION_COL: u16 = 3;
const PAINT_COL: u16 = 6;
const DISCOUNT_COL: u16 = 12;

/// Scalar rates and the names they are published under
fn scalar_rates(rates: &RateTable) -> [(&'static str, Decimal); 11] {
    [
        ("DOOR_AREA", rates.door_area),
        ("WINDOW_AREA", rates.window_area),
        ("PRODUCTIVITY", rates.productivity_sqft_per_hour),
        ("OPENING_HOURS", rates.hours_per_opening),
        ("TRIM_SPEED", rates.trim_feet_per_hour),
        ("TRIM_RATE", rates.trim_rate),
        ("MATERIAL_RATE", rates.material_rate),
        ("PREP_FEE", rates.prep_fee),
        ("MARKUP", rates.markup),
        ("MIN_CHARGE", rates.minimum_charge),
        ("PROJECT_MINIMUM", rates.project_minimum),
    ]
}

/// Contents of the `RATES` sheet
pub fn rate_cells(rates: &RateTable) -> Result<Vec<(CellKey, RawValue)>> {
    let mut sheet = SheetWriter::new(RATES_SHEET)?;

    for (row, (name, value)) in (1u32..).zip(scalar_rates(rates)) {
        sheet.put_text(row, 0, &name.to_ascii_lowercase());
        sheet.put_at(row, 1, value);
    }

    sheet.put_text(TIER_ROW, 0, "tier_labor");
    sheet.put_at(TIER_ROW, 1, rates.tiers.good);
    sheet.put_at(TIER_ROW, 2, rates.tiers.better);
    sheet.put_at(TIER_ROW, 3, rates.tiers.best);

    sheet.put_text(0, CONDITION_COL, "condition");
    sheet.put_text(0, CONDITION_COL + 1, "multiplier");
    for (row, rate) in (1u32..).zip(&rates.conditions) {
        sheet.put_text(row, CONDITION_COL, rate.condition.as_str());
        sheet.put_at(row, CONDITION_COL + 1, rate.multiplier);
    }

    for (col, header) in (PAINT_COL..).zip(["paint", "coverage", "good", "better", "best"]) {
        sheet.put_text(0, col, header);
    }
    for (row, paint) in (1u32..).zip(&rates.paints) {
        sheet.put_text(row, PAINT_COL, paint.paint_type.as_str());
        sheet.put_at(row, PAINT_COL + 1, paint.coverage_sqft);
        sheet.put_at(row, PAINT_COL + 2, paint.good);
        sheet.put_at(row, PAINT_COL + 3, paint.better);
        sheet.put_at(row, PAINT_COL + 4, paint.best);
    }

    sheet.put_text(0, DISCOUNT_COL, "min_rooms");
    sheet.put_text(0, DISCOUNT_COL + 1, "discount");
    for (row, discount) in (1u32..).zip(rates.sorted_discounts()) {
        sheet.put_at(row, DISCOUNT_COL, discount.min_rooms);
        sheet.put_at(row, DISCOUNT_COL + 1, discount.discount);
    }

    Ok(sheet.finish())
}

/// Names the estimate formulas use, with what they refer to
pub fn rate_names(rates: &RateTable) -> Vec<(&'static str, String)> {
    let mut names: Vec<(&'static str, String)> = (1u32..)
        .zip(scalar_rates(rates))
        .map(|(row, (name, _))| {
            (name, format!("{}!{}", RATES_SHEET, CellAddress::new(row, 1)))
        })
        .collect();

    names.push(("TIER_LABOR", rates_range(TIER_ROW, 1, 1, 3)));
    names.push((
        "CONDITION_TABLE",
        rates_range(1, rates.conditions.len(), CONDITION_COL, CONDITION_COL + 1),
    ));
    names.push((
        "PAINT_TABLE",
        rates_range(1, rates.paints.len(), PAINT_COL, PAINT_COL + 4),
    ));
    names.push((
        "DISCOUNTS",
        rates_range(
            1,
            rates.multi_room_discounts.len(),
            DISCOUNT_COL,
            DISCOUNT_COL + 1,
        ),
    ));
    names
}

/// Inputs and formulas of the `ROOM` sheet
pub fn room_cells(room: &RoomInput) -> Result<Vec<(CellKey, RawValue)>> {
    let mut sheet = SheetWriter::new(ROOM_SHEET)?;

    sheet.put_text(0, 1, &room.name);
    sheet.put("B2", room.length_ft)?;
    sheet.put("B3", room.width_ft)?;
    sheet.put("B4", room.height_ft)?;
    sheet.put("B5", room.doors)?;
    sheet.put("B6", room.windows)?;
    sheet.put_text(6, 1, room.surface_condition.as_str());
    sheet.put_text(7, 1, room.paint_type.as_str());
    sheet.put("B9", room.coats)?;
    sheet.put("B10", room.include_ceiling)?;
    sheet.put("B11", room.include_trim)?;

    for (address, content) in ROOM_FORMULAS {
        if content.starts_with('=') {
            sheet.put(address, RawValue::formula(content))?;
        } else {
            let address = CellAddress::parse(address)?;
            sheet.put_text(address.row, address.col, content);
        }
    }

    Ok(sheet.finish())
}

/// Room rows and totals of the `PROJECT` sheet
pub fn project_cells(rows: &[ProjectRow]) -> Result<Vec<(CellKey, RawValue)>> {
    let mut sheet = SheetWriter::new(PROJECT_SHEET)?;

    for (col, header) in (0u16..).zip(["room", "area", "gallons", "hours", "good", "better", "best"]) {
        sheet.put_text(0, col, header);
    }
    for (row, room) in (1u32..).zip(rows) {
        sheet.put_text(row, 0, &room.name);
        sheet.put_at(row, 1, room.paintable_area.clone());
        sheet.put_at(row, 2, room.gallons.clone());
        sheet.put_at(row, 3, room.labor_hours.clone());
        sheet.put_at(row, 4, room.good.clone());
        sheet.put_at(row, 5, room.better.clone());
        sheet.put_at(row, 6, room.best.clone());
    }

    let last = rows.len().max(1) + 1;
    let column = |letter: &str| format!("{letter}2:{letter}{last}");
    let tier = |letter: &str| {
        format!(
            "=ROUND(MAX(PROJECT_MINIMUM,SUM({})*(1-J6)),2)",
            column(letter)
        )
    };

    sheet.put("J2", RawValue::formula(format!("=SUM({})", column("B"))))?;
    sheet.put("J3", RawValue::formula(format!("=SUM({})", column("C"))))?;
    sheet.put("J4", RawValue::formula(format!("=SUM({})", column("D"))))?;
    sheet.put("J5", RawValue::formula(format!("=COUNTA({})", column("A"))))?;
    sheet.put("J6", RawValue::formula("=VLOOKUP(J5,DISCOUNTS,2,TRUE)"))?;
    sheet.put("J7", RawValue::formula(tier("E")))?;
    sheet.put("J8", RawValue::formula(tier("F")))?;
    sheet.put("J9", RawValue::formula(tier("G")))?;

    Ok(sheet.finish())
}

/// A fresh engine holding the rate sheet and its names
fn rates_engine(rates: &RateTable, cache: Option<Arc<ResultCache>>) -> Result<Engine> {
    let mut engine = Engine::new();
    if let Some(cache) = cache {
        engine = engine.with_cache(cache);
    }
    engine.set_worksheet_data(rate_cells(rates)?);
    for (name, target) in rate_names(rates) {
        engine.define_name(name, &target)?;
    }
    Ok(engine)
}

/// Engine seeded with the estimate sheet for one room
pub fn room_engine(
    room: &RoomInput,
    rates: &RateTable,
    cache: Option<Arc<ResultCache>>,
) -> Result<Engine> {
    let mut engine = rates_engine(rates, cache)?;
    engine.set_worksheet_data(room_cells(room)?);
    Ok(engine)
}

/// Engine seeded with the project aggregation sheet
pub fn project_engine(
    rows: &[ProjectRow],
    rates: &RateTable,
    cache: Option<Arc<ResultCache>>,
) -> Result<Engine> {
    let mut engine = rates_engine(rates, cache)?;
    engine.set_worksheet_data(project_cells(rows)?);
    Ok(engine)
}
