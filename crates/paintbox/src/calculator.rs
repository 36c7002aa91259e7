//! Good/Better/Best painting estimates
//!
//! Each call builds its own [`Engine`] seeded with the estimate sheet, so
//! concurrent calls never see each other's cells. The optional
//! [`ResultCache`] is the only state shared between calls.
//!
//! # Example
//!
//! ```
//! use paintbox::{CalculatorOptions, PaintingCalculator, RoomInput};
//! use rust_decimal::Decimal;
//!
//! let calculator = PaintingCalculator::new(CalculatorOptions::default()).unwrap();
//! let room = RoomInput::new("Den", Decimal::from(12), Decimal::from(10), Decimal::from(9))
//!     .with_openings(2, 3);
//!
//! let estimate = calculator.calculate_complete_room_estimate(&room).unwrap();
//! assert_eq!(estimate.wall_area, Some(Decimal::from(309)));
//! assert!(estimate.pricing.unwrap().is_ascending());
//! ```

use crate::config::CalculatorOptions;
use crate::error::{CalculatorError, Result};
use crate::estimate::{CellFailure, MultiRoomEstimate, ProjectTotals, RoomEstimate, TierPricing};
use crate::room::RoomInput;
use crate::sheet::{self, ProjectOutput, ProjectRow, RoomOutput};
use paintbox_core::{CellError, CellKey, CellValue};
use paintbox_formula::{CacheStats, Engine, ResultCache};
use rust_decimal::Decimal;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, debug_span, warn};

/// Values read back from a set of output cells
#[derive(Debug, Default)]
struct Readout {
    /// Cell values, with non-numbers turned into error values
    values: Vec<CellValue>,
    numbers: Vec<Option<Decimal>>,
    failures: Vec<CellFailure>,
}

impl Readout {
    fn number(&self, index: usize) -> Option<Decimal> {
        self.numbers.get(index).copied().flatten()
    }
}

/// Evaluate `cells` and sort the results into numbers and failures
fn read_cells(engine: &mut Engine, cells: &[(&'static str, CellKey)], room: Option<&str>) -> Readout {
    let keys: Vec<CellKey> = cells.iter().map(|(_, key)| key.clone()).collect();
    let report = engine.evaluate_all(&keys);

    let mut readout = Readout::default();
    for (label, key) in cells {
        let value = report.get(key).cloned().unwrap_or_default();
        if let CellValue::Number(n) = value {
            readout.numbers.push(Some(n));
            readout.values.push(value);
            continue;
        }

        let error = value.as_error().unwrap_or(CellError::Value);
        let reason = match report.diagnostics.get(key) {
            Some(diagnostic) => diagnostic.to_string(),
            None if value.is_error() => format!("evaluated to {}", error),
            None => format!("expected a number, got {}", value.type_name()),
        };
        readout.failures.push(CellFailure {
            room: room.map(str::to_string),
            cell: key.to_string(),
            output: label.to_string(),
            error,
            reason,
        });
        readout.numbers.push(None);
        readout.values.push(CellValue::Error(error));
    }
    readout
}

/// Computes painting estimates from room measurements
#[derive(Debug, Clone)]
pub struct PaintingCalculator {
    options: CalculatorOptions,
    cache: Option<Arc<ResultCache>>,
}

impl PaintingCalculator {
    /// Validate `options` and create the result cache they ask for
    pub fn new(options: CalculatorOptions) -> Result<Self> {
        options.validate()?;
        let cache = if options.enable_cache {
            let capacity = NonZeroUsize::new(options.cache_capacity).ok_or_else(|| {
                CalculatorError::config("cache_capacity must be positive")
            })?;
            Some(Arc::new(ResultCache::new(capacity)))
        } else {
            None
        };
        Ok(Self { options, cache })
    }

    /// Use a cache shared with other calculators
    ///
    /// `enable_cache` and `cache_capacity` are ignored.
    pub fn with_cache(options: CalculatorOptions, cache: Arc<ResultCache>) -> Result<Self> {
        options.rates.validate()?;
        Ok(Self {
            options,
            cache: Some(cache),
        })
    }

    pub fn options(&self) -> &CalculatorOptions {
        &self.options
    }

    /// Counters of the result cache, if one is in use
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Measurements and tier prices for a single room
    pub fn calculate_complete_room_estimate(&self, room: &RoomInput) -> Result<RoomEstimate> {
        let _span = debug_span!("room_estimate", room = %room.name).entered();
        let (estimate, _) = self.estimate_room(room)?;
        Ok(estimate)
    }

    /// Estimate every room, then price them together on the project sheet
    pub fn calculate_multi_room_estimate(&self, rooms: &[RoomInput]) -> Result<MultiRoomEstimate> {
        if rooms.is_empty() {
            return Err(CalculatorError::NoRooms);
        }
        let _span = debug_span!("multi_room_estimate", rooms = rooms.len()).entered();

        let mut estimates = Vec::with_capacity(rooms.len());
        let mut rows = Vec::with_capacity(rooms.len());
        for room in rooms {
            let _span = debug_span!("room_estimate", room = %room.name).entered();
            let (estimate, row) = self.estimate_room(room)?;
            estimates.push(estimate);
            rows.push(row);
        }

        let rates = &self.options.rates;
        let mut engine = sheet::project_engine(&rows, rates, self.cache.clone())?;
        let cells = ProjectOutput::ALL
            .iter()
            .map(|output| output.key().map(|key| (output.label(), key)))
            .collect::<Result<Vec<_>>>()?;
        let readout = read_cells(&mut engine, &cells, None);
        let project = |output: ProjectOutput| {
            ProjectOutput::ALL
                .iter()
                .position(|o| *o == output)
                .and_then(|index| readout.number(index))
        };

        let (pricing, tier_adjusted) = self.ordered_pricing(
            "project",
            project(ProjectOutput::Good),
            project(ProjectOutput::Better),
            project(ProjectOutput::Best),
        );
        let totals = ProjectTotals {
            room_count: rooms.len(),
            paintable_area: project(ProjectOutput::PaintableArea),
            gallons: project(ProjectOutput::Gallons),
            labor_hours: project(ProjectOutput::LaborHours),
            discount: project(ProjectOutput::Discount),
        };

        let failures: Vec<CellFailure> = estimates
            .iter()
            .flat_map(|estimate| estimate.failures.iter().cloned())
            .chain(readout.failures)
            .collect();
        debug!(
            rooms = rooms.len(),
            failures = failures.len(),
            "project estimate complete"
        );

        Ok(MultiRoomEstimate {
            rooms: estimates,
            totals,
            pricing,
            tier_adjusted,
            failures,
        })
    }

    /// Evaluate the room sheet, returning the estimate and its project row
    fn estimate_room(&self, room: &RoomInput) -> Result<(RoomEstimate, ProjectRow)> {
        let mut engine = sheet::room_engine(room, &self.options.rates, self.cache.clone())?;
        let cells = RoomOutput::ALL
            .iter()
            .map(|output| output.key().map(|key| (output.label(), key)))
            .collect::<Result<Vec<_>>>()?;
        let readout = read_cells(&mut engine, &cells, Some(&room.name));

        let index = |output: RoomOutput| {
            RoomOutput::ALL
                .iter()
                .position(|o| *o == output)
                .unwrap_or_default()
        };
        let number = |output: RoomOutput| readout.number(index(output));
        let value = |output: RoomOutput| {
            readout
                .values
                .get(index(output))
                .cloned()
                .unwrap_or(CellValue::Error(CellError::Na))
        };

        let (pricing, tier_adjusted) = self.ordered_pricing(
            &room.name,
            number(RoomOutput::Good),
            number(RoomOutput::Better),
            number(RoomOutput::Best),
        );

        // The project sheet sums the prices quoted to the customer
        let tier_value = |output: RoomOutput, price: Option<Decimal>| match price {
            Some(price) => CellValue::Number(price),
            None => value(output),
        };
        let row = ProjectRow {
            name: room.name.clone(),
            paintable_area: value(RoomOutput::PaintableArea),
            gallons: value(RoomOutput::Gallons),
            labor_hours: value(RoomOutput::LaborHours),
            good: tier_value(RoomOutput::Good, pricing.map(|p| p.good)),
            better: tier_value(RoomOutput::Better, pricing.map(|p| p.better)),
            best: tier_value(RoomOutput::Best, pricing.map(|p| p.best)),
        };

        let stats = engine.stats();
        debug!(
            parsed = stats.formulas_parsed,
            evaluated = stats.cells_evaluated,
            cache_hits = stats.cache_hits,
            failures = readout.failures.len(),
            "room evaluated"
        );

        let estimate = RoomEstimate {
            room: room.name.clone(),
            perimeter: number(RoomOutput::Perimeter),
            gross_wall_area: number(RoomOutput::GrossWallArea),
            opening_area: number(RoomOutput::OpeningArea),
            wall_area: number(RoomOutput::WallArea),
            ceiling_area: number(RoomOutput::CeilingArea),
            trim_length: number(RoomOutput::TrimLength),
            paintable_area: number(RoomOutput::PaintableArea),
            gallons: number(RoomOutput::Gallons),
            labor_hours: number(RoomOutput::LaborHours),
            pricing,
            tier_adjusted,
            failures: readout.failures,
        };
        Ok((estimate, row))
    }

    /// Tier prices in strictly ascending order, when all three exist
    fn ordered_pricing(
        &self,
        subject: &str,
        good: Option<Decimal>,
        better: Option<Decimal>,
        best: Option<Decimal>,
    ) -> (Option<TierPricing>, bool) {
        let (Some(good), Some(better), Some(best)) = (good, better, best) else {
            return (None, false);
        };
        let computed = TierPricing::new(good, better, best);
        let (pricing, adjusted) = computed.enforce_order(self.options.rates.min_tier_step);
        if adjusted {
            warn!(
                subject,
                good = %computed.good,
                better = %computed.better,
                best = %computed.best,
                "tier prices out of order, adjusted to {}/{}/{}",
                pricing.good,
                pricing.better,
                pricing.best
            );
            if !pricing.is_ascending() {
                warn!(subject, "tier prices could not be separated");
            }
        }
        (Some(pricing), adjusted)
    }
}
