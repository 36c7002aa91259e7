//! Room measurements supplied by the caller

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition of the surfaces to be painted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceCondition {
    #[default]
    Good,
    Fair,
    Poor,
}

impl SurfaceCondition {
    pub const ALL: [SurfaceCondition; 3] = [
        SurfaceCondition::Good,
        SurfaceCondition::Fair,
        SurfaceCondition::Poor,
    ];

    /// Key used in the condition table of the rate sheet
    pub fn as_str(self) -> &'static str {
        match self {
            SurfaceCondition::Good => "good",
            SurfaceCondition::Fair => "fair",
            SurfaceCondition::Poor => "poor",
        }
    }
}

impl fmt::Display for SurfaceCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paint sheen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaintType {
    Flat,
    #[default]
    Eggshell,
    Satin,
    SemiGloss,
}

impl PaintType {
    pub const ALL: [PaintType; 4] = [
        PaintType::Flat,
        PaintType::Eggshell,
        PaintType::Satin,
        PaintType::SemiGloss,
    ];

    /// Key used in the paint table of the rate sheet
    pub fn as_str(self) -> &'static str {
        match self {
            PaintType::Flat => "flat",
            PaintType::Eggshell => "eggshell",
            PaintType::Satin => "satin",
            PaintType::SemiGloss => "semi-gloss",
        }
    }
}

impl fmt::Display for PaintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_coats() -> u32 {
    2
}

/// One room to estimate
///
/// Dimensions are in feet. Read-only to the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInput {
    pub name: String,
    pub length_ft: Decimal,
    pub width_ft: Decimal,
    pub height_ft: Decimal,
    #[serde(default)]
    pub doors: u32,
    #[serde(default)]
    pub windows: u32,
    #[serde(default)]
    pub surface_condition: SurfaceCondition,
    #[serde(default)]
    pub paint_type: PaintType,
    #[serde(default = "default_coats")]
    pub coats: u32,
    #[serde(default)]
    pub include_ceiling: bool,
    #[serde(default)]
    pub include_trim: bool,
}

impl RoomInput {
    /// A room with walls only, two coats of eggshell over good surfaces
    pub fn new(
        name: impl Into<String>,
        length_ft: Decimal,
        width_ft: Decimal,
        height_ft: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            length_ft,
            width_ft,
            height_ft,
            doors: 0,
            windows: 0,
            surface_condition: SurfaceCondition::default(),
            paint_type: PaintType::default(),
            coats: default_coats(),
            include_ceiling: false,
            include_trim: false,
        }
    }

    pub fn with_openings(mut self, doors: u32, windows: u32) -> Self {
        self.doors = doors;
        self.windows = windows;
        self
    }

    pub fn with_paint(mut self, paint_type: PaintType, coats: u32) -> Self {
        self.paint_type = paint_type;
        self.coats = coats;
        self
    }

    pub fn with_condition(mut self, condition: SurfaceCondition) -> Self {
        self.surface_condition = condition;
        self
    }

    pub fn with_ceiling(mut self) -> Self {
        self.include_ceiling = true;
        self
    }

    pub fn with_trim(mut self) -> Self {
        self.include_trim = true;
        self
    }
}
