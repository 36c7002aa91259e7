//! Calculator options and the pricing constants behind the rate sheet

use crate::error::{CalculatorError, Result};
use crate::room::{PaintType, SurfaceCondition};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Options for a [`PaintingCalculator`](crate::PaintingCalculator)
///
/// Every field has a default, so a partial JSON document overrides only what
/// it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorOptions {
    /// Share formula results between calculations
    pub enable_cache: bool,
    /// Maximum number of cached formula results
    pub cache_capacity: usize,
    /// Pricing constants
    pub rates: RateTable,
}

impl Default for CalculatorOptions {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_capacity: 4096,
            rates: RateTable::default(),
        }
    }
}

impl CalculatorOptions {
    /// Options with the result cache switched off
    pub fn uncached() -> Self {
        Self {
            enable_cache: false,
            ..Self::default()
        }
    }

    /// Check that the options can produce an estimate sheet
    pub fn validate(&self) -> Result<()> {
        if self.enable_cache && self.cache_capacity == 0 {
            return Err(CalculatorError::config(
                "cache_capacity must be positive when the cache is enabled",
            ));
        }
        self.rates.validate()
    }
}

/// Per-square-foot labor rate for each pricing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRates {
    pub good: Decimal,
    pub better: Decimal,
    pub best: Decimal,
}

/// Labor multiplier for a surface condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRate {
    pub condition: SurfaceCondition,
    pub multiplier: Decimal,
}

/// A paint product: coverage and per-gallon price at each tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintProduct {
    pub paint_type: PaintType,
    /// Square feet covered by one gallon, one coat
    pub coverage_sqft: Decimal,
    pub good: Decimal,
    pub better: Decimal,
    pub best: Decimal,
}

/// Project discount applied from `min_rooms` rooms upward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDiscount {
    pub min_rooms: u32,
    /// Fraction taken off the tier prices, e.g. 0.05
    pub discount: Decimal,
}

/// Pricing constants that seed the `RATES` sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateTable {
    /// Square feet deducted per door
    pub door_area: Decimal,
    /// Square feet deducted per window
    pub window_area: Decimal,
    /// Square feet painted per labor hour, one coat
    pub productivity_sqft_per_hour: Decimal,
    /// Cutting-in time per door or window
    pub hours_per_opening: Decimal,
    /// Linear feet of trim painted per labor hour
    pub trim_feet_per_hour: Decimal,
    /// Price per linear foot of trim
    pub trim_rate: Decimal,
    /// Sundries (tape, caulk, plastic) per square foot
    pub material_rate: Decimal,
    /// Flat preparation charge per room
    pub prep_fee: Decimal,
    /// Fraction added on top of every tier price
    pub markup: Decimal,
    /// Lowest price quoted for a single room
    pub minimum_charge: Decimal,
    /// Lowest price quoted for a whole project
    pub project_minimum: Decimal,
    /// Gap enforced between tiers that come out out of order
    pub min_tier_step: Decimal,
    pub tiers: TierRates,
    pub conditions: Vec<ConditionRate>,
    pub paints: Vec<PaintProduct>,
    pub multi_room_discounts: Vec<RoomDiscount>,
}

impl Default for RateTable {
    fn default() -> Self {
        let product = |paint_type, coverage: i64, good: i64, better: i64, best: i64| PaintProduct {
            paint_type,
            coverage_sqft: Decimal::from(coverage),
            good: Decimal::from(good),
            better: Decimal::from(better),
            best: Decimal::from(best),
        };
        let condition = |condition, multiplier: Decimal| ConditionRate {
            condition,
            multiplier,
        };
        let discount = |min_rooms, percent: i64| RoomDiscount {
            min_rooms,
            discount: Decimal::new(percent, 2),
        };

        Self {
            door_area: Decimal::from(21),
            window_area: Decimal::from(15),
            productivity_sqft_per_hour: Decimal::from(150),
            hours_per_opening: Decimal::new(25, 2),
            trim_feet_per_hour: Decimal::from(40),
            trim_rate: Decimal::new(15, 1),
            material_rate: Decimal::new(12, 1),
            prep_fee: Decimal::from(150),
            markup: Decimal::new(10, 2),
            minimum_charge: Decimal::from(350),
            project_minimum: Decimal::from(500),
            min_tier_step: Decimal::from(25),
            tiers: TierRates {
                good: Decimal::new(25, 1),
                better: Decimal::new(35, 1),
                best: Decimal::from(5),
            },
            conditions: vec![
                condition(SurfaceCondition::Good, Decimal::ONE),
                condition(SurfaceCondition::Fair, Decimal::new(115, 2)),
                condition(SurfaceCondition::Poor, Decimal::new(135, 2)),
            ],
            paints: vec![
                product(PaintType::Flat, 400, 22, 32, 45),
                product(PaintType::Eggshell, 350, 28, 38, 52),
                product(PaintType::Satin, 350, 30, 42, 58),
                product(PaintType::SemiGloss, 325, 34, 46, 64),
            ],
            multi_room_discounts: vec![
                discount(1, 0),
                discount(3, 5),
                discount(5, 8),
                discount(8, 10),
            ],
        }
    }
}

impl RateTable {
    pub fn paint(&self, paint_type: PaintType) -> Option<&PaintProduct> {
        self.paints.iter().find(|p| p.paint_type == paint_type)
    }

    pub fn condition(&self, condition: SurfaceCondition) -> Option<&ConditionRate> {
        self.conditions.iter().find(|c| c.condition == condition)
    }

    /// Discounts sorted by room count, as the approximate lookup needs them
    pub fn sorted_discounts(&self) -> Vec<RoomDiscount> {
        let mut discounts = self.multi_room_discounts.clone();
        discounts.sort_by_key(|d| d.min_rooms);
        discounts
    }

    pub fn validate(&self) -> Result<()> {
        for paint_type in PaintType::ALL {
            let count = self
                .paints
                .iter()
                .filter(|p| p.paint_type == paint_type)
                .count();
            match count {
                0 => {
                    return Err(CalculatorError::config(format!(
                        "no paint product for {}",
                        paint_type
                    )))
                }
                1 => {}
                _ => {
                    return Err(CalculatorError::config(format!(
                        "paint product {} listed more than once",
                        paint_type
                    )))
                }
            }
        }
        if let Some(p) = self.paints.iter().find(|p| p.coverage_sqft <= Decimal::ZERO) {
            return Err(CalculatorError::config(format!(
                "paint product {} has non-positive coverage",
                p.paint_type
            )));
        }
        for condition in SurfaceCondition::ALL {
            if self.condition(condition).is_none() {
                return Err(CalculatorError::config(format!(
                    "no multiplier for {} surfaces",
                    condition
                )));
            }
        }
        let positive = [
            ("productivity_sqft_per_hour", self.productivity_sqft_per_hour),
            ("trim_feet_per_hour", self.trim_feet_per_hour),
            ("min_tier_step", self.min_tier_step),
        ];
        for (field, value) in positive {
            if value <= Decimal::ZERO {
                return Err(CalculatorError::config(format!("{} must be positive", field)));
            }
        }
        if !self.multi_room_discounts.iter().any(|d| d.min_rooms <= 1) {
            return Err(CalculatorError::config(
                "multi_room_discounts must start at one room",
            ));
        }
        Ok(())
    }
}
