//! Estimate results

use paintbox_core::CellError;
use rust_decimal::Decimal;
use serde::Serialize;

/// Price of the job at each quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierPricing {
    pub good: Decimal,
    pub better: Decimal,
    pub best: Decimal,
}

impl TierPricing {
    pub fn new(good: Decimal, better: Decimal, best: Decimal) -> Self {
        Self { good, better, best }
    }

    /// `good < better < best`
    pub fn is_ascending(&self) -> bool {
        self.good < self.better && self.better < self.best
    }

    /// Restore `good < better < best`
    ///
    /// Prices are sorted, then any tier that does not exceed the one below it
    /// is raised to that tier plus `min_step`. Returns the repaired pricing
    /// and whether anything had to change. A tier that would overflow stays
    /// where it is, so the result is only ascending when `is_ascending` says so.
    pub fn enforce_order(self, min_step: Decimal) -> (TierPricing, bool) {
        if self.is_ascending() {
            return (self, false);
        }

        let mut prices = [self.good, self.better, self.best];
        prices.sort();
        for i in 1..prices.len() {
            if prices[i] <= prices[i - 1] {
                if let Some(raised) = prices[i - 1].checked_add(min_step) {
                    prices[i] = raised;
                }
            }
        }
        (TierPricing::new(prices[0], prices[1], prices[2]), true)
    }
}

/// A cell that did not produce a number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellFailure {
    /// Room the cell belongs to; `None` for project totals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Sheet-qualified address, e.g. `ROOM!D10`
    pub cell: String,
    /// What the cell measures, e.g. `gallons`
    pub output: String,
    pub error: CellError,
    pub reason: String,
}

/// Measurements and prices for one room
///
/// A measurement is `None` when its cell failed; the matching entry in
/// `failures` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomEstimate {
    pub room: String,
    pub perimeter: Option<Decimal>,
    pub gross_wall_area: Option<Decimal>,
    pub opening_area: Option<Decimal>,
    pub wall_area: Option<Decimal>,
    pub ceiling_area: Option<Decimal>,
    pub trim_length: Option<Decimal>,
    pub paintable_area: Option<Decimal>,
    pub gallons: Option<Decimal>,
    pub labor_hours: Option<Decimal>,
    /// Present only when all three tier prices were computed
    pub pricing: Option<TierPricing>,
    pub tier_adjusted: bool,
    pub failures: Vec<CellFailure>,
}

impl RoomEstimate {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sums over every room of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectTotals {
    pub room_count: usize,
    pub paintable_area: Option<Decimal>,
    pub gallons: Option<Decimal>,
    pub labor_hours: Option<Decimal>,
    /// Fraction taken off the summed tier prices
    pub discount: Option<Decimal>,
}

/// Estimate for several rooms priced as one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiRoomEstimate {
    pub rooms: Vec<RoomEstimate>,
    pub totals: ProjectTotals,
    pub pricing: Option<TierPricing>,
    pub tier_adjusted: bool,
    /// Failures of every room followed by those of the project totals
    pub failures: Vec<CellFailure>,
}

impl MultiRoomEstimate {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
