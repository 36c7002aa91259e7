//! # paintbox
//!
//! Good/Better/Best painting estimates computed by a spreadsheet formula
//! engine.
//!
//! Room measurements are written into the input cells of an estimate sheet;
//! formula cells derive wall area, paint volume, labor hours and the three
//! tier prices. Several rooms can be priced together as one project with a
//! multi-room discount.
//!
//! ## Features
//!
//! - Exact decimal arithmetic for every area, volume and price
//! - Failed cells reported per room instead of failing the whole estimate
//! - Tier prices always quoted in `good < better < best` order
//! - Optional result cache shared safely between concurrent calculations
//!
//! ## Example
//!
//! ```rust
//! use paintbox::prelude::*;
//! use rust_decimal::Decimal;
//!
//! let calculator = PaintingCalculator::new(CalculatorOptions::default()).unwrap();
//! let rooms = vec![
//!     RoomInput::new("Den", Decimal::from(12), Decimal::from(10), Decimal::from(9))
//!         .with_openings(2, 3),
//!     RoomInput::new("Bath", Decimal::from(8), Decimal::from(6), Decimal::from(8))
//!         .with_paint(PaintType::SemiGloss, 2),
//! ];
//!
//! let estimate = calculator.calculate_multi_room_estimate(&rooms).unwrap();
//! assert_eq!(estimate.rooms.len(), 2);
//! assert!(estimate.is_complete());
//! ```

pub mod calculator;
pub mod config;
pub mod error;
pub mod estimate;
pub mod prelude;
pub mod room;
pub mod sheet;

pub use calculator::PaintingCalculator;
pub use config::{
    CalculatorOptions, ConditionRate, PaintProduct, RateTable, RoomDiscount, TierRates,
};
pub use error::{CalculatorError, Result};
pub use estimate::{CellFailure, MultiRoomEstimate, ProjectTotals, RoomEstimate, TierPricing};
pub use room::{PaintType, RoomInput, SurfaceCondition};

// Re-export the engine for callers that evaluate their own sheets
pub use paintbox_core::{CellError, CellKey, CellValue, RawValue};
pub use paintbox_formula::{CacheStats, Engine, EvaluationReport, FormulaError, ResultCache};
