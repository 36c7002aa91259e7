//! Prelude module - common imports for paintbox users
//!
//! ```rust
//! use paintbox::prelude::*;
//! ```

pub use crate::{
    // Calculator
    CalculatorError,
    CalculatorOptions,
    // Estimates
    CellFailure,
    MultiRoomEstimate,
    PaintType,
    PaintingCalculator,
    RateTable,
    RoomEstimate,
    // Inputs
    RoomInput,
    SurfaceCondition,
    TierPricing,
};
