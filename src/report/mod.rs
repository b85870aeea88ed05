//! Report aggregation: bill of quantities, quantity take-off and profile
//! schedule. Everything here is derived from the model on demand and never
//! stored back.

pub mod aggregate;
pub mod profiles;
pub mod qto;

pub use aggregate::{aggregate, AggregatedLine, BillOfQuantities, UnavailablePolicy, NO_LEVEL};
pub use profiles::{profile_schedule, ProfileGroup, ProfileUse, UNNAMED_PROFILE};
pub use qto::{quantity_take_off, QuantityTakeOff, TypeCount};
