pub mod cost;
pub mod element;
pub mod profile;
pub mod project;

pub use cost::{Association, CostEntry, CostLedger, CostSchedule, EntryId, EntryState, ScheduleId};
pub use element::{BaseQuantities, Element, ElementClass};
pub use profile::{Extrusion, GeometrySource, Profile, ProfileShape};
pub use project::IfcModel;
