pub mod catalog;
pub mod observation;

pub use catalog::{GenerationUnit, Island, PlantSite, SubstationEntry, SubstationType};
pub use observation::{utc_timestamp, DispatchObservation, StoredDispatchRow};
