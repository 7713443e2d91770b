pub mod catalog;
pub mod encounters;
pub mod pharmacy;
pub mod recovery;

pub use catalog::CatalogService;
pub use encounters::EncounterService;
pub use pharmacy::PharmacyService;
pub use recovery::RecoveryService;
