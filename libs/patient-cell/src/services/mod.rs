pub mod search;

pub use search::PatientSearchService;
