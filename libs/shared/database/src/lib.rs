pub mod data_api;
pub mod ejson;
pub mod mongo;
pub mod repository;
pub mod store;

pub use repository::{Record, Repository};
pub use store::{FindOptions, StoreClient, UpdateResult};
