pub mod auth;
pub mod dates;
pub mod error;
pub mod query;

pub use error::AppError;
pub use query::ListQuery;
