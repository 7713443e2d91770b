pub mod definitions;
pub mod handlers;
pub mod materialize;
pub mod params;
pub mod queries;
pub mod reader;
pub mod router;

pub use materialize::{bootstrap, spawn_refresher, ViewManager};
pub use router::views_routes;
