//! Configuration: war settings, scenario documents, loading and
//! validation.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod world;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
pub use world::{ScenarioWorld, build_world};
