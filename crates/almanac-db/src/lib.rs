//! Calendar entry models and the storage seam the engine depends on.

pub mod db;
pub mod error;
pub mod model;
