//! Almanac recurring calendar engine - integration test support.
//!
//! Re-exports the workspace crates so integration tests can use `almanac_test::`
//! paths.

pub mod component {
    pub use almanac_service::*;

    pub mod config {
        pub use almanac_core::config::*;
        pub use almanac_core::constants::*;
    }

    pub mod db {
        pub use almanac_db::db::*;
        pub use almanac_db::error::*;
    }

    pub mod model {
        pub use almanac_db::model::*;
    }
}

pub use almanac_rule as rule;
