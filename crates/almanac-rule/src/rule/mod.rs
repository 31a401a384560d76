//! Rule model and occurrence generation.

mod frequency;
mod generate;
mod model;
mod window;

pub use frequency::Frequency;
pub use generate::Occurrences;
pub use model::{Rule, build_rule};
pub use window::TimeWindow;
