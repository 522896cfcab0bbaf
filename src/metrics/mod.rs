pub mod classification;
pub mod stats;

pub use classification::{BinaryConfusion, ZeroDivision};
pub use stats::Stats;
