pub mod font;
pub mod plot;
pub mod png;
pub mod summary;

pub use plot::{learning_curve, LineChart, Series, DEFAULT_DPI};
pub use summary::{SummaryReport, LEARNING_GRAPH_FILE, METRIC_CSV_FILE};
