pub mod loader;
pub mod sample;
pub mod segmentation;

pub use loader::{BatchIter, DataLoader, LoaderOptions};
pub use sample::{collate, Batch, Sample};
pub use segmentation::{DatasetOptions, SegmentationDataset};
