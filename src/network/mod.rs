pub mod network;
pub mod segmentation;
pub mod state_dict;

pub use network::Network;
pub use segmentation::{NetConfig, SegmentationNet};
pub use state_dict::StateDict;
