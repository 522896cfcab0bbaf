pub mod device;
pub mod matrix;
pub mod tensor;

pub use device::Device;
pub use matrix::Matrix;
pub use tensor::{Tensor, TensorRecord};
