pub mod dense;
pub mod dropout;

pub use dense::Layer;
pub use dropout::Dropout;
