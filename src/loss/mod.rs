pub mod bce;
pub mod dice;

pub use bce::BceLoss;
pub use dice::DiceChannelLoss;
