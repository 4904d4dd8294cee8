pub mod contracts;
pub mod math;

pub use math::*;
