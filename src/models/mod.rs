pub mod candidate;
pub mod catalog;

pub use candidate::*;
pub use catalog::*;
