pub mod category;
pub mod reference;
pub mod similarity;

pub use category::CategoryAssigner;
pub use reference::{prices_close, ReferenceMatcher};
pub use similarity::{partial_ratio, ratio};
