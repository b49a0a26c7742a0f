pub mod descriptor;
pub mod emotions;

pub use descriptor::{EmotionMap, LiveModelDescriptor};
pub use emotions::{extract, extract_and_strip};
