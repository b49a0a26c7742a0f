pub mod pipeline;
pub mod quality;
pub mod source;
pub mod spam;

pub use pipeline::ChatPipeline;
pub use quality::QualityScorer;
pub use source::{ChatSource, SourceError};
pub use spam::SpamFilter;
