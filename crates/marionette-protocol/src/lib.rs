pub mod frames;
pub mod payload;

pub use frames::{AckStatus, ClientFrame, ServerFrame};
pub use payload::{Actions, AudioPayload, DisplayText, MotionSpec};
