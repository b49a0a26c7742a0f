pub mod adapter;
pub mod outbound;
pub mod registry;
pub mod session;

pub use adapter::{BackendAdapter, SpeakOutcome, SpeakRequest};
pub use outbound::OutboundHandle;
pub use registry::{EngineSet, SessionRegistry};
pub use session::{Session, SessionContext};
