//! Call session management

pub mod call;
pub mod record;
pub mod registry;

pub use call::{CallConfig, CallSession};
pub use record::{CallRecord, CallStatus};
pub use registry::SessionRegistry;
