//! Session model and the injected token/session hooks the gateway reads credentials through.

pub mod hooks;
pub mod session;
pub mod source;

pub use hooks::*;
pub use session::*;
pub use source::*;
