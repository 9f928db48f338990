//! Business logic services.

pub mod session;

pub use session::{SessionContext, SessionProvider, SignUpOutcome};
