//! Request-scoped models for the gallery server.

pub mod notice;
pub mod session;

pub use notice::{Notice, NoticeQuery};
pub use session::{CurrentSession, keys};
