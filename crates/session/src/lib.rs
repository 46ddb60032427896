//! Session store implementations for the Windlass agent runtime.
//!
//! Two implementations of the [`windlass_core::Session`] contract:
//! - [`InMemorySession`] — ephemeral, useful for tests and single-process
//!   conversations
//! - [`SqliteSession`] — durable, one database shared by many session ids
//!   (behind the default `sqlite` feature)

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemorySession;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteSession, SqliteSessionConfig};
