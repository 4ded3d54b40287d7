//! SQLite backend for the Guichet demande store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Transition commits run as a single
//! transaction whose record update is conditioned on the status read by the
//! engine, which is what linearizes concurrent actions on one demande.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
