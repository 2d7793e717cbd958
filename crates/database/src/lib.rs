//! # Donations Database Crate
//!
//! The data-access layer of the donation service. Every use case is one
//! method on the [`DonationStore`] trait, implemented twice:
//!
//! - [`DbRepository`]: PostgreSQL through a bounded `sqlx` pool. Queries are
//!   plain SQL with bound parameters; only the charity search and projection
//!   assemble SQL at runtime, from allow-listed column names.
//! - [`MemoryStore`]: a process-local copy of the sample data that honors the
//!   same keys, foreign keys and cascades. Used in tests and for demos.
//!
//! ## Public API
//!
//! - `connect`: builds the connection pool from `DatabaseConfig`.
//! - `open_store`: picks the backend and returns it as `Arc<dyn DonationStore>`.
//! - `schema`: the bundled DDL/DML script and its transactional replay.
//! - `DbError`: the error type returned by every store method.

pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;
pub mod schema;
pub mod search;
pub mod store;

pub use connection::{connect, open_store};
pub use error::DbError;
pub use memory::{MemoryStore, Seed};
pub use repository::DbRepository;
pub use store::DonationStore;
