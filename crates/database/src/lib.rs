//! # Vigil Database Crate
//!
//! This crate acts as a high-level, application-specific interface to the
//! PostgreSQL database: it is the durable home of users and their alerts.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** encapsulates all database-specific logic and SQL, exposing
//!   an abstract `AlertStore` API to the rest of the application.
//! - **Asynchronous & Pooled:** all operations are asynchronous and run on a
//!   shared `PgPool`; every operation acquires its own connection from the
//!   pool, so concurrent chat handlers and the evaluator never share a
//!   session.
//! - **Swappable:** the `AlertStore` trait is the contract the engine uses,
//!   allowing the underlying implementation (live or in-memory fake) to be
//!   swapped out.
//!
//! ## Public API
//!
//! - `connect`: the async function to establish the database connection pool.
//! - `run_migrations`: applies the embedded migrations, ensuring the two
//!   tables exist at startup.
//! - `AlertStore` / `DbRepository`: the data-access contract and its
//!   PostgreSQL implementation.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::{AlertStore, DbRepository};
