//! Override Store adapters.
//!
//! The in-memory adapter lives next to the trait in `farmgate-auth`; this
//! module holds the durable ones.

pub mod postgres;

pub use postgres::PostgresOverrideStore;
