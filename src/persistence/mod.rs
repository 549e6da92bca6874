//! Storage contracts and their implementations.
//!
//! - `traits` - the narrow read/write contracts the pipeline consumes
//! - `postgres` - durable store backed by sqlx/PostgreSQL
//! - `memory` - same semantics in process, for tests and offline runs

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use traits::{DecisionLedger, IpoStore, RunLogStore, SessionTokenStore, TraderStore};
