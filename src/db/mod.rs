//! Database layer

mod pool;

pub use pool::{create_pool, run_migrations};
