//! Database access seam for [`kanau::processor::Processor`] commands.
//!
//! Store operations are modeled as command/query objects processed by a
//! [`DatabaseProcessor`] (pool-backed). Operations that must share one
//! transaction run through the `*_tx` associated functions on the entity
//! types instead.

use sqlx::PgPool;

/// Pool-backed processor for standalone commands and queries.
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
