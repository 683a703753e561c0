pub mod database;
pub mod memory;
mod memory_traits;
pub mod traits;

pub use database::{
    ActivityOps, DatabaseAdapter, EventOps, InvitationOps, ProjectOps, ResearchOps, TeamOps,
    UserOps,
};
pub use memory::MemoryDatabaseAdapter;

#[cfg(feature = "sqlx-postgres")]
pub use database::sqlx_adapter::{PoolConfig, PoolStats, SqlxAdapter};
