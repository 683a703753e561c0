//! # Research Hub
//!
//! A collaboration API for research groups: accounts, teams with email
//! invitations, projects, papers with citations, datasets, events and a
//! per-user dashboard.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use research_hub::{HubBuilder, HubConfig};
//! use research_hub::adapters::MemoryDatabaseAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HubConfig::new("your-secret-key-that-is-at-least-32-chars")
//!         .frontend_url("http://localhost:3000");
//!
//!     let hub = HubBuilder::new(config)
//!         .database(MemoryDatabaseAdapter::new())
//!         .default_plugins()
//!         .build()
//!         .await?;
//!
//!     println!("{:?}", hub.plugin_names());
//!     Ok(())
//! }
//! ```

// The hub lives in the root crate because it wires plugins from
// research-hub-api onto the pipeline from research-hub-core.
pub mod core;
pub mod handlers;

pub use research_hub_core::{
    ActivityEntry, ApiError, ApiRequest, ApiResponse, ApiResult, ApiRoute, Argon2Config,
    BodyLimitConfig, BodyLimitMiddleware, ConsoleEmailProvider, CorsConfig, CorsMiddleware,
    DatabaseAdapter, DatabaseError, EmailProvider, HttpMethod, HubConfig, HubContext, HubPlugin,
    InvitationEmail, JwtConfig, Logger, Middleware, PasswordConfig, TracingLogger, UploadConfig,
};

/// Domain types shared by the plugins and storage adapters.
pub mod types {
    pub use research_hub_core::{
        Citation, CreateUser, DashboardStats, Dataset, Event, EventRegistration, InvitationStatus,
        Paper, PaperWithCitations, Project, Team, TeamInvitation, TeamMember, TeamRole,
        UpdateUser, User, UserCard, UserSummary, Visibility,
    };
}

pub mod adapters {
    pub use research_hub_core::adapters::{
        ActivityOps, DatabaseAdapter, EventOps, InvitationOps, MemoryDatabaseAdapter, ProjectOps,
        ResearchOps, TeamOps, UserOps,
    };

    #[cfg(feature = "sqlx-postgres")]
    pub use research_hub_core::adapters::{PoolConfig, PoolStats, SqlxAdapter};
}

pub mod plugins {
    pub use research_hub_api::plugins::*;
}

pub use core::{HubBuilder, ResearchHub, TypedHubBuilder};

#[cfg(feature = "axum")]
pub use handlers::axum::AxumIntegration;
