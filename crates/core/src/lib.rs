//! # Research Hub Core
//!
//! Core abstractions for the Research Hub collaboration API.
//! Contains traits, types, configuration, and error handling.

pub mod adapters;
pub mod config;
pub mod email;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod password;
pub mod plugin;
pub mod token;
pub mod types;
pub mod types_activity;
pub mod types_event;
pub mod types_project;
pub mod types_team;
pub mod uploads;

// Re-export commonly used items
pub use adapters::{
    ActivityOps, DatabaseAdapter, EventOps, InvitationOps, MemoryDatabaseAdapter, ProjectOps,
    ResearchOps, TeamOps, UserOps,
};
#[cfg(feature = "sqlx-postgres")]
pub use adapters::{PoolConfig, PoolStats, SqlxAdapter};
pub use config::{Argon2Config, HubConfig, JwtConfig, PasswordConfig, UploadConfig};
pub use email::{ConsoleEmailProvider, EmailProvider, InvitationEmail};
pub use error::{
    ApiError, ApiResult, DatabaseError, validate_request_body, validation_error_response,
};
pub use logger::{Logger, TracingLogger, default_logger};
pub use middleware::{
    BodyLimitConfig, BodyLimitMiddleware, CorsConfig, CorsMiddleware, Middleware,
};
pub use plugin::{ApiRoute, HubContext, HubPlugin};
pub use token::{Claims, TokenManager};
pub use types::{
    ActivityEntry, ApiRequest, ApiResponse, Citation, CreateActivity, CreateCitation,
    CreateDataset, CreateEvent, CreatePaper, CreateProject, CreateTeam, CreateTeamInvitation,
    CreateTeamMember, CreateUser, DashboardCounts, DashboardStats, Dataset, DatasetFilter, Event,
    EventFilter, EventRegistration, HealthCheckResponse, HttpMethod, InvitationStatus,
    MessageResponse, NewInvitee, NewMember, Paper, PaperFilter, PaperWithCitations, Project,
    ProjectFilter, Team, TeamInvitation, TeamMember, TeamRole, UpdateProject, UpdateTeam,
    UpdateUser, User, UserCard, UserSummary, Visibility,
};
pub use uploads::{MultipartForm, StoredFile, UploadKind, UploadStore, UploadedFile};
