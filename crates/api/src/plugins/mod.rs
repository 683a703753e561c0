pub mod auth;
pub mod events;
pub mod projects;
pub mod research;
pub mod stats;
pub mod teams;

pub(crate) mod helpers;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use auth::{AuthPlugin, AuthPluginConfig};
pub use events::EventsPlugin;
pub use projects::ProjectsPlugin;
pub use research::ResearchPlugin;
pub use stats::{StatsConfig, StatsPlugin};
pub use teams::{TeamsConfig, TeamsPlugin};
