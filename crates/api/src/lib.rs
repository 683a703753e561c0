//! # Research Hub API
//!
//! Resource plugins for the Research Hub collaboration platform. Each plugin
//! owns one URL prefix and is registered with the hub in the root crate.

pub mod plugins;

pub use plugins::{
    AuthPlugin, AuthPluginConfig, EventsPlugin, ProjectsPlugin, ResearchPlugin, StatsConfig,
    StatsPlugin, TeamsConfig, TeamsPlugin,
};
