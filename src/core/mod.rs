mod hub;

pub use hub::{HubBuilder, ResearchHub, TypedHubBuilder};
