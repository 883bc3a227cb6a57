//! Gateway configuration, read from `~/clawgate/config.json`.

mod schema;

pub use schema::{AgentDefaults, AgentsConfig, Config, SessionsConfig, WorkspaceConfig};
