//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy type with its own input type, so
//! dispatch from `main` is resolved at compile time.

use anyhow::Context;
use clawgate_config::Config;
use clawgate_session::SessionManager;
use tracing::info;

mod info;
mod init;
mod record;
mod sessions;
mod version;

pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use record::{RecordInput, RecordStrategy};
pub use sessions::{SessionsInput, SessionsStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// # Example
/// ```rust,ignore
/// struct MyStrategy;
///
/// impl CommandStrategy for MyStrategy {
///     type Input = MyInput;
///
///     fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
///         // Command logic here
///         Ok(())
///     }
/// }
/// ```
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Components shared by the commands that touch stored sessions.
struct CommonComponents {
    config: Config,
    sessions: SessionManager,
}

fn init_common_components() -> anyhow::Result<CommonComponents> {
    let config = Config::load_or_default()?;
    let sessions_dir = config.sessions_dir()?;
    info!("Session directory: {}", sessions_dir.display());

    let sessions = SessionManager::new(&sessions_dir).with_context(|| {
        format!(
            "Failed to open session store at {}",
            sessions_dir.display()
        )
    })?;

    Ok(CommonComponents { config, sessions })
}
