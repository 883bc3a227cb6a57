use clawgate_config::Config;

use super::init_common_components;

/// Strategy for displaying configuration information.
///
/// Prints the resolved configuration file location, agent defaults, and the
/// state of the session store.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components()?;
        let config = &common.config;

        println!("=== clawgate Configuration ===\n");

        let config_path = Config::config_path()?;
        println!("Config file: {}", config_path.display());
        if !config_path.exists() {
            println!("  (not created yet, using defaults; run 'clawgate init')");
        }
        println!();

        println!("Agent Defaults:");
        println!("  Model: {}", config.agents.defaults.model);
        println!("  Max Iterations: {}", config.agents.defaults.max_iterations);
        println!("  Max Tokens: {}", config.agents.defaults.max_tokens);
        println!("  Temperature: {}", config.agents.defaults.temperature);
        println!();

        println!("Sessions:");
        println!("  Directory: {}", common.sessions.base_dir().display());
        println!("  History Limit: {}", config.sessions.history_limit);
        println!("  Save Immediately: {}", config.sessions.save_immediately);
        println!("  Stored Sessions: {}", common.sessions.list()?.len());

        Ok(())
    }
}
