use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const CONFIG_DIR_NAME: &str = "clawgate";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Workspace directory; empty means `~/clawgate`.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AgentsConfig {
    #[serde(default)]
    pub defaults: AgentDefaults,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AgentDefaults {
    pub model: String,
    pub max_iterations: usize,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_iterations: 15,
            temperature: 0.7,
            max_tokens: 8192,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SessionsConfig {
    /// Directory for session files; empty means `<workspace>/sessions`.
    #[serde(default)]
    pub dir: String,
    /// Messages handed to prompt construction per turn.
    #[serde(default = "SessionsConfig::default_history_limit")]
    pub history_limit: usize,
    /// Persist a session after every recorded agent turn batch.
    #[serde(default = "SessionsConfig::default_save_immediately")]
    pub save_immediately: bool,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            history_limit: Self::default_history_limit(),
            save_immediately: Self::default_save_immediately(),
        }
    }
}

impl SessionsConfig {
    const fn default_history_limit() -> usize {
        50
    }

    const fn default_save_immediately() -> bool {
        true
    }
}

impl Config {
    /// `~/clawgate`.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR_NAME))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'clawgate init' to create config.",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    /// Like [`Config::load`], but falls back to defaults when no config file
    /// has been created yet.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!(
                "No config at {}, using defaults",
                config_path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// Workspace directory, resolved against `home` when not configured.
    #[must_use]
    pub fn workspace_dir_in(&self, home: &Path) -> PathBuf {
        if self.workspace.path.is_empty() {
            home.join(CONFIG_DIR_NAME)
        } else {
            PathBuf::from(&self.workspace.path)
        }
    }

    /// Session directory, resolved against `home` when not configured.
    #[must_use]
    pub fn sessions_dir_in(&self, home: &Path) -> PathBuf {
        if self.sessions.dir.is_empty() {
            self.workspace_dir_in(home).join("sessions")
        } else {
            PathBuf::from(&self.sessions.dir)
        }
    }

    pub fn sessions_dir(&self) -> anyhow::Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?;
        Ok(self.sessions_dir_in(&home))
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let content = serde_json::to_string_pretty(&Self::default())?;
        std::fs::write(&config_path, content)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("🔧 Configuration options:");
        println!("   - workspace.path: Workspace directory (default ~/clawgate)");
        println!("   - sessions.dir: Where session transcripts are stored");
        println!("   - sessions.history_limit: Messages kept in the prompt window");
        println!("   - sessions.save_immediately: Persist after every agent turn");
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sessions.history_limit, 50);
        assert!(config.sessions.save_immediately);
    }

    #[test]
    fn test_partial_sessions_section() {
        let config: Config =
            serde_json::from_str(r#"{"sessions": {"history_limit": 12}}"#).unwrap();
        assert_eq!(config.sessions.history_limit, 12);
        assert!(config.sessions.save_immediately);
        assert!(config.sessions.dir.is_empty());
    }

    #[test]
    fn test_partial_agent_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"agents": {"defaults": {"model": "glm-4-flash"}}}"#).unwrap();
        assert_eq!(config.agents.defaults.model, "glm-4-flash");
        assert_eq!(config.agents.defaults.max_iterations, 15);
        assert_eq!(config.agents.defaults.max_tokens, 8192);
    }

    #[test]
    fn test_sessions_dir_resolution() {
        let home = Path::new("/home/tester");
        let mut config = Config::default();
        assert_eq!(
            config.sessions_dir_in(home),
            PathBuf::from("/home/tester/clawgate/sessions")
        );

        config.workspace.path = "/srv/gw".to_string();
        assert_eq!(config.sessions_dir_in(home), PathBuf::from("/srv/gw/sessions"));

        config.sessions.dir = "/var/lib/clawgate".to_string();
        assert_eq!(config.sessions_dir_in(home), PathBuf::from("/var/lib/clawgate"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"agents": {"defaults": {"model": "glm-4-flash", "max_iterations": 3, "temperature": 0.2, "max_tokens": 1024}}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.agents.defaults.model, "glm-4-flash");
        assert_eq!(config.agents.defaults.max_iterations, 3);

        std::fs::write(&path, "{broken").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
