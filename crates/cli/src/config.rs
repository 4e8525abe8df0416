use anyhow::Result;
use directories::ProjectDirs;
use nexaflow_services::{RuntimeMode, ServicesConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub services: ServicesSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the NexaFlow server
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesSection {
    /// Simulate every provider instead of calling the server
    #[serde(default = "default_true")]
    pub demo_mode: bool,
    #[serde(default)]
    pub import_latency_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl Default for ServicesSection {
    fn default() -> Self {
        Self {
            demo_mode: true,
            import_latency_ms: None,
        }
    }
}

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub mode: Option<RuntimeMode>,
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("app", "nexaflow", "nexaflow")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api_url" => self.remote.api_url = Some(value.to_string()),
            "demo_mode" => {
                self.services.demo_mode = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("demo_mode must be true or false"))?
            }
            "import_latency_ms" => self.services.import_latency_ms = Some(value.parse()?),
            _ => anyhow::bail!(
                "Unknown config key: {}. Valid keys: api_url, demo_mode, import_latency_ms",
                key
            ),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "api_url" => self.api_url().to_string(),
            "demo_mode" => self.services.demo_mode.to_string(),
            "import_latency_ms" => self
                .services
                .import_latency_ms
                .map(|ms| ms.to_string())
                .unwrap_or_default(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }

    pub fn api_url(&self) -> &str {
        self.remote.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// Services settings after applying command-line overrides.
    pub fn services_config(&self, overrides: &Overrides) -> ServicesConfig {
        let mode = overrides
            .mode
            .unwrap_or_else(|| RuntimeMode::from_demo_flag(self.services.demo_mode));
        let api_url = overrides.api_url.as_deref().unwrap_or(self.api_url());

        let mut config = ServicesConfig::new(mode, api_url);
        if let Some(ms) = self.services.import_latency_ms {
            config.import_latency_ms = ms;
        }
        config
    }
}
