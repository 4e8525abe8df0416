use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public URL of the web app, used in links sent to approvers
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub enabled: bool,
    /// Use local sendmail binary instead of SMTP server
    #[serde(default = "default_true")]
    pub use_sendmail: bool,
    /// SMTP server host (only used if use_sendmail is false)
    #[serde(default)]
    pub host: String,
    /// SMTP server port (only used if use_sendmail is false)
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// SMTP username (only used if use_sendmail is false)
    #[serde(default)]
    pub username: String,
    /// SMTP password (only used if use_sendmail is false)
    #[serde(default)]
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

/// Twilio-style messaging API credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_whatsapp_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Sender number, without the `whatsapp:` prefix
    #[serde(default)]
    pub from_number: Option<String>,
}

/// OpenAI-compatible completion API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_model")]
    pub model: String,
}

fn default_true() -> bool { true }
fn default_smtp_port() -> u16 { 587 }
fn default_public_url() -> String { "http://localhost:5173".to_string() }
fn default_whatsapp_api_url() -> String { "https://api.twilio.com/2010-04-01".to_string() }
fn default_ai_api_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_ai_model() -> String { "gpt-4o-mini".to_string() }

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: true,  // Enable by default, using sendmail
            use_sendmail: true,
            host: "".to_string(),
            port: 587,
            username: "".to_string(),
            password: "".to_string(),
            from_email: "noreply@nexaflow.app".to_string(),
            from_name: "NexaFlow".to_string(),
        }
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_url: default_whatsapp_api_url(),
            account_sid: None,
            auth_token: None,
            from_number: None,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: default_ai_api_url(),
            api_key: None,
            model: default_ai_model(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                public_url: default_public_url(),
            },
            database: DatabaseConfig {
                path: "./data/nexaflow.db".to_string(),
            },
            smtp: SmtpConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        // Try to load from environment variable
        if let Ok(path) = std::env::var("NEXAFLOW_CONFIG") {
            return Self::load_from_path(&PathBuf::from(path));
        }

        // Try to load from default locations
        let default_paths = vec![
            PathBuf::from("nexaflow-server.toml"),
            PathBuf::from("config/nexaflow-server.toml"),
            PathBuf::from("/etc/nexaflow/server.toml"),
        ];

        for path in default_paths {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        // Return default config if no file found
        tracing::warn!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Secrets and deployment settings given in the environment win over the file.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("NEXAFLOW_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("NEXAFLOW_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = var("NEXAFLOW_PUBLIC_URL") {
            self.server.public_url = url;
        }
        if let Some(path) = var("NEXAFLOW_DATABASE_PATH") {
            self.database.path = path;
        }

        if let Some(host) = var("SMTP_HOST") {
            self.smtp.host = host;
            self.smtp.use_sendmail = false;
        }
        if let Some(port) = var("SMTP_PORT").and_then(|p| p.parse().ok()) {
            self.smtp.port = port;
        }
        if let Some(username) = var("SMTP_USERNAME") {
            self.smtp.username = username;
        }
        if let Some(password) = var("SMTP_PASSWORD") {
            self.smtp.password = password;
        }
        if let Some(from) = var("SMTP_FROM") {
            self.smtp.from_email = from;
        }

        if let Some(sid) = var("WHATSAPP_ACCOUNT_SID") {
            self.whatsapp.account_sid = Some(sid);
        }
        if let Some(token) = var("WHATSAPP_AUTH_TOKEN") {
            self.whatsapp.auth_token = Some(token);
        }
        if let Some(number) = var("WHATSAPP_FROM_NUMBER") {
            self.whatsapp.from_number = Some(number);
        }

        if let Some(key) = var("OPENAI_API_KEY") {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.ai.model = model;
        }
        if let Some(url) = var("OPENAI_API_URL") {
            self.ai.api_url = url;
        }
    }
}
