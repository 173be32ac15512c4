use crate::storage::{Company, CompanySettings};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub company: CompanyConfig,
    pub frontend: FrontendConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL for dispatch links. Falls back to the request's Host header.
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            public_url: None,
        }
    }
}

/// The company seeded into the store at startup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompanyConfig {
    pub id: String,
    pub name: String,
    pub publish_link: String,
    pub delay_hours: u32,
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            id: "1".to_string(),
            name: "Demo Salon".to_string(),
            publish_link: "https://search.google.com/local/writereview?placeid=PLACE_ID"
                .to_string(),
            delay_hours: 48,
        }
    }
}

impl CompanyConfig {
    pub fn to_company(&self) -> Company {
        Company {
            id: self.id.clone(),
            name: self.name.clone(),
            publish_link: self.publish_link.clone(),
            settings: CompanySettings {
                delay_hours: self.delay_hours,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub dir: PathBuf,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("frontend"),
        }
    }
}

impl FrontendConfig {
    pub fn index_file(&self) -> PathBuf {
        self.dir.join("index.html")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Load config from `$REVIEWS_CONFIG` (or `config.toml`), then apply env overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var("REVIEWS_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// A missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }
        if let Some(host) = lookup("LISTEN_HOST") {
            self.server.host = host;
        }
        if let Some(url) = lookup("PUBLIC_URL") {
            self.server.public_url = Some(url);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
