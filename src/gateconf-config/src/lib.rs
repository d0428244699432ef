use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCfg {
    #[serde(default = "def_host")]
    pub host: String,
    #[serde(default = "def_port")]
    pub port: u16,
    /// Base path the whole API is mounted under. Stripped before routing.
    #[serde(default = "def_prefix")]
    pub prefix: String,
    #[serde(default = "def_logging")]
    pub logging_mode: String,
    #[serde(default)]
    pub name: String,
}
fn def_host() -> String { "0.0.0.0".into() }
fn def_port() -> u16 { 9091 }
fn def_prefix() -> String { "/api".into() }
fn def_logging() -> String { "info".into() }

// Default must agree with the serde defaults; an all-zero ApiCfg has an
// unparseable listen address.
impl Default for ApiCfg {
    fn default() -> Self {
        Self {
            host: def_host(),
            port: def_port(),
            prefix: def_prefix(),
            logging_mode: def_logging(),
            name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiCfg,
}

impl FileConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api.host, self.api.port)
            .parse()
            .with_context(|| format!("bad listen address {}:{}", self.api.host, self.api.port))
    }
}

pub fn load_config(path: &str) -> Result<FileConfig> {
    let content = fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    if path.ends_with(".yaml") || path.ends_with(".yml") {
        Ok(serde_yml::from_str(&content)?)
    } else if path.ends_with(".json") {
        Ok(serde_json::from_str(&content)?)
    } else if path.ends_with(".toml") {
        Ok(toml::from_str(&content)?)
    } else {
        Err(anyhow!("Unknown config extension: {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: FileConfig = serde_yml::from_str("api:\n  port: 1234\n").unwrap();
        assert_eq!(cfg.api.port, 1234);
        assert_eq!(cfg.api.host, "0.0.0.0");
        assert_eq!(cfg.api.prefix, "/api");
        assert_eq!(cfg.api.logging_mode, "info");
    }

    #[test]
    fn default_config_is_servable() {
        let cfg = FileConfig::default();
        assert_eq!(cfg.api.host, "0.0.0.0");
        assert_eq!(cfg.api.port, 9091);
        assert_eq!(cfg.api.prefix, "/api");
        assert_eq!(cfg.api.logging_mode, "info");
        assert!(cfg.listen_addr().is_ok());
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg: FileConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.api.port, 9091);
        assert!(cfg.listen_addr().is_ok());
    }
}
