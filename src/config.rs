use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Process settings. Read from an optional JSON file (`FARCAL_CONFIG`),
/// then overridden by `BUNDLE_PATH`, `BIND_ADDR`, `PORT` and `LOG_PRED`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub bundle_path: PathBuf,
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Log a summary of every encoded feature row.
    pub log_pred: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bundle_path: PathBuf::from("model/bundle.json"),
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            port: 8000,
            log_pred: false,
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("config file not found: {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("invalid config JSON in {}", path.display()))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = match lookup("FARCAL_CONFIG") {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(p) = lookup("BUNDLE_PATH") {
            cfg.bundle_path = PathBuf::from(p);
        }
        if let Some(a) = lookup("BIND_ADDR") {
            cfg.bind_addr = a.parse().with_context(|| format!("BIND_ADDR is not an IP address: {a}"))?;
        }
        if let Some(p) = lookup("PORT") {
            cfg.port = p.parse().with_context(|| format!("PORT is not a port number: {p}"))?;
        }
        if let Some(v) = lookup("LOG_PRED") {
            cfg.log_pred = v == "1";
        }
        Ok(cfg)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = ServiceConfig::from_lookup(vars(&[])).unwrap();
        assert_eq!(cfg, ServiceConfig::default());
        assert_eq!(cfg.socket_addr().to_string(), "0.0.0.0:8000");
    }

    #[test]
    fn environment_overrides() {
        let cfg = ServiceConfig::from_lookup(vars(&[
            ("BUNDLE_PATH", "/srv/fare.json"),
            ("BIND_ADDR", "127.0.0.1"),
            ("PORT", "9090"),
            ("LOG_PRED", "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.bundle_path, PathBuf::from("/srv/fare.json"));
        assert_eq!(cfg.socket_addr().to_string(), "127.0.0.1:9090");
        assert!(cfg.log_pred);
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(ServiceConfig::from_lookup(vars(&[("PORT", "eighty")])).is_err());
    }

    #[test]
    fn file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farcal.json");
        fs::write(&path, r#"{"bundle_path": "rf.json", "port": 7000}"#).unwrap();

        let path_str = path.to_string_lossy().to_string();
        let cfg = ServiceConfig::from_lookup(vars(&[("FARCAL_CONFIG", &path_str), ("PORT", "7001")])).unwrap();
        assert_eq!(cfg.bundle_path, PathBuf::from("rf.json"));
        assert_eq!(cfg.port, 7001);
        assert!(!cfg.log_pred);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = ServiceConfig::from_lookup(vars(&[("FARCAL_CONFIG", "/nope/farcal.json")])).unwrap_err();
        assert!(err.to_string().contains("/nope/farcal.json"));
    }
}
