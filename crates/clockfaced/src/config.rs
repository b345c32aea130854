use std::net::SocketAddr;
use std::path::PathBuf;

use clockface_core::MATCH_THRESHOLD;
use serde::Deserialize;

/// Daemon configuration.
///
/// Loaded from an optional TOML file (`CLOCKFACE_CONFIG`), with
/// `CLOCKFACE_*` environment variables overriding individual fields.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API binds to.
    pub listen_addr: SocketAddr,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Euclidean distance below which a candidate counts as a match.
    pub match_threshold: f64,
    /// Match against every tenant's descriptors instead of only the
    /// caller's company. Off by default; enabling it is logged at startup.
    pub cross_tenant_match: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    listen_addr: Option<SocketAddr>,
    db_path: Option<PathBuf>,
    #[serde(rename = "match", default)]
    matching: MatchSection,
}

#[derive(Debug, Default, Deserialize)]
struct MatchSection {
    threshold: Option<f64>,
    cross_tenant: Option<bool>,
}

impl Config {
    /// Load configuration: file first (if `CLOCKFACE_CONFIG` is set),
    /// then environment overrides, then defaults.
    pub fn load() -> anyhow::Result<Self> {
        let file = match std::env::var("CLOCKFACE_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("cannot read config file {path}: {e}"))?;
                toml::from_str::<ConfigFile>(&raw)
                    .map_err(|e| anyhow::anyhow!("bad config file {path}: {e}"))?
            }
            Err(_) => ConfigFile::default(),
        };

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("clockface");

        let listen_addr = match std::env::var("CLOCKFACE_LISTEN_ADDR") {
            Ok(v) => v
                .parse()
                .map_err(|e| anyhow::anyhow!("bad CLOCKFACE_LISTEN_ADDR {v}: {e}"))?,
            Err(_) => file
                .listen_addr
                .unwrap_or_else(|| "127.0.0.1:8420".parse().expect("valid default addr")),
        };

        let db_path = std::env::var("CLOCKFACE_DB_PATH")
            .map(PathBuf::from)
            .ok()
            .or(file.db_path)
            .unwrap_or_else(|| data_dir.join("clockface.db"));

        Ok(Self {
            listen_addr,
            db_path,
            match_threshold: env_f64("CLOCKFACE_MATCH_THRESHOLD")
                .or(file.matching.threshold)
                .unwrap_or(MATCH_THRESHOLD),
            cross_tenant_match: env_bool("CLOCKFACE_CROSS_TENANT_MATCH")
                .or(file.matching.cross_tenant)
                .unwrap_or(false),
        })
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|v| v != "0" && v != "false")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_parses() {
        let file: ConfigFile = toml::from_str(
            r#"
            listen_addr = "0.0.0.0:9000"
            db_path = "/tmp/cf.db"

            [match]
            threshold = 0.5
            cross_tenant = true
            "#,
        )
        .unwrap();
        assert_eq!(file.listen_addr.unwrap().port(), 9000);
        assert_eq!(file.matching.threshold, Some(0.5));
        assert_eq!(file.matching.cross_tenant, Some(true));
    }

    #[test]
    fn test_empty_config_file_is_all_defaults() {
        let file: ConfigFile = toml::from_str("").unwrap();
        assert!(file.listen_addr.is_none());
        assert!(file.matching.threshold.is_none());
    }
}
