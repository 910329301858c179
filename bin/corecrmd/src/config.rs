//! Server configuration — TOML file resolved from a context name or path.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the HTTP server.
    #[serde(default = "default_listen")]
    pub listen: String,

    pub storage: StorageConfig,
    pub kratos: KratosConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite database.
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KratosConfig {
    /// Base URL of the ORY Kratos public API.
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// The frontend origin allowed by CORS (cookies cross this boundary,
    /// so a wildcard is not an option).
    pub cors_origin: String,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl ServerConfig {
    /// Resolve a context name to `/etc/corecrm/<name>.toml`. Anything
    /// containing `/` or `.` is treated as a literal path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/corecrm/{name_or_path}.toml"))
        }
    }

    /// Load and parse the configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", path.display()))?;
        let config: ServerConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("cannot parse config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Verify the configuration before the listener binds. Everything a
    /// request would need must be present at startup, not discovered
    /// per-request.
    pub fn verify(&self) -> anyhow::Result<()> {
        if self.storage.data_dir.is_empty() {
            anyhow::bail!("storage.data_dir is empty in configuration");
        }
        if !self.kratos.base_url.starts_with("http") {
            anyhow::bail!(
                "kratos.base_url must be an http(s) URL, got '{}'",
                self.kratos.base_url
            );
        }
        if self.http.cors_origin.is_empty() {
            anyhow::bail!("http.cors_origin is empty in configuration");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        listen = "127.0.0.1:3001"

        [storage]
        data_dir = "/var/lib/corecrm"

        [kratos]
        base_url = "http://localhost:4433"

        [http]
        cors_origin = "http://localhost:3000"
    "#;

    #[test]
    fn parses_sample_config() {
        let config: ServerConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.listen, "127.0.0.1:3001");
        assert_eq!(config.storage.data_dir, "/var/lib/corecrm");
        assert_eq!(config.kratos.base_url, "http://localhost:4433");
        config.verify().unwrap();
    }

    #[test]
    fn listen_defaults_when_absent() {
        let without_listen = SAMPLE.replace("listen = \"127.0.0.1:3001\"", "");
        let config: ServerConfig = toml::from_str(&without_listen).unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080");
    }

    #[test]
    fn verify_rejects_bad_kratos_url() {
        let bad = SAMPLE.replace("http://localhost:4433", "localhost:4433");
        let config: ServerConfig = toml::from_str(&bad).unwrap();
        assert!(config.verify().is_err());
    }

    #[test]
    fn context_name_resolves_to_etc() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/corecrm/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml")
        );
    }
}
