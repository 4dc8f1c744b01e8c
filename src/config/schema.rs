//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the manager.
//! All types derive Serde traits for deserialization from config files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration for the manager daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ManagerConfig {
    /// Directory layout (available, enabled, archived, manifests).
    pub layout: LayoutConfig,

    /// External proxy and certificate binaries.
    pub proxy: ProxyConfig,

    /// Liveness probe settings.
    pub probe: ProbeConfig,

    /// Manifest watcher settings.
    pub watch: WatchConfig,

    /// Admin API settings.
    pub api: ApiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Filesystem layout. Every path is supplied here; nothing is ambient.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// All known server configs (sites-available).
    pub available_dir: PathBuf,

    /// Symlinks to the active subset (sites-enabled). `None` disables toggling.
    pub enabled_dir: Option<PathBuf>,

    /// Retired configs.
    pub archived_dir: PathBuf,

    /// Application manifests (YAML).
    pub manifests_dir: PathBuf,

    /// Main nginx.conf, exposed as the sentinel site.
    pub main_config: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let prefix = homebrew_prefix();
        let etc = prefix
            .as_deref()
            .map(|p| p.join("etc/nginx"))
            .unwrap_or_else(|| PathBuf::from("/etc/nginx"));

        Self {
            available_dir: etc.join("sites-available"),
            enabled_dir: Some(etc.join("sites-enabled")),
            archived_dir: etc.join("sites-archived"),
            manifests_dir: PathBuf::from("./apps"),
            main_config: etc.join("nginx.conf"),
        }
    }
}

/// External binaries and generated listen port.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// nginx binary used for `-t` and `-s reload`.
    pub nginx_bin: PathBuf,

    /// certbot binary used for certificate issuance.
    pub certbot_bin: PathBuf,

    /// Port generated server blocks listen on.
    pub listen_port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        match homebrew_prefix() {
            Some(prefix) => Self {
                nginx_bin: prefix.join("opt/nginx/bin/nginx"),
                certbot_bin: PathBuf::from("certbot"),
                // Homebrew nginx runs unprivileged
                listen_port: 8080,
            },
            None => Self {
                nginx_bin: PathBuf::from("nginx"),
                certbot_bin: PathBuf::from("certbot"),
                listen_port: 80,
            },
        }
    }
}

/// Liveness probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-site probe timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { timeout_ms: 2_000 }
    }
}

/// Manifest watcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WatchConfig {
    /// Window in milliseconds for merging repeated events on the same
    /// manifest. 0 processes every event.
    pub coalesce_ms: u64,

    /// Skip the reverse-discovery pass at startup.
    pub skip_reverse_sync: bool,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address for the JSON API.
    pub bind_address: String,

    /// Bearer token required on every API call when set.
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
            api_key: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "nginx_manager=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Homebrew prefix on macOS, when it exists on disk.
fn homebrew_prefix() -> Option<PathBuf> {
    if !cfg!(target_os = "macos") {
        return None;
    }
    let prefix = if cfg!(target_arch = "aarch64") {
        Path::new("/opt/homebrew")
    } else {
        Path::new("/usr/local")
    };
    prefix.exists().then(|| prefix.to_path_buf())
}
