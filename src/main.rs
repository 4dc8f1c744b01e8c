//! nginx site manager.
//!
//! # Architecture Overview
//!
//! ```text
//!   apps/*.yaml ──watch──▶ manifest ──render──▶ sites-available/<domain>.conf
//!        ▲                   sync                      │ symlink
//!        │                                             ▼
//!        └──reverse sync──── discovery ◀─────── sites-enabled/<name>
//!                            (inspect + probe)         │
//!                                                      ▼
//!   admin API / console ──▶ store ──▶ control ──▶ nginx -t, nginx -s reload
//! ```

use std::path::PathBuf;

use clap::Parser;

use nginx_manager::config::{load_config, validation::validate_config, ConfigError, ManagerConfig};
use nginx_manager::lifecycle::startup;
use nginx_manager::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "nginx-manager", version, about = "Reconciles nginx sites with app manifests")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// App manifest directory
    #[arg(long)]
    apps: Option<PathBuf>,

    #[arg(long)]
    available_dir: Option<PathBuf>,

    #[arg(long)]
    enabled_dir: Option<PathBuf>,

    #[arg(long)]
    archived_dir: Option<PathBuf>,

    #[arg(long)]
    main_config: Option<PathBuf>,

    #[arg(long)]
    nginx_bin: Option<PathBuf>,

    /// Port generated server blocks listen on
    #[arg(long)]
    nginx_port: Option<u16>,

    /// Admin API bind address
    #[arg(long)]
    bind: Option<String>,

    /// Merge manifest events arriving within this window
    #[arg(long)]
    coalesce_ms: Option<u64>,

    /// Do not read console shortcuts from stdin
    #[arg(long)]
    no_console: bool,
}

impl Args {
    fn apply(self, config: &mut ManagerConfig) {
        if let Some(dir) = self.apps {
            config.layout.manifests_dir = dir;
        }
        if let Some(dir) = self.available_dir {
            config.layout.available_dir = dir;
        }
        if let Some(dir) = self.enabled_dir {
            config.layout.enabled_dir = Some(dir);
        }
        if let Some(dir) = self.archived_dir {
            config.layout.archived_dir = dir;
        }
        if let Some(path) = self.main_config {
            config.layout.main_config = path;
        }
        if let Some(bin) = self.nginx_bin {
            config.proxy.nginx_bin = bin;
        }
        if let Some(port) = self.nginx_port {
            config.proxy.listen_port = port;
        }
        if let Some(bind) = self.bind {
            config.api.bind_address = bind;
        }
        if let Some(ms) = self.coalesce_ms {
            config.watch.coalesce_ms = ms;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let interactive = !args.no_console;

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ManagerConfig::default(),
    };
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "nginx-manager starting");
    tracing::info!(
        available_dir = %config.layout.available_dir.display(),
        manifests_dir = %config.layout.manifests_dir.display(),
        listen_port = config.proxy.listen_port,
        bind_address = %config.api.bind_address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    startup::run(config, interactive).await
}
