//! External process control: nginx self-check, hot reload, certificate issuance.
//!
//! # Design Decisions
//! - One trait seam so store and sync logic can run against a fake in tests
//! - Combined stdout+stderr is captured and carried in the error
//! - No timeout is enforced; a hung binary blocks the caller

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::ProxyConfig;
use crate::error::{ManagerError, Result};

/// Commands understood by the reverse-proxy process and the certificate tool.
#[async_trait]
pub trait ProxyControl: Send + Sync {
    /// Syntax/semantic self-check of the whole configuration.
    async fn validate(&self) -> Result<()>;

    /// Hot reload of the running process.
    async fn reload(&self) -> Result<()>;

    /// Obtain and install a certificate for `domain`.
    async fn issue_certificate(&self, domain: &str) -> Result<()>;
}

/// Drives the real `nginx` and `certbot` binaries.
#[derive(Debug, Clone)]
pub struct NginxControl {
    nginx_bin: PathBuf,
    certbot_bin: PathBuf,
}

impl NginxControl {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            nginx_bin: config.nginx_bin.clone(),
            certbot_bin: config.certbot_bin.clone(),
        }
    }

    async fn run(&self, program: &Path, args: &[&str]) -> Result<Output> {
        tracing::debug!(program = %program.display(), ?args, "Running command");
        Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| ManagerError::Command {
                program: program.display().to_string(),
                source,
            })
    }
}

/// stdout followed by stderr, trimmed.
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text.trim().to_string()
}

#[async_trait]
impl ProxyControl for NginxControl {
    async fn validate(&self) -> Result<()> {
        let output = self.run(&self.nginx_bin, &["-t"]).await?;
        if !output.status.success() {
            return Err(ManagerError::ValidationFailed {
                output: combined_output(&output),
            });
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let output = self.run(&self.nginx_bin, &["-s", "reload"]).await?;
        if !output.status.success() {
            return Err(ManagerError::ReloadFailed {
                output: combined_output(&output),
            });
        }
        Ok(())
    }

    async fn issue_certificate(&self, domain: &str) -> Result<()> {
        let output = self
            .run(
                &self.certbot_bin,
                &[
                    "--nginx",
                    "-d",
                    domain,
                    "--non-interactive",
                    "--agree-tos",
                    "--register-unsafely-without-email",
                ],
            )
            .await?;
        if !output.status.success() {
            return Err(ManagerError::Certificate {
                output: combined_output(&output),
            });
        }
        Ok(())
    }
}
