//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use nginx_manager::config::{LayoutConfig, ManagerConfig};
use nginx_manager::{
    ConfigStore, ManagerError, ManifestSync, ProxyControl, Result, SiteEnumerator,
};

/// Start a mock backend on an ephemeral port answering every request
/// with `status`.
pub async fn start_mock_backend(status: u16) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let reason = match status {
                    200 => "OK",
                    301 => "Moved Permanently",
                    404 => "Not Found",
                    _ => "Internal Server Error",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                    status, reason
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Mock backend answering 200 and recording the `Host` header of every
/// request it sees.
pub async fn start_recording_backend() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hosts = Arc::new(Mutex::new(Vec::new()));
    let seen = hosts.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf);
                if let Some(host) = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("host"))
                    .map(|(_, value)| value.trim().to_string())
                {
                    seen.lock().unwrap().push(host);
                }
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, hosts)
}

/// Accepts connections and never answers.
pub async fn start_hanging_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

/// A port with nothing listening on it.
pub async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Records validate/reload/certificate calls instead of running binaries.
#[derive(Default)]
pub struct RecordingControl {
    pub calls: Mutex<Vec<String>>,
    pub fail_validate: bool,
}

impl RecordingControl {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProxyControl for RecordingControl {
    async fn validate(&self) -> Result<()> {
        self.calls.lock().unwrap().push("validate".into());
        if self.fail_validate {
            return Err(ManagerError::ValidationFailed {
                output: "nginx: [emerg] unexpected \"}\"".into(),
            });
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.calls.lock().unwrap().push("reload".into());
        Ok(())
    }

    async fn issue_certificate(&self, domain: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("certificate {}", domain));
        Ok(())
    }
}

/// A throwaway nginx directory tree plus the engine wired onto it.
pub struct TestSite {
    pub dir: TempDir,
    pub config: ManagerConfig,
    pub control: Arc<RecordingControl>,
}

impl TestSite {
    pub fn new() -> Self {
        Self::with_control(RecordingControl::default())
    }

    pub fn with_control(control: RecordingControl) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let mut config = ManagerConfig::default();
        config.layout = LayoutConfig {
            available_dir: root.join("sites-available"),
            enabled_dir: Some(root.join("sites-enabled")),
            archived_dir: root.join("sites-archived"),
            manifests_dir: root.join("apps"),
            main_config: root.join("nginx.conf"),
        };
        config.proxy.listen_port = 8080;
        config.probe.timeout_ms = 500;

        for d in ["sites-available", "sites-enabled", "sites-archived"] {
            fs::create_dir_all(root.join(d)).unwrap();
        }
        fs::write(root.join("nginx.conf"), "events {}\nhttp {\n    include sites-enabled/*;\n}\n")
            .unwrap();

        Self {
            dir,
            config,
            control: Arc::new(control),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn available(&self, name: &str) -> PathBuf {
        self.root().join("sites-available").join(name)
    }

    pub fn enabled(&self, name: &str) -> PathBuf {
        self.root().join("sites-enabled").join(name)
    }

    pub fn manifest(&self, name: &str) -> PathBuf {
        self.root().join("apps").join(name)
    }

    /// Write a site listening on `port` and proxying to `upstream`.
    pub fn write_site(&self, name: &str, port: u16, upstream: &str) {
        let content = format!(
            "server {{\n    listen {};\n    server_name {};\n\n    location / {{\n        proxy_pass {};\n    }}\n}}\n",
            port,
            name.trim_end_matches(".conf"),
            upstream
        );
        fs::write(self.available(name), content).unwrap();
    }

    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(&self.config.layout, self.control.clone())
    }

    pub fn enumerator(&self) -> SiteEnumerator {
        SiteEnumerator::new(self.store(), &self.config.probe).unwrap()
    }

    pub fn sync(&self) -> ManifestSync {
        ManifestSync::new(&self.config, self.enumerator())
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}
