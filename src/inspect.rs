//! Site inspection: what a server config exposes and where it forwards.
//!
//! # Responsibilities
//! - Pick the first `server` block (top level or `http > server`)
//! - Read listen port, TLS indicators and server name from it
//! - Find the first `location { proxy_pass ...; }` depth-first
//!
//! # Design Decisions
//! - `extract` never fails: unreadable or unparsable files come back as
//!   `Inspection::Unknown` so one broken config cannot stop enumeration
//! - Probing always targets clear-text localhost, whatever the public scheme
//! - Multiple server blocks in one file are not merged

use std::fs;
use std::path::Path;

use crate::directive::{self, Directive};
use crate::error::{ManagerError, Result};
use crate::manifest::Protocol;

const DEFAULT_PORT: u16 = 80;

/// Public and probe-relevant facts about a server block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteDetails {
    pub listen_port: u16,
    /// First `server_name` parameter, empty when absent.
    pub server_name: String,
    pub tls: bool,
}

impl SiteDetails {
    /// Clear-text localhost URL used for liveness probes.
    pub fn check_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.listen_port)
    }

    /// Server name unless it is empty or the `_` catch-all.
    pub fn public_name(&self) -> Option<&str> {
        match self.server_name.as_str() {
            "" | "_" => None,
            name => Some(name),
        }
    }

    /// `https://name` / `http://name`, or the check URL for catch-alls.
    pub fn display_url(&self) -> String {
        match self.public_name() {
            Some(name) => {
                let scheme = if self.tls { "https" } else { "http" };
                format!("{}://{}", scheme, name)
            }
            None => self.check_url(),
        }
    }
}

/// Best-effort inspection result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
    Parsed(SiteDetails),
    /// The file could not be read, parsed, or has no server block.
    Unknown,
}

impl Inspection {
    pub fn details(&self) -> Option<&SiteDetails> {
        match self {
            Inspection::Parsed(details) => Some(details),
            Inspection::Unknown => None,
        }
    }

    pub fn check_url(&self) -> Option<String> {
        self.details().map(SiteDetails::check_url)
    }

    pub fn has_tls(&self) -> bool {
        self.details().is_some_and(|d| d.tls)
    }

    pub fn public_name(&self) -> Option<&str> {
        self.details().and_then(SiteDetails::public_name)
    }
}

/// Upstream a config forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Inspect the config at `path`. Never fails.
pub fn extract(path: &Path) -> Inspection {
    match fs::read_to_string(path) {
        Ok(text) => extract_str(&text),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Config unreadable");
            Inspection::Unknown
        }
    }
}

/// Inspect config text.
pub fn extract_str(text: &str) -> Inspection {
    let Ok(tree) = directive::parse(text) else {
        return Inspection::Unknown;
    };
    let inspection = match directive::server_blocks(&tree).next() {
        Some(server) => Inspection::Parsed(server_details(server)),
        None => Inspection::Unknown,
    };
    inspection
}

fn server_details(server: &Directive) -> SiteDetails {
    let mut details = SiteDetails {
        listen_port: DEFAULT_PORT,
        server_name: String::new(),
        tls: false,
    };
    let mut seen_listen = false;

    for d in server.children() {
        match d.name.as_str() {
            "listen" => {
                if !seen_listen {
                    details.listen_port = d.first_param().map_or(DEFAULT_PORT, listen_port);
                    seen_listen = true;
                }
                if d.has_param("ssl") {
                    details.tls = true;
                }
            }
            "server_name" if details.server_name.is_empty() => {
                details.server_name = d.first_param().unwrap_or_default().to_string();
            }
            "ssl_certificate" => details.tls = true,
            _ => {}
        }
    }
    details
}

/// Port from `80`, `127.0.0.1:8080` or `[::]:443`; 80 when unparsable.
fn listen_port(value: &str) -> u16 {
    let port = value.rsplit_once(':').map_or(value, |(_, port)| port);
    port.parse().unwrap_or(DEFAULT_PORT)
}

/// First `proxy_pass` inside a `location`, searched depth-first under the
/// server blocks of the config at `path`.
pub fn proxy_target(path: &Path) -> Result<ProxyTarget> {
    let text = fs::read_to_string(path).map_err(|e| ManagerError::io("reading", path, e))?;
    let tree = directive::parse(&text).map_err(|e| ManagerError::ParseFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    proxy_target_in(&tree).ok_or_else(|| {
        ManagerError::NotFound(format!("no proxy target in {}", path.display()))
    })
}

fn proxy_target_in(tree: &[Directive]) -> Option<ProxyTarget> {
    let is_proxy_location = |d: &Directive| {
        d.is("location")
            && d
                .child("proxy_pass")
                .and_then(Directive::first_param)
                .is_some()
    };

    directive::server_blocks(tree).find_map(|server| {
        let location = directive::find_depth_first(server.children(), &is_proxy_location)?;
        let raw = location.child("proxy_pass")?.first_param()?;
        Some(parse_proxy_url(raw))
    })
}

/// Split `scheme://host:port/path` into its parts.
///
/// Scheme defaults to http and port to 80. Anything that does not split
/// cleanly (variables, upstream names, bad ports) keeps the host and falls
/// back to port 80.
pub fn parse_proxy_url(raw: &str) -> ProxyTarget {
    let (protocol, rest) = if let Some(rest) = raw.strip_prefix("https://") {
        (Protocol::Https, rest)
    } else {
        (Protocol::Http, raw.strip_prefix("http://").unwrap_or(raw))
    };
    let authority = rest.split('/').next().unwrap_or_default();

    let (host, port) = match split_host_port(authority) {
        Some((host, port)) => (host, port.parse().unwrap_or(DEFAULT_PORT)),
        None => (authority, DEFAULT_PORT),
    };

    ProxyTarget {
        protocol,
        host: host.to_string(),
        port,
    }
}

/// `host:port` or `[v6]:port`. `None` when there is no port segment or the
/// host is ambiguous (bare IPv6).
pub(crate) fn split_host_port(value: &str) -> Option<(&str, &str)> {
    if let Some(rest) = value.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        return Some((host, port));
    }
    let (host, port) = value.split_once(':')?;
    if port.contains(':') {
        return None;
    }
    Some((host, port))
}
