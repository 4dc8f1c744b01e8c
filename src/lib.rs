//! nginx site manager library.
//!
//! Keeps nginx server configs, their enabled/archived state and a directory
//! of app manifests in agreement, and reports which sites are alive.

pub mod api;
pub mod config;
pub mod control;
pub mod directive;
pub mod discovery;
pub mod error;
pub mod inspect;
pub mod lifecycle;
pub mod manifest;
pub mod observability;
pub mod store;

pub use config::ManagerConfig;
pub use control::{NginxControl, ProxyControl};
pub use discovery::{SiteEntry, SiteEnumerator};
pub use error::{ManagerError, Result};
pub use lifecycle::Shutdown;
pub use manifest::{Manifest, ManifestSync, ManifestWatcher};
pub use store::ConfigStore;
