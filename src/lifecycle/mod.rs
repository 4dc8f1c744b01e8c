//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → ConfigStore → initial site scan → watcher task
//!     → console task → admin API (listeners last)
//!
//! Shutdown (shutdown.rs):
//!     Signal or console "q" → broadcast → watcher exits, API drains → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then store, then background tasks, then API
//! - Every long-running task subscribes to the same shutdown broadcast

pub mod console;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
