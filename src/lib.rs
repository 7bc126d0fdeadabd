//! # xavier-telemetry
//!
//! Session and event telemetry reporting client for the Xavier service.
//!
//! This library provides:
//! - A per-process session model that announces its start and end
//! - Fire-and-forget reporting of events, feedback, errors and user identity
//! - A server multiplexing extension relaying many remote client sessions
//! - File-backed identity persistence across launches
//!
//! Delivery is best-effort by design: reporting calls never block, never
//! fail, and a dropped signal is only logged. The one exception is
//! [`Telemetry::close`], which blocks until the session-end attempt has
//! resolved so the final signal is not abandoned at process exit.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xavier_telemetry::{FileStore, HostApp, IdentityStore, Telemetry};
//!
//! struct App {
//!     store: Arc<FileStore>,
//! }
//!
//! impl HostApp for App {
//!     fn unique_id(&self) -> String {
//!         "com.example.editor".to_string()
//!     }
//!
//!     fn preferences(&self) -> Arc<dyn IdentityStore> {
//!         self.store.clone()
//!     }
//! }
//!
//! let app = App {
//!     store: Arc::new(FileStore::open("com.example.editor").expect("open identity store")),
//! };
//! let telemetry = Telemetry::init(&app, "access-code").expect("initialize telemetry");
//!
//! telemetry.event("launch");
//! // ... run the application ...
//! telemetry.close();
//! ```

// Re-export commonly used items at the crate root
pub use config::{LoggingConfig, TelemetryConfig, DEFAULT_SERVER_URL, SERVER_ENV};
pub use error::{Error, Result};
pub use server::ServerTelemetry;
pub use session::{
    Feeling, HostApp, Telemetry, PREF_EMAIL_KEY, PREF_USERNAME_KEY, PREF_USER_KEY,
};
pub use store::{FileStore, IdentityStore, MemoryStore};

// Public modules
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod session;
pub mod store;

// Internal plumbing
mod stack;
mod transport;
