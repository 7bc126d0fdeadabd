//! Server multiplexing extension
//!
//! One reporting process relaying telemetry for many independently
//! identified client sessions it does not itself track. Every client
//! operation is a stateless relay of caller-supplied identifiers; session
//! uniqueness and user stability are the caller's responsibility.

use std::ops::Deref;

use uuid::Uuid;

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::session::Telemetry;
use crate::transport::{Device, Signal};

/// Telemetry instance for a server process reporting on behalf of many
/// remote clients.
///
/// Derefs to [`Telemetry`], so the per-instance reporting API (events,
/// errors, close) remains available for the server's own session.
pub struct ServerTelemetry {
    inner: Telemetry,
}

impl ServerTelemetry {
    /// Open a telemetry instance and log the start of a new server session.
    ///
    /// The server session gets a fresh random session ID and no user ID;
    /// a server has no single end user.
    pub fn init(app_id: &str, access_code: &str) -> Result<Self> {
        Self::init_with_config(app_id, access_code, TelemetryConfig::from_env())
    }

    /// [`ServerTelemetry::init`] with an explicit configuration.
    pub fn init_with_config(
        app_id: &str,
        access_code: &str,
        config: TelemetryConfig,
    ) -> Result<Self> {
        let session_id = Uuid::new_v4().to_string();
        let inner = Telemetry::new(
            app_id.to_string(),
            String::new(),
            session_id,
            access_code.to_string(),
            Device::Server,
            config,
        )?;
        Ok(Self { inner })
    }

    /// Start a new session for a specific client of this server.
    ///
    /// `session_id` must be globally unique for this session and `user_id`
    /// should be re-used across sessions for that user.
    pub fn client_session_start(&self, session_id: &str, user_id: &str) {
        self.inner.send(
            Signal::new("session")
                .param("uuid", session_id)
                .param("appID", self.inner.app_id())
                .param("user", user_id)
                .device(Device::Web),
        );
    }

    /// Mark a client session as ended, where possible.
    ///
    /// Blocks until the attempt has resolved; the ID should belong to a
    /// session opened with [`ServerTelemetry::client_session_start`].
    pub fn client_session_end(&self, session_id: &str) {
        self.inner
            .send_wait(Signal::new("sessionend").param("uuid", session_id));
    }

    /// Log a named event associated with a client session.
    ///
    /// Event names should be unique to your application for correct
    /// counting.
    pub fn client_event(&self, name: &str, session_id: &str) {
        self.inner.send(
            Signal::new("event")
                .param("name", name)
                .param("session", session_id),
        );
    }

    /// Associate a username and/or email with a client user.
    ///
    /// The user ID should have been connected to a session with
    /// [`ServerTelemetry::client_session_start`].
    pub fn client_user_info(&self, user_id: &str, username: &str, email: &str) {
        self.inner.send(
            Signal::new("user")
                .param("uuid", user_id)
                .param("username", username)
                .param("email", email),
        );
    }
}

impl Deref for ServerTelemetry {
    type Target = Telemetry;

    fn deref(&self) -> &Telemetry {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TelemetryConfig {
        TelemetryConfig {
            server_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_init_server_session() {
        let server = ServerTelemetry::init_with_config("app1", "abc", test_config()).unwrap();

        assert_eq!(server.app_id(), "app1");
        assert_eq!(server.user_id(), "");
        assert!(!server.session_id().is_empty());
    }

    #[test]
    fn test_server_sessions_are_unique() {
        let a = ServerTelemetry::init_with_config("app1", "abc", test_config()).unwrap();
        let b = ServerTelemetry::init_with_config("app1", "abc", test_config()).unwrap();
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_client_relay_does_not_track_sessions() {
        let server = ServerTelemetry::init_with_config("app1", "abc", test_config()).unwrap();

        // never started via this instance; the relay sends anyway
        server.client_event("load", "session-123");
        server.client_user_info("user-9", "n", "e@x.com");
        server.client_session_end("session-123");
    }
}
