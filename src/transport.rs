//! Signal transport
//!
//! Builds one outbound GET request per signal against `<server_url>/api/v1/`
//! and fires it on a runtime owned by the transport. Delivery is
//! best-effort: network and read failures are logged and dropped, response
//! bodies are read and discarded.

use std::sync::mpsc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::config::TelemetryConfig;
use crate::error::{Error, Result};

/// One outbound telemetry signal: a path under `/api/v1/` plus its query
/// parameters.
///
/// Every value is percent-encoded as the parameter is added, so
/// user-supplied free text can never leak unescaped into the query string.
/// Encoding is the identity on UUIDs and ordinals.
#[derive(Debug, Clone)]
pub(crate) struct Signal {
    path: &'static str,
    query: Vec<(&'static str, String)>,
}

impl Signal {
    pub(crate) fn new(path: &'static str) -> Self {
        Self {
            path,
            query: Vec::new(),
        }
    }

    pub(crate) fn param(mut self, key: &'static str, value: &str) -> Self {
        self.query.push((key, urlencoding::encode(value).into_owned()));
        self
    }

    pub(crate) fn device(self, device: Device) -> Self {
        match device {
            Device::Native => self
                .param("os", std::env::consts::OS)
                .param("arch", std::env::consts::ARCH),
            Device::Server => self.param("device", "server"),
            Device::Web => self.param("device", "web"),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        let mut url = format!("{}/{}", endpoint, self.path);
        for (i, (key, value)) in self.query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
        url
    }
}

/// Device descriptor attached to session-start signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Device {
    /// Native desktop process; reports OS and architecture.
    Native,
    /// Server process reporting for itself.
    Server,
    /// Remote browser-like client proxied by a server.
    Web,
}

/// HTTP transport shared by all of a session's signals.
///
/// Owns the reqwest client and a small Tokio runtime; one task is spawned
/// per fire-and-forget signal. Dropping the transport stops any background
/// sends still in flight.
pub(crate) struct Transport {
    client: reqwest::Client,
    endpoint: String,
    runtime: tokio::runtime::Runtime,
}

impl Transport {
    pub(crate) fn new(config: &TelemetryConfig, access_code: &str) -> Result<Self> {
        let endpoint = format!("{}/api/v1", config.server_url.trim_end_matches('/'));

        let mut headers = HeaderMap::new();
        headers.insert(
            "AccessCode",
            HeaderValue::from_str(access_code)
                .map_err(|e| Error::Config(format!("invalid access code: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Transport(format!("failed to create HTTP client: {}", e)))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("xavier-telemetry")
            .enable_all()
            .build()
            .map_err(|e| Error::Transport(format!("failed to create runtime: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            runtime,
        })
    }

    /// Fire-and-forget dispatch: the request runs on the transport runtime
    /// and the caller returns immediately.
    pub(crate) fn send(&self, signal: Signal) {
        let client = self.client.clone();
        let url = signal.url(&self.endpoint);
        self.runtime.spawn(dispatch(client, url));
    }

    /// Blocking dispatch: returns once the request attempt has resolved,
    /// successfully or not.
    ///
    /// Waits on a completion channel rather than `block_on`, so the call is
    /// also safe from a thread that is already inside a Tokio runtime.
    pub(crate) fn send_wait(&self, signal: Signal) {
        let client = self.client.clone();
        let url = signal.url(&self.endpoint);

        let (tx, rx) = mpsc::channel();
        self.runtime.spawn(async move {
            dispatch(client, url).await;
            let _ = tx.send(());
        });
        let _ = rx.recv();
    }
}

async fn dispatch(client: reqwest::Client, url: String) {
    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "failed to send telemetry");
            return;
        }
    };

    match response.text().await {
        Ok(body) if !body.is_empty() => tracing::debug!(%body, "telemetry server replied"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "failed to read telemetry response"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_url() {
        let url = Signal::new("event")
            .param("name", "launch")
            .param("session", "s1")
            .url("http://localhost/api/v1");
        assert_eq!(url, "http://localhost/api/v1/event?name=launch&session=s1");
    }

    #[test]
    fn test_signal_url_single_param() {
        let url = Signal::new("sessionend")
            .param("uuid", "s1")
            .url("http://localhost/api/v1");
        assert_eq!(url, "http://localhost/api/v1/sessionend?uuid=s1");
    }

    #[test]
    fn test_signal_encodes_free_text() {
        let url = Signal::new("feedback")
            .param("detail", "50% done & happy")
            .url("http://localhost/api/v1");
        assert_eq!(
            url,
            "http://localhost/api/v1/feedback?detail=50%25%20done%20%26%20happy"
        );
    }

    #[test]
    fn test_device_params() {
        let url = Signal::new("session").device(Device::Server).url("http://x/api/v1");
        assert_eq!(url, "http://x/api/v1/session?device=server");

        let url = Signal::new("session").device(Device::Web).url("http://x/api/v1");
        assert_eq!(url, "http://x/api/v1/session?device=web");

        let url = Signal::new("session").device(Device::Native).url("http://x/api/v1");
        assert!(url.contains(&format!("os={}", std::env::consts::OS)));
        assert!(url.contains(&format!("arch={}", std::env::consts::ARCH)));
    }

    #[test]
    fn test_transport_rejects_invalid_access_code() {
        let config = TelemetryConfig::default();
        assert!(Transport::new(&config, "bad\ncode").is_err());
    }

    #[test]
    fn test_transport_with_default_config() {
        let config = TelemetryConfig::default();
        assert!(Transport::new(&config, "abc123").is_ok());
    }
}
