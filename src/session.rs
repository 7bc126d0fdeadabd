//! Telemetry session client
//!
//! One [`Telemetry`] value represents one running instance of the monitored
//! application. Initialization announces the session start, reporting calls
//! are fire-and-forget, and [`Telemetry::close`] blocks until the
//! session-end attempt has resolved.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::stack::{capture_stack, panic_message};
use crate::store::IdentityStore;
use crate::transport::{Device, Signal, Transport};

/// Identity store key for the stable per-installation user ID.
pub const PREF_USER_KEY: &str = "fynelabs.telemetry.user";
/// Identity store key for the cached username.
pub const PREF_USERNAME_KEY: &str = "fynelabs.telemetry.username";
/// Identity store key for the cached email.
pub const PREF_EMAIL_KEY: &str = "fynelabs.telemetry.email";

/// Emotional response attached to user feedback, ordered most negative to
/// most positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Feeling {
    Frustrated = 0,
    Sad = 1,
    Happy = 2,
    Excited = 3,
}

impl Feeling {
    /// Wire ordinal carried by the feedback signal.
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// Host application integration for [`Telemetry::init`]: a stable
/// installation identifier plus the host's preference storage.
pub trait HostApp {
    /// Stable unique identifier for this application installation.
    fn unique_id(&self) -> String;

    /// The host's persistent preference storage.
    fn preferences(&self) -> Arc<dyn IdentityStore>;
}

#[derive(Default)]
struct UserDetails {
    username: String,
    email: String,
}

/// A telemetry reporting session.
///
/// All identifiers are fixed at initialization; the only mutable state is
/// the local username/email cache, written from the calling thread inside
/// [`Telemetry::user_info`]. Reporting calls never block and never fail.
pub struct Telemetry {
    app_id: String,
    access_code: String,
    user_id: String,
    session_id: String,
    transport: Transport,
    store: Option<Arc<dyn IdentityStore>>,
    details: Mutex<UserDetails>,
}

impl Telemetry {
    /// Open a telemetry session for a host application and log the start of
    /// a new session.
    ///
    /// The app ID comes from the host's unique ID. The user ID is read from
    /// the host's preference storage, or generated and persisted on first
    /// run; cached username/email are loaded for [`Telemetry::has_user_info`].
    pub fn init(host: &dyn HostApp, access_code: &str) -> Result<Self> {
        Self::init_with_config(host, access_code, TelemetryConfig::from_env())
    }

    /// [`Telemetry::init`] with an explicit configuration.
    pub fn init_with_config(
        host: &dyn HostApp,
        access_code: &str,
        config: TelemetryConfig,
    ) -> Result<Self> {
        let store = host.preferences();

        let user_id = match store.get(PREF_USER_KEY) {
            Some(id) if !id.is_empty() => id,
            _ => {
                let id = Uuid::new_v4().to_string();
                store.set(PREF_USER_KEY, &id);
                id
            }
        };
        let session_id = Uuid::new_v4().to_string();

        let mut telemetry = Self::new(
            host.unique_id(),
            user_id,
            session_id,
            access_code.to_string(),
            Device::Native,
            config,
        )?;

        {
            let mut details = telemetry.lock_details();
            details.username = store.get(PREF_USERNAME_KEY).unwrap_or_default();
            details.email = store.get(PREF_EMAIL_KEY).unwrap_or_default();
        }
        telemetry.store = Some(store);

        Ok(telemetry)
    }

    /// Open a telemetry session with caller-managed identifiers and log the
    /// start of a new session.
    ///
    /// The app ID refers to any instance of the app, the user ID should be
    /// stable across launches, and the session ID must be unique for every
    /// invocation.
    pub fn init_with_ids(
        app_id: &str,
        user_id: &str,
        session_id: &str,
        access_code: &str,
    ) -> Result<Self> {
        Self::init_with_ids_and_config(
            app_id,
            user_id,
            session_id,
            access_code,
            TelemetryConfig::from_env(),
        )
    }

    /// [`Telemetry::init_with_ids`] with an explicit configuration.
    pub fn init_with_ids_and_config(
        app_id: &str,
        user_id: &str,
        session_id: &str,
        access_code: &str,
        config: TelemetryConfig,
    ) -> Result<Self> {
        Self::new(
            app_id.to_string(),
            user_id.to_string(),
            session_id.to_string(),
            access_code.to_string(),
            Device::Native,
            config,
        )
    }

    pub(crate) fn new(
        app_id: String,
        user_id: String,
        session_id: String,
        access_code: String,
        device: Device,
        config: TelemetryConfig,
    ) -> Result<Self> {
        let transport = Transport::new(&config, &access_code)?;

        let telemetry = Self {
            app_id,
            access_code,
            user_id,
            session_id,
            transport,
            store: None,
            details: Mutex::new(UserDetails::default()),
        };
        telemetry.session_start(device);
        Ok(telemetry)
    }

    fn session_start(&self, device: Device) {
        self.transport.send(
            Signal::new("session")
                .param("uuid", &self.session_id)
                .param("appID", &self.app_id)
                .param("user", &self.user_id)
                .device(device),
        );
    }

    /// Log a named event.
    ///
    /// Event names should be unique to your application for correct
    /// counting; the name is passed through verbatim.
    pub fn event(&self, name: &str) {
        self.transport.send(
            Signal::new("event")
                .param("name", name)
                .param("session", &self.session_id),
        );
    }

    /// Submit user feedback: a feeling plus free-text detail.
    pub fn feedback(&self, feeling: Feeling, detail: &str) {
        self.transport.send(
            Signal::new("feedback")
                .param("feeling", &feeling.ordinal().to_string())
                .param("detail", detail)
                .param("session", &self.session_id),
        );
    }

    /// Associate a username and/or email with the current user.
    ///
    /// An empty field means "do not update that field"; it never clears a
    /// previously set value. When host-bound, updated fields also persist
    /// to the identity store. The association connects to all sessions for
    /// the current user.
    pub fn user_info(&self, username: &str, email: &str) {
        {
            let mut details = self.lock_details();
            if !username.is_empty() {
                details.username = username.to_string();
                if let Some(store) = &self.store {
                    store.set(PREF_USERNAME_KEY, username);
                }
            }
            if !email.is_empty() {
                details.email = email.to_string();
                if let Some(store) = &self.store {
                    store.set(PREF_EMAIL_KEY, email);
                }
            }
        }

        self.transport.send(
            Signal::new("user")
                .param("uuid", &self.user_id)
                .param("username", username)
                .param("email", email),
        );
    }

    /// True if the current user has information (email or username) set.
    pub fn has_user_info(&self) -> bool {
        let details = self.lock_details();
        !details.username.is_empty() || !details.email.is_empty()
    }

    /// Report an error with a stack trace starting at the calling frame.
    pub fn error(&self, err: &dyn std::error::Error) {
        self.report_error(&err.to_string(), &self.session_id);
    }

    /// Report an error against a caller-supplied session ID.
    ///
    /// The session should have been started with
    /// [`crate::ServerTelemetry::client_session_start`].
    pub fn user_error(&self, err: &dyn std::error::Error, session_id: &str) {
        self.report_error(&err.to_string(), session_id);
    }

    fn report_error(&self, detail: &str, session_id: &str) {
        // capture before queueing; the calling frames unwind by send time
        let stack = capture_stack();
        self.transport.send(error_signal(detail, &stack, session_id));
    }

    /// End the session.
    ///
    /// Blocks until the session-end attempt has resolved so a send at
    /// process exit is not abandoned mid-flight. Call at the end of the
    /// app's `main`.
    pub fn close(&self) {
        self.transport
            .send_wait(Signal::new("sessionend").param("uuid", &self.session_id));
    }

    /// Run the host's blocking run loop inside a crash reporting boundary.
    ///
    /// An unrecovered panic is reported as an error, with the stack captured
    /// at the panic site, then re-raised so the process still terminates
    /// with the original fault.
    pub fn run_with_crash_reporting<F>(&self, run: F)
    where
        F: FnOnce(),
    {
        let panic_stack: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        // the causing stack has unwound by the time catch_unwind returns the
        // payload, so record it from a hook at the panic site
        let slot = Arc::clone(&panic_stack);
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |_info| {
            let stack = capture_stack();
            *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(stack);
        }));

        let result = panic::catch_unwind(AssertUnwindSafe(run));

        drop(panic::take_hook());
        panic::set_hook(previous);

        if let Err(payload) = result {
            let message = panic_message(payload.as_ref());
            tracing::error!(%message, "unrecovered panic in run loop");

            let stack = panic_stack
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take()
                .unwrap_or_default();
            // synchronous so the report gets out before the fault resumes
            self.transport
                .send_wait(error_signal(&message, &stack, &self.session_id));

            panic::resume_unwind(payload);
        }
    }

    /// The application identifier this session reports under.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The developer access code for the collection service.
    pub fn access_code(&self) -> &str {
        &self.access_code
    }

    /// The stable per-installation user identifier.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The unique identifier for this run of the application.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn send(&self, signal: Signal) {
        self.transport.send(signal);
    }

    pub(crate) fn send_wait(&self, signal: Signal) {
        self.transport.send_wait(signal);
    }

    fn lock_details(&self) -> MutexGuard<'_, UserDetails> {
        // a poisoned lock only means a caller panicked mid-update; the
        // cache itself is still usable
        self.details.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn error_signal(detail: &str, stack: &str, session_id: &str) -> Signal {
    Signal::new("error")
        .param("detail", detail)
        .param("stack", stack)
        .param("session", session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    // nothing listens here; sends fail fast and are dropped, which is all
    // these logic tests need
    fn test_config() -> TelemetryConfig {
        TelemetryConfig {
            server_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
        }
    }

    struct TestHost {
        store: Arc<MemoryStore>,
    }

    impl HostApp for TestHost {
        fn unique_id(&self) -> String {
            "com.example.testapp".to_string()
        }

        fn preferences(&self) -> Arc<dyn IdentityStore> {
            Arc::clone(&self.store) as Arc<dyn IdentityStore>
        }
    }

    #[test]
    fn test_feeling_ordinals() {
        assert_eq!(Feeling::Frustrated.ordinal(), 0);
        assert_eq!(Feeling::Sad.ordinal(), 1);
        assert_eq!(Feeling::Happy.ordinal(), 2);
        assert_eq!(Feeling::Excited.ordinal(), 3);
        assert!(Feeling::Frustrated < Feeling::Excited);
    }

    #[test]
    fn test_init_with_ids_keeps_identifiers() {
        let telemetry =
            Telemetry::init_with_ids_and_config("app1", "u1", "s1", "abc", test_config()).unwrap();

        assert_eq!(telemetry.app_id(), "app1");
        assert_eq!(telemetry.user_id(), "u1");
        assert_eq!(telemetry.session_id(), "s1");
        assert_eq!(telemetry.access_code(), "abc");
    }

    #[test]
    fn test_init_generates_and_persists_user_id() {
        let store = Arc::new(MemoryStore::new());
        let host = TestHost {
            store: Arc::clone(&store),
        };

        let first = Telemetry::init_with_config(&host, "abc", test_config()).unwrap();
        let persisted = store.get(PREF_USER_KEY).expect("user ID should persist");
        assert_eq!(first.user_id(), persisted);

        let second = Telemetry::init_with_config(&host, "abc", test_config()).unwrap();
        assert_eq!(second.user_id(), persisted);
        assert_ne!(first.session_id(), second.session_id());
    }

    #[test]
    fn test_init_loads_cached_user_details() {
        let store = Arc::new(MemoryStore::new());
        store.set(PREF_USERNAME_KEY, "alice");
        let host = TestHost {
            store: Arc::clone(&store),
        };

        let telemetry = Telemetry::init_with_config(&host, "abc", test_config()).unwrap();
        assert!(telemetry.has_user_info());
    }

    #[test]
    fn test_user_info_empty_fields_do_not_clear() {
        let store = Arc::new(MemoryStore::new());
        let host = TestHost {
            store: Arc::clone(&store),
        };
        let telemetry = Telemetry::init_with_config(&host, "abc", test_config()).unwrap();

        assert!(!telemetry.has_user_info());

        telemetry.user_info("alice", "");
        assert!(telemetry.has_user_info());
        assert_eq!(store.get(PREF_USERNAME_KEY), Some("alice".to_string()));
        assert_eq!(store.get(PREF_EMAIL_KEY), None);

        telemetry.user_info("", "");
        assert_eq!(store.get(PREF_USERNAME_KEY), Some("alice".to_string()));
        assert!(telemetry.has_user_info());

        telemetry.user_info("", "alice@example.com");
        assert_eq!(
            store.get(PREF_EMAIL_KEY),
            Some("alice@example.com".to_string())
        );
        assert_eq!(store.get(PREF_USERNAME_KEY), Some("alice".to_string()));
    }

    #[test]
    fn test_has_user_info_without_store() {
        let telemetry =
            Telemetry::init_with_ids_and_config("app1", "u1", "s1", "abc", test_config()).unwrap();

        assert!(!telemetry.has_user_info());
        telemetry.user_info("", "bob@example.com");
        assert!(telemetry.has_user_info());
    }

    #[test]
    fn test_close_returns_after_failed_attempt() {
        let telemetry =
            Telemetry::init_with_ids_and_config("app1", "u1", "s1", "abc", test_config()).unwrap();
        // nothing listening; close must still return once the attempt fails
        telemetry.close();
    }
}
