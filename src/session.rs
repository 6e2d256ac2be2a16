//! Per-process session context
//!
//! Everything a producer stamps onto a record that is not taken from the
//! host notification itself: session and machine identifiers, the
//! environment tag, and the telemetry gate.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;

/// Environment tag used when neither config nor `EVROUTE_ENV` provide one
pub const DEFAULT_ENVIRONMENT: &str = "local";

#[derive(Debug)]
pub struct SessionContext {
    pub session_id: String,
    pub machine_id: String,
    pub environment: String,
    telemetry: AtomicBool,
    tracked_schemes: Vec<String>,
}

impl SessionContext {
    pub fn new(
        machine_id: impl Into<String>,
        environment: impl Into<String>,
        telemetry: bool,
        tracked_schemes: Vec<String>,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            machine_id: machine_id.into(),
            environment: environment.into(),
            telemetry: AtomicBool::new(telemetry),
            tracked_schemes: tracked_schemes.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Build the session from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let machine_id = config.machine_id.clone().unwrap_or_else(derive_machine_id);
        let environment = resolve_environment(config.environment.as_deref());

        let session = Self::new(machine_id, environment, config.telemetry, config.tracked_schemes.clone());
        log::info!(
            "Session {} on machine {} (environment: {}, telemetry: {})",
            session.session_id,
            short_id(&session.machine_id),
            session.environment,
            config.telemetry
        );
        session
    }

    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry.load(Ordering::Relaxed)
    }

    pub fn set_telemetry(&self, enabled: bool) {
        self.telemetry.store(enabled, Ordering::Relaxed);
    }

    /// Whether resources with this URI scheme are real, persisted files
    pub fn is_tracked_scheme(&self, scheme: &str) -> bool {
        self.tracked_schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme))
    }
}

/// Hex SHA-256 of the host name, or of "unknown" when it cannot be read
pub fn derive_machine_id() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{:x}", Sha256::digest(host.as_bytes()))
}

/// Leading characters of an id for log lines
fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}

fn resolve_environment(configured: Option<&str>) -> String {
    configured
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .or_else(|| std::env::var("EVROUTE_ENV").ok().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_id_is_hex_digest() {
        let id = derive_machine_id();
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, derive_machine_id());
    }

    #[test]
    fn test_configured_environment_wins() {
        assert_eq!(resolve_environment(Some("ssh-remote")), "ssh-remote");
    }

    #[test]
    fn test_blank_environment_falls_back() {
        // EVROUTE_ENV may or may not be set in the test environment
        let env = resolve_environment(Some("  "));
        assert!(!env.trim().is_empty());
    }

    #[test]
    fn test_non_ascii_machine_id_is_logged_safely() {
        log::set_max_level(log::LevelFilter::Info);
        let config = Config {
            machine_id: Some("workstationé1".to_string()),
            ..Config::default()
        };
        let session = SessionContext::from_config(&config);
        assert_eq!(session.machine_id, "workstationé1");
        assert_eq!(short_id("workstationé1"), "workstationé");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionContext::new("m", "local", true, vec!["file".to_string()]);
        let b = SessionContext::new("m", "local", true, vec!["file".to_string()]);
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_tracked_scheme_is_case_insensitive() {
        let session = SessionContext::new("m", "local", true, vec!["File".to_string()]);
        assert!(session.is_tracked_scheme("file"));
        assert!(session.is_tracked_scheme("FILE"));
        assert!(!session.is_tracked_scheme("untitled"));
    }

    #[test]
    fn test_telemetry_toggle() {
        let session = SessionContext::new("m", "local", true, vec![]);
        assert!(session.telemetry_enabled());
        session.set_telemetry(false);
        assert!(!session.telemetry_enabled());
    }
}
