//! Runtime environment detection
//!
//! Decides whether the process runs in a production context. The answer is
//! recomputed on every call; anything unknown or ambiguous counts as production.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detected runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Get the display name for this environment
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an environment name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown environment '{0}' (expected 'development' or 'production')")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}

/// Source of the production signal consumed by the logger
pub trait EnvironmentOracle: Send + Sync {
    /// Inspect the environment now
    fn detect(&self) -> Environment;

    fn is_production(&self) -> bool {
        self.detect().is_production()
    }
}

/// How the environment is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentMode {
    /// Use the override variable, then the hostname heuristics
    #[default]
    Auto,
    Development,
    Production,
}

/// Hostname patterns that identify development machines
///
/// A hostname matching any list is development; everything else is production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPolicy {
    /// Hostnames matched exactly
    #[serde(default = "default_exact")]
    pub exact: Vec<String>,
    /// Hostname prefixes, e.g. private address ranges
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,
    /// Substrings matched anywhere in the hostname
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_exact() -> Vec<String> {
    strings(&["localhost", "127.0.0.1", "::1"])
}

fn default_prefixes() -> Vec<String> {
    strings(&["192.168.", "10."])
}

fn default_suffixes() -> Vec<String> {
    strings(&[".local"])
}

fn default_markers() -> Vec<String> {
    strings(&[
        "localhost",
        "dev.",
        "-dev.",
        ".dev-",
        "preview",
        "staging",
        "-test.",
        ".test",
    ])
}

impl Default for HostPolicy {
    fn default() -> Self {
        Self {
            exact: default_exact(),
            prefixes: default_prefixes(),
            suffixes: default_suffixes(),
            markers: default_markers(),
        }
    }
}

impl HostPolicy {
    /// Classify a hostname (case-insensitive)
    pub fn classify(&self, host: &str) -> Environment {
        let host = host.trim().to_ascii_lowercase();
        if host.is_empty() {
            return Environment::Production;
        }

        let any = |list: &[String], test: fn(&str, &str) -> bool| {
            list.iter().any(|pattern| {
                let pattern = pattern.to_ascii_lowercase();
                !pattern.is_empty() && test(&host, &pattern)
            })
        };

        let development = any(&self.exact, |h, p| h == p)
            || any(&self.prefixes, |h, p| h.starts_with(p))
            || any(&self.suffixes, |h, p| h.ends_with(p))
            || any(&self.markers, |h, p| h.contains(p));

        if development {
            Environment::Development
        } else {
            Environment::Production
        }
    }
}

/// Reads the raw signals the oracle decides from
pub trait RuntimeProbe: Send + Sync {
    /// Explicit environment name, if one is set
    fn override_value(&self) -> Option<String>;

    fn hostname(&self) -> Option<String>;
}

/// Probe backed by environment variables and the OS hostname
#[derive(Debug, Clone)]
pub struct SystemProbe {
    /// Variable holding an explicit environment name
    pub override_var: String,
    /// Variable that replaces the OS hostname
    pub host_var: String,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self {
            override_var: "DEVLOG_ENV".to_string(),
            host_var: "DEVLOG_HOST".to_string(),
        }
    }
}

impl RuntimeProbe for SystemProbe {
    fn override_value(&self) -> Option<String> {
        non_empty_var(&self.override_var)
    }

    fn hostname(&self) -> Option<String> {
        non_empty_var(&self.host_var).or_else(os_hostname)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(unix)]
fn os_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes for the duration of the call
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return None;
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..len]).trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(unix))]
fn os_hostname() -> Option<String> {
    non_empty_var("COMPUTERNAME")
}

/// Default oracle: configured mode, then override variable, then hostname policy
pub struct HostEnvironment {
    mode: EnvironmentMode,
    policy: HostPolicy,
    probe: Box<dyn RuntimeProbe>,
}

impl HostEnvironment {
    pub fn new(mode: EnvironmentMode, policy: HostPolicy, probe: Box<dyn RuntimeProbe>) -> Self {
        Self {
            mode,
            policy,
            probe,
        }
    }
}

impl EnvironmentOracle for HostEnvironment {
    fn detect(&self) -> Environment {
        match self.mode {
            EnvironmentMode::Development => return Environment::Development,
            EnvironmentMode::Production => return Environment::Production,
            EnvironmentMode::Auto => {}
        }

        if let Some(raw) = self.probe.override_value() {
            return raw.parse().unwrap_or_else(|err: UnknownEnvironment| {
                tracing::debug!(error = %err, "treating unrecognized override as production");
                Environment::Production
            });
        }

        match self.probe.hostname() {
            Some(host) => self.policy.classify(&host),
            None => Environment::Production,
        }
    }
}

/// Oracle whose answer is set by the embedding application
///
/// Clones share the same flag.
#[derive(Debug, Clone)]
pub struct ManualEnvironment {
    production: Arc<AtomicBool>,
}

impl ManualEnvironment {
    pub fn new(environment: Environment) -> Self {
        Self {
            production: Arc::new(AtomicBool::new(environment.is_production())),
        }
    }

    pub fn set(&self, environment: Environment) {
        self.production
            .store(environment.is_production(), Ordering::SeqCst);
    }
}

impl EnvironmentOracle for ManualEnvironment {
    fn detect(&self) -> Environment {
        if self.production.load(Ordering::SeqCst) {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProbe {
        override_value: Mutex<Option<String>>,
        hostname: Mutex<Option<String>>,
    }

    impl FakeProbe {
        fn with(override_value: Option<&str>, hostname: Option<&str>) -> Self {
            Self {
                override_value: Mutex::new(override_value.map(String::from)),
                hostname: Mutex::new(hostname.map(String::from)),
            }
        }
    }

    impl RuntimeProbe for Arc<FakeProbe> {
        fn override_value(&self) -> Option<String> {
            self.override_value.lock().unwrap().clone()
        }

        fn hostname(&self) -> Option<String> {
            self.hostname.lock().unwrap().clone()
        }
    }

    fn oracle(mode: EnvironmentMode, probe: &Arc<FakeProbe>) -> HostEnvironment {
        HostEnvironment::new(mode, HostPolicy::default(), Box::new(Arc::clone(probe)))
    }

    #[test]
    fn test_host_policy_defaults() {
        let policy = HostPolicy::default();
        let cases = [
            ("localhost", Environment::Development),
            ("127.0.0.1", Environment::Development),
            ("192.168.1.100", Environment::Development),
            ("10.0.0.7", Environment::Development),
            ("printer.local", Environment::Development),
            ("dev.myapp.com", Environment::Development),
            ("myapp-dev.vercel.app", Environment::Development),
            ("preview-abc123.vercel.app", Environment::Development),
            ("staging.myapp.com", Environment::Development),
            ("myapp.com", Environment::Production),
            ("www.myapp.com", Environment::Production),
            ("myapp.vercel.app", Environment::Production),
        ];
        for (host, expected) in cases {
            assert_eq!(policy.classify(host), expected, "host {}", host);
        }
    }

    #[test]
    fn test_host_policy_is_case_insensitive() {
        let policy = HostPolicy::default();
        assert_eq!(policy.classify("LOCALHOST"), Environment::Development);
        assert_eq!(policy.classify("Staging.Example.com"), Environment::Development);
    }

    #[test]
    fn test_host_policy_empty_host_is_production() {
        assert_eq!(HostPolicy::default().classify("  "), Environment::Production);
    }

    #[test]
    fn test_custom_host_policy() {
        let policy = HostPolicy {
            exact: vec![],
            prefixes: vec!["172.16.".to_string()],
            suffixes: vec![".corp".to_string()],
            markers: vec![],
        };
        assert_eq!(policy.classify("172.16.4.2"), Environment::Development);
        assert_eq!(policy.classify("build.corp"), Environment::Development);
        assert_eq!(policy.classify("localhost"), Environment::Production);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Development));
        assert_eq!(
            " Production ".parse::<Environment>(),
            Ok(Environment::Production)
        );
        assert_eq!(
            "qa".parse::<Environment>(),
            Err(UnknownEnvironment("qa".to_string()))
        );
    }

    #[test]
    fn test_fixed_mode_ignores_probe() {
        let probe = Arc::new(FakeProbe::with(Some("production"), Some("myapp.com")));
        let env = oracle(EnvironmentMode::Development, &probe);
        assert_eq!(env.detect(), Environment::Development);

        let env = oracle(EnvironmentMode::Production, &probe);
        assert!(env.is_production());
    }

    #[test]
    fn test_override_wins_over_hostname() {
        let probe = Arc::new(FakeProbe::with(Some("development"), Some("myapp.com")));
        assert_eq!(
            oracle(EnvironmentMode::Auto, &probe).detect(),
            Environment::Development
        );
    }

    #[test]
    fn test_unknown_override_is_production() {
        let probe = Arc::new(FakeProbe::with(Some("sandbox"), Some("localhost")));
        assert!(oracle(EnvironmentMode::Auto, &probe).is_production());
    }

    #[test]
    fn test_missing_signals_are_production() {
        let probe = Arc::new(FakeProbe::default());
        assert!(oracle(EnvironmentMode::Auto, &probe).is_production());
    }

    #[test]
    fn test_detection_is_not_cached() {
        let probe = Arc::new(FakeProbe::with(None, Some("localhost")));
        let env = oracle(EnvironmentMode::Auto, &probe);
        assert_eq!(env.detect(), Environment::Development);

        *probe.hostname.lock().unwrap() = Some("myapp.com".to_string());
        assert_eq!(env.detect(), Environment::Production);
    }

    #[test]
    fn test_manual_environment_shared_flag() {
        let env = ManualEnvironment::new(Environment::Development);
        let handle = env.clone();
        assert!(!env.is_production());
        handle.set(Environment::Production);
        assert!(env.is_production());
    }
}
