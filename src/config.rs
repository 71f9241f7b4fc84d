//! Runtime configuration.
//!
//! Settings come from the command line first and the environment second:
//!
//! - `JOURNAL_FIREBASE_PROJECT_ID` / `--project-id`
//! - `JOURNAL_FIREBASE_API_KEY` / `--api-key`
//! - `JOURNAL_POLL_SECS` / `--poll-interval` (default 5, minimum 1)
//! - `JOURNAL_LOG_FILE` / `--log-file` (default `mood_journal.log`)
//! - `JOURNAL_LOG`: tracing filter directive (default `info`; `-v` forces `debug`)
//!
//! `--offline` skips Firebase entirely and keeps entries in memory.

use crate::cli::CliArgs;
use crate::errors::ConfigError;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_POLL_SECS: u64 = 5;
pub const DEFAULT_LOG_FILE: &str = "mood_journal.log";
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const ENV_PROJECT_ID: &str = "JOURNAL_FIREBASE_PROJECT_ID";
pub const ENV_API_KEY: &str = "JOURNAL_FIREBASE_API_KEY";
pub const ENV_POLL_SECS: &str = "JOURNAL_POLL_SECS";
pub const ENV_LOG_FILE: &str = "JOURNAL_LOG_FILE";
pub const ENV_LOG: &str = "JOURNAL_LOG";

/// Base URLs of the Google services the Firebase backend calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseEndpoints {
    pub identity: String,
    pub secure_token: String,
    pub firestore: String,
}

impl Default for FirebaseEndpoints {
    fn default() -> Self {
        FirebaseEndpoints {
            identity: "https://identitytoolkit.googleapis.com".to_string(),
            secure_token: "https://securetoken.googleapis.com".to_string(),
            firestore: "https://firestore.googleapis.com".to_string(),
        }
    }
}

impl FirebaseEndpoints {
    /// Every service behind one base URL, as with a local emulator or a mock.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        FirebaseEndpoints {
            identity: base.clone(),
            secure_token: base.clone(),
            firestore: base,
        }
    }
}

#[derive(Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub endpoints: FirebaseEndpoints,
    pub poll_interval: Duration,
}

impl fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("endpoints", &self.endpoints)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Backend {
    Offline,
    Firebase(FirebaseConfig),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub log_file: PathBuf,
    pub log_filter: String,
}

impl Config {
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Builds the configuration from parsed arguments and an environment
    /// lookup. Blank values count as unset.
    pub fn resolve<F>(args: &CliArgs, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |flag: &Option<String>, key: &str| {
            flag.clone()
                .or_else(|| env(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend = if args.offline {
            Backend::Offline
        } else {
            let project_id = lookup(&args.project_id, ENV_PROJECT_ID)
                .ok_or(ConfigError::Missing(ENV_PROJECT_ID))?;
            let api_key =
                lookup(&args.api_key, ENV_API_KEY).ok_or(ConfigError::Missing(ENV_API_KEY))?;
            Backend::Firebase(FirebaseConfig {
                api_key,
                project_id,
                endpoints: FirebaseEndpoints::default(),
                poll_interval: Self::poll_interval(args.poll_interval, &env)?,
            })
        };

        let log_file = args
            .log_file
            .clone()
            .or_else(|| env(ENV_LOG_FILE).filter(|v| !v.trim().is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

        let log_filter = if args.verbose {
            "debug".to_string()
        } else {
            env(ENV_LOG)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
        };

        Ok(Config {
            backend,
            log_file,
            log_filter,
        })
    }

    fn poll_interval<F>(flag: Option<u64>, env: &F) -> Result<Duration, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = match flag {
            Some(secs) => secs,
            None => match env(ENV_POLL_SECS) {
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: ENV_POLL_SECS,
                    reason: format!("'{raw}' is not a whole number of seconds"),
                })?,
                None => DEFAULT_POLL_SECS,
            },
        };
        if secs == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_POLL_SECS,
                reason: "must be at least 1 second".to_string(),
            });
        }
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn offline_needs_no_firebase_settings() {
        let args = CliArgs {
            offline: true,
            ..CliArgs::default()
        };
        let config = Config::resolve(&args, env_of(&[])).unwrap();
        assert!(matches!(config.backend, Backend::Offline));
        assert_eq!(config.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn firebase_settings_fall_back_to_environment() {
        let args = CliArgs {
            project_id: Some("from-flag".to_string()),
            ..CliArgs::default()
        };
        let env = env_of(&[
            (ENV_PROJECT_ID, "from-env"),
            (ENV_API_KEY, "secret"),
            (ENV_POLL_SECS, "12"),
        ]);
        let config = Config::resolve(&args, env).unwrap();
        let Backend::Firebase(firebase) = config.backend else {
            panic!("expected firebase backend");
        };
        assert_eq!(firebase.project_id, "from-flag");
        assert_eq!(firebase.api_key, "secret");
        assert_eq!(firebase.poll_interval, Duration::from_secs(12));
        assert!(!format!("{firebase:?}").contains("secret"));
    }

    #[test]
    fn missing_api_key_is_reported() {
        let env = env_of(&[(ENV_PROJECT_ID, "p"), (ENV_API_KEY, "  ")]);
        let err = Config::resolve(&CliArgs::default(), env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENV_API_KEY)));
    }

    #[test]
    fn zero_or_garbage_poll_interval_is_rejected() {
        let env = env_of(&[(ENV_PROJECT_ID, "p"), (ENV_API_KEY, "k")]);
        let args = CliArgs {
            poll_interval: Some(0),
            ..CliArgs::default()
        };
        assert!(Config::resolve(&args, &env).is_err());

        let env = env_of(&[(ENV_PROJECT_ID, "p"), (ENV_API_KEY, "k"), (ENV_POLL_SECS, "soon")]);
        assert!(matches!(
            Config::resolve(&CliArgs::default(), env),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn verbose_overrides_log_filter() {
        let args = CliArgs {
            offline: true,
            verbose: true,
            ..CliArgs::default()
        };
        let env = env_of(&[(ENV_LOG, "warn"), (ENV_LOG_FILE, "/tmp/j.log")]);
        let config = Config::resolve(&args, env).unwrap();
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.log_file, PathBuf::from("/tmp/j.log"));
    }

    #[test]
    fn endpoints_can_share_a_base() {
        let endpoints = FirebaseEndpoints::all_at("http://127.0.0.1:9099/");
        assert_eq!(endpoints.identity, "http://127.0.0.1:9099");
        assert_eq!(endpoints.firestore, endpoints.secure_token);
    }
}
