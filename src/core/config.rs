//! Startup configuration read from the environment.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_DUE_WINDOW_SECS: u64 = 300;
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 10;
/// Upper bound for every reminder timing setting
const MAX_REMINDER_SETTING_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// Signing secret for issued tokens. Required, no fallback.
    pub token_secret: String,
    pub log_level: String,
    pub reminders: ReminderSettings,
    /// JSON seed document applied at startup
    pub seed_file: Option<PathBuf>,
}

/// Timing knobs for the reminder scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    /// Time between sweeps
    pub sweep_interval: Duration,
    /// How far ahead of now a reminder counts as due
    pub due_window: Duration,
    /// Upper bound for a single notification delivery
    pub delivery_timeout: Duration,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        ReminderSettings {
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            due_window: Duration::from_secs(DEFAULT_DUE_WINDOW_SECS),
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
        }
    }
}

impl ReminderSettings {
    /// A window narrower than the sweep interval lets reminders slip between sweeps
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            anyhow::bail!("reminder sweep interval must be greater than zero");
        }
        if self.delivery_timeout.is_zero() {
            anyhow::bail!("reminder delivery timeout must be greater than zero");
        }
        for (name, value) in [
            ("sweep interval", self.sweep_interval),
            ("due window", self.due_window),
            ("delivery timeout", self.delivery_timeout),
        ] {
            if value.as_secs() > MAX_REMINDER_SETTING_SECS {
                anyhow::bail!(
                    "reminder {name} ({}s) exceeds the maximum of {MAX_REMINDER_SETTING_SECS}s",
                    value.as_secs()
                );
            }
        }
        if self.due_window < self.sweep_interval {
            anyhow::bail!(
                "reminder due window ({}s) must not be shorter than the sweep interval ({}s)",
                self.due_window.as_secs(),
                self.sweep_interval.as_secs()
            );
        }
        Ok(())
    }
}

impl Config {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token_secret = lookup("TOKEN_SECRET")
            .filter(|s| !s.trim().is_empty())
            .context("TOKEN_SECRET must be set")?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let reminders = ReminderSettings {
            sweep_interval: secs_var(
                &lookup,
                "REMINDER_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?,
            due_window: secs_var(&lookup, "REMINDER_DUE_WINDOW_SECS", DEFAULT_DUE_WINDOW_SECS)?,
            delivery_timeout: secs_var(
                &lookup,
                "REMINDER_DELIVERY_TIMEOUT_SECS",
                DEFAULT_DELIVERY_TIMEOUT_SECS,
            )?,
        };
        reminders.validate()?;

        let seed_file = lookup("SEED_FILE")
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Ok(Config {
            token_secret,
            log_level,
            reminders,
            seed_file,
        })
    }
}

fn secs_var<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole number of seconds, got {raw:?}"))?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(Duration::from_secs(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("TOKEN_SECRET"));

        assert!(Config::from_lookup(lookup_from(&[("TOKEN_SECRET", "  ")])).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("TOKEN_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.token_secret, "s3cret");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.reminders, ReminderSettings::default());
        assert_eq!(config.reminders.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.reminders.due_window, Duration::from_secs(300));
        assert_eq!(config.seed_file, None);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("TOKEN_SECRET", "s3cret"),
            ("LOG_LEVEL", "debug"),
            ("REMINDER_SWEEP_INTERVAL_SECS", "30"),
            ("REMINDER_DUE_WINDOW_SECS", "120"),
            ("REMINDER_DELIVERY_TIMEOUT_SECS", "5"),
            ("SEED_FILE", "data/seed.json"),
        ]))
        .unwrap();
        assert_eq!(config.seed_file, Some(PathBuf::from("data/seed.json")));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.reminders.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.reminders.due_window, Duration::from_secs(120));
        assert_eq!(config.reminders.delivery_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_window_shorter_than_interval_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("TOKEN_SECRET", "s3cret"),
            ("REMINDER_SWEEP_INTERVAL_SECS", "600"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_number_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("TOKEN_SECRET", "s3cret"),
            ("REMINDER_DELIVERY_TIMEOUT_SECS", "soon"),
        ]));
        assert!(result.is_err());

        let result = Config::from_lookup(lookup_from(&[
            ("TOKEN_SECRET", "s3cret"),
            ("REMINDER_DELIVERY_TIMEOUT_SECS", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_settings_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("TOKEN_SECRET", "s3cret"),
            ("REMINDER_DUE_WINDOW_SECS", "9000000000000"),
        ]));
        assert!(result.unwrap_err().to_string().contains("due window"));

        let result = Config::from_lookup(lookup_from(&[
            ("TOKEN_SECRET", "s3cret"),
            ("REMINDER_SWEEP_INTERVAL_SECS", "700000"),
            ("REMINDER_DUE_WINDOW_SECS", "700000"),
        ]));
        assert!(result.is_err());

        let week = Duration::from_secs(MAX_REMINDER_SETTING_SECS);
        let widest = ReminderSettings {
            sweep_interval: week,
            due_window: week,
            delivery_timeout: week,
        };
        assert!(widest.validate().is_ok());
    }

    #[test]
    fn test_blank_seed_file_ignored() {
        let config =
            Config::from_lookup(lookup_from(&[("TOKEN_SECRET", "s3cret"), ("SEED_FILE", " ")]))
                .unwrap();
        assert_eq!(config.seed_file, None);
    }
}
