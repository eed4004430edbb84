use std::time::Duration;

use doseminder_core::reminder::ReminderSettings;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error raised while loading worker configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("Invalid reminder settings: {0}")]
    Settings(#[from] doseminder_core::CoreError),
}

// ---------------------------------------------------------------------------
// WorkerConfig
// ---------------------------------------------------------------------------

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    /// Validated scheduler timing.
    pub reminder: ReminderSettings,
    /// How long to wait for the scheduler to finish its cycle on shutdown.
    pub shutdown_timeout: Duration,
    /// Whether webhook targets are delivered to.
    pub webhook_delivery_enabled: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default    |
    /// |---------------------------------|------------|
    /// | `DATABASE_URL`                  | (required) |
    /// | `DATABASE_MAX_CONNECTIONS`      | `10`       |
    /// | `REMINDER_SHORTEST_NEXT_SECS`   | `300`      |
    /// | `REMINDER_UPDATE_INTERVAL_SECS` | `1800`     |
    /// | `REMINDER_ERROR_RETRY_SECS`     | `120`      |
    /// | `SHUTDOWN_TIMEOUT_SECS`         | `30`       |
    /// | `WEBHOOK_DELIVERY_ENABLED`      | `true`     |
    ///
    /// SMTP settings are read separately by
    /// [`doseminder_events::EmailConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let database_max_connections =
            parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32, "a positive integer")?;

        let defaults = ReminderSettings::default();
        let reminder = ReminderSettings {
            shortest_next_notification: secs_or(
                &lookup,
                "REMINDER_SHORTEST_NEXT_SECS",
                defaults.shortest_next_notification,
            )?,
            next_update_interval: secs_or(
                &lookup,
                "REMINDER_UPDATE_INTERVAL_SECS",
                defaults.next_update_interval,
            )?,
            next_update_interval_on_error: secs_or(
                &lookup,
                "REMINDER_ERROR_RETRY_SECS",
                defaults.next_update_interval_on_error,
            )?,
        };
        reminder.validate()?;

        let shutdown_timeout = secs_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", Duration::from_secs(30))?;

        let webhook_delivery_enabled =
            parse_or(&lookup, "WEBHOOK_DELIVERY_ENABLED", true, "true or false")?;

        Ok(Self {
            database_url,
            database_max_connections,
            reminder,
            shutdown_timeout,
            webhook_delivery_enabled,
        })
    }
}

fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}

fn secs_or<F>(lookup: &F, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, name, default.as_secs(), "a number of seconds").map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/doseminder")]).unwrap();
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.reminder, ReminderSettings::default());
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(config.webhook_delivery_enabled);
    }

    #[test]
    fn database_url_required() {
        assert_matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/doseminder"),
            ("REMINDER_SHORTEST_NEXT_SECS", "60"),
            ("REMINDER_UPDATE_INTERVAL_SECS", "600"),
            ("REMINDER_ERROR_RETRY_SECS", "30"),
            ("WEBHOOK_DELIVERY_ENABLED", "false"),
        ])
        .unwrap();

        assert_eq!(config.reminder.shortest_next_notification, Duration::from_secs(60));
        assert_eq!(config.reminder.next_update_interval, Duration::from_secs(600));
        assert_eq!(config.reminder.next_update_interval_on_error, Duration::from_secs(30));
        assert!(!config.webhook_delivery_enabled);
    }

    #[test]
    fn malformed_number_rejected() {
        assert_matches!(
            load(&[
                ("DATABASE_URL", "postgres://db/doseminder"),
                ("SHUTDOWN_TIMEOUT_SECS", "soon"),
            ]),
            Err(ConfigError::Invalid { name: "SHUTDOWN_TIMEOUT_SECS", .. })
        );
    }

    #[test]
    fn floor_above_window_rejected() {
        assert_matches!(
            load(&[
                ("DATABASE_URL", "postgres://db/doseminder"),
                ("REMINDER_SHORTEST_NEXT_SECS", "3600"),
            ]),
            Err(ConfigError::Settings(_))
        );
    }
}
