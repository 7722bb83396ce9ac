//! Worker configuration read from the environment.

use std::fmt;
use std::str::FromStr;

use kanban_messaging::{BrokerConfig, ConsumerOptions};

use crate::error::AppError;

/// A consuming service this process can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Activity,
    Notification,
}

impl Service {
    /// Queue prefix the service binds under.
    #[must_use]
    pub fn queue_prefix(self) -> &'static str {
        match self {
            Self::Activity => kanban_activity::QUEUE_PREFIX,
            Self::Notification => kanban_notification::QUEUE_PREFIX,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.queue_prefix())
    }
}

impl FromStr for Service {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activity" => Ok(Self::Activity),
            "notification" => Ok(Self::Notification),
            other => Err(AppError::Config(format!("unknown service '{other}'"))),
        }
    }
}

/// Everything the worker needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// When unset the worker keeps projections in memory.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub services: Vec<Service>,
    pub broker: BrokerConfig,
    pub consumer: ConsumerOptions,
}

impl AppConfig {
    /// Reads configuration through `lookup`.
    ///
    /// `SERVICES` is a comma-separated list; it defaults to both services.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an invalid port or service name, and
    /// wraps broker and consumer configuration errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };

        let services = match lookup("SERVICES") {
            Some(raw) => {
                let mut services = Vec::new();
                for name in raw.split(',').filter(|s| !s.trim().is_empty()) {
                    let service: Service = name.parse()?;
                    if !services.contains(&service) {
                        services.push(service);
                    }
                }
                if services.is_empty() {
                    return Err(AppError::Config("SERVICES names no service".to_owned()));
                }
                services
            }
            None => vec![Service::Activity, Service::Notification],
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
            services,
            broker: BrokerConfig::from_lookup(&lookup)?,
            consumer: ConsumerOptions::from_lookup(&lookup)?,
        })
    }

    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|key| map.get(key).map(|v| (*v).to_owned()))
    }

    #[test]
    fn test_defaults_host_both_services_in_memory() {
        let config = config(&[]).unwrap();

        assert_eq!(config.services, vec![Service::Activity, Service::Notification]);
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.broker.exchange, "kanban.events");
    }

    #[test]
    fn test_services_list_is_parsed_and_deduplicated() {
        let config = config(&[("SERVICES", "notification, Notification,")]).unwrap();

        assert_eq!(config.services, vec![Service::Notification]);
    }

    #[test]
    fn test_unknown_service_is_rejected() {
        let result = config(&[("SERVICES", "activity,billing")]);

        assert!(matches!(result, Err(AppError::Config(message)) if message.contains("billing")));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(matches!(config(&[("PORT", "http")]), Err(AppError::Config(_))));
    }

    #[test]
    fn test_broker_kind_is_read_with_the_broker_settings() {
        let config = config(&[("BROKER_KIND", "memory"), ("BROKER_HOST", "rabbit")]).unwrap();

        assert_eq!(config.broker.kind, kanban_messaging::BrokerKind::Memory);
        assert_eq!(config.broker.host, "rabbit");
    }

    #[test]
    fn test_broker_errors_surface_as_messaging_errors() {
        let result = config(&[("BROKER_PORT", "-1")]);

        assert!(matches!(result, Err(AppError::Messaging(_))));
    }
}
