//! Worker configuration.
//!
//! The deployed worker is configured entirely through its environment; the
//! values are read once into an explicit `WorkerConfig` that is handed to the
//! coordinator at construction. Nothing below reads the environment again.

use thiserror::Error;

use crate::domain::WorkflowIdentity;

pub const ENV_INSTANCE_ID: &str = "WORKFLOW_INSTANCE_ID";
pub const ENV_EXTENSION_ID: &str = "WORKFLOW_EXTENSION_ID";
pub const ENV_BROKER_URL: &str = "REDIS_HOST_URL";
pub const ENV_BROKER_USERNAME: &str = "REDIS_USERNAME";
pub const ENV_BROKER_PASSWORD: &str = "REDIS_PASSWORD";
pub const ENV_CHANNEL_IN: &str = "REDIS_CHANNEL_IN";
pub const ENV_CHANNEL_OUT: &str = "REDIS_CHANNEL_OUT";
pub const ENV_CHANNEL_READY: &str = "REDIS_CHANNEL_READY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Channel names are opaque to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    pub input: String,
    pub output: String,
    pub ready: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub broker: BrokerConfig,
    pub channels: Channels,
    pub identity: WorkflowIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("input channel '{channel}' must differ from the {other} channel")]
    ChannelClash { channel: String, other: &'static str },
}

/// Every problem found, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {}", join_issues(.0))]
pub struct ConfigError(pub Vec<ConfigIssue>);

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl WorkerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut issues = Vec::new();
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut require = |key: &'static str| {
            get(key).unwrap_or_else(|| {
                issues.push(ConfigIssue::Missing(key));
                String::new()
            })
        };

        let instance_id = require(ENV_INSTANCE_ID);
        let extension_id = require(ENV_EXTENSION_ID);
        let url = require(ENV_BROKER_URL);
        let input = require(ENV_CHANNEL_IN);
        let output = require(ENV_CHANNEL_OUT);
        let ready = require(ENV_CHANNEL_READY);

        if !issues.is_empty() {
            return Err(ConfigError(issues));
        }

        let config = Self {
            broker: BrokerConfig {
                url,
                username: get(ENV_BROKER_USERNAME),
                password: get(ENV_BROKER_PASSWORD),
            },
            channels: Channels {
                input,
                output,
                ready,
            },
            identity: WorkflowIdentity::new(instance_id, extension_id),
        };
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks that serde and the env reader cannot express.
    ///
    /// The input channel must not be the output or ready channel, or the
    /// worker would consume its own messages.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();
        for (name, value) in [
            (ENV_INSTANCE_ID, &self.identity.instance_id),
            (ENV_EXTENSION_ID, &self.identity.extension_id),
            (ENV_BROKER_URL, &self.broker.url),
            (ENV_CHANNEL_IN, &self.channels.input),
            (ENV_CHANNEL_OUT, &self.channels.output),
            (ENV_CHANNEL_READY, &self.channels.ready),
        ] {
            if value.trim().is_empty() {
                issues.push(ConfigIssue::Missing(name));
            }
        }
        if !self.channels.input.is_empty() {
            if self.channels.input == self.channels.output {
                issues.push(ConfigIssue::ChannelClash {
                    channel: self.channels.input.clone(),
                    other: "output",
                });
            }
            if self.channels.input == self.channels.ready {
                issues.push(ConfigIssue::ChannelClash {
                    channel: self.channels.input.clone(),
                    other: "ready",
                });
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError(issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn complete() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_INSTANCE_ID, "wi-1"),
            (ENV_EXTENSION_ID, "we-1"),
            (ENV_BROKER_URL, "redis://127.0.0.1:6379"),
            (ENV_CHANNEL_IN, "wi-1:in"),
            (ENV_CHANNEL_OUT, "wi-1:out"),
            (ENV_CHANNEL_READY, "wi-1:ready"),
        ]
    }

    #[test]
    fn reads_complete_environment() {
        let mut pairs = complete();
        pairs.push((ENV_BROKER_USERNAME, "worker"));
        pairs.push((ENV_BROKER_PASSWORD, "pw"));

        let config = WorkerConfig::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.identity, WorkflowIdentity::new("wi-1", "we-1"));
        assert_eq!(config.channels.input, "wi-1:in");
        assert_eq!(config.channels.output, "wi-1:out");
        assert_eq!(config.channels.ready, "wi-1:ready");
        assert_eq!(config.broker.username.as_deref(), Some("worker"));
        assert_eq!(config.broker.password.as_deref(), Some("pw"));
    }

    #[test]
    fn blank_credentials_are_none() {
        let mut pairs = complete();
        pairs.push((ENV_BROKER_USERNAME, ""));

        let config = WorkerConfig::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.broker.username, None);
        assert_eq!(config.broker.password, None);
    }

    #[test]
    fn reports_every_missing_variable() {
        let err = WorkerConfig::from_lookup(env(&[(ENV_INSTANCE_ID, "wi-1"), (ENV_CHANNEL_OUT, " ")]))
            .unwrap_err();

        assert_eq!(
            err.0,
            vec![
                ConfigIssue::Missing(ENV_EXTENSION_ID),
                ConfigIssue::Missing(ENV_BROKER_URL),
                ConfigIssue::Missing(ENV_CHANNEL_IN),
                ConfigIssue::Missing(ENV_CHANNEL_OUT),
                ConfigIssue::Missing(ENV_CHANNEL_READY),
            ]
        );
        assert!(err.to_string().starts_with("invalid configuration: WORKFLOW_EXTENSION_ID is not set, "));
    }

    #[test]
    fn input_channel_must_be_distinct() {
        let mut pairs = complete();
        pairs.retain(|(k, _)| *k != ENV_CHANNEL_OUT);
        pairs.push((ENV_CHANNEL_OUT, "wi-1:in"));

        let err = WorkerConfig::from_lookup(env(&pairs)).unwrap_err();
        assert_eq!(
            err.0,
            vec![ConfigIssue::ChannelClash {
                channel: "wi-1:in".into(),
                other: "output",
            }]
        );
    }
}
