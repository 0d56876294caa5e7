//! Process configuration, read from the environment (and `.env`) at startup.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    /// Guild to also register commands in, for quick iteration
    pub command_guild: Option<u64>,
    /// Greeting templates, one per line; the built-in pool when unset
    pub greetings_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let command_guild = match lookup("GUILD_ID") {
            Some(value) if !value.trim().is_empty() => {
                Some(value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                    name: "GUILD_ID",
                    value,
                })?)
            }
            _ => None,
        };

        let greetings_file = lookup("GREETINGS_FILE")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            discord_token: required("DISCORD_TOKEN")?,
            database_url: required("DATABASE_URL")?,
            command_guild,
            greetings_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_required_values() {
        let config = config(&[("DISCORD_TOKEN", "token"), ("DATABASE_URL", "sqlite:data/doorbell.db")])
            .unwrap();
        assert_eq!(config.discord_token, "token");
        assert_eq!(config.database_url, "sqlite:data/doorbell.db");
        assert_eq!(config.command_guild, None);
        assert_eq!(config.greetings_file, None);
    }

    #[test]
    fn test_greetings_file() {
        let config = config(&[
            ("DISCORD_TOKEN", "token"),
            ("DATABASE_URL", "sqlite:x.db"),
            ("GREETINGS_FILE", "greetings.txt"),
        ])
        .unwrap();
        assert_eq!(config.greetings_file, Some(PathBuf::from("greetings.txt")));
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(
            config(&[("DATABASE_URL", "sqlite:x.db")]).unwrap_err(),
            ConfigError::Missing("DISCORD_TOKEN")
        );
        assert_eq!(
            config(&[("DISCORD_TOKEN", "  "), ("DATABASE_URL", "sqlite:x.db")]).unwrap_err(),
            ConfigError::Missing("DISCORD_TOKEN")
        );
    }

    #[test]
    fn test_missing_database_url() {
        assert_eq!(
            config(&[("DISCORD_TOKEN", "token")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
    }

    #[test]
    fn test_command_guild() {
        let base = [("DISCORD_TOKEN", "token"), ("DATABASE_URL", "sqlite:x.db")];

        let mut vars = base.to_vec();
        vars.push(("GUILD_ID", "1234"));
        assert_eq!(config(&vars).unwrap().command_guild, Some(1234));

        let mut vars = base.to_vec();
        vars.push(("GUILD_ID", "home"));
        assert!(matches!(
            config(&vars).unwrap_err(),
            ConfigError::Invalid { name: "GUILD_ID", .. }
        ));
    }
}
