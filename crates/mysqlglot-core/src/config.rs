//! MySQL connection settings.

use std::time::Duration;

use mysql::OptsBuilder;
use thiserror::Error;

/// Invalid connection settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MySQL: {0} not set")]
    EnvNotSet(&'static str),
    #[error("MySQL: invalid MYSQL_PORT {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Where and as whom to connect.
///
/// Built from the standard environment variables:
/// - MYSQL_HOST (default: localhost)
/// - MYSQL_PORT (default: 3306)
/// - MYSQL_USER (default: $USER)
/// - MYSQL_PASSWORD (default: none)
/// - MYSQL_SOCKET (default: none; takes precedence over host/port)
#[derive(Clone, PartialEq, Eq)]
pub struct MysqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub socket: Option<String>,
}

impl MysqlConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let user = lookup("MYSQL_USER")
            .or_else(|| lookup("USER"))
            .ok_or(ConfigError::EnvNotSet("MYSQL_USER or USER"))?;

        let port = match lookup("MYSQL_PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|source| ConfigError::InvalidPort { value, source })?,
            None => 3306,
        };

        Ok(Self {
            host: lookup("MYSQL_HOST").unwrap_or_else(|| "localhost".to_string()),
            port,
            user,
            password: lookup("MYSQL_PASSWORD").filter(|p| !p.is_empty()),
            socket: lookup("MYSQL_SOCKET").filter(|s| !s.is_empty()),
        })
    }

    /// Connection options with `timeout` applied to connect, read and write.
    pub fn opts(&self, timeout: Duration) -> OptsBuilder {
        let timeout = (!timeout.is_zero()).then_some(timeout);
        OptsBuilder::new()
            .ip_or_hostname(Some(self.host.clone()))
            .tcp_port(self.port)
            .socket(self.socket.clone())
            .user(Some(self.user.clone()))
            .pass(self.password.clone())
            .tcp_connect_timeout(timeout)
            .read_timeout(timeout)
            .write_timeout(timeout)
    }

    /// `user@host:port` (or `user@socket`), without the password.
    pub fn describe(&self) -> String {
        match &self.socket {
            Some(socket) => format!("{}@{}", self.user, socket),
            None => format!("{}@{}:{}", self.user, self.host, self.port),
        }
    }
}

impl std::fmt::Debug for MysqlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("socket", &self.socket)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_user_is_set() {
        let config = MysqlConfig::from_lookup(lookup(&[("USER", "exporter")])).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3306);
        assert_eq!(config.user, "exporter");
        assert_eq!(config.password, None);
        assert_eq!(config.describe(), "exporter@localhost:3306");
    }

    #[test]
    fn mysql_user_wins_over_user() {
        let config = MysqlConfig::from_lookup(lookup(&[
            ("USER", "shell"),
            ("MYSQL_USER", "monitor"),
            ("MYSQL_HOST", "db.internal"),
            ("MYSQL_PORT", "3307"),
            ("MYSQL_PASSWORD", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.user, "monitor");
        assert_eq!(config.port, 3307);
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn missing_user_is_an_error() {
        let err = MysqlConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvNotSet(_)));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = MysqlConfig::from_lookup(lookup(&[("USER", "a"), ("MYSQL_PORT", "99999")]))
            .unwrap_err();
        assert!(err.to_string().contains("99999"));
    }

    #[test]
    fn socket_changes_description() {
        let config = MysqlConfig::from_lookup(lookup(&[
            ("USER", "root"),
            ("MYSQL_SOCKET", "/run/mysqld/mysqld.sock"),
        ]))
        .unwrap();
        assert_eq!(config.describe(), "root@/run/mysqld/mysqld.sock");
    }
}
