use std::fmt;

use tracing::warn;

pub const DEFAULT_MAX_CONNECTIONS_PER_ROUTE: usize = (i32::MAX / 2) as usize;
pub const DEFAULT_MAX_CONNECTIONS_TOTAL: usize = i32::MAX as usize;

const MAX_CONNECTIONS_PER_ROUTE_ENV: &str = "OKTA_HTTP_POOL_MAX_PER_ROUTE";
const MAX_CONNECTIONS_TOTAL_ENV: &str = "OKTA_HTTP_POOL_MAX_TOTAL";

/// Connection pool caps for the shared transport.
///
/// `max_total` must be at least `max_per_route`; an inverted pair reverts
/// both values to their defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    max_per_route: usize,
    max_total: usize,
}

impl PoolSettings {
    pub fn new(max_per_route: usize, max_total: usize) -> Self {
        if max_total >= max_per_route {
            Self {
                max_per_route,
                max_total,
            }
        } else {
            warn!(
                max_total,
                max_per_route,
                "pool max_total is less than max_per_route, reverting both to defaults"
            );
            Self::default()
        }
    }

    /// Reads the pool caps from `OKTA_HTTP_POOL_MAX_PER_ROUTE` and
    /// `OKTA_HTTP_POOL_MAX_TOTAL`, falling back to the defaults for unset or
    /// unparseable values.
    pub fn from_env() -> Self {
        let max_per_route = env_pool_value(
            MAX_CONNECTIONS_PER_ROUTE_ENV,
            DEFAULT_MAX_CONNECTIONS_PER_ROUTE,
        );
        let max_total = env_pool_value(MAX_CONNECTIONS_TOTAL_ENV, DEFAULT_MAX_CONNECTIONS_TOTAL);
        Self::new(max_per_route, max_total)
    }

    pub fn max_per_route(&self) -> usize {
        self.max_per_route
    }

    pub fn max_total(&self) -> usize {
        self.max_total
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_per_route: DEFAULT_MAX_CONNECTIONS_PER_ROUTE,
            max_total: DEFAULT_MAX_CONNECTIONS_TOTAL,
        }
    }
}

fn env_pool_value(variable: &str, default: usize) -> usize {
    let Ok(raw_value) = std::env::var(variable) else {
        return default;
    };
    match raw_value.parse::<usize>() {
        Ok(value) => value,
        Err(_) => {
            warn!(variable, %raw_value, "bad pool size value, using default {default}");
            default
        }
    }
}

/// API token used to authenticate requests.
#[derive(Clone)]
pub struct ClientCredentials {
    token: String,
}

impl ClientCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// How the API token is presented on the `Authorization` header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthenticationScheme {
    /// `Authorization: SSWS <token>`, the scheme the identity API expects
    /// for API tokens.
    #[default]
    Ssws,
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// Requests are sent unauthenticated.
    Disabled,
}

/// Forward HTTP proxy, with optional basic credentials.
#[derive(Clone)]
pub struct Proxy {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
}

impl fmt::Debug for Proxy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Proxy")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username.as_deref().map(|_| "<redacted>"))
            .field("password", &self.password.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Proxy {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// Per-client configuration consumed by the request executors.
#[derive(Clone, Debug)]
pub struct ClientConfiguration {
    pub client_credentials: Option<ClientCredentials>,
    pub authentication_scheme: AuthenticationScheme,
    pub proxy: Option<Proxy>,
    /// Connect and read timeout for one attempt, in seconds; `0` leaves the
    /// transport unbounded.
    pub connection_timeout_secs: u64,
    /// Total attempt cap; `0` disables the cap.
    pub retry_max_attempts: u32,
    /// Wall-clock budget for one `execute` call, in seconds; `0` disables it.
    pub retry_max_elapsed_secs: u64,
    /// Connection pool caps. The default reads the environment so deployers
    /// can size the pool without a code change.
    pub pool: PoolSettings,
}

impl Default for ClientConfiguration {
    fn default() -> Self {
        Self {
            client_credentials: None,
            authentication_scheme: AuthenticationScheme::default(),
            proxy: None,
            connection_timeout_secs: 30,
            retry_max_attempts: 4,
            retry_max_elapsed_secs: 0,
            pool: PoolSettings::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_pool_settings_revert_to_defaults() {
        let settings = PoolSettings::new(100, 10);
        assert_eq!(settings, PoolSettings::default());
    }

    #[test]
    fn consistent_pool_settings_are_kept() {
        let settings = PoolSettings::new(8, 64);
        assert_eq!(settings.max_per_route(), 8);
        assert_eq!(settings.max_total(), 64);
    }

    #[test]
    fn credentials_debug_never_prints_the_token() {
        let credentials = ClientCredentials::new("super-secret");
        assert!(!format!("{credentials:?}").contains("super-secret"));
    }

    #[test]
    fn proxy_debug_never_prints_credentials() {
        let proxy = Proxy::new("proxy.internal", 8080).with_credentials("corp-user", "hunter2");
        let printed = format!("{proxy:?}");
        assert!(printed.contains("proxy.internal"));
        assert!(!printed.contains("corp-user"));
        assert!(!printed.contains("hunter2"));
    }
}
