//! Repository session configuration.
//!
//! Loaded from environment variables. Defaults target a local repository
//! endpoint. Tests build configs through [`SessionConfig::from_lookup()`]
//! so they never mutate the process environment.

use url::Url;

/// Default repository endpoint.
pub const DEFAULT_REPOSITORY_URL: &str =
    "http://localhost:8080/alfresco/api/-default-/public/cmis/versions/1.1/atom";

/// Default administrative principal.
pub const DEFAULT_ADMIN_PRINCIPAL: &str = "admin";

/// Default login ticket lifetime.
pub const DEFAULT_TICKET_TTL_SECS: u64 = 3600;

/// Configuration for opening a repository session.
///
/// Custom `Debug` implementation redacts the `password` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct SessionConfig {
    /// Repository protocol endpoint.
    pub repository_url: Url,
    /// Principal the session acts as.
    pub user: String,
    /// Password for `user`.
    pub password: String,
    /// Principal allowed to override other users' checkouts.
    pub admin_principal: String,
    /// Lifetime of an acquired login ticket.
    pub ticket_ttl_secs: u64,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("repository_url", &self.repository_url)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("admin_principal", &self.admin_principal)
            .field("ticket_ttl_secs", &self.ticket_ttl_secs)
            .finish()
    }
}

impl SessionConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DMF_REPOSITORY_URL` (default: local repository endpoint)
    /// - `DMF_USER` (required)
    /// - `DMF_PASSWORD` (required)
    /// - `DMF_ADMIN_PRINCIPAL` (default: `admin`)
    /// - `DMF_TICKET_TTL_SECS` (default: 3600)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(var))
        };

        let raw_url = lookup("DMF_REPOSITORY_URL").unwrap_or_else(|| DEFAULT_REPOSITORY_URL.to_string());
        let repository_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidUrl("DMF_REPOSITORY_URL".to_string(), e.to_string()))?;

        let ticket_ttl_secs = match lookup("DMF_TICKET_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("DMF_TICKET_TTL_SECS".to_string(), raw))?,
            None => DEFAULT_TICKET_TTL_SECS,
        };

        Ok(Self {
            repository_url,
            user: required("DMF_USER")?,
            password: required("DMF_PASSWORD")?,
            admin_principal: lookup("DMF_ADMIN_PRINCIPAL")
                .unwrap_or_else(|| DEFAULT_ADMIN_PRINCIPAL.to_string()),
            ticket_ttl_secs,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
    #[error("invalid principal: {0}")]
    InvalidPrincipal(#[from] dmf_core::IdentityError),
}
