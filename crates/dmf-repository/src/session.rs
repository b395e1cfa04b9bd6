//! # Sessions and Connections
//!
//! A [`Session`] records who is acting and the login ticket the
//! repository issued to them. A [`Connection`] pairs a session with the
//! repository handle it authenticates, and is passed by reference into
//! every upload and ingestion call.
//!
//! ## Ticket Lifecycle
//!
//! ```text
//! (none) ──acquire_ticket()──▶ Valid ──expires_at passes──▶ Expired
//!                                │                            │
//!                                └────────invalidate()────────┴──▶ (none)
//! ```
//!
//! Each session owns its own ticket. Nothing is shared process-wide, so
//! two connections for two users never observe each other's tickets.

use chrono::{DateTime, Duration, Utc};

use dmf_core::Principal;

use crate::client::Repository;
use crate::config::{ConfigError, SessionConfig};

/// An opaque login ticket with an expiry.
///
/// Custom `Debug` implementation redacts the ticket value.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginTicket {
    value: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl LoginTicket {
    /// A ticket issued at `issued_at`, valid for `ttl`.
    pub fn issued(value: impl Into<String>, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    /// The ticket value to present to the repository.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// When the ticket was issued.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// When the ticket stops being valid.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the ticket has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for LoginTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginTicket")
            .field("value", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The acting principal and their login state.
#[derive(Debug, Clone)]
pub struct Session {
    user: Principal,
    admin_principal: Principal,
    ticket_ttl: Duration,
    ticket: Option<LoginTicket>,
}

impl Session {
    /// A session for `user` with no ticket yet.
    pub fn new(user: Principal, admin_principal: Principal) -> Self {
        Self {
            user,
            admin_principal,
            ticket_ttl: Duration::seconds(crate::config::DEFAULT_TICKET_TTL_SECS as i64),
            ticket: None,
        }
    }

    /// A session for the configured user.
    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        let ticket_ttl = i64::try_from(config.ticket_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                ConfigError::InvalidNumber(
                    "DMF_TICKET_TTL_SECS".to_string(),
                    config.ticket_ttl_secs.to_string(),
                )
            })?;
        Ok(Self {
            ticket_ttl,
            ..Self::new(
                Principal::new(config.user.as_str())?,
                Principal::new(config.admin_principal.as_str())?,
            )
        })
    }

    /// The acting principal.
    pub fn user(&self) -> &Principal {
        &self.user
    }

    /// Whether the acting principal is the administrator.
    pub fn is_admin(&self) -> bool {
        self.user == self.admin_principal
    }

    /// Whether the session may act on a checkout held by `owner`.
    pub fn may_override_lock(&self, owner: &Principal) -> bool {
        &self.user == owner || self.is_admin()
    }

    /// Record a ticket issued by the repository now.
    pub fn acquire_ticket(&mut self, value: impl Into<String>) -> &LoginTicket {
        self.acquire_ticket_at(value, Utc::now())
    }

    /// Record a ticket issued at `now`.
    pub fn acquire_ticket_at(&mut self, value: impl Into<String>, now: DateTime<Utc>) -> &LoginTicket {
        let ticket = LoginTicket::issued(value, now, self.ticket_ttl);
        tracing::debug!(user = %self.user, expires_at = %ticket.expires_at, "login ticket acquired");
        self.ticket.insert(ticket)
    }

    /// Drop the ticket, returning it if one was held.
    pub fn invalidate(&mut self) -> Option<LoginTicket> {
        let ticket = self.ticket.take();
        if ticket.is_some() {
            tracing::debug!(user = %self.user, "login ticket invalidated");
        }
        ticket
    }

    /// The ticket, if one is held and unexpired now.
    pub fn ticket(&self) -> Option<&LoginTicket> {
        self.ticket_at(Utc::now())
    }

    /// The ticket, if one is held and unexpired at `now`.
    pub fn ticket_at(&self, now: DateTime<Utc>) -> Option<&LoginTicket> {
        self.ticket.as_ref().filter(|t| !t.is_expired_at(now))
    }
}

/// An authenticated repository handle and its session.
#[derive(Debug, Clone)]
pub struct Connection<R> {
    repository: R,
    session: Session,
}

impl<R: Repository> Connection<R> {
    /// Pair a repository handle with its session.
    pub fn new(repository: R, session: Session) -> Self {
        Self {
            repository,
            session,
        }
    }

    /// The repository handle.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// The session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable session, for ticket lifecycle changes.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// The acting principal.
    pub fn user(&self) -> &Principal {
        self.session.user()
    }

    /// Split back into the repository handle and the session.
    pub fn into_parts(self) -> (R, Session) {
        (self.repository, self.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn p(id: &str) -> Principal {
        Principal::new(id).unwrap()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_session_has_no_ticket() {
        let session = Session::new(p("jdoe"), p("admin"));
        assert!(session.ticket_at(noon()).is_none());
    }

    #[test]
    fn test_acquire_then_invalidate() {
        let mut session = Session::new(p("jdoe"), p("admin"));
        session.acquire_ticket_at("TICKET_abc", noon());
        assert_eq!(session.ticket_at(noon()).unwrap().value(), "TICKET_abc");

        let dropped = session.invalidate().unwrap();
        assert_eq!(dropped.value(), "TICKET_abc");
        assert!(session.ticket_at(noon()).is_none());
        assert!(session.invalidate().is_none());
    }

    #[test]
    fn test_ticket_expires() {
        let mut session = Session::new(p("jdoe"), p("admin"));
        session.acquire_ticket_at("TICKET_abc", noon());
        let later = noon() + Duration::seconds(3600);
        assert!(session.ticket_at(later - Duration::seconds(1)).is_some());
        assert!(session.ticket_at(later).is_none());
    }

    #[test]
    fn test_sessions_do_not_share_tickets() {
        let mut a = Session::new(p("alice"), p("admin"));
        let b = Session::new(p("bob"), p("admin"));
        a.acquire_ticket_at("TICKET_a", noon());
        assert!(a.ticket_at(noon()).is_some());
        assert!(b.ticket_at(noon()).is_none());
    }

    #[test]
    fn test_lock_override_rules() {
        let owner = p("alice");
        assert!(Session::new(p("alice"), p("admin")).may_override_lock(&owner));
        assert!(Session::new(p("admin"), p("admin")).may_override_lock(&owner));
        assert!(!Session::new(p("alice2"), p("admin")).may_override_lock(&owner));
    }

    #[test]
    fn test_from_config_uses_ttl() {
        let config = SessionConfig::from_lookup(|k| match k {
            "DMF_USER" => Some("jdoe".into()),
            "DMF_PASSWORD" => Some("pw".into()),
            "DMF_TICKET_TTL_SECS" => Some("60".into()),
            _ => None,
        })
        .unwrap();
        let mut session = Session::from_config(&config).unwrap();
        assert!(!session.is_admin());
        session.acquire_ticket_at("t", noon());
        assert_eq!(
            session.ticket_at(noon()).unwrap().expires_at(),
            noon() + Duration::seconds(60)
        );
    }

    #[test]
    fn test_ticket_debug_redacts_value() {
        let ticket = LoginTicket::issued("TICKET_secret", noon(), Duration::seconds(5));
        assert!(!format!("{ticket:?}").contains("TICKET_secret"));
    }
}
