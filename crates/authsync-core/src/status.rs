//! The tri-state authentication status.

use authsync_api::Profile;
use serde::Serialize;
use std::fmt;

/// What the client currently believes about its session.
///
/// `Unknown` only exists before the first probe settles; once a status is
/// known it never goes back to `Unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthStatus {
    #[default]
    Unknown,
    Authenticated {
        profile: Profile,
    },
    Unauthenticated,
}

impl AuthStatus {
    /// False while auth-dependent UI must not render yet.
    pub fn is_known(&self) -> bool {
        !matches!(self, AuthStatus::Unknown)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated { .. })
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            AuthStatus::Authenticated { profile } => Some(profile),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuthStatus::Unknown => "unknown",
            AuthStatus::Authenticated { .. } => "authenticated",
            AuthStatus::Unauthenticated => "unauthenticated",
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStatus::Authenticated { profile } => {
                write!(f, "authenticated as {} (#{})", profile.username, profile.id)
            }
            other => f.write_str(other.label()),
        }
    }
}

/// Result of one reconciliation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The probe answered authoritatively.
    Settled(AuthStatus),
    /// Retries ran out on transient failures; the status was left as it was.
    Indeterminate(AuthStatus),
    /// Another probe was already running; it will run once more afterwards.
    Coalesced,
}

impl ReconcileOutcome {
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, ReconcileOutcome::Indeterminate(_))
    }

    /// The status this outcome left behind, if this call ran the probe.
    pub fn status(&self) -> Option<&AuthStatus> {
        match self {
            ReconcileOutcome::Settled(status) | ReconcileOutcome::Indeterminate(status) => {
                Some(status)
            }
            ReconcileOutcome::Coalesced => None,
        }
    }
}
