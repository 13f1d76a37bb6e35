//! Route guard for protected views.
//!
//! ## State Diagram
//!
//! ```text
//! ┌──────────┐ SawUnknown (stays, shows loading)
//! │ Checking │◄──────┐
//! └────┬─────┘───────┘
//!      │ SawAuthenticated          SawUnauthenticated
//!      ▼                                  │
//! ┌──────────┐   SawUnauthenticated  ┌────▼────────┐  RedirectIssued  ┌────────────┐
//! │ Admitted │ ────────────────────► │ Redirecting │ ───────────────► │ Redirected │
//! └──────────┘                       └─────────────┘                  └────────────┘
//! ```
//!
//! `Redirected` is terminal: the guard navigates to login exactly once and
//! renders nothing afterwards.

use crate::cell::AuthStatusReader;
use crate::status::AuthStatus;
use authsync_api::Profile;
use rust_fsm::*;
use tracing::{debug, info};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub guard_machine(Checking)

    Checking => {
        SawUnknown => Checking,
        SawAuthenticated => Admitted,
        SawUnauthenticated => Redirecting
    },
    Admitted => {
        SawAuthenticated => Admitted,
        SawUnauthenticated => Redirecting
    },
    Redirecting => {
        RedirectIssued => Redirected
    },
    Redirected => {
        SawUnknown => Redirected,
        SawAuthenticated => Redirected,
        SawUnauthenticated => Redirected
    }
}

use guard_machine::{Input as GuardInput, State as GuardState, StateMachine as GuardMachine};

/// Host hook for changing the current route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// What a protected view should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// Status not known yet. Never redirect, never show protected content.
    Loading,
    /// Signed in: render the protected content.
    Render(Profile),
    /// Signed out: the guard just navigated to this route.
    Redirect(String),
    /// Already redirected; render nothing.
    Nothing,
}

/// One guard per mounted protected view.
pub struct AuthGuard {
    machine: GuardMachine,
    login_route: String,
}

impl AuthGuard {
    pub fn new(login_route: impl Into<String>) -> Self {
        Self {
            machine: GuardMachine::new(),
            login_route: login_route.into(),
        }
    }

    pub fn state(&self) -> &GuardState {
        self.machine.state()
    }

    /// Feed the current status and get the view to show.
    pub fn evaluate(&mut self, status: &AuthStatus, navigator: &dyn Navigator) -> GuardView {
        let input = match status {
            AuthStatus::Unknown => GuardInput::SawUnknown,
            AuthStatus::Authenticated { .. } => GuardInput::SawAuthenticated,
            AuthStatus::Unauthenticated => GuardInput::SawUnauthenticated,
        };

        if self.machine.consume(&input).is_err() {
            debug!(state = ?self.machine.state(), input = ?input, "Guard ignored transition");
        }

        let state = self.machine.state().clone();
        match (state, status) {
            (GuardState::Redirecting, _) => {
                info!(route = %self.login_route, "Guard redirecting signed-out user");
                navigator.navigate(&self.login_route);
                let _ = self.machine.consume(&GuardInput::RedirectIssued);
                GuardView::Redirect(self.login_route.clone())
            }
            (GuardState::Admitted, AuthStatus::Authenticated { profile }) => {
                GuardView::Render(profile.clone())
            }
            (GuardState::Redirected, _) => GuardView::Nothing,
            _ => GuardView::Loading,
        }
    }

    /// Wait until the status is known, then evaluate it.
    pub async fn resolve(
        &mut self,
        reader: &mut AuthStatusReader,
        navigator: &dyn Navigator,
    ) -> GuardView {
        let status = reader
            .wait_until_known()
            .await
            .unwrap_or_else(|| reader.status());
        self.evaluate(&status, navigator)
    }
}
