//! Read models for the navigation bar and the profile page.
//!
//! Both are pure functions of the status (plus the hint for the nav bar);
//! neither owns or changes auth state.

use crate::hint::AuthHint;
use crate::routes;
use crate::status::AuthStatus;
use authsync_api::Profile;
use std::fmt;

/// Avatar as the UI draws it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    Image(String),
    /// Uppercased first character of the display name.
    Initial(char),
}

impl Avatar {
    pub fn for_profile(profile: &Profile) -> Self {
        match profile.avatar_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Avatar::Image(url.to_string()),
            _ => Avatar::Initial(
                profile
                    .display_name()
                    .chars()
                    .next()
                    .map(|c| c.to_uppercase().next().unwrap_or(c))
                    .unwrap_or('?'),
            ),
        }
    }
}

/// Navigation bar auth area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavView {
    /// Status unknown. The hint may be used to size a placeholder, never to
    /// show account links.
    Loading { probably_signed_in: bool },
    SignedIn {
        display_name: String,
        avatar: Avatar,
        profile_route: &'static str,
    },
    SignedOut {
        login_route: &'static str,
        signup_route: &'static str,
    },
}

impl NavView {
    pub fn from_status(status: &AuthStatus, hint: Option<&AuthHint>) -> Self {
        match status {
            AuthStatus::Unknown => NavView::Loading {
                probably_signed_in: hint.is_some_and(|hint| hint.probably_signed_in),
            },
            AuthStatus::Authenticated { profile } => NavView::SignedIn {
                display_name: profile.display_name().to_string(),
                avatar: Avatar::for_profile(profile),
                profile_route: routes::PROFILE,
            },
            AuthStatus::Unauthenticated => NavView::SignedOut {
                login_route: routes::LOGIN,
                signup_route: routes::SIGNUP,
            },
        }
    }
}

impl fmt::Display for NavView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavView::Loading { .. } => f.write_str("[ … ]"),
            NavView::SignedIn {
                display_name,
                avatar,
                profile_route,
            } => match avatar {
                Avatar::Image(url) => write!(f, "[{display_name} <{url}>] -> {profile_route}"),
                Avatar::Initial(initial) => {
                    write!(f, "[({initial}) {display_name}] -> {profile_route}")
                }
            },
            NavView::SignedOut {
                login_route,
                signup_route,
            } => write!(f, "[Log in -> {login_route}] [Sign up -> {signup_route}]"),
        }
    }
}

/// Fields the profile page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCard {
    pub display_name: String,
    pub username: String,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub avatar: Avatar,
    /// `YYYY-MM-DD` of account creation.
    pub member_since: String,
}

impl From<&Profile> for ProfileCard {
    fn from(profile: &Profile) -> Self {
        Self {
            display_name: profile.display_name().to_string(),
            username: profile.username.clone(),
            bio: profile.bio.clone().filter(|bio| !bio.trim().is_empty()),
            email: profile.email.clone(),
            avatar: Avatar::for_profile(profile),
            member_since: profile.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Profile page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileView {
    Loading,
    Ready(ProfileCard),
    SignedOut,
}

impl ProfileView {
    pub fn from_status(status: &AuthStatus) -> Self {
        match status {
            AuthStatus::Unknown => ProfileView::Loading,
            AuthStatus::Authenticated { profile } => ProfileView::Ready(profile.into()),
            AuthStatus::Unauthenticated => ProfileView::SignedOut,
        }
    }
}

impl fmt::Display for ProfileView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileView::Loading => f.write_str("Loading profile…"),
            ProfileView::SignedOut => f.write_str("Signed out."),
            ProfileView::Ready(card) => {
                writeln!(f, "{} (@{})", card.display_name, card.username)?;
                if let Some(bio) = &card.bio {
                    writeln!(f, "  {bio}")?;
                }
                if let Some(email) = &card.email {
                    writeln!(f, "  {email}")?;
                }
                write!(f, "  member since {}", card.member_since)
            }
        }
    }
}
