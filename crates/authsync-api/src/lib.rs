//! Client for the cookie-session REST API.
//!
//! This crate provides:
//! - [`AuthApi`], the seam the sync core talks to (login, logout, profile
//!   probe, refresh, signup, profile update)
//! - [`HttpAuthApi`], a reqwest implementation with an in-memory cookie jar,
//!   a fixed request timeout, and single-flight refresh-on-401; logout
//!   always empties the jar
//! - [`ApiError`] with its three-way [`ErrorKind`] classification

mod client;
mod cookies;
mod error;
mod types;

pub use client::{refresh_eligible, AuthApi, HttpAuthApi};
pub use error::{ApiError, ApiResult, ErrorKind};
pub use types::{Credentials, LoginResponse, Profile, ProfileUpdate, SignupRequest};
