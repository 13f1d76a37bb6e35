//! Route paths the core knows about.

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const SIGNUP: &str = "/signup";
pub const PROFILE: &str = "/profile";
