// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod google;
pub mod identity;
pub mod session;
pub mod token;

pub use google::{GoogleOAuthClient, GoogleProfile};
pub use identity::{IdentityError, IdentityService, LoginOutcome};
pub use session::{SessionStore, SESSION_COOKIE};
pub use token::{Claims, TokenError, TokenService};
