//! Session credential handling.
//!
//! [`TokenStore`] owns the in-memory credential; [`AuthService`] drives the
//! sign-in, sign-out and cold-start flows against the backend.

pub mod service;
pub mod token;

pub use service::{AuthService, SignUp, UserProfile};
pub use token::{AuthState, Credential, TokenStore};
