//! Auth module: domain types, credential store, hasher, token issuer and the session manager.
//!
//! Web-framework independent; the `server` crate binds it to HTTP.

pub mod domain;
pub mod errors;
pub mod password;
pub mod repo;
pub mod repository;
pub mod service;
pub mod token;

pub use errors::AuthError;
pub use service::SessionManager;
