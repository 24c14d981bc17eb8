//! Authentication core of the ERP backend.
//! - Password and refresh-token fingerprinting (argon2).
//! - Signed access/refresh token issuance (JWT).
//! - Session lifecycle (register, login, refresh rotation, logout) over a pluggable credential store.

pub mod auth;
