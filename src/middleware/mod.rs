// SPDX-License-Identifier: MIT

//! Middleware modules (authentication, consent gate, security).

pub mod auth;
pub mod consent;
pub mod security;

pub use auth::require_auth;
pub use consent::require_consent;
