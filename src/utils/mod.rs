//! Helpers shared by the HTTP surface and the admin CLI.
//!
//! - [`sanitize`] - Outbound record sanitization

pub mod sanitize;
