//! Business services used by the handlers.

pub mod auth;
