//! Request middleware: the ordered stage chain and the outer request boundary.

pub mod auth;
pub mod boundary;
pub mod chain;
pub mod cors;
pub mod rate_limit;
pub mod security_headers;
