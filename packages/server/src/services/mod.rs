pub mod access;
pub mod auth;
pub mod pending;
pub mod resume;
pub mod tag;
