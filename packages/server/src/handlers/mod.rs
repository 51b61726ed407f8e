pub mod auth;
pub mod file;
pub mod resume;
pub mod system;
pub mod tag;
