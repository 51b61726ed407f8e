pub mod auth;
pub mod resume;
pub mod shared;
pub mod system;
pub mod tag;
