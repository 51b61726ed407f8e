pub mod offer;
pub mod resume;
pub mod resume_tag;
pub mod tag;
pub mod university;
pub mod user;
