mod buffer;
mod error;

pub mod filesystem;

pub use buffer::UploadBuffer;
pub use error::UploadError;
pub use filesystem::{StoredUpload, UploadStore};
