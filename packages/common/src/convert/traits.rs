use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::ConvertError;

/// Renders a stored PDF into a single preview image.
#[async_trait]
pub trait PdfConverter: Send + Sync {
    /// Convert `pdf` into an image written next to it and return the image path.
    ///
    /// The source PDF is left in place; removing it is the caller's job.
    async fn convert(&self, pdf: &Path) -> Result<PathBuf, ConvertError>;
}
