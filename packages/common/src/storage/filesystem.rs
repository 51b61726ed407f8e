use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};

use super::error::UploadError;

/// Leading bytes of every PDF document.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Sub-directory under the root holding resume files.
const RESUME_DIR: &str = "resumes";

/// A PDF written to the upload store.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Absolute (root-joined) path of the written PDF.
    pub path: PathBuf,
    /// Original client-side file name.
    pub file_name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Filesystem upload store.
///
/// Files are laid out per user and per month:
/// `{root}/resumes/{user_id}/{YYYY_MM}/{8 hex chars}_{stem}.pdf`.
/// Paths handed out to callers are relative to the root and always use `/`.
pub struct UploadStore {
    root: PathBuf,
    max_file_size: u64,
}

impl UploadStore {
    /// Create the store, making sure the root directory exists.
    pub async fn new(root: PathBuf, max_file_size: u64) -> Result<Self, UploadError> {
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            max_file_size,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Validate size, declared MIME type and PDF signature.
    pub fn validate_pdf(&self, content_type: Option<&str>, data: &[u8]) -> Result<(), UploadError> {
        if data.len() as u64 > self.max_file_size {
            return Err(UploadError::FileTooLarge {
                limit: self.max_file_size,
            });
        }

        let declared = content_type.unwrap_or_default();
        if !declared.to_ascii_lowercase().contains("pdf") {
            return Err(UploadError::InvalidFileType(format!(
                "expected a PDF, got '{declared}'"
            )));
        }

        if !data.starts_with(PDF_MAGIC) {
            return Err(UploadError::InvalidFileType(
                "file content is not a PDF document".into(),
            ));
        }

        Ok(())
    }

    /// Validate and persist an uploaded PDF for `user_id`.
    pub async fn save_pdf(
        &self,
        user_id: i32,
        original_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        self.validate_pdf(content_type, data)?;

        let year_month = Utc::now().format("%Y_%m").to_string();
        let dir = self
            .root
            .join(RESUME_DIR)
            .join(user_id.to_string())
            .join(year_month);
        fs::create_dir_all(&dir).await?;

        let prefix = hex::encode(rand::random::<[u8; 4]>());
        let path = dir.join(format!("{prefix}_{}.pdf", sanitize_stem(original_name)));

        if let Err(e) = fs::write(&path, data).await {
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        debug!(path = %path.display(), size = data.len(), "Stored uploaded PDF");

        Ok(StoredUpload {
            path,
            file_name: original_name.to_string(),
            size: data.len() as u64,
        })
    }

    /// Convert a path inside the root to its `/`-separated relative form.
    pub fn relative_path(&self, path: &Path) -> Result<String, UploadError> {
        let rel = path
            .strip_prefix(&self.root)
            .map_err(|_| UploadError::InvalidPath(path.display().to_string()))?;

        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            return Err(UploadError::InvalidPath(path.display().to_string()));
        }
        Ok(parts.join("/"))
    }

    /// Resolve a relative path under the root, rejecting traversal.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, UploadError> {
        let invalid = || UploadError::InvalidPath(relative.to_string());

        if relative.is_empty()
            || relative.starts_with('/')
            || relative.contains('\\')
            || relative.contains('\0')
        {
            return Err(invalid());
        }

        let mut path = self.root.clone();
        for segment in relative.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(invalid());
            }
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) => path.push(segment),
                _ => return Err(invalid()),
            }
        }
        Ok(path)
    }

    /// Open a stored file for reading, returning it with its size.
    pub async fn open(&self, relative: &str) -> Result<(fs::File, u64), UploadError> {
        let path = self.resolve(relative)?;
        match fs::File::open(&path).await {
            Ok(file) => {
                let metadata = file.metadata().await?;
                if !metadata.is_file() {
                    return Err(UploadError::NotFound(relative.to_string()));
                }
                Ok((file, metadata.len()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(UploadError::NotFound(relative.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored file by relative path.
    ///
    /// Returns `true` if the file was deleted, `false` if it did not exist.
    pub async fn delete(&self, relative: &str) -> Result<bool, UploadError> {
        let path = self.resolve(relative)?;
        remove_if_exists(&path).await
    }

    /// Best-effort removal used on cleanup paths. Failures are logged only.
    pub async fn discard(&self, path: &Path) {
        if let Err(e) = remove_if_exists(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }

    /// Best-effort removal by relative path.
    pub async fn discard_relative(&self, relative: &str) {
        if let Err(e) = self.delete(relative).await {
            warn!(path = relative, error = %e, "Failed to remove stored file");
        }
    }
}

async fn remove_if_exists(path: &Path) -> Result<bool, UploadError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Reduce a client file name to a safe stem for the stored name.
pub fn sanitize_stem(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };

    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
        .take(64)
        .collect();

    if cleaned.is_empty() {
        "resume".to_string()
    } else {
        cleaned
    }
}
