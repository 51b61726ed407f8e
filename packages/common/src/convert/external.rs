use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::error::ConvertError;
use super::traits::PdfConverter;
use crate::config::ConverterConfig;

const IMAGEMAGICK: &str = "convert";
const PDFTOPPM: &str = "pdftoppm";
const GHOSTSCRIPT: &str = "gs";

/// Converter that shells out to the first usable tool on `PATH`.
///
/// Preference order: ImageMagick one-shot render, then page-by-page rendering
/// with `pdftoppm` or Ghostscript followed by vertical concatenation.
#[derive(Debug, Clone)]
pub struct ExternalToolConverter {
    options: ConverterConfig,
    search_path: Option<OsString>,
}

impl ExternalToolConverter {
    pub fn new(options: ConverterConfig) -> Self {
        Self {
            options,
            search_path: None,
        }
    }

    /// Look tools up in `path` instead of the process `PATH`.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        let paths = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"))?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }

    fn page_range(&self) -> (u32, u32) {
        let first = self.options.first_page.max(1);
        let last = self.options.last_page.max(first);
        (first, last)
    }

    async fn render_with_imagemagick(
        &self,
        convert: &Path,
        pdf: &Path,
        output: &Path,
    ) -> Result<(), ConvertError> {
        let (first, last) = self.page_range();
        let mut input = pdf.as_os_str().to_owned();
        input.push(format!("[{}-{}]", first - 1, last - 1));

        let mut command = Command::new(convert);
        command
            .arg("-density")
            .arg(self.options.dpi.to_string())
            .arg("-quality")
            .arg(self.options.quality.to_string())
            .arg(input)
            .arg("-append")
            .arg(output);
        run(command, IMAGEMAGICK).await?;

        if !fs::try_exists(output).await? {
            return Err(ConvertError::ConversionFailed(
                "convert produced no output".into(),
            ));
        }
        Ok(())
    }

    async fn render_with_pdftoppm(
        &self,
        pdftoppm: &Path,
        pdf: &Path,
        scratch: &Path,
    ) -> Result<Vec<PathBuf>, ConvertError> {
        let (first, last) = self.page_range();
        let mut command = Command::new(pdftoppm);
        command
            .arg("-jpeg")
            .arg("-r")
            .arg(self.options.dpi.to_string())
            .arg("-jpegopt")
            .arg(format!("quality={}", self.options.quality))
            .arg("-f")
            .arg(first.to_string())
            .arg("-l")
            .arg(last.to_string())
            .arg(pdf)
            .arg(scratch.join("page"));
        run(command, PDFTOPPM).await?;

        let mut pages = Vec::new();
        let mut entries = fs::read_dir(scratch).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_jpeg = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
            if is_jpeg {
                pages.push(path);
            }
        }
        pages.sort();
        Ok(pages)
    }

    async fn render_with_ghostscript(
        &self,
        gs: &Path,
        pdf: &Path,
        scratch: &Path,
    ) -> Result<Vec<PathBuf>, ConvertError> {
        let (first, last) = self.page_range();
        let mut pages = Vec::new();

        for page in first..=last {
            let page_file = scratch.join(format!("page-{page:03}.jpg"));
            let mut command = Command::new(gs);
            command
                .arg("-sDEVICE=jpeg")
                .arg(format!("-dJPEGQ={}", self.options.quality))
                .arg(format!("-r{}", self.options.dpi))
                .arg("-dBATCH")
                .arg("-dNOPAUSE")
                .arg(format!("-dFirstPage={page}"))
                .arg(format!("-dLastPage={page}"))
                .arg(format!("-sOutputFile={}", page_file.display()))
                .arg(pdf);

            let rendered = match run(command, GHOSTSCRIPT).await {
                Ok(()) => fs::try_exists(&page_file).await?,
                Err(e) if page == first => return Err(e),
                Err(e) => {
                    // Past the last page of the document.
                    debug!(page, error = %e, "Ghostscript stopped rendering");
                    false
                }
            };
            if !rendered {
                break;
            }
            pages.push(page_file);
        }

        Ok(pages)
    }

    async fn render_pages(
        &self,
        pdf: &Path,
        scratch: &Path,
        output: &Path,
        imagemagick: Option<&Path>,
    ) -> Result<(), ConvertError> {
        fs::create_dir_all(scratch).await?;

        let pages = if let Some(pdftoppm) = self.find_tool(PDFTOPPM) {
            self.render_with_pdftoppm(&pdftoppm, pdf, scratch).await?
        } else if let Some(gs) = self.find_tool(GHOSTSCRIPT) {
            self.render_with_ghostscript(&gs, pdf, scratch).await?
        } else {
            return Err(ConvertError::ConverterUnavailable);
        };

        let Some(first_page) = pages.first() else {
            return Err(ConvertError::ConversionFailed(
                "no pages were rendered".into(),
            ));
        };

        match imagemagick {
            Some(convert) if pages.len() > 1 => {
                let mut command = Command::new(convert);
                command
                    .arg("-append")
                    .arg("-quality")
                    .arg(self.options.quality.to_string())
                    .args(&pages)
                    .arg(output);
                run(command, IMAGEMAGICK).await
            }
            _ => {
                fs::copy(first_page, output).await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl PdfConverter for ExternalToolConverter {
    #[instrument(skip(self), fields(pdf = %pdf.display()))]
    async fn convert(&self, pdf: &Path) -> Result<PathBuf, ConvertError> {
        if !fs::try_exists(pdf).await? {
            return Err(ConvertError::SourceMissing(pdf.display().to_string()));
        }

        let output = pdf.with_extension("jpg");
        let imagemagick = self.find_tool(IMAGEMAGICK);

        if let Some(convert) = &imagemagick {
            match self.render_with_imagemagick(convert, pdf, &output).await {
                Ok(()) => return Ok(output),
                Err(e) => {
                    warn!(error = %e, "ImageMagick render failed, rendering page by page");
                    let _ = fs::remove_file(&output).await;
                }
            }
        }

        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume".to_string());
        let scratch = pdf.with_file_name(format!("{stem}_pages"));

        let result = self
            .render_pages(pdf, &scratch, &output, imagemagick.as_deref())
            .await;
        let _ = fs::remove_dir_all(&scratch).await;

        match result {
            Ok(()) => Ok(output),
            Err(e) => {
                let _ = fs::remove_file(&output).await;
                Err(e)
            }
        }
    }
}

async fn run(mut command: Command, tool: &str) -> Result<(), ConvertError> {
    let output = command
        .output()
        .await
        .map_err(|err| ConvertError::ConversionFailed(format!("failed to execute {tool}: {err}")))?;

    if !output.status.success() {
        return Err(ConvertError::ConversionFailed(format!(
            "{tool} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
