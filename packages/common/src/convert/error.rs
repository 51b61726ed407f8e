use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Source PDF not found: {0}")]
    SourceMissing(String),

    #[error("No PDF converter found on PATH")]
    ConverterUnavailable,

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Conversion IO error: {0}")]
    Io(#[from] std::io::Error),
}
