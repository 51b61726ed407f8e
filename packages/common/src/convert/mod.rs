mod error;
mod traits;

pub mod external;

pub use error::ConvertError;
pub use external::ExternalToolConverter;
pub use traits::PdfConverter;
