use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 10)]
    pub size: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 5)]
    pub total_pages: u64,
}

/// Parse `page`/`size` query values. Missing or out-of-range values fall
/// back to page 1 and the default size instead of failing the request.
pub fn page_params(page: Option<&str>, size: Option<&str>) -> (u64, u64) {
    let page = page
        .and_then(|p| p.trim().parse::<u64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let size = size
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
        .unwrap_or(DEFAULT_PAGE_SIZE);
    (page, size)
}

/// Row offset of a page. Saturates instead of overflowing on huge pages.
pub fn page_offset(page: u64, size: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(size)
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Trimmed string with a character-count bound.
pub fn validate_len(value: &str, field: &str, min: usize, max: usize) -> Result<(), crate::error::AppError> {
    let count = value.trim().chars().count();
    if count < min || count > max {
        let msg = if min == 0 {
            format!("{field} must be at most {max} characters")
        } else {
            format!("{field} must be {min}-{max} characters")
        };
        return Err(crate::error::AppError::Validation(msg));
    }
    Ok(())
}
