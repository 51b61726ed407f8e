use axum::Json;
use serde::Serialize;

/// Numeric result codes carried in every response envelope.
pub mod code {
    pub const SUCCESS: i32 = 0;

    pub const INTERNAL_ERROR: i32 = 1001;
    pub const INVALID_PARAMS: i32 = 1002;
    pub const UNAUTHORIZED: i32 = 1003;
    pub const FORBIDDEN: i32 = 1004;
    pub const NOT_FOUND: i32 = 1005;

    pub const USER_NOT_FOUND: i32 = 2000;
    pub const USER_ALREADY_EXISTS: i32 = 2001;
    pub const INVALID_CREDENTIALS: i32 = 2002;
    pub const INVALID_TOKEN: i32 = 2004;
    pub const TOKEN_EXPIRED: i32 = 2005;
    pub const USER_DISABLED: i32 = 2015;

    pub const DATA_NOT_FOUND: i32 = 3000;
    pub const DATA_ALREADY_EXISTS: i32 = 3001;
    pub const DATA_TOO_LARGE: i32 = 3011;

    pub const LIMIT_EXCEEDED: i32 = 4011;

    pub const SERVICE_UNAVAILABLE: i32 = 5005;
    pub const DEPENDENCY_FAILED: i32 = 5006;
}

/// Envelope wrapping every successful payload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ApiResponse<T> {
    /// `0` on success.
    #[schema(example = 0)]
    pub code: i32,
    #[schema(example = "success")]
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            code: code::SUCCESS,
            message: "success".into(),
            data: Some(data),
        })
    }

    /// Success with `data: null`.
    pub fn empty() -> Json<Self> {
        Json(Self {
            code: code::SUCCESS,
            message: "success".into(),
            data: None,
        })
    }
}
