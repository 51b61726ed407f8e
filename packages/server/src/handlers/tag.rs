use axum::extract::{Query, State};
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::models::tag::{TagListQuery, TagResponse, validate_tag_type};
use crate::response::ApiResponse;
use crate::services::tag::TagService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Tags",
    operation_id = "listTags",
    summary = "List tags",
    params(TagListQuery),
    responses(
        (status = 200, description = "Tags ordered by name", body = ApiResponse<Vec<TagResponse>>),
        (status = 400, description = "Unknown tag type (1002)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<TagListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let tag_type = match query.tag_type.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(t) => {
            validate_tag_type(t)?;
            Some(t)
        }
    };

    let tags: Vec<TagResponse> = TagService::new(&state.db)
        .list(tag_type)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(ApiResponse::ok(tags))
}
