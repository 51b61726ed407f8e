use std::collections::HashMap;

use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::storage::UploadBuffer;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, MaybeAuthUser};
use crate::extractors::client::{ClientIp, PublicBase};
use crate::extractors::json::AppJson;
use crate::models::resume::{
    CreateResumeRequest, OfferInput, ResumeListQuery, ResumeListResponse, ResumeMetadata,
    ResumeResponse, UpdateResumeRequest, UploadPdfResponse, validate_metadata,
    validate_update_resume,
};
use crate::models::tag::TagInput;
use crate::response::ApiResponse;
use crate::services::resume::{IncomingPdf, ResumeService};
use crate::state::AppState;
use crate::utils::filename::{content_disposition_value, validate_upload_filename};

/// Multipart routes accept the file ceiling plus room for form fields.
pub fn upload_body_limit(max_file_size: u64) -> DefaultBodyLimit {
    let limit = max_file_size.saturating_add(1024 * 1024);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

fn multipart_error(err: MultipartError, limit: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge { limit }
    } else {
        AppError::Validation(format!("Multipart error: {}", err.body_text()))
    }
}

/// Buffer the `file` field in memory, failing as soon as it passes `limit`.
async fn read_pdf_field(mut field: Field<'_>, limit: u64) -> Result<IncomingPdf, AppError> {
    let file_name = field
        .file_name()
        .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
    let file_name = validate_upload_filename(file_name)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();

    let content_type = field.content_type().map(str::to_string);
    if !content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"))
    {
        return Err(AppError::Validation("Only PDF files are accepted".into()));
    }

    let mut buffer = UploadBuffer::new(limit);
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        buffer.push(&chunk)?;
    }

    if buffer.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    Ok(IncomingPdf {
        file_name,
        content_type,
        data: buffer.into_inner(),
    })
}

/// A multipart body with one PDF and any number of text fields.
struct UploadForm {
    pdf: IncomingPdf,
    fields: HashMap<String, String>,
}

async fn read_upload_form(multipart: &mut Multipart, limit: u64) -> Result<UploadForm, AppError> {
    let mut pdf = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "file" {
            pdf = Some(read_pdf_field(field, limit).await?);
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| multipart_error(e, limit))?;
            fields.insert(name, text);
        }
    }

    let pdf = pdf.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    Ok(UploadForm { pdf, fields })
}

fn json_field<T: serde::de::DeserializeOwned>(
    fields: &mut HashMap<String, String>,
    name: &str,
) -> Result<Vec<T>, AppError> {
    match fields.remove(name) {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map_err(|e| AppError::Validation(format!("Field '{name}' is not valid JSON: {e}"))),
        _ => Ok(Vec::new()),
    }
}

/// Build resume metadata from multipart text fields.
///
/// `tags` and `offers` are JSON arrays encoded as strings.
fn metadata_from_fields(mut fields: HashMap<String, String>) -> Result<ResumeMetadata, AppError> {
    let tags: Vec<TagInput> = json_field(&mut fields, "tags")?;
    let offers: Vec<OfferInput> = json_field(&mut fields, "offers")?;
    let mut take = |name: &str| fields.remove(name).unwrap_or_default();

    Ok(ResumeMetadata {
        title: take("title"),
        description: take("description"),
        role: take("role"),
        level: take("level"),
        university: take("university"),
        tags,
        offers,
    })
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Resumes",
    operation_id = "listResumes",
    summary = "Browse resumes",
    description = "Lists resumes newest first. Filters combine with AND. Listing is not subject \
        to the view limit.",
    params(ResumeListQuery),
    responses(
        (status = 200, description = "Resume page", body = ApiResponse<ResumeListResponse>),
        (status = 401, description = "Invalid or expired token (2004, 2005)", body = ErrorBody),
    ),
)]
#[instrument(skip(_auth, state, base, query))]
pub async fn list_resumes(
    _auth: MaybeAuthUser,
    State(state): State<AppState>,
    base: PublicBase,
    Query(query): Query<ResumeListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (resumes, pagination) = ResumeService::new(&state).list(&query).await?;
    let data = resumes
        .into_iter()
        .map(|r| r.into_response(&base))
        .collect();
    Ok(ApiResponse::ok(ResumeListResponse { data, pagination }))
}

#[utoipa::path(
    get,
    path = "/mine",
    tag = "Resumes",
    operation_id = "listMyResumes",
    summary = "List the caller's resumes",
    responses(
        (status = 200, description = "Resumes owned by the caller", body = ApiResponse<Vec<ResumeResponse>>),
        (status = 401, description = "Unauthorized (1003, 2004, 2005)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base), fields(user_id = auth_user.user_id))]
pub async fn list_my_resumes(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: PublicBase,
) -> Result<impl IntoResponse, AppError> {
    let resumes = ResumeService::new(&state)
        .list_mine(auth_user.user_id)
        .await?;
    let data: Vec<ResumeResponse> = resumes
        .into_iter()
        .map(|r| r.into_response(&base))
        .collect();
    Ok(ApiResponse::ok(data))
}

#[utoipa::path(
    post,
    path = "/upload-pdf",
    tag = "Resumes",
    operation_id = "uploadResumePdf",
    summary = "Upload a PDF and render its preview",
    description = "Converts the `file` multipart field to a JPEG preview. The returned \
        `file_key` is passed to the create endpoint and expires if unused.",
    request_body(content_type = "multipart/form-data", description = "PDF in the `file` field"),
    responses(
        (status = 200, description = "Preview rendered", body = ApiResponse<UploadPdfResponse>),
        (status = 400, description = "Not a PDF or missing file (1002)", body = ErrorBody),
        (status = 401, description = "Unauthorized (1003, 2004, 2005)", body = ErrorBody),
        (status = 413, description = "File too large (3011)", body = ErrorBody),
        (status = 502, description = "Conversion failed (5006)", body = ErrorBody),
        (status = 503, description = "No converter installed (5005)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_pdf(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: PublicBase,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_upload_form(&mut multipart, state.uploads.max_file_size()).await?;

    let (file_key, file) = ResumeService::new(&state)
        .upload_pdf(auth_user.user_id, form.pdf)
        .await?;

    Ok(ApiResponse::ok(UploadPdfResponse {
        image_url: base.file_url(&file.file_path),
        file_key,
        file_name: file.file_name,
        file_size: file.file_size,
    }))
}

#[utoipa::path(
    post,
    path = "/create",
    tag = "Resumes",
    operation_id = "createResumeFromUpload",
    summary = "Create a resume from an uploaded PDF",
    request_body = CreateResumeRequest,
    responses(
        (status = 201, description = "Resume created", body = ApiResponse<ResumeResponse>),
        (status = 400, description = "Validation error (1002)", body = ErrorBody),
        (status = 401, description = "Unauthorized (1003, 2004, 2005)", body = ErrorBody),
        (status = 403, description = "Upload belongs to another user (1004)", body = ErrorBody),
        (status = 404, description = "Unknown or expired file key (3000)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base, payload), fields(user_id = auth_user.user_id))]
pub async fn create_from_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: PublicBase,
    AppJson(payload): AppJson<CreateResumeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_metadata(&payload.metadata)?;

    let detail = ResumeService::new(&state)
        .create_from_file_key(auth_user.user_id, payload.file_key, payload.metadata)
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(detail.into_response(&base))))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Resumes",
    operation_id = "createResume",
    summary = "Upload a PDF and create a resume in one request",
    description = "Multipart fields: `file` (PDF), `title`, `description`, `role`, `level`, \
        `university`, and optional `tags` / `offers` as JSON arrays.",
    request_body(content_type = "multipart/form-data", description = "PDF plus metadata fields"),
    responses(
        (status = 201, description = "Resume created", body = ApiResponse<ResumeResponse>),
        (status = 400, description = "Validation error (1002)", body = ErrorBody),
        (status = 401, description = "Unauthorized (1003, 2004, 2005)", body = ErrorBody),
        (status = 413, description = "File too large (3011)", body = ErrorBody),
        (status = 502, description = "Conversion failed (5006)", body = ErrorBody),
        (status = 503, description = "No converter installed (5005)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base, multipart), fields(user_id = auth_user.user_id))]
pub async fn create_resume(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: PublicBase,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_upload_form(&mut multipart, state.uploads.max_file_size()).await?;
    let metadata = metadata_from_fields(form.fields)?;
    validate_metadata(&metadata)?;

    let detail = ResumeService::new(&state)
        .create_with_file(auth_user.user_id, form.pdf, metadata)
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(detail.into_response(&base))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Resumes",
    operation_id = "getResume",
    summary = "Get a resume",
    description = "Counts a view unless the caller owns the resume. Subject to the view limit \
        for anonymous callers and users who have not uploaded a resume.",
    params(("id" = i32, Path, description = "Resume ID")),
    responses(
        (status = 200, description = "Resume detail", body = ApiResponse<ResumeResponse>),
        (status = 401, description = "Invalid or expired token (2004, 2005)", body = ErrorBody),
        (status = 404, description = "Resume not found (3000)", body = ErrorBody),
        (status = 429, description = "View limit exceeded (4011)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth, ip, base))]
pub async fn get_resume(
    auth: MaybeAuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    base: PublicBase,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = auth.viewer(ip);
    let detail = ResumeService::new(&state).get(&viewer, id).await?;
    Ok(ApiResponse::ok(detail.into_response(&base)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Resumes",
    operation_id = "updateResume",
    summary = "Update resume metadata",
    description = "Only provided fields change. `tags` and `offers` replace the whole set.",
    params(("id" = i32, Path, description = "Resume ID")),
    request_body = UpdateResumeRequest,
    responses(
        (status = 200, description = "Resume updated", body = ApiResponse<ResumeResponse>),
        (status = 400, description = "Validation error (1002)", body = ErrorBody),
        (status = 401, description = "Unauthorized (1003, 2004, 2005)", body = ErrorBody),
        (status = 403, description = "Not the owner (1004)", body = ErrorBody),
        (status = 404, description = "Resume not found (3000)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base, payload), fields(user_id = auth_user.user_id))]
pub async fn update_resume(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: PublicBase,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateResumeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_update_resume(&payload)?;

    let detail = ResumeService::new(&state)
        .update(auth_user.user_id, id, payload)
        .await?;
    Ok(ApiResponse::ok(detail.into_response(&base)))
}

#[utoipa::path(
    put,
    path = "/{id}/file",
    tag = "Resumes",
    operation_id = "replaceResumeFile",
    summary = "Replace the PDF behind a resume",
    params(("id" = i32, Path, description = "Resume ID")),
    request_body(content_type = "multipart/form-data", description = "PDF in the `file` field"),
    responses(
        (status = 200, description = "File replaced", body = ApiResponse<ResumeResponse>),
        (status = 400, description = "Not a PDF or missing file (1002)", body = ErrorBody),
        (status = 401, description = "Unauthorized (1003, 2004, 2005)", body = ErrorBody),
        (status = 403, description = "Not the owner (1004)", body = ErrorBody),
        (status = 404, description = "Resume not found (3000)", body = ErrorBody),
        (status = 413, description = "File too large (3011)", body = ErrorBody),
        (status = 502, description = "Conversion failed (5006)", body = ErrorBody),
        (status = 503, description = "No converter installed (5005)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base, multipart), fields(user_id = auth_user.user_id))]
pub async fn replace_resume_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: PublicBase,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_upload_form(&mut multipart, state.uploads.max_file_size()).await?;

    let detail = ResumeService::new(&state)
        .update_file(auth_user.user_id, id, form.pdf)
        .await?;
    Ok(ApiResponse::ok(detail.into_response(&base)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Resumes",
    operation_id = "deleteResume",
    summary = "Delete a resume",
    description = "Removes the resume with its offers and tag links, then its preview image.",
    params(("id" = i32, Path, description = "Resume ID")),
    responses(
        (status = 200, description = "Resume deleted, `data` is null"),
        (status = 401, description = "Unauthorized (1003, 2004, 2005)", body = ErrorBody),
        (status = 403, description = "Not the owner (1004)", body = ErrorBody),
        (status = 404, description = "Resume not found (3000)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_resume(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    ResumeService::new(&state)
        .delete(auth_user.user_id, id)
        .await?;
    Ok(ApiResponse::<()>::empty())
}

#[utoipa::path(
    get,
    path = "/{id}/download",
    tag = "Resumes",
    operation_id = "downloadResume",
    summary = "Download the preview image",
    description = "Streams the image as an attachment. Counts a download unless the caller owns \
        the resume. Subject to the same limit as viewing.",
    params(("id" = i32, Path, description = "Resume ID")),
    responses(
        (status = 200, description = "Image content"),
        (status = 401, description = "Invalid or expired token (2004, 2005)", body = ErrorBody),
        (status = 404, description = "Resume or file not found (3000)", body = ErrorBody),
        (status = 429, description = "View limit exceeded (4011)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth, ip))]
pub async fn download_resume(
    auth: MaybeAuthUser,
    ip: ClientIp,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let viewer = auth.viewer(ip);
    let download = ResumeService::new(&state).download(&viewer, id).await?;

    let file_name = format!("resume-{}.jpg", download.resume_id);
    let body = Body::from_stream(ReaderStream::new(download.file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, download.file_type)
        .header(header::CONTENT_LENGTH, download.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value("attachment", &file_name),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
