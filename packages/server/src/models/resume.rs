use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::resume::LEVELS;
use crate::entity::{offer, resume};
use crate::error::AppError;

use super::shared::{Pagination, validate_len};
use super::tag::{TagInput, TagResponse, validate_tags};

/// An interview outcome recorded on a resume.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, utoipa::ToSchema)]
pub struct OfferInput {
    #[schema(example = "ByteDance")]
    pub company: String,
    #[serde(default)]
    #[schema(example = "Backend Engineer")]
    pub position: String,
    #[schema(example = "2026-03-01")]
    pub offer_date: Option<NaiveDate>,
}

/// Descriptive fields shared by every way of creating a resume.
#[derive(Deserialize, Clone, Debug, Default, utoipa::ToSchema)]
pub struct ResumeMetadata {
    /// Defaults to the uploaded file name without extension.
    #[serde(default)]
    #[schema(example = "Backend intern resume")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "backend")]
    pub role: String,
    /// `intern`, `graduate` or `experienced`.
    #[schema(example = "intern")]
    pub level: String,
    #[schema(example = "Tsinghua University")]
    pub university: String,
    #[serde(default)]
    pub tags: Vec<TagInput>,
    #[serde(default)]
    pub offers: Vec<OfferInput>,
}

/// Request body for attaching a previously uploaded file to a new resume.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateResumeRequest {
    /// Key returned by the upload endpoint.
    pub file_key: Uuid,
    #[serde(flatten)]
    pub metadata: ResumeMetadata,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateResumeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub role: Option<String>,
    pub level: Option<String>,
    pub university: Option<String>,
    /// Replaces the whole tag set when present.
    pub tags: Option<Vec<TagInput>>,
    /// Replaces the whole offer list when present.
    pub offers: Option<Vec<OfferInput>>,
}

fn validate_level(level: &str) -> Result<(), AppError> {
    if LEVELS.contains(&level.trim()) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Level must be one of: {}",
            LEVELS.join(", ")
        )))
    }
}

fn validate_offers(offers: &[OfferInput]) -> Result<(), AppError> {
    if offers.len() > 20 {
        return Err(AppError::Validation("At most 20 offers are allowed".into()));
    }
    for offer in offers {
        validate_len(&offer.company, "Company", 1, 128)?;
        validate_len(&offer.position, "Position", 0, 128)?;
    }
    Ok(())
}

pub fn validate_metadata(metadata: &ResumeMetadata) -> Result<(), AppError> {
    validate_len(&metadata.title, "Title", 0, 128)?;
    validate_len(&metadata.description, "Description", 0, 2000)?;
    validate_len(&metadata.role, "Role", 1, 64)?;
    validate_level(&metadata.level)?;
    validate_len(&metadata.university, "University", 1, 128)?;
    validate_tags(&metadata.tags)?;
    validate_offers(&metadata.offers)
}

pub fn validate_update_resume(payload: &UpdateResumeRequest) -> Result<(), AppError> {
    if let Some(ref title) = payload.title {
        validate_len(title, "Title", 0, 128)?;
    }
    if let Some(ref description) = payload.description {
        validate_len(description, "Description", 0, 2000)?;
    }
    if let Some(ref role) = payload.role {
        validate_len(role, "Role", 1, 64)?;
    }
    if let Some(ref level) = payload.level {
        validate_level(level)?;
    }
    if let Some(ref university) = payload.university {
        validate_len(university, "University", 1, 128)?;
    }
    if let Some(ref tags) = payload.tags {
        validate_tags(tags)?;
    }
    if let Some(ref offers) = payload.offers {
        validate_offers(offers)?;
    }
    Ok(())
}

#[derive(Serialize, Clone, Debug, utoipa::ToSchema)]
pub struct OfferResponse {
    pub id: i32,
    pub company: String,
    pub position: String,
    pub offer_date: Option<NaiveDate>,
}

impl From<offer::Model> for OfferResponse {
    fn from(offer: offer::Model) -> Self {
        Self {
            id: offer.id,
            company: offer.company,
            position: offer.position,
            offer_date: offer.offer_date,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ResumeResponse {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub role: String,
    pub level: String,
    pub university: String,
    /// Public URL of the preview image.
    pub image_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub view_count: i64,
    pub download_count: i64,
    pub tags: Vec<TagResponse>,
    pub offers: Vec<OfferResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResumeResponse {
    pub fn new(
        model: resume::Model,
        tags: Vec<TagResponse>,
        offers: Vec<OfferResponse>,
        image_url: String,
    ) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            description: model.description,
            role: model.role,
            level: model.level,
            university: model.university,
            image_url,
            file_name: model.file_name,
            file_type: model.file_type,
            file_size: model.file_size,
            view_count: model.view_count,
            download_count: model.download_count,
            tags,
            offers,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ResumeListResponse {
    pub data: Vec<ResumeResponse>,
    pub pagination: Pagination,
}

/// Filters for browsing resumes. Invalid paging values fall back to defaults.
#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct ResumeListQuery {
    /// Page number, 1-based. Default 1.
    pub page: Option<String>,
    /// Page size, 1-100. Default 10.
    pub size: Option<String>,
    /// Exact role match.
    pub role: Option<String>,
    /// `intern`, `graduate` or `experienced`.
    pub level: Option<String>,
    /// Exact university match.
    pub university: Option<String>,
    /// Tag name of any type.
    pub tag: Option<String>,
    /// Case-insensitive substring of title or role.
    pub keyword: Option<String>,
}

/// Result of uploading a PDF ahead of creating the resume.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadPdfResponse {
    /// Public URL of the generated preview image.
    pub image_url: String,
    /// Pass this to the create endpoint. Expires if unused.
    pub file_key: Uuid,
    pub file_name: String,
    pub file_size: i64,
}
