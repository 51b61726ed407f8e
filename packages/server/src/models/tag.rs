use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::tag::TAG_TYPES;
use crate::error::AppError;

/// A tag attached to a resume, addressed by name and type.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, utoipa::ToSchema)]
pub struct TagInput {
    #[schema(example = "rust")]
    pub name: String,
    /// `tech_stack` or `direction`.
    #[serde(rename = "type")]
    #[schema(example = "tech_stack")]
    pub tag_type: String,
}

/// Trim and lowercase a tag name.
pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn validate_tag_type(tag_type: &str) -> Result<(), AppError> {
    if TAG_TYPES.contains(&tag_type) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Tag type must be one of: {}",
            TAG_TYPES.join(", ")
        )))
    }
}

pub fn validate_tags(tags: &[TagInput]) -> Result<(), AppError> {
    if tags.len() > 20 {
        return Err(AppError::Validation("At most 20 tags are allowed".into()));
    }
    for tag in tags {
        let len = tag.name.trim().chars().count();
        if len == 0 || len > 32 {
            return Err(AppError::Validation(
                "Tag name must be 1-32 characters".into(),
            ));
        }
        validate_tag_type(&tag.tag_type)?;
    }
    Ok(())
}

#[derive(Serialize, Clone, Debug, utoipa::ToSchema)]
pub struct TagResponse {
    pub id: i32,
    #[schema(example = "rust")]
    pub name: String,
    #[serde(rename = "type")]
    #[schema(example = "tech_stack")]
    pub tag_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::tag::Model> for TagResponse {
    fn from(tag: crate::entity::tag::Model) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            tag_type: tag.tag_type,
            created_at: tag.created_at,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct TagListQuery {
    /// Restrict to one tag type: `tech_stack` or `direction`.
    #[serde(rename = "type")]
    pub tag_type: Option<String>,
}
