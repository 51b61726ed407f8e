use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const TYPE_TECH_STACK: &str = "tech_stack";
pub const TYPE_DIRECTION: &str = "direction";
pub const TAG_TYPES: &[&str] = &[TYPE_TECH_STACK, TYPE_DIRECTION];

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Trimmed and lowercased.
    #[sea_orm(unique_key = "tag_name_type")]
    pub name: String,
    #[sea_orm(unique_key = "tag_name_type")]
    pub tag_type: String,

    #[sea_orm(has_many, via = "resume_tag")]
    pub resumes: HasMany<super::resume::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
