use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const LEVELS: &[&str] = &["intern", "graduate", "experienced"];

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resume")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owner. Never changes after insert.
    #[sea_orm(indexed)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(indexed)]
    pub role: String,
    /// One of: intern, graduate, experienced
    #[sea_orm(indexed)]
    pub level: String,
    #[sea_orm(indexed)]
    pub university: String,

    /// Preview image path relative to the upload root, `/`-separated.
    pub file_path: String,
    /// Name of the PDF as uploaded by the owner.
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,

    #[sea_orm(default_value = 0)]
    pub view_count: i64,
    #[sea_orm(default_value = 0)]
    pub download_count: i64,

    #[sea_orm(has_many)]
    pub offers: HasMany<super::offer::Entity>,

    #[sea_orm(has_many, via = "resume_tag")]
    pub tags: HasMany<super::tag::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
