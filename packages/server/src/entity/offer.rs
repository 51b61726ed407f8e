use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub resume_id: i32,
    #[sea_orm(belongs_to, from = "resume_id", to = "id")]
    pub resume: HasOne<super::resume::Entity>,

    pub company: String,
    pub position: String,
    pub offer_date: Option<Date>,
}

impl ActiveModelBehavior for ActiveModel {}
