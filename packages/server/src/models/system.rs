use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    #[schema(example = "development")]
    pub environment: String,
}

#[derive(Serialize, Clone, utoipa::ToSchema)]
pub struct FaqItem {
    pub id: i32,
    pub question: &'static str,
    pub answer: &'static str,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UniversityResponse {
    pub id: i32,
    #[schema(example = "Tsinghua University")]
    pub name: String,
}

impl From<crate::entity::university::Model> for UniversityResponse {
    fn from(model: crate::entity::university::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}
