use axum::extract::State;
use axum::response::IntoResponse;
use sea_orm::{EntityTrait, QueryOrder};
use tracing::instrument;

use crate::entity::university;
use crate::error::AppError;
use crate::models::system::{FaqItem, HealthResponse, UniversityResponse};
use crate::response::ApiResponse;
use crate::state::AppState;

const FAQS: &[FaqItem] = &[
    FaqItem {
        id: 1,
        question: "How do I share my resume?",
        answer: "Register, then upload your resume as a PDF. We render a preview image and \
            publish it with the role, level and university you choose.",
    },
    FaqItem {
        id: 2,
        question: "Is my original PDF stored?",
        answer: "No. Only the rendered preview image is kept. The uploaded PDF is deleted \
            right after conversion.",
    },
    FaqItem {
        id: 3,
        question: "Why can I only view a few resumes?",
        answer: "Visitors have a daily viewing allowance. Signing in raises it, and sharing a \
            resume of your own removes the limit.",
    },
    FaqItem {
        id: 4,
        question: "Can I edit or remove a resume later?",
        answer: "Yes. Owners can update the description, tags and offers, replace the file, or \
            delete the resume at any time.",
    },
    FaqItem {
        id: 5,
        question: "What do the tags mean?",
        answer: "Tech stack tags name the technologies on the resume. Direction tags describe the \
            kind of work, such as backend or machine learning.",
    },
];

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "health",
    summary = "Liveness check",
    responses((status = 200, description = "Service is up", body = ApiResponse<HealthResponse>)),
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.server.environment.clone(),
    })
}

#[utoipa::path(
    get,
    path = "/faqs",
    tag = "FAQ",
    operation_id = "listFaqs",
    summary = "Frequently asked questions",
    responses((status = 200, description = "FAQ entries", body = ApiResponse<Vec<FaqItem>>)),
)]
pub async fn list_faqs() -> impl IntoResponse {
    ApiResponse::ok(FAQS.to_vec())
}

#[utoipa::path(
    get,
    path = "/universities",
    tag = "Universities",
    operation_id = "listUniversities",
    summary = "Known universities",
    responses(
        (status = 200, description = "Universities ordered by name", body = ApiResponse<Vec<UniversityResponse>>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_universities(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let universities: Vec<UniversityResponse> = university::Entity::find()
        .order_by_asc(university::Column::Name)
        .all(&state.db)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(ApiResponse::ok(universities))
}
