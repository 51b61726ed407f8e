use axum::routing::get;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::system::health))
        .routes(routes!(handlers::system::list_faqs))
        .routes(routes!(handlers::system::list_universities))
        .nest("/auth", auth_routes())
        .nest("/tags", tag_routes())
        .nest("/resumes", resume_routes(config))
        .route("/files/{*path}", get(handlers::file::serve_file))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn tag_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::tag::list_tags))
}

fn resume_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::resume::list_resumes,
            handlers::resume::create_resume
        ))
        .routes(routes!(handlers::resume::list_my_resumes))
        .routes(routes!(handlers::resume::upload_pdf))
        .routes(routes!(handlers::resume::create_from_upload))
        .routes(routes!(
            handlers::resume::get_resume,
            handlers::resume::update_resume,
            handlers::resume::delete_resume
        ))
        .routes(routes!(handlers::resume::replace_resume_file))
        .routes(routes!(handlers::resume::download_resume))
        .layer(handlers::resume::upload_body_limit(
            config.upload.max_file_size,
        ))
}
