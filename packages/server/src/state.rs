use std::sync::Arc;

use common::convert::PdfConverter;
use common::storage::UploadStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::services::access::AccessPolicy;
use crate::services::pending::PendingUploads;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub uploads: Arc<UploadStore>,
    pub converter: Arc<dyn PdfConverter>,
    pub pending: Arc<PendingUploads>,
    pub access: Arc<AccessPolicy>,
}
