use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType, Query as SeaQuery};
use sea_orm::*;
use tokio::fs::File;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entity::{offer, resume, resume_tag, tag};
use crate::error::AppError;
use crate::extractors::client::PublicBase;
use crate::models::resume::{
    OfferInput, OfferResponse, ResumeListQuery, ResumeMetadata, ResumeResponse,
    UpdateResumeRequest,
};
use crate::models::shared::{Pagination, escape_like, page_offset, page_params};
use crate::models::tag::normalize_tag_name;
use crate::services::access::Viewer;
use crate::services::pending::{ClaimError, PendingUpload};
use crate::services::tag::TagService;
use crate::state::AppState;

/// A PDF received from a client, fully buffered and within the size limit.
pub struct IncomingPdf {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Preview image produced from an uploaded PDF.
#[derive(Debug, Clone)]
pub struct ConvertedFile {
    /// Image path relative to the upload root.
    pub file_path: String,
    /// Name of the PDF as uploaded.
    pub file_name: String,
    pub file_type: String,
    /// Size of the uploaded PDF in bytes.
    pub file_size: i64,
}

impl From<&PendingUpload> for ConvertedFile {
    fn from(upload: &PendingUpload) -> Self {
        Self {
            file_path: upload.file_path.clone(),
            file_name: upload.file_name.clone(),
            file_type: upload.file_type.clone(),
            file_size: upload.file_size,
        }
    }
}

/// A resume with its tags and offers.
pub struct ResumeDetail {
    pub resume: resume::Model,
    pub tags: Vec<tag::Model>,
    pub offers: Vec<offer::Model>,
}

impl ResumeDetail {
    pub fn into_response(self, base: &PublicBase) -> ResumeResponse {
        let image_url = base.file_url(&self.resume.file_path);
        ResumeResponse::new(
            self.resume,
            self.tags.into_iter().map(Into::into).collect(),
            self.offers.into_iter().map(OfferResponse::from).collect(),
            image_url,
        )
    }
}

/// An open preview image ready to be streamed.
pub struct ResumeDownload {
    pub resume_id: i32,
    pub file_type: String,
    pub file: File,
    pub size: u64,
}

pub struct ResumeService<'a> {
    state: &'a AppState,
}

impl<'a> ResumeService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Store the PDF, render its preview and drop the PDF.
    ///
    /// The intermediate PDF is removed on success and on failure.
    async fn process_pdf(&self, user_id: i32, pdf: IncomingPdf) -> Result<ConvertedFile, AppError> {
        let uploads = &self.state.uploads;
        let stored = uploads
            .save_pdf(user_id, &pdf.file_name, pdf.content_type.as_deref(), &pdf.data)
            .await?;

        let started = Instant::now();
        let converted = self.state.converter.convert(&stored.path).await;
        uploads.discard(&stored.path).await;
        let image = converted?;

        let file_path = match uploads.relative_path(&image) {
            Ok(path) => path,
            Err(e) => {
                uploads.discard(&image).await;
                return Err(e.into());
            }
        };

        info!(
            user_id,
            path = %file_path,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Converted PDF to preview image"
        );

        Ok(ConvertedFile {
            file_type: mime_guess::from_path(&image)
                .first_or_octet_stream()
                .to_string(),
            file_path,
            file_name: stored.file_name,
            file_size: i64::try_from(stored.size).unwrap_or(i64::MAX),
        })
    }

    /// Convert a PDF and park the result until a resume claims it.
    #[instrument(skip(self, pdf), fields(file_name = %pdf.file_name))]
    pub async fn upload_pdf(
        &self,
        user_id: i32,
        pdf: IncomingPdf,
    ) -> Result<(Uuid, ConvertedFile), AppError> {
        let file = self.process_pdf(user_id, pdf).await?;
        let key = self.state.pending.insert(PendingUpload {
            user_id,
            file_path: file.file_path.clone(),
            file_name: file.file_name.clone(),
            file_type: file.file_type.clone(),
            file_size: file.file_size,
            created_at: Instant::now(),
        });
        Ok((key, file))
    }

    /// Create a resume from a previously uploaded file.
    #[instrument(skip(self, metadata))]
    pub async fn create_from_file_key(
        &self,
        user_id: i32,
        file_key: Uuid,
        metadata: ResumeMetadata,
    ) -> Result<ResumeDetail, AppError> {
        let upload = self
            .state
            .pending
            .claim(&file_key, user_id)
            .map_err(|e| match e {
                ClaimError::NotFound => AppError::FileNotFound,
                ClaimError::NotOwner => AppError::Forbidden,
            })?;

        match self
            .insert_resume(user_id, ConvertedFile::from(&upload), metadata)
            .await
        {
            Ok(detail) => Ok(detail),
            Err(e) => {
                self.state.pending.restore(file_key, upload);
                Err(e)
            }
        }
    }

    /// Convert a PDF and create the resume in one step.
    #[instrument(skip(self, pdf, metadata), fields(file_name = %pdf.file_name))]
    pub async fn create_with_file(
        &self,
        user_id: i32,
        pdf: IncomingPdf,
        metadata: ResumeMetadata,
    ) -> Result<ResumeDetail, AppError> {
        let file = self.process_pdf(user_id, pdf).await?;
        let file_path = file.file_path.clone();

        match self.insert_resume(user_id, file, metadata).await {
            Ok(detail) => Ok(detail),
            Err(e) => {
                self.state.uploads.discard_relative(&file_path).await;
                Err(e)
            }
        }
    }

    async fn insert_resume(
        &self,
        user_id: i32,
        file: ConvertedFile,
        metadata: ResumeMetadata,
    ) -> Result<ResumeDetail, AppError> {
        let title = match metadata.title.trim() {
            "" => default_title(&file.file_name),
            t => t.to_string(),
        };

        let txn = self.state.db.begin().await?;

        let now = Utc::now();
        let resume = resume::ActiveModel {
            user_id: Set(user_id),
            title: Set(title),
            description: Set(metadata.description.trim().to_string()),
            role: Set(metadata.role.trim().to_string()),
            level: Set(metadata.level.trim().to_string()),
            university: Set(metadata.university.trim().to_string()),
            file_path: Set(file.file_path),
            file_name: Set(file.file_name),
            file_type: Set(file.file_type),
            file_size: Set(file.file_size),
            view_count: Set(0),
            download_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        insert_offers(&txn, resume.id, &metadata.offers).await?;
        TagService::new(&txn)
            .replace_resume_tags(resume.id, &metadata.tags)
            .await?;

        let detail = load_detail(&txn, resume).await?;
        txn.commit().await?;

        info!(resume_id = detail.resume.id, user_id, "Resume created");
        Ok(detail)
    }

    async fn find(&self, id: i32) -> Result<resume::Model, AppError> {
        resume::Entity::find_by_id(id)
            .one(&self.state.db)
            .await?
            .ok_or(AppError::ResumeNotFound)
    }

    /// Apply the access policy for a non-list read of `resume`.
    async fn authorize_access(&self, viewer: &Viewer, resume: &resume::Model) -> Result<(), AppError> {
        let access = &self.state.access;
        if !access.is_enabled() || viewer.user_id() == Some(resume.user_id) {
            return Ok(());
        }

        let has_uploads = match viewer {
            Viewer::User(id) => {
                resume::Entity::find()
                    .filter(resume::Column::UserId.eq(*id))
                    .count(&self.state.db)
                    .await?
                    > 0
            }
            Viewer::Anonymous(_) => false,
        };

        access.check(viewer, resume.user_id, has_uploads)
    }

    /// Atomically bump a counter column and return the updated row.
    async fn increment(&self, id: i32, column: resume::Column) -> Result<resume::Model, AppError> {
        resume::Entity::update_many()
            .col_expr(column, Expr::col(column).add(1))
            .filter(resume::Column::Id.eq(id))
            .exec_with_returning(&self.state.db)
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::ResumeNotFound)
    }

    /// Fetch one resume, counting a view unless the viewer owns it.
    #[instrument(skip(self))]
    pub async fn get(&self, viewer: &Viewer, id: i32) -> Result<ResumeDetail, AppError> {
        let mut resume = self.find(id).await?;
        self.authorize_access(viewer, &resume).await?;

        if viewer.user_id() != Some(resume.user_id) {
            resume = self.increment(id, resume::Column::ViewCount).await?;
        }

        load_detail(&self.state.db, resume).await
    }

    /// Open the preview image for download, counting it unless the viewer owns it.
    #[instrument(skip(self))]
    pub async fn download(&self, viewer: &Viewer, id: i32) -> Result<ResumeDownload, AppError> {
        let resume = self.find(id).await?;
        self.authorize_access(viewer, &resume).await?;

        let (file, size) = self.state.uploads.open(&resume.file_path).await?;

        if viewer.user_id() != Some(resume.user_id) {
            self.increment(id, resume::Column::DownloadCount).await?;
        }

        Ok(ResumeDownload {
            resume_id: resume.id,
            file_type: resume.file_type,
            file,
            size,
        })
    }

    /// Browse resumes, newest first.
    #[instrument(skip(self, query))]
    pub async fn list(&self, query: &ResumeListQuery) -> Result<(Vec<ResumeDetail>, Pagination), AppError> {
        let (page, size) = page_params(query.page.as_deref(), query.size.as_deref());

        let mut select = resume::Entity::find();

        if let Some(role) = non_empty(&query.role) {
            select = select.filter(resume::Column::Role.eq(role));
        }
        if let Some(level) = non_empty(&query.level) {
            select = select.filter(resume::Column::Level.eq(level));
        }
        if let Some(university) = non_empty(&query.university) {
            select = select.filter(resume::Column::University.eq(university));
        }
        if let Some(tag_name) = non_empty(&query.tag) {
            select = select.filter(
                resume::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column((resume_tag::Entity, resume_tag::Column::ResumeId))
                        .from(resume_tag::Entity)
                        .inner_join(
                            tag::Entity,
                            Expr::col((tag::Entity, tag::Column::Id))
                                .equals((resume_tag::Entity, resume_tag::Column::TagId)),
                        )
                        .and_where(
                            Expr::col((tag::Entity, tag::Column::Name))
                                .eq(normalize_tag_name(tag_name)),
                        )
                        .to_owned(),
                ),
            );
        }
        if let Some(keyword) = non_empty(&query.keyword) {
            let pattern = format!("%{}%", escape_like(keyword).to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(resume::Column::Title)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(resume::Column::Role)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }

        let total = select
            .clone()
            .paginate(&self.state.db, size)
            .num_items()
            .await?;
        let total_pages = total.div_ceil(size);

        let offset = page_offset(page, size);
        if offset >= total {
            return Ok((
                Vec::new(),
                Pagination {
                    page,
                    size,
                    total,
                    total_pages,
                },
            ));
        }

        let resumes = select
            .order_by_desc(resume::Column::CreatedAt)
            .order_by_desc(resume::Column::Id)
            .offset(Some(offset))
            .limit(Some(size))
            .all(&self.state.db)
            .await?;

        let data = load_details(&self.state.db, resumes).await?;
        Ok((
            data,
            Pagination {
                page,
                size,
                total,
                total_pages,
            },
        ))
    }

    /// All resumes owned by `user_id`, newest first.
    pub async fn list_mine(&self, user_id: i32) -> Result<Vec<ResumeDetail>, AppError> {
        let resumes = resume::Entity::find()
            .filter(resume::Column::UserId.eq(user_id))
            .order_by_desc(resume::Column::CreatedAt)
            .order_by_desc(resume::Column::Id)
            .all(&self.state.db)
            .await?;
        load_details(&self.state.db, resumes).await
    }

    /// Patch resume metadata. Owner only.
    #[instrument(skip(self, payload))]
    pub async fn update(
        &self,
        user_id: i32,
        id: i32,
        payload: UpdateResumeRequest,
    ) -> Result<ResumeDetail, AppError> {
        if payload == UpdateResumeRequest::default() {
            let existing = self.find(id).await?;
            ensure_owner(&existing, user_id)?;
            return load_detail(&self.state.db, existing).await;
        }

        let txn = self.state.db.begin().await?;

        let existing = find_for_update(&txn, id).await?;
        ensure_owner(&existing, user_id)?;

        let mut active: resume::ActiveModel = existing.into();
        if let Some(ref title) = payload.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(ref description) = payload.description {
            active.description = Set(description.trim().to_string());
        }
        if let Some(ref role) = payload.role {
            active.role = Set(role.trim().to_string());
        }
        if let Some(ref level) = payload.level {
            active.level = Set(level.trim().to_string());
        }
        if let Some(ref university) = payload.university {
            active.university = Set(university.trim().to_string());
        }
        active.updated_at = Set(Utc::now());
        let model = active.update(&txn).await?;

        if let Some(ref tags) = payload.tags {
            TagService::new(&txn).replace_resume_tags(id, tags).await?;
        }
        if let Some(ref offers) = payload.offers {
            offer::Entity::delete_many()
                .filter(offer::Column::ResumeId.eq(id))
                .exec(&txn)
                .await?;
            insert_offers(&txn, id, offers).await?;
        }

        let detail = load_detail(&txn, model).await?;
        txn.commit().await?;
        Ok(detail)
    }

    /// Replace the file behind a resume. Owner only.
    ///
    /// The new image is removed if the row update fails; the old image is
    /// removed once the update has committed.
    #[instrument(skip(self, pdf), fields(file_name = %pdf.file_name))]
    pub async fn update_file(
        &self,
        user_id: i32,
        id: i32,
        pdf: IncomingPdf,
    ) -> Result<ResumeDetail, AppError> {
        ensure_owner(&self.find(id).await?, user_id)?;

        let file = self.process_pdf(user_id, pdf).await?;
        let new_path = file.file_path.clone();

        let result = async {
            let txn = self.state.db.begin().await?;
            let existing = find_for_update(&txn, id).await?;
            ensure_owner(&existing, user_id)?;
            let old_path = existing.file_path.clone();

            let mut active: resume::ActiveModel = existing.into();
            active.file_path = Set(file.file_path);
            active.file_name = Set(file.file_name);
            active.file_type = Set(file.file_type);
            active.file_size = Set(file.file_size);
            active.updated_at = Set(Utc::now());
            let model = active.update(&txn).await?;

            let detail = load_detail(&txn, model).await?;
            txn.commit().await?;
            Ok::<_, AppError>((detail, old_path))
        }
        .await;

        match result {
            Ok((detail, old_path)) => {
                if old_path != new_path {
                    self.state.uploads.discard_relative(&old_path).await;
                }
                Ok(detail)
            }
            Err(e) => {
                self.state.uploads.discard_relative(&new_path).await;
                Err(e)
            }
        }
    }

    /// Delete a resume with its offers and tag links. Owner only.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i32, id: i32) -> Result<(), AppError> {
        let txn = self.state.db.begin().await?;

        let existing = find_for_update(&txn, id).await?;
        ensure_owner(&existing, user_id)?;

        offer::Entity::delete_many()
            .filter(offer::Column::ResumeId.eq(id))
            .exec(&txn)
            .await?;
        resume_tag::Entity::delete_many()
            .filter(resume_tag::Column::ResumeId.eq(id))
            .exec(&txn)
            .await?;
        resume::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        if let Err(e) = self.state.uploads.delete(&existing.file_path).await {
            warn!(resume_id = id, error = %e, "Failed to delete resume image");
        }
        info!(resume_id = id, user_id, "Resume deleted");
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn default_title(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    stem.chars().take(128).collect()
}

fn ensure_owner(resume: &resume::Model, user_id: i32) -> Result<(), AppError> {
    if resume.user_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

async fn find_for_update(txn: &DatabaseTransaction, id: i32) -> Result<resume::Model, AppError> {
    resume::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::ResumeNotFound)
}

async fn insert_offers<C: ConnectionTrait>(
    conn: &C,
    resume_id: i32,
    offers: &[OfferInput],
) -> Result<(), AppError> {
    if offers.is_empty() {
        return Ok(());
    }
    let models = offers.iter().map(|o| offer::ActiveModel {
        resume_id: Set(resume_id),
        company: Set(o.company.trim().to_string()),
        position: Set(o.position.trim().to_string()),
        offer_date: Set(o.offer_date),
        ..Default::default()
    });
    offer::Entity::insert_many(models)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

async fn load_detail<C: ConnectionTrait>(conn: &C, resume: resume::Model) -> Result<ResumeDetail, AppError> {
    let mut details = load_details(conn, vec![resume]).await?;
    details
        .pop()
        .ok_or_else(|| AppError::Internal("Resume detail lost while loading".into()))
}

/// Attach tags and offers to a batch of resumes, keeping their order.
async fn load_details<C: ConnectionTrait>(
    conn: &C,
    resumes: Vec<resume::Model>,
) -> Result<Vec<ResumeDetail>, AppError> {
    let ids: Vec<i32> = resumes.iter().map(|r| r.id).collect();
    let mut tags = TagService::new(conn).tags_for(&ids).await?;

    let mut offers: HashMap<i32, Vec<offer::Model>> = HashMap::new();
    if !ids.is_empty() {
        for o in offer::Entity::find()
            .filter(offer::Column::ResumeId.is_in(ids.iter().copied()))
            .order_by_asc(offer::Column::Id)
            .all(conn)
            .await?
        {
            offers.entry(o.resume_id).or_default().push(o);
        }
    }

    Ok(resumes
        .into_iter()
        .map(|resume| ResumeDetail {
            tags: tags.remove(&resume.id).unwrap_or_default(),
            offers: offers.remove(&resume.id).unwrap_or_default(),
            resume,
        })
        .collect())
}
