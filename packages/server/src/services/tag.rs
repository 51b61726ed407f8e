use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::entity::{resume_tag, tag};
use crate::error::AppError;
use crate::models::tag::{TagInput, normalize_tag_name};

pub struct TagService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> TagService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Look a tag up by (name, type), creating it if missing.
    ///
    /// Names are compared after trimming and lowercasing. Concurrent creators
    /// of the same tag converge on one row through the unique key.
    pub async fn find_or_create(&self, name: &str, tag_type: &str) -> Result<tag::Model, AppError> {
        let name = normalize_tag_name(name);

        let model = tag::ActiveModel {
            name: Set(name.clone()),
            tag_type: Set(tag_type.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let result = tag::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([tag::Column::Name, tag::Column::TagType])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }

        tag::Entity::find()
            .filter(tag::Column::Name.eq(&name))
            .filter(tag::Column::TagType.eq(tag_type))
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Tag '{name}' vanished after upsert")))
    }

    /// Replace the tag set of a resume.
    pub async fn replace_resume_tags(&self, resume_id: i32, tags: &[TagInput]) -> Result<(), AppError> {
        resume_tag::Entity::delete_many()
            .filter(resume_tag::Column::ResumeId.eq(resume_id))
            .exec(self.conn)
            .await?;

        let mut tag_ids = Vec::with_capacity(tags.len());
        for input in tags {
            let tag = self.find_or_create(&input.name, &input.tag_type).await?;
            if !tag_ids.contains(&tag.id) {
                tag_ids.push(tag.id);
            }
        }

        if tag_ids.is_empty() {
            return Ok(());
        }

        let links = tag_ids.into_iter().map(|tag_id| resume_tag::ActiveModel {
            resume_id: Set(resume_id),
            tag_id: Set(tag_id),
        });
        resume_tag::Entity::insert_many(links)
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }

    /// Tags of each resume in `resume_ids`, ordered by name.
    pub async fn tags_for(&self, resume_ids: &[i32]) -> Result<HashMap<i32, Vec<tag::Model>>, AppError> {
        let mut by_resume: HashMap<i32, Vec<tag::Model>> = HashMap::new();
        if resume_ids.is_empty() {
            return Ok(by_resume);
        }

        let links = resume_tag::Entity::find()
            .filter(resume_tag::Column::ResumeId.is_in(resume_ids.iter().copied()))
            .all(self.conn)
            .await?;
        if links.is_empty() {
            return Ok(by_resume);
        }

        let tags: HashMap<i32, tag::Model> = tag::Entity::find()
            .filter(tag::Column::Id.is_in(links.iter().map(|l| l.tag_id)))
            .all(self.conn)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        for link in links {
            if let Some(tag) = tags.get(&link.tag_id) {
                by_resume.entry(link.resume_id).or_default().push(tag.clone());
            }
        }
        for list in by_resume.values_mut() {
            list.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(by_resume)
    }

    pub async fn list(&self, tag_type: Option<&str>) -> Result<Vec<tag::Model>, AppError> {
        let mut select = tag::Entity::find();
        if let Some(tag_type) = tag_type {
            select = select.filter(tag::Column::TagType.eq(tag_type));
        }
        Ok(select
            .order_by_asc(tag::Column::Name)
            .order_by_asc(tag::Column::TagType)
            .all(self.conn)
            .await?)
    }
}
