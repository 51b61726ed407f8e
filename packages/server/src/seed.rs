use sea_orm::*;
use sea_query::{Index, PostgresQueryBuilder};
use tracing::info;

use crate::entity::{resume, university};

/// Universities offered in the picker on a fresh install.
const DEFAULT_UNIVERSITIES: &[&str] = &[
    "Beihang University",
    "Beijing Institute of Technology",
    "Fudan University",
    "Harbin Institute of Technology",
    "Huazhong University of Science and Technology",
    "Nanjing University",
    "Peking University",
    "Shanghai Jiao Tong University",
    "Sun Yat-sen University",
    "Tongji University",
    "Tsinghua University",
    "University of Chinese Academy of Sciences",
    "University of Science and Technology of China",
    "Wuhan University",
    "Xi'an Jiaotong University",
    "Zhejiang University",
];

/// Seed the `university` table. Existing rows are left untouched.
pub async fn seed_universities(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut inserted = 0u32;
    for &name in DEFAULT_UNIVERSITIES {
        let model = university::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        };

        let result = university::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(university::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} new universities", inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Browse order: ORDER BY created_at DESC, id DESC
    let browse = Index::create()
        .if_not_exists()
        .name("idx_resume_created_id")
        .table(resume::Entity)
        .col(resume::Column::CreatedAt)
        .col(resume::Column::Id)
        .to_string(PostgresQueryBuilder);

    // "My resumes": WHERE user_id = ? ORDER BY created_at DESC
    let mine = Index::create()
        .if_not_exists()
        .name("idx_resume_user_created")
        .table(resume::Entity)
        .col(resume::Column::UserId)
        .col(resume::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    for (name, stmt) in [("idx_resume_created_id", browse), ("idx_resume_user_created", mine)] {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}
