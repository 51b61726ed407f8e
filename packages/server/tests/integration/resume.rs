use reqwest::Method;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use crate::common::{FAKE_JPEG, TestApp, resume_metadata, routes, sample_pdf};
use server::entity::{offer, resume, resume_tag, tag};

mod creation {
    use super::*;

    #[tokio::test]
    async fn upload_returns_preview_url_and_file_key() {
        let app = TestApp::spawn().await;
        let (token, user_id) = app.create_authenticated_user("alice@example.com").await;

        let res = app.upload_pdf(&token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let image_url = res.body["data"]["image_url"].as_str().unwrap();
        assert!(image_url.starts_with(&format!("http://{}/api/v1/files/resumes/{user_id}/", app.addr)));
        assert!(image_url.ends_with(".jpg"));
        assert!(res.body["data"]["file_key"].is_string());
        assert_eq!(res.body["data"]["file_name"], "cv.pdf");

        let files = app.stored_files();
        assert_eq!(files.len(), 1, "only the preview should remain: {files:?}");
        assert_eq!(files[0].extension().unwrap(), "jpg");
    }

    #[tokio::test]
    async fn two_step_create_stores_tags_and_offers() {
        let app = TestApp::spawn().await;
        let (token, user_id) = app.create_authenticated_user("alice@example.com").await;

        let mut metadata = resume_metadata("backend");
        metadata["tags"] = json!([
            {"name": "Rust", "type": "tech_stack"},
            {"name": "rust ", "type": "tech_stack"},
            {"name": "Infra", "type": "direction"},
        ]);
        metadata["offers"] = json!([{"company": "Acme", "position": "SRE", "offer_date": "2026-03-01"}]);

        let id = app.create_resume(&token, metadata).await;
        let res = app.get(&routes::resume(id), Some(&token)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let data = &res.body["data"];
        assert_eq!(data["user_id"], user_id);
        assert_eq!(data["role"], "backend");
        assert_eq!(data["file_type"], "image/jpeg");
        assert_eq!(data["tags"].as_array().unwrap().len(), 2);
        assert_eq!(data["tags"][0]["name"], "infra");
        assert_eq!(data["tags"][1]["name"], "rust");
        assert_eq!(data["offers"][0]["company"], "Acme");
        assert_eq!(data["offers"][0]["offer_date"], "2026-03-01");
    }

    #[tokio::test]
    async fn file_key_can_only_be_used_once() {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;

        let upload = app.upload_pdf(&token).await;
        let mut body = resume_metadata("backend");
        body["file_key"] = upload.body["data"]["file_key"].clone();

        let first = app.post_json(routes::CREATE_RESUME, &body, Some(&token)).await;
        assert_eq!(first.status, 201, "{}", first.text);

        let second = app.post_json(routes::CREATE_RESUME, &body, Some(&token)).await;
        assert_eq!(second.status, 404);
        assert_eq!(second.code(), 3000);
    }

    #[tokio::test]
    async fn file_key_of_another_user_is_forbidden() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.create_authenticated_user("alice@example.com").await;
        let (bob, _) = app.create_authenticated_user("bob@example.com").await;

        let upload = app.upload_pdf(&alice).await;
        let mut body = resume_metadata("backend");
        body["file_key"] = upload.body["data"]["file_key"].clone();

        let res = app.post_json(routes::CREATE_RESUME, &body, Some(&bob)).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.code(), 1004);

        // Still claimable by its owner.
        let res = app.post_json(routes::CREATE_RESUME, &body, Some(&alice)).await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn one_shot_create_accepts_multipart_metadata() {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .send_form(
                Method::POST,
                routes::RESUMES,
                Some(("My CV.pdf", "application/pdf", sample_pdf())),
                &[
                    ("role", "frontend"),
                    ("level", "graduate"),
                    ("university", "Peking University"),
                    ("tags", r#"[{"name":"React","type":"tech_stack"}]"#),
                ],
                Some(&token),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["data"]["title"], "My CV");
        assert_eq!(res.body["data"]["level"], "graduate");
        assert_eq!(res.body["data"]["tags"][0]["name"], "react");
    }

    #[tokio::test]
    async fn invalid_level_is_rejected() {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;

        let upload = app.upload_pdf(&token).await;
        let mut body = resume_metadata("backend");
        body["level"] = json!("senior");
        body["file_key"] = upload.body["data"]["file_key"].clone();

        let res = app.post_json(routes::CREATE_RESUME, &body, Some(&token)).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), 1002);
    }

    #[tokio::test]
    async fn upload_requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .send_form(
                Method::POST,
                routes::UPLOAD_PDF,
                Some(("cv.pdf", "application/pdf", sample_pdf())),
                &[],
                None,
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), 1003);
    }
}

mod upload_validation {
    use super::*;

    #[tokio::test]
    async fn oversized_file_is_rejected_before_any_disk_write() {
        let app = TestApp::spawn_with(|config| config.upload.max_file_size = 1024).await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;

        let mut big = sample_pdf();
        big.resize(4096, b' ');
        let res = app
            .send_form(
                Method::POST,
                routes::UPLOAD_PDF,
                Some(("big.pdf", "application/pdf", big)),
                &[],
                Some(&token),
            )
            .await;

        assert_eq!(res.status, 413, "{}", res.text);
        assert_eq!(res.code(), 3011);
        assert!(app.stored_files().is_empty());
        assert_eq!(app.converter.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_pdf_content_type_is_rejected() {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .send_form(
                Method::POST,
                routes::UPLOAD_PDF,
                Some(("photo.png", "image/png", vec![0x89, b'P', b'N', b'G'])),
                &[],
                Some(&token),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), 1002);
        assert!(app.stored_files().is_empty());
    }

    #[tokio::test]
    async fn pdf_mime_with_wrong_signature_is_rejected() {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .send_form(
                Method::POST,
                routes::UPLOAD_PDF,
                Some(("fake.pdf", "application/pdf", b"hello world".to_vec())),
                &[],
                Some(&token),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), 1002);
        assert!(app.stored_files().is_empty());
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;

        let res = app
            .send_form(Method::POST, routes::UPLOAD_PDF, None, &[("role", "x")], Some(&token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), 1002);
    }
}

mod counters {
    use super::*;

    #[tokio::test]
    async fn non_owner_view_increments_exactly_once_per_call() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.create_authenticated_user("alice@example.com").await;
        let (bob, _) = app.create_authenticated_user("bob@example.com").await;
        let id = app.create_resume(&alice, resume_metadata("backend")).await;
        // Bob owns a resume too, so the view limit does not apply.
        app.create_resume(&bob, resume_metadata("frontend")).await;

        let first = app.get(&routes::resume(id), Some(&bob)).await;
        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(first.body["data"]["view_count"], 1);

        let second = app.get(&routes::resume(id), Some(&bob)).await;
        assert_eq!(second.body["data"]["view_count"], 2);
    }

    #[tokio::test]
    async fn owner_view_does_not_increment() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_resume(&alice, resume_metadata("backend")).await;

        for _ in 0..3 {
            let res = app.get(&routes::resume(id), Some(&alice)).await;
            assert_eq!(res.body["data"]["view_count"], 0);
        }

        let stored = resume::Entity::find_by_id(id).one(&app.db).await.unwrap().unwrap();
        assert_eq!(stored.view_count, 0);
    }

    #[tokio::test]
    async fn download_streams_attachment_and_counts() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_resume(&alice, resume_metadata("backend")).await;

        let res = app
            .client
            .get(app.url(&routes::resume_download(id)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let disposition = res.headers()["content-disposition"].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment;"));
        assert!(disposition.contains(&format!("resume-{id}.jpg")));
        assert_eq!(res.bytes().await.unwrap().as_ref(), FAKE_JPEG);

        let stored = resume::Entity::find_by_id(id).one(&app.db).await.unwrap().unwrap();
        assert_eq!(stored.download_count, 1);
        assert_eq!(stored.view_count, 0);
    }

    #[tokio::test]
    async fn missing_resume_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::resume(9999), None).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.code(), 3000);
    }
}

mod browsing {
    use super::*;

    async fn seeded_app() -> (TestApp, String) {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;

        let mut backend = resume_metadata("Backend");
        backend["tags"] = json!([{"name": "Rust", "type": "tech_stack"}]);
        app.create_resume(&token, backend).await;

        let mut frontend = resume_metadata("Frontend");
        frontend["level"] = json!("graduate");
        frontend["title"] = json!("100% React_dev");
        app.create_resume(&token, frontend).await;

        let mut ml = resume_metadata("ML");
        ml["university"] = json!("Peking University");
        app.create_resume(&token, ml).await;

        (app, token)
    }

    #[tokio::test]
    async fn lists_newest_first_with_pagination() {
        let (app, _) = seeded_app().await;

        let res = app.get(&format!("{}?page=1&size=2", routes::RESUMES), None).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let data = res.body["data"]["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["role"], "ML");
        assert_eq!(data[1]["role"], "Frontend");
        let pagination = &res.body["data"]["pagination"];
        assert_eq!(pagination["total"], 3);
        assert_eq!(pagination["total_pages"], 2);
    }

    #[tokio::test]
    async fn invalid_paging_falls_back_to_defaults() {
        let (app, _) = seeded_app().await;

        let res = app.get(&format!("{}?page=0&size=abc", routes::RESUMES), None).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"]["pagination"]["page"], 1);
        assert_eq!(res.body["data"]["pagination"]["size"], 10);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let (app, _) = seeded_app().await;

        for page in ["3", "18446744073709551615"] {
            let res = app
                .get(&format!("{}?page={page}&size=100", routes::RESUMES), None)
                .await;

            assert_eq!(res.status, 200, "{}", res.text);
            assert!(res.body["data"]["data"].as_array().unwrap().is_empty());
            let pagination = &res.body["data"]["pagination"];
            assert_eq!(pagination["page"].to_string(), page);
            assert_eq!(pagination["total"], 3);
        }
    }

    #[tokio::test]
    async fn filters_by_level_university_and_tag() {
        let (app, _) = seeded_app().await;

        let res = app.get(&format!("{}?level=graduate", routes::RESUMES), None).await;
        assert_eq!(res.body["data"]["pagination"]["total"], 1);
        assert_eq!(res.body["data"]["data"][0]["role"], "Frontend");

        let res = app
            .get(&format!("{}?university=Peking%20University", routes::RESUMES), None)
            .await;
        assert_eq!(res.body["data"]["pagination"]["total"], 1);
        assert_eq!(res.body["data"]["data"][0]["role"], "ML");

        let res = app.get(&format!("{}?tag=RUST", routes::RESUMES), None).await;
        assert_eq!(res.body["data"]["pagination"]["total"], 1);
        assert_eq!(res.body["data"]["data"][0]["role"], "Backend");
    }

    #[tokio::test]
    async fn keyword_matches_title_or_role_case_insensitively() {
        let (app, _) = seeded_app().await;

        let res = app.get(&format!("{}?keyword=backend", routes::RESUMES), None).await;
        assert_eq!(res.body["data"]["pagination"]["total"], 1);

        // Wildcards in the keyword are matched literally.
        let res = app.get(&format!("{}?keyword=100%25", routes::RESUMES), None).await;
        assert_eq!(res.body["data"]["pagination"]["total"], 1);
        let res = app.get(&format!("{}?keyword=_", routes::RESUMES), None).await;
        assert_eq!(res.body["data"]["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn mine_lists_only_the_callers_resumes() {
        let (app, alice) = seeded_app().await;
        let (bob, _) = app.create_authenticated_user("bob@example.com").await;
        app.create_resume(&bob, resume_metadata("QA")).await;

        let res = app.get(routes::MY_RESUMES, Some(&alice)).await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 3);

        let res = app.get(routes::MY_RESUMES, Some(&bob)).await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["data"][0]["role"], "QA");
    }
}

mod ownership {
    use super::*;

    #[tokio::test]
    async fn owner_can_patch_metadata_and_replace_tags() {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;
        let mut metadata = resume_metadata("backend");
        metadata["tags"] = json!([{"name": "Go", "type": "tech_stack"}]);
        metadata["offers"] = json!([{"company": "Acme"}]);
        let id = app.create_resume(&token, metadata).await;

        let res = app
            .patch_json(
                &routes::resume(id),
                &json!({"description": "Updated", "tags": [{"name": "Rust", "type": "tech_stack"}]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"]["description"], "Updated");
        assert_eq!(res.body["data"]["role"], "backend");
        assert_eq!(res.body["data"]["tags"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["data"]["tags"][0]["name"], "rust");
        // Offers were not in the patch and stay put.
        assert_eq!(res.body["data"]["offers"][0]["company"], "Acme");
    }

    #[tokio::test]
    async fn non_owner_cannot_patch_or_delete() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.create_authenticated_user("alice@example.com").await;
        let (bob, _) = app.create_authenticated_user("bob@example.com").await;
        let id = app.create_resume(&alice, resume_metadata("backend")).await;

        let res = app
            .patch_json(&routes::resume(id), &json!({"title": "Mine now"}), &bob)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.code(), 1004);

        let res = app.delete(&routes::resume(id), &bob).await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn delete_removes_offers_tag_links_and_image() {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;
        let mut metadata = resume_metadata("backend");
        metadata["tags"] = json!([{"name": "Rust", "type": "tech_stack"}]);
        metadata["offers"] = json!([{"company": "Acme"}, {"company": "Globex"}]);
        let id = app.create_resume(&token, metadata).await;
        assert_eq!(app.stored_files().len(), 1);

        let res = app.delete(&routes::resume(id), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["data"].is_null());

        assert!(resume::Entity::find_by_id(id).one(&app.db).await.unwrap().is_none());
        let offers = offer::Entity::find()
            .filter(offer::Column::ResumeId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(offers, 0);
        let links = resume_tag::Entity::find()
            .filter(resume_tag::Column::ResumeId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(links, 0);
        // The tag itself survives for reuse.
        assert_eq!(tag::Entity::find().count(&app.db).await.unwrap(), 1);
        assert!(app.stored_files().is_empty());

        let res = app.get(&routes::resume(id), Some(&token)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn replacing_the_file_swaps_the_image() {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_resume(&token, resume_metadata("backend")).await;
        let before = app.stored_files();

        let res = app
            .send_form(
                Method::PUT,
                &routes::resume_file(id),
                Some(("new.pdf", "application/pdf", sample_pdf())),
                &[],
                Some(&token),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"]["file_name"], "new.pdf");
        let after = app.stored_files();
        assert_eq!(after.len(), 1);
        assert_ne!(after, before);
    }

    #[tokio::test]
    async fn tags_are_shared_between_resumes() {
        let app = TestApp::spawn().await;
        let (token, _) = app.create_authenticated_user("alice@example.com").await;

        for role in ["backend", "infra"] {
            let mut metadata = resume_metadata(role);
            metadata["tags"] = json!([{"name": "Rust", "type": "tech_stack"}]);
            app.create_resume(&token, metadata).await;
        }

        let tags = tag::Entity::find()
            .filter(tag::Column::Name.eq("rust"))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(tags, 1);
    }
}
