use crate::common::{TestApp, resume_metadata, routes};

mod anonymous {
    use super::*;

    #[tokio::test]
    async fn anonymous_caller_is_limited_after_the_allowance() {
        let app = TestApp::spawn_with(|config| config.access.anonymous_view_limit = 2).await;
        let (owner, _) = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_resume(&owner, resume_metadata("backend")).await;

        for _ in 0..2 {
            let res = app.get(&routes::resume(id), None).await;
            assert_eq!(res.status, 200, "{}", res.text);
        }

        let res = app.get(&routes::resume(id), None).await;
        assert_eq!(res.status, 429);
        assert_eq!(res.code(), 4011);
        let retry_after: u64 = res.headers["retry-after"].to_str().unwrap().parse().unwrap();
        assert!(retry_after > 0);

        // Downloads draw from the same allowance.
        let res = app.get(&routes::resume_download(id), None).await;
        assert_eq!(res.status, 429);
    }

    #[tokio::test]
    async fn listing_is_never_limited() {
        let app = TestApp::spawn_with(|config| config.access.anonymous_view_limit = 1).await;
        let (owner, _) = app.create_authenticated_user("alice@example.com").await;
        app.create_resume(&owner, resume_metadata("backend")).await;

        for _ in 0..5 {
            let res = app.get(routes::RESUMES, None).await;
            assert_eq!(res.status, 200);
        }
    }

    async fn view_as(app: &TestApp, id: i32, forwarded_for: &str) -> u16 {
        app.client
            .get(app.url(&routes::resume(id)))
            .header("X-Forwarded-For", forwarded_for)
            .send()
            .await
            .expect("Failed to send request")
            .status()
            .as_u16()
    }

    #[tokio::test]
    async fn spoofed_forwarded_header_from_untrusted_peer_is_still_limited() {
        let app = TestApp::spawn_with(|config| config.access.anonymous_view_limit = 1).await;
        let (owner, _) = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_resume(&owner, resume_metadata("backend")).await;

        assert_eq!(view_as(&app, id, "203.0.113.1").await, 200);
        assert_eq!(view_as(&app, id, "203.0.113.2").await, 429);
        assert_eq!(view_as(&app, id, "not-an-ip").await, 429);
    }

    #[tokio::test]
    async fn clients_behind_a_trusted_proxy_are_counted_separately() {
        let app = TestApp::spawn_with(|config| {
            config.access.anonymous_view_limit = 1;
            config.server.trusted_proxies = vec!["127.0.0.0/8".parse().unwrap()];
        })
        .await;
        let (owner, _) = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_resume(&owner, resume_metadata("backend")).await;

        assert_eq!(view_as(&app, id, "203.0.113.1").await, 200);
        assert_eq!(view_as(&app, id, "203.0.113.2").await, 200);
        assert_eq!(view_as(&app, id, "203.0.113.1").await, 429);
    }
}

mod registered {
    use super::*;

    #[tokio::test]
    async fn user_without_uploads_has_the_registered_allowance() {
        let app = TestApp::spawn_with(|config| {
            config.access.anonymous_view_limit = 1;
            config.access.registered_view_limit = 3;
        })
        .await;
        let (owner, _) = app.create_authenticated_user("alice@example.com").await;
        let (reader, _) = app.create_authenticated_user("bob@example.com").await;
        let id = app.create_resume(&owner, resume_metadata("backend")).await;

        for _ in 0..3 {
            let res = app.get(&routes::resume(id), Some(&reader)).await;
            assert_eq!(res.status, 200, "{}", res.text);
        }
        let res = app.get(&routes::resume(id), Some(&reader)).await;
        assert_eq!(res.code(), 4011);
    }

    #[tokio::test]
    async fn uploader_is_never_limited() {
        let app = TestApp::spawn_with(|config| {
            config.access.anonymous_view_limit = 1;
            config.access.registered_view_limit = 1;
        })
        .await;
        let (owner, _) = app.create_authenticated_user("alice@example.com").await;
        let (uploader, _) = app.create_authenticated_user("bob@example.com").await;
        let id = app.create_resume(&owner, resume_metadata("backend")).await;
        app.create_resume(&uploader, resume_metadata("frontend")).await;

        for _ in 0..5 {
            let res = app.get(&routes::resume(id), Some(&uploader)).await;
            assert_eq!(res.status, 200, "{}", res.text);
        }
    }

    #[tokio::test]
    async fn owner_is_never_counted() {
        let app = TestApp::spawn_with(|config| config.access.registered_view_limit = 1).await;
        let (owner, _) = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_resume(&owner, resume_metadata("backend")).await;

        for _ in 0..5 {
            let res = app.get(&routes::resume(id), Some(&owner)).await;
            assert_eq!(res.status, 200);
        }
    }

    #[tokio::test]
    async fn disabled_policy_permits_everything() {
        let app = TestApp::spawn_with(|config| {
            config.access.enabled = false;
            config.access.anonymous_view_limit = 1;
        })
        .await;
        let (owner, _) = app.create_authenticated_user("alice@example.com").await;
        let id = app.create_resume(&owner, resume_metadata("backend")).await;

        for _ in 0..3 {
            let res = app.get(&routes::resume(id), None).await;
            assert_eq!(res.status, 200);
        }
    }
}
