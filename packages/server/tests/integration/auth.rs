use serde_json::json;

use crate::common::{JWT_SECRET, TestApp, TestResponse, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_with_valid_credentials() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::REGISTER,
                &json!({"email": "Alice@Example.com", "password": "securepass"}),
                None,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.code(), 0);
        assert!(res.body["data"]["id"].is_number());
        assert_eq!(res.body["data"]["email"], "alice@example.com");
        assert!(res.body["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn cannot_register_with_an_already_registered_email() {
        let app = TestApp::spawn().await;
        let body = json!({"email": "alice@example.com", "password": "securepass"});

        let first = app.post_json(routes::REGISTER, &body, None).await;
        assert_eq!(first.status, 201, "First registration failed: {}", first.text);

        let res = app
            .post_json(
                routes::REGISTER,
                &json!({"email": " ALICE@example.com ", "password": "otherpass1"}),
                None,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.code(), 2001);
    }

    #[tokio::test]
    async fn cannot_register_with_a_password_that_is_too_short() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::REGISTER,
                &json!({"email": "alice@example.com", "password": "short"}),
                None,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), 1002);
    }

    #[tokio::test]
    async fn cannot_register_with_a_malformed_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::REGISTER,
                &json!({"email": "not-an-email", "password": "securepass"}),
                None,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), 1002);
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn login_token_carries_the_registered_user_id() {
        let app = TestApp::spawn().await;
        let body = json!({"email": "alice@example.com", "password": "securepass"});

        let reg = app.post_json(routes::REGISTER, &body, None).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);
        let registered_id = reg.id();

        let res = app.post_json(routes::LOGIN, &body, None).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["data"]["expires_at"].is_string());

        let token = res.body["data"]["token"].as_str().unwrap();
        let claims = server::utils::jwt::verify(token, JWT_SECRET).unwrap();
        assert_eq!(claims.user_id(), Some(registered_id));
        assert!(res.body["data"]["user"]["last_login_at"].is_string());
    }

    #[tokio::test]
    async fn cannot_login_with_wrong_password() {
        let app = TestApp::spawn().await;

        let reg = app
            .post_json(
                routes::REGISTER,
                &json!({"email": "alice@example.com", "password": "securepass"}),
                None,
            )
            .await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let res = app
            .post_json(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": "wrongpass"}),
                None,
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), 2002);
    }

    #[tokio::test]
    async fn cannot_login_with_unknown_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::LOGIN,
                &json!({"email": "nobody@example.com", "password": "securepass"}),
                None,
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), 2002);
    }
}

mod request_validation {
    use super::*;

    #[tokio::test]
    async fn malformed_json_body_returns_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(app.url(routes::REGISTER))
            .header("Content-Type", "application/json")
            .body("not valid json")
            .send()
            .await
            .expect("Failed to send request");

        let res = TestResponse::from_response(res).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), 1002);
    }

    #[tokio::test]
    async fn missing_required_fields_returns_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(routes::REGISTER, &json!({"email": "alice@example.com"}), None)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), 1002);
    }
}

mod authenticated_access {
    use super::*;

    #[tokio::test]
    async fn me_returns_the_current_profile() {
        let app = TestApp::spawn().await;
        let (token, user_id) = app.create_authenticated_user("alice@example.com").await;

        let res = app.get(routes::ME, Some(&token)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.id(), user_id);
        assert_eq!(res.body["data"]["first_name"], "Test");
    }

    #[tokio::test]
    async fn me_without_token_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::ME, None).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), 1003);
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::ME, Some("not.a.jwt")).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), 2004);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_as_expired() {
        let app = TestApp::spawn().await;
        let (_, user_id) = app.create_authenticated_user("alice@example.com").await;

        let (expired, _) = server::utils::jwt::sign(user_id, JWT_SECRET, -2).unwrap();
        let res = app.get(routes::ME, Some(&expired)).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.code(), 2005);
    }

    #[tokio::test]
    async fn expired_token_with_bad_signature_is_still_expired() {
        let app = TestApp::spawn().await;

        let (forged, _) = server::utils::jwt::sign(1, "some-other-secret", -2).unwrap();
        let res = app.get(routes::ME, Some(&forged)).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), 2005);
    }

    #[tokio::test]
    async fn invalid_token_is_rejected_on_public_routes_too() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::RESUMES, Some("not.a.jwt")).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), 2004);
    }
}
