use serde_json::json;

use crate::common::{TestApp, resume_metadata, routes};

#[tokio::test]
async fn health_reports_ok_in_the_envelope() {
    let app = TestApp::spawn().await;

    for path in [routes::HEALTH, "/api/v1/health"] {
        let res = app.get(path, None).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.code(), 0);
        assert_eq!(res.body["data"]["status"], "ok");
        assert_eq!(res.body["data"]["environment"], "test");
    }
}

#[tokio::test]
async fn faqs_are_listed() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::FAQS, None).await;

    assert_eq!(res.status, 200);
    let faqs = res.body["data"].as_array().unwrap();
    assert!(!faqs.is_empty());
    assert!(faqs[0]["question"].is_string());
}

#[tokio::test]
async fn seeded_universities_are_listed_by_name() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::UNIVERSITIES, None).await;

    assert_eq!(res.status, 200);
    let names: Vec<&str> = res.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Tsinghua University"));
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
}

#[tokio::test]
async fn seeding_twice_is_harmless() {
    let app = TestApp::spawn().await;
    let before = app.get(routes::UNIVERSITIES, None).await;

    server::seed::seed_universities(&app.db).await.unwrap();

    let after = app.get(routes::UNIVERSITIES, None).await;
    assert_eq!(before.body["data"], after.body["data"]);
}

#[tokio::test]
async fn tags_can_be_filtered_by_type() {
    let app = TestApp::spawn().await;
    let (token, _) = app.create_authenticated_user("alice@example.com").await;
    let mut metadata = resume_metadata("backend");
    metadata["tags"] = json!([
        {"name": "Rust", "type": "tech_stack"},
        {"name": "Backend", "type": "direction"},
        {"name": "Go", "type": "tech_stack"},
    ]);
    app.create_resume(&token, metadata).await;

    let res = app.get(routes::TAGS, None).await;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 3);

    let res = app.get(&format!("{}?type=tech_stack", routes::TAGS), None).await;
    let tags = res.body["data"].as_array().unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0]["name"], "go");
    assert_eq!(tags[1]["name"], "rust");
    assert_eq!(tags[0]["type"], "tech_stack");

    let res = app.get(&format!("{}?type=color", routes::TAGS), None).await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::spawn().await;

    let res = app.get("/api-docs/openapi.json", None).await;

    assert_eq!(res.status, 200);
    assert!(res.body["paths"]["/api/v1/resumes"].is_object());
    assert!(res.body["paths"]["/api/v1/resumes/{id}"]["patch"].is_object());
}
