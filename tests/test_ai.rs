mod common;

use axum::http::StatusCode;
use common::TestEnv;
use serde_json::{json, Value};

async fn saved_item(server: &axum_test::TestServer, token: &str) -> String {
    let item = common::create_item(
        server,
        token,
        json!({
            "url": "https://example.com/borrowck",
            "title": "Understanding the borrow checker",
            "platform": "Web",
            "tags": ["rust"],
        }),
    )
    .await;
    item["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_summary_is_parsed_and_stored() {
    let env = TestEnv::start();
    let server = env.server();
    let (token, _) = common::register(&server, "ai@example.com").await;
    let id = saved_item(&server, &token).await;

    env.llm.push_reply(
        "```json\n[\"References never outlive data.\", \"One writer or many readers.\", \"Lifetimes are checked statically.\", \"Extra line\"]\n```",
    );

    let item: Value = server
        .post(&format!("/api/items/{id}/ai-summary"))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(
        item["ai"]["summary"],
        json!([
            "References never outlive data.",
            "One writer or many readers.",
            "Lifetimes are checked statically."
        ])
    );
    assert!(item["ai"]["generated_at"].is_string());

    let prompts = env.llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Understanding the borrow checker"));

    let plan: Value = server
        .get("/api/users/plan")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(plan["usage"]["ai_generations_this_month"], 1);
}

#[tokio::test]
async fn test_key_ideas_and_action_items_accept_bullets() {
    let env = TestEnv::start();
    let server = env.server();
    let (token, _) = common::register(&server, "bullets@example.com").await;
    let id = saved_item(&server, &token).await;

    env.llm.push_reply("- Ownership moves values\n- Borrowing lends them");
    env.llm.push_reply("1. Read chapter 4\n2. Rewrite the parser");

    let item: Value = server
        .post(&format!("/api/items/{id}/extract-ideas"))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(
        item["ai"]["key_ideas"],
        json!(["Ownership moves values", "Borrowing lends them"])
    );

    let item: Value = server
        .post(&format!("/api/items/{id}/action-items"))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(
        item["ai"]["action_items"],
        json!(["Read chapter 4", "Rewrite the parser"])
    );
    // Earlier annotations survive later generations
    assert_eq!(item["ai"]["key_ideas"][0], "Ownership moves values");
}

#[tokio::test]
async fn test_smart_tags_skip_existing_and_can_be_applied() {
    let env = TestEnv::start();
    let server = env.server();
    let (token, _) = common::register(&server, "smart@example.com").await;
    let id = saved_item(&server, &token).await;

    env.llm.push_reply("Rust, #Lifetimes, memory safety, rust");

    let item: Value = server
        .post(&format!("/api/items/{id}/smart-tags"))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(
        item["ai"]["suggested_tags"],
        json!(["lifetimes", "memory safety"])
    );
    assert_eq!(item["tags"], json!(["rust"]));

    let item: Value = server
        .post(&format!("/api/items/{id}/apply-suggestions"))
        .authorization_bearer(&token)
        .json(&json!({ "tags": ["lifetimes"] }))
        .await
        .json();
    assert_eq!(item["tags"], json!(["rust", "lifetimes"]));
    assert_eq!(item["ai"]["suggested_tags"], json!(["memory safety"]));
}

#[tokio::test]
async fn test_suggest_collection() {
    let env = TestEnv::start();
    let server = env.server();
    let (token, _) = common::register(&server, "suggest@example.com").await;
    let id = saved_item(&server, &token).await;

    // No collections: answered without asking the model
    let suggestion: Value = server
        .post(&format!("/api/items/{id}/suggest-collection"))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(suggestion["collection_id"], Value::Null);
    assert!(env.llm.prompts().is_empty());

    let collection: Value = server
        .post("/api/collections")
        .authorization_bearer(&token)
        .json(&json!({ "name": "Programming" }))
        .await
        .json();
    server
        .post("/api/collections")
        .authorization_bearer(&token)
        .json(&json!({ "name": "Cooking" }))
        .await;

    env.llm.push_reply("\"programming\"");
    let suggestion: Value = server
        .post(&format!("/api/items/{id}/suggest-collection"))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(suggestion["collection_id"], collection["id"]);
    assert_eq!(suggestion["collection_name"], "Programming");
    assert!(env.llm.prompts()[0].contains("- Cooking"));

    env.llm.push_reply("none");
    let suggestion: Value = server
        .post(&format!("/api/items/{id}/suggest-collection"))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(suggestion["collection_id"], Value::Null);
}

#[tokio::test]
async fn test_free_plan_ai_quota() {
    let env = TestEnv::start();
    let server = env.server_permissive();
    let (token, _) = common::register(&server, "quota@example.com").await;
    let id = saved_item(&server, &token).await;

    for _ in 0..10 {
        server
            .post(&format!("/api/items/{id}/ai-summary"))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();
    }

    let response = server
        .post(&format!("/api/items/{id}/ai-summary"))
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert!(body["detail"].as_str().unwrap().contains("10 AI generations"));
    assert_eq!(env.llm.prompts().len(), 10);

    common::upgrade(&server, &token).await;
    server
        .post(&format!("/api/items/{id}/ai-summary"))
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_ai_errors() {
    let env = TestEnv::start();
    let server = env.server_permissive();
    let (token, _) = common::register(&server, "aierr@example.com").await;
    let id = saved_item(&server, &token).await;

    server
        .post("/api/items/missing/ai-summary")
        .authorization_bearer(&token)
        .await
        .assert_status_not_found();

    env.llm.push_failure("model overloaded");
    let response = server
        .post(&format!("/api/items/{id}/ai-summary"))
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    // A failed generation is not counted
    let plan: Value = server
        .get("/api/users/plan")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(plan["usage"]["ai_generations_this_month"], 0);
}

#[tokio::test]
async fn test_ai_unconfigured_is_unavailable() {
    let env = TestEnv::start_without_ai();
    let server = env.server_permissive();
    let (token, _) = common::register(&server, "noai@example.com").await;
    let id = saved_item(&server, &token).await;

    let response = server
        .post(&format!("/api/items/{id}/smart-tags"))
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["detail"], "AI features are not configured");
}
