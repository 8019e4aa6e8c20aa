//! End-to-end HTTP tests against the in-memory store and gateway fakes

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use connect_api::{app, models::UserStatus, testing::TestContext};

async fn call(
    ctx: &TestContext,
    method: Method,
    uri: &str,
    uid: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(uid) = uid {
        request = request.header(
            header::AUTHORIZATION,
            format!("Bearer {}", TestContext::token(uid)),
        );
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app(ctx.state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let ctx = TestContext::new();
    let (status, body) = call(&ctx, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let ctx = TestContext::new();
    let (status, body) = call(&ctx, Method::GET, "/user/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = call(&ctx, Method::GET, "/feed/ping", Some("stranger"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sync_then_me() {
    let ctx = TestContext::new();
    ctx.verifier
        .allow(&TestContext::token("new"), "new", Some("new@nwu.ac.bd"))
        .await;

    let (status, _) = call(&ctx, Method::GET, "/user/me", Some("new"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, user) = call(
        &ctx,
        Method::POST,
        "/user/sync",
        Some("new"),
        Some(json!({ "email": "new@nwu.ac.bd" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["status"], "pending");
    assert_eq!(user["role"], "user");
    assert_eq!(user["verification"]["submitted"], false);

    let (status, _) = call(
        &ctx,
        Method::PATCH,
        "/user/profile",
        Some("new"),
        Some(json!({ "name": "Nadia", "department": "Law", "photo": "p1", "studentId": "42" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, me) = call(&ctx, Method::GET, "/user/me", Some("new"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Nadia");
    assert_eq!(me["photoUrl"], "p1");
    assert_eq!(me["profileImage"], "p1");
    assert_eq!(me["studentId"], "42");
    assert_eq!(me["onboardingCompleted"], true);
    assert_eq!(me["friendIds"], json!([]));
}

#[tokio::test]
async fn test_sync_rejects_email_of_other_account() {
    let ctx = TestContext::new();
    ctx.user("a").await;
    ctx.user("b").await;
    let (status, _) = call(
        &ctx,
        Method::POST,
        "/user/sync",
        Some("b"),
        Some(json!({ "email": "a@nwu.ac.bd" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_public_profile_privacy() {
    let ctx = TestContext::new();
    ctx.user("owner").await;
    ctx.user("viewer").await;
    call(
        &ctx,
        Method::PATCH,
        "/user/profile",
        Some("owner"),
        Some(json!({
            "name": "Owner",
            "department": "CSE",
            "bio": "secret",
            "privacy": { "bio": "private", "email": "friends" }
        })),
    )
    .await;

    let (status, profile) = call(&ctx, Method::GET, "/user/owner", Some("viewer"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Owner");
    assert_eq!(profile["department"], "CSE");
    assert!(profile.get("bio").is_none());
    assert!(profile.get("email").is_none());
    assert_eq!(profile["connectionStatus"], "none");

    let (_, own) = call(&ctx, Method::GET, "/user/owner", Some("owner"), None).await;
    assert_eq!(own["bio"], "secret");
    assert_eq!(own["isSelf"], true);
}

#[tokio::test]
async fn test_admin_guard() {
    let ctx = TestContext::new();
    ctx.user("member").await;
    ctx.admin("root").await;
    ctx.verifier
        .allow(&TestContext::token("unsynced"), "unsynced", None)
        .await;

    let (status, _) = call(&ctx, Method::GET, "/admin/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&ctx, Method::GET, "/admin/stats", Some("unsynced"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&ctx, Method::GET, "/admin/stats", Some("member"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, stats) = call(&ctx, Method::GET, "/admin/stats", Some("root"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalUsers"], 2);
}

#[tokio::test]
async fn test_feed_flow() {
    let ctx = TestContext::new();
    ctx.user("a").await;
    ctx.user("b").await;

    let (status, post) = call(
        &ctx,
        Method::POST,
        "/feed/create",
        Some("a"),
        Some(json!({ "content": "hello campus", "visibility": "public" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["authorDepartment"], "General");
    let id = post["_id"].as_str().unwrap().to_string();

    let (_, liked) = call(&ctx, Method::POST, &format!("/feed/{}/like", id), Some("b"), None).await;
    assert_eq!(liked["likes"], json!(["b"]));

    let (_, commented) = call(
        &ctx,
        Method::POST,
        &format!("/feed/{}/comment", id),
        Some("b"),
        Some(json!({ "text": "nice" })),
    )
    .await;
    let comment_id = commented["comments"][0]["_id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &ctx,
        Method::POST,
        &format!("/feed/{}/comment/{}/reply", id, comment_id),
        Some("a"),
        Some(json!({ "text": "thanks" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, comments) = call(&ctx, Method::GET, &format!("/feed/{}/comments", id), Some("a"), None).await;
    assert_eq!(comments[0]["text"], "nice");
    assert_eq!(comments[0]["authorName"], "Unknown");
    assert_eq!(comments[0]["replies"][0]["text"], "thanks");

    let (_, feed) = call(&ctx, Method::GET, "/feed?limit=10&offset=5", Some("b"), None).await;
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["authorName"], "Unknown User");

    let (status, body) = call(&ctx, Method::POST, &format!("/feed/{}/delete", id), Some("b"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Post not found or unauthorized");

    let (status, body) = call(&ctx, Method::POST, &format!("/feed/{}/delete", id), Some("a"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, _) = call(&ctx, Method::POST, "/feed/not-an-id/like", Some("a"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_feed_ping() {
    let ctx = TestContext::new();
    ctx.user("a").await;
    let (status, body) = call(&ctx, Method::GET, "/feed/ping", Some("a"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_mutual_swipe_matches() {
    let ctx = TestContext::new();
    ctx.user("a").await;
    ctx.user("b").await;
    ctx.profile("a", "Arif", "CSE").await;
    ctx.profile("b", "Bithi", "CSE").await;

    let (_, first) = call(
        &ctx,
        Method::POST,
        "/connect/swipe",
        Some("a"),
        Some(json!({ "targetId": "b", "action": "like" })),
    )
    .await;
    assert_eq!(first, json!({ "match": false }));

    let (status, second) = call(
        &ctx,
        Method::POST,
        "/connect/swipe",
        Some("b"),
        Some(json!({ "targetId": "a", "action": "like" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["match"], true);
    assert!(second["conversationId"].is_string());

    let (_, conversations) = call(&ctx, Method::GET, "/chat/conversations", Some("a"), None).await;
    assert_eq!(conversations[0]["id"], second["conversationId"]);
    assert_eq!(conversations[0]["otherUser"]["name"], "Bithi");

    let titles: Vec<String> = ctx.push.sent().await.into_iter().map(|m| m.title).collect();
    assert_eq!(
        titles,
        vec!["New Connection Request", "It's a Match! 🎉", "It's a Match! 🎉"]
    );

    let (status, _) = call(
        &ctx,
        Method::POST,
        "/connect/swipe",
        Some("a"),
        Some(json!({ "targetId": "a", "action": "like" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_send_and_read() {
    let ctx = TestContext::new();
    ctx.user("a").await;
    ctx.user("b").await;

    let (status, message) = call(
        &ctx,
        Method::POST,
        "/chat/send",
        Some("a"),
        Some(json!({ "targetId": "b", "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message["status"], "sent");
    assert_eq!(message["type"], "text");
    let conversation_id = message["conversationId"].as_str().unwrap().to_string();

    let (status, _) = call(
        &ctx,
        Method::POST,
        &format!("/chat/read/{}", conversation_id),
        Some("c"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.user("c").await;
    let (status, _) = call(
        &ctx,
        Method::POST,
        &format!("/chat/read/{}", conversation_id),
        Some("c"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &ctx,
        Method::POST,
        &format!("/chat/read/{}", conversation_id),
        Some("b"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, messages) = call(
        &ctx,
        Method::GET,
        &format!("/chat/messages/{}", conversation_id),
        Some("b"),
        None,
    )
    .await;
    assert_eq!(messages[0]["status"], "seen");
    assert_eq!(messages[0]["read"], true);
}

#[tokio::test]
async fn test_notifications_read_all() {
    let ctx = TestContext::new();
    ctx.user("a").await;
    ctx.user("b").await;
    for text in ["one", "two"] {
        call(
            &ctx,
            Method::POST,
            "/chat/send",
            Some("b"),
            Some(json!({ "targetId": "a", "content": text })),
        )
        .await;
    }

    let (_, inbox) = call(&ctx, Method::GET, "/notifications", Some("a"), None).await;
    assert_eq!(inbox.as_array().unwrap().len(), 2);
    assert_eq!(inbox[0]["data"]["type"], "chat");

    let (_, body) = call(&ctx, Method::PUT, "/notifications/read-all", Some("a"), None).await;
    assert_eq!(body, json!({ "success": true, "modifiedCount": 2 }));

    let id = inbox[0]["_id"].as_str().unwrap();
    let (status, _) = call(&ctx, Method::PUT, &format!("/notifications/{}/read", id), Some("b"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_workflow_writes_audit_log() {
    let ctx = TestContext::new();
    ctx.admin("root").await;
    let member = ctx.user("member").await;
    call(
        &ctx,
        Method::PATCH,
        "/user/verification",
        Some("member"),
        Some(json!({ "idCardUrl": "id.png", "selfieUrl": "me.png" })),
    )
    .await;

    let (_, pending) = call(&ctx, Method::GET, "/admin/verifications", Some("root"), None).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, _) = call(&ctx, Method::PATCH, "/admin/users/bogus/approve", Some("root"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, approved) = call(
        &ctx,
        Method::PATCH,
        &format!("/admin/users/{}/approve", member.id.to_hex()),
        Some("root"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["isVerified"], true);
    assert_eq!(
        ctx.stored_user("member").await.unwrap().status,
        UserStatus::Approved
    );

    let (_, logs) = call(&ctx, Method::GET, "/admin/audit-logs", Some("root"), None).await;
    assert_eq!(logs[0]["action"], "approve_user");
    assert_eq!(logs[0]["performedBy"]["email"], "root@nwu.ac.bd");

    let (status, _) = call(
        &ctx,
        Method::PATCH,
        &format!("/admin/users/{}/ban", ctx.stored_user("root").await.unwrap().id.to_hex()),
        Some("root"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_report_and_resolve() {
    let ctx = TestContext::new();
    ctx.admin("root").await;
    ctx.user("a").await;
    ctx.user("b").await;

    let (status, report) = call(
        &ctx,
        Method::POST,
        "/reports",
        Some("a"),
        Some(json!({ "reportedUserId": "b", "reason": "spam" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "open");

    let (_, reports) = call(&ctx, Method::GET, "/admin/reports", Some("root"), None).await;
    assert_eq!(reports[0]["reporter"]["email"], "a@nwu.ac.bd");
    assert_eq!(reports[0]["reportedUser"]["email"], "b@nwu.ac.bd");

    let id = report["_id"].as_str().unwrap();
    let (_, resolved) = call(
        &ctx,
        Method::PATCH,
        &format!("/admin/reports/{}/resolve", id),
        Some("root"),
        None,
    )
    .await;
    assert_eq!(resolved["status"], "resolved");

    let (status, _) = call(
        &ctx,
        Method::POST,
        "/reports",
        Some("a"),
        Some(json!({ "reportedUserId": "a", "reason": "me" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_broadcast() {
    let ctx = TestContext::new();
    ctx.admin("root").await;
    ctx.user("a").await;
    ctx.user("b").await;

    let (status, body) = call(
        &ctx,
        Method::PATCH,
        "/admin/broadcast",
        Some("root"),
        Some(json!({ "title": "Notice", "message": "Library closed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "sentTo": 3 }));
    assert_eq!(ctx.push.sent().await.len(), 3);
}
