mod support;

use std::collections::HashSet;

use axum::http::StatusCode;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use bulletin_api::middleware::WritePolicy;
use bulletin_types::events::PushEvent;

use support::{app, get, post_json, post_json_with_token, send, test_state};

async fn login_token(app: &axum::Router, username: &str, password: &str) -> String {
    let creds = json!({ "username": username, "password": password });
    let (status, _) = send(app, post_json("/register", creds.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(app, post_json("/login", creds)).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("token").to_string()
}

#[tokio::test]
async fn register_login_post_and_observe_broadcast() {
    let state = test_state(WritePolicy::Public);
    let app = app(state.clone());

    let (status, body) = send(
        &app,
        post_json("/register", json!({ "username": "alice", "password": "pw1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    assert!(!body.to_string().contains("pw1"));

    let (status, body) = send(
        &app,
        post_json("/login", json!({ "username": "alice", "password": "pw1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().expect("token");
    assert_eq!(
        state.tokens.verify(token).map(|c| c.username),
        Some("alice".to_string())
    );

    let mut s1 = state.hub.subscribe();
    let mut s2 = state.hub.subscribe();

    let (status, post) = send(
        &app,
        post_json("/posts", json!({ "title": "Hello", "content": "World" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["id"], 1);
    assert_eq!(post["title"], "Hello");
    assert_eq!(post["content"], "World");

    for sub in [&mut s1, &mut s2] {
        let msg = sub.try_recv().expect("new_post delivered");
        let PushEvent::NewPost(p) = &msg.event else {
            panic!("expected new_post, got {:?}", msg.event);
        };
        assert_eq!(serde_json::to_value(p).unwrap(), post);
        assert!(sub.try_recv().is_none());
    }

    // Subscribers that join afterwards see nothing of it
    let mut late = state.hub.subscribe();
    assert!(late.try_recv().is_none());

    let (status, comments) = send(&app, get("/comments/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments, json!([]));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = app(test_state(WritePolicy::Public));
    let creds = json!({ "username": "bob", "password": "hunter2" });

    let (status, _) = send(&app, post_json("/register", creds.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, post_json("/register", creds)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "registration failed");
}

#[tokio::test]
async fn invalid_registration_is_rejected() {
    let app = app(test_state(WritePolicy::Public));

    for body in [
        json!({ "username": "", "password": "pw" }),
        json!({ "username": "carol", "password": "" }),
        json!({ "username": "carol" }),
    ] {
        let (status, _) = send(&app, post_json("/register", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let app = app(test_state(WritePolicy::Public));
    login_token(&app, "dave", "right").await;

    let (wrong_status, wrong_body) = send(
        &app,
        post_json("/login", json!({ "username": "dave", "password": "wrong" })),
    )
    .await;
    let (unknown_status, unknown_body) = send(
        &app,
        post_json("/login", json!({ "username": "nobody", "password": "right" })),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn posts_are_listed_newest_first() {
    let app = app(test_state(WritePolicy::Public));

    for title in ["P1", "P2", "P3"] {
        let (status, _) = send(
            &app,
            post_json("/posts", json!({ "title": title, "content": "c" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, posts) = send(&app, get("/posts")).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = posts
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["P3", "P2", "P1"]);
}

#[tokio::test]
async fn invalid_posts_are_not_stored_or_broadcast() {
    let state = test_state(WritePolicy::Public);
    let app = app(state.clone());
    let mut sub = state.hub.subscribe();

    let (status, body) = send(&app, post_json("/posts", json!({ "title": "", "content": "c" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, post_json("/posts", json!({ "title": "t" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let malformed = axum::http::Request::post("/posts")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(sub.try_recv().is_none());
    let (_, posts) = send(&app, get("/posts")).await;
    assert_eq!(posts, json!([]));
}

#[tokio::test]
async fn comments_are_stored_listed_and_broadcast() {
    let state = test_state(WritePolicy::Public);
    let app = app(state.clone());

    let (_, post) = send(&app, post_json("/posts", json!({ "title": "t", "content": "c" }))).await;
    let mut sub = state.hub.subscribe();

    let (status, comment) = send(
        &app,
        post_json("/comments", json!({ "post_id": post["id"], "content": "first!" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["post_id"], post["id"]);
    assert_eq!(comment["content"], "first!");

    let msg = sub.try_recv().expect("new_comment delivered");
    assert_eq!(msg.event.kind(), "new_comment");
    let pushed: Value = serde_json::from_str(&msg.json).unwrap();
    assert_eq!(pushed["type"], "new_comment");
    assert_eq!(pushed["data"], comment);

    // Dangling post ids are accepted and kept apart
    let (status, _) = send(
        &app,
        post_json("/comments", json!({ "post_id": 999, "content": "orphan" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = send(&app, get(&format!("/comments/{}", post["id"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([comment]));

    let (_, orphans) = send(&app, get("/comments/999")).await;
    assert_eq!(orphans.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn authenticated_policy_requires_valid_token() {
    let state = test_state(WritePolicy::Authenticated);
    let app = app(state.clone());
    let token = login_token(&app, "erin", "pw").await;
    let body = json!({ "title": "t", "content": "c" });

    let (status, _) = send(&app, post_json("/posts", body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, post_json_with_token("/posts", body.clone(), "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        post_json("/comments", json!({ "post_id": 1, "content": "c" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, post) = send(&app, post_json_with_token("/posts", body, &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["id"], 1);

    // Reads stay public
    let (status, _) = send(&app, get("/posts")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn public_policy_still_rejects_forged_tokens() {
    let app = app(test_state(WritePolicy::Public));
    let body = json!({ "title": "t", "content": "c" });

    let (status, _) = send(&app, post_json_with_token("/posts", body.clone(), "not.a.token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, post_json("/posts", body)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn concurrent_posts_get_distinct_ids() {
    let state = test_state(WritePolicy::Public);
    let app = app(state.clone());
    let mut sub = state.hub.subscribe();
    const N: usize = 32;

    let tasks: Vec<_> = (0..N)
        .map(|i| {
            let app = app.router.clone();
            tokio::spawn(async move {
                send(&app, post_json("/posts", json!({ "title": format!("t{i}"), "content": "c" }))).await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        let (status, post) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        ids.insert(post["id"].as_i64().unwrap());
    }
    assert_eq!(ids.len(), N);

    // Every committed post was broadcast exactly once
    let pushed: HashSet<i64> = std::iter::from_fn(|| sub.try_recv())
        .map(|m| match &m.event {
            PushEvent::NewPost(p) => p.id,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(pushed, ids);
}

#[tokio::test]
async fn non_numeric_post_id_is_a_json_bad_request() {
    let app = app(test_state(WritePolicy::Public));

    for uri in ["/comments/abc", "/comments/1.5", "/comments/99999999999999999999"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "malformed path parameter", "{uri}");
    }
}

#[tokio::test]
async fn unmatched_paths_serve_the_spa_entry() {
    let app = app(test_state(WritePolicy::Public));

    let response = app.router.clone().oneshot(get("/some/client/route")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("<title>bulletin</title>"));
}

#[tokio::test]
async fn static_dir_is_removed_with_the_app() {
    let app = app(test_state(WritePolicy::Public));
    let dir = app.static_path().to_path_buf();
    assert!(dir.join("index.html").is_file());

    drop(app);
    assert!(!dir.exists());
}
