//! End-to-end tests driving the full router against an in-memory store.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use noteshelf_api::{ApiSettings, ApiState};
use noteshelf_core::order::OrderPolicy;
use noteshelf_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

async fn make_state(order_policy: OrderPolicy) -> ApiState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  ApiState::new(Arc::new(store), ApiSettings { order_policy, ..Default::default() })
}

struct Reply {
  status: StatusCode,
  cookie: Option<String>,
  body:   Value,
}

async fn oneshot_raw(
  state:        &ApiState<SqliteStore>,
  method:       &str,
  uri:          &str,
  cookie:       Option<&str>,
  content_type: Option<&str>,
  body:         String,
) -> Reply {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(cookie) = cookie {
    builder = builder.header(header::COOKIE, cookie);
  }
  if let Some(content_type) = content_type {
    builder = builder.header(header::CONTENT_TYPE, content_type);
  }
  let req = builder.body(Body::from(body)).unwrap();
  let resp = router(state.clone()).oneshot(req).await.unwrap();

  let status = resp.status();
  let cookie = resp
    .headers()
    .get(header::SET_COOKIE)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(';').next())
    .map(str::to_owned);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  Reply { status, cookie, body }
}

async fn send(
  state:  &ApiState<SqliteStore>,
  method: &str,
  uri:    &str,
  cookie: Option<&str>,
  body:   Option<Value>,
) -> Reply {
  match body {
    Some(json) => {
      oneshot_raw(state, method, uri, cookie, Some("application/json"), json.to_string()).await
    }
    None => oneshot_raw(state, method, uri, cookie, None, String::new()).await,
  }
}

async fn signup(state: &ApiState<SqliteStore>, username: &str, password: &str) -> Reply {
  let body = json!({ "username": username, "password": password });
  send(state, "POST", "/auth/signup", None, Some(body)).await
}

async fn login(state: &ApiState<SqliteStore>, username: &str, password: &str) -> Reply {
  let form = format!("username={username}&password={password}");
  oneshot_raw(
    state,
    "POST",
    "/auth/login",
    None,
    Some("application/x-www-form-urlencoded"),
    form,
  )
  .await
}

/// Sign up and log in; returns the cookie pair to send back.
async fn logged_in(state: &ApiState<SqliteStore>, username: &str) -> String {
  assert_eq!(signup(state, username, "secret1").await.status, StatusCode::CREATED);
  let reply = login(state, username, "secret1").await;
  assert_eq!(reply.status, StatusCode::OK);
  reply.cookie.expect("login sets a cookie")
}

/// The id out of a `201 [{"id": n}]` reply.
fn created_id(reply: &Reply) -> i64 {
  assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
  reply.body[0]["id"].as_i64().unwrap()
}

async fn new_subject(state: &ApiState<SqliteStore>, cookie: &str, name: &str) -> i64 {
  let reply = send(state, "POST", "/subject", Some(cookie), Some(json!({ "subject": name }))).await;
  created_id(&reply)
}

async fn new_topic(state: &ApiState<SqliteStore>, cookie: &str, subject: i64, name: &str) -> i64 {
  let body = json!({ "subId": subject, "topic": name });
  created_id(&send(state, "POST", "/topic", Some(cookie), Some(body)).await)
}

async fn new_note(state: &ApiState<SqliteStore>, cookie: &str, topic: i64, text: &str) -> i64 {
  let body = json!({ "topicId": topic, "note": text });
  created_id(&send(state, "POST", "/note", Some(cookie), Some(body)).await)
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn signup_login_and_fetch_name() {
  let state = make_state(OrderPolicy::Strict).await;

  let created = signup(&state, "alice", "secret1").await;
  assert_eq!(created.status, StatusCode::CREATED);
  assert_eq!(created.body["name"], "alice");

  let wrong = login(&state, "alice", "wrong").await;
  assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
  assert!(wrong.cookie.is_none());

  let ok = login(&state, "alice", "secret1").await;
  assert_eq!(ok.status, StatusCode::OK);
  let cookie = ok.cookie.unwrap();
  assert!(cookie.starts_with("noteshelf_session="));

  let me = send(&state, "GET", "/user", Some(&cookie), None).await;
  assert_eq!(me.status, StatusCode::OK);
  assert_eq!(me.body, json!({ "name": "alice" }));
}

#[tokio::test]
async fn usernames_are_case_insensitive() {
  let state = make_state(OrderPolicy::Strict).await;
  assert_eq!(signup(&state, "Alice", "secret1").await.status, StatusCode::CREATED);

  let dup = signup(&state, "ALICE", "other").await;
  assert_eq!(dup.status, StatusCode::BAD_REQUEST);
  assert_eq!(dup.body["error"], "User already exists.");

  assert_eq!(login(&state, "aLiCe", "secret1").await.status, StatusCode::OK);
}

#[tokio::test]
async fn signup_and_login_require_both_fields() {
  let state = make_state(OrderPolicy::Strict).await;
  let reply = send(&state, "POST", "/auth/signup", None, Some(json!({ "username": "bob" }))).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["error"], "Both username and password required.");

  let reply = oneshot_raw(
    &state,
    "POST",
    "/auth/login",
    None,
    Some("application/x-www-form-urlencoded"),
    "username=bob".into(),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_user_cannot_log_in() {
  let state = make_state(OrderPolicy::Strict).await;
  assert_eq!(login(&state, "nobody", "secret1").await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_the_session() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;

  let status = send(&state, "GET", "/auth/status", Some(&cookie), None).await;
  assert_eq!(status.body, json!(true));

  let out = send(&state, "POST", "/auth/logout", Some(&cookie), None).await;
  assert_eq!(out.status, StatusCode::OK);
  assert_eq!(out.cookie.as_deref(), Some("noteshelf_session="));

  let status = send(&state, "GET", "/auth/status", Some(&cookie), None).await;
  assert_eq!(status.body, json!(false));
  assert_eq!(send(&state, "GET", "/user", Some(&cookie), None).await.status, StatusCode::UNAUTHORIZED);

  let again = send(&state, "POST", "/auth/logout", Some(&cookie), None).await;
  assert_eq!(again.status, StatusCode::BAD_REQUEST);
  assert_eq!(again.body["error"], "Not logged in.");
}

#[tokio::test]
async fn logging_in_again_replaces_the_old_session() {
  let state = make_state(OrderPolicy::Strict).await;
  let first = logged_in(&state, "alice").await;

  let reply = oneshot_raw(
    &state,
    "POST",
    "/auth/login",
    Some(&first),
    Some("application/x-www-form-urlencoded"),
    "username=alice&password=secret1".into(),
  )
  .await;
  let second = reply.cookie.unwrap();
  assert_ne!(first, second);

  assert_eq!(send(&state, "GET", "/user", Some(&first), None).await.status, StatusCode::UNAUTHORIZED);
  assert_eq!(send(&state, "GET", "/user", Some(&second), None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_answer_401() {
  let state = make_state(OrderPolicy::Strict).await;
  for (method, uri) in [
    ("GET", "/user"),
    ("GET", "/user/data"),
    ("GET", "/subject/all"),
    ("GET", "/subject/1"),
    ("DELETE", "/topic/1"),
    ("PATCH", "/note/move/1"),
  ] {
    let reply = send(&state, method, uri, None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    assert_eq!(reply.body["error"], "Login required.");
  }

  let forged = send(&state, "GET", "/user", Some("noteshelf_session=forged"), None).await;
  assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

// ── Hierarchy ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn topics_are_prepended_to_subject_order() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;

  let math = new_subject(&state, &cookie, "Math").await;
  let algebra = new_topic(&state, &cookie, math, "Algebra").await;
  let subject = send(&state, "GET", &format!("/subject/{math}"), Some(&cookie), None).await;
  assert_eq!(subject.body["topicOrder"], json!([algebra]));

  let geometry = new_topic(&state, &cookie, math, "Geometry").await;
  let subject = send(&state, "GET", &format!("/subject/{math}"), Some(&cookie), None).await;
  assert_eq!(subject.body["topicOrder"], json!([geometry, algebra]));

  let topic = send(&state, "GET", &format!("/topic/{geometry}"), Some(&cookie), None).await;
  assert_eq!(topic.body["noteOrder"], json!([]));
  assert_eq!(topic.body["notes"], json!([]));
}

#[tokio::test]
async fn creating_with_missing_fields_is_rejected() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;

  let reply = send(&state, "POST", "/subject", Some(&cookie), Some(json!({}))).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["error"], "Enter name for new subject.");

  let reply = send(&state, "POST", "/topic", Some(&cookie), Some(json!({ "topic": "x" }))).await;
  assert_eq!(reply.body["error"], "No subject ID provided.");

  let body = json!({ "topic": "x", "subId": "abc" });
  let reply = send(&state, "POST", "/topic", Some(&cookie), Some(body)).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["error"], "Invalid ID.");
}

#[tokio::test]
async fn numeric_string_ids_are_accepted() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;
  let math = new_subject(&state, &cookie, "Math").await;

  let body = json!({ "subId": math.to_string(), "topic": "Algebra" });
  let reply = send(&state, "POST", "/topic", Some(&cookie), Some(body)).await;
  assert_eq!(reply.status, StatusCode::CREATED);
}

#[tokio::test]
async fn invalid_path_id_is_400() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;
  let reply = send(&state, "GET", "/subject/abc", Some(&cookie), None).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["error"], "Invalid ID.");
}

#[tokio::test]
async fn other_users_rows_look_missing() {
  let state = make_state(OrderPolicy::Strict).await;
  let alice = logged_in(&state, "alice").await;
  let bob = logged_in(&state, "bob").await;
  let math = new_subject(&state, &alice, "Math").await;
  let algebra = new_topic(&state, &alice, math, "Algebra").await;

  let uri = format!("/subject/{math}");
  let reply = send(&state, "GET", &uri, Some(&bob), None).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["error"], "No such subject.");

  let reply = send(&state, "PATCH", &uri, Some(&bob), Some(json!({ "name": "mine" }))).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);

  let order = json!({ "order": [] });
  let reply = send(&state, "PATCH", &format!("/subject/order/{math}"), Some(&bob), Some(order)).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);

  let body = json!({ "topicId": algebra, "note": "sneaky" });
  let reply = send(&state, "POST", "/note", Some(&bob), Some(body)).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["error"], "No such topic.");

  let subject = send(&state, "GET", &uri, Some(&alice), None).await;
  assert_eq!(subject.body["name"], "Math");
  assert_eq!(subject.body["topicOrder"], json!([algebra]));
}

#[tokio::test]
async fn rename_and_update() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;
  let math = new_subject(&state, &cookie, "Math").await;
  let algebra = new_topic(&state, &cookie, math, "Algebra").await;
  let note = new_note(&state, &cookie, algebra, "draft").await;

  let reply = send(&state, "PATCH", &format!("/subject/{math}"), Some(&cookie), Some(json!({ "name": "Maths" }))).await;
  assert_eq!(reply.body, json!({ "id": math }));
  let reply = send(&state, "PATCH", &format!("/topic/{algebra}"), Some(&cookie), Some(json!({ "name": "Linear" }))).await;
  assert_eq!(reply.body, json!({ "id": algebra }));
  let reply = send(&state, "PATCH", &format!("/note/{note}"), Some(&cookie), Some(json!({ "note": "final" }))).await;
  assert_eq!(reply.body, json!({ "id": note }));

  let tree = send(&state, "GET", &format!("/subject/{math}/with-notes"), Some(&cookie), None).await;
  assert_eq!(tree.body["name"], "Maths");
  assert_eq!(tree.body["topics"][0]["name"], "Linear");
  assert_eq!(tree.body["topics"][0]["notes"][0]["text"], "final");
}

// ── Ordering ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_a_note_removes_it_from_the_order() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;
  let math = new_subject(&state, &cookie, "Math").await;
  let topic = new_topic(&state, &cookie, math, "Algebra").await;
  let a = new_note(&state, &cookie, topic, "a").await;
  let b = new_note(&state, &cookie, topic, "b").await;
  let c = new_note(&state, &cookie, topic, "c").await;

  let reply = send(&state, "DELETE", &format!("/note/{b}"), Some(&cookie), None).await;
  assert_eq!(reply.body, json!({ "id": b }));
  let tree = send(&state, "GET", &format!("/topic/{topic}"), Some(&cookie), None).await;
  assert_eq!(tree.body["noteOrder"], json!([c, a]));

  let again = send(&state, "DELETE", &format!("/note/{b}"), Some(&cookie), None).await;
  assert_eq!(again.status, StatusCode::BAD_REQUEST);
  assert_eq!(again.body["error"], "No such note.");
}

#[tokio::test]
async fn strict_reorder_accepts_permutations_only() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;
  let math = new_subject(&state, &cookie, "Math").await;
  let t1 = new_topic(&state, &cookie, math, "A").await;
  let t2 = new_topic(&state, &cookie, math, "B").await;
  let uri = format!("/subject/order/{math}");

  let reply = send(&state, "PATCH", &uri, Some(&cookie), Some(json!({ "order": [t1, 999] }))).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  let message = reply.body["error"].as_str().unwrap();
  assert!(message.contains("unknown: [999]"), "{message}");

  let reply = send(&state, "PATCH", &uri, Some(&cookie), Some(json!({}))).await;
  assert_eq!(reply.body["error"], "New order required.");

  let subject = send(&state, "GET", &format!("/subject/{math}"), Some(&cookie), None).await;
  assert_eq!(subject.body["topicOrder"], json!([t2, t1]));

  let encoded = format!("[{t1},{t2}]");
  let reply = send(&state, "PATCH", &uri, Some(&cookie), Some(json!({ "order": encoded }))).await;
  assert_eq!(reply.status, StatusCode::OK);
  let subject = send(&state, "GET", &format!("/subject/{math}"), Some(&cookie), None).await;
  assert_eq!(subject.body["topicOrder"], json!([t1, t2]));
}

#[tokio::test]
async fn trusted_reorder_stores_what_it_is_given() {
  let state = make_state(OrderPolicy::Trusted).await;
  let cookie = logged_in(&state, "alice").await;
  let math = new_subject(&state, &cookie, "Math").await;
  let topic = new_topic(&state, &cookie, math, "A").await;
  let note = new_note(&state, &cookie, topic, "n").await;

  let order = json!({ "order": [note, 4242] });
  let reply = send(&state, "PATCH", &format!("/topic/order/{topic}"), Some(&cookie), Some(order)).await;
  assert_eq!(reply.status, StatusCode::OK);

  let tree = send(&state, "GET", &format!("/topic/{topic}"), Some(&cookie), None).await;
  assert_eq!(tree.body["noteOrder"], json!([note, 4242]));
  assert_eq!(tree.body["notes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn moving_a_note_splices_both_orders() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;
  let math = new_subject(&state, &cookie, "Math").await;
  let algebra = new_topic(&state, &cookie, math, "Algebra").await;
  let geometry = new_topic(&state, &cookie, math, "Geometry").await;
  let moving = new_note(&state, &cookie, algebra, "moving").await;
  let staying = new_note(&state, &cookie, algebra, "staying").await;
  let existing = new_note(&state, &cookie, geometry, "existing").await;

  let body = json!({ "topicId": geometry, "position": 1 });
  let reply = send(&state, "PATCH", &format!("/note/move/{moving}"), Some(&cookie), Some(body)).await;
  assert_eq!(reply.body, json!({ "id": moving }));

  let source = send(&state, "GET", &format!("/topic/{algebra}"), Some(&cookie), None).await;
  assert_eq!(source.body["noteOrder"], json!([staying]));
  let ids: Vec<i64> = source.body["notes"]
    .as_array()
    .unwrap()
    .iter()
    .map(|n| n["id"].as_i64().unwrap())
    .collect();
  assert_eq!(ids, vec![staying]);

  let dest = send(&state, "GET", &format!("/topic/{geometry}"), Some(&cookie), None).await;
  assert_eq!(dest.body["noteOrder"], json!([existing, moving]));

  let note = send(&state, "GET", &format!("/note/{moving}"), Some(&cookie), None).await;
  assert_eq!(note.body["topicId"], json!(geometry));
}

#[tokio::test]
async fn moving_into_a_foreign_topic_is_refused() {
  let state = make_state(OrderPolicy::Strict).await;
  let alice = logged_in(&state, "alice").await;
  let bob = logged_in(&state, "bob").await;
  let math = new_subject(&state, &alice, "Math").await;
  let topic = new_topic(&state, &alice, math, "Algebra").await;
  let note = new_note(&state, &alice, topic, "n").await;
  let bobs = new_subject(&state, &bob, "Bob").await;
  let bobs_topic = new_topic(&state, &bob, bobs, "T").await;

  let body = json!({ "topicId": bobs_topic });
  let reply = send(&state, "PATCH", &format!("/note/move/{note}"), Some(&alice), Some(body)).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);

  let note = send(&state, "GET", &format!("/note/{note}"), Some(&alice), None).await;
  assert_eq!(note.body["topicId"], json!(topic));
}

// ── Cascades ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_a_subject_takes_its_children() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;
  let math = new_subject(&state, &cookie, "Math").await;
  let topic = new_topic(&state, &cookie, math, "Algebra").await;
  let note = new_note(&state, &cookie, topic, "n").await;

  let reply = send(&state, "DELETE", &format!("/subject/{math}"), Some(&cookie), None).await;
  assert_eq!(reply.body, json!({ "id": math }));
  for uri in [format!("/topic/{topic}"), format!("/note/{note}")] {
    let reply = send(&state, "GET", &uri, Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
  }
  let all = send(&state, "GET", "/subject/all", Some(&cookie), None).await;
  assert_eq!(all.body, json!([]));
}

#[tokio::test]
async fn user_data_and_account_deletion() {
  let state = make_state(OrderPolicy::Strict).await;
  let cookie = logged_in(&state, "alice").await;
  let math = new_subject(&state, &cookie, "Math").await;
  let topic = new_topic(&state, &cookie, math, "Algebra").await;
  new_note(&state, &cookie, topic, "n").await;

  let data = send(&state, "GET", "/user/data", Some(&cookie), None).await;
  assert_eq!(data.body[0]["id"], json!(math));
  assert_eq!(data.body[0]["topics"][0]["notes"][0]["text"], "n");

  let gone = send(&state, "DELETE", "/user", Some(&cookie), None).await;
  assert_eq!(gone.status, StatusCode::OK);
  assert_eq!(gone.cookie.as_deref(), Some("noteshelf_session="));

  assert_eq!(send(&state, "GET", "/user", Some(&cookie), None).await.status, StatusCode::UNAUTHORIZED);
  assert_eq!(login(&state, "alice", "secret1").await.status, StatusCode::UNAUTHORIZED);
}

// ── Configuration ────────────────────────────────────────────────────────────

#[test]
fn config_defaults() {
  let cfg = ServerConfig::from_toml("").unwrap();
  assert_eq!(cfg.address(), "127.0.0.1:3000");
  assert_eq!(cfg.order_policy, OrderPolicy::Strict);
  assert_eq!(cfg.session.cookie_name, "noteshelf_session");
  assert!(!cfg.session.secure_cookie);
}

#[test]
fn config_from_toml() {
  let cfg = ServerConfig::from_toml(
    r#"
      port = 8080
      order_policy = "trusted"

      [session]
      ttl_hours = 2
      secure_cookie = true
    "#,
  )
  .unwrap();
  assert_eq!(cfg.port, 8080);
  assert_eq!(cfg.order_policy, OrderPolicy::Trusted);
  assert_eq!(cfg.session.ttl_hours, 2);
  assert!(cfg.session.secure_cookie);
  assert_eq!(cfg.session.cookie_name, "noteshelf_session");
  assert_eq!(cfg.api_settings().order_policy, OrderPolicy::Trusted);
}
