use forum_client::{ApiClient, ForumClientError, Method, ProfileUpdate};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> ApiClient {
    ApiClient::new(server.uri()).expect("client should build")
}

#[tokio::test]
async fn error_status_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Credenciais inválidas"})),
        )
        .mount(&server)
        .await;

    let err = api(&server)
        .login("alice", "wrong")
        .await
        .expect_err("login must fail");

    assert_eq!(err.status().map(|s| s.as_u16()), Some(400));
    assert_eq!(err.server_message(), Some("Credenciais inválidas"));
    assert!(!err.is_auth_failure());
}

#[tokio::test]
async fn error_field_is_used_when_message_is_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "Token inválido"})))
        .mount(&server)
        .await;

    let err = api(&server)
        .current_user("t1")
        .await
        .expect_err("request must fail");

    assert!(err.is_auth_failure());
    assert_eq!(err.user_message("fallback"), "Token inválido");
}

#[tokio::test]
async fn non_json_error_body_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = api(&server).get_post(1).await.expect_err("must fail");
    assert!(err.server_message().is_none());
    assert_eq!(err.user_message("fallback"), "fallback");
}

#[tokio::test]
async fn empty_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = api(&server).current_user("t1").await.expect_err("must fail");
    assert!(matches!(err, ForumClientError::Decode(_)));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"not": "a list"})))
        .mount(&server)
        .await;

    let err = api(&server).list_posts("").await.expect_err("must fail");
    assert!(matches!(err, ForumClientError::Decode(_)));
}

#[tokio::test]
async fn authenticated_calls_send_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/posts"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let posts = api(&server).my_posts("t1").await.expect("must succeed");
    assert!(posts.is_empty());
}

#[tokio::test]
async fn register_and_delete_accept_empty_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(
            json!({"username": "bob", "email": "bob@example.com", "password": "pw"}),
        ))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = api(&server);
    client
        .register("bob", "bob@example.com", "pw")
        .await
        .expect("register must succeed");
    client
        .delete_current_user("t1")
        .await
        .expect("delete must succeed");
}

#[tokio::test]
async fn search_query_is_passed_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("q", "gatos & cães"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    api(&server)
        .list_posts("gatos & cães")
        .await
        .expect("must succeed");
}

#[tokio::test]
async fn profile_update_body_contains_only_present_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/users/me"))
        .and(body_json(json!({"username": "alice2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let update = ProfileUpdate {
        username: Some("alice2".to_string()),
        ..ProfileUpdate::default()
    };
    let response = api(&server)
        .update_current_user("t1", &update)
        .await
        .expect("must succeed");
    assert_eq!(response.message.as_deref(), Some("ok"));
}

#[tokio::test]
async fn generic_request_round_trips_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts/3/like"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"liked": true})))
        .mount(&server)
        .await;

    let body: Value = api(&server)
        .request(Method::POST, "/posts/3/like", Some(&json!({})), Some("t1"))
        .await
        .expect("must succeed");
    assert_eq!(body, json!({"liked": true}));
}
