use std::{collections::BTreeMap, sync::Arc, time::Duration};

use serde_json::json;
use volley::{
    Error, HttpConfig, ReqwestTransport, RetryPolicy, Session, TransportError,
    transport::Method,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, body_string_contains, header, method, path, query_param},
};

fn session(server: &MockServer) -> Session {
    let config = HttpConfig::builder()
        .base_uri(server.uri())
        .default_headers(BTreeMap::from([(
            "User-Agent".to_string(),
            "volley-tests".to_string(),
        )]))
        .build();
    Session::new(Arc::new(ReqwestTransport::default()), Arc::new(config))
}

#[tokio::test]
async fn json_round_trip_with_headers_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(query_param("notify", "true"))
        .and(header("authorization", "Bearer t0k3n"))
        .and(header("user-agent", "volley-tests"))
        .and(body_json(json!({"name": "John Doe", "email": "john@example.com"})))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("X-Request-Id", "42")
                .set_body_json(json!({"id": 42, "name": "John Doe"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server);
    let reply = session
        .http("Create User")
        .method(Method::Post)
        .path("/users")
        .query("notify", true)
        .header("Authorization", "Bearer t0k3n")
        .json(json!({"name": "John Doe", "email": "john@example.com"}))
        .expect_status(201)
        .send()
        .await
        .unwrap();

    assert!(reply.success);
    assert_eq!(reply.get("id"), Some(&json!(42)));
    let mut validator = reply.validator();
    validator
        .status_is(201)
        .has_header("x-request-id")
        .has_header("X-Request-Id")
        .json_contains("name")
        .json_matches(&json!({"name": "John Doe"}));
    assert!(validator.validate(), "{:?}", validator.results());

    let stats = session.aggregate().await;
    assert_eq!(stats.get("Create User").unwrap().count, 1);
}

#[tokio::test]
async fn form_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=testuser"))
        .and(body_string_contains("password=testpass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "abc"})))
        .mount(&server)
        .await;

    let reply = session(&server)
        .http("User Login")
        .method(Method::Post)
        .path("/auth/login")
        .form([("username", "testuser"), ("password", "testpass")])
        .send()
        .await
        .unwrap();

    assert_eq!(reply.get("access_token"), Some(&json!("abc")));
}

#[tokio::test]
async fn multipart_upload_carries_fields_and_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/avatar"))
        .and(body_string_contains("name=\"caption\""))
        .and(body_string_contains("name=\"avatar\""))
        .and(body_string_contains("avatar-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .expect(1)
        .mount(&server)
        .await;

    let file = std::env::temp_dir().join(format!("volley-upload-{}.txt", std::process::id()));
    tokio::fs::write(&file, "avatar-bytes").await.unwrap();

    let reply = session(&server)
        .http("Upload Avatar")
        .method(Method::Post)
        .path("/users/avatar")
        .form([("caption", "profile picture")])
        .file("avatar", &file, "text/plain")
        .send()
        .await;
    tokio::fs::remove_file(&file).await.unwrap();

    let reply = reply.unwrap();
    assert!(reply.success);
    assert_eq!(reply.get("raw_response"), Some(&json!("stored")));
}

#[tokio::test]
async fn retries_503_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/profile"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "active"})))
        .mount(&server)
        .await;

    let reply = session(&server)
        .http("Get User Profile")
        .path("/users/profile")
        .retry(RetryPolicy::new(3, Duration::from_millis(10), 2.0).unwrap())
        .send()
        .await
        .unwrap();

    assert!(reply.success);
    assert_eq!(reply.attempts, 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn terminal_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/7"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "missing"})))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server);
    let reply = session
        .http("Delete User")
        .method(Method::Delete)
        .path("/users/7")
        .expect_status(204)
        .retry(RetryPolicy::new(5, Duration::from_millis(10), 2.0).unwrap())
        .send()
        .await
        .unwrap();

    assert!(!reply.success);
    assert_eq!(reply.attempts, 1);
    assert_eq!(reply.get("error"), Some(&json!("missing")));
    assert_eq!(session.aggregate().await.get("Delete User").unwrap().failures, 1);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = session(&server)
        .http("Slow")
        .path("/slow")
        .timeout(Duration::from_millis(100))
        .send()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(TransportError::Timeout(_))), "{err}");
}
