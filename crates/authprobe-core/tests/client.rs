use authprobe_core::{Account, ApiClient, ApiError, Config, Scenario, Step, DEFAULT_USER_LIFE_SECS};
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "result": result}))
}

fn auth_failure() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({"status": "error", "result": "auth failure"}))
}

fn admin_scopes() -> Vec<String> {
    vec!["authadmin".to_string()]
}

/// Admin login answers with `token`, anything else is refused.
async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(body_json(json!({"name": "admin", "secret": "adminadmin", "scopes": ["authadmin"]})))
        .respond_with(ok(json!({"token": token, "scopes": ["authadmin"]})))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "error", "result": "failed"})))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Admin route that succeeds only with the given bearer header
async fn mount_admin_route(server: &MockServer, route: &str, token: &str, result: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(route))
        .and(header("authorization", format!("bearer {}", token).as_str()))
        .respond_with(ok(result))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(auth_failure())
        .with_priority(10)
        .mount(server)
        .await;
}

fn authorization_of(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn requests_to(server: &MockServer, verb: &str, route: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == route)
        .collect()
}

#[tokio::test]
async fn test_login_installs_bearer_token() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/auth"))
        .and(header("authorization", "bearer tok-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ok(json!({"name": "admin", "scopes": ["authadmin"]})))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = ApiClient::new(&server.uri()).expect("client");
    let login = client
        .login("admin", "adminadmin", &admin_scopes())
        .await
        .expect("login");

    assert!(login.is_ok());
    assert_eq!(login.token(), Some("tok-1"));
    assert_eq!(client.authorization().as_deref(), Some("bearer tok-1"));
    let session = client.session().expect("session data");
    assert_eq!(session.username, "admin");
    assert!(session.has_scope("authadmin"));

    let check = client.check().await.expect("check");
    assert!(check.is_ok());
    assert_eq!(check.result["name"], "admin");
    assert_eq!(check.scopes(), admin_scopes());
}

#[tokio::test]
async fn test_refused_login_leaves_session_unchanged() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/auth"))
        .respond_with(auth_failure())
        .mount(&server)
        .await;

    let mut client = ApiClient::new(&server.uri()).expect("client");
    let login = client
        .login("admin", "wrong", &admin_scopes())
        .await
        .expect("refused login is not an error");

    assert!(!login.is_ok());
    assert_eq!(login.message(), Some("failed"));
    assert!(client.session().is_none());

    // A 401 with an envelope body is still data
    let check = client.check().await.expect("check");
    assert_eq!(check.status, "error");
    assert_eq!(check.message(), Some("auth failure"));

    let checks = requests_to(&server, "GET", "/auth").await;
    assert_eq!(checks.len(), 1);
    assert_eq!(authorization_of(&checks[0]), None);
}

#[tokio::test]
async fn test_refused_login_keeps_previous_token() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    let mut client = ApiClient::new(&server.uri()).expect("client");
    client.login("admin", "adminadmin", &admin_scopes()).await.expect("login");
    let refused = client.login("admin", "nope", &admin_scopes()).await.expect("login");

    assert!(!refused.is_ok());
    assert_eq!(client.authorization().as_deref(), Some("bearer tok-1"));
}

#[tokio::test]
async fn test_empty_credentials_rejected_locally() {
    let server = MockServer::start().await;
    let mut client = ApiClient::new(&server.uri()).expect("client");

    assert!(client.login("", "secret", &[]).await.is_err());
    assert!(client.login("admin", "", &[]).await.is_err());
    assert!(requests_to(&server, "POST", "/auth").await.is_empty());
}

#[tokio::test]
async fn test_ok_login_without_token_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ok(json!({"scopes": []})))
        .mount(&server)
        .await;

    let mut client = ApiClient::new(&server.uri()).expect("client");
    let err = client
        .login("admin", "adminadmin", &admin_scopes())
        .await
        .expect_err("missing token must fail");

    assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::InvalidResponse(_))));
    assert!(client.session().is_none());
}

#[tokio::test]
async fn test_clean_is_idempotent() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1").await;

    Mock::given(method("POST"))
        .and(path("/admin/clean"))
        .and(header("authorization", "bearer tok-1"))
        .respond_with(ok(json!("cleaned")))
        .expect(2)
        .mount(&server)
        .await;

    let mut client = ApiClient::new(&server.uri()).expect("client");
    client.login("admin", "adminadmin", &admin_scopes()).await.expect("login");

    for _ in 0..2 {
        let cleaned = client.clean().await.expect("clean");
        assert!(cleaned.is_ok());
        assert_eq!(cleaned.result, json!("cleaned"));
    }

    let cleans = requests_to(&server, "POST", "/admin/clean").await;
    assert!(cleans.iter().all(|r| r.body.is_empty()));
}

#[tokio::test]
async fn test_create_user_requires_admin_session() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-admin").await;
    mount_admin_route(&server, "/admin/user", "tok-admin", json!("created")).await;

    let scopes = vec!["user".to_string()];

    let mut admin = ApiClient::new(&server.uri()).expect("client");
    admin.login("admin", "adminadmin", &admin_scopes()).await.expect("login");
    let created = admin
        .create_user("test", "testpw", DEFAULT_USER_LIFE_SECS, &scopes)
        .await
        .expect("create user");
    assert!(created.is_ok());

    // A second session never sees the admin's token
    let anonymous = ApiClient::new(&server.uri()).expect("client");
    let refused = anonymous
        .create_user("test", "testpw", DEFAULT_USER_LIFE_SECS, &scopes)
        .await
        .expect("refusal is data");
    assert_eq!(refused.status, "error");

    let posts = requests_to(&server, "POST", "/admin/user").await;
    assert_eq!(posts.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&posts[0].body).expect("json body");
    assert_eq!(
        body,
        json!({"name": "test", "secret": "testpw", "life": 157_680_000u64, "scopes": ["user"]})
    );
    assert_eq!(authorization_of(&posts[1]), None);
}

#[tokio::test]
async fn test_create_scope_sends_json_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/scope"))
        .and(body_json(json!("user")))
        .and(header("authorization", "bearer given"))
        .respond_with(ok(json!("created")))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = ApiClient::new(&server.uri()).expect("client");
    client.set_token("given".to_string()).expect("token");

    let created = client.create_scope("user").await.expect("create scope");
    assert!(created.is_ok());
}

#[tokio::test]
async fn test_non_json_success_body_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).expect("client");
    let err = client.check().await.expect_err("html is not an envelope");
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::InvalidResponse(msg)) => assert!(msg.contains("oops")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_error_body_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/clean"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).expect("client");
    let err = client.clean().await.expect_err("500 without envelope");
    assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::ServerError(_))));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = MockServer::start().await;

    let client = ApiClient::new(&server.uri()).expect("client");
    let err = client.check().await.expect_err("no route mounted");
    assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Grab a free port, then close it so nothing is listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let client = ApiClient::new(&format!("http://127.0.0.1:{}", port)).expect("client");
    let err = client.check().await.expect_err("server is gone");
    assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NetworkError(_))));
}

#[tokio::test]
async fn test_health_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("alive. caching is enabled. cache lifetime 60\n"))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).expect("client");
    let health = client.health().await.expect("health");
    assert!(health.starts_with("alive."));
}

#[tokio::test]
async fn test_scenario_runs_selected_steps_in_order() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-admin").await;

    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(body_json(json!({"name": "test", "secret": "testpw", "scopes": ["user"]})))
        .respond_with(ok(json!({"token": "tok-test", "scopes": ["user"]})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth"))
        .and(header("authorization", "bearer tok-admin"))
        .respond_with(ok(json!({"name": "admin", "scopes": ["authadmin"]})))
        .mount(&server)
        .await;

    mount_admin_route(&server, "/admin/scope", "tok-admin", json!("created")).await;
    mount_admin_route(&server, "/admin/user", "tok-admin", json!("created")).await;
    mount_admin_route(&server, "/admin/clean", "tok-admin", json!("cleaned")).await;

    let config = Config {
        base_url: Some(server.uri()),
        timeout_secs: Some(5),
    };
    let scenario = Scenario {
        create_scope: Some("user".to_string()),
        second_login: Some(Account::default_test_user()),
        ..Scenario::default()
    }
    .with_default_test_user();

    let outcomes = scenario.run(&config).await.expect("scenario");
    let steps: Vec<Step> = outcomes.iter().map(|o| o.step).collect();
    assert_eq!(steps, scenario.steps());
    assert!(outcomes.iter().all(|o| o.response.is_ok()));
    assert_eq!(outcomes.last().and_then(|o| o.response.token()), Some("tok-test"));

    // The second actor logs in on a fresh session
    let logins = requests_to(&server, "POST", "/auth").await;
    assert_eq!(logins.len(), 2);
    assert_eq!(authorization_of(&logins[1]), None);
}

#[tokio::test]
async fn test_scenario_continues_after_refused_login() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-admin").await;
    Mock::given(method("GET"))
        .and(path("/auth"))
        .respond_with(auth_failure())
        .mount(&server)
        .await;
    mount_admin_route(&server, "/admin/clean", "tok-admin", json!("cleaned")).await;

    let config = Config {
        base_url: Some(server.uri()),
        timeout_secs: None,
    };
    let scenario = Scenario {
        admin: Account::new("admin", "wrong", &["authadmin"]),
        ..Scenario::default()
    };

    let outcomes = scenario.run(&config).await.expect("scenario");
    let statuses: Vec<&str> = outcomes.iter().map(|o| o.response.status.as_str()).collect();
    assert_eq!(statuses, vec!["error", "error", "error"]);
}

#[tokio::test]
async fn test_cookies_stay_within_their_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(
            ok(json!({"token": "tok-1"})).insert_header("set-cookie", "sid=abc; Path=/"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth"))
        .and(header("cookie", "sid=abc"))
        .respond_with(ok(json!("cookie")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth"))
        .respond_with(ok(json!("nocookie")))
        .with_priority(10)
        .mount(&server)
        .await;

    let mut first = ApiClient::new(&server.uri()).expect("client");
    first.login("admin", "adminadmin", &admin_scopes()).await.expect("login");
    let check = first.check().await.expect("check");
    assert_eq!(check.result, json!("cookie"));

    let second = ApiClient::new(&server.uri()).expect("client");
    let check = second.check().await.expect("check");
    assert_eq!(check.result, json!("nocookie"));
}

#[tokio::test]
async fn test_configured_timeout_applies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth"))
        .respond_with(ok(json!("slow")).set_delay(std::time::Duration::from_secs(2)))
        .mount(&server)
        .await;

    let impatient = ApiClient::from_config(&Config {
        base_url: Some(server.uri()),
        timeout_secs: Some(1),
    })
    .expect("client");
    let err = impatient.check().await.expect_err("request outlives the timeout");
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::NetworkError(e)) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {other:?}"),
    }

    // No timeout configured: the same slow request completes
    let patient = ApiClient::from_config(&Config {
        base_url: Some(server.uri()),
        timeout_secs: None,
    })
    .expect("client");
    let slow = patient.check().await.expect("slow check");
    assert_eq!(slow.result, json!("slow"));
}
