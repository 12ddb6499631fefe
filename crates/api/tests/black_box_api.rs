use chrono::{Duration as ChronoDuration, Utc};
use devtrack_api::config::ApiConfig;
use devtrack_auth::JwtClaims;
use devtrack_core::UserId;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

const SECRET: &str = "black-box-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let config = ApiConfig::in_memory(SECRET);
        let app = devtrack_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register and log in, returning the bearer token.
    async fn signup(&self, email: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "password": "hunter2", "name": email.split('@').next().unwrap() }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": "hunter2" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = self.client.request(method, self.url(path)).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        let text = res.text().await.unwrap();
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap()
        };
        (status, value)
    }

    async fn create_project(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .send(reqwest::Method::POST, "/projects", token, Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::OK);
        body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(subject: UserId) -> String {
    let claims = JwtClaims::new(subject, Utc::now(), ChronoDuration::minutes(10)).unwrap();
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_and_root_are_public() {
    let server = TestServer::spawn().await;

    let res = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = server.client.get(server.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "DevTrack API");
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer() {
    let server = TestServer::spawn().await;

    let res = server.client.get(server.url("/projects")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = server
        .send(reqwest::Method::GET, "/auth/me", "not-a-jwt", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");

    // Well-signed, but the subject has no user record.
    let (status, body) = server
        .send(reqwest::Method::GET, "/auth/me", &mint_jwt(UserId::new()), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn registration_and_login_failures() {
    let server = TestServer::spawn().await;
    server.signup("Alice@Example.com ").await;

    let res = server
        .client
        .post(server.url("/auth/register"))
        .json(&json!({ "email": "alice@example.com", "password": "x", "name": "Alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "email_taken");

    for (email, password) in [("alice@example.com", "wrong"), ("nobody@example.com", "hunter2")] {
        let res = server
            .client
            .post(server.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "invalid_credentials");
    }
}

#[tokio::test]
async fn me_and_account_deletion() {
    let server = TestServer::spawn().await;
    let token = server.signup("alice@example.com").await;

    let (status, me) = server.send(reqwest::Method::GET, "/auth/me", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "alice@example.com");
    assert_eq!(me["name"], "alice");

    let (status, _) = server.send(reqwest::Method::DELETE, "/auth/me", &token, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = server.send(reqwest::Method::GET, "/auth/me", &token, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn project_and_ticket_flow() {
    let server = TestServer::spawn().await;
    let alice = server.signup("alice@example.com").await;
    let bob = server.signup("bob@example.com").await;
    let carol = server.signup("carol@example.com").await;

    let project = server.create_project(&alice, "Apollo").await;

    let (_, projects) = server.send(reqwest::Method::GET, "/projects", &alice, None).await;
    assert_eq!(projects[0]["project_id"], project.as_str());
    assert_eq!(projects[0]["role"], "ADMIN");

    for (email, role) in [("bob@example.com", "DEV"), ("carol@example.com", "VIEWER")] {
        let (status, body) = server
            .send(
                reqwest::Method::POST,
                &format!("/projects/{project}/member"),
                &alice,
                Some(json!({ "email": email, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"], role);
    }

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            &format!("/projects/{project}/member"),
            &alice,
            Some(json!({ "email": "bob@example.com", "role": "VIEWER" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate_membership");

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            &format!("/projects/{project}/member"),
            &alice,
            Some(json!({ "email": "ghost@example.com", "role": "DEV" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (_, members) = server
        .send(reqwest::Method::GET, &format!("/projects/{project}/member"), &carol, None)
        .await;
    assert_eq!(members.as_array().unwrap().len(), 3);

    let (status, ticket) = server
        .send(
            reqwest::Method::POST,
            "/tickets",
            &bob,
            Some(json!({ "title": "Fix crash", "projectId": project })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticket["order"], 1);
    assert_eq!(ticket["status"], "TODO");
    assert_eq!(ticket["issue_type"], "TASK");
    assert_eq!(ticket["priority"], "MEDIUM");
    assert_eq!(ticket["assigned_to_id"], Value::Null);
    let ticket_id = ticket["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            "/tickets",
            &alice,
            Some(json!({ "title": "Fix crash", "project_id": project })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate_title");

    let (_, me) = server.send(reqwest::Method::GET, "/auth/me", &carol, None).await;
    let (status, body) = server
        .send(
            reqwest::Method::PUT,
            &format!("/tickets/{ticket_id}"),
            &bob,
            Some(json!({ "assignedToId": me["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_assignee");

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            "/tickets",
            &carol,
            Some(json!({ "title": "Viewer ticket", "project_id": project })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_role");

    let (status, body) = server
        .send(
            reqwest::Method::PATCH,
            "/tickets/reorder",
            &alice,
            Some(json!({ "ticketId": ticket_id, "status": "DONE", "order": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, listed) = server
        .send(
            reqwest::Method::GET,
            &format!("/tickets/project/{project}?status=DONE&issueType=TASK"),
            &carol,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["order"], 4);

    let (status, body) = server
        .send(
            reqwest::Method::GET,
            &format!("/tickets/project/{project}?status=BLOCKED"),
            &carol,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = server
        .send(reqwest::Method::DELETE, &format!("/projects/{project}"), &alice, None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = server
        .send(reqwest::Method::GET, &format!("/tickets/{ticket_id}"), &alice, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn outsiders_and_bad_input() {
    let server = TestServer::spawn().await;
    let alice = server.signup("alice@example.com").await;
    let mallory = server.signup("mallory@example.com").await;
    let project = server.create_project(&alice, "Apollo").await;

    let (status, body) = server
        .send(reqwest::Method::GET, &format!("/projects/{project}"), &mallory, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_a_member");

    let (status, body) = server
        .send(reqwest::Method::GET, "/projects/not-a-uuid", &alice, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            "/tickets",
            &alice,
            Some(json!({ "title": "t", "project_id": project, "priority": "SOMEDAY" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = server
        .send(reqwest::Method::POST, "/projects", &alice, Some(json!({ "name": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn comments_and_dashboard() {
    let server = TestServer::spawn().await;
    let alice = server.signup("alice@example.com").await;
    let bob = server.signup("bob@example.com").await;
    let project = server.create_project(&alice, "Apollo").await;
    server
        .send(
            reqwest::Method::POST,
            &format!("/projects/{project}/member"),
            &alice,
            Some(json!({ "email": "bob@example.com", "role": "VIEWER" })),
        )
        .await;

    let (_, ticket) = server
        .send(
            reqwest::Method::POST,
            "/tickets",
            &alice,
            Some(json!({ "title": "Ship it", "project_id": project, "status": "IN_PROGRESS" })),
        )
        .await;
    let ticket_id = ticket["id"].as_str().unwrap().to_string();

    let (status, comment) = server
        .send(
            reqwest::Method::POST,
            &format!("/tickets/{ticket_id}/comments"),
            &bob,
            Some(json!({ "comment": "on it" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["comment"], "on it");
    assert_eq!(comment["user_email"], "bob@example.com");
    let comment_id = comment["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .send(
            reqwest::Method::PUT,
            &format!("/comments/{comment_id}"),
            &alice,
            Some(json!({ "comment": "hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_author");

    let (_, listed) = server
        .send(reqwest::Method::GET, &format!("/tickets/{ticket_id}/comments"), &alice, None)
        .await;
    assert_eq!(listed[0]["comment"], "on it");

    let (status, _) = server
        .send(reqwest::Method::DELETE, &format!("/comments/{comment_id}"), &bob, None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, stats) = server.send(reqwest::Method::GET, "/dashboard/stats", &bob, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({
            "total_projects": 1,
            "total_tickets": 1,
            "todo_tickets": 0,
            "in_progress_tickets": 1,
            "completed_tickets": 0,
        })
    );

    let (_, recent) = server
        .send(reqwest::Method::GET, "/dashboard/recent-activity", &bob, None)
        .await;
    assert_eq!(recent[0]["title"], "Ship it");
    assert_eq!(recent[0]["project_name"], "Apollo");
}
