#![allow(dead_code)]

use std::sync::Arc;

use masque_db::Database;
use masque_feed::Social;
use masque_web::{CALLER_HEADER, Opts, Server};
use reqwest::Method;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// An API server running on a random port with ephemeral storage.
pub struct TestServer {
    handle: JoinHandle<()>,
    _temp_dir: TempDir,
    base_url: String,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(temp_dir.path().join(Database::DB_FILE_NAME))
            .await
            .expect("Failed to open database");

        let opts = Opts::new("127.0.0.1:0".to_owned(), None, false);
        let server = Server::init(opts, Social::new(Arc::new(db)))
            .await
            .expect("Failed to start test server");

        let base_url = format!("http://{}", server.addr().expect("Bound listener"));
        let handle = tokio::spawn(async move {
            server
                .run_until(std::future::pending())
                .await
                .expect("Server failed");
        });

        Self {
            handle,
            _temp_dir: temp_dir,
            base_url,
        }
    }

    /// A driver not logged in as anyone
    pub fn driver(&self) -> ApiDriver {
        ApiDriver {
            client: reqwest::Client::new(),
            base_url: self.base_url.clone(),
            user_id: None,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// HTTP client driver for the JSON API.
///
/// Requests carry the caller header of `user_id`, if set.
#[derive(Clone)]
pub struct ApiDriver {
    client: reqwest::Client,
    base_url: String,
    user_id: Option<String>,
}

impl ApiDriver {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The same driver, acting as `user_id`.
    pub fn as_user(&self, user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_owned()),
            ..self.clone()
        }
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().expect("Driver not logged in")
    }

    /// Register `username` and return a driver acting as them.
    pub async fn register(&self, username: &str) -> Self {
        let resp = self
            .post_json("/api/users", &serde_json::json!({ "username": username }))
            .await;
        assert_eq!(resp.status(), 201, "Registering {username} should succeed");

        let body: serde_json::Value = resp.json().await.expect("JSON body");
        self.as_user(body["id"].as_str().expect("User id"))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> reqwest::Response {
        let mut req = self.client.request(method, self.url(path));
        if let Some(user_id) = &self.user_id {
            req = req.header(CALLER_HEADER, user_id);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await.expect("Request failed")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.send(Method::GET, path, None).await
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.send(Method::DELETE, path, None).await
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn patch_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.send(Method::PATCH, path, Some(body)).await
    }

    /// GET `path` expecting 200, and return the JSON body.
    pub async fn get_ok(&self, path: &str) -> serde_json::Value {
        let resp = self.get(path).await;
        assert_eq!(resp.status(), 200, "GET {path} should succeed");
        resp.json().await.expect("JSON body")
    }

    /// Publish a public post, returning its id.
    pub async fn post(&self, content: &str) -> String {
        let resp = self
            .post_json("/api/posts", &serde_json::json!({ "content": content }))
            .await;
        assert_eq!(resp.status(), 201, "Posting should succeed");
        let body: serde_json::Value = resp.json().await.expect("JSON body");
        body["id"].as_str().expect("Post id").to_owned()
    }

    pub async fn follow(&self, username: &str) -> reqwest::Response {
        self.post_json("/api/follows", &serde_json::json!({ "username": username }))
            .await
    }

    pub async fn set_anonymous(&self, is_anonymous: bool) {
        let resp = self
            .patch_json(
                "/api/mode",
                &serde_json::json!({ "is_anonymous": is_anonymous }),
            )
            .await;
        assert_eq!(resp.status(), 200, "Mode switch should succeed");
    }
}
