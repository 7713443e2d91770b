use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub data_api_url: String,
    pub data_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            data_api_url: "http://localhost:54321".to_string(),
            data_api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointing at a wiremock Data API.
    pub fn for_server(server: &MockServer) -> Self {
        Self {
            data_api_url: server.uri(),
            ..Default::default()
        }
    }

    pub fn with_jwt_secret(mut self, secret: &str) -> Self {
        self.jwt_secret = secret.to_string();
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            mongo_uri: String::new(),
            data_api_url: self.data_api_url.clone(),
            data_api_key: self.data_api_key.clone(),
            data_source: "Cluster0".to_string(),
            database: "GlenmoreWellnessDB".to_string(),
            jwt_secret: self.jwt_secret.clone(),
            port: 8000,
            view_refresh_interval_secs: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@glenmore.test".to_string(),
            role: "staff".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, "staff")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

/// Canned Data API responses.
pub struct DataApiMock;

impl DataApiMock {
    /// Answer `action` on `collection` with `body`.
    pub async fn respond(server: &MockServer, action: &str, collection: &str, body: Value) {
        Mock::given(method("POST"))
            .and(path(format!("/action/{}", action)))
            .and(body_partial_json(json!({ "collection": collection })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    /// Like `respond`, additionally requiring `partial` in the request body.
    pub async fn respond_matching(
        server: &MockServer,
        action: &str,
        collection: &str,
        partial: Value,
        body: Value,
    ) {
        Mock::given(method("POST"))
            .and(path(format!("/action/{}", action)))
            .and(body_partial_json(json!({ "collection": collection })))
            .and(body_partial_json(partial))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    pub async fn documents(server: &MockServer, action: &str, collection: &str, documents: Value) {
        Self::respond(server, action, collection, json!({ "documents": documents })).await;
    }

    pub async fn document(server: &MockServer, collection: &str, document: Value) {
        Self::respond(server, "findOne", collection, json!({ "document": document })).await;
    }

    /// `next_id` sees `max` as the current highest id.
    pub async fn max_id(server: &MockServer, collection: &str, max: i64) {
        Self::respond_matching(
            server,
            "aggregate",
            collection,
            json!({ "pipeline": [ {}, { "$group": { "max_value": {} } } ] }),
            json!({ "documents": [ { "_id": null, "max_value": max } ] }),
        )
        .await;
    }

    pub async fn accept_inserts(server: &MockServer, collection: &str) {
        Self::respond(server, "insertOne", collection, json!({ "insertedId": "mock" })).await;
    }

    pub async fn update_matched(server: &MockServer, collection: &str, matched: u64) {
        Self::respond(
            server,
            "updateOne",
            collection,
            json!({ "matchedCount": matched, "modifiedCount": matched }),
        )
        .await;
    }

    pub async fn deleted(server: &MockServer, action: &str, collection: &str, count: u64) {
        Self::respond(server, action, collection, json!({ "deletedCount": count })).await;
    }
}
