#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;
use tower::ServiceExt;

use roastery_api::{
    app_router,
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{account, delivery, payment_method, product, user},
    AppState,
};

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Helper harness for spinning up the application against an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let metrics = roastery_api::metrics::install_recorder().expect("install metrics recorder");
        let state = AppState::new(Arc::new(pool), cfg, metrics);
        let router = app_router(state.clone(), auth_service.clone());

        Self {
            router,
            state,
            auth_service,
        }
    }

    pub fn db(&self) -> &sea_orm::DatabaseConnection {
        &self.state.db
    }

    /// Bearer token for `account_id`.
    pub fn token_for(&self, account_id: i32) -> String {
        self.auth_service
            .generate_token(account_id, "user")
            .expect("issue test token")
    }

    pub fn admin_token_for(&self, account_id: i32) -> String {
        self.auth_service
            .generate_token(account_id, "admin")
            .expect("issue admin token")
    }

    /// Seeds a user with an account; `None` fields stay NULL.
    pub async fn seed_account(
        &self,
        email: Option<&str>,
        fullname: Option<&str>,
        address: Option<&str>,
        phone: Option<&str>,
    ) -> account::Model {
        let user = user::ActiveModel {
            email: Set(email.map(str::to_string)),
            role: Set("user".to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed user");

        account::ActiveModel {
            user_id: Set(user.id),
            fullname: Set(fullname.map(str::to_string)),
            address: Set(address.map(str::to_string)),
            phone: Set(phone.map(str::to_string)),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed account")
    }

    /// An account with every contact field on file.
    pub async fn seed_complete_account(&self) -> account::Model {
        self.seed_account(
            Some("jane@example.com"),
            Some("Jane Doe"),
            Some("12 Bean Street"),
            Some("081234567890"),
        )
        .await
    }

    pub async fn seed_product(
        &self,
        name: &str,
        original: Decimal,
        discount: Decimal,
        flash_sale: bool,
        stock: i32,
    ) -> product::Model {
        product::ActiveModel {
            name: Set(name.to_string()),
            price_original: Set(original),
            price_discount: Set(discount),
            flash_sale: Set(flash_sale),
            stock: Set(stock),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed product")
    }

    pub async fn seed_delivery(&self, name: &str, fee: Decimal) -> delivery::Model {
        delivery::ActiveModel {
            name: Set(name.to_string()),
            fee: Set(fee),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed delivery")
    }

    pub async fn seed_payment_method(&self, name: &str) -> payment_method::Model {
        payment_method::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed payment method")
    }

    pub async fn stock_of(&self, product_id: i32) -> i32 {
        product::Entity::find_by_id(product_id)
            .one(self.db())
            .await
            .expect("load product")
            .expect("product exists")
            .stock
    }

    /// Send a request against the router with an optional bearer token and JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Sends a raw body with an explicit content type.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        content_type: &str,
        body: &str,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", content_type);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        self.send(
            builder
                .body(Body::from(body.to_string()))
                .expect("failed to build request"),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        TEST_JWT_SECRET.to_string(),
        3600,
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    // every connection to sqlite::memory: is its own database
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg
}

pub async fn response_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    let json = serde_json::from_slice(&bytes).expect("json response");
    (status, json)
}

/// Decimals travel as strings on the wire.
pub fn decimal_at(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}

pub async fn response_text(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}
