//! In-process test server: in-memory storage, seeded directory, router
//! driven through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use delivery_server::auth::create_token;
use delivery_server::sms::SmsSender;
use delivery_server::{AppState, Config, Storage, api};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use shared::models::{Account, MenuItem, Role, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const BUYER: &str = "kim";
pub const OWNER: &str = "lee";
pub const STORE_ID: i64 = 1;
pub const TTEOKBOKKI: i64 = 101; // 4,000
pub const GIMBAP: i64 = 102; // 3,000

#[derive(Default)]
pub struct CapturingSms {
    pub sent: Mutex<Vec<(String, String)>>,
    arrived: Notify,
}

impl CapturingSms {
    /// Wait until `count` messages went out; sends happen on detached tasks
    pub async fn wait_for(&self, count: usize) -> Vec<(String, String)> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let sent = self.sent.lock();
                    if sent.len() >= count {
                        return sent.clone();
                    }
                }
                self.arrived.notified().await;
            }
        })
        .await
        .expect("SMS not sent in time")
    }
}

#[async_trait]
impl SmsSender for CapturingSms {
    async fn send(&self, to: &str, text: &str) -> Result<(), BoxError> {
        self.sent.lock().push((to.to_string(), text.to_string()));
        self.arrived.notify_one();
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub sms: Arc<CapturingSms>,
}

impl TestApp {
    pub fn new() -> Self {
        let storage = Storage::open_in_memory().unwrap();
        seed(&storage);
        let sms = Arc::new(CapturingSms::default());
        let state = AppState::new(Config::default(), storage, sms.clone());
        Self { state, sms }
    }

    pub fn token(&self, user_id: &str, role: Role) -> String {
        create_token(user_id, role, &self.state.jwt_secret).unwrap()
    }

    pub fn buyer_token(&self) -> String {
        self.token(BUYER, Role::User)
    }

    pub fn owner_token(&self) -> String {
        self.token(OWNER, Role::Owner)
    }

    pub fn deposit(&self, user_id: &str) -> i64 {
        self.state.storage.get_account(user_id).unwrap().unwrap().deposit
    }

    pub fn balance(&self, user_id: &str) -> i64 {
        self.state.storage.get_account(user_id).unwrap().unwrap().balance
    }

    /// Send a request and decode the JSON envelope
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.raw(method, uri, token, body).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> http::Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        api::create_router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }
}

fn seed(storage: &Storage) {
    storage
        .upsert_account(&Account {
            user_id: BUYER.into(),
            name: "Kim".into(),
            phone: "010-1111-2222".into(),
            role: Role::User,
            deposit: 15_000,
            balance: 0,
            store_id: None,
            deleted: false,
        })
        .unwrap();
    storage
        .upsert_account(&Account {
            user_id: OWNER.into(),
            name: "Lee".into(),
            phone: "010-9999-8888".into(),
            role: Role::Owner,
            deposit: 0,
            balance: 0,
            store_id: Some(STORE_ID),
            deleted: false,
        })
        .unwrap();
    storage
        .upsert_store(&Store {
            store_id: STORE_ID,
            name: "Mapo Snack".into(),
            owner_id: OWNER.into(),
            min_order_price: 10_000,
            deleted: false,
        })
        .unwrap();
    for (menu_id, name, price) in [(TTEOKBOKKI, "Tteokbokki", 4_000), (GIMBAP, "Gimbap", 3_000)] {
        storage
            .upsert_menu(&MenuItem {
                menu_id,
                store_id: STORE_ID,
                name: name.into(),
                price,
                sold_out: false,
                deleted: false,
            })
            .unwrap();
    }
}
