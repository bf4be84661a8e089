//! Shared fixtures for handler tests: an app wired to in-memory fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::alerts::AlertGate;
use crate::assessment::questions::RawQuestion;
use crate::assessment::scoring::ScoringTable;
use crate::auth::StaticIdentity;
use crate::clock::ManualClock;
use crate::config::Config;
use crate::mail::RecordingMailer;
use crate::report::engine::{LaunchMode, PdfEngine, RenderError};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::memory::MemoryStore;

pub const ADMIN_TOKEN: &str = "admin-access-token";
pub const USER_TOKEN: &str = "user-access-token";
pub const ADMIN_EMAIL: &str = "boss@example.com";

/// Returns a fixed, valid-looking PDF and counts how often it was asked.
/// A failing instance reports empty browser output instead.
#[derive(Default)]
pub struct FakePdf {
    calls: AtomicUsize,
    failing: bool,
}

impl FakePdf {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfEngine for FakePdf {
    fn launch_mode(&self) -> LaunchMode {
        LaunchMode::Interactive
    }

    async fn html_to_pdf(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        assert!(html.contains("<html"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(RenderError::EmptyOutput {
                mode: LaunchMode::Interactive,
            });
        }
        Ok(b"%PDF-1.4\n% fake report\n%%EOF".to_vec())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<ManualClock>,
    pub pdf: Arc<FakePdf>,
}

/// Ten questions (three, three, two, two per dimension), each option carrying
/// an explicit score of 100 / 90 / 60 / 30.
pub fn question_bank() -> Vec<RawQuestion> {
    let layout = [
        ("time_management", 3),
        ("resource_coordination", 3),
        ("risk_control", 2),
        ("team_collaboration", 2),
    ];
    let mut rows = Vec::new();
    for (dimension, count) in layout {
        for n in 1..=count {
            rows.push(RawQuestion {
                id: format!("{dimension}_{n}"),
                text: format!("How does your team handle {dimension} ({n})?"),
                dimension: dimension.to_string(),
                options: json!([
                    { "text": "Consistently, with buffers", "score": 100 },
                    { "text": "Usually", "score": 90 },
                    { "text": "Sometimes", "score": 60 },
                    { "text": "Rarely", "score": 30 },
                ]),
            });
        }
    }
    rows
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::for_tests())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, FakePdf::default())
    }

    /// App whose PDF engine always fails.
    pub fn with_failing_pdf() -> Self {
        Self::build(Config::for_tests(), FakePdf::failing())
    }

    fn build(config: Config, pdf: FakePdf) -> Self {
        let store = Arc::new(MemoryStore::with_questions(question_bank()));
        store.add_admin(ADMIN_EMAIL);
        let mailer = Arc::new(RecordingMailer::default());
        let clock = Arc::new(ManualClock::at_epoch());
        let pdf = Arc::new(pdf);
        let identity = StaticIdentity::default()
            .with_user(ADMIN_TOKEN, ADMIN_EMAIL)
            .with_user(USER_TOKEN, "pm@example.com");

        let state = AppState {
            store: store.clone(),
            pdf: pdf.clone(),
            mailer: mailer.clone(),
            identity: Arc::new(identity),
            clock: clock.clone(),
            alerts: Arc::new(AlertGate::new(clock.clone())),
            scoring: Arc::new(ScoringTable::default()),
            config,
        };

        Self {
            router: build_router(state),
            store,
            mailer,
            clock,
            pdf,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Submits one answer per question, choosing `pick(dimension)` as the option index.
    pub async fn submit(&self, pick: impl Fn(&str) -> usize) -> Value {
        let answers: serde_json::Map<String, Value> = question_bank()
            .into_iter()
            .map(|q| {
                let index = pick(&q.dimension);
                (q.id, json!(index))
            })
            .collect();
        let response = self
            .post_json(
                "/api/assessments",
                json!({
                    "name": "Li Wei",
                    "email": "pm@example.com",
                    "company": "Acme Build",
                    "answers": answers,
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        body_json(response).await
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
