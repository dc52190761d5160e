#![allow(dead_code)]

use axum::ServiceExt;
use axum::extract::Request;
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use shorturl_operator::domain::UrlStore;
use shorturl_operator::routes::{app_router, router};
use shorturl_operator::state::AppState;
use std::sync::Arc;

pub fn create_test_state() -> AppState {
    AppState::new(Arc::new(UrlStore::new()))
}

pub fn create_test_server(state: AppState) -> TestServer {
    TestServer::new(router(state)).unwrap()
}

pub fn past() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}

pub fn future() -> DateTime<Utc> {
    Utc::now() + Duration::days(365)
}

/// Serves the full application on an ephemeral local port.
///
/// Returns the base URL, e.g. `http://127.0.0.1:54321`.
pub async fn spawn_service(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app_router(state);

    tokio::spawn(async move {
        axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
            .await
            .unwrap();
    });

    format!("http://{addr}")
}
