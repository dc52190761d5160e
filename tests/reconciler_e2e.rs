mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use shorturl_operator::client::HttpShortenerClient;
use shorturl_operator::operator::object_store::{InMemoryObjectStore, ResourceId};
use shorturl_operator::operator::resources::BackendSpec;
use shorturl_operator::operator::{PassOutcome, Reconciler, ShortURL, ShortURLSpec, Validity};
use shorturl_operator::state::AppState;

struct Cluster {
    deployments: Arc<InMemoryObjectStore<Deployment>>,
    services: Arc<InMemoryObjectStore<Service>>,
    short_urls: Arc<InMemoryObjectStore<ShortURL>>,
    reconciler: Reconciler,
    state: AppState,
    base_url: String,
}

async fn cluster() -> Cluster {
    let state = common::create_test_state();
    let base_url = common::spawn_service(state.clone()).await;

    let deployments = Arc::new(InMemoryObjectStore::<Deployment>::new());
    let services = Arc::new(InMemoryObjectStore::<Service>::new());
    let short_urls = Arc::new(InMemoryObjectStore::<ShortURL>::new());

    let reconciler = Reconciler::new(
        deployments.clone(),
        services.clone(),
        short_urls.clone(),
        Arc::new(HttpShortenerClient::new(base_url.clone(), Duration::from_secs(5)).unwrap()),
        BackendSpec {
            name: "urlshortener-api".to_string(),
            namespace: "urlshortener-operator-system".to_string(),
            image: "docker.io/sadegh81/url-shortener:v2".to_string(),
        },
    );

    Cluster {
        deployments,
        services,
        short_urls,
        reconciler,
        state,
        base_url,
    }
}

fn short_url(name: &str, target: &str, expire_at: Option<DateTime<Utc>>) -> ShortURL {
    let mut obj = ShortURL::new(
        name,
        ShortURLSpec {
            target_url: target.to_string(),
            expire_at,
        },
    );
    obj.metadata.namespace = Some("default".to_string());
    obj
}

#[tokio::test]
async fn test_pass_assigns_and_refreshes() {
    let cluster = cluster().await;
    cluster
        .short_urls
        .insert(short_url("test-resource", "http://google.com", None))
        .unwrap();
    let id = ResourceId::new("test-resource", "default");

    let outcome = cluster.reconciler.reconcile(&id).await.unwrap();

    let PassOutcome::Converged {
        short_path,
        click_count,
        is_valid,
    } = outcome
    else {
        panic!("expected a converged pass, got {outcome:?}");
    };

    assert_eq!(short_path.len(), 4);
    assert_eq!(click_count, 0);
    assert_eq!(is_valid, Validity::True);

    let stored = cluster.short_urls.peek(&id).unwrap();
    let status = stored.status.unwrap();
    assert_eq!(status.short_path.as_deref(), Some(short_path.as_str()));
    assert_eq!(status.click_count, 0);
    assert_eq!(status.is_valid, Validity::True);

    let record = cluster.state.store.get(&short_path).unwrap();
    assert_eq!(record.long_url, "http://google.com");

    assert_eq!(cluster.deployments.len(), 1);
    assert_eq!(cluster.services.len(), 1);
}

#[tokio::test]
async fn test_second_pass_keeps_path_and_tracks_clicks() {
    let cluster = cluster().await;
    cluster
        .short_urls
        .insert(short_url("test-resource", "http://google.com", None))
        .unwrap();
    let id = ResourceId::new("test-resource", "default");

    cluster.reconciler.reconcile(&id).await.unwrap();
    let first_path = cluster
        .short_urls
        .peek(&id)
        .unwrap()
        .short_path()
        .unwrap()
        .to_string();

    let no_redirects = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    for _ in 0..3 {
        let response = no_redirects
            .get(format!("{}/{first_path}", cluster.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 302);
    }

    let outcome = cluster.reconciler.reconcile(&id).await.unwrap();

    assert_eq!(
        outcome,
        PassOutcome::Converged {
            short_path: first_path.clone(),
            click_count: 3,
            is_valid: Validity::True,
        }
    );
    assert_eq!(cluster.state.store.len(), 1);

    assert_eq!(cluster.deployments.writes().creates, 1);
    assert_eq!(cluster.services.writes().creates, 1);
    assert_eq!(cluster.deployments.len(), 1);
    assert_eq!(cluster.services.len(), 1);
}

#[tokio::test]
async fn test_idle_pass_leaves_status_untouched() {
    let cluster = cluster().await;
    cluster
        .short_urls
        .insert(short_url("test-resource", "http://google.com", None))
        .unwrap();
    let id = ResourceId::new("test-resource", "default");

    cluster.reconciler.reconcile(&id).await.unwrap();
    let first = serde_json::to_string(&cluster.short_urls.peek(&id).unwrap().status).unwrap();
    let writes = cluster.short_urls.writes().status_updates;

    cluster.reconciler.reconcile(&id).await.unwrap();
    let second = serde_json::to_string(&cluster.short_urls.peek(&id).unwrap().status).unwrap();

    assert_eq!(first, second);
    assert_eq!(cluster.short_urls.writes().status_updates, writes);
}

#[tokio::test]
async fn test_expired_target_reports_invalid() {
    let cluster = cluster().await;
    cluster
        .short_urls
        .insert(short_url(
            "expired",
            "https://example.com",
            Some(common::past()),
        ))
        .unwrap();
    let id = ResourceId::new("expired", "default");

    let outcome = cluster.reconciler.reconcile(&id).await.unwrap();

    let PassOutcome::Converged {
        is_valid,
        click_count,
        ..
    } = outcome
    else {
        panic!("expected a converged pass, got {outcome:?}");
    };
    assert_eq!(is_valid, Validity::False);
    assert_eq!(click_count, 0);
}

#[tokio::test]
async fn test_missing_resource_writes_nothing() {
    let cluster = cluster().await;
    let id = ResourceId::new("gone", "default");

    let outcome = cluster.reconciler.reconcile(&id).await.unwrap();

    assert_eq!(outcome, PassOutcome::Missing);
    assert_eq!(cluster.short_urls.writes().total(), 0);
    assert!(cluster.state.store.is_empty());

    assert_eq!(cluster.deployments.len(), 1);
    assert_eq!(cluster.services.len(), 1);
}

#[tokio::test]
async fn test_unreachable_service_fails_pass() {
    let cluster = cluster().await;
    cluster
        .short_urls
        .insert(short_url("test-resource", "http://google.com", None))
        .unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let reconciler = Reconciler::new(
        cluster.deployments.clone(),
        cluster.services.clone(),
        cluster.short_urls.clone(),
        Arc::new(HttpShortenerClient::new(dead_url, Duration::from_secs(2)).unwrap()),
        cluster.reconciler.backend().clone(),
    );

    let id = ResourceId::new("test-resource", "default");
    let err = reconciler.reconcile(&id).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(cluster.short_urls.peek(&id).unwrap().short_path(), None);
    assert_eq!(cluster.short_urls.writes().status_updates, 0);
}
