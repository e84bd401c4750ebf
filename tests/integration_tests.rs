use async_trait::async_trait;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderValue, Request, StatusCode},
    middleware,
    routing::get,
    Json, Router,
};
use http_body_util::BodyExt;
use rs_limits::{
    admin::set_class,
    middleware::{limit_class_middleware, LimitClass, NovaContext},
    ClassStore, Classifier, Environ, LimitsError, LimitsResult, MemoryStore, LIMIT_CLASS_KEY,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn echo(
    class: Option<Extension<LimitClass>>,
    context: Option<Extension<NovaContext>>,
) -> Json<Value> {
    Json(json!({
        "class": class.map(|Extension(LimitClass(class))| class),
        "quota_class": context.and_then(|Extension(ctx)| ctx.quota_class().map(str::to_string)),
    }))
}

async fn environ(environ: Option<Extension<Environ>>) -> Json<Value> {
    Json(json!(environ.map(|Extension(environ)| environ)))
}

fn app(store: Arc<dyn ClassStore>, priorities: &str) -> Router {
    let classifier = Arc::new(Classifier::new(store, priorities));
    Router::new()
        .route("/servers", get(echo))
        .route("/environ", get(environ))
        .layer(middleware::from_fn_with_state(classifier, limit_class_middleware))
}

fn request(groups: Option<&str>, context: Option<NovaContext>) -> Request<Body> {
    let mut builder = Request::builder().uri("/servers");
    if let Some(groups) = groups {
        builder = builder.header("X-PP-Groups", groups);
    }
    let mut request = builder.body(Body::empty()).unwrap();
    if let Some(context) = context {
        request.extensions_mut().insert(context);
    }
    request
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_request_without_groups_passes_through() {
    let store = Arc::new(MemoryStore::with_classes([("grp1", "gold")]));

    let response = app(store.clone(), "")
        .oneshot(request(None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"class": null, "quota_class": null}));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_first_mapped_group_wins() {
    let store = Arc::new(MemoryStore::with_classes([("grp3", "lim_class"), ("grp4", "other")]));

    let response = app(store.clone(), "")
        .oneshot(request(Some("grp1,grp2,grp3,grp4,grp5"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["class"], "lim_class");
    assert_eq!(
        store.get_keys(),
        vec!["rs-group:grp1", "rs-group:grp2", "rs-group:grp3"]
    );
}

#[tokio::test]
async fn test_declared_qualities_order_lookups() {
    let store = Arc::new(MemoryStore::new());

    let response = app(store.clone(), "=1.0,grp2=0.01")
        .oneshot(request(Some("grp1,grp2;q=0.5,grp3;q=0.7, grp4;q=0.9,grp5"), None))
        .await
        .unwrap();

    assert_eq!(body_json(response).await["class"], Value::Null);
    assert_eq!(
        store.get_keys(),
        vec![
            "rs-group:grp1",
            "rs-group:grp5",
            "rs-group:grp4",
            "rs-group:grp3",
            "rs-group:grp2",
        ]
    );
}

#[tokio::test]
async fn test_priorities_compensate_flattened_qualities() {
    let store = Arc::new(MemoryStore::with_classes([
        ("Users", "standard"),
        ("Delinquent", "restricted"),
    ]));

    let response = app(store.clone(), "=0.1,Admin=0.5,Delinquent=1.0")
        .oneshot(request(Some("Users,Admin,Delinquent"), None))
        .await
        .unwrap();

    assert_eq!(body_json(response).await["class"], "restricted");
    assert_eq!(store.get_keys(), vec!["rs-group:Delinquent"]);
}

#[tokio::test]
async fn test_quota_class_set_on_capable_context() {
    let store = Arc::new(MemoryStore::with_classes([("grp3", "lim_class")]));

    let response = app(store, "")
        .oneshot(request(
            Some("grp1,grp2,grp3"),
            Some(NovaContext::with_quota_class()),
        ))
        .await
        .unwrap();

    assert_eq!(
        body_json(response).await,
        json!({"class": "lim_class", "quota_class": "lim_class"})
    );
}

#[tokio::test]
async fn test_quota_class_skipped_on_legacy_context() {
    let store = Arc::new(MemoryStore::with_classes([("grp3", "lim_class")]));

    let response = app(store, "")
        .oneshot(request(Some("grp1,grp2,grp3"), Some(NovaContext::new())))
        .await
        .unwrap();

    assert_eq!(
        body_json(response).await,
        json!({"class": "lim_class", "quota_class": null})
    );
}

struct UnavailableStore;

#[async_trait]
impl ClassStore for UnavailableStore {
    async fn get(&self, _key: &str) -> LimitsResult<Option<String>> {
        Err(LimitsError::Redis("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> LimitsResult<()> {
        Err(LimitsError::Redis("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> LimitsResult<bool> {
        Err(LimitsError::Redis("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_store_failure_returns_service_unavailable() {
    let response = app(Arc::new(UnavailableStore), "")
        .oneshot(request(Some("grp1"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"], "service_unavailable");
    assert_eq!(body["code"], 503);
}

#[tokio::test]
async fn test_admin_mapping_visible_to_classifier() {
    let store = Arc::new(MemoryStore::new());

    let previous = set_class(&*store, "admins", Some("unlimited"), false)
        .await
        .unwrap();
    assert_eq!(previous, None);

    let response = app(store.clone(), "")
        .oneshot(request(Some("users;q=0.5,admins"), None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["class"], "unlimited");

    let previous = set_class(&*store, "admins", None, true).await.unwrap();
    assert_eq!(previous.as_deref(), Some("unlimited"));

    let response = app(store, "")
        .oneshot(request(Some("users;q=0.5,admins"), None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["class"], Value::Null);
}

#[tokio::test]
async fn test_class_recorded_in_request_environ() {
    let store = Arc::new(MemoryStore::with_classes([("grp3", "lim_class")]));

    let mut existing = Environ::new();
    existing.insert("remote_user".to_string(), "alice".to_string());
    let mut request = Request::builder()
        .uri("/environ")
        .header("X-PP-Groups", "grp1,grp2,grp3")
        .body(Body::empty())
        .unwrap();
    request.extensions_mut().insert(existing);

    let response = app(store, "").oneshot(request).await.unwrap();

    let body = body_json(response).await;
    assert_eq!(body[LIMIT_CLASS_KEY], "lim_class");
    assert_eq!(body["remote_user"], "alice");
}

#[tokio::test]
async fn test_environ_untouched_without_class() {
    let store = Arc::new(MemoryStore::new());
    let request = Request::builder()
        .uri("/environ")
        .header("X-PP-Groups", "grp1")
        .body(Body::empty())
        .unwrap();

    let response = app(store, "").oneshot(request).await.unwrap();

    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn test_non_ascii_groups_header_is_decoded() {
    let store = Arc::new(MemoryStore::with_classes([("grp1", "gold")]));
    let mut req = request(None, None);
    req.headers_mut().insert(
        "x-pp-groups",
        HeaderValue::from_bytes(b"caf\xe9,grp1").unwrap(),
    );

    let response = app(store.clone(), "").oneshot(req).await.unwrap();

    assert_eq!(body_json(response).await["class"], "gold");
    assert_eq!(
        store.get_keys(),
        vec!["rs-group:caf\u{FFFD}", "rs-group:grp1"]
    );
}

#[tokio::test]
async fn test_whitespace_only_header_queries_empty_group() {
    let store = Arc::new(MemoryStore::with_classes([("", "fallback")]));

    let response = app(store.clone(), "")
        .oneshot(request(Some("   "), None))
        .await
        .unwrap();

    assert_eq!(body_json(response).await["class"], "fallback");
    assert_eq!(store.get_keys(), vec!["rs-group:"]);
}
