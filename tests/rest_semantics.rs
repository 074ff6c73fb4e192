//! End-to-end REST behavior of the API mock, driven through `intercept`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use api_mock::routing::index::build_index;
use api_mock::routing::{BoxError, DataContext, ShapeContext, Shaped};
use api_mock::store::{MemoryBackend, Record};
use api_mock::{ApiMock, ApiMockConfig, InterceptedRequest, MockError, MockResponse, Outcome, Route, RouteGroup};
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

fn config() -> ApiMockConfig {
    ApiMockConfig {
        delay_ms: 0,
        ..Default::default()
    }
}

async fn send(mock: &ApiMock, request: InterceptedRequest) -> Result<MockResponse, MockError> {
    match mock.intercept(request).await? {
        Outcome::Mocked(response) => Ok(response),
        Outcome::Passthrough(req) => panic!("unexpected passthrough of {}", req.url),
    }
}

fn posts_group() -> RouteGroup {
    RouteGroup::new().route(
        Route::new("api/posts/:id").seed(vec![
            json!({"id": 1, "title": "first", "body": "a"}),
            json!({"id": 2, "title": "second", "body": "b"}),
        ]),
    )
}

#[test]
fn test_root_index_ordering() {
    let groups: Vec<RouteGroup> = ["x", "abc/def", "ab", "abcd", "yz"]
        .iter()
        .map(|p| RouteGroup::new().route(Route::new(format!("{}/:id", p)).seed(vec![])))
        .collect();
    let index = build_index(&groups);

    let order: Vec<&str> = index.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(order, vec!["abc/def", "abcd", "ab", "yz", "x"]);
}

#[tokio::test]
async fn test_longest_prefix_selects_most_specific_group() {
    let roots = ["a/b/c/d/e/f/g", "a/b/c/d/e/f", "a/b/c/d/e", "a/b/c/d", "a/b/c", "a/b"];
    let groups = roots
        .iter()
        .map(|root| {
            RouteGroup::new().route(Route::new(format!("{}/:id", root)).seed(vec![json!({"id": "x", "root": root})]))
        })
        .collect();
    let mock = ApiMock::new(config(), groups).unwrap();

    let response = send(&mock, InterceptedRequest::get("/a/b/c/d/x")).await.unwrap();
    assert_eq!(response.body.unwrap(), json!([{"id": "x", "root": "a/b/c/d"}]));

    let response = send(&mock, InterceptedRequest::get("/a/b/x")).await.unwrap();
    assert_eq!(response.body.unwrap()[0]["root"], "a/b");
}

#[tokio::test]
async fn test_no_false_prefix_match() {
    let groups = vec![RouteGroup::new().route(Route::new("posts/:id").seed(vec![json!({"id": 123})]))];
    let mock = ApiMock::new(config(), groups).unwrap();

    let err = send(&mock, InterceptedRequest::get("/posts-other/123")).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert!(send(&mock, InterceptedRequest::get("/posts/123")).await.is_ok());
}

#[tokio::test]
async fn test_static_segment_exactness() {
    let groups = vec![
        RouteGroup::new().route(Route::new("api/posts/:postId").seed(vec![json!({"postId": 123})])),
        RouteGroup::new().route(Route::new("api/:version").seed(vec![])).host("https://other.example.com"),
    ];
    let mock = ApiMock::new(config(), groups).unwrap();

    let err = send(&mock, InterceptedRequest::get("/api/posts-other/123")).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_then_get_round_trip() {
    let mock = ApiMock::new(config(), vec![posts_group()]).unwrap();

    let created = send(&mock, InterceptedRequest::post("/api/posts", json!({"title": "third"})))
        .await
        .unwrap();
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.headers["location"], "/api/posts/3");

    let fetched = send(&mock, InterceptedRequest::get("/api/posts/3")).await.unwrap();
    assert_eq!(fetched.body.unwrap(), json!([{"id": 3, "title": "third"}]));
}

#[tokio::test]
async fn test_post_into_empty_collection_starts_at_one() {
    let groups = vec![RouteGroup::new().route(Route::new("todos/:todoId").seed(vec![]))];
    let mock = ApiMock::new(config(), groups).unwrap();

    let created = send(&mock, InterceptedRequest::post("/todos", json!({"done": false})))
        .await
        .unwrap();
    assert_eq!(created.headers["location"], "/todos/1");
    let fetched = send(&mock, InterceptedRequest::get("/todos/1")).await.unwrap();
    assert_eq!(fetched.body.unwrap()[0]["todoId"], 1);
}

#[tokio::test]
async fn test_patch_preserves_unspecified_fields() {
    let groups = vec![RouteGroup::new().route(Route::new("items/:id").seed(vec![json!({"id": 1, "a": 1, "b": 1})]))];
    let mock = ApiMock::new(config(), groups).unwrap();

    let patched = send(&mock, InterceptedRequest::patch("/items/1", json!({"b": 2})))
        .await
        .unwrap();
    assert_eq!(patched.status, StatusCode::NO_CONTENT);
    assert!(patched.body.is_none());

    let fetched = send(&mock, InterceptedRequest::get("/items/1")).await.unwrap();
    assert_eq!(fetched.body.unwrap(), json!([{"id": 1, "a": 1, "b": 2}]));
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let mock = ApiMock::new(config(), vec![posts_group()]).unwrap();

    let deleted = send(&mock, InterceptedRequest::delete("/api/posts/1")).await.unwrap();
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let err = send(&mock, InterceptedRequest::get("/api/posts/1")).await.unwrap_err();
    assert_eq!(err, MockError::NotFound("item id=1 not found".into()));
    let error_response = err.to_error_response();
    assert_eq!(error_response.status_text, "Not Found");
}

#[tokio::test]
async fn test_nested_chain_resolution() {
    let groups = vec![RouteGroup::new()
        .route(Route::new("posts/:postId").seed(vec![json!({"postId": 123}), json!({"postId": 124})]))
        .route(Route::new("comments/:commentId").data_fn(
            |ctx: DataContext<'_>| -> Result<Vec<Record>, BoxError> {
                let post_id = ctx.parents[0]["postId"].clone();
                Ok(serde_json::from_value(json!([
                    {"commentId": 456, "postId": post_id, "text": "nice"}
                ]))?)
            },
        ))];
    let mock = ApiMock::new(config(), groups).unwrap();

    let response = send(&mock, InterceptedRequest::get("/posts/123/comments/456")).await.unwrap();
    assert_eq!(response.body.unwrap()[0]["postId"], 123);

    // Each parent id gets its own collection
    send(&mock, InterceptedRequest::delete("/posts/123/comments/456")).await.unwrap();
    assert!(send(&mock, InterceptedRequest::get("/posts/123/comments/456")).await.is_err());
    assert!(send(&mock, InterceptedRequest::get("/posts/124/comments/456")).await.is_ok());

    let snapshot = mock.store().snapshot("posts/123/comments").unwrap();
    assert!(snapshot.is_empty());

    let err = send(&mock, InterceptedRequest::get("/posts/999/comments")).await.unwrap_err();
    assert_eq!(err.to_string(), "item postId=999 not found");
}

#[tokio::test]
async fn test_read_projection_follows_writes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let groups = vec![RouteGroup::new().route(
        Route::new("api/posts/:id")
            .data_fn(move |_ctx: DataContext<'_>| -> Result<Vec<Record>, BoxError> {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(serde_json::from_value(json!([{"id": 1, "title": "old", "body": "long text"}]))?)
            })
            .properties_for_list(["id", "title"]),
    )];
    let mock = ApiMock::new(config(), groups).unwrap();

    let list = send(&mock, InterceptedRequest::get("/api/posts")).await.unwrap();
    assert_eq!(list.body.unwrap(), json!([{"id": 1, "title": "old"}]));

    send(&mock, InterceptedRequest::patch("/api/posts/1", json!({"title": "new"})))
        .await
        .unwrap();

    let list = send(&mock, InterceptedRequest::get("/api/posts")).await.unwrap();
    assert_eq!(list.body.unwrap(), json!([{"id": 1, "title": "new"}]));

    // Item reads are not projected
    let item = send(&mock, InterceptedRequest::get("/api/posts/1")).await.unwrap();
    assert_eq!(item.body.unwrap()[0]["body"], "long text");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_idempotent_validation() {
    let mock = ApiMock::new(config(), vec![posts_group()]).unwrap();
    mock.register(vec![posts_group()]).unwrap();
    assert_eq!(mock.group_count(), 1);

    let clash = RouteGroup::new().route(Route::new("api/posts/:postId").seed(vec![]));
    let err = mock.register(vec![clash.clone()]).unwrap_err();
    assert_eq!(err.to_string(), "duplicate root path `/api/posts`");
    // Deterministic on retry
    assert_eq!(mock.register(vec![clash]).unwrap_err(), err);
}

#[tokio::test]
async fn test_response_shaper() {
    let groups = vec![RouteGroup::new().route(
        Route::new("api/posts/:id")
            .seed(vec![json!({"id": 1, "title": "first"})])
            .respond_fn(|ctx: ShapeContext<'_>| -> Result<Shaped, BoxError> {
                match (ctx.method.clone(), ctx.item_id) {
                    (Method::GET, None) => {
                        let mut body = ctx.body;
                        // Mutating the copy must not touch the store
                        body[0]["title"] = json!("shaped");
                        let page = ctx.query.get("page").unwrap_or("1").to_string();
                        Ok(Shaped::Body(json!({"data": body, "page": page})))
                    }
                    (Method::DELETE, _) => Ok(Shaped::Error(MockError::Custom {
                        status: StatusCode::FORBIDDEN,
                        message: "read-only".into(),
                    })),
                    _ => Ok(Shaped::Body(ctx.body)),
                }
            }),
    )];
    let mock = ApiMock::new(config(), groups).unwrap();

    let list = send(&mock, InterceptedRequest::get("/api/posts?page=3")).await.unwrap();
    assert_eq!(list.body.unwrap(), json!({"data": [{"id": 1, "title": "shaped"}], "page": "3"}));

    let item = send(&mock, InterceptedRequest::get("/api/posts/1")).await.unwrap();
    assert_eq!(item.body.unwrap(), json!([{"id": 1, "title": "first"}]));

    // Verb errors happen before the shaper runs
    let err = send(&mock, InterceptedRequest::get("/api/posts/42")).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let err = send(&mock, InterceptedRequest::delete("/api/posts/1")).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert_eq!(err.to_string(), "read-only");
}

#[tokio::test]
async fn test_shaper_response_escape_hatch() {
    let groups = vec![RouteGroup::new().route(Route::new("api/health").respond_fn(
        |_ctx: ShapeContext<'_>| -> Result<Shaped, BoxError> {
            Ok(Shaped::Response(MockResponse::new(StatusCode::ACCEPTED).with_body(json!({"ok": true}))))
        },
    ))];
    let mock = ApiMock::new(config(), groups).unwrap();

    let response = send(&mock, InterceptedRequest::get("/api/health")).await.unwrap();
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body, Some(json!({"ok": true})));
}

#[tokio::test]
async fn test_callback_error_is_internal() {
    let groups = vec![RouteGroup::new().route(Route::new("api/posts/:id").seed(vec![]).respond_fn(
        |_ctx: ShapeContext<'_>| -> Result<Shaped, BoxError> { Err("shaper failed".into()) },
    ))];
    let mock = ApiMock::new(config(), groups).unwrap();

    let err = send(&mock, InterceptedRequest::get("/api/posts")).await.unwrap_err();
    assert_eq!(err, MockError::Internal("shaper failed".into()));
}

#[tokio::test]
async fn test_provider_sees_request_context() {
    let groups = vec![RouteGroup::new().route(Route::new("api/search/:id").data_fn(
        |ctx: DataContext<'_>| -> Result<Vec<Record>, BoxError> {
            let term = ctx.query.get("q").unwrap_or_default();
            Ok(serde_json::from_value(json!([{"id": 1, "term": term}]))?)
        },
    ))];
    let mock = ApiMock::new(config(), groups).unwrap();

    let response = send(&mock, InterceptedRequest::get("/api/search").query_param("q", "rust"))
        .await
        .unwrap();
    assert_eq!(response.body.unwrap()[0]["term"], "rust");
}

#[tokio::test]
async fn test_host_qualified_groups() {
    let groups = vec![
        RouteGroup::new()
            .host("https://api.example.com")
            .route(Route::new("posts/:id").seed(vec![json!({"id": 1, "origin": "remote"})])),
        RouteGroup::new().route(Route::new("posts/:id").seed(vec![json!({"id": 1, "origin": "local"})])),
    ];
    let mock = ApiMock::new(config(), groups).unwrap();

    let remote = send(&mock, InterceptedRequest::get("https://api.example.com/posts/1")).await.unwrap();
    assert_eq!(remote.body.unwrap()[0]["origin"], "remote");

    let local = send(&mock, InterceptedRequest::get("/posts/1")).await.unwrap();
    assert_eq!(local.body.unwrap()[0]["origin"], "local");
}

#[tokio::test]
async fn test_persistence_survives_restart() {
    let backend = MemoryBackend::new();
    let persisted = ApiMockConfig {
        cache_to_external_storage: true,
        ..config()
    };

    let mock = ApiMock::with_backend(persisted.clone(), vec![posts_group()], Some(Box::new(backend.clone()))).unwrap();
    send(&mock, InterceptedRequest::post("/api/posts", json!({"title": "kept"})))
        .await
        .unwrap();
    drop(mock);

    let mock = ApiMock::with_backend(persisted, vec![posts_group()], Some(Box::new(backend))).unwrap();
    let list = send(&mock, InterceptedRequest::get("/api/posts")).await.unwrap();
    let titles: Vec<Value> = list.body.unwrap().as_array().unwrap().iter().map(|p| p["title"].clone()).collect();
    assert_eq!(titles, vec![json!("first"), json!("second"), json!("kept")]);
}

#[tokio::test]
async fn test_status_policies() {
    let strict = ApiMockConfig {
        post_update_409: true,
        put_not_found_404: true,
        put_return_204: false,
        ..config()
    };
    let mock = ApiMock::new(strict, vec![posts_group()]).unwrap();

    let err = send(&mock, InterceptedRequest::post("/api/posts", json!({"id": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let err = send(&mock, InterceptedRequest::put("/api/posts/9", json!({"id": 9})))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let updated = send(&mock, InterceptedRequest::put("/api/posts/2", json!({"id": 2, "title": "put"})))
        .await
        .unwrap();
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body.unwrap(), json!([{"id": 2, "title": "put"}]));

    let err = send(&mock, InterceptedRequest::new(Method::HEAD, "/api/posts"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_concurrent_posts_get_distinct_ids() {
    let mock = Arc::new(ApiMock::new(config(), vec![posts_group()]).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let mock = mock.clone();
            tokio::spawn(async move {
                send(&mock, InterceptedRequest::post("/api/posts", json!({"n": i})))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut locations = Vec::new();
    for handle in handles {
        locations.push(handle.await.unwrap().headers["location"].to_str().unwrap().to_string());
    }
    locations.sort();
    locations.dedup();
    assert_eq!(locations.len(), 16);
    assert_eq!(mock.store().snapshot("api/posts").unwrap().len(), 18);
}

#[tokio::test]
async fn test_example_config_is_servable() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("api-mock.example.toml");
    let mut config = api_mock::config::load_config(&path).unwrap();
    config.mock.delay_ms = 0;
    let mock = ApiMock::from_config(&config, &api_mock::CallbackRegistry::new()).unwrap();
    assert_eq!(mock.group_count(), 2);

    let list = send(&mock, InterceptedRequest::get("/api/posts")).await.unwrap();
    assert_eq!(list.body.unwrap()[1], json!({"postId": 2, "title": "Again"}));

    let comments = send(&mock, InterceptedRequest::get("/api/posts/2/comments/1")).await.unwrap();
    assert_eq!(comments.body.unwrap()[0]["text"], "Nice one");

    let user = send(&mock, InterceptedRequest::get("https://auth.example.com/users/1")).await.unwrap();
    assert_eq!(user.body.unwrap()[0]["name"], "admin");
}
