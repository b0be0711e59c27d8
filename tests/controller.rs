//! Integration tests mounting controller pipelines on an axum router.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get_service, post_service};
use axum::Router;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;

use service_controller::controller::{Locals, RequestKey};
use service_controller::{
    Controller, ControllerError, ControllerOptions, ErrorHandler, Middleware, Selector,
    ServiceResponse,
};

fn request(method: Method, uri: &str, body: &'static str) -> Request {
    request_with(method, uri, "application/json", body)
}

fn request_with(method: Method, uri: &str, content_type: &str, body: &'static str) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap()
}

fn echo_id() -> Controller<String> {
    Controller::with_selector(
        |id: String| async move { Ok(ServiceResponse::ok("found", json!({ "id": id }))) },
        Selector::param("id"),
    )
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn created_response_through_router() {
    let create: Controller<Value> = Controller::new(|_input: Value| async {
        Ok(ServiceResponse::created("ok", json!({"id": 1})))
    });
    let app = Router::new().route("/items", post_service(create.build()));

    let response = app
        .oneshot(request(Method::POST, "/items", r#"{"name":"bolt"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        json_body(response).await,
        json!({"status": "CREATED", "message": "ok", "data": {"id": 1}})
    );
}

#[tokio::test]
async fn not_found_response_through_router() {
    let find: Controller<String> = Controller::with_selector(
        |_id: String| async { Ok(ServiceResponse::not_found("missing", json!("no such id"))) },
        Selector::param("id"),
    );
    let app = Router::new().route("/items/:id", get_service(find.build()));

    let response = app
        .oneshot(request(Method::GET, "/items/99", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({"status": "NOT_FOUND", "message": "missing", "error": "no such id"})
    );
}

#[tokio::test]
async fn param_selector_passes_only_the_param() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let find: Controller<String> = Controller::with_selector(
        move |id: String| {
            recorder.lock().unwrap().push(id.clone());
            async move { Ok(ServiceResponse::ok("found", json!({ "id": id }))) }
        },
        Selector::param("id"),
    );
    let app = Router::new().route("/items/:id", get_service(find.build()));

    let response = app
        .oneshot(request(Method::GET, "/items/abc-42?verbose=1", r#"{"ignored":true}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*seen.lock().unwrap(), ["abc-42"]);
}

#[tokio::test]
async fn param_selector_ignores_plain_text_body() {
    let app = Router::new().route("/items/:id", get_service(echo_id().build()));

    let response = app
        .oneshot(request_with(Method::GET, "/items/abc-42", "text/plain", "hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"], json!({"id": "abc-42"}));
}

#[tokio::test]
async fn param_selector_ignores_oversized_body() {
    let find = echo_id().options(ControllerOptions {
        body_limit_bytes: 8,
        ..ControllerOptions::default()
    });
    let app = Router::new().route("/items/:id", get_service(find.build()));

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/items/7", r#"{"a":"0123456789"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"], json!({"id": "7"}));

    let response = app
        .oneshot(request_with(Method::GET, "/items/7", "text/plain", "0123456789abcdef"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn body_selector_still_rejects_oversized_json() {
    let create: Controller<Value> =
        Controller::new(|_input: Value| async { Ok(ServiceResponse::ok("ok", Value::Null)) })
            .options(ControllerOptions {
                body_limit_bytes: 8,
                ..ControllerOptions::default()
            });
    let app = Router::new().route("/items", post_service(create.build()));

    let response = app
        .oneshot(request(Method::POST, "/items", r#"{"a":"0123456789"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = json_body(response).await["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("input selection failed: failed to read request body"));
}

#[tokio::test]
async fn form_body_reaches_default_selector_as_null() {
    let seen = Arc::new(Mutex::new(None));
    let recorder = Arc::clone(&seen);
    let create: Controller<Value> = Controller::new(move |input: Value| {
        *recorder.lock().unwrap() = Some(input);
        async { Ok(ServiceResponse::ok("ok", Value::Null)) }
    });
    let app = Router::new().route("/items", post_service(create.build()));

    let response = app
        .oneshot(request_with(
            Method::POST,
            "/items",
            "application/x-www-form-urlencoded",
            "name=bolt&qty=3",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*seen.lock().unwrap(), Some(Value::Null));
}

#[tokio::test]
async fn key_selector_reads_params_query_and_locals() {
    #[derive(Debug, Deserialize)]
    struct Input {
        params: Value,
        query: Value,
        locals: Value,
    }

    let seen = Arc::new(Mutex::new(None));
    let recorder = Arc::clone(&seen);
    let controller: Controller<Input> = Controller::with_selector(
        move |input: Input| {
            *recorder.lock().unwrap() = Some((input.params, input.query, input.locals));
            async { Ok(ServiceResponse::ok("ok", Value::Null)) }
        },
        Selector::keys([RequestKey::Params, RequestKey::Query, RequestKey::Locals]),
    )
    .middleware(Middleware::inspect(|req| {
        Locals::insert_into(req, "tenant", "acme");
    }));
    let app = Router::new().route("/orgs/:org/items", get_service(controller.build()));

    let response = app
        .oneshot(request(Method::GET, "/orgs/acme/items?page=3", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let (params, query, locals) = seen.lock().unwrap().take().unwrap();
    assert_eq!(params, json!({"org": "acme"}));
    assert_eq!(query, json!({"page": "3"}));
    assert_eq!(locals, json!({"tenant": "acme"}));
}

#[tokio::test]
async fn middlewares_run_in_supplied_order() {
    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));
    let stage = |name: &'static str| {
        let log = Arc::clone(&log);
        Middleware::from_fn(move |req, next| {
            log.lock().unwrap().push(name);
            next.run(req)
        })
    };
    let service_log = Arc::clone(&log);
    let controller: Controller<Value> = Controller::new(move |_input: Value| {
        service_log.lock().unwrap().push("service");
        async { Ok(ServiceResponse::ok("ok", Value::Null)) }
    })
    .middlewares([stage("one"), stage("two"), stage("three")]);
    let app = Router::new().route("/", post_service(controller.build()));

    let response = app.oneshot(request(Method::POST, "/", "")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*log.lock().unwrap(), ["one", "two", "three", "service"]);
}

#[tokio::test]
async fn short_circuiting_middleware_skips_service() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let deny = Middleware::from_fn(|req: Request, next| async move {
        if req.headers().contains_key("authorization") {
            next.run(req).await
        } else {
            StatusCode::UNAUTHORIZED.into_response()
        }
    });
    let controller: Controller<Value> = Controller::new(move |_input: Value| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(ServiceResponse::ok("ok", Value::Null)) }
    })
    .middleware(deny);
    let app = Router::new().route("/", post_service(controller.build()));

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let authorized = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("authorization", "Bearer token")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(authorized).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shared_error_handler_sees_each_failure_once() {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&failures);
    let handler = ErrorHandler::new(move |err| {
        recorder.lock().unwrap().push(err.kind());
        let status = match err {
            ControllerError::Selector(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        status.into_response()
    });

    #[derive(Debug, Deserialize)]
    struct Input {
        #[allow(dead_code)]
        qty: u32,
    }

    let typed: Controller<Input> =
        Controller::new(|_input: Input| async { Ok(ServiceResponse::ok("ok", Value::Null)) })
            .error_handler(handler.clone());
    let failing: Controller<Value> =
        Controller::new(|_input: Value| async { Err(anyhow::anyhow!("boom")) })
            .error_handler(handler);
    let app = Router::new()
        .route("/typed", post_service(typed.build()))
        .route("/failing", post_service(failing.build()));

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/typed", r#"{"qty":"many"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(request(Method::POST, "/failing", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(*failures.lock().unwrap(), ["selector", "service"]);
}
