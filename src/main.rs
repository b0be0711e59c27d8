//! Demo server for service controllers.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, get_service, post_service};
use axum::{Json, Router};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use service_controller::controller::{fallback_response, ErrorEnvelope, Locals};
use service_controller::metrics;
use service_controller::status::{StatusGroup, StatusTable};
use service_controller::utils::shutdown_signal;
use service_controller::{
    Controller, ControllerError, ControllerOptions, ErrorHandler, Middleware, Selector,
    ServiceResponse,
};

/// Demo server for service controllers.
#[derive(Parser, Debug)]
#[command(name = "service-controller")]
#[command(about = "Serve an example notes API built from service controllers")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port.
    #[arg(short, long, env = "PORT", default_value = "8080")]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the notes API (default).
    Serve {
        /// HTTP server port.
        #[arg(short, long, env = "PORT", default_value = "8080")]
        port: u16,
    },

    /// Print the status key table.
    Statuses,

    /// Check controller options loaded from the environment.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("service_controller=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    match args.command {
        Some(Command::Serve { port }) => cmd_serve(port).await,
        Some(Command::Statuses) => cmd_statuses(),
        Some(Command::CheckConfig) => cmd_check_config(),
        None => cmd_serve(args.port).await,
    }
}

/// Print every status key grouped.
fn cmd_statuses() -> anyhow::Result<()> {
    let table = StatusTable::global();
    for group in [
        StatusGroup::Success,
        StatusGroup::ClientError,
        StatusGroup::ServerError,
    ] {
        println!("{group}:");
        for key in table.group(group) {
            println!("  {:<24} {}", key.as_str(), key.code());
        }
    }
    Ok(())
}

/// Check controller options.
fn cmd_check_config() -> anyhow::Result<()> {
    print!("Loading options... ");
    let options = match ControllerOptions::load() {
        Ok(options) => {
            println!("OK");
            options
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Options load failed"));
        }
    };

    print!("Validating options... ");
    if let Err(e) = options.validate() {
        println!("FAILED");
        println!("  Error: {}", e);
        return Err(anyhow::anyhow!("Options validation failed"));
    }
    println!("OK");

    println!("  Body limit: {} bytes", options.body_limit_bytes);
    println!("  Expose error details: {}", options.expose_error_details);
    Ok(())
}

/// Serve the notes API.
async fn cmd_serve(port: u16) -> anyhow::Result<()> {
    let options = ControllerOptions::load().map_err(|e| {
        error!("Failed to load options: {}", e);
        e
    })?;
    if let Err(e) = options.validate() {
        error!("Invalid options: {}", e);
        return Err(anyhow::anyhow!("Options validation failed: {}", e));
    }

    let prometheus = PrometheusBuilder::new().install_recorder()?;
    metrics::init_metrics();

    let router = notes_router(NoteStore::default(), options)
        .route("/health", get(health))
        .route(
            "/metrics",
            get(move || {
                let prometheus = prometheus.clone();
                async move { prometheus.render() }
            }),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Stored note.
#[derive(Debug, Clone, Serialize)]
struct Note {
    id: u64,
    title: String,
    body: String,
}

/// Body of `POST /notes`.
#[derive(Debug, Deserialize)]
struct NewNote {
    title: String,
    #[serde(default)]
    body: String,
}

/// Input of `GET /notes`.
#[derive(Debug)]
struct ListNotes {
    limit: Option<usize>,
    request_id: Option<String>,
}

/// In-memory note store.
#[derive(Debug, Clone, Default)]
struct NoteStore {
    notes: Arc<RwLock<BTreeMap<u64, Note>>>,
    next_id: Arc<AtomicU64>,
}

impl NoteStore {
    async fn create(&self, input: NewNote) -> anyhow::Result<ServiceResponse> {
        if input.title.trim().is_empty() {
            return Ok(ServiceResponse::bad_request(
                "title is required",
                json!({ "field": "title" }),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let note = Note {
            id,
            title: input.title,
            body: input.body,
        };
        self.notes.write().await.insert(id, note.clone());
        Ok(ServiceResponse::created("note created", serde_json::to_value(note)?))
    }

    async fn find(&self, id: String) -> anyhow::Result<ServiceResponse> {
        let Ok(id) = id.parse::<u64>() else {
            return Ok(ServiceResponse::bad_request("invalid note id", json!(id)));
        };

        match self.notes.read().await.get(&id) {
            Some(note) => Ok(ServiceResponse::ok("note found", serde_json::to_value(note)?)),
            None => Ok(ServiceResponse::not_found(
                "note not found",
                json!(format!("no note with id {id}")),
            )),
        }
    }

    async fn list(&self, input: ListNotes) -> anyhow::Result<ServiceResponse> {
        let notes = self.notes.read().await;
        let page: Vec<&Note> = notes.values().take(input.limit.unwrap_or(usize::MAX)).collect();
        Ok(ServiceResponse::ok(
            "notes listed",
            json!({ "notes": page, "request_id": input.request_id }),
        ))
    }
}

fn notes_router(store: NoteStore, options: ControllerOptions) -> Router {
    let request_id = request_id_middleware();
    let errors = demo_error_handler(options.expose_error_details);

    let create = {
        let store = store.clone();
        Controller::new(move |input: NewNote| {
            let store = store.clone();
            async move { store.create(input).await }
        })
    }
    .middleware(request_id.clone())
    .error_handler(errors.clone())
    .options(options.clone())
    .name("notes.create")
    .build();

    let find = {
        let store = store.clone();
        Controller::with_selector(
            move |id: String| {
                let store = store.clone();
                async move { store.find(id).await }
            },
            Selector::param("id"),
        )
    }
    .middleware(request_id.clone())
    .error_handler(errors.clone())
    .options(options.clone())
    .name("notes.find")
    .build();

    let list_selector = Selector::new(|request| {
        let limit = match request.query.get("limit") {
            Some(raw) => Some(raw.parse::<usize>().map_err(|e| {
                service_controller::SelectorError::Invalid(format!("invalid limit {raw:?}: {e}"))
            })?),
            None => None,
        };
        let request_id = request
            .locals
            .get("request_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(ListNotes { limit, request_id })
    });
    let list = Controller::with_selector(
        move |input: ListNotes| {
            let store = store.clone();
            async move { store.list(input).await }
        },
        list_selector,
    )
    .middleware(request_id)
    .error_handler(errors)
    .options(options)
    .name("notes.list")
    .build();

    Router::new()
        .route("/notes", post_service(create).get_service(list))
        .route("/notes/:id", get_service(find))
}

/// Copies `x-request-id` (or a generated id) into the request locals.
fn request_id_middleware() -> Middleware {
    let counter = Arc::new(AtomicU64::new(0));
    Middleware::inspect(move |req| {
        let id = req
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("req-{}", counter.fetch_add(1, Ordering::Relaxed) + 1));
        Locals::insert_into(req, "request_id", id);
    })
}

/// Selector failures become 400 with the fallback envelope shape.
fn demo_error_handler(expose_details: bool) -> ErrorHandler {
    ErrorHandler::new(move |err| match err {
        ControllerError::Selector(_) => {
            let mut envelope = ErrorEnvelope::new(&err, expose_details);
            envelope.message = "Bad request".to_string();
            (StatusCode::BAD_REQUEST, Json(envelope)).into_response()
        }
        _ => fallback_response(&err, expose_details),
    })
}
