use crate::dispatch::{ClientConfig, Dispatcher, HttpDispatcher};
use crate::evaluator::{EvaluationContext, Evaluator, Outcome};
use crate::model::EvaluationResult;
use crate::surface::{MemoryControl, MemoryReport, ReportBody};
use askama::Html as HtmlEscaper;
use askama::{MarkupDisplay, Template};
use axum::{
    Json, Router,
    extract::{Query as QueryParams, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::info;

type PageContext = EvaluationContext<String, MemoryControl, MemoryReport>;

pub struct AppState<D> {
    pub evaluator: Evaluator<D>,
    pub base_url: String,
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub base_url: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

pub async fn serve(config: WebConfig, client: ClientConfig) -> Result<(), WebError> {
    info!(
        %config.addr,
        endpoint = %client.endpoint,
        base = %config.base_url,
        "Binding HTTP listener"
    );
    let state = Arc::new(AppState {
        evaluator: Evaluator::new(HttpDispatcher::new(client)),
        base_url: config.base_url.clone(),
    });
    let router = build_router(state);
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

pub fn build_router<D: Dispatcher + 'static>(state: Arc<AppState<D>>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/evaluate", get(evaluate_html::<D>))
        .route("/api/evaluate", post(api_evaluate::<D>))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "crueltycheck-web" }))
}

async fn home() -> impl IntoResponse {
    let ctx = PageContext::default();
    Html(render_page(&ctx, None))
}

#[derive(Debug, Deserialize)]
struct EvaluateParams {
    query: Option<String>,
}

async fn evaluate_html<D: Dispatcher + 'static>(
    State(state): State<Arc<AppState<D>>>,
    QueryParams(params): QueryParams<EvaluateParams>,
) -> impl IntoResponse {
    let (outcome, ctx) = run_evaluation(&state.evaluator, params.query.unwrap_or_default()).await;
    let permalink = format!(
        "{}/evaluate?query={}",
        state.base_url.trim_end_matches('/'),
        utf8_percent_encode(&ctx.input, NON_ALPHANUMERIC)
    );
    (status_for(&outcome), Html(render_page(&ctx, Some(permalink))))
}

#[derive(Debug, Deserialize)]
struct ApiEvaluateRequest {
    #[serde(default)]
    query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiEvaluateResponse {
    outcome: String,
    body: String,
    body_kind: String,
    classes: Vec<String>,
    result: Option<EvaluationResult>,
    error: Option<String>,
}

async fn api_evaluate<D: Dispatcher + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Json(request): Json<ApiEvaluateRequest>,
) -> impl IntoResponse {
    let (outcome, ctx) = run_evaluation(&state.evaluator, request.query).await;
    let (body, body_kind) = ctx
        .report
        .body
        .map(|body| {
            let kind = body.kind().to_string();
            match body {
                ReportBody::Html(text) | ReportBody::Text(text) => (text, kind),
            }
        })
        .unwrap_or_default();
    let payload = ApiEvaluateResponse {
        outcome: outcome.kind().to_string(),
        body,
        body_kind,
        classes: ctx.report.classes.into_iter().collect(),
        result: outcome.verdict().cloned(),
        error: outcome.error_message(),
    };
    (status_for(&outcome), Json(payload))
}

/// Each request gets its own surface; nothing is shared between evaluations.
async fn run_evaluation<D: Dispatcher>(
    evaluator: &Evaluator<D>,
    query: String,
) -> (Outcome, PageContext) {
    let mut ctx = PageContext::new(query, MemoryControl::default(), MemoryReport::default());
    let outcome = evaluator.evaluate(&mut ctx).await;
    (outcome, ctx)
}

fn status_for(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::Verdict(_) => StatusCode::OK,
        Outcome::RequestFailed(_) | Outcome::Unrecognized(_) => StatusCode::BAD_GATEWAY,
    }
}

fn render_page(ctx: &PageContext, permalink: Option<String>) -> String {
    let report_markup = match &ctx.report.body {
        Some(ReportBody::Html(html)) => html.clone(),
        Some(ReportBody::Text(text)) => MarkupDisplay::new_unsafe(text, HtmlEscaper).to_string(),
        None => String::new(),
    };
    let template = EvaluatorPage {
        query: &ctx.input,
        control_label: ctx.control.label.html(),
        control_disabled: ctx.control.disabled,
        report_classes: ctx.report.class_attr(),
        report_markup,
        permalink,
    };
    template
        .render()
        .unwrap_or_else(|err| render_error_page(err.to_string()))
}

fn render_error_page(message: impl Into<String>) -> String {
    let message = message.into();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Cruelty Check • Error</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="min-h-screen flex flex-col items-center justify-start py-10 px-4">
      <div class="max-w-2xl w-full space-y-6">
        <h1 class="text-4xl font-extrabold tracking-tight">Something went wrong</h1>
        <p class="text-lg text-slate-600">{message}</p>
        <a href="/" class="inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold">Back to home</a>
      </div>
    </main>
  </body>
</html>"#,
        message = MarkupDisplay::new_unsafe(&message, HtmlEscaper),
    )
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Cruelty Check</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="min-h-screen flex flex-col items-center justify-start py-10 px-4">
      <div class="max-w-2xl w-full space-y-6">
        <div>
          <p class="uppercase tracking-wide text-sm text-slate-500">Cruelty Check</p>
          <h1 class="text-4xl font-extrabold tracking-tight">Is it cruelty free?</h1>
          <p class="text-lg text-slate-600">Enter a company or product name to see whether it tests on animals, who owns it, and what to buy instead.</p>
        </div>
        <form action="/evaluate" method="get" class="flex flex-col gap-3">
          <input id="search-box" name="query" type="text" value="{{ query }}" placeholder="Company or product" class="rounded-md border border-slate-300 px-4 py-2" />
          <button id="evaluate-button" type="submit" class="inline-flex justify-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold shadow hover:bg-slate-800 transition-colors"{% if control_disabled %} disabled="disabled"{% endif %}>{{ control_label|safe }}</button>
        </form>
        <div id="response-container" class="rounded-md p-4 {{ report_classes }}">{{ report_markup|safe }}</div>
        {% if let Some(link) = permalink %}
        <p class="text-sm text-slate-500"><a href="{{ link }}" class="hover:underline">Link to this result</a></p>
        {% endif %}
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct EvaluatorPage<'a> {
    query: &'a str,
    control_label: String,
    control_disabled: bool,
    report_classes: String,
    report_markup: String,
    permalink: Option<String>,
}
