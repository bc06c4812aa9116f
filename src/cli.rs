use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use atty::Stream;
use clap::{Parser, Subcommand};
use crueltycheck::dispatch::DEFAULT_ENDPOINT;
use crueltycheck::{
    ActionControl, ClientConfig, ControlLabel, Dispatcher, EvaluationContext, Evaluator,
    HttpDispatcher, MemoryReport, Outcome, StaticDispatcher, render_markdown,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "crueltycheck",
    about = "Ask whether a company or product is cruelty free",
    version
)]
pub struct Cli {
    /// Emit JSON instead of a human-readable report.
    #[arg(long, global = true)]
    json: bool,

    /// Classification service to query.
    #[arg(long, global = true, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Give up on the request after this many milliseconds. Waits indefinitely when unset.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a single company or product name.
    Evaluate {
        /// Company or product name, sent as typed.
        query: String,
        /// Print the raw HTML report fragment.
        #[arg(long)]
        html: bool,
        /// Replay a saved JSON response instead of contacting the service.
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
    /// Serve the evaluator page over HTTP.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Public base URL used in permalinks.
        #[arg(long)]
        base_url: Option<String>,
    },
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = ClientConfig {
        endpoint: cli.endpoint,
        timeout: cli.timeout_ms.map(Duration::from_millis),
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    match cli.command {
        Command::Evaluate {
            query,
            html,
            fixture,
        } => handle_evaluate(&runtime, config, query, fixture, html, cli.json),
        #[cfg(feature = "web")]
        Command::Serve { addr, base_url } => {
            let web_config = crueltycheck::web::WebConfig {
                addr,
                base_url: base_url.unwrap_or_else(|| format!("http://{addr}")),
            };
            runtime.block_on(crueltycheck::web::serve(web_config, config))?;
            Ok(())
        }
    }
}

/// How the evaluate command prints its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Html,
    Markdown,
}

impl OutputFormat {
    fn select(as_json: bool, as_html: bool) -> Self {
        if as_json {
            OutputFormat::Json
        } else if as_html {
            OutputFormat::Html
        } else {
            OutputFormat::Markdown
        }
    }
}

type CliContext<C> = EvaluationContext<String, C, MemoryReport>;

fn handle_evaluate(
    runtime: &Runtime,
    config: ClientConfig,
    query: String,
    fixture: Option<PathBuf>,
    as_html: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let format = OutputFormat::select(as_json, as_html);
    let mut ctx = EvaluationContext::new(query, TerminalControl::new(), MemoryReport::default());
    let outcome = match fixture {
        Some(path) => runtime.block_on(evaluate_with(load_fixture(&path)?, &mut ctx)),
        None => runtime.block_on(evaluate_with(HttpDispatcher::new(config), &mut ctx)),
    };

    let (text, status) = evaluate_output(&outcome, &ctx, format);
    match (format, &outcome) {
        (OutputFormat::Markdown, Outcome::Verdict(_)) => render_markdown_block(&text),
        _ => println!("{text}"),
    }
    Ok(status?)
}

fn load_fixture(path: &Path) -> Result<StaticDispatcher, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read fixture {}: {err}", path.display()))?;
    Ok(StaticDispatcher::from_json(&text)?)
}

async fn evaluate_with<D, C>(dispatcher: D, ctx: &mut CliContext<C>) -> Outcome
where
    D: Dispatcher,
    C: ActionControl,
{
    Evaluator::new(dispatcher).evaluate(ctx).await
}

/// Builds what the evaluate command prints, plus the exit decision: any
/// outcome other than a verdict fails the command with its error message.
fn evaluate_output<C>(
    outcome: &Outcome,
    ctx: &CliContext<C>,
    format: OutputFormat,
) -> (String, Result<(), String>) {
    let (body, body_kind) = ctx
        .report
        .body
        .as_ref()
        .map(|body| (body.as_str(), body.kind()))
        .unwrap_or(("", "text"));
    let text = match format {
        OutputFormat::Json => {
            let payload = json!({
                "query": ctx.input,
                "outcome": outcome.kind(),
                "result": outcome.verdict(),
                "error": outcome.error_message(),
                "report": {
                    "body": body,
                    "body_kind": body_kind,
                    "classes": ctx.report.classes.iter().collect::<Vec<_>>(),
                },
            });
            format!("{payload:#}")
        }
        OutputFormat::Html => body.to_string(),
        OutputFormat::Markdown => match outcome {
            Outcome::Verdict(result) => render_markdown(result),
            _ => body.to_string(),
        },
    };
    let status = match outcome.error_message() {
        Some(message) => Err(message),
        None => Ok(()),
    };
    (text, status)
}

/// Action control drawn on stderr: the busy label stays on screen while the
/// request is in flight and is cleared when the control goes idle.
struct TerminalControl {
    interactive: bool,
    label: ControlLabel,
}

impl TerminalControl {
    fn new() -> Self {
        Self {
            interactive: atty::is(Stream::Stderr),
            label: ControlLabel::Idle,
        }
    }
}

impl ActionControl for TerminalControl {
    // Nothing to click on a terminal; the process handles one query per run.
    fn set_disabled(&mut self, _disabled: bool) {}

    fn set_label(&mut self, label: ControlLabel) {
        if self.label == label {
            return;
        }
        self.label = label;
        if !self.interactive {
            return;
        }
        let mut stderr = io::stderr();
        let _ = match label {
            ControlLabel::Busy => write!(stderr, "{}…", label.text()),
            ControlLabel::Idle => write!(stderr, "\r\x1b[2K"),
        };
        let _ = stderr.flush();
    }
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(body: &str) {
    let trimmed = body.trim();
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crueltycheck::{DispatchError, Query};
    use serde_json::Value;

    struct FailingDispatcher;

    impl Dispatcher for FailingDispatcher {
        async fn dispatch(&self, _query: &Query) -> Result<Value, DispatchError> {
            Err(DispatchError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    fn quiet_context(query: &str) -> CliContext<TerminalControl> {
        let control = TerminalControl {
            interactive: false,
            label: ControlLabel::Idle,
        };
        EvaluationContext::new(query.to_string(), control, MemoryReport::default())
    }

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).expect("json output")
    }

    #[tokio::test]
    async fn json_output_for_verdict_succeeds() {
        let mut ctx = quiet_context("Acme");
        let dispatcher = StaticDispatcher::new(json!({
            "cruelty_free": false,
            "company_name": "Acme",
            "offenses": ["animal testing"],
        }));
        let outcome = evaluate_with(dispatcher, &mut ctx).await;

        let (text, status) = evaluate_output(&outcome, &ctx, OutputFormat::Json);
        assert_eq!(status, Ok(()));
        let payload = parse(&text);
        assert_eq!(payload["query"], "Acme");
        assert_eq!(payload["outcome"], "verdict");
        assert_eq!(payload["result"]["company_name"], "Acme");
        assert_eq!(payload["result"]["cruelty_free"], false);
        assert_eq!(payload["error"], Value::Null);
        assert_eq!(payload["report"]["body_kind"], "html");
        assert!(
            payload["report"]["body"]
                .as_str()
                .unwrap()
                .starts_with("The company <u>Acme</u> is not cruelty free.")
        );
        assert_eq!(payload["report"]["classes"], json!(["bg-red-500", "text-white"]));
        assert!(ctx.control.label == ControlLabel::Idle);
    }

    #[tokio::test]
    async fn missing_verdict_field_fails_the_command() {
        let mut ctx = quiet_context("Acme");
        let dispatcher = StaticDispatcher::new(json!({ "company_name": "Acme" }));
        let outcome = evaluate_with(dispatcher, &mut ctx).await;

        let (text, status) = evaluate_output(&outcome, &ctx, OutputFormat::Json);
        let payload = parse(&text);
        assert_eq!(payload["outcome"], "unrecognized");
        assert_eq!(payload["result"], Value::Null);
        assert_eq!(
            payload["report"]["body"],
            "The service returned an unrecognized response."
        );
        assert_eq!(payload["report"]["body_kind"], "text");
        assert_eq!(payload["report"]["classes"], json!(["bg-amber-500", "text-white"]));
        let message = status.unwrap_err();
        assert!(message.contains("cruelty_free"));
        assert_eq!(payload["error"], message.as_str());
    }

    #[tokio::test]
    async fn failed_request_fails_the_command() {
        let mut ctx = quiet_context("Acme");
        let outcome = evaluate_with(FailingDispatcher, &mut ctx).await;

        let (text, status) = evaluate_output(&outcome, &ctx, OutputFormat::Json);
        let payload = parse(&text);
        assert_eq!(payload["outcome"], "request_failed");
        assert_eq!(payload["report"]["body"], "The request failed, please try again.");
        assert_eq!(
            status,
            Err("service responded with status 503: unavailable".to_string())
        );

        let (plain, _) = evaluate_output(&outcome, &ctx, OutputFormat::Markdown);
        assert_eq!(plain, "The request failed, please try again.");
    }

    #[tokio::test]
    async fn html_output_is_the_raw_fragment() {
        let mut ctx = quiet_context("Acme");
        let dispatcher = StaticDispatcher::new(json!({
            "cruelty_free": false,
            "company_name": "Acme",
            "parent_company": "MegaCorp",
        }));
        let outcome = evaluate_with(dispatcher, &mut ctx).await;

        let (text, status) = evaluate_output(&outcome, &ctx, OutputFormat::Html);
        assert_eq!(status, Ok(()));
        assert_eq!(
            text,
            "The company <u>Acme</u> is not cruelty free. <br/> Acme is owned by <b>MegaCorp</b>. "
        );
    }

    #[tokio::test]
    async fn markdown_output_for_affirmative_verdict() {
        let mut ctx = quiet_context("Acme");
        let dispatcher =
            StaticDispatcher::new(json!({ "cruelty_free": true, "company_name": "Acme" }));
        let outcome = evaluate_with(dispatcher, &mut ctx).await;

        let (text, status) = evaluate_output(&outcome, &ctx, OutputFormat::Markdown);
        assert_eq!(status, Ok(()));
        assert_eq!(text, "The company **Acme** is cruelty free!\n");
    }

    #[tokio::test]
    async fn fixture_file_is_replayed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cruelty_free": true, "company_name": "Beta Co"}}"#).unwrap();
        let dispatcher = load_fixture(file.path()).unwrap();

        let mut ctx = quiet_context("whatever was typed");
        let outcome = evaluate_with(dispatcher, &mut ctx).await;
        let (text, status) = evaluate_output(&outcome, &ctx, OutputFormat::Json);
        assert_eq!(status, Ok(()));
        let payload = parse(&text);
        assert_eq!(payload["query"], "whatever was typed");
        assert_eq!(payload["report"]["body"], "The company Beta Co is cruelty free!");
        assert_eq!(payload["report"]["classes"], json!(["bg-green-500", "text-white"]));
    }

    #[test]
    fn unreadable_fixture_names_the_path() {
        let err = load_fixture(Path::new("/nonexistent/reply.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/reply.json"));
    }

    #[test]
    fn json_flag_wins_over_html() {
        assert_eq!(OutputFormat::select(true, true), OutputFormat::Json);
        assert_eq!(OutputFormat::select(false, true), OutputFormat::Html);
        assert_eq!(OutputFormat::select(false, false), OutputFormat::Markdown);
    }
}
