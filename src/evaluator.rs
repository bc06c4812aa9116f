use crate::control::enter_busy;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::model::{EvaluationResult, Query, decode_evaluation};
use crate::render::{Failure, RenderedReport, render, render_failure};
use crate::surface::{ActionControl, QueryInput, ReportContainer};
use tracing::{error, info, warn};

/// The surface one evaluation reads from and writes to.
#[derive(Debug, Default)]
pub struct EvaluationContext<I, C, R> {
    pub input: I,
    pub control: C,
    pub report: R,
}

impl<I, C, R> EvaluationContext<I, C, R> {
    pub fn new(input: I, control: C, report: R) -> Self {
        Self {
            input,
            control,
            report,
        }
    }
}

/// Result of a single evaluation.
#[derive(Debug)]
pub enum Outcome {
    Verdict(EvaluationResult),
    RequestFailed(DispatchError),
    Unrecognized(String),
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Verdict(_) => "verdict",
            Outcome::RequestFailed(_) => "request_failed",
            Outcome::Unrecognized(_) => "unrecognized",
        }
    }

    pub fn verdict(&self) -> Option<&EvaluationResult> {
        match self {
            Outcome::Verdict(result) => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Outcome::Verdict(_) => None,
            Outcome::RequestFailed(err) => Some(err.to_string()),
            Outcome::Unrecognized(reason) => Some(reason.clone()),
        }
    }

    pub fn report(&self) -> RenderedReport {
        match self {
            Outcome::Verdict(result) => render(result),
            Outcome::RequestFailed(_) => render_failure(Failure::RequestFailed),
            Outcome::Unrecognized(_) => render_failure(Failure::Unrecognized),
        }
    }
}

/// Runs the request lifecycle: capture, busy, dispatch, render, idle.
#[derive(Debug, Clone)]
pub struct Evaluator<D> {
    dispatcher: D,
}

impl<D: Dispatcher> Evaluator<D> {
    pub fn new(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    /// Performs exactly one request and reports exactly one outcome. The
    /// control is back to idle when this returns, on every path.
    pub async fn evaluate<I, C, R>(&self, ctx: &mut EvaluationContext<I, C, R>) -> Outcome
    where
        I: QueryInput,
        C: ActionControl,
        R: ReportContainer,
    {
        let EvaluationContext {
            input,
            control,
            report,
        } = ctx;
        let query = Query::from(input.value());

        let busy = enter_busy(control);
        let outcome = self.request(&query).await;
        outcome.report().apply(report);
        drop(busy);
        outcome
    }

    async fn request(&self, query: &Query) -> Outcome {
        info!(%query, "evaluating");
        let payload = match self.dispatcher.dispatch(query).await {
            Ok(payload) => payload,
            Err(err) if err.is_payload() => {
                warn!(%err, "unrecognized evaluation response");
                return Outcome::Unrecognized(err.to_string());
            }
            Err(err) => {
                error!(%err, "evaluation request failed");
                return Outcome::RequestFailed(err);
            }
        };
        match decode_evaluation(payload) {
            Ok(result) => {
                info!(
                    company = %result.company_name,
                    cruelty_free = result.cruelty_free,
                    "verdict received"
                );
                Outcome::Verdict(result)
            }
            Err(err) => {
                warn!(%err, "unrecognized evaluation response");
                Outcome::Unrecognized(err.to_string())
            }
        }
    }
}
