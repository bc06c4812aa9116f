//! Client for a cruelty-free classification service: sends one query, tracks
//! the busy/idle state of the action control, and renders the verdict.

pub mod control;
pub mod dispatch;
pub mod evaluator;
pub mod model;
pub mod render;
pub mod surface;
#[cfg(feature = "web")]
pub mod web;

pub use dispatch::{ClientConfig, DispatchError, Dispatcher, HttpDispatcher, StaticDispatcher};
pub use evaluator::{EvaluationContext, Evaluator, Outcome};
pub use model::{Alternative, DecodeError, EvaluationResult, Query};
pub use render::{RenderedReport, Tone, render, render_markdown};
pub use surface::{
    ActionControl, ControlLabel, MemoryControl, MemoryReport, QueryInput, ReportBody,
    ReportContainer,
};
