//! Handles the evaluator drives: the query input, the action control, and the
//! report container. Callers inject concrete implementations through
//! [`crate::EvaluationContext`].

use std::collections::BTreeSet;

pub const IDLE_LABEL: &str = "Evaluate Product or Company";
pub const BUSY_LABEL: &str = "Evaluating cruelty, please wait";
pub const BUSY_SPINNER: &str = "assets/spinner3.gif";
pub const HIDDEN_CLASS: &str = "hidden";

/// What the action control currently displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLabel {
    Idle,
    Busy,
}

impl ControlLabel {
    pub fn text(self) -> &'static str {
        match self {
            ControlLabel::Idle => IDLE_LABEL,
            ControlLabel::Busy => BUSY_LABEL,
        }
    }

    /// Markup used when the control is an HTML button.
    pub fn html(self) -> String {
        match self {
            ControlLabel::Idle => IDLE_LABEL.to_string(),
            ControlLabel::Busy => format!(
                r#"<div class="flex w-full justify-center items-center space-x-3"><img src="{BUSY_SPINNER}"/><span>{BUSY_LABEL}</span></div>"#
            ),
        }
    }
}

pub trait QueryInput {
    /// Current value, read at trigger time.
    fn value(&self) -> String;
}

pub trait ActionControl {
    fn set_disabled(&mut self, disabled: bool);
    fn set_label(&mut self, label: ControlLabel);
}

/// Report body as handed to the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportBody {
    Html(String),
    Text(String),
}

impl ReportBody {
    pub fn as_str(&self) -> &str {
        match self {
            ReportBody::Html(html) => html,
            ReportBody::Text(text) => text,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReportBody::Html(_) => "html",
            ReportBody::Text(_) => "text",
        }
    }
}

pub trait ReportContainer {
    /// Replaces whatever the container showed before.
    fn set_body(&mut self, body: ReportBody);
    fn add_class(&mut self, class: &str);
    fn remove_class(&mut self, class: &str);
}

impl QueryInput for String {
    fn value(&self) -> String {
        self.clone()
    }
}

impl QueryInput for &str {
    fn value(&self) -> String {
        (*self).to_string()
    }
}

/// Action control that only remembers its state, plus every transition it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryControl {
    pub disabled: bool,
    pub label: ControlLabel,
    pub transitions: Vec<(bool, ControlLabel)>,
}

impl Default for MemoryControl {
    fn default() -> Self {
        Self {
            disabled: false,
            label: ControlLabel::Idle,
            transitions: Vec::new(),
        }
    }
}

impl MemoryControl {
    pub fn is_idle(&self) -> bool {
        !self.disabled && self.label == ControlLabel::Idle
    }

    fn record(&mut self) {
        self.transitions.push((self.disabled, self.label));
    }
}

impl ActionControl for MemoryControl {
    fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        self.record();
    }

    fn set_label(&mut self, label: ControlLabel) {
        self.label = label;
        self.record();
    }
}

/// Report container kept in memory. Starts hidden, like the page's container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryReport {
    pub body: Option<ReportBody>,
    pub classes: BTreeSet<String>,
}

impl Default for MemoryReport {
    fn default() -> Self {
        let mut classes = BTreeSet::new();
        classes.insert(HIDDEN_CLASS.to_string());
        Self {
            body: None,
            classes,
        }
    }
}

impl MemoryReport {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn is_hidden(&self) -> bool {
        self.has_class(HIDDEN_CLASS)
    }

    /// Space-separated class list, in a stable order.
    pub fn class_attr(&self) -> String {
        self.classes
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ReportContainer for MemoryReport {
    fn set_body(&mut self, body: ReportBody) {
        self.body = Some(body);
    }

    fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_label_markup_carries_spinner_and_text() {
        let html = ControlLabel::Busy.html();
        assert!(html.contains(r#"<img src="assets/spinner3.gif"/>"#));
        assert!(html.contains("<span>Evaluating cruelty, please wait</span>"));
        assert_eq!(ControlLabel::Idle.html(), "Evaluate Product or Company");
    }

    #[test]
    fn plain_label_text_has_no_markup() {
        assert_eq!(ControlLabel::Busy.text(), "Evaluating cruelty, please wait");
        assert_eq!(ControlLabel::Idle.text(), ControlLabel::Idle.html());
    }

    #[test]
    fn memory_report_starts_hidden() {
        let report = MemoryReport::default();
        assert!(report.is_hidden());
        assert!(report.body.is_none());
        assert_eq!(report.class_attr(), "hidden");
    }

    #[test]
    fn memory_control_records_transitions() {
        let mut control = MemoryControl::default();
        control.set_disabled(true);
        control.set_label(ControlLabel::Busy);
        assert!(!control.is_idle());
        assert_eq!(
            control.transitions,
            vec![(true, ControlLabel::Idle), (true, ControlLabel::Busy)]
        );
    }
}
