use crate::model::EvaluationResult;
use crate::surface::{HIDDEN_CLASS, ReportBody, ReportContainer};
use askama::Template;
use askama::{Html as HtmlEscaper, MarkupDisplay};
use tracing::error;

const REQUEST_FAILED_NOTICE: &str = "The request failed, please try again.";
const UNRECOGNIZED_NOTICE: &str = "The service returned an unrecognized response.";

/// Mutually exclusive status styling of the report container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Affirmative,
    Negative,
    Error,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Affirmative, Tone::Negative, Tone::Error];

    pub fn classes(self) -> &'static [&'static str] {
        match self {
            Tone::Affirmative => &["bg-green-500", "text-white"],
            Tone::Negative => &["bg-red-500", "text-white"],
            Tone::Error => &["bg-amber-500", "text-white"],
        }
    }
}

/// Why an evaluation produced no verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    RequestFailed,
    Unrecognized,
}

impl Failure {
    pub fn notice(self) -> &'static str {
        match self {
            Failure::RequestFailed => REQUEST_FAILED_NOTICE,
            Failure::Unrecognized => UNRECOGNIZED_NOTICE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub body: ReportBody,
    pub tone: Tone,
}

impl RenderedReport {
    /// Replaces the container's body and leaves exactly this report's tone on it.
    pub fn apply<R: ReportContainer + ?Sized>(&self, report: &mut R) {
        report.set_body(self.body.clone());
        report.remove_class(HIDDEN_CLASS);
        for tone in Tone::ALL {
            for class in tone.classes() {
                report.remove_class(class);
            }
        }
        for class in self.tone.classes() {
            report.add_class(class);
        }
    }
}

#[derive(Template)]
#[template(
    source = "The company <u>{{ company_name }}</u> is not cruelty free. <br/> \
{% if let Some(parent) = parent_company %}{{ company_name }} is owned by <b>{{ parent }}</b>. {% endif %}\
{% if !offenses.is_empty() %}<br/><br/><b>Known offenses include:</b><ul>\
{% for offense in offenses %}<li>- {{ offense }}</li>{% endfor %}</ul>{% endif %}\
{% if !alternatives.is_empty() %}<br/><b>Alternatives include:</b><ul>\
{% for alternative in alternatives %}<li>- {{ alternative }}</li>{% endfor %}</ul>{% endif %}",
    ext = "html"
)]
struct NegativeReportTemplate<'a> {
    company_name: &'a str,
    parent_company: Option<&'a str>,
    offenses: &'a [String],
    alternatives: Vec<&'a str>,
}

/// Renders a verdict. Pure: the same result always yields the same report.
pub fn render(result: &EvaluationResult) -> RenderedReport {
    if result.cruelty_free {
        return RenderedReport {
            body: ReportBody::Text(format!(
                "The company {} is cruelty free!",
                result.company_name
            )),
            tone: Tone::Affirmative,
        };
    }

    let template = NegativeReportTemplate {
        company_name: &result.company_name,
        parent_company: result.parent_company(),
        offenses: &result.offenses,
        alternatives: result.alternatives.iter().map(|alt| alt.label()).collect(),
    };
    let html = template.render().unwrap_or_else(|err| {
        error!(%err, "negative report template failed");
        format!(
            "The company <u>{}</u> is not cruelty free.",
            MarkupDisplay::new_unsafe(&result.company_name, HtmlEscaper)
        )
    });
    RenderedReport {
        body: ReportBody::Html(html),
        tone: Tone::Negative,
    }
}

pub fn render_failure(failure: Failure) -> RenderedReport {
    RenderedReport {
        body: ReportBody::Text(failure.notice().to_string()),
        tone: Tone::Error,
    }
}

const MARKDOWN_SPECIAL: &[char] = &['\\', '*', '_', '`', '~', '|', '[', ']', '#', '<', '>'];

/// Backslash-escapes characters Markdown would otherwise read as markup.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if MARKDOWN_SPECIAL.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Terminal rendition of a verdict, as Markdown. Service-provided text is
/// escaped so it prints as typed.
pub fn render_markdown(result: &EvaluationResult) -> String {
    let company = escape_markdown(&result.company_name);
    if result.cruelty_free {
        return format!("The company **{company}** is cruelty free!\n");
    }
    let mut text = format!("The company **{company}** is not cruelty free.\n");
    if let Some(parent) = result.parent_company() {
        text.push_str(&format!(
            "\n{company} is owned by **{}**.\n",
            escape_markdown(parent)
        ));
    }
    if !result.offenses.is_empty() {
        text.push_str("\n**Known offenses include:**\n\n");
        for offense in &result.offenses {
            text.push_str(&format!("- {}\n", escape_markdown(offense)));
        }
    }
    if !result.alternatives.is_empty() {
        text.push_str("\n**Alternatives include:**\n\n");
        for alternative in &result.alternatives {
            text.push_str(&format!("- {}\n", escape_markdown(alternative.label())));
        }
    }
    text
}
