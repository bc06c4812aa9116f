use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Raw user input submitted for evaluation.
///
/// No trimming or validation happens here: an empty query is still a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Query {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Query {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of the outbound request: `{"query": "..."}`.
#[derive(Debug, Serialize)]
pub struct EvaluationRequest<'a> {
    pub query: &'a Query,
}

/// Verdict returned by the classification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub cruelty_free: bool,
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_company: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub offenses: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub alternatives: Vec<Alternative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_company_cruelty_free: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sells_products_tested_on_animals: Option<bool>,
}

impl EvaluationResult {
    /// Parent company worth naming; blank strings count as absent.
    pub fn parent_company(&self) -> Option<&str> {
        self.parent_company
            .as_deref()
            .filter(|parent| !parent.is_empty())
    }
}

/// An alternative is either a bare name or an object carrying `company_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Alternative {
    Name(String),
    Company { company_name: String },
}

impl Alternative {
    pub fn label(&self) -> &str {
        match self {
            Alternative::Name(name) => name,
            Alternative::Company { company_name } => company_name,
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug)]
pub struct DecodeError(serde_json::Error);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized evaluation payload: {}", self.0)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(value: serde_json::Error) -> Self {
        DecodeError(value)
    }
}

/// Validates a parsed JSON payload against the `EvaluationResult` shape.
pub fn decode_evaluation(payload: Value) -> Result<EvaluationResult, DecodeError> {
    Ok(serde_json::from_value(payload)?)
}
