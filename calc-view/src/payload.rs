//! Wire model of the `/calc` response

use serde::{Deserialize, Deserializer, Serialize};

/// One step of a reduction sequence.
///
/// On the wire a step is a two-element array `[expr, source]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct ReductionStep {
    /// Expression at this step
    pub expr: String,
    /// Graphviz source of the step's diagram
    pub source: String,
}

impl From<(String, String)> for ReductionStep {
    fn from((expr, source): (String, String)) -> Self {
        Self { expr, source }
    }
}

impl From<ReductionStep> for (String, String) {
    fn from(step: ReductionStep) -> Self {
        (step.expr, step.source)
    }
}

/// The three shapes the backend is known to produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum KnownPayload {
    GraphvizFigure { title: String, source: String },
    PlainText { title: String, text: String },
    ReductionSeq { title: String, steps: Vec<ReductionStep> },
}

/// A single item of `Ok.contents`.
///
/// Items that match none of the known shapes decode to
/// [`ResultPayload::Unrecognized`] carrying the raw JSON, so one bad item
/// never fails the whole response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPayload {
    GraphvizFigure { title: String, source: String },
    PlainText { title: String, text: String },
    ReductionSeq { title: String, steps: Vec<ReductionStep> },
    Unrecognized(serde_json::Value),
}

impl ResultPayload {
    /// Short name of the variant, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ResultPayload::GraphvizFigure { .. } => "GraphvizFigure",
            ResultPayload::PlainText { .. } => "PlainText",
            ResultPayload::ReductionSeq { .. } => "ReductionSeq",
            ResultPayload::Unrecognized(_) => "Unrecognized",
        }
    }
}

impl From<KnownPayload> for ResultPayload {
    fn from(known: KnownPayload) -> Self {
        match known {
            KnownPayload::GraphvizFigure { title, source } => {
                ResultPayload::GraphvizFigure { title, source }
            }
            KnownPayload::PlainText { title, text } => ResultPayload::PlainText { title, text },
            KnownPayload::ReductionSeq { title, steps } => {
                ResultPayload::ReductionSeq { title, steps }
            }
        }
    }
}

impl<'de> Deserialize<'de> for ResultPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        match KnownPayload::deserialize(&raw) {
            Ok(known) => Ok(known.into()),
            Err(_) => Ok(ResultPayload::Unrecognized(raw)),
        }
    }
}

impl Serialize for ResultPayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let known = match self {
            ResultPayload::GraphvizFigure { title, source } => KnownPayload::GraphvizFigure {
                title: title.clone(),
                source: source.clone(),
            },
            ResultPayload::PlainText { title, text } => KnownPayload::PlainText {
                title: title.clone(),
                text: text.clone(),
            },
            ResultPayload::ReductionSeq { title, steps } => KnownPayload::ReductionSeq {
                title: title.clone(),
                steps: steps.clone(),
            },
            ResultPayload::Unrecognized(raw) => return raw.serialize(serializer),
        };
        known.serialize(serializer)
    }
}

/// Body of a successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contents {
    pub contents: Vec<ResultPayload>,
}

/// Body of an error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub msg: String,
}

/// Response of `GET /calc/{mode}/{expr}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestOutcome {
    Ok(Contents),
    Error(ErrorBody),
}

impl RequestOutcome {
    pub fn ok(contents: Vec<ResultPayload>) -> Self {
        RequestOutcome::Ok(Contents { contents })
    }

    pub fn error(msg: impl Into<String>) -> Self {
        RequestOutcome::Error(ErrorBody { msg: msg.into() })
    }
}
