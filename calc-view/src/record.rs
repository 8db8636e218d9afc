//! UI-facing display records

use serde::Serialize;

/// Name and markup shown for a record that has not resolved yet
pub const PLACEHOLDER: &str = "...";

/// One rendered step of a reduction sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedStep {
    pub expr: String,
    pub rendered_markup: String,
}

/// Resolution state of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum RecordState {
    /// Placeholder, waiting for the mapper
    Pending,
    /// Single diagram or plain text
    Markup(String),
    /// Reduction sequence, in input order
    Steps(Vec<RenderedStep>),
    /// The renderer rejected this payload
    RenderFailed(String),
    /// The payload matched none of the known shapes
    Unrecognized(String),
}

/// Normalized projection of one result payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub name: String,
    pub state: RecordState,
}

impl DisplayRecord {
    pub fn placeholder() -> Self {
        Self {
            name: PLACEHOLDER.to_string(),
            state: RecordState::Pending,
        }
    }

    pub fn markup(name: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RecordState::Markup(markup.into()),
        }
    }

    pub fn steps(name: impl Into<String>, steps: Vec<RenderedStep>) -> Self {
        Self {
            name: name.into(),
            state: RecordState::Steps(steps),
        }
    }

    pub fn render_failed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RecordState::RenderFailed(detail.into()),
        }
    }

    pub fn unrecognized(detail: impl Into<String>) -> Self {
        Self {
            name: "unrecognized".to_string(),
            state: RecordState::Unrecognized(detail.into()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, RecordState::Pending)
    }

    pub fn is_multistep(&self) -> bool {
        matches!(self.state, RecordState::Steps(_))
    }

    /// Markup for the single-diagram and plain-text cases.
    /// A placeholder reports `"..."`.
    pub fn rendered_markup(&self) -> Option<&str> {
        match &self.state {
            RecordState::Pending => Some(PLACEHOLDER),
            RecordState::Markup(markup) => Some(markup),
            _ => None,
        }
    }

    pub fn rendered_steps(&self) -> Option<&[RenderedStep]> {
        match &self.state {
            RecordState::Steps(steps) => Some(steps),
            _ => None,
        }
    }

    /// Failure detail for failed and unrecognized records
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            RecordState::RenderFailed(detail) | RecordState::Unrecognized(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Wrap raw text in a preformatted block, verbatim
pub fn preformatted(text: &str) -> String {
    format!("<pre>{}</pre>", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        let record = DisplayRecord::placeholder();
        assert_eq!(record.name, "...");
        assert!(!record.is_multistep());
        assert_eq!(record.rendered_markup(), Some("..."));
        assert!(record.is_pending());
    }

    #[test]
    fn test_preformatted_keeps_whitespace() {
        assert_eq!(preformatted("  a\n\tb  "), "<pre>  a\n\tb  </pre>");
    }

    #[test]
    fn test_state_serialization() {
        let record = DisplayRecord::steps(
            "r",
            vec![RenderedStep {
                expr: "x".to_string(),
                rendered_markup: "<svg/>".to_string(),
            }],
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "r");
        assert_eq!(value["state"]["state"], "steps");
        assert_eq!(value["state"]["value"][0]["expr"], "x");
    }
}
