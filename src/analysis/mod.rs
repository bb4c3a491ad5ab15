pub mod batch;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::CitationRecord;

pub use batch::analyze_records;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Parsed,
    Unparsed,
    Failed,
}

/// What a cited work contributes and how the citing authors treat it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub contribution: String,
    pub purpose: String,
    pub stance: String,
    /// Original service output, kept when it could not be interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    pub status: AnalysisStatus,
}

impl Analysis {
    pub fn unparsed(raw: impl Into<String>) -> Self {
        Self {
            contribution: "Unable to parse analysis".to_string(),
            purpose: "Unknown".to_string(),
            stance: "Unknown".to_string(),
            raw: Some(raw.into()),
            status: AnalysisStatus::Unparsed,
        }
    }

    pub fn failed(err: &AnalysisError) -> Self {
        Self {
            contribution: format!("Error during analysis: {}", err),
            purpose: "Error".to_string(),
            stance: "Error".to_string(),
            raw: None,
            status: AnalysisStatus::Failed,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Missing API key: {0}")]
    MissingKey(String),
    #[error("Empty response from analysis service")]
    EmptyResponse,
}

/// A text-classification service that explains one citation in context.
/// Returns the service's raw text; interpretation happens in
/// [`interpret_response`].
#[async_trait]
pub trait AnalysisService: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, marker: &str, context: &str) -> Result<String, AnalysisError>;
}

#[derive(Deserialize)]
struct AnalysisPayload {
    contribution: String,
    purpose: String,
    stance: String,
}

/// Turn raw service output into an [`Analysis`]. Output that is not a JSON
/// object with string `contribution`, `purpose` and `stance` fields becomes
/// an "Unknown" placeholder carrying the raw text.
pub fn interpret_response(raw: &str) -> Analysis {
    match serde_json::from_str::<AnalysisPayload>(strip_code_fence(raw)) {
        Ok(p) => Analysis {
            contribution: p.contribution,
            purpose: p.purpose,
            stance: p.stance,
            raw: None,
            status: AnalysisStatus::Parsed,
        },
        Err(e) => {
            tracing::debug!("Analysis output is not the expected JSON: {}", e);
            Analysis::unparsed(raw)
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Ask the service about one record. Never fails: call errors become an
/// "Error" placeholder.
pub async fn analyze_citation(service: &dyn AnalysisService, record: &CitationRecord) -> Analysis {
    match service.complete(&record.marker, &record.context).await {
        Ok(raw) => interpret_response(&raw),
        Err(e) => {
            tracing::error!("Error analyzing citation {} via {}: {}", record.marker, service.name(), e);
            Analysis::failed(&e)
        }
    }
}

/// Attach an analysis to a record. A record is analyzed at most once; an
/// existing analysis is kept.
pub fn merge_analysis(record: CitationRecord, analysis: Analysis) -> CitationRecord {
    if record.analysis.is_some() {
        tracing::warn!("Citation {} already analyzed, keeping first result", record.marker);
        return record;
    }
    CitationRecord {
        analysis: Some(analysis),
        ..record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MarkerFamily;

    fn record(marker: &str) -> CitationRecord {
        CitationRecord {
            marker: marker.to_string(),
            context: format!("some prose {} more prose", marker),
            span: (11, 11 + marker.len()),
            family: MarkerFamily::Numeric,
            analysis: None,
        }
    }

    #[test]
    fn test_interpret_valid_json() {
        let a = interpret_response(
            r#"{"contribution": "Introduces transformers", "purpose": "Background", "stance": "neutral"}"#,
        );
        assert_eq!(a.status, AnalysisStatus::Parsed);
        assert_eq!(a.contribution, "Introduces transformers");
        assert_eq!(a.stance, "neutral");
        assert!(a.raw.is_none());
    }

    #[test]
    fn test_interpret_fenced_json() {
        let a = interpret_response(
            "```json\n{\"contribution\": \"c\", \"purpose\": \"p\", \"stance\": \"extend\"}\n```",
        );
        assert_eq!(a.status, AnalysisStatus::Parsed);
        assert_eq!(a.stance, "extend");
    }

    #[test]
    fn test_interpret_non_json_keeps_raw() {
        let raw = "The authors mostly agree with this paper.";
        let a = interpret_response(raw);
        assert_eq!(a.status, AnalysisStatus::Unparsed);
        assert_eq!(a.contribution, "Unable to parse analysis");
        assert_eq!(a.purpose, "Unknown");
        assert_eq!(a.stance, "Unknown");
        assert_eq!(a.raw.as_deref(), Some(raw));
    }

    #[test]
    fn test_interpret_missing_field_is_unparsed() {
        let a = interpret_response(r#"{"contribution": "c", "purpose": "p"}"#);
        assert_eq!(a.status, AnalysisStatus::Unparsed);
    }

    #[test]
    fn test_failed_placeholder() {
        let a = Analysis::failed(&AnalysisError::Api("429 Too Many Requests".to_string()));
        assert_eq!(a.contribution, "Error during analysis: API error: 429 Too Many Requests");
        assert_eq!(a.purpose, "Error");
        assert_eq!(a.stance, "Error");
        assert_eq!(a.status, AnalysisStatus::Failed);
    }

    #[test]
    fn test_merge_sets_once() {
        let first = Analysis::unparsed("first");
        let merged = merge_analysis(record("[1]"), first.clone());
        assert_eq!(merged.analysis.as_ref(), Some(&first));

        let again = merge_analysis(merged, Analysis::unparsed("second"));
        assert_eq!(again.analysis, Some(first));
        assert_eq!(again.marker, "[1]");
    }
}
