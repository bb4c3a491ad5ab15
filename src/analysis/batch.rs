use futures::stream::{self, StreamExt};

use super::{analyze_citation, merge_analysis, AnalysisService};
use crate::extract::CitationRecord;

/// Analyze every record with at most `concurrency` calls in flight.
/// Results come back in the order the records were given, whatever order
/// the calls finish in.
pub async fn analyze_records(
    service: &dyn AnalysisService,
    records: Vec<CitationRecord>,
    concurrency: usize,
) -> Vec<CitationRecord> {
    let total = records.len();
    stream::iter(records.into_iter().enumerate())
        .map(move |(i, record)| async move {
            tracing::info!("Analyzing citation {}/{}: {}", i + 1, total, record.marker);
            let analysis = analyze_citation(service, &record).await;
            merge_analysis(record, analysis)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisError, AnalysisStatus};
    use crate::extract::extract_citations;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers slower for earlier markers, fails for `[2]`, rambles for `[3]`.
    struct ScriptedService;

    #[async_trait]
    impl AnalysisService for ScriptedService {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, marker: &str, _context: &str) -> Result<String, AnalysisError> {
            let delay = match marker {
                "[1]" => 30,
                "[2]" => 20,
                _ => 0,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            match marker {
                "[2]" => Err(AnalysisError::Api("service unavailable".to_string())),
                "[3]" => Ok("not json at all".to_string()),
                m => Ok(format!(
                    r#"{{"contribution": "about {}", "purpose": "Background", "stance": "neutral"}}"#,
                    m
                )),
            }
        }
    }

    fn sample_records() -> Vec<CitationRecord> {
        extract_citations("Alpha [1], beta [2], gamma [3] and delta [4].", 20)
    }

    #[tokio::test]
    async fn test_sequential_batch_keeps_order_and_degrades() {
        let analyzed = analyze_records(&ScriptedService, sample_records(), 1).await;

        let markers: Vec<_> = analyzed.iter().map(|r| r.marker.as_str()).collect();
        assert_eq!(markers, vec!["[1]", "[2]", "[3]", "[4]"]);

        let statuses: Vec<_> = analyzed
            .iter()
            .map(|r| r.analysis.as_ref().unwrap().status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                AnalysisStatus::Parsed,
                AnalysisStatus::Failed,
                AnalysisStatus::Unparsed,
                AnalysisStatus::Parsed,
            ]
        );
        assert_eq!(analyzed[0].analysis.as_ref().unwrap().contribution, "about [1]");
    }

    #[tokio::test]
    async fn test_parallel_batch_reassembles_in_discovery_order() {
        let analyzed = analyze_records(&ScriptedService, sample_records(), 4).await;
        let markers: Vec<_> = analyzed.iter().map(|r| r.marker.as_str()).collect();
        assert_eq!(markers, vec!["[1]", "[2]", "[3]", "[4]"]);
        assert!(analyzed.iter().all(|r| r.analysis.is_some()));
    }

    #[tokio::test]
    async fn test_zero_concurrency_treated_as_one() {
        let analyzed = analyze_records(&ScriptedService, sample_records(), 0).await;
        assert_eq!(analyzed.len(), 4);
    }
}
