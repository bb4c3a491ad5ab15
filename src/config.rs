use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::openai::{self, OpenAiAnalyzer};
use crate::apis::{self, MetadataSource};
use crate::extract::DEFAULT_CONTEXT_RADIUS;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub context_window_size: usize,
    pub analysis_concurrency: usize,
    pub request_timeout_secs: u64,
    pub semantic_scholar_api_key: Option<String>,
    pub enabled_source_names: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: openai::DEFAULT_MODEL.to_string(),
            api_base: openai::DEFAULT_API_BASE.to_string(),
            context_window_size: DEFAULT_CONTEXT_RADIUS,
            analysis_concurrency: 1,
            request_timeout_secs: 60,
            semantic_scholar_api_key: None,
            enabled_source_names: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let enabled_source_names = non_empty("CITATION_DECODER_SOURCES")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            model: non_empty("CITATION_DECODER_MODEL").unwrap_or(defaults.model),
            api_base: non_empty("CITATION_DECODER_API_BASE").unwrap_or(defaults.api_base),
            context_window_size: parse_or(
                "CITATION_DECODER_CONTEXT_WINDOW",
                lookup("CITATION_DECODER_CONTEXT_WINDOW"),
                defaults.context_window_size,
            ),
            analysis_concurrency: parse_or(
                "CITATION_DECODER_CONCURRENCY",
                lookup("CITATION_DECODER_CONCURRENCY"),
                defaults.analysis_concurrency,
            )
            .max(1),
            request_timeout_secs: parse_or(
                "CITATION_DECODER_TIMEOUT_SECS",
                lookup("CITATION_DECODER_TIMEOUT_SECS"),
                defaults.request_timeout_secs,
            ),
            semantic_scholar_api_key: non_empty("SEMANTIC_SCHOLAR_API_KEY"),
            enabled_source_names,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn should_enable(&self, name: &str) -> bool {
        self.enabled_source_names.is_empty() || self.enabled_source_names.iter().any(|n| n == name)
    }

    /// Build the metadata sources in lookup order.
    pub fn build_sources(&self) -> Vec<Arc<dyn MetadataSource>> {
        let mut sources: Vec<Arc<dyn MetadataSource>> = Vec::new();

        if self.should_enable("arxiv") {
            sources.push(Arc::new(apis::arxiv::ArxivClient::new(self.request_timeout())));
        }
        if self.should_enable("semantic_scholar") {
            sources.push(Arc::new(apis::semantic_scholar::SemanticScholarClient::new(
                self.semantic_scholar_api_key.clone(),
                self.request_timeout(),
            )));
        }

        if sources.is_empty() {
            tracing::warn!(
                "CITATION_DECODER_SOURCES={:?} enables no metadata source; arXiv lookups will fail",
                self.enabled_source_names
            );
        }
        sources
    }

    /// Build the citation analyzer. Without an API key every analysis call
    /// degrades to an error placeholder.
    pub fn build_analyzer(&self) -> OpenAiAnalyzer {
        if self.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set: citation analysis will be unavailable");
        }
        OpenAiAnalyzer::new(
            self.openai_api_key.clone(),
            self.model.clone(),
            self.api_base.clone(),
            self.request_timeout(),
        )
    }

    /// Return a list of collaborator status descriptions.
    pub fn source_status(&self) -> Vec<SourceStatus> {
        let mut statuses = vec![
            SourceStatus {
                name: "arxiv".into(),
                enabled: true,
                note: "No API key required".into(),
            },
            SourceStatus {
                name: "semantic_scholar".into(),
                enabled: true,
                note: if self.semantic_scholar_api_key.is_some() {
                    "API key set".into()
                } else {
                    "No API key (rate limited)".into()
                },
            },
        ];

        for s in &mut statuses {
            if !self.should_enable(&s.name) {
                s.enabled = false;
                s.note = "Disabled by CITATION_DECODER_SOURCES filter".into();
            }
        }

        statuses.push(SourceStatus {
            name: "analysis".into(),
            enabled: self.openai_api_key.is_some(),
            note: if self.openai_api_key.is_some() {
                format!("model {} at {}", self.model, self.api_base)
            } else {
                "Disabled: OPENAI_API_KEY not set".into()
            },
        });

        statuses
    }
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using default", name, raw);
            default
        }),
        _ => default,
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub enabled: bool,
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config_from(&[]);
        assert!(c.openai_api_key.is_none());
        assert_eq!(c.context_window_size, 100);
        assert_eq!(c.analysis_concurrency, 1);
        assert_eq!(c.model, "gpt-4");
        assert_eq!(c.build_sources().len(), 2);
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let c = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CITATION_DECODER_CONTEXT_WINDOW", "250"),
            ("CITATION_DECODER_CONCURRENCY", "0"),
            ("CITATION_DECODER_TIMEOUT_SECS", "soon"),
            ("CITATION_DECODER_MODEL", "  "),
        ]);
        assert_eq!(c.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(c.context_window_size, 250);
        assert_eq!(c.analysis_concurrency, 1);
        assert_eq!(c.request_timeout_secs, 60);
        assert_eq!(c.model, "gpt-4");
    }

    #[test]
    fn test_source_filter() {
        let c = config_from(&[("CITATION_DECODER_SOURCES", "ArXiv, ")]);
        assert_eq!(c.enabled_source_names, vec!["arxiv"]);
        let sources = c.build_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "arxiv");

        let status = c.source_status();
        let s2 = status.iter().find(|s| s.name == "semantic_scholar").unwrap();
        assert!(!s2.enabled);
        let analysis = status.iter().find(|s| s.name == "analysis").unwrap();
        assert!(!analysis.enabled);
    }
}
