pub mod arxiv;
pub mod semantic_scholar;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bibliographic metadata for the paper being decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: Option<String>,
    pub year: Option<u32>,
    pub source: String,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub url: String,
    pub pdf_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {0}")]
    Api(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Status(u16),
}

/// A paper-metadata provider keyed by arXiv identifier.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &str;
    async fn get_paper(&self, arxiv_id: &str) -> Result<Option<PaperMetadata>, SourceError>;
}

/// Retrieves the PDF bytes for an arXiv identifier.
#[async_trait]
pub trait PdfFetcher: Send + Sync {
    async fn fetch_pdf(&self, arxiv_id: &str) -> Result<Vec<u8>, FetchError>;
}
