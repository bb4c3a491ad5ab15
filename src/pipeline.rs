use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::analysis::{analyze_records, AnalysisService};
use crate::apis::arxiv::{normalize_arxiv_id, ArxivClient};
use crate::apis::{MetadataSource, PaperMetadata, PdfFetcher};
use crate::config::Config;
use crate::convert::{ConversionError, PdfExtractConverter, TextConverter};
use crate::extract::{extract_citations, references::split_references, CitationRecord};

/// Where the document comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Arxiv(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to extract text from PDF: {0}")]
    Extraction(#[from] ConversionError),
    #[error("No citations found in the document")]
    NoCitationsFound,
    #[error("Could not find paper with arXiv ID: {0}")]
    PaperNotFound(String),
    #[error("Failed to download PDF from arXiv: {0}")]
    DownloadFailed(String),
}

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedPaper {
    pub citations: Vec<CitationRecord>,
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PaperMetadata>,
}

/// Wire shape handed to callers: the decoded paper, or `{"error": ...}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DecodeResponse {
    Decoded(DecodedPaper),
    Failed { error: String },
}

impl From<Result<DecodedPaper, DecodeError>> for DecodeResponse {
    fn from(result: Result<DecodedPaper, DecodeError>) -> Self {
        match result {
            Ok(paper) => Self::Decoded(paper),
            Err(e) => Self::Failed { error: e.to_string() },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecoderSettings {
    pub context_window: usize,
    pub analysis_concurrency: usize,
}

impl From<&Config> for DecoderSettings {
    fn from(config: &Config) -> Self {
        Self {
            context_window: config.context_window_size,
            analysis_concurrency: config.analysis_concurrency,
        }
    }
}

/// Runs the extraction pipeline and coordinates its external collaborators.
pub struct Decoder {
    settings: DecoderSettings,
    converter: Arc<dyn TextConverter>,
    analyzer: Arc<dyn AnalysisService>,
    sources: Vec<Arc<dyn MetadataSource>>,
    fetcher: Arc<dyn PdfFetcher>,
}

impl Decoder {
    pub fn new(
        settings: DecoderSettings,
        converter: Arc<dyn TextConverter>,
        analyzer: Arc<dyn AnalysisService>,
        sources: Vec<Arc<dyn MetadataSource>>,
        fetcher: Arc<dyn PdfFetcher>,
    ) -> Self {
        Self {
            settings,
            converter,
            analyzer,
            sources,
            fetcher,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            DecoderSettings::from(config),
            Arc::new(PdfExtractConverter),
            Arc::new(config.build_analyzer()),
            config.build_sources(),
            Arc::new(ArxivClient::new(config.request_timeout())),
        )
    }

    pub async fn process_document(&self, source: DocumentSource) -> Result<DecodedPaper, DecodeError> {
        match source {
            DocumentSource::Path(path) => self.process_path(&path).await,
            DocumentSource::Bytes(bytes) => self.process_pdf(bytes).await,
            DocumentSource::Arxiv(id) => self.process_arxiv(&id).await,
        }
    }

    pub async fn process_path(&self, path: &Path) -> Result<DecodedPaper, DecodeError> {
        let bytes = tokio::fs::read(path).await.map_err(ConversionError::from)?;
        self.process_pdf(bytes).await
    }

    /// Full local pipeline: text, citations, references, analysis.
    pub async fn process_pdf(&self, bytes: Vec<u8>) -> Result<DecodedPaper, DecodeError> {
        let text = self.document_text(bytes).await?;
        let mut paper = self.extract(&text, self.settings.context_window)?;

        tracing::info!(
            "Found {} citations and {} references",
            paper.citations.len(),
            paper.references.len()
        );

        let records = std::mem::take(&mut paper.citations);
        paper.citations = analyze_records(
            self.analyzer.as_ref(),
            records,
            self.settings.analysis_concurrency,
        )
        .await;
        Ok(paper)
    }

    /// Citations and references only, skipping the analysis service.
    pub async fn extract_only(
        &self,
        bytes: Vec<u8>,
        context_window: Option<usize>,
    ) -> Result<DecodedPaper, DecodeError> {
        let text = self.document_text(bytes).await?;
        self.extract(&text, context_window.unwrap_or(self.settings.context_window))
    }

    pub async fn extract_path(
        &self,
        path: &Path,
        context_window: Option<usize>,
    ) -> Result<DecodedPaper, DecodeError> {
        let bytes = tokio::fs::read(path).await.map_err(ConversionError::from)?;
        self.extract_only(bytes, context_window).await
    }

    /// Remote pipeline: resolve metadata, download the PDF, decode it.
    pub async fn process_arxiv(&self, input: &str) -> Result<DecodedPaper, DecodeError> {
        let arxiv_id = normalize_arxiv_id(input);
        if arxiv_id.is_empty() {
            return Err(DecodeError::PaperNotFound(input.trim().to_string()));
        }

        let metadata = self
            .lookup_metadata(&arxiv_id)
            .await
            .ok_or_else(|| DecodeError::PaperNotFound(arxiv_id.clone()))?;
        tracing::info!("Resolved {} via {}: {}", arxiv_id, metadata.source, metadata.title);

        let bytes = self
            .fetcher
            .fetch_pdf(&arxiv_id)
            .await
            .map_err(|e| DecodeError::DownloadFailed(e.to_string()))?;

        let mut paper = self.process_pdf(bytes).await?;
        paper.metadata = Some(metadata);
        Ok(paper)
    }

    fn extract(&self, text: &str, context_window: usize) -> Result<DecodedPaper, DecodeError> {
        let citations = extract_citations(text, context_window);
        if citations.is_empty() {
            return Err(DecodeError::NoCitationsFound);
        }
        Ok(DecodedPaper {
            citations,
            references: split_references(text),
            metadata: None,
        })
    }

    async fn document_text(&self, bytes: Vec<u8>) -> Result<String, DecodeError> {
        let converter = Arc::clone(&self.converter);
        let text = tokio::task::spawn_blocking(move || converter.convert(&bytes))
            .await
            .map_err(|e| ConversionError::Aborted(e.to_string()))??;
        Ok(text)
    }

    async fn lookup_metadata(&self, arxiv_id: &str) -> Option<PaperMetadata> {
        for src in &self.sources {
            match src.get_paper(arxiv_id).await {
                Ok(Some(paper)) => return Some(paper),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Source {} failed for {}: {}", src.name(), arxiv_id, e);
                    continue;
                }
            }
        }
        None
    }
}
