use std::time::Duration;

use super::{MetadataSource, PaperMetadata, SourceError};
use async_trait::async_trait;
use serde::Deserialize;

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
const FIELDS: &str = "title,authors,abstract,year,externalIds,url,openAccessPdf";

pub struct SemanticScholarClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("citation-decoder/0.1")
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
        }
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    paper_id: Option<String>,
    title: Option<String>,
    authors: Option<Vec<S2Author>>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<u32>,
    external_ids: Option<S2ExternalIds>,
    url: Option<String>,
    open_access_pdf: Option<S2Pdf>,
}

#[derive(Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
}

#[derive(Deserialize)]
struct S2Pdf {
    url: Option<String>,
}

fn s2_to_metadata(p: S2Paper) -> PaperMetadata {
    let external_ids = p.external_ids;
    PaperMetadata {
        id: format!("s2:{}", p.paper_id.unwrap_or_default()),
        title: p.title.unwrap_or_default(),
        authors: p
            .authors
            .map(|a| a.into_iter().filter_map(|a| a.name).collect())
            .unwrap_or_default(),
        abstract_text: p.abstract_text,
        year: p.year,
        source: "semantic_scholar".to_string(),
        doi: external_ids.as_ref().and_then(|e| e.doi.clone()),
        arxiv_id: external_ids.and_then(|e| e.arxiv),
        url: p.url.unwrap_or_default(),
        pdf_url: p.open_access_pdf.and_then(|pdf| pdf.url),
    }
}

/// Semantic Scholar indexes arXiv papers without the version suffix.
fn strip_version(arxiv_id: &str) -> &str {
    match arxiv_id.rfind('v') {
        Some(pos)
            if pos + 1 < arxiv_id.len()
                && arxiv_id[pos + 1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            &arxiv_id[..pos]
        }
        _ => arxiv_id,
    }
}

#[async_trait]
impl MetadataSource for SemanticScholarClient {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    async fn get_paper(&self, arxiv_id: &str) -> Result<Option<PaperMetadata>, SourceError> {
        let url = format!("{}/paper/arXiv:{}", BASE_URL, strip_version(arxiv_id));
        let resp = self
            .add_auth(self.client.get(&url).query(&[("fields", FIELDS)]))
            .send()
            .await?;
        if resp.status() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(SourceError::Api(format!("Semantic Scholar returned {}", resp.status())));
        }
        let paper: S2Paper = resp.json().await?;
        if paper.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Ok(None);
        }
        Ok(Some(s2_to_metadata(paper)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s2_to_metadata() {
        let raw = r#"{
            "paperId": "abc123",
            "title": "Deep Residual Learning",
            "authors": [{"authorId": "1", "name": "Kaiming He"}, {"authorId": "2", "name": null}],
            "abstract": "Residual nets.",
            "year": 2016,
            "externalIds": {"DOI": "10.1109/CVPR.2016.90", "ArXiv": "1512.03385"},
            "url": "https://www.semanticscholar.org/paper/abc123",
            "openAccessPdf": {"url": "https://arxiv.org/pdf/1512.03385"}
        }"#;
        let paper: S2Paper = serde_json::from_str(raw).unwrap();
        let m = s2_to_metadata(paper);
        assert_eq!(m.id, "s2:abc123");
        assert_eq!(m.authors, vec!["Kaiming He"]);
        assert_eq!(m.year, Some(2016));
        assert_eq!(m.doi.as_deref(), Some("10.1109/CVPR.2016.90"));
        assert_eq!(m.arxiv_id.as_deref(), Some("1512.03385"));
        assert_eq!(m.pdf_url.as_deref(), Some("https://arxiv.org/pdf/1512.03385"));
    }

    #[test]
    fn test_sparse_payload() {
        let paper: S2Paper = serde_json::from_str(r#"{"paperId": "x", "title": "T"}"#).unwrap();
        let m = s2_to_metadata(paper);
        assert!(m.authors.is_empty());
        assert!(m.abstract_text.is_none());
        assert_eq!(m.url, "");
    }

    #[test]
    fn test_strip_version() {
        assert_eq!(strip_version("2106.12423v2"), "2106.12423");
        assert_eq!(strip_version("2106.12423"), "2106.12423");
        assert_eq!(strip_version("solv-int/9901001"), "solv-int/9901001");
        assert_eq!(strip_version("hep-th/9901001v1"), "hep-th/9901001");
    }
}
