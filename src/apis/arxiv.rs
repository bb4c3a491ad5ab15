use std::sync::LazyLock;
use std::time::Duration;

use super::{FetchError, MetadataSource, PaperMetadata, PdfFetcher, SourceError};
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

const BASE_URL: &str = "https://export.arxiv.org/api/query";
const PDF_BASE_URL: &str = "https://arxiv.org/pdf";

pub struct ArxivClient {
    client: reqwest::Client,
}

impl ArxivClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("citation-decoder/0.1")
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl MetadataSource for ArxivClient {
    fn name(&self) -> &str {
        "arxiv"
    }

    async fn get_paper(&self, arxiv_id: &str) -> Result<Option<PaperMetadata>, SourceError> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[("id_list", arxiv_id)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Api(format!("arXiv returned {}", resp.status())));
        }
        let body = resp.text().await?;
        Ok(parse_atom_feed(&body)?.into_iter().next())
    }
}

#[async_trait]
impl PdfFetcher for ArxivClient {
    async fn fetch_pdf(&self, arxiv_id: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/{}.pdf", PDF_BASE_URL, arxiv_id);
        tracing::info!("Downloading {}", url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

static ARXIV_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"arxiv\.org/(?:abs|pdf)/((?:[a-z\-]+(?:\.[A-Z]{2})?/\d{7}|\d{4}\.\d{4,5})(?:v\d+)?)")
        .unwrap()
});

/// Reduce user input to a bare arXiv identifier. Accepts `2106.12423`,
/// `arxiv:2106.12423v2`, and abs/pdf URLs.
pub fn normalize_arxiv_id(input: &str) -> String {
    let input = input.trim();
    if let Some(caps) = ARXIV_URL_RE.captures(input) {
        return caps[1].to_string();
    }
    let id = input
        .get(..6)
        .filter(|prefix| prefix.eq_ignore_ascii_case("arxiv:"))
        .map(|_| &input[6..])
        .unwrap_or(input);
    id.trim_end_matches(".pdf").to_string()
}

/// `(href, title)` attributes of an Atom `<link>`.
fn link_attrs(e: &BytesStart) -> (String, String) {
    let mut href = String::new();
    let mut title = String::new();
    for attr in e.attributes().flatten() {
        let val = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.as_ref() {
            b"href" => href = val,
            b"title" => title = val,
            _ => {}
        }
    }
    (href, title)
}

#[derive(Default)]
struct EntryBuilder {
    id_url: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    link_pdf: String,
    link_abs: String,
    doi: Option<String>,
}

impl EntryBuilder {
    fn add_link(&mut self, e: &BytesStart) {
        let (href, title) = link_attrs(e);
        if title == "pdf" {
            self.link_pdf = href;
        } else if self.link_abs.is_empty() && href.contains("abs") {
            self.link_abs = href;
        }
    }

    fn finish(self) -> Option<PaperMetadata> {
        // The API reports bad ids as an entry pointing at its error docs.
        if self.id_url.contains("/api/errors") {
            return None;
        }
        let id = self.id_url.rsplit('/').next().unwrap_or(&self.id_url).to_string();
        if id.is_empty() || self.title.trim().is_empty() {
            return None;
        }
        let summary = collapse_whitespace(&self.summary);
        Some(PaperMetadata {
            id: format!("arxiv:{}", id),
            title: collapse_whitespace(&self.title),
            authors: self.authors,
            abstract_text: (!summary.is_empty()).then_some(summary),
            year: self.published.get(..4).and_then(|y| y.parse::<u32>().ok()),
            source: "arxiv".to_string(),
            doi: self.doi,
            arxiv_id: Some(id),
            url: if self.link_abs.is_empty() { self.id_url } else { self.link_abs },
            pdf_url: (!self.link_pdf.is_empty()).then_some(self.link_pdf),
        })
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_atom_feed(xml: &str) -> Result<Vec<PaperMetadata>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut papers = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut current_tag = String::new();
    let mut author_name = String::new();
    let mut in_author = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "entry" {
                    entry = Some(EntryBuilder::default());
                } else if let Some(current) = entry.as_mut() {
                    if tag == "author" {
                        in_author = true;
                        author_name.clear();
                    } else if tag == "link" {
                        current.add_link(&e);
                    }
                    current_tag = tag;
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(current) = entry.as_mut() {
                    if e.name().as_ref() == b"link" {
                        current.add_link(&e);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = entry.as_mut() {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current_tag.as_str() {
                        "title" => current.title.push_str(&text),
                        "summary" => current.summary.push_str(&text),
                        "id" if current.id_url.is_empty() => current.id_url = text.trim().to_string(),
                        "published" => current.published.push_str(&text),
                        "name" if in_author => author_name.push_str(&text),
                        tag if tag.ends_with("doi") => current.doi = Some(text.trim().to_string()),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "entry" {
                    if let Some(paper) = entry.take().and_then(EntryBuilder::finish) {
                        papers.push(paper);
                    }
                } else if tag == "author" && in_author {
                    in_author = false;
                    if let Some(current) = entry.as_mut() {
                        let name = author_name.trim();
                        if !name.is_empty() {
                            current.authors.push(name.to_string());
                        }
                    }
                }
                if tag == current_tag {
                    current_tag.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }
    Ok(papers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/2106.12423v1</id>
    <title>Attention Is
      Not All You Need</title>
    <summary>We revisit the role of attention in sequence models.</summary>
    <published>2021-06-23T00:00:00Z</published>
    <author><name>John Doe</name></author>
    <author><name>Jane Smith</name></author>
    <arxiv:doi>10.1234/example.5678</arxiv:doi>
    <link href="http://arxiv.org/abs/2106.12423v1" rel="alternate" type="text/html"/>
    <link href="http://arxiv.org/pdf/2106.12423v1" title="pdf" type="application/pdf"/>
  </entry>
</feed>"#;

    const ERROR_ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_not-an-id</id>
    <title>Error</title>
    <summary>incorrect id format for not-an-id</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_atom_feed() {
        let papers = parse_atom_feed(SAMPLE_ATOM).unwrap();
        assert_eq!(papers.len(), 1);
        let p = &papers[0];
        assert_eq!(p.id, "arxiv:2106.12423v1");
        assert_eq!(p.title, "Attention Is Not All You Need");
        assert_eq!(p.authors, vec!["John Doe", "Jane Smith"]);
        assert_eq!(p.year, Some(2021));
        assert_eq!(p.doi.as_deref(), Some("10.1234/example.5678"));
        assert_eq!(p.url, "http://arxiv.org/abs/2106.12423v1");
        assert_eq!(p.pdf_url.as_deref(), Some("http://arxiv.org/pdf/2106.12423v1"));
    }

    #[test]
    fn test_error_entry_is_not_found() {
        assert!(parse_atom_feed(ERROR_ATOM).unwrap().is_empty());
    }

    #[test]
    fn test_empty_feed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#;
        assert!(parse_atom_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_normalize_arxiv_id() {
        assert_eq!(normalize_arxiv_id("2106.12423"), "2106.12423");
        assert_eq!(normalize_arxiv_id("  arXiv:2106.12423v2 "), "2106.12423v2");
        assert_eq!(normalize_arxiv_id("https://arxiv.org/abs/2106.12423"), "2106.12423");
        assert_eq!(normalize_arxiv_id("https://arxiv.org/pdf/2106.12423v3.pdf"), "2106.12423v3");
        assert_eq!(normalize_arxiv_id("http://arxiv.org/abs/hep-th/9901001"), "hep-th/9901001");
        assert_eq!(normalize_arxiv_id("2106.12423.pdf"), "2106.12423");
    }
}
