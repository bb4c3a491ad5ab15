use std::path::{Path, PathBuf};
use std::sync::Arc;

use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters,
    model::*, tool, tool_handler, tool_router,
    transport::stdio, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

mod analysis;
mod apis;
mod config;
mod convert;
mod extract;
mod pipeline;

use config::Config;
use pipeline::{DecodeResponse, Decoder, DocumentSource};

// ── Parameter structs ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct DecodePdfParams {
    #[schemars(description = "Path to a local PDF file")]
    path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DecodeArxivParams {
    #[schemars(description = "arXiv ID or URL (e.g. 2106.12423 or https://arxiv.org/abs/2106.12423)")]
    id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExtractCitationsParams {
    #[schemars(description = "Path to a local PDF file")]
    path: String,
    #[schemars(description = "Context radius in characters around each citation (default 100)")]
    context_window: Option<u32>,
}

// ── Server ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct CitationDecoderServer {
    tool_router: ToolRouter<Self>,
    config: Arc<Config>,
    decoder: Arc<Decoder>,
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[tool_router]
impl CitationDecoderServer {
    pub fn create() -> Self {
        let config = Config::from_env();
        let decoder = Decoder::from_config(&config);

        tracing::info!(
            "Initialized decoder: context_window={}, analysis_concurrency={}, model={}",
            config.context_window_size,
            config.analysis_concurrency,
            config.model
        );

        Self {
            tool_router: Self::tool_router(),
            config: Arc::new(config),
            decoder: Arc::new(decoder),
        }
    }

    #[tool(description = "List metadata sources and analysis service status")]
    async fn list_sources(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.config.source_status())
    }

    #[tool(description = "Extract every in-text citation from a local PDF and explain what each cited work contributes, its purpose, and the authors' stance toward it")]
    async fn decode_pdf(
        &self,
        Parameters(params): Parameters<DecodePdfParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Decoding {}", params.path);
        let result = self
            .decoder
            .process_document(DocumentSource::Path(PathBuf::from(&params.path)))
            .await;
        json_result(&DecodeResponse::from(result))
    }

    #[tool(description = "Download an arXiv paper, then extract and explain its in-text citations. Includes the paper's title, authors, abstract and year.")]
    async fn decode_arxiv(
        &self,
        Parameters(params): Parameters<DecodeArxivParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Decoding arXiv paper {}", params.id);
        let result = self
            .decoder
            .process_document(DocumentSource::Arxiv(params.id))
            .await;
        json_result(&DecodeResponse::from(result))
    }

    #[tool(description = "Extract in-text citations with context and the reference list from a local PDF, without calling the analysis service")]
    async fn extract_citations(
        &self,
        Parameters(params): Parameters<ExtractCitationsParams>,
    ) -> Result<CallToolResult, McpError> {
        let window = params.context_window.map(|w| w as usize);
        let result = self
            .decoder
            .extract_path(Path::new(&params.path), window)
            .await;
        json_result(&DecodeResponse::from(result))
    }
}

#[tool_handler]
impl ServerHandler for CitationDecoderServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Decode the citations of a research paper. Given a local PDF or an \
                 arXiv ID, finds every in-text citation marker, pairs it with its \
                 surrounding text, lists the references section, and explains what \
                 each cited work contributes and whether the authors agree with, \
                 critique, extend, or neutrally reference it."
                    .into(),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting citation-decoder MCP server");

    let server = CitationDecoderServer::create();
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
