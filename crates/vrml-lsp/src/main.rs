//! VRML97 language server with diagnostics, completions, hover and document symbols.
//!
//! A `tower-lsp` based LSP server that wraps `vrml-core` for real-time
//! editor feedback, plus one-shot stdin/stdout modes for scripts.

mod completion;
mod diagnostics;
mod document;
mod hover;
mod modes;
mod symbols;

use document::Document;
use std::collections::HashMap;
use std::io::Read;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

/// The VRML language server backend.
struct VrmlLanguageServer {
    client: Client,
    /// Parsed documents by URI.
    documents: Mutex<HashMap<Url, Document>>,
}

impl VrmlLanguageServer {
    fn new(client: Client) -> Self {
        Self {
            client,
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Reparse a document and publish diagnostics.
    async fn on_change(&self, uri: Url, text: String) {
        let doc = Document::parse(uri.as_str(), &text);
        let diags = diagnostics::compute_diagnostics(&doc);
        self.documents.lock().await.insert(uri.clone(), doc);
        self.client.publish_diagnostics(uri, diags, None).await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for VrmlLanguageServer {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![" ".to_string(), "{".to_string()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "vrml-lsp initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;
        self.on_change(uri, text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().next_back() {
            self.on_change(uri, change.text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.lock().await.remove(&params.text_document.uri);
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let pos = params.text_document_position.position;

        let docs = self.documents.lock().await;
        let items = docs
            .get(uri)
            .map(|doc| completion::compute_completions(doc, pos))
            .unwrap_or_default();
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;

        let docs = self.documents.lock().await;
        Ok(docs.get(uri).and_then(|doc| hover::compute_hover(doc, pos)))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = &params.text_document.uri;

        let docs = self.documents.lock().await;
        let syms = docs
            .get(uri)
            .map(|doc| symbols::compute_symbols(uri, doc))
            .unwrap_or_default();
        Ok(Some(DocumentSymbolResponse::Flat(syms)))
    }
}

/// Read the document for a one-shot mode: the file named after the flag, or
/// stdin. Exits with status 2 when it cannot be read.
fn read_input(args: &[String]) -> (String, String) {
    let result = match args.get(2) {
        Some(path) => std::fs::read_to_string(path).map(|text| (path.clone(), text)),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map(|_| ("stdin.wrl".to_string(), text))
        }
    };
    result.unwrap_or_else(|e| {
        eprintln!("vrml-lsp: cannot read input: {e}");
        std::process::exit(2);
    })
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the LSP protocol or mode output.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        // ── `vrml-lsp --format [file]` ──────────────────────────────────
        // Canonical re-emit, used by editor format-document commands.
        Some("--format") => {
            let (uri, text) = read_input(&args);
            match modes::format(&uri, &text) {
                Ok(formatted) => print!("{formatted}"),
                Err(e) => {
                    eprintln!("vrml-lsp --format error: {e}");
                    std::process::exit(1);
                }
            }
        }

        // ── `vrml-lsp --check [file]` ───────────────────────────────────
        Some("--check") => {
            let (uri, text) = read_input(&args);
            let (report, ok) = modes::check(&uri, &text);
            print!("{report}");
            if !ok {
                std::process::exit(1);
            }
        }

        // ── `vrml-lsp --outline [file]` ─────────────────────────────────
        Some("--outline") => {
            let (uri, text) = read_input(&args);
            match modes::outline(&uri, &text) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("vrml-lsp --outline error: {e}");
                    std::process::exit(1);
                }
            }
        }

        Some(other) if other.starts_with("--") => {
            eprintln!("vrml-lsp: unknown mode '{other}'");
            eprintln!("  valid modes: --format, --check, --outline (or none for the LSP server)");
            std::process::exit(2);
        }

        // ── Standard LSP server mode ─────────────────────────────────────
        _ => {
            log::info!("vrml-lsp serving on stdio");
            let stdin = tokio::io::stdin();
            let stdout = tokio::io::stdout();
            let (service, socket) = LspService::new(VrmlLanguageServer::new);
            Server::new(stdin, stdout, socket).serve(service).await;
        }
    }
}
