//! The RAG session: composes loader, chunker, lexical index, vector index,
//! guard, and generator into ingest and query workflows.
//!
//! Lifecycle is `Created → Ingested` for the life of the process. `ingest`
//! is idempotent — repeat calls return the cached summary without touching
//! the backends. A session is built for exactly one document; concurrent
//! sessions over distinct documents share no mutable state.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::chunker;
use crate::config::Config;
use crate::embedding::OpenAiEmbedder;
use crate::error::{Error, Result};
use crate::generate::AnswerGenerator;
use crate::guard::GuardClassifier;
use crate::index::VectorIndex;
use crate::lexical::{LexicalIndex, MatchMode};
use crate::llm::OpenAiChat;
use crate::loader::{loader_for, DocumentLoader};
use crate::models::{Answer, Capabilities, ChatTurn, Chunk, Document, Role};
use crate::store::memory::InMemoryStore;
use crate::store::sqlite::SqliteStore;
use crate::store::VectorStore;

/// Fixed answer returned when the guard disallows a query.
pub const REFUSAL_ANSWER: &str =
    "I can't help with that. Ask me a question about the document instead.";

/// What `ingest` produced. Cached on the session so repeat calls are no-ops.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub document_id: String,
    pub page_count: usize,
    pub chunk_count: usize,
    /// Chunks added to the vector index (0 when semantic search is disabled).
    pub indexed: usize,
}

pub struct RagSession {
    config: Config,
    loader: Arc<dyn DocumentLoader>,
    lexical: LexicalIndex,
    index: Option<VectorIndex>,
    guard: Option<GuardClassifier>,
    generator: Option<AnswerGenerator>,
    capabilities: Capabilities,
    document: Option<Document>,
    summary: Option<IngestSummary>,
    history: Vec<ChatTurn>,
}

impl RagSession {
    /// Compose a session from already-wired collaborators. Capabilities are
    /// computed here, once: semantic search needs a vector index, chat needs
    /// guard and generator on top of it.
    pub fn new(
        config: Config,
        loader: Arc<dyn DocumentLoader>,
        index: Option<VectorIndex>,
        guard: Option<GuardClassifier>,
        generator: Option<AnswerGenerator>,
    ) -> Self {
        let capabilities = Capabilities {
            textual_search: true,
            semantic_search: index.is_some(),
            chat: index.is_some() && guard.is_some() && generator.is_some(),
        };
        Self {
            config,
            loader,
            lexical: LexicalIndex::new(),
            index,
            guard,
            generator,
            capabilities,
            document: None,
            summary: None,
            history: Vec::new(),
        }
    }

    /// Wire a session against the real backends described by `config`.
    pub async fn from_config(config: Config) -> Result<Self> {
        crate::config::validate(&config)?;

        let loader = loader_for(&config.document.path);

        let index = match &config.models.embedding {
            Some(model) => {
                let embedder = Arc::new(OpenAiEmbedder::new(&config.api, model)?);
                let store: Arc<dyn VectorStore> = match config.store.backend.as_str() {
                    "sqlite" => {
                        let path = config.store.path.as_ref().ok_or_else(|| {
                            Error::InvalidConfig("store.path required for sqlite".to_string())
                        })?;
                        Arc::new(SqliteStore::open(path, &config.store.collection).await?)
                    }
                    _ => Arc::new(InMemoryStore::new()),
                };
                Some(VectorIndex::new(store, embedder))
            }
            None => None,
        };

        let (guard, generator) = match (&config.models.chat, &config.models.guard) {
            (Some(chat_model), Some(guard_model)) => {
                let chat: Arc<dyn crate::llm::ChatModel> = Arc::new(OpenAiChat::new(&config.api)?);
                (
                    Some(GuardClassifier::new(chat.clone(), guard_model.clone())),
                    Some(AnswerGenerator::new(chat, chat_model.clone())),
                )
            }
            _ => (None, None),
        };

        Ok(Self::new(config, loader, index, guard, generator))
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Ingested chunks in ingestion order, for the presentation layer's
    /// table view. Empty before `ingest`.
    pub fn chunks(&self) -> &[Chunk] {
        self.lexical.chunks()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Load, chunk, and index the configured document. Idempotent: a second
    /// call returns the cached summary without re-ingesting. Any failure
    /// (load, config, embedding) aborts the whole ingest — the session stays
    /// in `Created` with no partial state.
    pub async fn ingest(&mut self) -> Result<IngestSummary> {
        if let Some(summary) = &self.summary {
            return Ok(summary.clone());
        }

        let path = self.config.document.path.clone();
        let pages = self.loader.load(&path)?;
        let document_id = document_id_for(&path);

        let chunks = chunker::split_pages(
            &document_id,
            &pages,
            self.config.chunking.max_chunk_size,
            self.config.chunking.overlap_size,
        )?;

        // Vector indexing happens before the session mutates anything, so a
        // failed embedding call leaves no partial session behind.
        let indexed = match &self.index {
            Some(index) => {
                index.add(&chunks).await?;
                chunks.len()
            }
            None => 0,
        };

        tracing::info!(
            document = %document_id,
            pages = pages.len(),
            chunks = chunks.len(),
            indexed,
            "document ingested"
        );

        let summary = IngestSummary {
            document_id: document_id.clone(),
            page_count: pages.len(),
            chunk_count: chunks.len(),
            indexed,
        };
        self.lexical.extend(chunks);
        self.document = Some(Document {
            id: document_id,
            source_path: path,
            pages,
        });
        self.summary = Some(summary.clone());
        Ok(summary)
    }

    /// Answer a question about the document.
    ///
    /// The guard runs first; a disallowed query short-circuits to the fixed
    /// refusal with empty context — neither the vector index nor the
    /// generator is called. Per-query generation failures surface as errors
    /// for the presentation layer; guard failures never do (fail-closed).
    pub async fn ask(&mut self, query: &str) -> Result<Answer> {
        if self.summary.is_none() {
            return Err(Error::NotIngested);
        }
        if query.trim().is_empty() {
            return Err(Error::InvalidQuery("empty question".to_string()));
        }
        let (index, guard, generator) = match (&self.index, &self.guard, &self.generator) {
            (Some(i), Some(g), Some(a)) => (i, g, a),
            _ => {
                return Err(Error::InvalidConfig(
                    "chat requires embedding, guard, and chat models".to_string(),
                ))
            }
        };

        let verdict = guard.check(query).await;
        if !verdict.allowed {
            tracing::info!("query refused by guard");
            let answer = Answer {
                text: REFUSAL_ANSWER.to_string(),
                context: Vec::new(),
            };
            self.record_turn(query, &answer);
            return Ok(answer);
        }

        let context = index.search(query, self.config.retrieval.top_k).await?;
        let text = generator.generate(query, &context).await?;

        let answer = Answer { text, context };
        self.record_turn(query, &answer);
        Ok(answer)
    }

    /// Lexical search over the ingested chunks. Does not touch session
    /// history and needs no backends.
    pub fn textual_search(&self, pattern: &str, mode: MatchMode) -> Result<Vec<Chunk>> {
        self.lexical.search(pattern, mode)
    }

    fn record_turn(&mut self, query: &str, answer: &Answer) {
        let now = Utc::now();
        self.history.push(ChatTurn {
            role: Role::User,
            text: query.to_string(),
            retrieved: Vec::new(),
            at: now,
        });
        self.history.push(ChatTurn {
            role: Role::Assistant,
            text: answer.text.clone(),
            retrieved: answer.context.clone(),
            at: now,
        });
    }
}

/// Stable document id derived from the file name, so chunk ids (and with
/// them, persisted vector entries) survive restarts.
fn document_id_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_lowercase()
        .replace(char::is_whitespace, "_")
}
