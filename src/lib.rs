//! # docchat
//!
//! Chat with a single document from the terminal.
//!
//! docchat ingests one document (PDF or plain text), splits it into
//! overlapping page-scoped chunks, and answers questions about it with
//! retrieval-augmented generation: chunks are embedded via an
//! OpenAI-compatible API, the closest ones to a question are retrieved by
//! cosine similarity, and a chat model generates an answer grounded in them.
//! A fail-closed safety classifier screens every question first.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────────┐
//! │  Loader  │──▶│   Chunker     │──▶│  LexicalIndex     │
//! │ PDF/text │   │ page windows │   │  (substring/regex) │
//! └──────────┘   └──────┬───────┘   └───────────────────┘
//!                       │
//!                       ▼
//!              ┌────────────────┐   ┌──────────────────┐
//!              │  VectorIndex   │──▶│ memory / SQLite   │
//!              │ embed + cosine │   │   VectorStore     │
//!              └───────┬────────┘   └──────────────────┘
//!                      │
//!         guard ──▶ retrieve ──▶ generate
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`loader`] | PDF and plain-text page extraction |
//! | [`chunker`] | Page-scoped overlapping chunking |
//! | [`lexical`] | Case-insensitive substring and regex search |
//! | [`embedding`] | OpenAI-compatible embedding client |
//! | [`store`] | Vector stores (in-memory, SQLite) |
//! | [`index`] | Semantic retrieval over a vector store |
//! | [`llm`] | Chat-completion transport |
//! | [`guard`] | Fail-closed input safety classifier |
//! | [`generate`] | Context-grounded answer generation |
//! | [`session`] | Session orchestrating ingest, search, and chat |

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod guard;
pub mod index;
pub mod lexical;
pub mod llm;
pub mod loader;
pub mod models;
pub mod session;
pub mod store;

pub use error::{Error, Result};
