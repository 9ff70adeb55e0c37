//! Answer generation conditioned on retrieved context.
//!
//! Builds a single prompt with every context chunk between fixed delimiter
//! markers, followed by the user question, and sends it with a fixed system
//! instruction. Retry on transient failure is bounded and lives in the
//! underlying [`ChatModel`] transport (the call is read-only, so retrying is
//! safe).

use std::sync::Arc;

use crate::error::Result;
use crate::llm::ChatModel;
use crate::models::Chunk;

pub const BEGIN_CONTEXT: &str = "--- BEGIN CONTEXT ---";
pub const END_CONTEXT: &str = "--- END CONTEXT ---";

/// Fixed system instruction constraining tone and length.
pub const ANSWER_INSTRUCTION: &str = "You are an assistant for \
question-answering tasks. Use the pieces of retrieved context between the \
BEGIN CONTEXT and END CONTEXT markers to answer the question. If the context \
doesn't provide the answer, say that you don't know. Keep the tone used in \
the context, use three sentences maximum and keep the answer concise.";

pub struct AnswerGenerator {
    chat: Arc<dyn ChatModel>,
    model: String,
    instruction: String,
}

impl AnswerGenerator {
    pub fn new(chat: Arc<dyn ChatModel>, model: impl Into<String>) -> Self {
        Self {
            chat,
            model: model.into(),
            instruction: ANSWER_INSTRUCTION.to_string(),
        }
    }

    /// Generate an answer for `query` conditioned on `context`. Fails with
    /// [`Error::GenerationUnavailable`](crate::error::Error::GenerationUnavailable)
    /// or [`Error::RateLimited`](crate::error::Error::RateLimited); the
    /// caller decides fallback behavior.
    pub async fn generate(&self, query: &str, context: &[Chunk]) -> Result<String> {
        let prompt = build_prompt(query, context);
        self.chat.complete(&self.model, &self.instruction, &prompt).await
    }
}

/// Concatenate context chunk texts between the fixed delimiters, then append
/// the question.
pub fn build_prompt(query: &str, context: &[Chunk]) -> String {
    let mut out = String::with_capacity(
        context.iter().map(|c| c.text.len() + 1).sum::<usize>() + query.len() + 64,
    );
    out.push_str(BEGIN_CONTEXT);
    out.push('\n');
    for chunk in context {
        out.push_str(&chunk.text);
        out.push('\n');
    }
    out.push_str(END_CONTEXT);
    out.push_str("\n\n");
    out.push_str(query);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            page_number: 0,
            offset_in_page: 0,
            text: text.to_string(),
        }
    }

    #[test]
    fn prompt_wraps_context_between_markers() {
        let context = vec![chunk("c1", "alpha"), chunk("c2", "beta")];
        let prompt = build_prompt("how do I reboot", &context);

        let begin = prompt.find(BEGIN_CONTEXT).unwrap();
        let end = prompt.find(END_CONTEXT).unwrap();
        assert!(begin < end);

        let inner = &prompt[begin + BEGIN_CONTEXT.len()..end];
        assert!(inner.contains("alpha"));
        assert!(inner.contains("beta"));
        assert!(prompt.ends_with("how do I reboot"));
    }

    #[test]
    fn empty_context_still_well_formed() {
        let prompt = build_prompt("anything", &[]);
        assert!(prompt.starts_with(BEGIN_CONTEXT));
        assert!(prompt.contains(END_CONTEXT));
        assert!(prompt.ends_with("anything"));
    }

    #[test]
    fn context_appears_in_retrieval_order() {
        let context = vec![chunk("c1", "first"), chunk("c2", "second"), chunk("c3", "third")];
        let prompt = build_prompt("q", &context);
        let a = prompt.find("first").unwrap();
        let b = prompt.find("second").unwrap();
        let c = prompt.find("third").unwrap();
        assert!(a < b && b < c);
    }
}
