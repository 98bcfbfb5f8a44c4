//! Clients for the external services behind a chat turn.
//!
//! - [`VectorRetriever`] embeds a query with [`JinaEmbedder`] and searches a
//!   [`QdrantIndex`], implementing [`Retriever`].
//! - [`GeminiClient`] calls a Gemini model through [`RetryPolicy`],
//!   implementing [`Generator`].
//!
//! [`Retriever`]: newsrag_core::provider::Retriever
//! [`Generator`]: newsrag_core::provider::Generator

mod embedding;
mod gemini;
mod qdrant;
mod retriever;

pub mod error;
pub mod retry;

pub use embedding::JinaEmbedder;
pub use error::{GenerationError, RetrievalError};
pub use gemini::GeminiClient;
pub use qdrant::QdrantIndex;
pub use retriever::VectorRetriever;
pub use retry::{RetryError, RetryPolicy};

#[cfg(test)]
mod tests;
