//! Embedding plus vector search behind the [`Retriever`] contract.

use newsrag_core::{passage::Passage, provider::Retriever};

use crate::{JinaEmbedder, QdrantIndex, error::RetrievalError};

#[derive(Clone)]
pub struct VectorRetriever {
  embedder: JinaEmbedder,
  index:    QdrantIndex,
}

impl VectorRetriever {
  pub fn new(embedder: JinaEmbedder, index: QdrantIndex) -> Self {
    Self { embedder, index }
  }
}

impl Retriever for VectorRetriever {
  type Error = RetrievalError;

  async fn retrieve(
    &self,
    query: &str,
    k: usize,
  ) -> Result<Vec<Passage>, RetrievalError> {
    if k == 0 {
      return Ok(Vec::new());
    }
    let vector = self.embedder.embed(query).await?;
    let passages = self.index.search(&vector, k).await?;
    tracing::debug!(
      collection = self.index.collection(),
      requested = k,
      returned = passages.len(),
      "retrieved passages"
    );
    Ok(passages)
  }

  async fn document_count(&self) -> Result<u64, RetrievalError> {
    self.index.count().await
  }
}
