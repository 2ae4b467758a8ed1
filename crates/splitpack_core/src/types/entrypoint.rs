use serde::Serialize;

use super::ChunkId;

/// One program entry and the ordered list of chunks it loads
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrypoint {
  pub name: String,
  pub(crate) chunks: Vec<ChunkId>,
}

impl Entrypoint {
  pub fn new(name: impl Into<String>) -> Self {
    Entrypoint {
      name: name.into(),
      chunks: Vec::new(),
    }
  }

  pub fn chunks(&self) -> &[ChunkId] {
    &self.chunks
  }

  pub fn has_chunk(&self, chunk_id: ChunkId) -> bool {
    self.chunks.contains(&chunk_id)
  }
}
