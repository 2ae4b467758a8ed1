use std::fmt::Debug;
use std::sync::Arc;

use crate::types::Chunk;

/// Subscriber notified when an optimization pass attaches a chunk it created, or one it created
/// earlier for an identical module set, on behalf of one entrypoint.
///
/// Downstream emission steps use this to make sure every output that loads the entry also
/// loads the chunk.
pub trait ChunkCreatedListener: Debug + Send + Sync {
  fn on_chunk_created_for_entry(&self, entry_name: &str, chunk: &Chunk);
}

pub type ChunkCreatedListenerRef = Arc<dyn ChunkCreatedListener>;

#[derive(Clone, Debug, Default)]
pub struct CompilationHooks {
  chunk_created_for_entry: Vec<ChunkCreatedListenerRef>,
}

impl CompilationHooks {
  /// Subscribes a listener. Tapping the same listener twice keeps a single subscription.
  pub fn tap_chunk_created_for_entry(&mut self, listener: ChunkCreatedListenerRef) {
    let already_tapped = self
      .chunk_created_for_entry
      .iter()
      .any(|existing| std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&listener)));

    if !already_tapped {
      self.chunk_created_for_entry.push(listener);
    }
  }

  /// Notifies listeners in subscription order
  pub fn call_chunk_created_for_entry(&self, entry_name: &str, chunk: &Chunk) {
    for listener in &self.chunk_created_for_entry {
      listener.on_chunk_created_for_entry(entry_name, chunk);
    }
  }

  pub fn has_chunk_created_listeners(&self) -> bool {
    !self.chunk_created_for_entry.is_empty()
  }

  pub fn chunk_created_listener_count(&self) -> usize {
    self.chunk_created_for_entry.len()
  }
}
