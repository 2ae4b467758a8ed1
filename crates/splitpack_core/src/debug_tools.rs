//! Debug tools for splitpack developers
//!
//! To enable a tool, set the `SPLITPACK_DEBUG_TOOLS` environment variable to a
//! comma-separated list of tool names. For example:
//! `SPLITPACK_DEBUG_TOOLS="chunk-graph-dot,chunk-stats"`
//!
//! You can enable all tools by setting `SPLITPACK_DEBUG_TOOLS=all`.

use std::collections::HashMap;

use petgraph::dot::Dot;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::Serialize;

use crate::compilation::Compilation;
use crate::types::{ChunkId, ModuleId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugTools {
  pub chunk_graph_dot: bool,
  pub chunk_stats: bool,
}

impl DebugTools {
  pub fn from_env() -> Self {
    std::env::var("SPLITPACK_DEBUG_TOOLS")
      .map(|value| Self::parse(&value))
      .unwrap_or_default()
  }

  pub fn parse(value: &str) -> Self {
    let mut tools = Self::default();

    for tool in value.split(',') {
      match tool.trim() {
        "all" => {
          tools.chunk_graph_dot = true;
          tools.chunk_stats = true;
          break;
        }
        "chunk-graph-dot" => tools.chunk_graph_dot = true,
        "chunk-stats" => tools.chunk_stats = true,
        "" => continue,
        unknown => {
          tracing::warn!(
            "Unknown debug tool option: '{}'. Valid options are: chunk-graph-dot, chunk-stats, all",
            unknown
          );
        }
      }
    }

    tools
  }

  pub fn any(&self) -> bool {
    self.chunk_graph_dot || self.chunk_stats
  }
}

#[derive(Clone, Debug, PartialEq)]
enum ChunkGraphNode {
  Entrypoint(String),
  Chunk(String),
  Module(String),
}

impl std::fmt::Display for ChunkGraphNode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ChunkGraphNode::Entrypoint(name) => write!(f, "entry: {name}"),
      ChunkGraphNode::Chunk(name) => write!(f, "chunk: {name}"),
      ChunkGraphNode::Module(identifier) => write!(f, "{identifier}"),
    }
  }
}

/// Renders entrypoints, chunks and modules as a Graphviz digraph
pub fn chunk_graph_dot(compilation: &Compilation) -> String {
  let mut graph = StableDiGraph::<ChunkGraphNode, &'static str>::new();
  let mut chunk_nodes: HashMap<ChunkId, NodeIndex> = HashMap::new();
  let mut module_nodes: HashMap<ModuleId, NodeIndex> = HashMap::new();

  for chunk in compilation.chunks() {
    let chunk_node = graph.add_node(ChunkGraphNode::Chunk(chunk.name.clone()));
    chunk_nodes.insert(chunk.id, chunk_node);

    for module_id in chunk.modules() {
      let Some(module) = compilation.module(module_id) else {
        continue;
      };

      let module_node = *module_nodes
        .entry(module_id)
        .or_insert_with(|| graph.add_node(ChunkGraphNode::Module(module.identifier.clone())));
      graph.add_edge(chunk_node, module_node, "contains");
    }
  }

  for entrypoint in compilation.entrypoints() {
    let entry_node = graph.add_node(ChunkGraphNode::Entrypoint(entrypoint.name.clone()));
    for chunk_id in entrypoint.chunks() {
      if let Some(chunk_node) = chunk_nodes.get(chunk_id) {
        graph.add_edge(entry_node, *chunk_node, "loads");
      }
    }
  }

  format!("{}", Dot::new(&graph))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkStats {
  pub name: String,
  pub chunk_reason: Option<String>,
  pub modules: usize,
  pub files: Vec<String>,
  pub entrypoints: Vec<String>,
}

/// Summary of the chunk list, serialised into the `chunk-stats.json` report
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkGraphStats {
  pub chunks: Vec<ChunkStats>,
  pub assets: Vec<String>,
}

impl ChunkGraphStats {
  pub fn from_compilation(compilation: &Compilation) -> Self {
    ChunkGraphStats {
      chunks: compilation
        .chunks()
        .map(|chunk| ChunkStats {
          name: chunk.name.clone(),
          chunk_reason: chunk.chunk_reason.clone(),
          modules: chunk.number_of_modules(),
          files: chunk.files.clone(),
          entrypoints: chunk.groups().map(String::from).collect(),
        })
        .collect(),
      assets: compilation.assets().map(|(name, _)| name.to_string()).collect(),
    }
  }
}
