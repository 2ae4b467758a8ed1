use serde::Deserialize;
use serde::Serialize;

fn default_shared_chunk_name() -> String {
  String::from("vendors")
}

/// Settings for the pass that splits the shared vendors chunk per entry
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RemoveUnusedDependenciesConfig {
  /// Entries to re-partition. Every entry takes part when this is absent.
  #[serde(default)]
  pub target_entries: Option<Vec<String>>,

  #[serde(default = "default_shared_chunk_name")]
  pub shared_chunk_name: String,
}

impl Default for RemoveUnusedDependenciesConfig {
  fn default() -> Self {
    RemoveUnusedDependenciesConfig {
      target_entries: None,
      shared_chunk_name: default_shared_chunk_name(),
    }
  }
}

/// An HTML document and the chunks whose files it references
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManifestConfig {
  pub filename: String,
  #[serde(default)]
  pub chunks: Vec<String>,
}

/// Represents a fully resolved .splitpackrc
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SplitpackConfig {
  /// The plugin is disabled when this key is missing
  #[serde(default)]
  pub remove_unused_dependencies: Option<RemoveUnusedDependenciesConfig>,
  #[serde(default)]
  pub manifests: Vec<ManifestConfig>,
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn empty_object_disables_everything() {
    let config: SplitpackConfig = serde_json5::from_str("{}").unwrap();

    assert_eq!(config, SplitpackConfig::default());
  }

  #[test]
  fn shared_chunk_name_defaults_to_vendors() {
    let config: SplitpackConfig =
      serde_json5::from_str("{ removeUnusedDependencies: { targetEntries: ['a'] } }").unwrap();

    assert_eq!(
      config.remove_unused_dependencies,
      Some(RemoveUnusedDependenciesConfig {
        target_entries: Some(vec![String::from("a")]),
        shared_chunk_name: String::from("vendors"),
      })
    );
  }
}
