use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::CodeHighlight;

/// A file on disk along with the contents it had when the diagnostic was raised
#[derive(Clone, Debug, Default, PartialEq)]
pub struct File {
  pub contents: String,
  pub path: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFrame {
  /// Source-code of the file at the time of error
  pub code: Option<String>,

  /// Path to the source file if applicable
  pub file_path: Option<PathBuf>,

  /// List of source-code highlight messages
  pub code_highlights: Vec<CodeHighlight>,
}

impl From<File> for CodeFrame {
  fn from(file: File) -> Self {
    CodeFrame {
      code: Some(file.contents),
      code_highlights: Vec::new(),
      file_path: Some(file.path),
    }
  }
}

impl From<PathBuf> for CodeFrame {
  fn from(path: PathBuf) -> Self {
    CodeFrame {
      code: None,
      code_highlights: Vec::new(),
      file_path: Some(path),
    }
  }
}
