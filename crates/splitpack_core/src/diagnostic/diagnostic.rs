use std::fmt::Display;
use std::fmt::Formatter;

use derive_builder::Builder;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::CodeFrame;
use super::ErrorKind;

/// This is a user facing error for splitpack.
///
/// Usually but not always this is linked to a config file location.
#[derive(Builder, Clone, Debug, Default, Deserialize, Error, PartialEq, Serialize)]
#[builder(default)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
  /// A summary user-facing message
  #[builder(setter(into))]
  pub message: String,

  /// Broad category of the error
  pub kind: ErrorKind,

  /// Indicates where this diagnostic was emitted from, usually a plugin name
  #[builder(setter(into, strip_option))]
  pub origin: Option<String>,

  /// A list of files with source-code highlights
  #[builder(setter(strip_option))]
  pub code_frames: Option<Vec<CodeFrame>>,

  /// Hints for the user
  #[builder(setter(strip_option))]
  pub hints: Option<Vec<String>>,
}

impl Display for Diagnostic {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.message)
  }
}
