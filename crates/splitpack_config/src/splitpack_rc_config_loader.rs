use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use serde_json5::Location;
use splitpack_core::diagnostic::CodeFrame;
use splitpack_core::diagnostic::CodeHighlight;
use splitpack_core::diagnostic::DiagnosticBuilder;
use splitpack_core::diagnostic::DiagnosticError;
use splitpack_core::diagnostic::ErrorKind;
use splitpack_core::diagnostic::File;
use splitpack_core::diagnostic_error;

use crate::splitpack_config::SplitpackConfig;

const ORIGIN: &str = "splitpack_config";

/// A parsed .splitpackrc along with the text it was parsed from
#[derive(Clone, Debug, PartialEq)]
pub struct SplitpackRcFile {
  pub contents: SplitpackConfig,
  pub path: PathBuf,
  pub raw: String,
}

impl From<&SplitpackRcFile> for File {
  fn from(file: &SplitpackRcFile) -> Self {
    File {
      contents: file.raw.clone(),
      path: file.path.clone(),
    }
  }
}

/// Loads and validates .splitpackrc config
#[derive(Debug, Default)]
pub struct SplitpackRcConfigLoader;

impl SplitpackRcConfigLoader {
  /// Reads and validates the config file at `path`
  #[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
  pub fn load(path: &Path) -> Result<SplitpackRcFile, DiagnosticError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
      diagnostic_error!(DiagnosticBuilder::default()
        .message(format!("Unable to read {}: {source}", path.display()))
        .kind(ErrorKind::NotFound)
        .origin(ORIGIN)
        .code_frames(vec![CodeFrame::from(path.to_path_buf())]))
    })?;

    Self::parse(path, raw)
  }

  /// Parses and validates config text that was read from `path`
  pub fn parse(path: &Path, raw: String) -> Result<SplitpackRcFile, DiagnosticError> {
    let contents = serde_json5::from_str(&raw).map_err(|error| {
      serde_to_diagnostic_error(
        error,
        File {
          contents: raw.clone(),
          path: path.to_path_buf(),
        },
      )
    })?;

    let file = SplitpackRcFile {
      contents,
      path: path.to_path_buf(),
      raw,
    };

    validate(&file)?;
    Ok(file)
  }
}

fn validate(file: &SplitpackRcFile) -> Result<(), DiagnosticError> {
  if let Some(options) = &file.contents.remove_unused_dependencies {
    if options.shared_chunk_name.trim().is_empty() {
      return Err(invalid_config(
        file,
        "sharedChunkName",
        "removeUnusedDependencies.sharedChunkName must not be empty",
      ));
    }

    let has_empty_target = options
      .target_entries
      .iter()
      .flatten()
      .any(|name| name.trim().is_empty());

    if has_empty_target {
      return Err(invalid_config(
        file,
        "targetEntries",
        "removeUnusedDependencies.targetEntries must not contain empty entry names",
      ));
    }
  }

  let mut filenames = HashSet::new();
  for manifest in &file.contents.manifests {
    if !filenames.insert(manifest.filename.as_str()) {
      return Err(invalid_config(
        file,
        &manifest.filename,
        &format!("Manifest {} is declared more than once", manifest.filename),
      ));
    }
  }

  Ok(())
}

/// Builds a diagnostic highlighting the last occurrence of `needle` in the config file
fn invalid_config(file: &SplitpackRcFile, needle: &str, message: &str) -> DiagnosticError {
  let mut code_frame = CodeFrame::from(File::from(file));
  if let Some([line, column]) = find_location(&file.raw, needle) {
    code_frame.code_highlights.push(CodeHighlight {
      message: Some(message.to_string()),
      ..CodeHighlight::from([line, column])
    });
  }

  diagnostic_error!(DiagnosticBuilder::default()
    .message(format!("Invalid config {}: {message}", file.path.display()))
    .kind(ErrorKind::InvalidConfig)
    .origin(ORIGIN)
    .code_frames(vec![code_frame]))
}

/// One-based line and column of the last occurrence of `needle`
fn find_location(raw: &str, needle: &str) -> Option<[usize; 2]> {
  if needle.is_empty() {
    return None;
  }

  let offset = raw.rfind(needle)?;
  let before = &raw[..offset];
  let line = before.matches('\n').count() + 1;
  let line_start = before.rfind('\n').map(|index| index + 1).unwrap_or(0);
  let column = before[line_start..].chars().count() + 1;

  Some([line, column])
}

fn serde_to_diagnostic_error(error: serde_json5::Error, file: File) -> DiagnosticError {
  let mut diagnostic_error = DiagnosticBuilder::default();
  diagnostic_error.message(format!("Failed to parse {}", file.path.display()));
  diagnostic_error.kind(ErrorKind::ParseError);
  diagnostic_error.origin(ORIGIN);

  match error {
    serde_json5::Error::Message { msg, location } => {
      let location = location.unwrap_or(Location { column: 1, line: 1 });

      diagnostic_error.code_frames(vec![CodeFrame {
        code_highlights: vec![CodeHighlight {
          message: Some(msg),
          ..CodeHighlight::from([location.line, location.column])
        }],
        ..CodeFrame::from(file)
      }]);
    }
  };

  diagnostic_error!(diagnostic_error)
}
