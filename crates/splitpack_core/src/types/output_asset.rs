use serde::Serialize;

/// Contents of one file slated for emission
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct OutputAsset {
  pub contents: Vec<u8>,
}

impl OutputAsset {
  pub fn size(&self) -> usize {
    self.contents.len()
  }
}

impl From<String> for OutputAsset {
  fn from(contents: String) -> Self {
    OutputAsset {
      contents: contents.into_bytes(),
    }
  }
}

impl From<&str> for OutputAsset {
  fn from(contents: &str) -> Self {
    OutputAsset::from(contents.to_string())
  }
}

impl From<Vec<u8>> for OutputAsset {
  fn from(contents: Vec<u8>) -> Self {
    OutputAsset { contents }
  }
}
