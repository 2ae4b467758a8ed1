use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
  #[default]
  Unknown,
  NotFound,
  ParseError,
  InvalidConfig,
  InconsistentGraph,
}
