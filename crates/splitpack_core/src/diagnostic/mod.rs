//! User facing errors for splitpack
mod code_frame;
mod code_highlight;
mod diagnostic;
mod error_kind;

pub use self::code_frame::*;
pub use self::code_highlight::*;
pub use self::diagnostic::*;
pub use self::error_kind::*;

/// Fallible operations that surface a [`Diagnostic`] use plain anyhow errors so they compose
/// with the rest of the pipeline. Use `downcast_ref::<Diagnostic>()` to recover the details.
pub type DiagnosticError = anyhow::Error;

/// Builds a [`DiagnosticError`] from either a format string or a [`DiagnosticBuilder`]
#[macro_export]
macro_rules! diagnostic_error {
  ($fmt:literal $(, $arg:expr)* $(,)?) => {
    ::anyhow::Error::new($crate::diagnostic::Diagnostic {
      message: format!($fmt $(, $arg)*),
      ..$crate::diagnostic::Diagnostic::default()
    })
  };
  ($builder:expr) => {
    match $builder.build() {
      Ok(diagnostic) => ::anyhow::Error::new(diagnostic),
      Err(error) => ::anyhow::anyhow!(error),
    }
  };
}
