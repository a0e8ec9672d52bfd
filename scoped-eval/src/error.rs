use crate::runtime::value::Value;
use scoped_parse::error::SyntaxError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScopedEvalError {
  #[error("Code to be evaluated must be a string, but received {typ}: {rendered}")]
  InputType { typ: &'static str, rendered: String },

  #[error("{0}")]
  Syntax(#[from] SyntaxError),

  /// `import(...)` anywhere in the program. Line is 1-based, column 0-based.
  #[error("[{line}:{column}]: Dynamic import is not allowed")]
  DynamicImportRejected { line: usize, column: usize },

  #[error("cannot find }} in interpolation: {0}")]
  InterpolationMalformed(String),

  #[error("I gave up :( You exhausted variable names a,b,...z, aa,ab,...zz, $ and _ in one expression.")]
  NameAllocationExhausted,

  #[error("{0}")]
  AssignmentRejected(String),

  /// An exception thrown by the script and never caught.
  #[error("Uncaught {}", .0.describe())]
  Throw(Value),

  #[error("step limit of {0} exceeded")]
  StepLimitExceeded(u64),

  #[error("unsupported: {0}")]
  Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, ScopedEvalError>;
