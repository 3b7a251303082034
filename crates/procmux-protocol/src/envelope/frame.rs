//! Stack frames carried by exception envelopes.

use serde::{Deserialize, Serialize};

use super::summary::{ArgSummary, Summarize};

/// One call-stack frame of a captured failure.
///
/// Arguments are stored only as [`ArgSummary`] tags.
///
/// # Example
///
/// ```
/// use procmux_protocol::{ArgSummary, StackFrame};
///
/// let frame = StackFrame::new("resize")
///     .with_class("Image")
///     .at("src/image.rs", 42)
///     .with_args(&[&640_u32, &"bilinear", &vec![1, 2]]);
///
/// assert_eq!(
///     frame.args(),
///     &[
///         ArgSummary::primitive("integer"),
///         ArgSummary::primitive("string"),
///         ArgSummary::Array,
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(default)]
    args: Vec<ArgSummary>,
}

impl StackFrame {
    /// Creates a frame for the named function with no location.
    #[must_use]
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            class: None,
            file: None,
            line: None,
            args: Vec::new(),
        }
    }

    /// Attaches the enclosing type of the function.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Attaches a source location.
    #[must_use]
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Records the arguments of the call, keeping only their summaries.
    #[must_use]
    pub fn with_args(mut self, args: &[&dyn Summarize]) -> Self {
        self.args = args.iter().map(|arg| arg.summarize()).collect();
        self
    }

    /// Returns a copy of the frame with every argument summarised again.
    ///
    /// Summaries summarise to themselves, so this is idempotent.
    #[must_use]
    pub fn resummarized(&self) -> Self {
        Self {
            args: self.args.iter().map(Summarize::summarize).collect(),
            ..self.clone()
        }
    }

    /// Returns the function name.
    #[must_use]
    pub const fn function(&self) -> &str {
        self.function.as_str()
    }

    /// Returns the enclosing type, if known.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Returns the source file, if known.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Returns the source line, if known.
    #[must_use]
    pub const fn line(&self) -> Option<u32> {
        self.line
    }

    /// Returns the argument summaries.
    #[must_use]
    pub fn args(&self) -> &[ArgSummary] {
        &self.args
    }
}
