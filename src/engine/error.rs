//! Error types
//!
//! Three families, never conflated:
//!
//! - [`ParseError`]: a committed parse failure. Soft failures (a combinator
//!   not matching) are `Ok(Match)` with `hit == false`, never errors.
//! - [`ConstructionError`]: a grammar could not be built or linked.
//! - [`ActionError`]: raised by semantic handlers and value conversions;
//!   the engine turns it into a [`ParseErrorKind::Action`].
//!
//! [`Error`] wraps the first two for callers that want a single type.
//!
//! # Example Output
//!
//! ```text
//! calc.txt:1:5: expected term
//! 1 + * 2
//!     ^
//! ```

use super::source_location::{line_at_offset, SourcePosition, Span};

/// What went wrong in a committed parse failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    /// An expectation failed, or the start rule did not consume the input
    #[error("expected {expected}")]
    Expected {
        /// Description of the parser that failed to match
        expected: String,
    },
    /// The grammar has no start rule
    #[error("grammar '{grammar}' has no start rule")]
    NoStartRule {
        /// Qualified grammar name
        grammar: String,
    },
    /// The start rule got a different number of arguments than it declares
    #[error("start rule '{rule}' declares {expected} inherited attributes, {given} arguments given")]
    ArgumentCount {
        /// Start rule name
        rule: String,
        /// Declared inherited attributes
        expected: usize,
        /// Arguments passed to the parse
        given: usize,
    },
    /// A semantic handler failed
    #[error("{message}")]
    Action {
        /// Handler error text
        message: String,
    },
    /// Input exceeds the configured maximum size
    #[error("input size {input_size} exceeds maximum {max_size}")]
    InputTooLarge {
        /// Input size in code points
        input_size: usize,
        /// Configured limit
        max_size: usize,
    },
    /// Rule nesting exceeds the configured maximum depth
    #[error("rule recursion depth exceeds maximum {max_depth}")]
    RecursionLimitExceeded {
        /// Configured limit
        max_depth: usize,
    },
    /// Engine invariant violated
    #[error("internal error: {message}")]
    Internal {
        /// Description
        message: String,
    },
}

/// A committed parse failure with its source location
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}:{}:{}: {}", .file_name, .span.line, .column, .kind)]
pub struct ParseError {
    /// What went wrong
    pub kind: ParseErrorKind,
    /// File name passed to the parse entry
    pub file_name: String,
    /// Where it went wrong
    pub span: Span,
    /// Column of the span start (1-based, in code points)
    pub column: usize,
    /// Text of the line containing the span start
    pub line_text: String,
}

impl ParseError {
    /// Create an error located in `input`
    pub fn new(kind: ParseErrorKind, file_name: &str, span: Span, input: &[char]) -> Self {
        let position = SourcePosition::from_offset(input, span.start);
        Self {
            kind,
            file_name: file_name.to_string(),
            span: Span {
                line: position.line,
                ..span
            },
            column: position.column,
            line_text: line_at_offset(input, span.start),
        }
    }

    /// Create an error raised before scanning started
    pub fn detached(kind: ParseErrorKind, file_name: &str) -> Self {
        Self {
            kind,
            file_name: file_name.to_string(),
            span: Span::default(),
            column: 1,
            line_text: String::new(),
        }
    }

    /// Offset, line and column of the span start
    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(self.span.start, self.span.line, self.column)
    }

    /// Check if this is an expectation failure
    pub fn is_expected(&self) -> bool {
        matches!(self.kind, ParseErrorKind::Expected { .. })
    }

    /// Format the error followed by the failing line and a caret under the column
    pub fn format_with_source(&self) -> String {
        let mut output = format!("{self}\n");
        output.push_str(&self.line_text);
        output.push('\n');
        for _ in 0..self.column.saturating_sub(1) {
            output.push(' ');
        }
        output.push('^');
        output
    }
}

/// Error raised while building or linking grammars
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    /// A grammar with this qualified name is already registered
    #[error("grammar '{name}' already exists in the parsing domain")]
    DuplicateGrammar {
        /// Qualified grammar name
        name: String,
    },
    /// A rule or rule link name is used twice in one grammar
    #[error("rule '{rule}' already defined in grammar '{grammar}'")]
    DuplicateRule {
        /// Qualified grammar name
        grammar: String,
        /// Rule name
        rule: String,
    },
    /// A nonterminal, start or skip rule name did not resolve
    #[error("rule '{name}' referenced from '{rule}' in grammar '{grammar}' not found")]
    UnresolvedRule {
        /// Qualified grammar name
        grammar: String,
        /// Referencing rule (or `<start>` / `<skip>`)
        rule: String,
        /// Name that failed to resolve
        name: String,
    },
    /// A rule link target did not resolve
    #[error("rule link '{alias}' in grammar '{grammar}': target '{target}' not found")]
    UnresolvedRuleLink {
        /// Qualified grammar name
        grammar: String,
        /// Link alias
        alias: String,
        /// Qualified target name
        target: String,
    },
    /// A handler is bound to an action name that no action parser carries
    #[error("rule '{rule}' has no action named '{action}'")]
    UnknownAction {
        /// Rule full name
        rule: String,
        /// Action name
        action: String,
    },
    /// A hook is bound to a nonterminal instance name that does not exist
    #[error("rule '{rule}' has no nonterminal named '{nonterminal}'")]
    UnknownNonterminal {
        /// Rule full name
        rule: String,
        /// Nonterminal instance name
        nonterminal: String,
    },
    /// A nonterminal passes a different number of arguments than its target declares
    #[error(
        "nonterminal '{nonterminal}' in rule '{rule}' passes {given} arguments, '{target}' declares {expected}"
    )]
    ArgumentCount {
        /// Calling rule full name
        rule: String,
        /// Nonterminal instance name
        nonterminal: String,
        /// Target rule full name
        target: String,
        /// Inherited attributes declared by the target
        expected: usize,
        /// Arguments passed
        given: usize,
    },
    /// A referenced grammar name is not registered
    #[error("grammar '{name}' not found")]
    UnknownGrammar {
        /// Grammar name as referenced
        name: String,
    },
}

/// Error raised by semantic handlers and value conversions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// A value had the wrong variant
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type name
        expected: &'static str,
        /// Actual variant name
        found: &'static str,
    },
    /// Pop from an empty value stack
    #[error("value stack is empty")]
    EmptyStack,
    /// No argument, local or `from` slot with this name
    #[error("no variable named '{0}' in the active context")]
    UnknownVariable(String),
    /// The owning rule has no active context
    #[error("rule '{0}' has no active context")]
    NoContext(String),
    /// Handler-defined failure
    #[error("{0}")]
    Message(String),
}

impl ActionError {
    /// Create a handler-defined failure
    pub fn msg(message: impl Into<String>) -> Self {
        ActionError::Message(message.into())
    }
}

/// Any error produced by this crate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Committed parse failure
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Grammar construction failure
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}
