//! pegworks - Backtracking PEG Engine with Composable Grammars
//!
//! A scannerless parsing-expression-grammar engine. Grammars are trees of
//! combinators organized into named rules, rules into grammars, and grammars
//! into a [`ParsingDomain`](engine::ParsingDomain) that links rule references
//! across grammar boundaries. It provides:
//! - Primitive and composite combinators, including difference, exclusive-or
//!   and intersection
//! - Skip rules for trivia, suppressed inside token regions
//! - Lazy, memoized construction of cross-referencing grammars
//! - Inherited attributes and synthesized values passed between rule
//!   activations through a value stack and per-rule context stacks
//! - Parse traces, a grammar printer and left-recursion analysis
//!
//! ## Quick Start
//!
//! ```rust
//! use pegworks::prelude::*;
//!
//! struct Greeting;
//!
//! impl GrammarDefinition for Greeting {
//!     fn name(&self) -> &str {
//!         "Greeting"
//!     }
//!
//!     fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
//!         grammar.add_rule(Rule::new("greeting", keyword("hello") >> keyword("world")))?;
//!         grammar.add_rule(Rule::new("spaces", char_set(" \t\r\n").many1()))?;
//!         grammar.set_skip_rule_name("spaces");
//!         Ok(())
//!     }
//! }
//!
//! let mut domain = ParsingDomain::new();
//! domain.create(&Greeting).unwrap();
//! let grammar = domain.grammar("Greeting").unwrap();
//! assert!(grammar.parse("hello   world", 0, "greeting.txt", Vec::new()).is_ok());
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]
#![allow(clippy::redundant_closure)]

/// Logging macro - no-op when logging feature is disabled
#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// Logging macro - uses the log crate when logging feature is enabled
#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

// Prelude module for convenient imports
pub mod prelude;

// Engine core
pub mod engine;

/// Re-export commonly used types for convenience
pub use engine::{
    ActionError, ConstructionError, Context, Error, Grammar, GrammarBuilder, GrammarDefinition,
    GrammarRef, Match, ObjectStack, ParseError, ParseErrorKind, Parser, ParserConfig,
    ParsingData, ParsingDomain, Rule, RuleId, Scanner, Span, Value,
};
