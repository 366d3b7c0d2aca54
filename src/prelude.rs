//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and functions from
//! pegworks. Importing it with a wildcard brings everything needed to write
//! and run a grammar into scope:
//!
//! ```
//! use pegworks::prelude::*;
//! ```
//!
//! # Re-exported Items
//!
//! ## Grammar Construction
//! - [`GrammarDefinition`] - Trait implemented by client grammars
//! - [`GrammarBuilder`] - Handle passed to a definition
//! - [`ParsingDomain`] - Registry that constructs and links grammars
//! - [`Rule`] - Named parser with attributes and handlers
//!
//! ## Parser DSL
//! - [`chr()`], [`string()`], [`char_set()`], [`class()`], [`range()`],
//!   [`any_char()`], [`empty()`] - Primitive matchers
//! - [`keyword()`], [`keyword_list()`], [`identifier()`] - Word matchers
//! - [`nonterminal()`], [`nonterminal_as()`], [`nonterminal_with_args()`] - Rule calls
//! - [`seq()`], [`choice()`] - N-ary sequence and choice
//!
//! ## Semantic Actions
//! - [`ActionScope`] - Matched text and the rule's context inside a handler
//! - [`Context`] - Rule activation storage
//! - [`Value`] - Dynamic value type
//!
//! ## Errors
//! - [`ParseError`], [`ConstructionError`], [`ActionError`]

// ============================================================================
// Grammar Construction
// ============================================================================

pub use crate::engine::{
    Grammar, GrammarBuilder, GrammarDefinition, GrammarId, GrammarRef, ParseOptions,
    ParserConfig, ParsingDomain, Rule, RuleId,
};

// ============================================================================
// Parser DSL
// ============================================================================

pub use crate::engine::parser_dsl::{
    any_char, char_set, choice, chr, class, empty, identifier, keyword, keyword_list,
    keyword_list_with, keyword_with, nonterminal, nonterminal_as, nonterminal_with_args,
    not_char_set, range, seq, string,
};
pub use crate::engine::{Argument, CharClass, Parser};

// ============================================================================
// Semantic Actions
// ============================================================================

pub use crate::engine::{ActionScope, Context, FromValue, ObjectStack, ParsingData, Value};

// ============================================================================
// Errors and Diagnostics
// ============================================================================

pub use crate::engine::{
    ActionError, ConstructionError, Error, GrammarAnalyzer, GrammarPrinter, GrammarWarning,
    ParseError, ParseErrorKind, ParseTrace, Span, TraceAction, WarningKind,
};
