//! PEG engine
//!
//! # Module Organization
//!
//! ## Core Types
//! - [`Parser`] - Combinator tree node
//! - [`Rule`] - Named parser with an attribute contract
//! - [`Grammar`] - Named set of rules and rule links
//! - [`ParsingDomain`] - Registry that constructs and links grammars
//! - [`Scanner`] - Position, skip rule and trace for one parse
//!
//! ## Attribute Protocol
//! - [`Value`] - Dynamic value passed between rules
//! - [`ObjectStack`] - Argument and result stack
//! - [`Context`] / [`ParsingData`] - Per-activation storage
//!
//! ## Parser DSL
//! - [`parser_dsl`] - Constructors and operators
//!
//! ## Diagnostics
//! - [`error`] - Parse, construction and action errors
//! - [`debug`] - Parse traces, grammar printer, rule diagrams
//! - [`grammar_analysis`] - Left recursion and unused rule warnings

// ============================================================================
// Module Declarations
// ============================================================================

pub mod char_class;
pub mod context;
pub mod debug;
pub mod domain;
pub mod error;
pub mod grammar;
pub mod grammar_analysis;
pub mod object;
pub mod parser;
pub mod parser_dsl;
pub mod rule;
pub mod scanner;
pub mod source_location;

// ============================================================================
// Core Types
// ============================================================================

pub use domain::{GrammarId, ParsingDomain, ScopeId};
pub use grammar::{
    Grammar, GrammarBuilder, GrammarDefinition, GrammarRef, ParseOptions, RuleLink,
};
pub use parser::{
    ActionParser, Argument, KeywordListParser, KeywordParser, Match, NonterminalParser, Parser,
    ParserConfig, RuleRef, DEFAULT_MAX_INPUT_SIZE, DEFAULT_MAX_RECURSION_DEPTH,
};
pub use rule::{
    ActionHandlers, ActionScope, AttrDecl, FailureAction, NonterminalHooks, PostCall, PreCall,
    Rule, RuleId, SuccessAction,
};
pub use scanner::Scanner;

// ============================================================================
// Attribute Protocol
// ============================================================================

pub use context::{Context, ObjectStack, ParsingData};
pub use object::{FromValue, Value};

// ============================================================================
// Characters and Positions
// ============================================================================

pub use char_class::{CharClass, CharSet};
pub use source_location::{offset_to_line_col, SourcePosition, Span};

// ============================================================================
// Diagnostics
// ============================================================================

pub use debug::{GrammarPrinter, GrammarVisualizer, ParseTrace, TraceAction, TraceEntry};
pub use error::{ActionError, ConstructionError, Error, ParseError, ParseErrorKind};
pub use grammar_analysis::{GrammarAnalyzer, GrammarWarning, WarningKind};
