//! PEG Parser
//!
//! This module implements the combinator tree and its matching semantics.
//! Every node matches through [`Parser::parse`], which returns:
//!
//! - `Ok(m)` with `m.hit() == true` on success, the scanner moved past the
//!   match,
//! - `Ok(m)` with `m.hit() == false` on soft failure, the scanner and the
//!   value stack exactly as they were on entry,
//! - `Err(ParseError)` on committed failure (a failed expectation, a handler
//!   error, a limit), which aborts the whole parse.
//!
//! The skip rule runs between the elements of sequences, lists and
//! repetitions, never before the first element and never inside a token.
//! Lengths count matched code points of the elements and exclude skipped
//! trivia, so set-like combinators compare like with like.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::char_class::{CharClass, CharSet};
use super::context::{ObjectStack, ParsingData};
use super::error::{ActionError, ParseError, ParseErrorKind};
use super::object::Value;
use super::rule::{ActionHandlers, ActionScope, NonterminalHooks, RuleId};
use super::scanner::Scanner;
use super::source_location::Span;

/// Default maximum input size: 100 M code points
pub const DEFAULT_MAX_INPUT_SIZE: usize = 100 * 1024 * 1024;

/// Default maximum rule recursion depth (0 = unlimited)
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 0;

/// Parser configuration for resource limits
///
/// Recursion depth counts nested rule activations. Deep grammars on small
/// thread stacks should set a limit so runaway recursion becomes a
/// [`ParseErrorKind::RecursionLimitExceeded`] instead of a stack overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Maximum input size in code points (0 = unlimited)
    pub max_input_size: usize,
    /// Maximum rule nesting depth (0 = unlimited)
    pub max_recursion_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

impl ParserConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum input size
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// Set the maximum recursion depth
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }
}

/// Outcome of a match attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    hit: bool,
    length: usize,
}

impl Match {
    /// Create a match
    #[inline]
    pub const fn new(hit: bool, length: usize) -> Self {
        Self { hit, length }
    }

    /// Soft failure
    #[inline]
    pub const fn nothing() -> Self {
        Self::new(false, 0)
    }

    /// Zero-length success
    #[inline]
    pub const fn empty() -> Self {
        Self::new(true, 0)
    }

    /// Single code point success
    #[inline]
    pub const fn one() -> Self {
        Self::new(true, 1)
    }

    /// Whether the match succeeded
    #[inline]
    pub fn hit(self) -> bool {
        self.hit
    }

    /// Matched length in code points
    #[inline]
    pub fn length(self) -> usize {
        self.length
    }

    /// Extend with a following match; a miss turns the whole match into a miss
    #[inline]
    pub fn concatenate(&mut self, other: Match) {
        if other.hit {
            self.length += other.length;
        } else {
            self.hit = false;
        }
    }
}

/// Reference from a parser to a rule other than through a nonterminal
///
/// Used by keyword continuation rules and keyword list selectors. Resolved
/// when the domain links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRef {
    pub(crate) rule_name: String,
    pub(crate) target: Option<RuleId>,
}

impl RuleRef {
    /// Create an unresolved reference
    pub fn new(rule_name: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            target: None,
        }
    }

    /// Referenced rule name, as written
    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    /// Resolved rule, after linking
    pub fn target(&self) -> Option<RuleId> {
        self.target
    }

    fn probe(
        &self,
        scanner: &mut Scanner<'_>,
        stack: &mut ObjectStack,
        data: &mut ParsingData,
    ) -> Result<Match, ParseError> {
        let Some(target) = self.target else {
            return Err(unlinked(scanner, &self.rule_name));
        };
        let stack_len = stack.len();
        let m = scanner.rule(target).parse(scanner, stack, data)?;
        stack.truncate(stack_len);
        Ok(m)
    }
}

/// Literal keyword that must not run on into an identifier
#[derive(Debug, Clone)]
pub struct KeywordParser {
    pub(crate) keyword: String,
    pub(crate) continuation: Option<RuleRef>,
}

impl KeywordParser {
    /// The keyword text
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Rule deciding whether the keyword continues into a longer token
    pub fn continuation(&self) -> Option<&RuleRef> {
        self.continuation.as_ref()
    }

    fn parse(
        &self,
        scanner: &mut Scanner<'_>,
        stack: &mut ObjectStack,
        data: &mut ParsingData,
    ) -> Result<Match, ParseError> {
        let save = scanner.span();
        let m = match_literal(scanner, &self.keyword);
        if !m.hit() {
            return Ok(m);
        }
        let boundary = match &self.continuation {
            None => !scanner.current().is_some_and(|c| CharClass::IdContinue.matches(c)),
            Some(continuation) => {
                let after = scanner.span();
                scanner.set_span(save);
                let longer = continuation.probe(scanner, stack, data)?;
                scanner.set_span(after);
                !(longer.hit() && longer.length() > m.length())
            }
        };
        if boundary {
            Ok(m)
        } else {
            scanner.set_span(save);
            Ok(Match::nothing())
        }
    }
}

/// Identifier drawn from a fixed set of words
#[derive(Debug, Clone)]
pub struct KeywordListParser {
    pub(crate) selector: Option<RuleRef>,
    pub(crate) keywords: HashSet<String>,
}

impl KeywordListParser {
    /// The word set
    pub fn keywords(&self) -> &HashSet<String> {
        &self.keywords
    }

    /// Rule selecting the candidate text; `None` scans an identifier
    pub fn selector(&self) -> Option<&RuleRef> {
        self.selector.as_ref()
    }

    fn parse(
        &self,
        scanner: &mut Scanner<'_>,
        stack: &mut ObjectStack,
        data: &mut ParsingData,
    ) -> Result<Match, ParseError> {
        let save = scanner.span();
        let m = match &self.selector {
            None => scan_identifier(scanner),
            Some(selector) => selector.probe(scanner, stack, data)?,
        };
        if m.hit() && self.keywords.contains(&scanner.text(save.start, scanner.position())) {
            return Ok(m);
        }
        scanner.set_span(save);
        Ok(Match::nothing())
    }
}

/// Value passed from a nonterminal to the inherited attributes of its target
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Constant value
    Value(Value),
    /// Variable of the calling rule's context
    Var(String),
}

impl Argument {
    /// Constant argument
    pub fn value(value: impl Into<Value>) -> Self {
        Argument::Value(value.into())
    }

    /// Variable argument
    pub fn var(name: impl Into<String>) -> Self {
        Argument::Var(name.into())
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(Value::Str(s)) => write!(f, "\"{}\"", s.escape_debug()),
            Argument::Value(v) => write!(f, "{v}"),
            Argument::Var(name) => write!(f, "{name}"),
        }
    }
}

/// Named hook point wrapping a child parser
#[derive(Debug, Clone)]
pub struct ActionParser {
    pub(crate) name: String,
    pub(crate) child: Box<Parser>,
    pub(crate) owner: Option<RuleId>,
    pub(crate) handlers: ActionHandlers,
}

impl ActionParser {
    /// Action name handlers are bound by
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wrapped parser
    pub fn child(&self) -> &Parser {
        &self.child
    }

    fn parse(
        &self,
        scanner: &mut Scanner<'_>,
        stack: &mut ObjectStack,
        data: &mut ParsingData,
    ) -> Result<Match, ParseError> {
        let start = Checkpoint::save(scanner, stack);
        let m = self.child.parse(scanner, stack, data)?;
        let Some(owner) = self.owner else {
            return Ok(m);
        };
        if m.hit() {
            let Some(success) = &self.handlers.success else {
                return Ok(m);
            };
            let span = start.span.with_end(scanner.position());
            let text = scanner.text(span.start, span.end);
            let context = data
                .context_mut(owner)
                .ok_or_else(|| no_context(scanner, owner, span))?;
            let mut scope = ActionScope::new(&text, span, scanner.file_name(), context);
            success(&mut scope).map_err(|e| scanner.action_error(e, span))?;
            if !scope.passed() {
                start.restore(scanner, stack);
                return Ok(Match::nothing());
            }
        } else if let Some(failure) = &self.handlers.failure {
            let span = scanner.span();
            let context = data
                .context_mut(owner)
                .ok_or_else(|| no_context(scanner, owner, span))?;
            failure(context).map_err(|e| scanner.action_error(e, span))?;
        }
        Ok(m)
    }
}

/// Call of a rule by name
#[derive(Debug, Clone)]
pub struct NonterminalParser {
    pub(crate) name: String,
    pub(crate) rule_name: String,
    pub(crate) arguments: Vec<Argument>,
    pub(crate) target: Option<RuleId>,
    pub(crate) owner: Option<RuleId>,
    pub(crate) hooks: NonterminalHooks,
}

impl NonterminalParser {
    /// Instance name; names the `from` slot and binds hooks
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Called rule name, as written
    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    /// Declared arguments
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Resolved rule, after linking
    pub fn target(&self) -> Option<RuleId> {
        self.target
    }

    fn parse(
        &self,
        scanner: &mut Scanner<'_>,
        stack: &mut ObjectStack,
        data: &mut ParsingData,
    ) -> Result<Match, ParseError> {
        let Some(target) = self.target else {
            return Err(unlinked(scanner, &self.rule_name));
        };
        let rule = scanner.rule(target);
        let start = Checkpoint::save(scanner, stack);
        self.push_arguments(scanner, stack, data)?;
        let m = rule.parse(scanner, stack, data)?;
        if !m.hit() {
            start.restore(scanner, stack);
            return Ok(m);
        }
        if rule.has_value() {
            let span = start.span.with_end(scanner.position());
            let value = stack.pop().map_err(|e| scanner.action_error(e, span))?;
            if let Some(owner) = self.owner {
                let context = data
                    .context_mut(owner)
                    .ok_or_else(|| no_context(scanner, owner, span))?;
                match &self.hooks.post_call {
                    Some(post_call) => {
                        post_call(context, value).map_err(|e| scanner.action_error(e, span))?
                    }
                    None => context.set_from(&self.name, value),
                }
            }
        }
        Ok(m)
    }

    fn push_arguments(
        &self,
        scanner: &Scanner<'_>,
        stack: &mut ObjectStack,
        data: &ParsingData,
    ) -> Result<(), ParseError> {
        let span = scanner.span();
        let context = self.owner.and_then(|owner| data.context(owner));
        if let Some(pre_call) = &self.hooks.pre_call {
            let context = match (context, self.owner) {
                (Some(context), _) => context,
                (None, Some(owner)) => return Err(no_context(scanner, owner, span)),
                (None, None) => return Err(unlinked(scanner, &self.rule_name)),
            };
            return pre_call(context, stack).map_err(|e| scanner.action_error(e, span));
        }
        for argument in &self.arguments {
            let value = match argument {
                Argument::Value(value) => value.clone(),
                Argument::Var(name) => context
                    .and_then(|c| c.lookup(name))
                    .cloned()
                    .ok_or_else(|| {
                        scanner.action_error(ActionError::UnknownVariable(name.clone()), span)
                    })?,
            };
            stack.push(value);
        }
        Ok(())
    }
}

/// A node of the combinator tree
#[derive(Debug, Clone, Default)]
pub enum Parser {
    /// Single literal code point
    Char(char),
    /// Literal string
    Str(String),
    /// One code point from a set
    CharSet(CharSet),
    /// One code point of a Unicode class
    Class(CharClass),
    /// One code point in an inclusive range
    Range(char, char),
    /// Any single code point
    AnyChar,
    /// Zero-length success
    #[default]
    Empty,
    /// Keyword with identifier boundary
    Keyword(KeywordParser),
    /// Identifier drawn from a fixed word set
    KeywordList(KeywordListParser),
    /// `a` then `b`
    Sequence(Box<Parser>, Box<Parser>),
    /// `a`, else `b`
    Alternative(Box<Parser>, Box<Parser>),
    /// `a` unless `b` matches at least as much
    Difference(Box<Parser>, Box<Parser>),
    /// Exactly one of `a` and `b`
    ExclusiveOr(Box<Parser>, Box<Parser>),
    /// Both `a` and `b`, with equal length
    Intersection(Box<Parser>, Box<Parser>),
    /// `item (separator item)*`
    List(Box<Parser>, Box<Parser>),
    /// Zero or more repeats
    KleeneStar(Box<Parser>),
    /// One or more repeats
    Positive(Box<Parser>),
    /// Zero or one
    Optional(Box<Parser>),
    /// Child with skipping suppressed
    Token(Box<Parser>),
    /// Child that must match; a miss is a committed error
    Expectation(Box<Parser>),
    /// Transparent grouping
    Group(Box<Parser>),
    /// Semantic action hook
    Action(ActionParser),
    /// Rule call
    Nonterminal(NonterminalParser),
}

impl Parser {
    /// Match at the scanner's position
    pub fn parse(
        &self,
        scanner: &mut Scanner<'_>,
        stack: &mut ObjectStack,
        data: &mut ParsingData,
    ) -> Result<Match, ParseError> {
        match self {
            Parser::Char(expected) => Ok(scanner.eat(|c| c == *expected)),
            Parser::Str(text) => Ok(match_literal(scanner, text)),
            Parser::CharSet(set) => Ok(scanner.eat(|c| set.contains(c))),
            Parser::Class(class) => Ok(scanner.eat(|c| class.matches(c))),
            Parser::Range(lo, hi) => Ok(scanner.eat(|c| *lo <= c && c <= *hi)),
            Parser::AnyChar => Ok(scanner.eat(|_| true)),
            Parser::Empty => Ok(Match::empty()),
            Parser::Keyword(keyword) => keyword.parse(scanner, stack, data),
            Parser::KeywordList(list) => list.parse(scanner, stack, data),
            Parser::Sequence(a, b) => parse_sequence(a, b, scanner, stack, data),
            Parser::Alternative(a, b) => parse_alternative(a, b, scanner, stack, data),
            Parser::Difference(a, b) => parse_difference(a, b, scanner, stack, data),
            Parser::ExclusiveOr(a, b) => parse_exclusive_or(a, b, scanner, stack, data),
            Parser::Intersection(a, b) => parse_intersection(a, b, scanner, stack, data),
            Parser::List(item, separator) => parse_list(item, separator, scanner, stack, data),
            Parser::KleeneStar(child) => {
                let mut m = Match::empty();
                repeat(child, &mut m, false, scanner, stack, data)?;
                Ok(m)
            }
            Parser::Positive(child) => {
                let start = Checkpoint::save(scanner, stack);
                let mut m = child.parse(scanner, stack, data)?;
                if !m.hit() {
                    start.restore(scanner, stack);
                    return Ok(Match::nothing());
                }
                repeat(child, &mut m, true, scanner, stack, data)?;
                Ok(m)
            }
            Parser::Optional(child) => {
                let start = Checkpoint::save(scanner, stack);
                let m = child.parse(scanner, stack, data)?;
                if m.hit() {
                    Ok(m)
                } else {
                    start.restore(scanner, stack);
                    Ok(Match::empty())
                }
            }
            Parser::Token(child) => {
                scanner.begin_token();
                let result = child.parse(scanner, stack, data);
                scanner.end_token();
                result
            }
            Parser::Expectation(child) => {
                let start = scanner.span();
                let m = child.parse(scanner, stack, data)?;
                if m.hit() {
                    Ok(m)
                } else {
                    Err(scanner.error(
                        ParseErrorKind::Expected {
                            expected: child.info(),
                        },
                        start,
                    ))
                }
            }
            Parser::Group(child) => child.parse(scanner, stack, data),
            Parser::Action(action) => action.parse(scanner, stack, data),
            Parser::Nonterminal(nonterminal) => nonterminal.parse(scanner, stack, data),
        }
    }

    /// Short description used in expectation errors
    pub fn info(&self) -> String {
        match self {
            Parser::Nonterminal(nonterminal) => nonterminal.rule_name.clone(),
            Parser::Action(action) => action.child.info(),
            Parser::Token(child) | Parser::Group(child) | Parser::Expectation(child) => {
                child.info()
            }
            other => other.to_string(),
        }
    }

    /// Direct children, in matching order
    pub fn children(&self) -> Vec<&Parser> {
        match self {
            Parser::Sequence(a, b)
            | Parser::Alternative(a, b)
            | Parser::Difference(a, b)
            | Parser::ExclusiveOr(a, b)
            | Parser::Intersection(a, b)
            | Parser::List(a, b) => vec![&**a, &**b],
            Parser::KleeneStar(child)
            | Parser::Positive(child)
            | Parser::Optional(child)
            | Parser::Token(child)
            | Parser::Expectation(child)
            | Parser::Group(child) => vec![&**child],
            Parser::Action(action) => vec![&*action.child],
            _ => Vec::new(),
        }
    }

    /// Direct children, mutable
    pub(crate) fn children_mut(&mut self) -> Vec<&mut Parser> {
        match self {
            Parser::Sequence(a, b)
            | Parser::Alternative(a, b)
            | Parser::Difference(a, b)
            | Parser::ExclusiveOr(a, b)
            | Parser::Intersection(a, b)
            | Parser::List(a, b) => vec![&mut **a, &mut **b],
            Parser::KleeneStar(child)
            | Parser::Positive(child)
            | Parser::Optional(child)
            | Parser::Token(child)
            | Parser::Expectation(child)
            | Parser::Group(child) => vec![&mut **child],
            Parser::Action(action) => vec![&mut *action.child],
            _ => Vec::new(),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Parser::Alternative(..) => 1,
            Parser::Difference(..) | Parser::ExclusiveOr(..) | Parser::Intersection(..) => 2,
            Parser::List(..) => 3,
            Parser::Sequence(..) => 4,
            Parser::KleeneStar(_)
            | Parser::Positive(_)
            | Parser::Optional(_)
            | Parser::Expectation(_)
            | Parser::Action(_) => 5,
            _ => 6,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    fn fmt_binary(
        f: &mut fmt::Formatter<'_>,
        a: &Parser,
        op: &str,
        b: &Parser,
        prec: u8,
    ) -> fmt::Result {
        a.fmt_operand(f, prec)?;
        write!(f, "{op}")?;
        b.fmt_operand(f, prec + 1)
    }
}

impl fmt::Display for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parser::Char(c) => write!(f, "'{}'", c.escape_debug()),
            Parser::Str(s) => write!(f, "\"{}\"", s.escape_debug()),
            Parser::CharSet(set) => write!(f, "{set}"),
            Parser::Class(class) => write!(f, "{class}"),
            Parser::Range(lo, hi) => write!(f, "'{}'..'{}'", lo.escape_debug(), hi.escape_debug()),
            Parser::AnyChar => write!(f, "."),
            Parser::Empty => write!(f, "empty"),
            Parser::Keyword(keyword) => write!(f, "keyword(\"{}\")", keyword.keyword.escape_debug()),
            Parser::KeywordList(list) => {
                let mut words: Vec<&str> = list.keywords.iter().map(String::as_str).collect();
                words.sort_unstable();
                write!(f, "keyword_list({})", words.join(", "))
            }
            Parser::Alternative(a, b) => Parser::fmt_binary(f, a, " | ", b, 1),
            Parser::Difference(a, b) => Parser::fmt_binary(f, a, " - ", b, 2),
            Parser::ExclusiveOr(a, b) => Parser::fmt_binary(f, a, " ^ ", b, 2),
            Parser::Intersection(a, b) => Parser::fmt_binary(f, a, " & ", b, 2),
            Parser::List(item, separator) => Parser::fmt_binary(f, item, " % ", separator, 3),
            Parser::Sequence(a, b) => {
                a.fmt_operand(f, 4)?;
                write!(f, " ")?;
                b.fmt_operand(f, 4)
            }
            Parser::KleeneStar(child) => {
                child.fmt_operand(f, 6)?;
                write!(f, "*")
            }
            Parser::Positive(child) => {
                child.fmt_operand(f, 6)?;
                write!(f, "+")
            }
            Parser::Optional(child) => {
                child.fmt_operand(f, 6)?;
                write!(f, "?")
            }
            Parser::Expectation(child) => {
                child.fmt_operand(f, 6)?;
                write!(f, "!")
            }
            Parser::Action(action) => {
                action.child.fmt_operand(f, 6)?;
                write!(f, "{{{}}}", action.name)
            }
            Parser::Token(child) => write!(f, "token({child})"),
            Parser::Group(child) => write!(f, "({child})"),
            Parser::Nonterminal(nonterminal) => {
                if nonterminal.name != nonterminal.rule_name {
                    write!(f, "{}:", nonterminal.name)?;
                }
                write!(f, "{}", nonterminal.rule_name)?;
                if !nonterminal.arguments.is_empty() {
                    let args: Vec<String> =
                        nonterminal.arguments.iter().map(ToString::to_string).collect();
                    write!(f, "({})", args.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// Scanner position and stack depth to return to on soft failure
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    span: Span,
    stack_len: usize,
}

impl Checkpoint {
    #[inline]
    fn save(scanner: &Scanner<'_>, stack: &ObjectStack) -> Self {
        Self {
            span: scanner.span(),
            stack_len: stack.len(),
        }
    }

    #[inline]
    fn restore(self, scanner: &mut Scanner<'_>, stack: &mut ObjectStack) {
        scanner.set_span(self.span);
        stack.truncate(self.stack_len);
    }
}

fn match_literal(scanner: &mut Scanner<'_>, text: &str) -> Match {
    let save = scanner.span();
    let mut length = 0;
    for expected in text.chars() {
        if scanner.current() != Some(expected) {
            scanner.set_span(save);
            return Match::nothing();
        }
        scanner.advance();
        length += 1;
    }
    Match::new(true, length)
}

fn scan_identifier(scanner: &mut Scanner<'_>) -> Match {
    let mut m = scanner.eat(|c| CharClass::IdStart.matches(c));
    if m.hit() {
        while scanner.eat(|c| CharClass::IdContinue.matches(c)).hit() {
            m.concatenate(Match::one());
        }
    }
    m
}

fn unlinked(scanner: &Scanner<'_>, rule_name: &str) -> ParseError {
    scanner.error(
        ParseErrorKind::Internal {
            message: format!("reference to rule '{rule_name}' is not linked"),
        },
        scanner.span(),
    )
}

fn no_context(scanner: &Scanner<'_>, owner: RuleId, span: Span) -> ParseError {
    let rule = scanner.rule(owner).full_name().to_string();
    scanner.action_error(ActionError::NoContext(rule), span)
}

fn parse_sequence(
    a: &Parser,
    b: &Parser,
    scanner: &mut Scanner<'_>,
    stack: &mut ObjectStack,
    data: &mut ParsingData,
) -> Result<Match, ParseError> {
    let start = Checkpoint::save(scanner, stack);
    let mut m = a.parse(scanner, stack, data)?;
    if m.hit() {
        scanner.skip(stack, data)?;
        let rest = b.parse(scanner, stack, data)?;
        if rest.hit() {
            m.concatenate(rest);
            return Ok(m);
        }
    }
    start.restore(scanner, stack);
    Ok(Match::nothing())
}

fn parse_alternative(
    a: &Parser,
    b: &Parser,
    scanner: &mut Scanner<'_>,
    stack: &mut ObjectStack,
    data: &mut ParsingData,
) -> Result<Match, ParseError> {
    let start = Checkpoint::save(scanner, stack);
    let m = a.parse(scanner, stack, data)?;
    if m.hit() {
        return Ok(m);
    }
    start.restore(scanner, stack);
    let m = b.parse(scanner, stack, data)?;
    if !m.hit() {
        start.restore(scanner, stack);
    }
    Ok(m)
}

fn parse_difference(
    a: &Parser,
    b: &Parser,
    scanner: &mut Scanner<'_>,
    stack: &mut ObjectStack,
    data: &mut ParsingData,
) -> Result<Match, ParseError> {
    let start = Checkpoint::save(scanner, stack);
    let left = a.parse(scanner, stack, data)?;
    if left.hit() {
        let after = Checkpoint::save(scanner, stack);
        scanner.set_span(start.span);
        let right = b.parse(scanner, stack, data)?;
        if !right.hit() || right.length() < left.length() {
            after.restore(scanner, stack);
            return Ok(left);
        }
    }
    start.restore(scanner, stack);
    Ok(Match::nothing())
}

fn parse_exclusive_or(
    a: &Parser,
    b: &Parser,
    scanner: &mut Scanner<'_>,
    stack: &mut ObjectStack,
    data: &mut ParsingData,
) -> Result<Match, ParseError> {
    let start = Checkpoint::save(scanner, stack);
    let left = a.parse(scanner, stack, data)?;
    let after_left = Checkpoint::save(scanner, stack);
    scanner.set_span(start.span);
    let right = b.parse(scanner, stack, data)?;
    match (left.hit(), right.hit()) {
        (true, false) => {
            after_left.restore(scanner, stack);
            Ok(left)
        }
        (false, true) => Ok(right),
        _ => {
            start.restore(scanner, stack);
            Ok(Match::nothing())
        }
    }
}

fn parse_intersection(
    a: &Parser,
    b: &Parser,
    scanner: &mut Scanner<'_>,
    stack: &mut ObjectStack,
    data: &mut ParsingData,
) -> Result<Match, ParseError> {
    let start = Checkpoint::save(scanner, stack);
    let left = a.parse(scanner, stack, data)?;
    if left.hit() {
        let after_left = Checkpoint::save(scanner, stack);
        scanner.set_span(start.span);
        let right = b.parse(scanner, stack, data)?;
        if right.hit() && right.length() == left.length() {
            after_left.restore(scanner, stack);
            return Ok(left);
        }
    }
    start.restore(scanner, stack);
    Ok(Match::nothing())
}

fn parse_list(
    item: &Parser,
    separator: &Parser,
    scanner: &mut Scanner<'_>,
    stack: &mut ObjectStack,
    data: &mut ParsingData,
) -> Result<Match, ParseError> {
    let start = Checkpoint::save(scanner, stack);
    let mut m = item.parse(scanner, stack, data)?;
    if !m.hit() {
        start.restore(scanner, stack);
        return Ok(Match::nothing());
    }
    loop {
        let iteration = Checkpoint::save(scanner, stack);
        scanner.skip(stack, data)?;
        let sep = separator.parse(scanner, stack, data)?;
        if !sep.hit() {
            iteration.restore(scanner, stack);
            break;
        }
        scanner.skip(stack, data)?;
        let next = item.parse(scanner, stack, data)?;
        if !next.hit() || scanner.position() == iteration.span.start {
            iteration.restore(scanner, stack);
            break;
        }
        m.concatenate(sep);
        m.concatenate(next);
    }
    Ok(m)
}

/// Greedy repetition shared by `*` and `+`; `m` accumulates the repeats
fn repeat(
    child: &Parser,
    m: &mut Match,
    mut skip_first: bool,
    scanner: &mut Scanner<'_>,
    stack: &mut ObjectStack,
    data: &mut ParsingData,
) -> Result<(), ParseError> {
    loop {
        let iteration = Checkpoint::save(scanner, stack);
        if skip_first {
            scanner.skip(stack, data)?;
        }
        let next = child.parse(scanner, stack, data)?;
        if !next.hit() || scanner.position() == iteration.span.start {
            iteration.restore(scanner, stack);
            return Ok(());
        }
        m.concatenate(next);
        skip_first = true;
    }
}
