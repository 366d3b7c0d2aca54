//! Scanner over a code-point buffer
//!
//! The scanner owns the current position (as a [`Span`] whose line number
//! travels with it), applies the grammar's skip rule between significant
//! tokens, and optionally records a [`ParseTrace`].
//!
//! Backtracking is done by saving [`Scanner::span`] and restoring it with
//! [`Scanner::set_span`]; nothing else in the scanner depends on history.

use super::context::{ObjectStack, ParsingData};
use super::debug::{ParseTrace, TraceAction, TraceEntry};
use super::error::{ActionError, ParseError, ParseErrorKind};
use super::parser::Match;
use super::rule::{Rule, RuleId};
use super::source_location::Span;

/// Cursor over the input of one parse
pub struct Scanner<'a> {
    input: &'a [char],
    file_name: &'a str,
    span: Span,
    rules: &'a [Rule],
    skip_rule: Option<RuleId>,
    token_depth: usize,
    skipping: bool,
    depth: usize,
    max_depth: usize,
    trace: Option<ParseTrace>,
}

impl<'a> Scanner<'a> {
    /// Create a scanner positioned at the start of `input`
    pub fn new(
        input: &'a [char],
        file_index: usize,
        file_name: &'a str,
        rules: &'a [Rule],
        skip_rule: Option<RuleId>,
    ) -> Self {
        Self {
            input,
            file_name,
            span: Span::at(file_index, 1, 0),
            rules,
            skip_rule,
            token_depth: 0,
            skipping: false,
            depth: 0,
            max_depth: 0,
            trace: None,
        }
    }

    /// Limit rule nesting; 0 means unlimited
    pub fn set_max_recursion_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Start recording a trace
    pub fn enable_trace(&mut self) {
        self.trace = Some(ParseTrace::new());
    }

    /// Take the recorded trace, if tracing was enabled
    pub fn take_trace(&mut self) -> Option<ParseTrace> {
        self.trace.take()
    }

    /// Current position as a zero-length span
    #[inline]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Restore a position saved with [`Scanner::span`]
    #[inline]
    pub fn set_span(&mut self, span: Span) {
        self.span = Span::at(span.file_index, span.line, span.start);
    }

    /// Current offset in code points
    #[inline]
    pub fn position(&self) -> usize {
        self.span.start
    }

    /// Check if the whole input has been consumed
    #[inline]
    pub fn at_end(&self) -> bool {
        self.span.start >= self.input.len()
    }

    /// Code point at the current position
    #[inline]
    pub fn current(&self) -> Option<char> {
        self.input.get(self.span.start).copied()
    }

    /// Move past the current code point
    #[inline]
    pub fn advance(&mut self) {
        if let Some(c) = self.current() {
            if c == '\n' {
                self.span.line += 1;
            }
            self.span.start += 1;
            self.span.end = self.span.start;
        }
    }

    /// Consume the current code point if it satisfies `pred`
    #[inline]
    pub fn eat(&mut self, pred: impl FnOnce(char) -> bool) -> Match {
        match self.current() {
            Some(c) if pred(c) => {
                self.advance();
                Match::one()
            }
            _ => Match::nothing(),
        }
    }

    /// The input buffer
    pub fn input(&self) -> &'a [char] {
        self.input
    }

    /// Text between two offsets
    pub fn text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.input.len());
        let start = start.min(end);
        self.input[start..end].iter().collect()
    }

    /// File name passed to the parse entry
    pub fn file_name(&self) -> &'a str {
        self.file_name
    }

    /// File index passed to the parse entry
    pub fn file_index(&self) -> usize {
        self.span.file_index
    }

    /// Rule table of the domain
    pub fn rules(&self) -> &'a [Rule] {
        self.rules
    }

    /// Rule by id
    #[inline]
    pub fn rule(&self, id: RuleId) -> &'a Rule {
        &self.rules[id.index()]
    }

    /// Enter a token region; skipping is suppressed until the matching end
    #[inline]
    pub fn begin_token(&mut self) {
        self.token_depth += 1;
    }

    /// Leave a token region
    #[inline]
    pub fn end_token(&mut self) {
        self.token_depth = self.token_depth.saturating_sub(1);
    }

    /// Check if the scanner is inside a token region
    pub fn in_token(&self) -> bool {
        self.token_depth > 0
    }

    /// Apply the skip rule while it consumes input
    ///
    /// Never fails softly; a committed error raised inside the skip rule
    /// is propagated. Values the skip rule synthesizes are discarded.
    pub fn skip(&mut self, stack: &mut ObjectStack, data: &mut ParsingData) -> Result<(), ParseError> {
        let Some(skip_rule) = self.skip_rule else {
            return Ok(());
        };
        if self.token_depth > 0 || self.skipping {
            return Ok(());
        }
        let rule = self.rule(skip_rule);
        let stack_len = stack.len();
        self.skipping = true;
        let result = loop {
            let save = self.span;
            match rule.parse(self, stack, data) {
                Ok(m) if m.hit() && self.position() > save.start => stack.truncate(stack_len),
                Ok(_) => {
                    self.set_span(save);
                    stack.truncate(stack_len);
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };
        self.skipping = false;
        result
    }

    /// Record entry into a rule and enforce the depth limit
    pub fn enter_rule(&mut self, rule: &Rule) -> Result<(), ParseError> {
        if self.max_depth > 0 && self.depth >= self.max_depth {
            return Err(self.error(
                ParseErrorKind::RecursionLimitExceeded {
                    max_depth: self.max_depth,
                },
                self.span,
            ));
        }
        self.depth += 1;
        self.record(rule, self.span, TraceAction::Enter);
        Ok(())
    }

    /// Record exit from a rule; `outcome` is `None` for a committed error
    pub fn leave_rule(&mut self, rule: &Rule, start: Span, outcome: Option<Match>) {
        self.depth = self.depth.saturating_sub(1);
        let action = match outcome {
            Some(m) if m.hit() => TraceAction::Match { length: m.length() },
            _ => TraceAction::Fail,
        };
        self.record(rule, start.with_end(self.span.start), action);
    }

    /// Current rule nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn record(&mut self, rule: &Rule, span: Span, action: TraceAction) {
        if self.skipping {
            return;
        }
        let depth = match action {
            TraceAction::Enter => self.depth.saturating_sub(1),
            _ => self.depth,
        };
        if let Some(trace) = self.trace.as_mut() {
            trace.add(TraceEntry {
                rule: rule.full_name().to_string(),
                span,
                action,
                depth,
            });
        }
    }

    /// Build a committed error located at `span`
    pub fn error(&self, kind: ParseErrorKind, span: Span) -> ParseError {
        ParseError::new(kind, self.file_name, span, self.input)
    }

    /// Build a committed error from a handler failure
    pub fn action_error(&self, error: ActionError, span: Span) -> ParseError {
        self.error(
            ParseErrorKind::Action {
                message: error.to_string(),
            },
            span,
        )
    }
}
