//! Grammar analysis and warnings
//!
//! This module analyzes linked rules and warns about:
//! - Left recursion (direct, indirect, and across grammars), which makes a
//!   PEG parse diverge
//! - Rules unreachable from the grammar's start and skip rules
//! - Repetitions of a nullable expression
//!
//! # Example
//!
//! ```
//! use pegworks::prelude::*;
//!
//! struct Expr;
//!
//! impl GrammarDefinition for Expr {
//!     fn name(&self) -> &str {
//!         "Expr"
//!     }
//!
//!     fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
//!         grammar.add_rule(Rule::new("expr", nonterminal("expr") >> '+' >> 'n' | chr('n')))?;
//!         Ok(())
//!     }
//! }
//!
//! let mut domain = ParsingDomain::new();
//! let id = domain.create(&Expr).unwrap();
//! let warnings = GrammarAnalyzer::new(&domain).analyze_grammar(id);
//! assert_eq!(warnings[0].kind, WarningKind::LeftRecursion);
//! ```

use hashbrown::HashSet;
use std::fmt;

use super::debug::collect_calls;
use super::domain::{GrammarId, ParsingDomain};
use super::parser::Parser;
use super::rule::RuleId;

/// Kind of grammar warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// Direct or indirect left recursion
    ///
    /// Example: `expr ::= expr '+' term | term`
    LeftRecursion,

    /// A rule is defined but never reachable from the start or skip rule
    UnusedRule,

    /// A repetition whose body can match the empty string
    ///
    /// The repetition stops after the first empty iteration, so the body's
    /// later alternatives are never retried.
    NullableRepetition,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftRecursion => write!(f, "left recursion"),
            Self::UnusedRule => write!(f, "unused rule"),
            Self::NullableRepetition => write!(f, "nullable repetition"),
        }
    }
}

/// A grammar warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarWarning {
    /// The kind of warning
    pub kind: WarningKind,
    /// Rule where the warning was detected
    pub rule: RuleId,
    /// Human-readable message
    pub message: String,
    /// Related rules, such as a left-recursive chain
    pub related: Vec<RuleId>,
}

impl GrammarWarning {
    /// Create a new warning
    pub fn new(kind: WarningKind, rule: RuleId, message: impl Into<String>) -> Self {
        Self {
            kind,
            rule,
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// Add related rules to the warning
    pub fn with_related(mut self, rules: Vec<RuleId>) -> Self {
        self.related = rules;
        self
    }
}

impl fmt::Display for GrammarWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[rule {}] {}: {}", self.rule, self.kind, self.message)
    }
}

/// Grammar analyzer over a linked domain
pub struct GrammarAnalyzer<'a> {
    domain: &'a ParsingDomain,
    /// Rules that can match the empty string
    nullable: Vec<bool>,
    /// Rules each rule may call before consuming input
    left_calls: Vec<Vec<RuleId>>,
}

impl<'a> GrammarAnalyzer<'a> {
    /// Create an analyzer, computing nullability and left-call sets
    pub fn new(domain: &'a ParsingDomain) -> Self {
        let nullable = compute_nullable(domain);
        let left_calls = domain
            .rules()
            .iter()
            .map(|rule| {
                let mut calls = Vec::new();
                collect_left_calls(rule.definition(), &nullable, &mut calls);
                calls.sort();
                calls.dedup();
                calls
            })
            .collect();
        Self {
            domain,
            nullable,
            left_calls,
        }
    }

    /// Check if a rule can match the empty string
    pub fn is_nullable(&self, rule: RuleId) -> bool {
        self.nullable.get(rule.index()).copied().unwrap_or(false)
    }

    /// Check if a parser can match the empty string
    pub fn is_parser_nullable(&self, parser: &Parser) -> bool {
        parser_nullable(parser, &self.nullable)
    }

    /// Rules a rule may call at its start position
    pub fn left_calls(&self, rule: RuleId) -> &[RuleId] {
        self.left_calls
            .get(rule.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Analyze every grammar of the domain
    pub fn analyze(&self) -> Vec<GrammarWarning> {
        self.domain
            .grammars()
            .flat_map(|g| self.analyze_grammar(g.id()))
            .collect()
    }

    /// Analyze one grammar
    pub fn analyze_grammar(&self, grammar: GrammarId) -> Vec<GrammarWarning> {
        let mut warnings = Vec::new();
        self.detect_left_recursion(grammar, &mut warnings);
        self.detect_unused_rules(grammar, &mut warnings);
        self.detect_nullable_repetitions(grammar, &mut warnings);
        warnings
    }

    /// Find a chain of left calls from `rule` back to itself
    pub fn left_recursive_chain(&self, rule: RuleId) -> Option<Vec<RuleId>> {
        let mut visited = HashSet::new();
        self.find_path(rule, rule, &mut visited).map(|mut path| {
            path.insert(0, rule);
            path
        })
    }

    fn find_path(&self, from: RuleId, target: RuleId, visited: &mut HashSet<RuleId>) -> Option<Vec<RuleId>> {
        for &next in self.left_calls(from) {
            if next == target {
                return Some(vec![next]);
            }
            if visited.insert(next) {
                if let Some(mut path) = self.find_path(next, target, visited) {
                    path.insert(0, next);
                    return Some(path);
                }
            }
        }
        None
    }

    fn detect_left_recursion(&self, grammar: GrammarId, warnings: &mut Vec<GrammarWarning>) {
        for &rule in self.domain.grammar_by_id(grammar).grammar().rules() {
            if let Some(chain) = self.left_recursive_chain(rule) {
                let names: Vec<&str> = chain
                    .iter()
                    .map(|&id| self.domain.rule(id).full_name())
                    .collect();
                warnings.push(
                    GrammarWarning::new(
                        WarningKind::LeftRecursion,
                        rule,
                        format!(
                            "rule {} is left-recursive: {}",
                            self.domain.rule(rule).full_name(),
                            names.join(" -> ")
                        ),
                    )
                    .with_related(chain),
                );
            }
        }
    }

    fn detect_unused_rules(&self, grammar: GrammarId, warnings: &mut Vec<GrammarWarning>) {
        let g = self.domain.grammar_by_id(grammar);
        let mut reachable = HashSet::new();
        let roots = g.start_rule().into_iter().chain(g.skip_rule());
        for root in roots {
            self.collect_reachable(root, &mut reachable);
        }
        for link in g.links() {
            if let Some(target) = link.rule() {
                self.collect_reachable(target, &mut reachable);
            }
        }
        for &rule in g.grammar().rules() {
            if !reachable.contains(&rule) {
                warnings.push(GrammarWarning::new(
                    WarningKind::UnusedRule,
                    rule,
                    format!(
                        "rule {} is never reachable from the start rule",
                        self.domain.rule(rule).full_name()
                    ),
                ));
            }
        }
    }

    fn collect_reachable(&self, rule: RuleId, reachable: &mut HashSet<RuleId>) {
        if !reachable.insert(rule) {
            return;
        }
        let mut calls = Vec::new();
        collect_calls(self.domain.rule(rule).definition(), &mut calls);
        for call in calls {
            self.collect_reachable(call, reachable);
        }
    }

    fn detect_nullable_repetitions(&self, grammar: GrammarId, warnings: &mut Vec<GrammarWarning>) {
        for rule in self.domain.grammar_by_id(grammar).rules() {
            let mut found = Vec::new();
            self.find_nullable_repetitions(rule.definition(), &mut found);
            for repetition in found {
                warnings.push(GrammarWarning::new(
                    WarningKind::NullableRepetition,
                    rule.id(),
                    format!(
                        "{} in rule {} repeats an expression that can match nothing",
                        repetition,
                        rule.full_name()
                    ),
                ));
            }
        }
    }

    fn find_nullable_repetitions(&self, parser: &Parser, found: &mut Vec<String>) {
        match parser {
            Parser::KleeneStar(child) | Parser::Positive(child) | Parser::List(child, _)
                if self.is_parser_nullable(child) =>
            {
                found.push(parser.to_string());
            }
            _ => {}
        }
        for child in parser.children() {
            self.find_nullable_repetitions(child, found);
        }
    }
}

/// Fixed point over all rules, starting from "nothing is nullable"
fn compute_nullable(domain: &ParsingDomain) -> Vec<bool> {
    let mut nullable = vec![false; domain.rule_count()];
    loop {
        let mut changed = false;
        for rule in domain.rules() {
            let index = rule.id().index();
            if !nullable[index] && parser_nullable(rule.definition(), &nullable) {
                nullable[index] = true;
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

fn parser_nullable(parser: &Parser, rules: &[bool]) -> bool {
    match parser {
        Parser::Char(_)
        | Parser::CharSet(_)
        | Parser::Class(_)
        | Parser::Range(..)
        | Parser::AnyChar
        | Parser::Keyword(_)
        | Parser::KeywordList(_) => false,
        Parser::Str(s) => s.is_empty(),
        Parser::Empty | Parser::KleeneStar(_) | Parser::Optional(_) => true,
        Parser::Sequence(a, b) | Parser::Intersection(a, b) => {
            parser_nullable(a, rules) && parser_nullable(b, rules)
        }
        Parser::Alternative(a, b) | Parser::ExclusiveOr(a, b) => {
            parser_nullable(a, rules) || parser_nullable(b, rules)
        }
        Parser::Difference(a, _) | Parser::List(a, _) => parser_nullable(a, rules),
        Parser::Positive(child)
        | Parser::Token(child)
        | Parser::Expectation(child)
        | Parser::Group(child) => parser_nullable(child, rules),
        Parser::Action(action) => parser_nullable(action.child(), rules),
        Parser::Nonterminal(nt) => nt
            .target()
            .and_then(|t| rules.get(t.index()).copied())
            .unwrap_or(false),
    }
}

fn collect_left_calls(parser: &Parser, nullable: &[bool], out: &mut Vec<RuleId>) {
    match parser {
        Parser::Nonterminal(nt) => out.extend(nt.target()),
        Parser::Keyword(kw) => out.extend(kw.continuation().and_then(|c| c.target())),
        Parser::KeywordList(list) => out.extend(list.selector().and_then(|s| s.target())),
        Parser::Sequence(a, b) | Parser::List(a, b) => {
            collect_left_calls(a, nullable, out);
            if parser_nullable(a, nullable) {
                collect_left_calls(b, nullable, out);
            }
        }
        _ => {
            for child in parser.children() {
                collect_left_calls(child, nullable, out);
            }
        }
    }
}
