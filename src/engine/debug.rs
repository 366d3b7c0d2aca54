//! Developer tools
//!
//! This module provides debugging and visualization tools for developing
//! grammars.
//!
//! # Features
//! - Parse tracing (rule enter/match/fail events)
//! - Grammar printing (`name ::= expression` listings)
//! - Rule dependency diagrams (Mermaid/DOT)

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::grammar::GrammarRef;
use super::parser::Parser;
use super::rule::RuleId;
use super::source_location::Span;

/// Trace of rule activations during one parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTrace {
    /// Trace entries, in event order
    pub entries: Vec<TraceEntry>,
}

/// A single trace entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Qualified rule name
    pub rule: String,
    /// Start position on enter, matched region on exit
    pub span: Span,
    /// What happened
    pub action: TraceAction,
    /// Rule nesting depth
    pub depth: usize,
}

/// Trace action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceAction {
    /// Started parsing a rule
    Enter,
    /// Successfully matched
    Match {
        /// Matched length in code points, trivia excluded
        length: usize,
    },
    /// Soft or committed failure
    Fail,
}

impl ParseTrace {
    /// Create a new empty trace
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an entry
    pub fn add(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for one rule, by qualified name
    pub fn entries_for<'t>(&'t self, rule: &'t str) -> impl Iterator<Item = &'t TraceEntry> + 't {
        self.entries.iter().filter(move |e| e.rule == rule)
    }

    /// Format as an indented listing
    pub fn format(&self) -> String {
        let mut output = String::new();
        for entry in &self.entries {
            let indent = "  ".repeat(entry.depth);
            let _ = match entry.action {
                TraceAction::Enter => writeln!(
                    output,
                    "{}-> {} at {}:{}",
                    indent, entry.rule, entry.span.line, entry.span.start
                ),
                TraceAction::Match { length } => writeln!(
                    output,
                    "{}<- {} matched {} ({}..{})",
                    indent, entry.rule, length, entry.span.start, entry.span.end
                ),
                TraceAction::Fail => writeln!(output, "{}<- {} failed", indent, entry.rule),
            };
        }
        output
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for ParseTrace {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the rules of a grammar as `name ::= expression` lines
pub struct GrammarPrinter<'a> {
    grammar: GrammarRef<'a>,
    qualified: bool,
}

impl<'a> GrammarPrinter<'a> {
    /// Create a printer for `grammar`
    pub fn new(grammar: GrammarRef<'a>) -> Self {
        Self {
            grammar,
            qualified: false,
        }
    }

    /// Print qualified rule names
    pub fn qualified(mut self, qualified: bool) -> Self {
        self.qualified = qualified;
        self
    }

    /// Render every rule, start rule marked with `*`
    pub fn print(&self) -> String {
        let mut output = String::new();
        let start = self.grammar.start_rule();
        for rule in self.grammar.rules() {
            let marker = if Some(rule.id()) == start { "*" } else { "" };
            let name = if self.qualified {
                rule.full_name()
            } else {
                rule.name()
            };
            let _ = writeln!(output, "{}{} ::= {}", marker, name, rule.definition());
        }
        for link in self.grammar.links() {
            let _ = writeln!(output, "{} => {}", link.alias(), link.target());
        }
        output
    }
}

/// Rule dependency diagrams
pub struct GrammarVisualizer<'a> {
    grammar: GrammarRef<'a>,
}

impl<'a> GrammarVisualizer<'a> {
    /// Create a new grammar visualizer
    pub fn new(grammar: GrammarRef<'a>) -> Self {
        Self { grammar }
    }

    /// Edges from each rule of the grammar to the rules it calls
    pub fn edges(&self) -> Vec<(RuleId, RuleId)> {
        let mut edges = Vec::new();
        for rule in self.grammar.rules() {
            let mut targets = Vec::new();
            collect_calls(rule.definition(), &mut targets);
            targets.sort();
            targets.dedup();
            edges.extend(targets.into_iter().map(|t| (rule.id(), t)));
        }
        edges
    }

    /// Generate a Mermaid diagram
    pub fn to_mermaid(&self) -> String {
        let domain = self.grammar.domain();
        let mut output = String::from("graph TD\n");
        for rule in self.grammar.rules() {
            let _ = writeln!(output, "  r{}[\"{}\"]", rule.id().index(), rule.full_name());
        }
        for (from, to) in self.edges() {
            if domain.rule(to).grammar() != Some(self.grammar.id()) {
                let _ = writeln!(output, "  r{}[\"{}\"]", to.index(), domain.rule(to).full_name());
            }
            let _ = writeln!(output, "  r{} --> r{}", from.index(), to.index());
        }
        output
    }

    /// Generate a GraphViz DOT diagram
    pub fn to_dot(&self) -> String {
        let domain = self.grammar.domain();
        let mut output = String::new();
        let _ = writeln!(output, "digraph \"{}\" {{", self.grammar.full_name());
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n");
        for rule in self.grammar.rules() {
            let _ = writeln!(output, "  r{} [label=\"{}\"]", rule.id().index(), rule.name());
        }
        for (from, to) in self.edges() {
            if domain.rule(to).grammar() != Some(self.grammar.id()) {
                let _ = writeln!(
                    output,
                    "  r{} [label=\"{}\", style=dashed]",
                    to.index(),
                    domain.rule(to).full_name()
                );
            }
            let _ = writeln!(output, "  r{} -> r{}", from.index(), to.index());
        }
        if let Some(start) = self.grammar.start_rule() {
            let _ = writeln!(output, "  r{} [style=filled, fillcolor=lightblue]", start.index());
        }
        output.push_str("}\n");
        output
    }
}

/// Linked rule targets reachable from `parser` without passing through a rule
pub(crate) fn collect_calls(parser: &Parser, out: &mut Vec<RuleId>) {
    match parser {
        Parser::Nonterminal(nt) => out.extend(nt.target()),
        Parser::Keyword(kw) => out.extend(kw.continuation().and_then(|c| c.target())),
        Parser::KeywordList(list) => out.extend(list.selector().and_then(|s| s.target())),
        _ => {}
    }
    for child in parser.children() {
        collect_calls(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::super::domain::ParsingDomain;
    use super::super::error::ConstructionError;
    use super::super::grammar::{GrammarBuilder, GrammarDefinition};
    use super::super::parser_dsl::*;
    use super::super::rule::Rule;
    use super::*;

    struct Pairs;

    impl GrammarDefinition for Pairs {
        fn name(&self) -> &str {
            "Pairs"
        }

        fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
            grammar.add_rule(Rule::new("pairs", nonterminal("pair") % ','))?;
            grammar.add_rule(Rule::new("pair", nonterminal("key") >> '=' >> nonterminal("key")))?;
            grammar.add_rule(Rule::new("key", char_set("a-z").many1()))?;
            Ok(())
        }
    }

    fn domain() -> ParsingDomain {
        let mut domain = ParsingDomain::new();
        domain.create(&Pairs).unwrap();
        domain
    }

    #[test]
    fn test_trace_records_rule_events() {
        let domain = domain();
        let grammar = domain.grammar("Pairs").unwrap();
        let (result, trace) = grammar.parse_traced("a=b", 0, "t", Vec::new());
        assert!(result.is_ok());
        assert_eq!(trace.entries[0].rule, "Pairs.pairs");
        assert_eq!(trace.entries[0].action, TraceAction::Enter);
        assert_eq!(trace.entries[0].depth, 0);
        let last = trace.entries.last().unwrap();
        assert_eq!(last.action, TraceAction::Match { length: 3 });
        assert_eq!(last.depth, 0);
        assert_eq!(trace.entries_for("Pairs.key").count(), 4);
    }

    #[test]
    fn test_trace_format_and_json() {
        let domain = domain();
        let grammar = domain.grammar("Pairs").unwrap();
        let (_, trace) = grammar.parse_traced("a=", 0, "t", Vec::new());
        let text = trace.format();
        assert!(text.starts_with("-> Pairs.pairs at 1:0\n"));
        assert!(text.contains("  <- Pairs.pair failed"));
        let json = trace.to_json().unwrap();
        assert!(json.contains("\"kind\": \"fail\""));
        let back: ParseTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trace);
    }

    #[test]
    fn test_grammar_printer() {
        let domain = domain();
        let printed = GrammarPrinter::new(domain.grammar("Pairs").unwrap()).print();
        assert_eq!(
            printed,
            "*pairs ::= pair % ','\npair ::= key '=' key\nkey ::= [a-z]+\n"
        );
    }

    #[test]
    fn test_visualizer_edges() {
        let domain = domain();
        let grammar = domain.grammar("Pairs").unwrap();
        let visualizer = GrammarVisualizer::new(grammar);
        let ids: Vec<(usize, usize)> = visualizer
            .edges()
            .into_iter()
            .map(|(a, b)| (a.index(), b.index()))
            .collect();
        assert_eq!(ids, vec![(0, 1), (1, 2)]);
        assert!(visualizer.to_mermaid().contains("r0 --> r1"));
        assert!(visualizer.to_dot().contains("r0 [style=filled, fillcolor=lightblue]"));
    }
}
