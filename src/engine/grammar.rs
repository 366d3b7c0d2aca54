//! Grammar model and parse entry
//!
//! A [`Grammar`] is a named set of rules living in a
//! [`ParsingDomain`]. Client grammars are described by implementing
//! [`GrammarDefinition`]; the domain calls it with a [`GrammarBuilder`] the
//! first time the grammar is needed, either through
//! [`ParsingDomain::create`] or as a reference from another grammar.
//!
//! Parsing goes through a [`GrammarRef`], a grammar bound to its (linked,
//! read-only) domain. Each call builds its own scanner, value stack and
//! context stacks, so one domain serves any number of threads.
//!
//! # Example
//!
//! ```rust
//! use pegworks::prelude::*;
//!
//! struct Digits;
//!
//! impl GrammarDefinition for Digits {
//!     fn name(&self) -> &str {
//!         "Digits"
//!     }
//!
//!     fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
//!         grammar.add_rule(
//!             Rule::new("number", char_set("0-9").many1().action("digits"))
//!                 .value_type("int")
//!                 .on_action("digits", |scope| {
//!                     let n = scope.text().parse::<i64>().map_err(|e| ActionError::msg(e.to_string()))?;
//!                     scope.context_mut().set_value(n);
//!                     Ok(())
//!                 }),
//!         )?;
//!         Ok(())
//!     }
//! }
//!
//! let mut domain = ParsingDomain::new();
//! domain.create(&Digits).unwrap();
//! let grammar = domain.grammar("Digits").unwrap();
//! let value = grammar.parse("1234", 0, "digits.txt", Vec::new()).unwrap();
//! assert_eq!(value, Some(Value::Int(1234)));
//! ```

use std::ops::Deref;

use super::context::{ObjectStack, ParsingData};
use super::debug::ParseTrace;
use super::domain::{GrammarId, ParsingDomain, ScopeId};
use super::error::{ConstructionError, ParseError, ParseErrorKind};
use super::object::Value;
use super::parser::ParserConfig;
use super::rule::{Rule, RuleId};
use super::scanner::Scanner;

/// Alias in one grammar for a rule defined elsewhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLink {
    pub(crate) alias: String,
    pub(crate) target: String,
    pub(crate) rule: Option<RuleId>,
}

impl RuleLink {
    /// Local name
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Target name, short or qualified
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Resolved rule, after linking
    pub fn rule(&self) -> Option<RuleId> {
        self.rule
    }
}

/// A named set of rules
#[derive(Debug)]
pub struct Grammar {
    pub(crate) id: GrammarId,
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) scope: ScopeId,
    pub(crate) full_name: String,
    pub(crate) rules: Vec<RuleId>,
    pub(crate) rule_names: hashbrown::HashMap<String, RuleId>,
    pub(crate) links: Vec<RuleLink>,
    pub(crate) references: Vec<GrammarId>,
    pub(crate) start_rule_name: Option<String>,
    pub(crate) skip_rule_name: Option<String>,
    pub(crate) start_rule: Option<RuleId>,
    pub(crate) skip_rule: Option<RuleId>,
    pub(crate) linked: bool,
}

impl Grammar {
    pub(crate) fn new(id: GrammarId, name: &str, namespace: &str, scope: ScopeId) -> Self {
        Self {
            id,
            name: name.to_string(),
            namespace: namespace.to_string(),
            scope,
            full_name: qualify(namespace, name),
            rules: Vec::new(),
            rule_names: hashbrown::HashMap::new(),
            links: Vec::new(),
            references: Vec::new(),
            start_rule_name: None,
            skip_rule_name: None,
            start_rule: None,
            skip_rule: None,
            linked: false,
        }
    }

    /// Domain-wide id
    pub fn id(&self) -> GrammarId {
        self.id
    }

    /// Short name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted namespace, empty for the global scope
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Qualified name
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Own rules, in definition order
    pub fn rules(&self) -> &[RuleId] {
        &self.rules
    }

    /// Own rule by name
    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rule_names.get(name).copied()
    }

    /// Rule links
    pub fn links(&self) -> &[RuleLink] {
        &self.links
    }

    /// Referenced grammars, in declaration order
    pub fn references(&self) -> &[GrammarId] {
        &self.references
    }

    /// Start rule, after linking
    pub fn start_rule(&self) -> Option<RuleId> {
        self.start_rule
    }

    /// Skip rule, after linking
    pub fn skip_rule(&self) -> Option<RuleId> {
        self.skip_rule
    }

    /// Whether the link pass has run for this grammar
    pub fn is_linked(&self) -> bool {
        self.linked
    }
}

/// Join a namespace and a name with `.`
pub(crate) fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Description of a client grammar
pub trait GrammarDefinition {
    /// Short grammar name
    fn name(&self) -> &str;

    /// Dotted namespace; empty places the grammar in the global scope
    fn namespace(&self) -> &str {
        ""
    }

    /// Declare the grammars whose rules this one uses
    fn referenced_grammars(&self, _grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        Ok(())
    }

    /// Add rules, rule links, and the start and skip rule names
    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError>;
}

/// Construction handle for one grammar
pub struct GrammarBuilder<'d> {
    domain: &'d mut ParsingDomain,
    grammar: GrammarId,
}

impl<'d> GrammarBuilder<'d> {
    pub(crate) fn new(domain: &'d mut ParsingDomain, grammar: GrammarId) -> Self {
        Self { domain, grammar }
    }

    /// Id of the grammar being built
    pub fn id(&self) -> GrammarId {
        self.grammar
    }

    /// Qualified name of the grammar being built
    pub fn full_name(&self) -> &str {
        self.domain.grammar_data(self.grammar).full_name()
    }

    /// Add a rule, assigning its domain-wide id
    pub fn add_rule(&mut self, rule: Rule) -> Result<RuleId, ConstructionError> {
        self.domain.add_rule(self.grammar, rule)
    }

    /// Make `target` available in this grammar under `alias`
    pub fn add_rule_link(&mut self, alias: &str, target: &str) -> Result<(), ConstructionError> {
        self.domain.add_rule_link(self.grammar, alias, target)
    }

    /// Name the start rule; defaults to the first rule added
    pub fn set_start_rule_name(&mut self, name: &str) {
        self.domain.grammar_data_mut(self.grammar).start_rule_name = Some(name.to_string());
    }

    /// Name the rule that consumes trivia between tokens
    pub fn set_skip_rule_name(&mut self, name: &str) {
        self.domain.grammar_data_mut(self.grammar).skip_rule_name = Some(name.to_string());
    }

    /// Reference another grammar, constructing it on first use
    pub fn add_grammar_reference(
        &mut self,
        definition: &dyn GrammarDefinition,
    ) -> Result<GrammarId, ConstructionError> {
        let referenced = self.domain.ensure_grammar(definition)?;
        self.domain.add_reference(self.grammar, referenced);
        Ok(referenced)
    }

    /// Reference a grammar already registered under `qualified_name`
    pub fn add_grammar_reference_by_name(
        &mut self,
        qualified_name: &str,
    ) -> Result<GrammarId, ConstructionError> {
        let referenced = self.domain.grammar_id(qualified_name).ok_or_else(|| {
            ConstructionError::UnknownGrammar {
                name: qualified_name.to_string(),
            }
        })?;
        self.domain.add_reference(self.grammar, referenced);
        Ok(referenced)
    }
}

/// Per-call parse settings
#[derive(Debug, Default)]
pub struct ParseOptions<'o> {
    /// Resource limits
    pub config: ParserConfig,
    /// Context stacks to use instead of a fresh set, left for inspection
    pub parsing_data: Option<&'o mut ParsingData>,
    /// Trace to fill
    pub trace: Option<&'o mut ParseTrace>,
}

impl<'o> ParseOptions<'o> {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config`
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Use caller-owned context stacks
    pub fn with_parsing_data(mut self, data: &'o mut ParsingData) -> Self {
        self.parsing_data = Some(data);
        self
    }

    /// Record a trace into `trace`
    pub fn with_trace(mut self, trace: &'o mut ParseTrace) -> Self {
        self.trace = Some(trace);
        self
    }
}

/// A grammar bound to its domain
#[derive(Clone, Copy)]
pub struct GrammarRef<'d> {
    domain: &'d ParsingDomain,
    grammar: &'d Grammar,
}

impl<'d> GrammarRef<'d> {
    pub(crate) fn new(domain: &'d ParsingDomain, grammar: &'d Grammar) -> Self {
        Self { domain, grammar }
    }

    /// The grammar
    pub fn grammar(&self) -> &'d Grammar {
        self.grammar
    }

    /// The owning domain
    pub fn domain(&self) -> &'d ParsingDomain {
        self.domain
    }

    /// Own rules, in definition order
    pub fn rules(&self) -> impl Iterator<Item = &'d Rule> + 'd {
        let domain = self.domain;
        self.grammar.rules.iter().map(move |&id| domain.rule(id))
    }

    /// Resolve a rule name as a nonterminal of this grammar would
    pub fn rule(&self, name: &str) -> Option<&'d Rule> {
        self.domain
            .resolve_rule(self.grammar.id, name)
            .map(|id| self.domain.rule(id))
    }

    /// Start rule, after linking
    pub fn start(&self) -> Option<&'d Rule> {
        self.grammar.start_rule.map(|id| self.domain.rule(id))
    }

    /// Skip rule, after linking
    pub fn skip(&self) -> Option<&'d Rule> {
        self.grammar.skip_rule.map(|id| self.domain.rule(id))
    }

    /// Parse `input` completely with the start rule
    ///
    /// `args` bind to the start rule's inherited attributes. Returns the
    /// start rule's synthesized value, or `None` if it declares no value
    /// type.
    pub fn parse(
        &self,
        input: &str,
        file_index: usize,
        file_name: &str,
        args: Vec<Value>,
    ) -> Result<Option<Value>, ParseError> {
        self.parse_with(input, file_index, file_name, args, ParseOptions::default())
    }

    /// Parse and return the rule trace alongside the result
    pub fn parse_traced(
        &self,
        input: &str,
        file_index: usize,
        file_name: &str,
        args: Vec<Value>,
    ) -> (Result<Option<Value>, ParseError>, ParseTrace) {
        let mut trace = ParseTrace::new();
        let result = self.parse_with(
            input,
            file_index,
            file_name,
            args,
            ParseOptions::new().with_trace(&mut trace),
        );
        (result, trace)
    }

    /// Parse with explicit options
    pub fn parse_with(
        &self,
        input: &str,
        file_index: usize,
        file_name: &str,
        args: Vec<Value>,
        options: ParseOptions<'_>,
    ) -> Result<Option<Value>, ParseError> {
        let ParseOptions {
            config,
            parsing_data,
            trace,
        } = options;

        let chars: Vec<char> = input.chars().collect();
        if config.max_input_size > 0 && chars.len() > config.max_input_size {
            return Err(ParseError::detached(
                ParseErrorKind::InputTooLarge {
                    input_size: chars.len(),
                    max_size: config.max_input_size,
                },
                file_name,
            ));
        }
        let start = self.start().ok_or_else(|| {
            ParseError::detached(
                ParseErrorKind::NoStartRule {
                    grammar: self.grammar.full_name.clone(),
                },
                file_name,
            )
        })?;
        let expected = start.inherited_attributes().len();
        if args.len() != expected {
            return Err(ParseError::detached(
                ParseErrorKind::ArgumentCount {
                    rule: start.full_name().to_string(),
                    expected,
                    given: args.len(),
                },
                file_name,
            ));
        }

        log_debug!(
            "parsing '{}' with grammar {} ({} code points)",
            file_name,
            self.grammar.full_name,
            chars.len()
        );

        let rule_count = self.domain.rule_count();
        let mut owned = None;
        let data = match parsing_data {
            Some(data) => {
                data.reset(rule_count);
                data
            }
            None => owned.insert(ParsingData::new(rule_count)),
        };
        let mut stack = ObjectStack::new();
        for arg in args {
            stack.push(arg);
        }

        let mut scanner = Scanner::new(
            &chars,
            file_index,
            file_name,
            self.domain.rules(),
            self.grammar.skip_rule,
        );
        scanner.set_max_recursion_depth(config.max_recursion_depth);
        if trace.is_some() {
            scanner.enable_trace();
        }

        let result = run_start_rule(start, &mut scanner, &mut stack, data);

        if let (Some(out), Some(recorded)) = (trace, scanner.take_trace()) {
            *out = recorded;
        }
        log_debug!(
            "parse of '{}' finished at offset {}: {}",
            file_name,
            scanner.position(),
            if result.is_ok() { "ok" } else { "error" }
        );
        result
    }
}

impl<'d> Deref for GrammarRef<'d> {
    type Target = Grammar;

    fn deref(&self) -> &Grammar {
        self.grammar
    }
}

fn run_start_rule(
    start: &Rule,
    scanner: &mut Scanner<'_>,
    stack: &mut ObjectStack,
    data: &mut ParsingData,
) -> Result<Option<Value>, ParseError> {
    scanner.skip(stack, data)?;
    let m = start.parse(scanner, stack, data)?;
    if m.hit() {
        scanner.skip(stack, data)?;
    }
    if !m.hit() || !scanner.at_end() {
        return Err(scanner.error(
            ParseErrorKind::Expected {
                expected: start.info(),
            },
            scanner.span(),
        ));
    }
    let value = if start.has_value() {
        Some(
            stack
                .pop()
                .map_err(|e| scanner.action_error(e, scanner.span()))?,
        )
    } else {
        None
    };
    if !stack.is_empty() {
        return Err(scanner.error(
            ParseErrorKind::Internal {
                message: format!("{} values left on the value stack", stack.len()),
            },
            scanner.span(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::super::parser_dsl::*;
    use super::*;

    struct Words;

    impl GrammarDefinition for Words {
        fn name(&self) -> &str {
            "Words"
        }

        fn namespace(&self) -> &str {
            "lang.text"
        }

        fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
            assert_eq!(grammar.full_name(), "lang.text.Words");
            grammar.add_rule(Rule::new("words", identifier() % ','))?;
            grammar.add_rule(Rule::new("ws", char_set(" \t\n").many1()))?;
            grammar.set_skip_rule_name("ws");
            Ok(())
        }
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("", "G"), "G");
        assert_eq!(qualify("a.b", "G"), "a.b.G");
    }

    #[test]
    fn test_grammar_ref_accessors() {
        let mut domain = ParsingDomain::new();
        domain.create(&Words).unwrap();
        let grammar = domain.grammar("lang.text.Words").unwrap();
        assert_eq!(grammar.name(), "Words");
        assert_eq!(grammar.namespace(), "lang.text");
        assert!(grammar.is_linked());
        assert_eq!(grammar.start().map(Rule::name), Some("words"));
        assert_eq!(grammar.skip().map(Rule::name), Some("ws"));
        assert_eq!(grammar.rules().count(), 2);
        assert_eq!(
            grammar.rule("words").map(Rule::full_name),
            Some("lang.text.Words.words")
        );
    }

    #[test]
    fn test_parse_skips_leading_and_trailing_trivia() {
        let mut domain = ParsingDomain::new();
        domain.create(&Words).unwrap();
        let grammar = domain.grammar("lang.text.Words").unwrap();
        assert_eq!(grammar.parse("  a , b,c \n", 0, "w", Vec::new()), Ok(None));
    }

    #[test]
    fn test_incomplete_parse_reports_stop_position() {
        let mut domain = ParsingDomain::new();
        domain.create(&Words).unwrap();
        let grammar = domain.grammar("lang.text.Words").unwrap();
        let err = grammar.parse("a, b;", 0, "w", Vec::new()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Expected { expected: "words".into() });
        assert_eq!(err.span.start, 4);
    }

    #[test]
    fn test_input_limit_and_arguments() {
        let mut domain = ParsingDomain::new();
        domain.create(&Words).unwrap();
        let grammar = domain.grammar("lang.text.Words").unwrap();
        let options = ParseOptions::new().with_config(ParserConfig::new().with_max_input_size(3));
        let err = grammar
            .parse_with("abcd", 0, "w", Vec::new(), options)
            .unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InputTooLarge { input_size: 4, .. }));

        let err = grammar.parse("a", 0, "w", vec![Value::Nil]).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::ArgumentCount { expected: 0, given: 1, .. }));
    }

    #[test]
    fn test_caller_parsing_data_is_balanced_after_parse() {
        let mut domain = ParsingDomain::new();
        domain.create(&Words).unwrap();
        let grammar = domain.grammar("lang.text.Words").unwrap();
        let mut data = ParsingData::new(0);
        grammar
            .parse_with(
                "x, y",
                0,
                "w",
                Vec::new(),
                ParseOptions::new().with_parsing_data(&mut data),
            )
            .unwrap();
        assert!(data.is_balanced());
        assert!(data.push_count() > 1);
    }
}
