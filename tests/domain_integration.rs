//! Integration tests for grammar construction and the parsing domain
//!
//! These tests cover:
//! - Lazy construction of referenced grammars, exactly once
//! - Rule links and qualified names across grammars and namespaces
//! - Construction errors
//! - Traces, limits and concurrent parses on a shared domain

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::TestGrammar;
use pegworks::prelude::*;

// ============================================================================
// Lazy Construction
// ============================================================================

struct Digits<'c> {
    builds: &'c AtomicUsize,
}

impl GrammarDefinition for Digits<'_> {
    fn name(&self) -> &str {
        "Digits"
    }

    fn namespace(&self) -> &str {
        "lex"
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        grammar.add_rule(
            Rule::new("digit", char_set("0-9").action("d"))
                .value_type("int")
                .on_action("d", |scope| {
                    let n = scope.text().parse::<i64>().map_err(|e| ActionError::msg(e.to_string()))?;
                    scope.context_mut().set_value(n);
                    Ok(())
                }),
        )?;
        Ok(())
    }
}

/// References `Digits` and uses its rule through a link
struct Left<'c> {
    builds: &'c AtomicUsize,
}

impl GrammarDefinition for Left<'_> {
    fn name(&self) -> &str {
        "Left"
    }

    fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_grammar_reference(&Digits { builds: self.builds })?;
        Ok(())
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_rule(Rule::new("left", chr('<') >> nonterminal("d") >> '>'))?;
        grammar.add_rule_link("d", "Digits.digit")?;
        Ok(())
    }
}

/// References `Digits` and uses its rule by qualified name
struct Right<'c> {
    builds: &'c AtomicUsize,
}

impl GrammarDefinition for Right<'_> {
    fn name(&self) -> &str {
        "Right"
    }

    fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_grammar_reference(&Digits { builds: self.builds })?;
        Ok(())
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_rule(Rule::new(
            "right",
            chr('[') >> nonterminal("lex.Digits.digit") >> ']',
        ))?;
        Ok(())
    }
}

struct Top<'c> {
    builds: &'c AtomicUsize,
}

impl GrammarDefinition for Top<'_> {
    fn name(&self) -> &str {
        "Top"
    }

    fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_grammar_reference(&Left { builds: self.builds })?;
        grammar.add_grammar_reference(&Right { builds: self.builds })?;
        Ok(())
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_rule(Rule::new(
            "top",
            (nonterminal("left") | nonterminal("right")).many1(),
        ))?;
        Ok(())
    }
}

#[test]
fn test_diamond_dependency_constructed_once() {
    let builds = AtomicUsize::new(0);
    let mut domain = ParsingDomain::new();
    domain.create(&Top { builds: &builds }).unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    // creating a dependent later reuses the registered grammar
    domain.create(&Right { builds: &builds }).unwrap();
    domain.create(&Digits { builds: &builds }).unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    let names: Vec<String> = domain.grammars().map(|g| g.full_name().to_string()).collect();
    assert_eq!(names, vec!["Top", "Left", "lex.Digits", "Right"]);

    let grammar = domain.grammar("Top").unwrap();
    assert!(grammar.parse("<1>[2]<3>", 0, "t", Vec::new()).is_ok());
    assert!(grammar.parse("<1>[x]", 0, "t", Vec::new()).is_err());
}

#[test]
fn test_rules_are_numbered_across_grammars() {
    let builds = AtomicUsize::new(0);
    let mut domain = ParsingDomain::new();
    domain.create(&Top { builds: &builds }).unwrap();
    let ids: Vec<usize> = domain.rules().iter().map(|r| r.id().index()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
    assert_eq!(domain.next_rule_id().index(), 4);
    assert_eq!(
        domain.find_rule("lex.Digits.digit").map(|r| r.id().index()),
        Some(0)
    );
}

// ============================================================================
// Links Across Grammars
// ============================================================================

struct Calc;

impl GrammarDefinition for Calc {
    fn name(&self) -> &str {
        "Calc"
    }

    fn namespace(&self) -> &str {
        "app"
    }

    fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_grammar_reference(&Digits {
            builds: &AtomicUsize::new(0),
        })?;
        Ok(())
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_rule(
            Rule::new("sum", (nonterminal("num") % '+').action("total"))
                .value_type("int")
                .local_variable("acc", "int")
                .post_call("num", |context, value| {
                    let acc = context.local("acc").and_then(Value::as_int).unwrap_or(0);
                    let n: i64 = value.into_typed()?;
                    context.set_local("acc", Value::Int(acc + n));
                    Ok(())
                })
                .on_action("total", |scope| {
                    let acc = scope.context().local("acc").cloned().unwrap_or_default();
                    scope.context_mut().set_value(acc);
                    Ok(())
                }),
        )?;
        grammar.add_rule_link("num", "digit")?;
        Ok(())
    }
}

#[test]
fn test_rule_link_carries_values_across_grammars() {
    let mut domain = ParsingDomain::new();
    domain.create(&Calc).unwrap();
    let grammar = domain.grammar("app.Calc").unwrap();
    assert_eq!(
        grammar.parse("1+2+3+4", 0, "calc", Vec::new()).unwrap(),
        Some(Value::Int(10))
    );
    let link = &grammar.links()[0];
    assert_eq!(link.alias(), "num");
    assert_eq!(
        link.rule(),
        domain.find_rule("lex.Digits.digit").map(Rule::id)
    );
}

struct Ping;
struct Pong;

impl GrammarDefinition for Ping {
    fn name(&self) -> &str {
        "Ping"
    }

    fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_grammar_reference(&Pong)?;
        Ok(())
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_rule(Rule::new("ping", chr('a') >> nonterminal("Pong.pong").optional()))?;
        Ok(())
    }
}

impl GrammarDefinition for Pong {
    fn name(&self) -> &str {
        "Pong"
    }

    fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_grammar_reference(&Ping)?;
        Ok(())
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_rule(Rule::new("pong", chr('b') >> nonterminal("ping").optional()))?;
        Ok(())
    }
}

#[test]
fn test_mutually_referencing_grammars() {
    let mut domain = ParsingDomain::new();
    domain.create(&Ping).unwrap();
    let ping = domain.grammar("Ping").unwrap();
    assert_eq!(ping.references().len(), 1);
    assert!(ping.parse("ababa", 0, "t", Vec::new()).is_ok());
    assert!(ping.parse("abba", 0, "t", Vec::new()).is_err());
    let pong = domain.grammar("Pong").unwrap();
    assert!(pong.parse("bab", 0, "t", Vec::new()).is_ok());
}

// ============================================================================
// Construction Errors
// ============================================================================

#[test]
fn test_unresolved_rule_name() {
    let mut domain = ParsingDomain::new();
    let result = domain.create(&TestGrammar::new(
        "Broken",
        vec![Rule::new("start", nonterminal("Nowhere.rule"))],
    ));
    assert_eq!(
        result,
        Err(ConstructionError::UnresolvedRule {
            grammar: "Broken".into(),
            rule: "Broken.start".into(),
            name: "Nowhere.rule".into(),
        })
    );
}

#[test]
fn test_unresolved_rule_link() {
    let mut domain = ParsingDomain::new();
    struct Dangling;
    impl GrammarDefinition for Dangling {
        fn name(&self) -> &str {
            "Dangling"
        }
        fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
            grammar.add_rule(Rule::new("start", nonterminal("x")))?;
            grammar.add_rule_link("x", "Other.x")?;
            Ok(())
        }
    }
    assert!(matches!(
        domain.create(&Dangling),
        Err(ConstructionError::UnresolvedRuleLink { ref alias, .. }) if alias == "x"
    ));
}

#[test]
fn test_duplicate_grammar_name() {
    let mut domain = ParsingDomain::new();
    domain
        .create(&TestGrammar::new("Test", vec![Rule::new("a", chr('a'))]))
        .unwrap();
    assert_eq!(
        domain.add_grammar("Test", ""),
        Err(ConstructionError::DuplicateGrammar {
            name: "Test".into()
        })
    );
    // same name in another namespace is a different grammar
    assert!(domain.add_grammar("Test", "other").is_ok());
}

#[test]
fn test_duplicate_rule_name() {
    let mut domain = ParsingDomain::new();
    let result = domain.create(&TestGrammar::new(
        "Twice",
        vec![Rule::new("a", chr('a')), Rule::new("a", chr('b'))],
    ));
    assert!(matches!(
        result,
        Err(ConstructionError::DuplicateRule { ref rule, .. }) if rule == "a"
    ));
}

struct Broken;

impl GrammarDefinition for Broken {
    fn name(&self) -> &str {
        "Broken"
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_rule(Rule::new("a", chr('a')))?;
        grammar.add_rule(Rule::new("a", chr('b')))?;
        grammar.add_rule(Rule::new("tail", chr('c')))?;
        Ok(())
    }
}

struct UsesBroken;

impl GrammarDefinition for UsesBroken {
    fn name(&self) -> &str {
        "UsesBroken"
    }

    fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_grammar_reference(&Broken)?;
        Ok(())
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_rule(Rule::new("start", nonterminal("a")))?;
        Ok(())
    }
}

#[test]
fn test_failed_construction_is_not_memoized() {
    let mut domain = ParsingDomain::new();
    let duplicate = ConstructionError::DuplicateRule {
        grammar: "Broken".into(),
        rule: "a".into(),
    };
    assert_eq!(domain.create(&Broken), Err(duplicate.clone()));
    // retrying runs the definition again and fails the same way
    assert_eq!(domain.create(&Broken), Err(duplicate.clone()));
    assert!(domain.grammar("Broken").is_none());
    assert_eq!(domain.rule_count(), 0);

    // a failing reference takes the referencing grammar down with it
    assert_eq!(domain.create(&UsesBroken), Err(duplicate));
    assert!(domain.grammar("UsesBroken").is_none());
    assert!(domain.grammar("Broken").is_none());

    // unrelated grammars still build and link
    let id = domain
        .create(&TestGrammar::new("Fine", vec![Rule::new("x", chr('x'))]))
        .unwrap();
    assert_eq!(domain.grammars().count(), 1);
    assert_eq!(domain.grammar_by_id(id).full_name(), "Fine");
    assert!(domain.grammar("Fine").unwrap().parse("x", 0, "t", Vec::new()).is_ok());
}

#[test]
fn test_reference_by_unknown_name() {
    struct ByName;
    impl GrammarDefinition for ByName {
        fn name(&self) -> &str {
            "ByName"
        }
        fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
            grammar.add_grammar_reference_by_name("lex.Missing")?;
            Ok(())
        }
        fn create_rules(&self, _grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
            Ok(())
        }
    }
    let mut domain = ParsingDomain::new();
    assert_eq!(
        domain.create(&ByName),
        Err(ConstructionError::UnknownGrammar {
            name: "lex.Missing".into()
        })
    );
}

#[test]
fn test_grammar_without_rules_has_no_start() {
    let mut domain = ParsingDomain::new();
    domain.create(&TestGrammar::new("Empty", Vec::new())).unwrap();
    let err = domain
        .grammar("Empty")
        .unwrap()
        .parse("", 0, "t", Vec::new())
        .unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::NoStartRule {
            grammar: "Empty".into()
        }
    );
}

#[test]
fn test_crate_error_wraps_both_kinds() {
    fn build_and_parse(input: &str) -> Result<Option<Value>, Error> {
        let mut domain = ParsingDomain::new();
        domain.create(&TestGrammar::new("Test", vec![Rule::new("a", chr('a'))]))?;
        let grammar = domain.grammar("Test").ok_or_else(|| ConstructionError::UnknownGrammar {
            name: "Test".into(),
        })?;
        Ok(grammar.parse(input, 0, "t", Vec::new())?)
    }
    assert!(build_and_parse("a").is_ok());
    assert!(matches!(build_and_parse("b"), Err(Error::Parse(_))));
}

// ============================================================================
// Traces and Limits
// ============================================================================

#[test]
fn test_trace_records_rule_events_outside_skip() {
    let d = common::domain_with_spaces(vec![
        Rule::new("list", nonterminal("item") % ','),
        Rule::new("item", char_set("a-z").many1().token()),
    ]);
    let grammar = d.grammar("Test").unwrap();
    let (result, trace) = grammar.parse_traced("a , bc", 0, "t", Vec::new());
    assert!(result.is_ok());
    assert!(trace.entries.iter().all(|e| e.rule != "Test.spaces"));
    let items: Vec<TraceAction> = trace.entries_for("Test.item").map(|e| e.action).collect();
    assert_eq!(
        items,
        vec![
            TraceAction::Enter,
            TraceAction::Match { length: 1 },
            TraceAction::Enter,
            TraceAction::Match { length: 2 },
        ]
    );
    let last = trace.entries.last().unwrap();
    assert_eq!(last.rule, "Test.list");
    assert_eq!(last.action, TraceAction::Match { length: 4 });
    assert_eq!((last.span.start, last.span.end), (0, 6));
}

#[test]
fn test_recursion_limit() {
    let d = common::domain(vec![Rule::new(
        "nest",
        chr('(') >> nonterminal("nest").optional() >> ')',
    )]);
    let grammar = d.grammar("Test").unwrap();
    let options = |depth| ParseOptions::new().with_config(ParserConfig::new().with_max_recursion_depth(depth));
    assert!(grammar
        .parse_with("((()))", 0, "t", Vec::new(), options(4))
        .is_ok());
    let err = grammar
        .parse_with("((()))", 0, "t", Vec::new(), options(2))
        .unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::RecursionLimitExceeded { max_depth: 2 });
    assert!(grammar.parse("((((((()))))))", 0, "t", Vec::new()).is_ok());
}

#[test]
fn test_input_size_limit() {
    let d = common::domain(vec![Rule::new("any", any_char().many())]);
    let grammar = d.grammar("Test").unwrap();
    let config = ParserConfig::new().with_max_input_size(4);
    let options = ParseOptions::new().with_config(config);
    let err = grammar
        .parse_with("ünïcödé", 0, "t", Vec::new(), options)
        .unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::InputTooLarge {
            input_size: 7,
            max_size: 4
        }
    );
}

// ============================================================================
// Sharing and Analysis
// ============================================================================

#[test]
fn test_concurrent_parses_on_shared_domain() {
    let mut domain = ParsingDomain::new();
    domain.create(&Calc).unwrap();
    let domain = Arc::new(domain);
    std::thread::scope(|s| {
        for worker in 0..4i64 {
            let domain = Arc::clone(&domain);
            s.spawn(move || {
                let grammar = domain.grammar("app.Calc").unwrap();
                for round in 0..50i64 {
                    let a = (worker + round) % 10;
                    let b = round % 10;
                    let input = format!("{a}+{b}");
                    let value = grammar.parse(&input, 0, "t", Vec::new()).unwrap();
                    assert_eq!(value, Some(Value::Int(a + b)));
                }
            });
        }
    });
}

struct LoopA;
struct LoopB;

impl GrammarDefinition for LoopA {
    fn name(&self) -> &str {
        "LoopA"
    }

    fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_grammar_reference(&LoopB)?;
        Ok(())
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_rule(Rule::new("x", nonterminal("LoopB.y") >> 'a' | chr('c')))?;
        Ok(())
    }
}

impl GrammarDefinition for LoopB {
    fn name(&self) -> &str {
        "LoopB"
    }

    fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_grammar_reference(&LoopA)?;
        Ok(())
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        grammar.add_rule(Rule::new("y", chr(' ').many() >> nonterminal("LoopA.x") >> 'b'))?;
        Ok(())
    }
}

#[test]
fn test_left_recursion_detected_across_grammars() {
    let mut domain = ParsingDomain::new();
    domain.create(&LoopA).unwrap();
    let analyzer = GrammarAnalyzer::new(&domain);
    let warnings = analyzer.analyze();
    let recursive: Vec<&str> = warnings
        .iter()
        .filter(|w| w.kind == WarningKind::LeftRecursion)
        .map(|w| domain.rule(w.rule).full_name())
        .collect();
    assert_eq!(recursive, vec!["LoopA.x", "LoopB.y"]);
    assert!(warnings[0].message.contains("LoopA.x -> LoopB.y -> LoopA.x"));

    let sums = {
        let mut domain = ParsingDomain::new();
        domain.create(&Calc).unwrap();
        GrammarAnalyzer::new(&domain)
            .analyze()
            .into_iter()
            .filter(|w| w.kind == WarningKind::LeftRecursion)
            .count()
    };
    assert_eq!(sums, 0);
}
