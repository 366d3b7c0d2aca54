//! Shared helpers for integration tests

#![allow(dead_code)]

use std::cell::RefCell;

use pegworks::prelude::*;

/// A grammar whose rules are supplied by the test
pub struct TestGrammar {
    name: String,
    skip: Option<String>,
    rules: RefCell<Vec<Rule>>,
}

impl TestGrammar {
    pub fn new(name: &str, rules: Vec<Rule>) -> Self {
        Self {
            name: name.to_string(),
            skip: None,
            rules: RefCell::new(rules),
        }
    }

    pub fn skip(mut self, rule: &str) -> Self {
        self.skip = Some(rule.to_string());
        self
    }
}

impl GrammarDefinition for TestGrammar {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
        for rule in self.rules.borrow_mut().drain(..) {
            grammar.add_rule(rule)?;
        }
        if let Some(skip) = &self.skip {
            grammar.set_skip_rule_name(skip);
        }
        Ok(())
    }
}

/// Domain holding one grammar named `Test`
pub fn domain(rules: Vec<Rule>) -> ParsingDomain {
    let mut domain = ParsingDomain::new();
    domain
        .create(&TestGrammar::new("Test", rules))
        .expect("test grammar should link");
    domain
}

/// Domain holding one grammar named `Test` whose skip rule eats blanks
pub fn domain_with_spaces(mut rules: Vec<Rule>) -> ParsingDomain {
    rules.push(Rule::new("spaces", char_set(" \t\r\n").many1()));
    let mut domain = ParsingDomain::new();
    domain
        .create(&TestGrammar::new("Test", rules).skip("spaces"))
        .expect("test grammar should link");
    domain
}

/// Parse `input` with the start rule of `Test`
pub fn parse(domain: &ParsingDomain, input: &str) -> Result<Option<Value>, ParseError> {
    domain
        .grammar("Test")
        .expect("grammar Test")
        .parse(input, 0, "test", Vec::new())
}

/// Check if the start rule of `Test` accepts all of `input`
pub fn accepts(domain: &ParsingDomain, input: &str) -> bool {
    parse(domain, input).is_ok()
}

/// Accepts `p` as the whole input
pub fn accepts_parser(p: Parser, input: &str) -> bool {
    accepts(&domain(vec![Rule::new("start", p)]), input)
}
