//! Parsing domain
//!
//! The [`ParsingDomain`] is the registry of grammars, namespaces and rules.
//! Grammars are constructed lazily: [`ParsingDomain::create`] builds the
//! requested grammar and, transitively, every grammar it references, each
//! exactly once, and then runs the link pass that resolves rule names,
//! binds action handlers and nonterminal hooks, and fixes the start and
//! skip rules.
//!
//! After linking the domain is read-only; parsing borrows it immutably, so
//! a domain can be shared between threads.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ConstructionError;
use super::grammar::{qualify, Grammar, GrammarBuilder, GrammarDefinition, GrammarRef, RuleLink};
use super::parser::{Parser, RuleRef};
use super::rule::{ActionHandlers, NonterminalHooks, Rule, RuleId};

/// Index of a grammar in its domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrammarId(usize);

impl GrammarId {
    /// Create from a raw index
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Raw index
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GrammarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

/// Index of a namespace scope; 0 is the global scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    pub(crate) const GLOBAL: ScopeId = ScopeId(0);
}

#[derive(Debug)]
struct Scope {
    full_name: String,
    parent: Option<ScopeId>,
    children: HashMap<String, ScopeId>,
    grammars: HashMap<String, GrammarId>,
}

impl Scope {
    fn new(full_name: String, parent: Option<ScopeId>) -> Self {
        Self {
            full_name,
            parent,
            children: HashMap::new(),
            grammars: HashMap::new(),
        }
    }
}

/// Registry of grammars and rules
#[derive(Debug)]
pub struct ParsingDomain {
    scopes: Vec<Scope>,
    grammars: Vec<Grammar>,
    registry: HashMap<String, GrammarId>,
    rules: Vec<Rule>,
}

impl Default for ParsingDomain {
    fn default() -> Self {
        Self::new()
    }
}

impl ParsingDomain {
    /// Create an empty domain
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(String::new(), None)],
            grammars: Vec::new(),
            registry: HashMap::new(),
            rules: Vec::new(),
        }
    }

    /// Construct a grammar and everything it references, then link
    ///
    /// Creating a grammar that already exists returns its id without
    /// running its definition again.
    pub fn create(&mut self, definition: &dyn GrammarDefinition) -> Result<GrammarId, ConstructionError> {
        let id = self.ensure_grammar(definition)?;
        self.link()?;
        Ok(id)
    }

    /// Construct a grammar unless one with the same qualified name exists
    ///
    /// The grammar is registered before its references are processed, so
    /// reference cycles terminate. If the definition fails, the grammar and
    /// everything constructed on its behalf are removed again.
    pub(crate) fn ensure_grammar(
        &mut self,
        definition: &dyn GrammarDefinition,
    ) -> Result<GrammarId, ConstructionError> {
        let qualified = qualify(definition.namespace(), definition.name());
        if let Some(&id) = self.registry.get(&qualified) {
            return Ok(id);
        }
        log_debug!("constructing grammar {}", qualified);
        let rule_mark = self.rules.len();
        let id = self.add_grammar(definition.name(), definition.namespace())?;
        let mut builder = GrammarBuilder::new(self, id);
        let built = definition
            .referenced_grammars(&mut builder)
            .and_then(|()| definition.create_rules(&mut builder));
        if let Err(e) = built {
            log_debug!("construction of grammar {} failed: {}", qualified, e);
            self.roll_back(id, rule_mark);
            return Err(e);
        }
        Ok(id)
    }

    /// Forget every grammar from `first` on and every rule from `rule_mark` on
    fn roll_back(&mut self, first: GrammarId, rule_mark: usize) {
        for grammar in self.grammars.drain(first.index()..) {
            self.registry.remove(&grammar.full_name);
            self.scopes[grammar.scope.0].grammars.remove(&grammar.name);
        }
        self.rules.truncate(rule_mark);
    }

    /// Register an empty grammar
    pub fn add_grammar(&mut self, name: &str, namespace: &str) -> Result<GrammarId, ConstructionError> {
        let qualified = qualify(namespace, name);
        if self.registry.contains_key(&qualified) {
            return Err(ConstructionError::DuplicateGrammar { name: qualified });
        }
        let scope = self.namespace_scope(namespace);
        let id = GrammarId::new(self.grammars.len());
        self.grammars.push(Grammar::new(id, name, namespace, scope));
        self.registry.insert(qualified, id);
        self.scopes[scope.0].grammars.insert(name.to_string(), id);
        Ok(id)
    }

    fn namespace_scope(&mut self, namespace: &str) -> ScopeId {
        let mut scope = ScopeId::GLOBAL;
        if namespace.is_empty() {
            return scope;
        }
        for part in namespace.split('.') {
            scope = match self.scopes[scope.0].children.get(part) {
                Some(&child) => child,
                None => {
                    let child = ScopeId(self.scopes.len());
                    let full_name = qualify(&self.scopes[scope.0].full_name, part);
                    self.scopes.push(Scope::new(full_name, Some(scope)));
                    self.scopes[scope.0].children.insert(part.to_string(), child);
                    child
                }
            };
        }
        scope
    }

    pub(crate) fn add_rule(&mut self, grammar: GrammarId, mut rule: Rule) -> Result<RuleId, ConstructionError> {
        let g = &self.grammars[grammar.index()];
        if g.rule_names.contains_key(rule.name()) || g.links.iter().any(|l| l.alias == rule.name()) {
            return Err(ConstructionError::DuplicateRule {
                grammar: g.full_name.clone(),
                rule: rule.name().to_string(),
            });
        }
        let id = self.next_rule_id();
        rule.id = id;
        rule.grammar = Some(grammar);
        rule.full_name = qualify(&g.full_name, rule.name());
        let g = &mut self.grammars[grammar.index()];
        g.rules.push(id);
        g.rule_names.insert(rule.name().to_string(), id);
        g.linked = false;
        self.rules.push(rule);
        Ok(id)
    }

    pub(crate) fn add_rule_link(
        &mut self,
        grammar: GrammarId,
        alias: &str,
        target: &str,
    ) -> Result<(), ConstructionError> {
        let g = &mut self.grammars[grammar.index()];
        if g.rule_names.contains_key(alias) || g.links.iter().any(|l| l.alias == alias) {
            return Err(ConstructionError::DuplicateRule {
                grammar: g.full_name.clone(),
                rule: alias.to_string(),
            });
        }
        g.links.push(RuleLink {
            alias: alias.to_string(),
            target: target.to_string(),
            rule: None,
        });
        g.linked = false;
        Ok(())
    }

    pub(crate) fn add_reference(&mut self, grammar: GrammarId, referenced: GrammarId) {
        let g = &mut self.grammars[grammar.index()];
        if referenced != grammar && !g.references.contains(&referenced) {
            g.references.push(referenced);
        }
    }

    pub(crate) fn grammar_data(&self, id: GrammarId) -> &Grammar {
        &self.grammars[id.index()]
    }

    pub(crate) fn grammar_data_mut(&mut self, id: GrammarId) -> &mut Grammar {
        &mut self.grammars[id.index()]
    }

    /// Look up a grammar by qualified name
    pub fn grammar(&self, qualified_name: &str) -> Option<GrammarRef<'_>> {
        self.grammar_id(qualified_name).map(|id| self.grammar_by_id(id))
    }

    /// Id of the grammar registered under `qualified_name`
    pub fn grammar_id(&self, qualified_name: &str) -> Option<GrammarId> {
        self.registry.get(qualified_name).copied()
    }

    /// Grammar by id
    pub fn grammar_by_id(&self, id: GrammarId) -> GrammarRef<'_> {
        GrammarRef::new(self, &self.grammars[id.index()])
    }

    /// All grammars, in registration order
    pub fn grammars(&self) -> impl Iterator<Item = GrammarRef<'_>> + '_ {
        self.grammars.iter().map(move |g| GrammarRef::new(self, g))
    }

    /// Rule table
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rule by id
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    /// Number of rules across all grammars
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Id the next added rule will get
    pub fn next_rule_id(&self) -> RuleId {
        RuleId::new(self.rules.len())
    }

    /// Find a rule by its fully qualified name
    pub fn find_rule(&self, qualified_name: &str) -> Option<&Rule> {
        let (grammar, rule) = qualified_name.rsplit_once('.')?;
        let id = self.grammar_id(grammar)?;
        self.grammars[id.index()]
            .rule_id(rule)
            .map(|id| self.rule(id))
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    /// Resolve a rule name as seen from `grammar`
    ///
    /// A short name is looked up among the grammar's own rules, then its
    /// rule links, then the rules of referenced grammars in declaration
    /// order. A dotted name `path.rule` resolves `path` to a grammar first:
    /// the grammar itself, a referenced grammar, or a grammar in an
    /// enclosing namespace.
    pub fn resolve_rule(&self, grammar: GrammarId, name: &str) -> Option<RuleId> {
        self.resolve_name(grammar, name, &mut HashSet::new())
    }

    fn resolve_name(
        &self,
        grammar: GrammarId,
        name: &str,
        visiting: &mut HashSet<(GrammarId, String)>,
    ) -> Option<RuleId> {
        if let Some((path, rule_name)) = name.rsplit_once('.') {
            let target = self.resolve_grammar_path(grammar, path)?;
            return self.resolve_local(target, rule_name, visiting);
        }
        if let Some(id) = self.resolve_local(grammar, name, visiting) {
            return Some(id);
        }
        for &referenced in &self.grammars[grammar.index()].references {
            if let Some(id) = self.resolve_local(referenced, name, visiting) {
                return Some(id);
            }
        }
        None
    }

    fn resolve_local(
        &self,
        grammar: GrammarId,
        name: &str,
        visiting: &mut HashSet<(GrammarId, String)>,
    ) -> Option<RuleId> {
        let g = &self.grammars[grammar.index()];
        if let Some(&id) = g.rule_names.get(name) {
            return Some(id);
        }
        let link = g.links.iter().find(|l| l.alias == name)?;
        if let Some(id) = link.rule {
            return Some(id);
        }
        // an alias naming itself must fall through to the references
        if !visiting.insert((grammar, name.to_string())) {
            return None;
        }
        self.resolve_name(grammar, &link.target, visiting)
    }

    fn resolve_grammar_path(&self, grammar: GrammarId, path: &str) -> Option<GrammarId> {
        let g = &self.grammars[grammar.index()];
        if g.name == path || g.full_name == path {
            return Some(grammar);
        }
        for &referenced in &g.references {
            let r = &self.grammars[referenced.index()];
            if r.name == path || r.full_name == path {
                return Some(referenced);
            }
        }
        let mut scope = Some(g.scope);
        while let Some(current) = scope {
            if let Some(id) = self.lookup_in_scope(current, path) {
                return Some(id);
            }
            scope = self.scopes[current.0].parent;
        }
        None
    }

    fn lookup_in_scope(&self, scope: ScopeId, path: &str) -> Option<GrammarId> {
        let (namespace, name) = match path.rsplit_once('.') {
            Some((namespace, name)) => (Some(namespace), name),
            None => (None, path),
        };
        let mut current = scope;
        if let Some(namespace) = namespace {
            for part in namespace.split('.') {
                current = *self.scopes[current.0].children.get(part)?;
            }
        }
        self.scopes[current.0].grammars.get(name).copied()
    }

    // ========================================================================
    // Link pass
    // ========================================================================

    /// Link every grammar not linked yet
    pub fn link(&mut self) -> Result<(), ConstructionError> {
        for index in 0..self.grammars.len() {
            if !self.grammars[index].linked {
                self.link_grammar(GrammarId::new(index))?;
            }
        }
        Ok(())
    }

    fn link_grammar(&mut self, grammar: GrammarId) -> Result<(), ConstructionError> {
        log_debug!("linking grammar {}", self.grammars[grammar.index()].full_name);

        let mut resolved = Vec::with_capacity(self.grammars[grammar.index()].links.len());
        for link in &self.grammars[grammar.index()].links {
            let target = self.resolve_rule(grammar, &link.target).ok_or_else(|| {
                ConstructionError::UnresolvedRuleLink {
                    grammar: self.grammars[grammar.index()].full_name.clone(),
                    alias: link.alias.clone(),
                    target: link.target.clone(),
                }
            })?;
            resolved.push(target);
        }
        for (link, target) in self.grammars[grammar.index()].links.iter_mut().zip(resolved) {
            link.rule = Some(target);
        }

        let rules = self.grammars[grammar.index()].rules.clone();
        for rule in rules {
            self.link_rule(grammar, rule)?;
        }

        let g = &self.grammars[grammar.index()];
        let start = match &g.start_rule_name {
            Some(name) => Some(self.resolve_required(grammar, name, "<start>")?),
            None => g.rules.first().copied(),
        };
        let skip = match &g.skip_rule_name {
            Some(name) => {
                let id = self.resolve_required(grammar, name, "<skip>")?;
                let expected = self.rule(id).inherited_attributes().len();
                if expected != 0 {
                    return Err(ConstructionError::ArgumentCount {
                        rule: g.full_name.clone(),
                        nonterminal: "<skip>".to_string(),
                        target: self.rule(id).full_name().to_string(),
                        expected,
                        given: 0,
                    });
                }
                Some(id)
            }
            None => None,
        };

        let g = &mut self.grammars[grammar.index()];
        g.start_rule = start;
        g.skip_rule = skip;
        g.linked = true;
        Ok(())
    }

    fn resolve_required(&self, grammar: GrammarId, name: &str, role: &str) -> Result<RuleId, ConstructionError> {
        self.resolve_rule(grammar, name)
            .ok_or_else(|| ConstructionError::UnresolvedRule {
                grammar: self.grammars[grammar.index()].full_name.clone(),
                rule: role.to_string(),
                name: name.to_string(),
            })
    }

    fn link_rule(&mut self, grammar: GrammarId, id: RuleId) -> Result<(), ConstructionError> {
        let rule = &mut self.rules[id.index()];
        let mut definition = std::mem::take(&mut rule.definition);
        let actions = std::mem::take(&mut rule.actions);
        let hooks = std::mem::take(&mut rule.hooks);

        let mut linker = RuleLinker {
            domain: self,
            grammar,
            owner: id,
            actions: &actions,
            hooks: &hooks,
            used_actions: HashSet::new(),
            used_hooks: HashSet::new(),
        };
        let result = linker.link(&mut definition).and_then(|()| linker.check_unused());

        let rule = &mut self.rules[id.index()];
        rule.definition = definition;
        rule.actions = actions;
        rule.hooks = hooks;
        result
    }
}

/// Walks one rule's tree during the link pass
struct RuleLinker<'d> {
    domain: &'d ParsingDomain,
    grammar: GrammarId,
    owner: RuleId,
    actions: &'d HashMap<String, ActionHandlers>,
    hooks: &'d HashMap<String, NonterminalHooks>,
    used_actions: HashSet<String>,
    used_hooks: HashSet<String>,
}

impl RuleLinker<'_> {
    fn owner_name(&self) -> String {
        self.domain.rule(self.owner).full_name().to_string()
    }

    fn link(&mut self, parser: &mut Parser) -> Result<(), ConstructionError> {
        match parser {
            Parser::Action(action) => {
                action.owner = Some(self.owner);
                if let Some(handlers) = self.actions.get(&action.name) {
                    action.handlers = handlers.clone();
                    self.used_actions.insert(action.name.clone());
                }
            }
            Parser::Nonterminal(nonterminal) => {
                let target = self
                    .domain
                    .resolve_rule(self.grammar, &nonterminal.rule_name)
                    .ok_or_else(|| ConstructionError::UnresolvedRule {
                        grammar: self.domain.grammar_data(self.grammar).full_name().to_string(),
                        rule: self.owner_name(),
                        name: nonterminal.rule_name.clone(),
                    })?;
                nonterminal.target = Some(target);
                nonterminal.owner = Some(self.owner);
                if let Some(hooks) = self.hooks.get(&nonterminal.name) {
                    nonterminal.hooks = hooks.clone();
                    self.used_hooks.insert(nonterminal.name.clone());
                }
                // a pre-call hook pushes arguments itself
                if nonterminal.hooks.pre_call.is_none() {
                    let target_rule = self.domain.rule(target);
                    let expected = target_rule.inherited_attributes().len();
                    if expected != nonterminal.arguments.len() {
                        return Err(ConstructionError::ArgumentCount {
                            rule: self.owner_name(),
                            nonterminal: nonterminal.name.clone(),
                            target: target_rule.full_name().to_string(),
                            expected,
                            given: nonterminal.arguments.len(),
                        });
                    }
                }
            }
            Parser::Keyword(keyword) => {
                if let Some(continuation) = keyword.continuation.as_mut() {
                    self.link_ref(continuation)?;
                }
            }
            Parser::KeywordList(list) => {
                if let Some(selector) = list.selector.as_mut() {
                    self.link_ref(selector)?;
                }
            }
            _ => {}
        }
        for child in parser.children_mut() {
            self.link(child)?;
        }
        Ok(())
    }

    fn link_ref(&mut self, rule_ref: &mut RuleRef) -> Result<(), ConstructionError> {
        let target = self
            .domain
            .resolve_rule(self.grammar, &rule_ref.rule_name)
            .ok_or_else(|| ConstructionError::UnresolvedRule {
                grammar: self.domain.grammar_data(self.grammar).full_name().to_string(),
                rule: self.owner_name(),
                name: rule_ref.rule_name.clone(),
            })?;
        let target_rule = self.domain.rule(target);
        let expected = target_rule.inherited_attributes().len();
        if expected != 0 {
            return Err(ConstructionError::ArgumentCount {
                rule: self.owner_name(),
                nonterminal: rule_ref.rule_name.clone(),
                target: target_rule.full_name().to_string(),
                expected,
                given: 0,
            });
        }
        rule_ref.target = Some(target);
        Ok(())
    }

    fn check_unused(&self) -> Result<(), ConstructionError> {
        let mut unused_actions: Vec<&String> = self
            .actions
            .keys()
            .filter(|name| !self.used_actions.contains(*name))
            .collect();
        unused_actions.sort();
        if let Some(action) = unused_actions.first() {
            return Err(ConstructionError::UnknownAction {
                rule: self.owner_name(),
                action: action.to_string(),
            });
        }
        let mut unused_hooks: Vec<&String> = self
            .hooks
            .keys()
            .filter(|name| !self.used_hooks.contains(*name))
            .collect();
        unused_hooks.sort();
        if let Some(nonterminal) = unused_hooks.first() {
            return Err(ConstructionError::UnknownNonterminal {
                rule: self.owner_name(),
                nonterminal: nonterminal.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser_dsl::*;
    use super::*;

    struct Lexical;

    impl GrammarDefinition for Lexical {
        fn name(&self) -> &str {
            "Lexical"
        }

        fn namespace(&self) -> &str {
            "base"
        }

        fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
            grammar.add_rule(Rule::new("ident", identifier()))?;
            grammar.add_rule(Rule::new("spaces", char_set(" \t\r\n").many1()))?;
            Ok(())
        }
    }

    struct Statements;

    impl GrammarDefinition for Statements {
        fn name(&self) -> &str {
            "Statements"
        }

        fn namespace(&self) -> &str {
            "lang"
        }

        fn referenced_grammars(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
            grammar.add_grammar_reference(&Lexical)?;
            Ok(())
        }

        fn create_rules(&self, grammar: &mut GrammarBuilder<'_>) -> Result<(), ConstructionError> {
            grammar.add_rule(Rule::new("statements", nonterminal("statement").many()))?;
            grammar.add_rule(Rule::new(
                "statement",
                keyword("let") >> nonterminal("name") >> ';',
            ))?;
            grammar.add_rule_link("name", "base.Lexical.ident")?;
            grammar.set_skip_rule_name("spaces");
            Ok(())
        }
    }

    #[test]
    fn test_namespaces_and_qualified_names() {
        let mut domain = ParsingDomain::new();
        domain.create(&Statements).unwrap();
        assert!(domain.grammar("lang.Statements").is_some());
        assert!(domain.grammar("base.Lexical").is_some());
        assert!(domain.grammar("Statements").is_none());
        assert_eq!(
            domain.find_rule("base.Lexical.ident").map(Rule::id),
            Some(RuleId::new(0))
        );
        assert_eq!(domain.rule_count(), 4);
        assert!(domain.grammars().all(|g| g.is_linked()));
    }

    #[test]
    fn test_resolution_order() {
        let mut domain = ParsingDomain::new();
        let id = domain.create(&Statements).unwrap();
        let ident = domain.find_rule("base.Lexical.ident").map(Rule::id);
        // through a rule link
        assert_eq!(domain.resolve_rule(id, "name"), ident);
        // through a referenced grammar
        assert_eq!(domain.resolve_rule(id, "ident"), ident);
        // by qualified grammar name, short or full
        assert_eq!(domain.resolve_rule(id, "Lexical.ident"), ident);
        assert_eq!(domain.resolve_rule(id, "base.Lexical.ident"), ident);
        assert_eq!(domain.resolve_rule(id, "missing"), None);

        let g = domain.grammar_by_id(id);
        assert_eq!(g.links()[0].rule(), ident);
        assert_eq!(g.skip().map(Rule::name), Some("spaces"));
    }

    #[test]
    fn test_create_twice_returns_same_grammar() {
        let mut domain = ParsingDomain::new();
        let first = domain.create(&Statements).unwrap();
        let rules = domain.rule_count();
        let second = domain.create(&Statements).unwrap();
        assert_eq!(first, second);
        assert_eq!(domain.rule_count(), rules);
    }

    #[test]
    fn test_duplicate_grammar_and_rule() {
        let mut domain = ParsingDomain::new();
        domain.add_grammar("G", "").unwrap();
        assert_eq!(
            domain.add_grammar("G", ""),
            Err(ConstructionError::DuplicateGrammar { name: "G".into() })
        );
        let id = domain.grammar_id("G").unwrap();
        domain.add_rule(id, Rule::new("a", empty())).unwrap();
        assert!(matches!(
            domain.add_rule(id, Rule::new("a", empty())),
            Err(ConstructionError::DuplicateRule { .. })
        ));
        assert!(matches!(
            domain.add_rule_link(id, "a", "x"),
            Err(ConstructionError::DuplicateRule { .. })
        ));
    }

    #[test]
    fn test_self_named_link_falls_back_to_references() {
        let mut domain = ParsingDomain::new();
        domain.create(&Lexical).unwrap();
        let lexical = domain.grammar_id("base.Lexical").unwrap();
        let g = domain.add_grammar("User", "").unwrap();
        domain.add_reference(g, lexical);
        domain.add_rule_link(g, "ident", "ident").unwrap();
        domain.link().unwrap();
        assert_eq!(
            domain.grammar_by_id(g).links()[0].rule(),
            domain.find_rule("base.Lexical.ident").map(Rule::id)
        );
    }

    #[test]
    fn test_unresolved_names() {
        let mut domain = ParsingDomain::new();
        let g = domain.add_grammar("Broken", "").unwrap();
        domain
            .add_rule(g, Rule::new("start", nonterminal("nowhere")))
            .unwrap();
        assert_eq!(
            domain.link(),
            Err(ConstructionError::UnresolvedRule {
                grammar: "Broken".into(),
                rule: "Broken.start".into(),
                name: "nowhere".into(),
            })
        );
        // the definition is restored after a failed link
        assert!(matches!(
            domain.rule(RuleId::new(0)).definition(),
            Parser::Nonterminal(_)
        ));
    }

    #[test]
    fn test_unknown_action_and_hook() {
        let mut domain = ParsingDomain::new();
        let g = domain.add_grammar("G", "").unwrap();
        domain
            .add_rule(g, Rule::new("r", chr('a').action("a")).on_action("b", |_| Ok(())))
            .unwrap();
        assert!(matches!(
            domain.link(),
            Err(ConstructionError::UnknownAction { ref action, .. }) if action == "b"
        ));

        let mut domain = ParsingDomain::new();
        let g = domain.add_grammar("G", "").unwrap();
        domain.add_rule(g, Rule::new("r", nonterminal("s"))).unwrap();
        domain
            .add_rule(g, Rule::new("s", empty()).post_call("t", |_, _| Ok(())))
            .unwrap();
        assert!(matches!(
            domain.link(),
            Err(ConstructionError::UnknownNonterminal { ref nonterminal, .. }) if nonterminal == "t"
        ));
    }

    #[test]
    fn test_argument_count_checked_at_link() {
        let mut domain = ParsingDomain::new();
        let g = domain.add_grammar("G", "").unwrap();
        domain
            .add_rule(g, Rule::new("caller", nonterminal("callee")))
            .unwrap();
        domain
            .add_rule(g, Rule::new("callee", empty()).inherited_attribute("x", "int"))
            .unwrap();
        assert!(matches!(
            domain.link(),
            Err(ConstructionError::ArgumentCount { expected: 1, given: 0, .. })
        ));
    }

    #[test]
    fn test_start_rule_defaults_to_first() {
        let mut domain = ParsingDomain::new();
        let g = domain.add_grammar("G", "").unwrap();
        let first = domain.add_rule(g, Rule::new("first", empty())).unwrap();
        domain.add_rule(g, Rule::new("second", empty())).unwrap();
        domain.link().unwrap();
        assert_eq!(domain.grammar_by_id(g).start_rule(), Some(first));

        domain.grammar_data_mut(g).start_rule_name = Some("third".into());
        domain.grammar_data_mut(g).linked = false;
        assert!(matches!(
            domain.link(),
            Err(ConstructionError::UnresolvedRule { ref rule, .. }) if rule == "<start>"
        ));
    }
}
