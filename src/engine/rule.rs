//! Grammar rules
//!
//! A [`Rule`] is a named parser tree with an attribute contract:
//! inherited attributes it pops off the value stack when it enters, local
//! variables, and an optional value type saying it pushes a synthesized
//! value when it leaves.
//!
//! Semantic behavior is attached by name and bound when the domain links:
//!
//! - success/failure handlers for the [`Action`](super::parser::Parser::Action)
//!   nodes of the rule's tree, by action name,
//! - pre/post-call hooks for its
//!   [`Nonterminal`](super::parser::Parser::Nonterminal) nodes, by instance
//!   name.
//!
//! ```rust
//! use pegworks::prelude::*;
//!
//! let rule = Rule::new("number", char_set("0-9").many1().token().action("digits"))
//!     .value_type("int")
//!     .on_action("digits", |scope| {
//!         let n: i64 = scope.text().parse().map_err(|_| ActionError::msg("bad number"))?;
//!         scope.context_mut().set_value(n);
//!         Ok(())
//!     });
//! assert!(rule.has_value());
//! ```

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::context::{Context, ObjectStack, ParsingData};
use super::domain::GrammarId;
use super::error::{ActionError, ParseError};
use super::object::Value;
use super::parser::{Match, Parser};
use super::scanner::Scanner;
use super::source_location::Span;

/// Dense index of a rule in its parsing domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(usize);

impl RuleId {
    /// Wrap a raw index
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Raw index
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handler run when an action's child matches
pub type SuccessAction = Arc<dyn Fn(&mut ActionScope<'_>) -> Result<(), ActionError> + Send + Sync>;

/// Handler run when an action's child fails softly
pub type FailureAction = Arc<dyn Fn(&mut Context) -> Result<(), ActionError> + Send + Sync>;

/// Hook replacing argument evaluation before a nonterminal calls its rule
pub type PreCall = Arc<dyn Fn(&Context, &mut ObjectStack) -> Result<(), ActionError> + Send + Sync>;

/// Hook receiving the called rule's value instead of the `from` slot
pub type PostCall = Arc<dyn Fn(&mut Context, Value) -> Result<(), ActionError> + Send + Sync>;

/// Handlers bound to one action name
#[derive(Clone, Default)]
pub struct ActionHandlers {
    pub(crate) success: Option<SuccessAction>,
    pub(crate) failure: Option<FailureAction>,
}

impl fmt::Debug for ActionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandlers")
            .field("success", &self.success.is_some())
            .field("failure", &self.failure.is_some())
            .finish()
    }
}

/// Hooks bound to one nonterminal instance name
#[derive(Clone, Default)]
pub struct NonterminalHooks {
    pub(crate) pre_call: Option<PreCall>,
    pub(crate) post_call: Option<PostCall>,
}

impl fmt::Debug for NonterminalHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonterminalHooks")
            .field("pre_call", &self.pre_call.is_some())
            .field("post_call", &self.post_call.is_some())
            .finish()
    }
}

/// What a success handler sees
pub struct ActionScope<'s> {
    text: &'s str,
    span: Span,
    file_name: &'s str,
    context: &'s mut Context,
    pass: bool,
}

impl<'s> ActionScope<'s> {
    pub(crate) fn new(
        text: &'s str,
        span: Span,
        file_name: &'s str,
        context: &'s mut Context,
    ) -> Self {
        Self {
            text,
            span,
            file_name,
            context,
            pass: true,
        }
    }

    /// Matched text
    pub fn text(&self) -> &str {
        self.text
    }

    /// Matched span
    pub fn span(&self) -> Span {
        self.span
    }

    /// File being parsed
    pub fn file_name(&self) -> &str {
        self.file_name
    }

    /// Context of the rule owning the action
    pub fn context(&self) -> &Context {
        &*self.context
    }

    /// Mutable context of the rule owning the action
    pub fn context_mut(&mut self) -> &mut Context {
        &mut *self.context
    }

    /// Turn the match into a soft failure
    pub fn reject(&mut self) {
        self.pass = false;
    }

    /// Whether the match stands
    pub fn passed(&self) -> bool {
        self.pass
    }
}

/// Declared attribute or local variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrDecl {
    /// Variable name
    pub name: String,
    /// Type name, informational
    pub type_name: String,
}

/// A named parser tree with its attribute contract
#[derive(Debug)]
pub struct Rule {
    pub(crate) id: RuleId,
    pub(crate) grammar: Option<GrammarId>,
    name: String,
    pub(crate) full_name: String,
    inherited_attributes: Vec<AttrDecl>,
    local_variables: Vec<AttrDecl>,
    value_type: Option<String>,
    pub(crate) definition: Parser,
    pub(crate) actions: HashMap<String, ActionHandlers>,
    pub(crate) hooks: HashMap<String, NonterminalHooks>,
}

impl Rule {
    /// Create a rule; the id is assigned when it is added to a grammar
    pub fn new(name: impl Into<String>, definition: impl Into<Parser>) -> Self {
        let name = name.into();
        Self {
            id: RuleId::new(usize::MAX),
            grammar: None,
            full_name: name.clone(),
            name,
            inherited_attributes: Vec::new(),
            local_variables: Vec::new(),
            value_type: None,
            definition: definition.into(),
            actions: HashMap::new(),
            hooks: HashMap::new(),
        }
    }

    /// Declare an inherited attribute; arguments bind in declaration order
    pub fn inherited_attribute(mut self, name: &str, type_name: &str) -> Self {
        self.inherited_attributes.push(AttrDecl {
            name: name.to_string(),
            type_name: type_name.to_string(),
        });
        self
    }

    /// Declare a local variable, initialised to nil on entry
    pub fn local_variable(mut self, name: &str, type_name: &str) -> Self {
        self.local_variables.push(AttrDecl {
            name: name.to_string(),
            type_name: type_name.to_string(),
        });
        self
    }

    /// Declare that the rule synthesizes a value
    pub fn value_type(mut self, type_name: &str) -> Self {
        self.value_type = Some(type_name.to_string());
        self
    }

    /// Bind a success handler to the action named `action`
    pub fn on_action<F>(mut self, action: &str, handler: F) -> Self
    where
        F: Fn(&mut ActionScope<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.actions.entry(action.to_string()).or_default().success = Some(Arc::new(handler));
        self
    }

    /// Bind a failure handler to the action named `action`
    pub fn on_failure<F>(mut self, action: &str, handler: F) -> Self
    where
        F: Fn(&mut Context) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.actions.entry(action.to_string()).or_default().failure = Some(Arc::new(handler));
        self
    }

    /// Replace argument evaluation for the nonterminal instance `nonterminal`
    pub fn pre_call<F>(mut self, nonterminal: &str, hook: F) -> Self
    where
        F: Fn(&Context, &mut ObjectStack) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.hooks.entry(nonterminal.to_string()).or_default().pre_call = Some(Arc::new(hook));
        self
    }

    /// Receive the value of the nonterminal instance `nonterminal`
    pub fn post_call<F>(mut self, nonterminal: &str, hook: F) -> Self
    where
        F: Fn(&mut Context, Value) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.hooks.entry(nonterminal.to_string()).or_default().post_call = Some(Arc::new(hook));
        self
    }

    /// Domain-wide id
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Owning grammar, once added
    pub fn grammar(&self) -> Option<GrammarId> {
        self.grammar
    }

    /// Rule name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name qualified with the grammar's full name
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Declared inherited attributes
    pub fn inherited_attributes(&self) -> &[AttrDecl] {
        &self.inherited_attributes
    }

    /// Declared local variables
    pub fn local_variables(&self) -> &[AttrDecl] {
        &self.local_variables
    }

    /// Declared value type
    pub fn value_type_name(&self) -> Option<&str> {
        self.value_type.as_deref()
    }

    /// Whether the rule pushes a value when it matches
    pub fn has_value(&self) -> bool {
        self.value_type.is_some()
    }

    /// Parser tree
    pub fn definition(&self) -> &Parser {
        &self.definition
    }

    /// Description used in expectation errors
    pub fn info(&self) -> String {
        self.name.clone()
    }

    /// Run one activation of the rule
    pub fn parse(
        &self,
        scanner: &mut Scanner<'_>,
        stack: &mut ObjectStack,
        data: &mut ParsingData,
    ) -> Result<Match, ParseError> {
        let start = scanner.span();
        let context = self
            .enter(stack)
            .map_err(|e| scanner.action_error(e, start))?;
        scanner.enter_rule(self)?;
        data.push_context(context);
        let result = self.definition.parse(scanner, stack, data);
        let context = data.pop_context(self.id);
        scanner.leave_rule(self, start, result.as_ref().ok().copied());
        let m = result?;
        if m.hit() && self.has_value() {
            let value = context.and_then(|mut c| c.take_value()).unwrap_or_default();
            stack.push(value);
        }
        Ok(m)
    }

    /// Build the activation record, binding arguments from the stack
    fn enter(&self, stack: &mut ObjectStack) -> Result<Context, ActionError> {
        let mut context = Context::new(self.id);
        let mut values = Vec::with_capacity(self.inherited_attributes.len());
        for _ in &self.inherited_attributes {
            values.push(stack.pop()?);
        }
        for (attribute, value) in self.inherited_attributes.iter().zip(values.into_iter().rev()) {
            context.set_argument(&attribute.name, value);
        }
        for local in &self.local_variables {
            context.declare_local(&local.name);
        }
        Ok(context)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.inherited_attributes.is_empty() {
            let attrs: Vec<String> = self
                .inherited_attributes
                .iter()
                .map(|a| format!("{}: {}", a.name, a.type_name))
                .collect();
            write!(f, "({})", attrs.join(", "))?;
        }
        if let Some(value_type) = &self.value_type {
            write!(f, " -> {value_type}")?;
        }
        write!(f, " ::= {}", self.definition)
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser_dsl::*;
    use super::*;

    fn standalone(rule: Rule) -> Rule {
        Rule {
            id: RuleId::new(0),
            ..rule
        }
    }

    #[test]
    fn test_enter_binds_arguments_in_order() {
        let rule = standalone(
            Rule::new("r", empty())
                .inherited_attribute("a", "int")
                .inherited_attribute("b", "int")
                .local_variable("tmp", "list"),
        );
        let mut stack = ObjectStack::new();
        stack.push(Value::Int(1));
        stack.push(Value::Int(2));
        let context = rule.enter(&mut stack).unwrap();
        assert!(stack.is_empty());
        assert_eq!(context.argument("a"), Some(&Value::Int(1)));
        assert_eq!(context.argument("b"), Some(&Value::Int(2)));
        assert_eq!(context.local("tmp"), Some(&Value::Nil));
    }

    #[test]
    fn test_enter_with_missing_arguments() {
        let rule = standalone(Rule::new("r", empty()).inherited_attribute("a", "int"));
        let mut stack = ObjectStack::new();
        assert_eq!(rule.enter(&mut stack).unwrap_err(), ActionError::EmptyStack);
    }

    #[test]
    fn test_parse_pushes_value_and_pairs_contexts() {
        let rule = standalone(
            Rule::new("digit", char_set("0-9").action("d"))
                .value_type("int")
                .local_variable("unused", "int"),
        );
        let rules = [rule];
        let input: Vec<char> = "7".chars().collect();
        let mut scanner = Scanner::new(&input, 0, "t", &rules, None);
        let mut stack = ObjectStack::new();
        let mut data = ParsingData::new(1);
        let m = rules[0].parse(&mut scanner, &mut stack, &mut data).unwrap();
        assert!(m.hit());
        assert_eq!(stack.pop().unwrap(), Value::Nil);
        assert!(data.is_balanced());
        assert_eq!(data.push_count(), 1);
    }

    #[test]
    fn test_failed_rule_pushes_nothing() {
        let rule = standalone(Rule::new("digit", char_set("0-9")).value_type("int"));
        let rules = [rule];
        let input: Vec<char> = "x".chars().collect();
        let mut scanner = Scanner::new(&input, 0, "t", &rules, None);
        let mut stack = ObjectStack::new();
        let mut data = ParsingData::new(1);
        let m = rules[0].parse(&mut scanner, &mut stack, &mut data).unwrap();
        assert!(!m.hit());
        assert!(stack.is_empty());
        assert!(data.is_balanced());
    }

    #[test]
    fn test_display() {
        let rule = Rule::new("sum", nonterminal("term") % chr('+'))
            .inherited_attribute("env", "scope")
            .value_type("int");
        assert_eq!(rule.to_string(), "sum(env: scope) -> int ::= term % '+'");
    }

    #[test]
    fn test_handler_registration() {
        let rule = Rule::new("r", empty().action("a"))
            .on_action("a", |_| Ok(()))
            .on_failure("a", |_| Ok(()))
            .post_call("x", |_, _| Ok(()));
        let handlers = &rule.actions["a"];
        assert!(handlers.success.is_some());
        assert!(handlers.failure.is_some());
        assert!(rule.hooks["x"].post_call.is_some());
        assert!(rule.hooks["x"].pre_call.is_none());
    }
}
