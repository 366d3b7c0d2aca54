//! Attribute passing between rule activations
//!
//! A nonterminal hands arguments to the rule it calls by pushing them onto
//! the [`ObjectStack`]; the callee pops them into a fresh [`Context`] when it
//! enters. A rule with a value type pushes its synthesized value when it
//! leaves, and the caller pops it into a `from` slot of its own context.
//!
//! [`ParsingData`] keeps one stack of contexts per rule id, so recursive
//! activations of the same rule each get their own record and actions always
//! address the innermost one.

use hashbrown::HashMap;

use super::error::ActionError;
use super::object::{FromValue, Value};
use super::rule::RuleId;

/// LIFO of values in flight between rule activations
#[derive(Debug, Default)]
pub struct ObjectStack {
    items: Vec<Value>,
}

impl ObjectStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Push a value
    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    /// Pop the top value
    pub fn pop(&mut self) -> Result<Value, ActionError> {
        self.items.pop().ok_or(ActionError::EmptyStack)
    }

    /// Pop the top value and convert it
    pub fn pop_as<T: FromValue>(&mut self) -> Result<T, ActionError> {
        self.pop()?.into_typed()
    }

    /// Number of values on the stack
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop values above `len`; used when a combinator backtracks
    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }
}

/// Activation record of one rule invocation
#[derive(Debug, Clone)]
pub struct Context {
    rule: RuleId,
    arguments: Vec<(String, Value)>,
    locals: HashMap<String, Value>,
    value: Option<Value>,
    from: HashMap<String, Value>,
}

impl Context {
    /// Create an empty context for a rule
    pub fn new(rule: RuleId) -> Self {
        Self {
            rule,
            arguments: Vec::new(),
            locals: HashMap::new(),
            value: None,
            from: HashMap::new(),
        }
    }

    /// Rule this context belongs to
    pub fn rule(&self) -> RuleId {
        self.rule
    }

    pub(crate) fn set_argument(&mut self, name: &str, value: Value) {
        self.arguments.push((name.to_string(), value));
    }

    pub(crate) fn declare_local(&mut self, name: &str) {
        self.locals.insert(name.to_string(), Value::Nil);
    }

    /// Inherited attribute by name
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Inherited attributes in declaration order
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.arguments.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Local variable by name
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Mutable local variable by name
    pub fn local_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.locals.get_mut(name)
    }

    /// Assign a local variable
    pub fn set_local(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }

    /// Synthesized value, if set
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Set the synthesized value pushed when the rule leaves
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = Some(value.into());
    }

    /// Take the synthesized value out of the context
    pub fn take_value(&mut self) -> Option<Value> {
        self.value.take()
    }

    /// Result of a child nonterminal, by instance name
    pub fn from(&self, name: &str) -> Option<&Value> {
        self.from.get(name)
    }

    /// Store a child nonterminal's result
    pub fn set_from(&mut self, name: &str, value: Value) {
        self.from.insert(name.to_string(), value);
    }

    /// Move a child nonterminal's result out of its slot
    pub fn take_from(&mut self, name: &str) -> Option<Value> {
        self.from.remove(name)
    }

    /// Move a child nonterminal's result out and convert it
    pub fn take_from_as<T: FromValue>(&mut self, name: &str) -> Result<T, ActionError> {
        self.take_from(name)
            .ok_or_else(|| ActionError::UnknownVariable(name.to_string()))?
            .into_typed()
    }

    /// Look a variable up: inherited attributes, then locals, then `from` slots
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.argument(name)
            .or_else(|| self.local(name))
            .or_else(|| self.from(name))
    }

    /// Look a variable up and convert a copy of it
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T, ActionError> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| ActionError::UnknownVariable(name.to_string()))?
            .into_typed()
    }
}

/// Per-parse context stacks, one per rule id
#[derive(Debug, Default)]
pub struct ParsingData {
    stacks: Vec<Vec<Context>>,
    pushes: usize,
    pops: usize,
}

impl ParsingData {
    /// Create context stacks for `rule_count` rules
    pub fn new(rule_count: usize) -> Self {
        Self {
            stacks: (0..rule_count).map(|_| Vec::new()).collect(),
            pushes: 0,
            pops: 0,
        }
    }

    /// Clear all stacks and counters, resizing for `rule_count` rules
    pub fn reset(&mut self, rule_count: usize) {
        self.stacks.clear();
        self.stacks.resize_with(rule_count, Vec::new);
        self.pushes = 0;
        self.pops = 0;
    }

    /// Push a context onto the stack of its rule
    pub fn push_context(&mut self, context: Context) {
        let index = context.rule().index();
        if index >= self.stacks.len() {
            self.stacks.resize_with(index + 1, Vec::new);
        }
        self.stacks[index].push(context);
        self.pushes += 1;
    }

    /// Pop the innermost context of a rule
    pub fn pop_context(&mut self, rule: RuleId) -> Option<Context> {
        let context = self.stacks.get_mut(rule.index())?.pop()?;
        self.pops += 1;
        Some(context)
    }

    /// Innermost context of a rule
    pub fn context(&self, rule: RuleId) -> Option<&Context> {
        self.stacks.get(rule.index())?.last()
    }

    /// Mutable innermost context of a rule
    pub fn context_mut(&mut self, rule: RuleId) -> Option<&mut Context> {
        self.stacks.get_mut(rule.index())?.last_mut()
    }

    /// Current recursion depth of a rule
    pub fn depth(&self, rule: RuleId) -> usize {
        self.stacks.get(rule.index()).map_or(0, Vec::len)
    }

    /// Total contexts pushed since the last reset
    pub fn push_count(&self) -> usize {
        self.pushes
    }

    /// Total contexts popped since the last reset
    pub fn pop_count(&self) -> usize {
        self.pops
    }

    /// Every push has been matched by a pop and all stacks are empty
    pub fn is_balanced(&self) -> bool {
        self.pushes == self.pops && self.stacks.iter().all(Vec::is_empty)
    }
}
