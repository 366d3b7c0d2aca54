//! Parser DSL
//!
//! Constructors for the primitive parsers, combinator methods on
//! [`Parser`], and operator overloads so grammars read close to EBNF:
//!
//! | Operator | Combinator |
//! |----------|------------|
//! | `a >> b` | sequence |
//! | `a \| b` | ordered alternative |
//! | `a - b` | difference |
//! | `a ^ b` | exclusive or |
//! | `a & b` | intersection |
//! | `a % b` | list of `a` separated by `b` |
//!
//! Chars and string slices convert into literal parsers, so the right-hand
//! side of an operator may be written bare:
//!
//! ```rust
//! use pegworks::prelude::*;
//!
//! let assignment = identifier() >> '=' >> nonterminal("expr") >> ";";
//! let arguments = chr('(') >> (nonterminal("expr") % ',').optional() >> ')';
//! let name = identifier() - keyword_list(["if", "else", "while"]);
//! ```

use hashbrown::HashSet;
use std::ops::{BitAnd, BitOr, BitXor, Rem, Shr, Sub};

use super::char_class::{CharClass, CharSet};
use super::parser::{
    ActionParser, Argument, KeywordListParser, KeywordParser, NonterminalParser, Parser, RuleRef,
};
use super::rule::{ActionHandlers, NonterminalHooks};

// ============================================================================
// Primitive constructors
// ============================================================================

/// Match a single literal code point
pub fn chr(c: char) -> Parser {
    Parser::Char(c)
}

/// Match a literal string
pub fn string(s: &str) -> Parser {
    Parser::Str(s.to_string())
}

/// Match one code point from a set such as `a-zA-Z_`
pub fn char_set(set: &str) -> Parser {
    Parser::CharSet(CharSet::parse(set, false))
}

/// Match one code point not in a set
pub fn not_char_set(set: &str) -> Parser {
    Parser::CharSet(CharSet::parse(set, true))
}

/// Match one code point of a Unicode class
pub fn class(class: CharClass) -> Parser {
    Parser::Class(class)
}

/// Match one code point in `lo..=hi`
pub fn range(lo: char, hi: char) -> Parser {
    Parser::Range(lo, hi)
}

/// Match any single code point
pub fn any_char() -> Parser {
    Parser::AnyChar
}

/// Match nothing, successfully
pub fn empty() -> Parser {
    Parser::Empty
}

/// Match a keyword not followed by an identifier character
pub fn keyword(word: &str) -> Parser {
    Parser::Keyword(KeywordParser {
        keyword: word.to_string(),
        continuation: None,
    })
}

/// Match a keyword unless `continuation_rule` matches a longer prefix
pub fn keyword_with(word: &str, continuation_rule: &str) -> Parser {
    Parser::Keyword(KeywordParser {
        keyword: word.to_string(),
        continuation: Some(RuleRef::new(continuation_rule)),
    })
}

/// Match an identifier that is one of `words`
pub fn keyword_list<I, S>(words: I) -> Parser
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Parser::KeywordList(KeywordListParser {
        selector: None,
        keywords: words.into_iter().map(Into::<String>::into).collect::<HashSet<String>>(),
    })
}

/// Match the text of `selector_rule` if it is one of `words`
pub fn keyword_list_with<I, S>(selector_rule: &str, words: I) -> Parser
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Parser::KeywordList(KeywordListParser {
        selector: Some(RuleRef::new(selector_rule)),
        keywords: words.into_iter().map(Into::<String>::into).collect::<HashSet<String>>(),
    })
}

/// Match an identifier: a letter or `_`, then letters, digits or `_`
pub fn identifier() -> Parser {
    (class(CharClass::IdStart) >> class(CharClass::IdContinue).many()).token()
}

/// Call a rule; the instance name is the rule name
pub fn nonterminal(rule_name: &str) -> Parser {
    nonterminal_with_args(rule_name, rule_name, Vec::new())
}

/// Call a rule under a distinct instance name
pub fn nonterminal_as(instance: &str, rule_name: &str) -> Parser {
    nonterminal_with_args(instance, rule_name, Vec::new())
}

/// Call a rule passing arguments to its inherited attributes
pub fn nonterminal_with_args(instance: &str, rule_name: &str, arguments: Vec<Argument>) -> Parser {
    Parser::Nonterminal(NonterminalParser {
        name: instance.to_string(),
        rule_name: rule_name.to_string(),
        arguments,
        target: None,
        owner: None,
        hooks: NonterminalHooks::default(),
    })
}

/// Sequence of several parsers, left to right
pub fn seq<I, P>(items: I) -> Parser
where
    I: IntoIterator<Item = P>,
    P: Into<Parser>,
{
    items
        .into_iter()
        .map(Into::<Parser>::into)
        .reduce(|a, b| a.then(b))
        .unwrap_or(Parser::Empty)
}

/// Ordered choice between several parsers
pub fn choice<I, P>(items: I) -> Parser
where
    I: IntoIterator<Item = P>,
    P: Into<Parser>,
{
    items
        .into_iter()
        .map(Into::<Parser>::into)
        .reduce(|a, b| a.or(b))
        .unwrap_or(Parser::Empty)
}

// ============================================================================
// Combinator methods
// ============================================================================

impl Parser {
    /// `self` then `next`
    pub fn then(self, next: impl Into<Parser>) -> Parser {
        Parser::Sequence(Box::new(self), Box::new(next.into()))
    }

    /// `self`, else `other`
    pub fn or(self, other: impl Into<Parser>) -> Parser {
        Parser::Alternative(Box::new(self), Box::new(other.into()))
    }

    /// `self` unless `other` matches at least as much from the same start
    ///
    /// Handlers and post-call hooks inside an operand whose match is
    /// discarded have already fired, and may have left values in the
    /// owner's `from` slots.
    pub fn minus(self, other: impl Into<Parser>) -> Parser {
        Parser::Difference(Box::new(self), Box::new(other.into()))
    }

    /// Exactly one of `self` and `other`
    ///
    /// Handlers and post-call hooks inside an operand whose match is
    /// discarded have already fired, and may have left values in the
    /// owner's `from` slots.
    pub fn xor(self, other: impl Into<Parser>) -> Parser {
        Parser::ExclusiveOr(Box::new(self), Box::new(other.into()))
    }

    /// Both `self` and `other`, matching the same length
    ///
    /// Handlers and post-call hooks inside an operand whose match is
    /// discarded have already fired, and may have left values in the
    /// owner's `from` slots.
    pub fn and(self, other: impl Into<Parser>) -> Parser {
        Parser::Intersection(Box::new(self), Box::new(other.into()))
    }

    /// One or more `self` separated by `separator`
    pub fn list(self, separator: impl Into<Parser>) -> Parser {
        Parser::List(Box::new(self), Box::new(separator.into()))
    }

    /// Zero or more repeats
    pub fn many(self) -> Parser {
        Parser::KleeneStar(Box::new(self))
    }

    /// One or more repeats
    pub fn many1(self) -> Parser {
        Parser::Positive(Box::new(self))
    }

    /// Zero or one
    pub fn optional(self) -> Parser {
        Parser::Optional(Box::new(self))
    }

    /// Suppress skipping inside
    pub fn token(self) -> Parser {
        Parser::Token(Box::new(self))
    }

    /// Require a match; a miss aborts the parse
    pub fn expect(self) -> Parser {
        Parser::Expectation(Box::new(self))
    }

    /// Attach the action named `name`
    pub fn action(self, name: &str) -> Parser {
        Parser::Action(ActionParser {
            name: name.to_string(),
            child: Box::new(self),
            owner: None,
            handlers: ActionHandlers::default(),
        })
    }

    /// Group, for display
    pub fn group(self) -> Parser {
        Parser::Group(Box::new(self))
    }
}

// ============================================================================
// Conversions and operators
// ============================================================================

impl From<char> for Parser {
    fn from(c: char) -> Self {
        chr(c)
    }
}

impl From<&str> for Parser {
    fn from(s: &str) -> Self {
        string(s)
    }
}

impl<P: Into<Parser>> Shr<P> for Parser {
    type Output = Parser;
    fn shr(self, rhs: P) -> Parser {
        self.then(rhs)
    }
}

impl<P: Into<Parser>> BitOr<P> for Parser {
    type Output = Parser;
    fn bitor(self, rhs: P) -> Parser {
        self.or(rhs)
    }
}

impl<P: Into<Parser>> Sub<P> for Parser {
    type Output = Parser;
    fn sub(self, rhs: P) -> Parser {
        self.minus(rhs)
    }
}

impl<P: Into<Parser>> BitXor<P> for Parser {
    type Output = Parser;
    fn bitxor(self, rhs: P) -> Parser {
        self.xor(rhs)
    }
}

impl<P: Into<Parser>> BitAnd<P> for Parser {
    type Output = Parser;
    fn bitand(self, rhs: P) -> Parser {
        self.and(rhs)
    }
}

impl<P: Into<Parser>> Rem<P> for Parser {
    type Output = Parser;
    fn rem(self, rhs: P) -> Parser {
        self.list(rhs)
    }
}
