//! Character classes and character sets
//!
//! [`CharClass`] names a Unicode category tested through the standard
//! library's `char` predicates. [`CharSet`] is the bracket-style set used by
//! the char set primitive: a list of ranges with an optional negation flag,
//! parsed from a compact source form such as `a-zA-Z_` or `\t\n `.
//!
//! # Set source syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `x` | the code point `x` |
//! | `a-z` | the inclusive range `a..=z` |
//! | `\n` `\t` `\r` `\0` | control escapes |
//! | `\-` `\\` `\]` | the escaped code point itself |
//!
//! A `-` at the start or end of the source is literal.

use hashbrown::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Static lookup table for class name -> CharClass
static CLASS_NAMES: OnceLock<HashMap<&'static str, CharClass>> = OnceLock::new();

/// Unicode character class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharClass {
    /// Any alphabetic code point
    Letter,
    /// Uppercase letter
    Upper,
    /// Lowercase letter
    Lower,
    /// Decimal digit `0-9`
    Digit,
    /// Hex digit `0-9a-fA-F`
    HexDigit,
    /// Letter or numeric
    Alphanumeric,
    /// White space
    Space,
    /// ASCII punctuation
    Punctuation,
    /// Control code point
    Control,
    /// May start an identifier: letter or `_`
    IdStart,
    /// May continue an identifier: alphanumeric or `_`
    IdContinue,
}

impl CharClass {
    /// Test a code point
    #[inline]
    pub fn matches(self, c: char) -> bool {
        match self {
            CharClass::Letter => c.is_alphabetic(),
            CharClass::Upper => c.is_uppercase(),
            CharClass::Lower => c.is_lowercase(),
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::HexDigit => c.is_ascii_hexdigit(),
            CharClass::Alphanumeric => c.is_alphanumeric(),
            CharClass::Space => c.is_whitespace(),
            CharClass::Punctuation => c.is_ascii_punctuation(),
            CharClass::Control => c.is_control(),
            CharClass::IdStart => c.is_alphabetic() || c == '_',
            CharClass::IdContinue => c.is_alphanumeric() || c == '_',
        }
    }

    /// Canonical name, as accepted by [`CharClass::from_name`]
    pub fn name(self) -> &'static str {
        match self {
            CharClass::Letter => "letter",
            CharClass::Upper => "upper",
            CharClass::Lower => "lower",
            CharClass::Digit => "digit",
            CharClass::HexDigit => "hexdigit",
            CharClass::Alphanumeric => "alnum",
            CharClass::Space => "space",
            CharClass::Punctuation => "punct",
            CharClass::Control => "cntrl",
            CharClass::IdStart => "idstart",
            CharClass::IdContinue => "idcont",
        }
    }

    /// Look a class up by name or common escape (`\d`, `\s`, `\p{L}`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        CLASS_NAMES
            .get_or_init(|| {
                HashMap::from([
                    ("letter", Self::Letter),
                    ("alpha", Self::Letter),
                    ("\\p{L}", Self::Letter),
                    ("upper", Self::Upper),
                    ("\\p{Lu}", Self::Upper),
                    ("lower", Self::Lower),
                    ("\\p{Ll}", Self::Lower),
                    ("digit", Self::Digit),
                    ("\\d", Self::Digit),
                    ("hexdigit", Self::HexDigit),
                    ("xdigit", Self::HexDigit),
                    ("alnum", Self::Alphanumeric),
                    ("space", Self::Space),
                    ("\\s", Self::Space),
                    ("punct", Self::Punctuation),
                    ("cntrl", Self::Control),
                    ("idstart", Self::IdStart),
                    ("idcont", Self::IdContinue),
                    ("\\w", Self::IdContinue),
                ])
            })
            .get(name)
            .copied()
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name())
    }
}

/// A set of code point ranges, optionally negated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSet {
    source: String,
    ranges: Vec<(char, char)>,
    inverse: bool,
}

impl CharSet {
    /// Parse a set from its source form
    pub fn parse(source: &str, inverse: bool) -> Self {
        let mut ranges = Vec::new();
        let mut chars = source.chars().peekable();
        while let Some(first) = next_member(&mut chars) {
            if chars.peek() == Some(&'-') {
                let mut lookahead = chars.clone();
                lookahead.next();
                if lookahead.peek().is_some() {
                    chars.next();
                    if let Some(last) = next_member(&mut chars) {
                        ranges.push((first, last));
                        continue;
                    }
                }
            }
            ranges.push((first, first));
        }
        Self {
            source: source.to_string(),
            ranges,
            inverse,
        }
    }

    /// Test a code point against the set
    #[inline]
    pub fn contains(&self, c: char) -> bool {
        let member = self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        member != self.inverse
    }

    /// Source form the set was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Check if the set is negated
    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// Parsed ranges
    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverse {
            write!(f, "[^{}]", self.source)
        } else {
            write!(f, "[{}]", self.source)
        }
    }
}

fn next_member(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<char> {
    let c = chars.next()?;
    if c != '\\' {
        return Some(c);
    }
    Some(match chars.next() {
        Some('n') => '\n',
        Some('t') => '\t',
        Some('r') => '\r',
        Some('0') => '\0',
        Some(other) => other,
        None => '\\',
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_matches() {
        assert!(CharClass::Letter.matches('ß'));
        assert!(CharClass::Upper.matches('Ä'));
        assert!(!CharClass::Upper.matches('a'));
        assert!(CharClass::Digit.matches('7'));
        assert!(!CharClass::Digit.matches('x'));
        assert!(CharClass::HexDigit.matches('F'));
        assert!(CharClass::Space.matches('\u{2003}'));
        assert!(CharClass::IdStart.matches('_'));
        assert!(!CharClass::IdStart.matches('1'));
        assert!(CharClass::IdContinue.matches('1'));
    }

    #[test]
    fn test_class_from_name() {
        assert_eq!(CharClass::from_name("\\d"), Some(CharClass::Digit));
        assert_eq!(CharClass::from_name("letter"), Some(CharClass::Letter));
        assert_eq!(CharClass::from_name("\\p{L}"), Some(CharClass::Letter));
        assert_eq!(CharClass::from_name("bogus"), None);
        for class in [CharClass::Punctuation, CharClass::IdContinue, CharClass::Control] {
            assert_eq!(CharClass::from_name(class.name()), Some(class));
        }
    }

    #[test]
    fn test_set_ranges() {
        let set = CharSet::parse("a-zA-Z_", false);
        assert_eq!(set.ranges(), &[('a', 'z'), ('A', 'Z'), ('_', '_')]);
        assert!(set.contains('q'));
        assert!(set.contains('_'));
        assert!(!set.contains('0'));
    }

    #[test]
    fn test_set_escapes_and_literal_dash() {
        let set = CharSet::parse("\\t\\n -", false);
        assert!(set.contains('\t'));
        assert!(set.contains('\n'));
        assert!(set.contains(' '));
        assert!(set.contains('-'));
        assert!(!set.contains('a'));

        let escaped = CharSet::parse("a\\-z", false);
        assert!(escaped.contains('-'));
        assert!(!escaped.contains('m'));
    }

    #[test]
    fn test_set_inverse() {
        let set = CharSet::parse("\"\\\\", true);
        assert!(set.contains('a'));
        assert!(!set.contains('"'));
        assert!(!set.contains('\\'));
        assert_eq!(set.to_string(), "[^\"\\\\]");
    }
}
