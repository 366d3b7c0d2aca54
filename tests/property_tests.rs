//! Property-based tests using proptest
//!
//! These tests check combinator laws across generated inputs.

mod common;

use common::{accepts, domain};
use pegworks::engine::Scanner;
use pegworks::prelude::*;
use proptest::prelude::*;

fn run(parser: &Parser, input: &str) -> (bool, usize, usize) {
    let chars: Vec<char> = input.chars().collect();
    let mut scanner = Scanner::new(&chars, 0, "prop", &[], None);
    let mut stack = ObjectStack::new();
    let mut data = ParsingData::new(0);
    let m = parser
        .parse(&mut scanner, &mut stack, &mut data)
        .expect("no committed failure");
    (m.hit(), m.length(), scanner.position())
}

fn composites() -> Vec<Parser> {
    vec![
        chr('a') >> 'b' >> 'a',
        string("ab") | string("ba"),
        (chr('a') >> 'b') % ',',
        (chr('a') >> 'b').many1(),
        char_set("ab").many1() - string("ab"),
        string("ab") ^ (chr('a') >> any_char()),
        char_set("ab").many1() & string("aba"),
        (chr('a') >> ' ' >> 'b').token(),
    ]
}

// =============================================================================
// Backtracking
// =============================================================================

proptest! {
    /// A failed composite never consumes input
    #[test]
    fn test_failure_restores_position(input in "[ab, ]{0,8}") {
        for parser in composites() {
            let (hit, length, position) = run(&parser, &input);
            if hit {
                prop_assert_eq!(length, position);
            } else {
                prop_assert_eq!(position, 0);
            }
        }
    }

    /// Grouping of sequences does not change what they match
    #[test]
    fn test_sequence_associativity(input in "[abc]{0,6}") {
        let a = char_set("ab").many();
        let b = chr('c');
        let c = string("ab").optional();
        let left = (a.clone() >> b.clone()) >> c.clone();
        let right = a >> (b >> c);
        prop_assert_eq!(run(&left, &input), run(&right, &input));
    }

    /// When both branches match, the first one wins
    #[test]
    fn test_alternative_left_bias(input in "a{1,5}b?") {
        let first = chr('a').many1();
        let second = chr('a').many1() >> chr('b').optional();
        let alternative = first.clone() | second;
        prop_assert_eq!(run(&alternative, &input), run(&first, &input));
    }
}

// =============================================================================
// Identifiers and Keywords
// =============================================================================

const KEYWORDS: [&str; 4] = ["grammar", "rule", "using", "if"];

proptest! {
    /// Difference with a keyword list rejects exactly the listed words
    #[test]
    fn test_identifier_minus_keywords(word in prop_oneof![
        "[a-z_][a-z0-9_]{0,8}",
        proptest::sample::select(KEYWORDS.to_vec()).prop_map(str::to_string),
    ]) {
        let d = domain(vec![Rule::new("name", identifier() - keyword_list(KEYWORDS))]);
        prop_assert_eq!(accepts(&d, &word), !KEYWORDS.contains(&word.as_str()));
    }

    /// Star always succeeds and stops at the first non-matching char
    #[test]
    fn test_star_is_greedy(prefix in "a{0,10}", rest in "[bc]{0,3}") {
        let input = format!("{prefix}{rest}");
        let count = prefix.chars().count();
        prop_assert_eq!(run(&chr('a').many(), &input), (true, count, count));
        prop_assert_eq!(run(&chr('a').many1(), &input).0, count > 0);
    }
}

// =============================================================================
// Values
// =============================================================================

proptest! {
    /// Summing a separated list of numbers through rule values
    #[test]
    fn test_sum_of_list(numbers in proptest::collection::vec(0i64..1000, 1..8)) {
        let d = domain(vec![
            Rule::new("sum", (nonterminal("num") % '+').action("total"))
                .value_type("int")
                .local_variable("acc", "int")
                .post_call("num", |context, value| {
                    let acc = context.local("acc").and_then(Value::as_int).unwrap_or(0);
                    context.set_local("acc", Value::Int(acc + value.into_typed::<i64>()?));
                    Ok(())
                })
                .on_action("total", |scope| {
                    let acc = scope.context().local("acc").and_then(Value::as_int).unwrap_or(0);
                    scope.context_mut().set_value(acc);
                    Ok(())
                }),
            Rule::new("num", char_set("0-9").many1().action("n"))
                .value_type("int")
                .on_action("n", |scope| {
                    let n: i64 = scope.text().parse().map_err(|_| ActionError::msg("n"))?;
                    scope.context_mut().set_value(n);
                    Ok(())
                }),
        ]);
        let input = numbers.iter().map(i64::to_string).collect::<Vec<_>>().join("+");
        let value = common::parse(&d, &input).unwrap();
        prop_assert_eq!(value, Some(Value::Int(numbers.iter().sum())));
    }
}
