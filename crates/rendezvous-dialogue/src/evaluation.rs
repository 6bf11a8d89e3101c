//! Final evaluation parsing.
//!
//! The recruiter's closing evaluation is free text. It is asked to end with
//! a `Rating: X/10` line and a `Decision: GOOD FIT` or `Decision: NOT A FIT`
//! line, but models drift: markdown emphasis, `Score:` instead of
//! `Rating:`, underscores, out-of-range numbers. Both fields are optional;
//! anything not recognised stays unset. Parsing never fails.

use rendezvous_types::Decision;

/// Fields recovered from an evaluation text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParsedEvaluation {
    /// Rating in `1..=10`.
    pub score: Option<u8>,
    /// Hiring decision.
    pub decision: Option<Decision>,
}

/// Parse a rating and a decision out of `text`.
pub fn parse_evaluation(text: &str) -> ParsedEvaluation {
    ParsedEvaluation {
        score: parse_rating(text),
        decision: parse_decision(text),
    }
}

/// Keywords that introduce a rating.
const RATING_KEYS: [&str; 2] = ["rating", "score"];

/// First valid `Rating: N` (or `Score: N`) in the text, `N/10` allowed.
fn parse_rating(text: &str) -> Option<u8> {
    text.lines().find_map(|line| {
        let lower = line.to_lowercase();
        RATING_KEYS
            .iter()
            .find_map(|key| after_key(&lower, key).and_then(leading_rating))
    })
}

/// The text after the first occurrence of `key`, minus separators.
fn after_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let pos = line.find(key)?;
    let rest = line.get(pos..)?.strip_prefix(key)?;
    Some(rest.trim_start_matches(|c: char| c == ':' || c == '*' || c == '-' || c.is_whitespace()))
}

/// A leading integer in `1..=10`, e.g. `8`, `8/10`, `8.5/10`.
fn leading_rating(rest: &str) -> Option<u8> {
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    digits.parse::<u8>().ok().filter(|n| (1..=10).contains(n))
}

/// Decision from a `Decision:` line if present, else from the whole text.
fn parse_decision(text: &str) -> Option<Decision> {
    let from_line = text.lines().find_map(|line| {
        let normalized = normalize(line);
        after_key(&normalized, "decision").and_then(classify)
    });
    from_line.or_else(|| classify(&normalize(text)))
}

/// Lowercase, underscores to spaces, whitespace collapsed.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Negative phrasings win over `good fit`, which they contain.
fn classify(text: &str) -> Option<Decision> {
    if text.contains("not a fit") || text.contains("not a good fit") {
        Some(Decision::NotAFit)
    } else if text.contains("good fit") {
        Some(Decision::GoodFit)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_format() {
        let text = "✓ 5+ years backend\n✗ Kubernetes\nRating: 7/10\nDecision: GOOD FIT";
        let parsed = parse_evaluation(text);
        assert_eq!(parsed.score, Some(7));
        assert_eq!(parsed.decision, Some(Decision::GoodFit));
    }

    #[test]
    fn parses_markdown_and_score_keyword() {
        let text = "**Score:** 9/10\n**Decision:** Not a fit";
        let parsed = parse_evaluation(text);
        assert_eq!(parsed.score, Some(9));
        assert_eq!(parsed.decision, Some(Decision::NotAFit));
    }

    #[test]
    fn rating_without_denominator() {
        assert_eq!(parse_evaluation("rating: 10").score, Some(10));
        assert_eq!(parse_evaluation("Rating - 3").score, Some(3));
    }

    #[test]
    fn out_of_range_rating_is_unset() {
        assert_eq!(parse_evaluation("Rating: 0/10").score, None);
        assert_eq!(parse_evaluation("Rating: 11/10").score, None);
        assert_eq!(parse_evaluation("Rating: 100").score, None);
        assert_eq!(parse_evaluation("Rating: high").score, None);
    }

    #[test]
    fn first_valid_rating_wins() {
        let text = "Rating: 42\nRevised rating: 6/10";
        assert_eq!(parse_evaluation(text).score, Some(6));
    }

    #[test]
    fn not_a_good_fit_is_negative() {
        let parsed = parse_evaluation("Overall the candidate is NOT A GOOD FIT for this role.");
        assert_eq!(parsed.decision, Some(Decision::NotAFit));
    }

    #[test]
    fn underscored_decision_is_recognised() {
        assert_eq!(parse_evaluation("Decision: NOT_A_FIT").decision, Some(Decision::NotAFit));
        assert_eq!(parse_evaluation("decision: good_fit").decision, Some(Decision::GoodFit));
    }

    #[test]
    fn decision_line_beats_prose() {
        let text = "They might be a good fit elsewhere.\nDecision: NOT A FIT";
        assert_eq!(parse_evaluation(text).decision, Some(Decision::NotAFit));
    }

    #[test]
    fn absent_fields_are_unset() {
        let parsed = parse_evaluation("Thanks for the chat!");
        assert_eq!(parsed, ParsedEvaluation::default());
        assert_eq!(parse_evaluation(""), ParsedEvaluation::default());
    }
}
