//! Candidate strategy hints.
//!
//! A cheap, deterministic read of the recruiter's latest message that
//! tells the candidate what kind of answer is being asked for. No
//! generation call is involved.
//!
//! Each question kind has a keyword list; every keyword found in the
//! message scores one point for its kind. The highest score wins, ties go
//! to the kind listed first in [`QuestionKind::ALL`].

/// What the recruiter is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// The recruiter is wrapping up.
    Closing,
    /// Salary, location, start date and similar.
    Logistics,
    /// "Tell me about a time..." questions.
    Behavioural,
    /// Depth on systems, tools, design.
    Technical,
    /// Why this role, what next.
    Motivation,
}

impl QuestionKind {
    /// Kinds in tie-break order.
    pub const ALL: [Self; 5] = [
        Self::Closing,
        Self::Logistics,
        Self::Behavioural,
        Self::Technical,
        Self::Motivation,
    ];

    const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Closing => &[
                "thank you for your time",
                "thanks for your time",
                "next steps",
                "wrap up",
                "be in touch",
                "any questions for me",
            ],
            Self::Logistics => &[
                "salary",
                "compensation",
                "notice period",
                "start date",
                "relocat",
                "remote",
                "visa",
                "on-site",
                "hybrid",
            ],
            Self::Behavioural => &[
                "tell me about a time",
                "example",
                "conflict",
                "challenge",
                "disagree",
                "mistake",
                "mentor",
                "led ",
                "handled",
            ],
            Self::Technical => &[
                "architecture",
                "design",
                "scale",
                "debug",
                "technical",
                "stack",
                "performance",
                "system",
                "code",
                "database",
                "latency",
            ],
            Self::Motivation => &[
                "why",
                "interested",
                "looking for",
                "motivat",
                "goal",
                "excite",
                "next role",
            ],
        }
    }

    /// Guidance handed to the candidate for this kind.
    pub const fn hint(self) -> &'static str {
        match self {
            Self::Closing => {
                "The recruiter is wrapping up: thank them and restate your strongest point in one sentence."
            }
            Self::Logistics => "Answer the practical question directly and factually from your profile.",
            Self::Behavioural => {
                "Answer with one short story: the situation, what you did, and the result."
            }
            Self::Technical => {
                "Give one concrete technical example with specifics: tools, scale, and the decisions you made."
            }
            Self::Motivation => {
                "Connect your career goals to this role honestly, without overselling."
            }
        }
    }
}

/// Classify a recruiter message, or `None` if nothing matched.
pub fn classify_question(message: &str) -> Option<QuestionKind> {
    let lower = message.to_lowercase();
    let mut best: Option<(QuestionKind, usize)> = None;
    for kind in QuestionKind::ALL {
        let score = kind
            .keywords()
            .iter()
            .filter(|keyword| lower.contains(*keyword))
            .count();
        if score > 0 && best.is_none_or(|(_, top)| score > top) {
            best = Some((kind, score));
        }
    }
    best.map(|(kind, _)| kind)
}

/// Full hint for a recruiter message.
pub fn strategy_hint(message: &str) -> Option<String> {
    let kind = classify_question(message);
    let questions = message.matches('?').count();
    match (kind, questions > 1) {
        (Some(kind), true) => Some(format!("{} Address each question in order.", kind.hint())),
        (Some(kind), false) => Some(kind.hint().to_owned()),
        (None, true) => Some("Address each question in order.".to_owned()),
        (None, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technical_question() {
        let msg = "How would you design the database layer for a system at that scale?";
        assert_eq!(classify_question(msg), Some(QuestionKind::Technical));
    }

    #[test]
    fn behavioural_question() {
        let msg = "Tell me about a time you handled a conflict within your team.";
        assert_eq!(classify_question(msg), Some(QuestionKind::Behavioural));
    }

    #[test]
    fn closing_beats_motivation_on_tie() {
        let msg = "Thank you for your time, why don't we talk about next steps?";
        assert_eq!(classify_question(msg), Some(QuestionKind::Closing));
    }

    #[test]
    fn logistics_question() {
        let msg = "Are you open to relocation, or do you need a remote position?";
        assert_eq!(classify_question(msg), Some(QuestionKind::Logistics));
    }

    #[test]
    fn unclassified_single_question_has_no_hint() {
        assert_eq!(strategy_hint("Hello there!"), None);
    }

    #[test]
    fn multiple_questions_add_ordering_hint() {
        let hint = strategy_hint("What stack do you use? And how big is the team?").unwrap_or_default();
        assert!(hint.contains("technical example"));
        assert!(hint.ends_with("Address each question in order."));
    }
}
