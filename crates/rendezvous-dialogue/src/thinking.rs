//! Adaptive thinking controller.
//!
//! Before each recruiter turn the controller picks a reasoning depth from
//! the conversation context, runs that depth's analysis against the
//! generation backend, and folds the result into a [`ThoughtSignature`].
//!
//! # Level selection
//!
//! Rules are evaluated in order; the first match wins:
//!
//! | # | Condition | Level |
//! |---|---|---|
//! | 1 | opening turn, or no candidate response yet | execution |
//! | 2 | confidence moved by 25 or more since the previous pass | strategic |
//! | 3 | at most 2 criteria unverified and confidence at least 80 | strategic |
//! | 4 | last candidate response shorter than 15 words | tactical |
//! | 5 | turn number 6 or later | strategic |
//! | 6 | otherwise | tactical |
//!
//! Meta-cognitive is never selected by these rules; it is only reached
//! through [`ThinkingController::reflect`].
//!
//! Malformed analysis output is expected and recovered locally with a
//! neutral signature. Only transport failures propagate as errors.

use std::collections::BTreeMap;
use std::sync::Arc;

use rendezvous_llm::{GenerationPurpose, GenerationRequest, LlmBackend, LlmError, OutputShape};
use rendezvous_types::{ConversationTurn, ThinkingLevel, ThoughtSignature};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cost::{CostTracker, level_cost};
use crate::persona::RecruiterSide;
use crate::prompt::{PromptEngine, Template, transcript_lines};

// ---------------------------------------------------------------------------
// Selection thresholds
// ---------------------------------------------------------------------------

/// Confidence at the start of every conversation.
pub const INITIAL_CONFIDENCE: u8 = 50;

/// Confidence swing that forces a strategic pass.
const CONFIDENCE_SHIFT_THRESHOLD: u8 = 25;

/// Unverified criteria at or below which a confident recruiter goes strategic.
const NEAR_DONE_UNVERIFIED: usize = 2;

/// Confidence at or above which a near-done recruiter goes strategic.
const NEAR_DONE_CONFIDENCE: u8 = 80;

/// Candidate answers shorter than this many words get a tactical pass.
const SHORT_ANSWER_WORDS: usize = 15;

/// Turn number from which long answers get a strategic pass.
const LATE_TURN: u32 = 6;

/// Guidance used when no analysis is available.
const DEFAULT_NEXT_ACTION: &str = "Keep exploring the criteria that are still unverified.";

/// Guidance for the opening turn.
const OPENING_NEXT_ACTION: &str =
    "Introduce yourself and ask an open question about the candidate's current work.";

// ---------------------------------------------------------------------------
// Pure policy
// ---------------------------------------------------------------------------

/// Inputs to [`select_level`].
#[derive(Debug, Clone, Copy)]
pub struct ThinkingContext<'a> {
    /// Whether the recruiter is about to open the conversation.
    pub is_opening: bool,
    /// Candidate turns so far.
    pub turn_number: u32,
    /// Confidence after the most recent pass.
    pub current_confidence: u8,
    /// Confidence before the most recent pass.
    pub previous_confidence: u8,
    /// Criteria not yet verified.
    pub remaining_unverified: usize,
    /// The candidate's latest answer.
    pub last_candidate_response: Option<&'a str>,
}

/// Choose a reasoning depth for the given context.
pub fn select_level(ctx: &ThinkingContext<'_>) -> ThinkingLevel {
    let Some(response) = ctx.last_candidate_response.filter(|_| !ctx.is_opening) else {
        return ThinkingLevel::Execution;
    };

    if ctx.current_confidence.abs_diff(ctx.previous_confidence) >= CONFIDENCE_SHIFT_THRESHOLD {
        return ThinkingLevel::Strategic;
    }
    if ctx.remaining_unverified <= NEAR_DONE_UNVERIFIED
        && ctx.current_confidence >= NEAR_DONE_CONFIDENCE
    {
        return ThinkingLevel::Strategic;
    }
    if response.split_whitespace().count() < SHORT_ANSWER_WORDS {
        return ThinkingLevel::Tactical;
    }
    if ctx.turn_number >= LATE_TURN {
        return ThinkingLevel::Strategic;
    }
    ThinkingLevel::Tactical
}

/// Largest confidence change a pass at `level` may apply.
pub const fn max_confidence_delta(level: ThinkingLevel) -> i64 {
    match level {
        ThinkingLevel::Execution => 0,
        ThinkingLevel::Tactical => 15,
        ThinkingLevel::Strategic => 25,
        ThinkingLevel::MetaCognitive => 40,
    }
}

/// Whether a pass at `level` may end the conversation.
pub const fn may_conclude(level: ThinkingLevel) -> bool {
    matches!(level, ThinkingLevel::Strategic | ThinkingLevel::MetaCognitive)
}

/// Apply a requested delta, bounded by the level, then clamp to `[0, 100]`.
pub fn apply_confidence_delta(confidence: u8, requested: i64, level: ThinkingLevel) -> u8 {
    let bound = max_confidence_delta(level);
    let delta = requested.clamp(bound.saturating_neg(), bound);
    let updated = i64::from(confidence).saturating_add(delta).clamp(0, 100);
    u8::try_from(updated).unwrap_or(confidence)
}

// ---------------------------------------------------------------------------
// Analysis response
// ---------------------------------------------------------------------------

/// Structured analysis requested from the backend.
#[derive(Debug, Default, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    what_learned: String,
    #[serde(default)]
    goal_progress: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    confidence_delta: serde_json::Value,
    #[serde(default)]
    self_correction: Option<String>,
    #[serde(default)]
    next_action: String,
    #[serde(default)]
    should_conclude: bool,
    #[serde(default)]
    critical_mismatch: bool,
}

/// Read a delta that may arrive as an integer, a float or a numeric string.
fn parse_delta(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n.as_i64().unwrap_or_else(|| {
            n.as_f64()
                .and_then(Decimal::from_f64)
                .and_then(|d| d.round().to_i64())
                .unwrap_or(0)
        }),
        serde_json::Value::String(s) => s
            .trim()
            .trim_start_matches('+')
            .parse::<Decimal>()
            .ok()
            .and_then(|d| d.round().to_i64())
            .unwrap_or(0),
        _ => 0,
    }
}

/// Read a verification flag that may arrive as a bool or a word.
fn parse_verified(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "verified" | "met" => Some(true),
            "false" | "no" | "unverified" | "unmet" | "not met" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// What the analysis prompt needs to know about the conversation.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisBrief<'a> {
    /// The recruiting side.
    pub recruiter: &'a RecruiterSide,
    /// Candidate display name.
    pub candidate_name: &'a str,
    /// Turns so far.
    pub transcript: &'a [ConversationTurn],
    /// Candidate turns so far.
    pub turn_number: u32,
}

impl AnalysisBrief<'_> {
    /// The candidate's most recent answer.
    fn last_candidate_response(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|turn| turn.role == rendezvous_types::AgentType::Candidate)
            .map(|turn| turn.content.as_str())
    }
}

/// Per-conversation reasoning state.
///
/// Each conversation owns its own controller so goal progress and
/// confidence never leak between dialogues.
pub struct ThinkingController {
    goal_progress: BTreeMap<String, bool>,
    confidence: u8,
    previous_confidence: u8,
    total_cost: Decimal,
    tracker: Option<Arc<CostTracker>>,
}

impl ThinkingController {
    /// A controller for the given criteria, all unverified.
    pub fn new(criteria: &[String]) -> Self {
        Self {
            goal_progress: criteria.iter().map(|c| (c.clone(), false)).collect(),
            confidence: INITIAL_CONFIDENCE,
            previous_confidence: INITIAL_CONFIDENCE,
            total_cost: Decimal::ZERO,
            tracker: None,
        }
    }

    /// Also report every pass to a shared tracker.
    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<CostTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Current confidence.
    pub const fn confidence(&self) -> u8 {
        self.confidence
    }

    /// Confidence before the latest pass.
    pub const fn previous_confidence(&self) -> u8 {
        self.previous_confidence
    }

    /// Current criterion verification map.
    pub const fn goal_progress(&self) -> &BTreeMap<String, bool> {
        &self.goal_progress
    }

    /// Cost charged so far.
    pub const fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    /// Criteria not yet verified.
    pub fn remaining_unverified(&self) -> usize {
        self.goal_progress.values().filter(|v| !**v).count()
    }

    /// Selection context for the next pass.
    pub fn context<'a>(
        &self,
        is_opening: bool,
        turn_number: u32,
        last_candidate_response: Option<&'a str>,
    ) -> ThinkingContext<'a> {
        ThinkingContext {
            is_opening,
            turn_number,
            current_confidence: self.confidence,
            previous_confidence: self.previous_confidence,
            remaining_unverified: self.remaining_unverified(),
            last_candidate_response,
        }
    }

    /// The execution-level signature that seeds a conversation.
    ///
    /// All criteria unverified, confidence at the midpoint, no API cost.
    pub fn initial_signature(&mut self) -> ThoughtSignature {
        self.charge(ThinkingLevel::Execution);
        ThoughtSignature {
            thinking_level: ThinkingLevel::Execution,
            what_learned: String::new(),
            goal_progress: self.goal_progress.clone(),
            match_confidence: self.confidence,
            next_action: OPENING_NEXT_ACTION.to_owned(),
            self_correction: None,
            should_conclude: false,
            critical_mismatch: false,
            cost: level_cost(ThinkingLevel::Execution),
        }
    }

    /// Select a level for the brief and run it.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the generation call itself fails.
    /// Unparseable output is not an error.
    pub async fn think(
        &mut self,
        backend: &LlmBackend,
        prompts: &PromptEngine,
        brief: &AnalysisBrief<'_>,
    ) -> Result<ThoughtSignature, LlmError> {
        let ctx = self.context(false, brief.turn_number, brief.last_candidate_response());
        let level = select_level(&ctx);
        debug!(
            ?level,
            turn = brief.turn_number,
            confidence = self.confidence,
            unverified = ctx.remaining_unverified,
            "Thinking level selected"
        );
        self.think_at(level, backend, prompts, brief).await
    }

    /// Run a meta-cognitive reflection pass regardless of the policy.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the generation call itself fails.
    pub async fn reflect(
        &mut self,
        backend: &LlmBackend,
        prompts: &PromptEngine,
        brief: &AnalysisBrief<'_>,
    ) -> Result<ThoughtSignature, LlmError> {
        debug!(turn = brief.turn_number, "Meta-cognitive reflection");
        self.think_at(ThinkingLevel::MetaCognitive, backend, prompts, brief)
            .await
    }

    /// Run one pass at a fixed level.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the generation call itself fails.
    pub async fn think_at(
        &mut self,
        level: ThinkingLevel,
        backend: &LlmBackend,
        prompts: &PromptEngine,
        brief: &AnalysisBrief<'_>,
    ) -> Result<ThoughtSignature, LlmError> {
        if level == ThinkingLevel::Execution {
            self.charge(level);
            return Ok(self.fold(level, None));
        }

        let request = match self.analysis_request(level, prompts, brief) {
            Ok(request) => request,
            Err(e) => {
                warn!(?level, "Analysis prompt failed to render, using neutral signature: {e}");
                self.charge(level);
                return Ok(self.fold(level, None));
            }
        };

        let raw = backend.generate(&request).await?;
        self.charge(level);

        let parsed = match rendezvous_llm::extract_json::<AnalysisResponse>(&raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(?level, "Unparseable analysis, using neutral signature: {e}");
                None
            }
        };
        Ok(self.fold(level, parsed))
    }

    fn analysis_request(
        &self,
        level: ThinkingLevel,
        prompts: &PromptEngine,
        brief: &AnalysisBrief<'_>,
    ) -> Result<GenerationRequest, crate::error::DialogueError> {
        let criteria: Vec<serde_json::Value> = self
            .goal_progress
            .iter()
            .map(|(criterion, verified)| {
                serde_json::json!({"criterion": criterion, "verified": verified})
            })
            .collect();
        let ctx = serde_json::json!({
            "level": level.as_str(),
            "max_delta": max_confidence_delta(level),
            "may_conclude": may_conclude(level),
            "recruiter": brief.recruiter.prompt_context(),
            "candidate_name": brief.candidate_name,
            "criteria": criteria,
            "confidence": self.confidence,
            "turn_number": brief.turn_number,
            "transcript": transcript_lines(brief.transcript),
        });
        let system = prompts.render(Template::RecruiterSystem, &ctx)?;
        let user = prompts.render(Template::Analysis, &ctx)?;
        Ok(GenerationRequest::new(
            GenerationPurpose::Analysis(level),
            system,
            user,
            OutputShape::Json,
        ))
    }

    fn charge(&mut self, level: ThinkingLevel) {
        self.total_cost = self
            .total_cost
            .checked_add(level_cost(level))
            .unwrap_or(self.total_cost);
        if let Some(tracker) = &self.tracker {
            tracker.record(level);
        }
    }

    /// Fold a (possibly absent) analysis into the controller state.
    fn fold(&mut self, level: ThinkingLevel, parsed: Option<AnalysisResponse>) -> ThoughtSignature {
        let parsed = parsed.unwrap_or_default();

        for (key, value) in &parsed.goal_progress {
            let Some(verified) = parse_verified(value) else {
                continue;
            };
            if let Some(slot) = self.criterion_slot(key) {
                *slot = verified;
            }
        }

        let updated =
            apply_confidence_delta(self.confidence, parse_delta(&parsed.confidence_delta), level);
        self.previous_confidence = self.confidence;
        self.confidence = updated;

        let concluding = may_conclude(level);
        let next_action = if parsed.next_action.trim().is_empty() {
            DEFAULT_NEXT_ACTION.to_owned()
        } else {
            parsed.next_action
        };

        ThoughtSignature {
            thinking_level: level,
            what_learned: parsed.what_learned,
            goal_progress: self.goal_progress.clone(),
            match_confidence: self.confidence,
            next_action,
            self_correction: parsed.self_correction.filter(|s| !s.trim().is_empty()),
            should_conclude: concluding && parsed.should_conclude,
            critical_mismatch: concluding && parsed.critical_mismatch,
            cost: level_cost(level),
        }
    }

    /// The map entry for a criterion named by the model.
    ///
    /// Matches exactly first, then ignoring case and surrounding space.
    /// Unknown criteria yield `None`; the key set never changes.
    fn criterion_slot(&mut self, key: &str) -> Option<&mut bool> {
        if self.goal_progress.contains_key(key) {
            return self.goal_progress.get_mut(key);
        }
        let wanted = key.trim().to_lowercase();
        self.goal_progress
            .iter_mut()
            .find(|(criterion, _)| criterion.trim().to_lowercase() == wanted)
            .map(|(_, verified)| verified)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rendezvous_llm::StubBackend;
    use rendezvous_types::{AgentType, RecruiterProfile};

    use super::*;

    fn ctx(current: u8, previous: u8, unverified: usize, turn: u32, response: &str) -> ThinkingContext<'_> {
        ThinkingContext {
            is_opening: false,
            turn_number: turn,
            current_confidence: current,
            previous_confidence: previous,
            remaining_unverified: unverified,
            last_candidate_response: Some(response),
        }
    }

    const LONG: &str = "I have spent the last six years building distributed backend systems \
                        in Rust and Go, mostly around payments and data pipelines at scale.";

    #[test]
    fn opening_is_always_execution() {
        let mut c = ctx(70, 40, 0, 9, LONG);
        c.is_opening = true;
        assert_eq!(select_level(&c), ThinkingLevel::Execution);
    }

    #[test]
    fn no_candidate_response_is_execution() {
        let mut c = ctx(50, 50, 3, 0, LONG);
        c.last_candidate_response = None;
        assert_eq!(select_level(&c), ThinkingLevel::Execution);
    }

    #[test]
    fn large_confidence_swing_is_strategic_regardless_of_turn() {
        assert_eq!(select_level(&ctx(70, 40, 5, 1, "short")), ThinkingLevel::Strategic);
        assert_eq!(select_level(&ctx(40, 70, 5, 1, LONG)), ThinkingLevel::Strategic);
        assert_eq!(select_level(&ctx(75, 50, 5, 1, "short")), ThinkingLevel::Strategic);
    }

    #[test]
    fn near_done_and_confident_is_strategic() {
        assert_eq!(select_level(&ctx(85, 80, 2, 1, "short")), ThinkingLevel::Strategic);
        assert_eq!(select_level(&ctx(85, 80, 3, 1, "short")), ThinkingLevel::Tactical);
    }

    #[test]
    fn short_answer_is_tactical_even_late() {
        assert_eq!(select_level(&ctx(50, 45, 4, 9, "Yes, I did.")), ThinkingLevel::Tactical);
    }

    #[test]
    fn late_long_answer_is_strategic() {
        assert_eq!(select_level(&ctx(50, 45, 4, 6, LONG)), ThinkingLevel::Strategic);
        assert_eq!(select_level(&ctx(50, 45, 4, 5, LONG)), ThinkingLevel::Tactical);
    }

    #[test]
    fn policy_never_selects_meta_cognitive() {
        for current in (0..=100).step_by(10) {
            for previous in (0..=100).step_by(10) {
                for turn in 0..10 {
                    let level = select_level(&ctx(current, previous, 1, turn, LONG));
                    assert_ne!(level, ThinkingLevel::MetaCognitive);
                }
            }
        }
    }

    #[test]
    fn delta_is_bounded_by_level_and_clamped() {
        assert_eq!(apply_confidence_delta(50, 100, ThinkingLevel::Tactical), 65);
        assert_eq!(apply_confidence_delta(50, -100, ThinkingLevel::Strategic), 25);
        assert_eq!(apply_confidence_delta(90, 40, ThinkingLevel::MetaCognitive), 100);
        assert_eq!(apply_confidence_delta(10, -40, ThinkingLevel::MetaCognitive), 0);
        assert_eq!(apply_confidence_delta(50, 30, ThinkingLevel::Execution), 50);
        assert_eq!(apply_confidence_delta(0, i64::MIN, ThinkingLevel::Tactical), 0);
        assert_eq!(apply_confidence_delta(100, i64::MAX, ThinkingLevel::Tactical), 100);
    }

    #[test]
    fn delta_parses_numbers_and_strings() {
        assert_eq!(parse_delta(&serde_json::json!(12)), 12);
        assert_eq!(parse_delta(&serde_json::json!(-7.6)), -8);
        assert_eq!(parse_delta(&serde_json::json!("+10")), 10);
        assert_eq!(parse_delta(&serde_json::json!(null)), 0);
    }

    fn recruiter_side() -> RecruiterSide {
        RecruiterSide::new(
            rendezvous_types::Participant {
                agent_id: rendezvous_types::AgentId::new(),
                name: "Sarah".to_owned(),
            },
            RecruiterProfile {
                role_description: "Backend engineer".to_owned(),
                candidate_selection_criteria: vec![
                    "5+ years backend".to_owned(),
                    "Rust experience".to_owned(),
                    "Mentoring".to_owned(),
                ],
                ..RecruiterProfile::default()
            },
        )
    }

    fn candidate_turn(content: &str) -> ConversationTurn {
        ConversationTurn {
            role: AgentType::Candidate,
            speaker_name: "Alex".to_owned(),
            content: content.to_owned(),
            timestamp: chrono::Utc::now(),
            is_final: false,
            final_evaluation: None,
            thinking_level: None,
            match_confidence: None,
        }
    }

    fn controller() -> ThinkingController {
        ThinkingController::new(recruiter_side().profile.candidate_selection_criteria.as_slice())
    }

    #[test]
    fn initial_signature_is_free_and_neutral() {
        let mut controller = controller();
        let signature = controller.initial_signature();
        assert_eq!(signature.thinking_level, ThinkingLevel::Execution);
        assert_eq!(signature.match_confidence, INITIAL_CONFIDENCE);
        assert_eq!(signature.goal_progress.len(), 3);
        assert!(signature.goal_progress.values().all(|v| !v));
        assert_eq!(signature.cost, Decimal::ZERO);
    }

    #[tokio::test]
    async fn non_json_analysis_yields_neutral_signature() {
        let backend = LlmBackend::Stub(StubBackend::new(|_| {
            Ok("The candidate seems nice, I would continue.".to_owned())
        }));
        let prompts = PromptEngine::builtin().unwrap();
        let recruiter = recruiter_side();
        let transcript = vec![candidate_turn("Yes.")];
        let brief = AnalysisBrief {
            recruiter: &recruiter,
            candidate_name: "Alex",
            transcript: &transcript,
            turn_number: 1,
        };

        let mut controller = controller();
        let signature = controller.think(&backend, &prompts, &brief).await.unwrap();

        assert_eq!(signature.thinking_level, ThinkingLevel::Tactical);
        assert_eq!(signature.match_confidence, INITIAL_CONFIDENCE);
        assert!(signature.goal_progress.values().all(|v| !v));
        assert_eq!(signature.goal_progress.len(), 3);
        assert!(!signature.should_conclude);
        assert_eq!(signature.cost, Decimal::new(1, 2));
        assert_eq!(controller.total_cost(), Decimal::new(1, 2));
    }

    #[tokio::test]
    async fn analysis_flips_known_criteria_only() {
        let backend = LlmBackend::Stub(StubBackend::new(|_| {
            Ok(r#"```json
{"what_learned": "Six years of Rust", "goal_progress": {"rust experience": true, "Kubernetes": true, "Mentoring": "no"},
 "confidence_delta": 12, "next_action": "Ask about mentoring", "should_conclude": true, "critical_mismatch": false}
```"#
                .to_owned())
        }));
        let prompts = PromptEngine::builtin().unwrap();
        let recruiter = recruiter_side();
        let transcript = vec![candidate_turn("Ok.")];
        let brief = AnalysisBrief {
            recruiter: &recruiter,
            candidate_name: "Alex",
            transcript: &transcript,
            turn_number: 1,
        };

        let mut controller = controller();
        let signature = controller.think(&backend, &prompts, &brief).await.unwrap();

        assert_eq!(signature.goal_progress.len(), 3);
        assert_eq!(signature.goal_progress.get("Rust experience"), Some(&true));
        assert_eq!(signature.goal_progress.get("Mentoring"), Some(&false));
        assert!(!signature.goal_progress.contains_key("Kubernetes"));
        assert_eq!(signature.match_confidence, 62);
        assert_eq!(signature.next_action, "Ask about mentoring");
        // Tactical passes cannot end the conversation.
        assert!(!signature.should_conclude);
        assert_eq!(controller.previous_confidence(), INITIAL_CONFIDENCE);
    }

    #[tokio::test]
    async fn reflection_may_conclude_with_wide_delta() {
        let backend = LlmBackend::Stub(StubBackend::new(|_| {
            Ok(r#"{"confidence_delta": -90, "critical_mismatch": true, "self_correction": "Overrated the Go work"}"#.to_owned())
        }));
        let prompts = PromptEngine::builtin().unwrap();
        let recruiter = recruiter_side();
        let transcript = vec![candidate_turn(LONG)];
        let brief = AnalysisBrief {
            recruiter: &recruiter,
            candidate_name: "Alex",
            transcript: &transcript,
            turn_number: 2,
        };

        let mut controller = controller();
        let signature = controller.reflect(&backend, &prompts, &brief).await.unwrap();
        assert_eq!(signature.thinking_level, ThinkingLevel::MetaCognitive);
        assert_eq!(signature.match_confidence, 10);
        assert!(signature.critical_mismatch);
        assert_eq!(signature.self_correction.as_deref(), Some("Overrated the Go work"));
        assert_eq!(signature.next_action, DEFAULT_NEXT_ACTION);
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let backend = LlmBackend::Stub(StubBackend::new(|_| Err(LlmError::Timeout)));
        let prompts = PromptEngine::builtin().unwrap();
        let recruiter = recruiter_side();
        let transcript = vec![candidate_turn(LONG)];
        let brief = AnalysisBrief {
            recruiter: &recruiter,
            candidate_name: "Alex",
            transcript: &transcript,
            turn_number: 1,
        };

        let mut controller = controller();
        let result = controller.think(&backend, &prompts, &brief).await;
        assert!(matches!(result, Err(LlmError::Timeout)));
        assert_eq!(controller.total_cost(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn tracker_receives_every_pass() {
        let tracker = Arc::new(CostTracker::new());
        let backend = LlmBackend::Stub(StubBackend::canned());
        let prompts = PromptEngine::builtin().unwrap();
        let recruiter = recruiter_side();
        let transcript = vec![candidate_turn(LONG)];
        let brief = AnalysisBrief {
            recruiter: &recruiter,
            candidate_name: "Alex",
            transcript: &transcript,
            turn_number: 1,
        };

        let mut controller = controller().with_tracker(Arc::clone(&tracker));
        controller.initial_signature();
        controller.think(&backend, &prompts, &brief).await.unwrap();

        let summary = tracker.summary();
        assert_eq!(summary.total_calls, 2);
        assert_eq!(summary.calls_by_level.get("execution"), Some(&1));
        assert_eq!(summary.calls_by_level.get("tactical"), Some(&1));
    }
}
