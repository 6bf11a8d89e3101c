//! Integration tests for the conversation state machine.
//!
//! Every test runs against an in-process stub backend, so no network or
//! API key is needed.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use futures::StreamExt;
use rendezvous_dialogue::{
    Conversation, ConversationPhase, ConversationSettings, DialogueError, DialogueEvent,
    PromptEngine,
};
use rendezvous_llm::{GenerationPurpose, GenerationRequest, LlmBackend, LlmError, StubBackend};
use rendezvous_types::{
    AgentId, AgentProfile, AgentType, CandidateProfile, ConversationId, Decision, ProfileDetails,
    RecruiterProfile, ThinkingLevel, WorkExperience,
};

fn recruiter() -> AgentProfile {
    AgentProfile {
        id: AgentId::new(),
        username: "sarah".to_owned(),
        name: "Sarah Chen".to_owned(),
        agent_type: AgentType::Recruiter,
        details: ProfileDetails::Recruiter(RecruiterProfile {
            role_description: "Senior backend engineer".to_owned(),
            candidate_selection_criteria: vec![
                "5+ years of backend experience".to_owned(),
                "Has led a team".to_owned(),
            ],
            ..RecruiterProfile::default()
        }),
        created_at: Utc::now(),
    }
}

fn candidate() -> AgentProfile {
    AgentProfile {
        id: AgentId::new(),
        username: "alex".to_owned(),
        name: "Alex Johnson".to_owned(),
        agent_type: AgentType::Candidate,
        details: ProfileDetails::Candidate(CandidateProfile {
            professional_summary: "Backend engineer".to_owned(),
            work_experience: vec![WorkExperience {
                company: "Acme".to_owned(),
                title: "Staff Engineer".to_owned(),
                ..WorkExperience::default()
            }],
            technical_skills: vec!["Rust".to_owned()],
            ..CandidateProfile::default()
        }),
        created_at: Utc::now(),
    }
}

fn conversation(backend: LlmBackend, max_turns: u32) -> Conversation {
    Conversation::new(
        ConversationId::new(),
        &recruiter(),
        &candidate(),
        Arc::new(backend),
        Arc::new(PromptEngine::builtin().unwrap()),
        ConversationSettings {
            max_turns,
            strategy_hints: true,
        },
    )
    .unwrap()
}

/// Canned answers, except analysis and final evaluation come from the
/// given strings.
fn scripted(analysis: &'static str, evaluation: &'static str) -> LlmBackend {
    LlmBackend::Stub(StubBackend::new(move |request: &GenerationRequest| {
        Ok(match request.purpose {
            GenerationPurpose::Analysis(_) => analysis.to_owned(),
            GenerationPurpose::FinalEvaluation => evaluation.to_owned(),
            other => rendezvous_llm::backend::canned_response(other).to_owned(),
        })
    }))
}

async fn run_to_end(conversation: &mut Conversation) {
    while conversation.step().await.unwrap().is_some() {}
}

#[tokio::test]
async fn concludes_within_turn_limit() {
    let mut conversation = conversation(LlmBackend::Stub(StubBackend::canned()), 8);
    run_to_end(&mut conversation).await;

    assert_eq!(conversation.phase(), ConversationPhase::Concluded);
    assert!(conversation.candidate_turns() <= 8);
    assert_eq!(conversation.candidate_turns(), 7);

    let last = conversation.turns().last().unwrap();
    assert!(last.is_final);
    assert_eq!(last.role, AgentType::Recruiter);
    assert!(last.final_evaluation.as_deref().unwrap().contains("Rating: 6/10"));

    let outcome = conversation.outcome().unwrap();
    assert_eq!(outcome.match_score, Some(6));
    assert_eq!(outcome.decision, Some(Decision::GoodFit));
    assert_eq!(outcome.candidate_turns, 7);

    // Concluded conversations yield nothing further.
    assert!(conversation.step().await.unwrap().is_none());
}

#[tokio::test]
async fn turns_alternate_starting_with_recruiter() {
    let mut conversation = conversation(LlmBackend::Stub(StubBackend::canned()), 4);
    run_to_end(&mut conversation).await;

    let turns = conversation.turns();
    assert_eq!(turns[0].role, AgentType::Recruiter);
    assert_eq!(turns[0].thinking_level, Some(ThinkingLevel::Execution));
    assert_eq!(turns[0].match_confidence, Some(50));
    for pair in turns.windows(2) {
        assert_ne!(pair[0].role, pair[1].role);
    }
    assert_eq!(turns.iter().filter(|t| t.is_final).count(), 1);
    assert!(turns.iter().filter(|t| t.role == AgentType::Candidate).all(|t| t.thinking_level.is_none()));
}

#[tokio::test]
async fn strategic_pass_may_end_conversation_early() {
    let backend = scripted(
        r#"{"what_learned": "Enough.", "goal_progress": {}, "confidence_delta": 0, "next_action": "Wrap up.", "should_conclude": true, "critical_mismatch": false}"#,
        r#"{"closing_remark": "Thanks!", "evaluation": "Rating: 8/10\nDecision: GOOD FIT"}"#,
    );
    let mut conversation = conversation(backend, 12);
    run_to_end(&mut conversation).await;

    // Tactical passes cannot conclude; the first strategic pass comes at
    // candidate turn 6 for long answers.
    assert_eq!(conversation.candidate_turns(), 6);
    let last = conversation.turns().last().unwrap();
    assert!(last.is_final);
    assert_eq!(last.content, "Thanks!");
    assert_eq!(last.thinking_level, Some(ThinkingLevel::Strategic));
    assert_eq!(conversation.outcome().unwrap().match_score, Some(8));
}

#[tokio::test]
async fn critical_mismatch_triggers_reflection() {
    let reflections = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&reflections);
    let backend = LlmBackend::Stub(StubBackend::new(move |request: &GenerationRequest| {
        Ok(match request.purpose {
            GenerationPurpose::Analysis(level) => {
                if level == ThinkingLevel::MetaCognitive {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                r#"{"what_learned": "Deal-breaker.", "confidence_delta": -10, "next_action": "Close.", "should_conclude": false, "critical_mismatch": true}"#.to_owned()
            }
            GenerationPurpose::FinalEvaluation => {
                r#"{"closing_remark": "Thank you.", "evaluation": "Rating: 2/10\nDecision: NOT A FIT"}"#.to_owned()
            }
            other => rendezvous_llm::backend::canned_response(other).to_owned(),
        })
    }));
    let mut conversation = conversation(backend, 12);
    run_to_end(&mut conversation).await;

    assert_eq!(reflections.load(Ordering::SeqCst), 1);
    let outcome = conversation.outcome().unwrap();
    assert_eq!(outcome.decision, Some(Decision::NotAFit));
    assert_eq!(outcome.match_score, Some(2));
    assert_eq!(
        conversation.turns().last().unwrap().thinking_level,
        Some(ThinkingLevel::MetaCognitive)
    );
}

#[tokio::test]
async fn malformed_analysis_does_not_abort() {
    let backend = scripted("I think it went well!", "Rating: 7/10. Decision: GOOD FIT");
    let mut conversation = conversation(backend, 4);
    run_to_end(&mut conversation).await;

    let outcome = conversation.outcome().unwrap();
    assert_eq!(outcome.final_confidence, 50);
    // Unstructured evaluation text is kept as-is.
    assert_eq!(outcome.final_evaluation, "Rating: 7/10. Decision: GOOD FIT");
    assert_eq!(outcome.match_score, Some(7));
}

#[tokio::test]
async fn generation_failure_is_an_error() {
    let backend = LlmBackend::Stub(StubBackend::new(|request: &GenerationRequest| {
        match request.purpose {
            GenerationPurpose::CandidateReply => Err(LlmError::Backend("connection reset".to_owned())),
            other => Ok(rendezvous_llm::backend::canned_response(other).to_owned()),
        }
    }));
    let mut conversation = conversation(backend, 12);

    assert!(conversation.step().await.unwrap().is_some());
    let err = conversation.step().await.unwrap_err();
    assert!(matches!(err, DialogueError::Generation(_)));
    assert!(conversation.outcome().is_none());
}

#[tokio::test]
async fn swapped_roles_are_rejected() {
    let result = Conversation::new(
        ConversationId::new(),
        &candidate(),
        &recruiter(),
        Arc::new(LlmBackend::Stub(StubBackend::canned())),
        Arc::new(PromptEngine::builtin().unwrap()),
        ConversationSettings::default(),
    );
    assert!(matches!(result, Err(DialogueError::InvalidParticipants(_))));
}

#[tokio::test]
async fn stream_yields_turns_then_outcome() {
    let stream = conversation(LlmBackend::Stub(StubBackend::canned()), 4).into_stream();
    let events: Vec<_> = stream.collect().await;

    let (last, turns) = events.split_last().unwrap();
    assert!(matches!(last, Ok(DialogueEvent::Concluded(_))));
    assert!(turns.iter().all(|e| matches!(e, Ok(DialogueEvent::Turn(_)))));
    // Opening, three replies, two follow-ups, closing remark.
    assert_eq!(turns.len(), 1 + 3 + 2 + 1);
}

#[tokio::test]
async fn stream_ends_after_error() {
    let backend = LlmBackend::Stub(StubBackend::new(|request: &GenerationRequest| {
        match request.purpose {
            GenerationPurpose::RecruiterOpening => Err(LlmError::Timeout),
            other => Ok(rendezvous_llm::backend::canned_response(other).to_owned()),
        }
    }));
    let mut stream = conversation(backend, 4).into_stream();

    assert!(matches!(stream.next_event().await, Some(Err(DialogueError::Generation(_)))));
    assert!(stream.next_event().await.is_none());
}
