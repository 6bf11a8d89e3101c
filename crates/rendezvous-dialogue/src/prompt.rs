//! Prompt template loading and rendering via `minijinja`.
//!
//! Default templates are compiled into the crate from `templates/`. An
//! operator can point [`PromptEngine::from_dir`] at a directory to replace
//! any of them without recompiling; files that are absent keep the
//! built-in version.

use std::path::Path;

use minijinja::{Environment, UndefinedBehavior};
use rendezvous_types::ConversationTurn;
use serde::Serialize;
use tracing::info;

use crate::error::DialogueError;

/// The templates a conversation renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Recruiter persona and hiring brief.
    RecruiterSystem,
    /// Candidate persona and background.
    CandidateSystem,
    /// First recruiter message.
    RecruiterOpening,
    /// Recruiter message guided by an analysis.
    RecruiterFollowUp,
    /// Candidate answer.
    CandidateReply,
    /// Structured analysis for the thinking controller.
    Analysis,
    /// Closing remark and evaluation.
    FinalEvaluation,
}

impl Template {
    /// Every template.
    pub const ALL: [Self; 7] = [
        Self::RecruiterSystem,
        Self::CandidateSystem,
        Self::RecruiterOpening,
        Self::RecruiterFollowUp,
        Self::CandidateReply,
        Self::Analysis,
        Self::FinalEvaluation,
    ];

    /// Template name, also the file stem on disk.
    pub const fn name(self) -> &'static str {
        match self {
            Self::RecruiterSystem => "recruiter_system",
            Self::CandidateSystem => "candidate_system",
            Self::RecruiterOpening => "recruiter_opening",
            Self::RecruiterFollowUp => "recruiter_followup",
            Self::CandidateReply => "candidate_reply",
            Self::Analysis => "analysis",
            Self::FinalEvaluation => "final_evaluation",
        }
    }

    const fn builtin_source(self) -> &'static str {
        match self {
            Self::RecruiterSystem => include_str!("../templates/recruiter_system.j2"),
            Self::CandidateSystem => include_str!("../templates/candidate_system.j2"),
            Self::RecruiterOpening => include_str!("../templates/recruiter_opening.j2"),
            Self::RecruiterFollowUp => include_str!("../templates/recruiter_followup.j2"),
            Self::CandidateReply => include_str!("../templates/candidate_reply.j2"),
            Self::Analysis => include_str!("../templates/analysis.j2"),
            Self::FinalEvaluation => include_str!("../templates/final_evaluation.j2"),
        }
    }
}

/// Compiled prompt templates.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// An engine with the built-in templates.
    pub fn builtin() -> Result<Self, DialogueError> {
        let mut env = Environment::new();
        // Optional profile fields may be missing entirely.
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        for template in Template::ALL {
            env.add_template(template.name(), template.builtin_source())
                .map_err(|e| {
                    DialogueError::Template(format!(
                        "failed to add {} template: {e}",
                        template.name()
                    ))
                })?;
        }
        Ok(Self { env })
    }

    /// Built-in templates, overridden by any `<name>.j2` found in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, DialogueError> {
        let mut engine = Self::builtin()?;
        for template in Template::ALL {
            let path = dir.join(format!("{}.j2", template.name()));
            if !path.is_file() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|e| {
                DialogueError::Template(format!("failed to read {}: {e}", path.display()))
            })?;
            engine
                .env
                .add_template_owned(template.name(), source)
                .map_err(|e| {
                    DialogueError::Template(format!(
                        "failed to add {} template: {e}",
                        template.name()
                    ))
                })?;
            info!(template = template.name(), path = %path.display(), "Template override loaded");
        }
        Ok(engine)
    }

    /// Render one template with a serializable context.
    pub fn render<S: Serialize>(&self, template: Template, ctx: &S) -> Result<String, DialogueError> {
        self.env
            .get_template(template.name())
            .map_err(|e| {
                DialogueError::Template(format!("missing {} template: {e}", template.name()))
            })?
            .render(ctx)
            .map(|text| text.trim().to_owned())
            .map_err(|e| {
                DialogueError::Template(format!("{} render failed: {e}", template.name()))
            })
    }
}

/// One `Name (role): text` line per turn.
pub fn transcript_lines(turns: &[ConversationTurn]) -> Vec<String> {
    turns
        .iter()
        .map(|turn| format!("{} ({}): {}", turn.speaker_name, turn.role, turn.content))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rendezvous_types::AgentType;

    use super::*;

    #[test]
    fn recruiter_system_lists_criteria() {
        let engine = PromptEngine::builtin().unwrap();
        let ctx = serde_json::json!({
            "recruiter": {
                "name": "Sarah Chen",
                "role_description": "Staff engineer",
                "criteria": ["Rust", "Mentoring"],
                "deal_breakers": [],
            }
        });
        let text = engine.render(Template::RecruiterSystem, &ctx).unwrap();
        assert!(text.starts_with("You are Sarah Chen"));
        assert!(text.contains("- Rust\n- Mentoring"));
        assert!(!text.contains("Deal-breakers"));
    }

    #[test]
    fn analysis_offers_conclude_flags_only_when_allowed() {
        let engine = PromptEngine::builtin().unwrap();
        let tactical = engine
            .render(
                Template::Analysis,
                &serde_json::json!({"level": "tactical", "max_delta": 15, "may_conclude": false}),
            )
            .unwrap();
        assert!(!tactical.contains("should_conclude"));
        assert!(tactical.contains("-15 and 15"));

        let strategic = engine
            .render(
                Template::Analysis,
                &serde_json::json!({"level": "strategic", "max_delta": 25, "may_conclude": true}),
            )
            .unwrap();
        assert!(strategic.contains("should_conclude"));
    }

    #[test]
    fn override_directory_replaces_single_template() {
        let dir = std::env::temp_dir().join(format!("rendezvous-prompts-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("recruiter_opening.j2"), "Hello {{ candidate_name }}!").unwrap();

        let engine = PromptEngine::from_dir(&dir).unwrap();
        let text = engine
            .render(Template::RecruiterOpening, &serde_json::json!({"candidate_name": "Alex"}))
            .unwrap();
        assert_eq!(text, "Hello Alex!");
        let system = engine
            .render(Template::RecruiterSystem, &serde_json::json!({}))
            .unwrap();
        assert!(system.starts_with("You are"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn transcript_lines_name_speaker_and_role() {
        let turns = vec![ConversationTurn {
            role: AgentType::Recruiter,
            speaker_name: "Sarah".to_owned(),
            content: "Hi!".to_owned(),
            timestamp: Utc::now(),
            is_final: false,
            final_evaluation: None,
            thinking_level: None,
            match_confidence: None,
        }];
        assert_eq!(transcript_lines(&turns), vec!["Sarah (recruiter): Hi!".to_owned()]);
    }
}
