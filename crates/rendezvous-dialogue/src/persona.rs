//! The two sides of a dialogue.
//!
//! A conversation is always recruiter versus candidate; the constructors
//! here turn generic [`AgentProfile`]s into role-checked sides and render
//! them into the prompt context the templates expect.

use rendezvous_types::{AgentProfile, CandidateProfile, Participant, RecruiterProfile};

use crate::error::DialogueError;

/// The recruiting side of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecruiterSide {
    /// Id and display name.
    pub participant: Participant,
    /// Hiring brief.
    pub profile: RecruiterProfile,
}

impl RecruiterSide {
    /// Build from parts.
    pub const fn new(participant: Participant, profile: RecruiterProfile) -> Self {
        Self {
            participant,
            profile,
        }
    }

    /// Build from a stored profile, which must be a recruiter.
    pub fn from_profile(profile: &AgentProfile) -> Result<Self, DialogueError> {
        let Some(recruiter) = profile.as_recruiter() else {
            return Err(DialogueError::InvalidParticipants(format!(
                "agent {} is a {}, not a recruiter",
                profile.id, profile.agent_type
            )));
        };
        if recruiter.candidate_selection_criteria.is_empty() {
            return Err(DialogueError::InvalidParticipants(format!(
                "recruiter {} has no selection criteria",
                profile.id
            )));
        }
        Ok(Self::new(profile.participant(), recruiter.clone()))
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.participant.name
    }

    /// Template context for this side.
    pub fn prompt_context(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.participant.name,
            "bio": self.profile.bio,
            "role_description": self.profile.role_description,
            "criteria": self.profile.candidate_selection_criteria,
            "deal_breakers": self.profile.deal_breakers,
            "positive_signals": self.profile.positive_signals,
            "company_context": self.profile.company_context,
            "team_context": self.profile.team_context,
        })
    }
}

/// The candidate side of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSide {
    /// Id and display name.
    pub participant: Participant,
    /// Background.
    pub profile: CandidateProfile,
}

impl CandidateSide {
    /// Build from parts.
    pub const fn new(participant: Participant, profile: CandidateProfile) -> Self {
        Self {
            participant,
            profile,
        }
    }

    /// Build from a stored profile, which must be a candidate.
    pub fn from_profile(profile: &AgentProfile) -> Result<Self, DialogueError> {
        let Some(candidate) = profile.as_candidate() else {
            return Err(DialogueError::InvalidParticipants(format!(
                "agent {} is a {}, not a candidate",
                profile.id, profile.agent_type
            )));
        };
        Ok(Self::new(profile.participant(), candidate.clone()))
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.participant.name
    }

    /// Template context for this side.
    pub fn prompt_context(&self) -> serde_json::Value {
        let experience: Vec<serde_json::Value> = self
            .profile
            .work_experience
            .iter()
            .map(|job| {
                serde_json::json!({
                    "company": job.company,
                    "title": job.title,
                    "duration": job.duration,
                    "highlights": job.highlights,
                })
            })
            .collect();
        serde_json::json!({
            "name": self.participant.name,
            "summary": self.profile.professional_summary,
            "experience": experience,
            "skills": self.profile.technical_skills,
            "education": self.profile.education,
            "projects": self.profile.projects,
            "career_goals": self.profile.career_goals,
            "interests": self.profile.interests,
            "location": self.profile.location,
            "availability": self.profile.availability,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rendezvous_types::{AgentId, AgentType, ProfileDetails, WorkExperience};

    use super::*;

    fn candidate_profile() -> AgentProfile {
        AgentProfile {
            id: AgentId::new(),
            username: "alex".to_owned(),
            name: "Alex Johnson".to_owned(),
            agent_type: AgentType::Candidate,
            details: ProfileDetails::Candidate(CandidateProfile {
                professional_summary: "Backend engineer".to_owned(),
                work_experience: vec![WorkExperience {
                    company: "Acme".to_owned(),
                    title: "Senior Engineer".to_owned(),
                    ..WorkExperience::default()
                }],
                technical_skills: vec!["Rust".to_owned()],
                ..CandidateProfile::default()
            }),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn candidate_cannot_be_recruiter_side() {
        let profile = candidate_profile();
        assert!(matches!(
            RecruiterSide::from_profile(&profile),
            Err(DialogueError::InvalidParticipants(_))
        ));
        assert!(CandidateSide::from_profile(&profile).is_ok());
    }

    #[test]
    fn candidate_context_lists_experience() {
        let side = CandidateSide::from_profile(&candidate_profile());
        let ctx = side.map(|s| s.prompt_context()).unwrap_or_default();
        assert_eq!(
            ctx.pointer("/experience/0/company").and_then(|v| v.as_str()),
            Some("Acme")
        );
        assert_eq!(ctx.get("name").and_then(|v| v.as_str()), Some("Alex Johnson"));
    }
}
