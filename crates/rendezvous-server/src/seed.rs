//! Seed profiles loaded at startup.
//!
//! The seed file is a YAML list of profile drafts. Profiles whose username
//! already exists are skipped, so restarting against a persistent store
//! does not duplicate them.

use std::path::Path;

use rendezvous_core::{ProfileDraft, WorldEngine};
use rendezvous_types::AgentId;
use tracing::{debug, info};

use crate::error::ServerError;

/// What seeding did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Profiles inserted.
    pub created: usize,
    /// Profiles skipped because the username exists.
    pub skipped: usize,
    /// Profiles placed into the world.
    pub spawned: usize,
}

/// Read drafts from a YAML file.
pub fn load_drafts(path: &Path) -> Result<Vec<ProfileDraft>, ServerError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ServerError::Seed {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    parse_drafts(&contents)
}

/// Parse drafts from YAML text.
pub fn parse_drafts(yaml: &str) -> Result<Vec<ProfileDraft>, ServerError> {
    serde_yml::from_str(yaml).map_err(|e| ServerError::Seed {
        message: format!("invalid seed YAML: {e}"),
    })
}

/// Insert `drafts` and, if `spawn` is set, place every seeded profile
/// (new or existing) into the world.
pub async fn apply(
    engine: &WorldEngine,
    drafts: Vec<ProfileDraft>,
    spawn: bool,
) -> Result<SeedSummary, ServerError> {
    let mut summary = SeedSummary::default();
    let mut seeded: Vec<AgentId> = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let existing = engine
            .profile_by_username(&draft.username)
            .await
            .map_err(seed_error)?;
        if let Some(profile) = existing {
            debug!(username = %profile.username, "Seed profile exists, skipping");
            summary.skipped = summary.skipped.saturating_add(1);
            seeded.push(profile.id);
            continue;
        }
        let profile = engine.create_profile(draft).await.map_err(seed_error)?;
        summary.created = summary.created.saturating_add(1);
        seeded.push(profile.id);
    }

    if spawn {
        for id in seeded {
            engine.spawn(id, None).await.map_err(seed_error)?;
            summary.spawned = summary.spawned.saturating_add(1);
        }
    }

    info!(
        created = summary.created,
        skipped = summary.skipped,
        spawned = summary.spawned,
        "Seed profiles applied"
    );
    Ok(summary)
}

#[allow(clippy::needless_pass_by_value)]
fn seed_error(e: rendezvous_core::EngineError) -> ServerError {
    ServerError::Seed {
        message: e.to_string(),
    }
}
