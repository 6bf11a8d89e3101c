//! Free motion of agents that are not talking.
//!
//! An idle agent waits for a randomly drawn pause, then picks a random
//! target and walks toward it at constant speed. On arrival it becomes idle
//! again. Talking agents never move.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rendezvous_types::{AgentId, AgentState, AgentStatus};
use tracing::trace;

use crate::config::WorldConfig;

/// Random source and per-agent idle limits for the motion model.
#[derive(Debug)]
pub struct Motion {
    rng: StdRng,
    /// Pause length drawn when an idle period starts, cleared when it ends.
    idle_limits: BTreeMap<AgentId, f64>,
}

impl Motion {
    /// A motion model seeded for reproducible runs, or from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            rng,
            idle_limits: BTreeMap::new(),
        }
    }

    /// A uniformly random point at least `spawn_inset` from every border.
    pub fn spawn_point(&mut self, cfg: &WorldConfig) -> (f64, f64) {
        let x = uniform(
            &mut self.rng,
            cfg.spawn_inset,
            cfg.world_width - cfg.spawn_inset,
        );
        let y = uniform(
            &mut self.rng,
            cfg.spawn_inset,
            cfg.world_height - cfg.spawn_inset,
        );
        (x, y)
    }

    /// Advance one agent by `dt` seconds.
    pub fn advance(&mut self, agent: &mut AgentState, dt: f64, cfg: &WorldConfig) {
        match agent.status {
            AgentStatus::Talking => {
                self.idle_limits.remove(&agent.agent_id);
            }
            AgentStatus::Idle => self.advance_idle(agent, dt, cfg),
            AgentStatus::Walking => self.advance_walking(agent, dt, cfg),
        }
    }

    /// Drop any idle limit held for `agent_id`.
    pub fn forget(&mut self, agent_id: AgentId) {
        self.idle_limits.remove(&agent_id);
    }

    fn advance_idle(&mut self, agent: &mut AgentState, dt: f64, cfg: &WorldConfig) {
        agent.idle_elapsed += dt;
        let limit = match self.idle_limits.get(&agent.agent_id) {
            Some(limit) => *limit,
            None => {
                let limit = uniform(
                    &mut self.rng,
                    cfg.idle_duration_min_secs,
                    cfg.idle_duration_max_secs,
                );
                self.idle_limits.insert(agent.agent_id, limit);
                limit
            }
        };
        if agent.idle_elapsed <= limit {
            return;
        }

        let (tx, ty) = self.spawn_point(cfg);
        agent.status = AgentStatus::Walking;
        agent.target_x = Some(tx);
        agent.target_y = Some(ty);
        agent.idle_elapsed = 0.0;
        self.idle_limits.remove(&agent.agent_id);
        trace!(agent_id = %agent.agent_id, tx, ty, "Agent started walking");
    }

    fn advance_walking(&mut self, agent: &mut AgentState, dt: f64, cfg: &WorldConfig) {
        let (Some(tx), Some(ty)) = (agent.target_x, agent.target_y) else {
            settle(agent);
            return;
        };

        let dx = tx - agent.x;
        let dy = ty - agent.y;
        let dist = dx.hypot(dy);
        if dist > 0.0 {
            let step = (cfg.move_speed * dt).min(dist);
            agent.x += dx / dist * step;
            agent.y += dy / dist * step;
        }
        agent.x = agent
            .x
            .clamp(cfg.boundary_margin, cfg.world_width - cfg.boundary_margin);
        agent.y = agent
            .y
            .clamp(cfg.boundary_margin, cfg.world_height - cfg.boundary_margin);

        if (tx - agent.x).hypot(ty - agent.y) < cfg.arrival_epsilon {
            settle(agent);
            self.idle_limits.remove(&agent.agent_id);
        }
    }
}

const fn settle(agent: &mut AgentState) {
    agent.status = AgentStatus::Idle;
    agent.target_x = None;
    agent.target_y = None;
    agent.idle_elapsed = 0.0;
}

fn uniform(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    if hi > lo { rng.random_range(lo..=hi) } else { lo }
}
