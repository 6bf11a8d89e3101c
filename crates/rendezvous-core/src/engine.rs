//! The world simulation engine.
//!
//! [`WorldEngine`] owns the authoritative agent states, advances their
//! motion on a fixed-interval tick, runs the proximity matcher after every
//! motion step and supervises the conversations it starts. Each tick ends
//! with a `world_state` broadcast.
//!
//! World state lives behind a short-lived mutex that is never held across
//! an await point. Conversations run on their own tasks and touch world
//! state only when they finish, to release both participants.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rendezvous_dialogue::Conversation;
use rendezvous_types::{
    ActiveConversation, AgentId, AgentState, ConversationId, ConversationRecord, WorldEvent,
    WorldState,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::WorldConfig;
use crate::conversations::ConversationService;
use crate::error::EngineError;
use crate::hub::{EventHub, Subscription};
use crate::motion::Motion;
use crate::proximity::{ProximityMatch, ProximityMatcher};

/// Mutable world state guarded by the engine mutex.
struct World {
    agents: Vec<AgentState>,
    motion: Motion,
    matcher: ProximityMatcher,
    active: BTreeMap<ConversationId, ActiveConversation>,
    /// Conversation each talking agent belongs to.
    engaged: BTreeMap<AgentId, ConversationId>,
    running: bool,
}

impl World {
    fn agent(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.iter().find(|a| a.agent_id == id)
    }

    fn agent_mut(&mut self, id: AgentId) -> Option<&mut AgentState> {
        self.agents.iter_mut().find(|a| a.agent_id == id)
    }

    /// Return `agent` to idle if it is still talking with `partner`.
    fn release(&mut self, agent: AgentId, partner: AgentId) {
        if let Some(state) = self.agent_mut(agent)
            && state.partner_id == Some(partner)
        {
            state.release();
            self.engaged.remove(&agent);
        }
    }

    /// Return `agent` to idle if it is still talking in `conversation`.
    fn release_from(&mut self, agent: AgentId, conversation: ConversationId) {
        if self.engaged.get(&agent) != Some(&conversation) {
            return;
        }
        self.engaged.remove(&agent);
        if let Some(state) = self.agent_mut(agent) {
            state.release();
        }
    }

    /// Bind a talking pair to `conversation`. Returns `false` if the two
    /// are no longer partnered with each other.
    fn engage(
        &mut self,
        recruiter: AgentId,
        candidate: AgentId,
        conversation: ConversationId,
    ) -> bool {
        let partnered = |a: AgentId, b: AgentId| {
            self.agent(a).is_some_and(|s| s.partner_id == Some(b))
        };
        if !(partnered(recruiter, candidate) && partnered(candidate, recruiter)) {
            return false;
        }
        self.engaged.insert(recruiter, conversation);
        self.engaged.insert(candidate, conversation);
        true
    }
}

struct Ticker {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

struct EngineInner {
    config: WorldConfig,
    service: ConversationService,
    world: Mutex<World>,
    ticker: Mutex<Option<Ticker>>,
}

/// Handle to the running world. Cheap to clone.
#[derive(Clone)]
pub struct WorldEngine {
    inner: Arc<EngineInner>,
}

impl WorldEngine {
    /// An engine with no agents, not yet ticking.
    pub fn new(config: WorldConfig, service: ConversationService) -> Self {
        let motion = Motion::new(config.seed);
        Self {
            inner: Arc::new(EngineInner {
                config,
                service,
                world: Mutex::new(World {
                    agents: Vec::new(),
                    motion,
                    matcher: ProximityMatcher::new(),
                    active: BTreeMap::new(),
                    engaged: BTreeMap::new(),
                    running: false,
                }),
                ticker: Mutex::new(None),
            }),
        }
    }

    /// World tunables.
    pub fn config(&self) -> &WorldConfig {
        &self.inner.config
    }

    /// The conversation service.
    pub fn service(&self) -> &ConversationService {
        &self.inner.service
    }

    /// The event hub.
    pub fn hub(&self) -> &EventHub {
        self.inner.service.hub()
    }

    /// Register a new event subscriber.
    pub fn subscribe(&self) -> Subscription {
        self.hub().subscribe()
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.inner
            .world
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // -- agents -------------------------------------------------------------

    /// Place the agent behind profile `agent_id` into the world.
    ///
    /// Returns the existing state unchanged if the agent is already
    /// spawned. Without a position a random point inset from the border is
    /// used.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if no profile exists and
    /// [`EngineError::InvalidArgument`] if the position lies outside the
    /// world.
    pub async fn spawn(
        &self,
        agent_id: AgentId,
        position: Option<(f64, f64)>,
    ) -> Result<AgentState, EngineError> {
        if let Some(existing) = self.world().agent(agent_id).cloned() {
            return Ok(existing);
        }
        if let Some((x, y)) = position {
            let cfg = &self.inner.config;
            if !(0.0..=cfg.world_width).contains(&x) || !(0.0..=cfg.world_height).contains(&y) {
                return Err(EngineError::InvalidArgument(format!(
                    "position ({x}, {y}) is outside the {}x{} world",
                    cfg.world_width, cfg.world_height
                )));
            }
        }

        let profile = self
            .service()
            .store()
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("agent {agent_id}")))?;

        let state = {
            let mut world = self.world();
            if let Some(existing) = world.agent(agent_id).cloned() {
                return Ok(existing);
            }
            let (x, y) = match position {
                Some(p) => p,
                None => world.motion.spawn_point(&self.inner.config),
            };
            let state = AgentState::new_idle(agent_id, profile.name, profile.agent_type, x, y);
            world.agents.push(state.clone());
            state
        };
        info!(
            agent_id = %agent_id,
            name = %state.name,
            agent_type = state.agent_type.as_str(),
            x = state.x,
            y = state.y,
            "Agent spawned"
        );
        self.broadcast_state();
        Ok(state)
    }

    /// Take an agent out of the world.
    ///
    /// Returns `false` if it was not spawned. A talking partner is
    /// returned to idle; the conversation itself keeps running.
    pub fn remove(&self, agent_id: AgentId) -> bool {
        {
            let mut world = self.world();
            let Some(pos) = world.agents.iter().position(|a| a.agent_id == agent_id) else {
                return false;
            };
            let removed = world.agents.remove(pos);
            world.motion.forget(agent_id);
            world.engaged.remove(&agent_id);
            if let Some(partner) = removed.partner_id {
                world.release(partner, agent_id);
            }
        }
        info!(agent_id = %agent_id, "Agent removed");
        self.broadcast_state();
        true
    }

    /// Remove every spawned agent. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut world = self.world();
            let ids: Vec<AgentId> = world.agents.iter().map(|a| a.agent_id).collect();
            for id in &ids {
                world.motion.forget(*id);
            }
            world.agents.clear();
            world.engaged.clear();
            ids.len()
        };
        if removed > 0 {
            info!(removed, "World cleared");
            self.broadcast_state();
        }
        removed
    }

    /// Full copy of the world: agents, active conversations, dimensions.
    pub fn snapshot(&self) -> WorldState {
        let world = self.world();
        WorldState {
            agents: world.agents.clone(),
            active_conversations: world.active.clone(),
            width: self.inner.config.world_width,
            height: self.inner.config.world_height,
            running: world.running,
        }
    }

    /// Whether the tick loop is running.
    pub fn is_running(&self) -> bool {
        self.world().running
    }

    /// Number of conversations currently being driven.
    pub fn active_conversations(&self) -> usize {
        self.world().active.len()
    }

    // -- tick loop ----------------------------------------------------------

    /// Start the tick loop. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let mut ticker = self
            .inner
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if ticker.is_some() {
            return false;
        }
        self.world().running = true;

        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(tick_loop(
            Arc::downgrade(&self.inner),
            self.inner.config.tick_interval(),
            stop_rx,
        ));
        *ticker = Some(Ticker { handle, stop });
        info!(
            tick_interval_ms = self.inner.config.tick_interval_ms,
            "World started"
        );
        true
    }

    /// Stop the tick loop. In-flight conversations keep running.
    ///
    /// Returns `false` if it was not running. A tick already in progress
    /// completes before the loop exits.
    pub fn stop(&self) -> bool {
        let ticker = self
            .inner
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(ticker) = ticker else {
            return false;
        };
        let _ = ticker.stop.send(true);
        drop(ticker.handle);
        self.world().running = false;
        info!("World stopped");
        self.broadcast_state();
        true
    }

    /// Run one tick with `dt` seconds of elapsed time.
    ///
    /// Moves every free agent, pairs agents that came into range, starts
    /// their conversations and broadcasts the resulting world state.
    pub async fn tick_once(&self, dt: f64) {
        let matches = {
            let mut world = self.world();
            let World {
                agents,
                motion,
                matcher,
                ..
            } = &mut *world;
            for agent in agents.iter_mut() {
                motion.advance(agent, dt, &self.inner.config);
            }
            matcher.scan(agents, self.inner.config.proximity_threshold)
        };

        for found in matches {
            self.begin_matched(found).await;
        }
        self.broadcast_state();
    }

    async fn begin_matched(&self, found: ProximityMatch) {
        match self
            .service()
            .prepare(found.recruiter, found.candidate)
            .await
        {
            Ok((record, conversation)) => self.launch(&record, conversation, true),
            Err(e) => {
                warn!(
                    recruiter = %found.recruiter,
                    candidate = %found.candidate,
                    error = %e,
                    "Could not start matched conversation"
                );
                let mut world = self.world();
                world.release(found.recruiter, found.candidate);
                world.release(found.candidate, found.recruiter);
            }
        }
    }

    // -- conversations ------------------------------------------------------

    /// Start a conversation between two profiles, independent of
    /// proximity.
    ///
    /// If both agents are spawned and free they are marked talking and the
    /// pair counts as matched. Otherwise the conversation runs without
    /// touching the world. Returns the freshly created record.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown profile and
    /// [`EngineError::InvalidArgument`] if the roles do not match.
    pub async fn start_conversation(
        &self,
        recruiter_id: AgentId,
        candidate_id: AgentId,
    ) -> Result<ConversationRecord, EngineError> {
        let (record, conversation) = self.service().prepare(recruiter_id, candidate_id).await?;

        let in_world = {
            let mut world = self.world();
            let free = |id| world.agent(id).is_some_and(|a| !a.is_talking());
            let in_world = free(recruiter_id) && free(candidate_id);
            if in_world {
                world.matcher.mark(recruiter_id, candidate_id);
                if let Some(r) = world.agent_mut(recruiter_id) {
                    r.begin_talking(candidate_id);
                }
                if let Some(c) = world.agent_mut(candidate_id) {
                    c.begin_talking(recruiter_id);
                }
            }
            in_world
        };
        debug!(conversation_id = %record.id, in_world, "Explicit conversation");

        self.launch(&record, conversation, in_world);
        self.broadcast_state();
        Ok(record)
    }

    fn launch(&self, record: &ConversationRecord, conversation: Conversation, in_world: bool) {
        let id = record.id;
        let recruiter = record.recruiter.agent_id;
        let candidate = record.candidate.agent_id;
        {
            let mut world = self.world();
            world.active.insert(
                id,
                ActiveConversation {
                    conversation_id: id,
                    recruiter: record.recruiter.clone(),
                    candidate: record.candidate.clone(),
                    started_at: record.created_at,
                },
            );
            if in_world && !world.engage(recruiter, candidate, id) {
                debug!(conversation_id = %id, "Pair split before the conversation started");
            }
        }

        let engine = self.clone();
        tokio::spawn(async move {
            let observer = engine.clone();
            let _ = engine
                .service()
                .drive(conversation, move || observer.broadcast_state())
                .await;
            engine.finish(id, recruiter, candidate);
        });
    }

    /// Bookkeeping after a conversation ends, successfully or not.
    ///
    /// Participants that have since been removed or re-paired into another
    /// conversation are left alone.
    fn finish(&self, id: ConversationId, recruiter: AgentId, candidate: AgentId) {
        {
            let mut world = self.world();
            world.active.remove(&id);
            world.release_from(recruiter, id);
            world.release_from(candidate, id);
        }
        debug!(conversation_id = %id, "Participants released");
        self.broadcast_state();
    }

    /// Publish the current snapshot.
    pub fn broadcast_state(&self) {
        let data = self.snapshot();
        self.hub().publish(WorldEvent::WorldState { data });
    }
}

async fn tick_loop(
    engine: Weak<EngineInner>,
    period: std::time::Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop.changed() => break,
        }
        if *stop.borrow() {
            break;
        }
        let Some(inner) = engine.upgrade() else {
            break;
        };
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;
        WorldEngine { inner }.tick_once(dt).await;
    }
    debug!("Tick loop exited");
}
