//! One-time proximity pairing of recruiters and candidates.
//!
//! Each scan looks at every unordered pair of agents that are not talking,
//! are of different types, are within the threshold and have never been
//! paired. Matched agents are marked talking immediately, so an agent is in
//! at most one new match per scan. The set of matched pairs only grows.

use std::collections::BTreeSet;

use rendezvous_types::{AgentId, AgentState, AgentType};
use tracing::debug;

/// An unordered pair of agent ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey(AgentId, AgentId);

impl PairKey {
    /// The key for `a` and `b`, in either order.
    pub fn new(a: AgentId, b: AgentId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }
}

/// A pairing produced by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityMatch {
    /// The recruiter side.
    pub recruiter: AgentId,
    /// The candidate side.
    pub candidate: AgentId,
}

/// Remembers every pair that has ever been matched.
#[derive(Debug, Default)]
pub struct ProximityMatcher {
    matched: BTreeSet<PairKey>,
}

impl ProximityMatcher {
    /// An empty matcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair up eligible agents within `threshold` of each other.
    ///
    /// Both agents of every returned match are already marked talking with
    /// each other as partner, and the pair is recorded as matched.
    pub fn scan(&mut self, agents: &mut [AgentState], threshold: f64) -> Vec<ProximityMatch> {
        let mut matches = Vec::new();
        for i in 1..agents.len() {
            let (before, rest) = agents.split_at_mut(i);
            let Some((current, _)) = rest.split_first_mut() else {
                continue;
            };
            for other in before.iter_mut() {
                if current.is_talking() {
                    break;
                }
                if other.is_talking() || other.agent_type == current.agent_type {
                    continue;
                }
                let key = PairKey::new(current.agent_id, other.agent_id);
                if self.matched.contains(&key) || current.distance_to(other) > threshold {
                    continue;
                }

                current.begin_talking(other.agent_id);
                other.begin_talking(current.agent_id);
                self.matched.insert(key);

                let found = match current.agent_type {
                    AgentType::Recruiter => ProximityMatch {
                        recruiter: current.agent_id,
                        candidate: other.agent_id,
                    },
                    AgentType::Candidate => ProximityMatch {
                        recruiter: other.agent_id,
                        candidate: current.agent_id,
                    },
                };
                debug!(
                    recruiter = %found.recruiter,
                    candidate = %found.candidate,
                    "Proximity match"
                );
                matches.push(found);
            }
        }
        matches
    }

    /// Record a pair as matched outside a scan.
    ///
    /// Returns `false` if the pair was already recorded.
    pub fn mark(&mut self, a: AgentId, b: AgentId) -> bool {
        self.matched.insert(PairKey::new(a, b))
    }

    /// Whether `a` and `b` have ever been matched.
    pub fn has_matched(&self, a: AgentId, b: AgentId) -> bool {
        self.matched.contains(&PairKey::new(a, b))
    }

    /// Number of pairs ever matched.
    pub fn matched_pairs(&self) -> usize {
        self.matched.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rendezvous_types::AgentStatus;

    use super::*;

    fn agent(agent_type: AgentType, x: f64, y: f64) -> AgentState {
        AgentState::new_idle(AgentId::new(), "A".to_owned(), agent_type, x, y)
    }

    #[test]
    fn pair_key_is_unordered() {
        let a = AgentId::new();
        let b = AgentId::new();
        assert_eq!(PairKey::new(a, b), PairKey::new(b, a));
    }

    #[test]
    fn close_pair_of_different_types_matches() {
        let mut agents = vec![
            agent(AgentType::Recruiter, 100.0, 100.0),
            agent(AgentType::Candidate, 140.0, 100.0),
        ];
        let mut matcher = ProximityMatcher::new();

        let found = matcher.scan(&mut agents, 50.0);

        assert_eq!(found.len(), 1);
        let r = agents.first().unwrap();
        let c = agents.get(1).unwrap();
        assert_eq!(found.first().map(|m| m.recruiter), Some(r.agent_id));
        assert_eq!(r.partner_id, Some(c.agent_id));
        assert_eq!(c.partner_id, Some(r.agent_id));
        assert_eq!(r.status, AgentStatus::Talking);
        assert!(matcher.has_matched(r.agent_id, c.agent_id));
    }

    #[test]
    fn same_type_never_matches() {
        let mut agents = vec![
            agent(AgentType::Candidate, 100.0, 100.0),
            agent(AgentType::Candidate, 101.0, 100.0),
        ];
        let mut matcher = ProximityMatcher::new();
        assert!(matcher.scan(&mut agents, 50.0).is_empty());
    }

    #[test]
    fn distant_pair_does_not_match() {
        let mut agents = vec![
            agent(AgentType::Recruiter, 100.0, 100.0),
            agent(AgentType::Candidate, 200.0, 100.0),
        ];
        let mut matcher = ProximityMatcher::new();
        assert!(matcher.scan(&mut agents, 50.0).is_empty());
        assert_eq!(matcher.matched_pairs(), 0);
    }

    #[test]
    fn pair_is_never_matched_twice() {
        let mut agents = vec![
            agent(AgentType::Recruiter, 100.0, 100.0),
            agent(AgentType::Candidate, 120.0, 100.0),
        ];
        let mut matcher = ProximityMatcher::new();
        assert_eq!(matcher.scan(&mut agents, 50.0).len(), 1);

        for a in &mut agents {
            a.release();
        }
        assert!(matcher.scan(&mut agents, 50.0).is_empty());
        assert!(agents.iter().all(|a| !a.is_talking()));
    }

    #[test]
    fn agent_joins_at_most_one_match_per_scan() {
        let mut agents = vec![
            agent(AgentType::Recruiter, 100.0, 100.0),
            agent(AgentType::Candidate, 110.0, 100.0),
            agent(AgentType::Candidate, 90.0, 100.0),
        ];
        let mut matcher = ProximityMatcher::new();

        let found = matcher.scan(&mut agents, 50.0);

        assert_eq!(found.len(), 1);
        assert_eq!(agents.iter().filter(|a| a.is_talking()).count(), 2);

        // The deferred candidate pairs with a second recruiter later.
        agents.push(agent(AgentType::Recruiter, 80.0, 100.0));
        let found = matcher.scan(&mut agents, 50.0);
        assert_eq!(found.len(), 1);
        assert_eq!(agents.iter().filter(|a| a.is_talking()).count(), 4);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut agents = vec![
            agent(AgentType::Recruiter, 0.0, 0.0),
            agent(AgentType::Candidate, 30.0, 40.0),
        ];
        let mut matcher = ProximityMatcher::new();
        assert_eq!(matcher.scan(&mut agents, 50.0).len(), 1);
    }

    #[test]
    fn mark_records_pair_once() {
        let mut matcher = ProximityMatcher::new();
        let a = AgentId::new();
        let b = AgentId::new();
        assert!(matcher.mark(a, b));
        assert!(!matcher.mark(b, a));
        assert!(matcher.has_matched(a, b));
    }
}
