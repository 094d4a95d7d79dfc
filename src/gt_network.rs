use log::{debug, warn};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::gt_config::{IncentiveConfig, RelayDelay, RelayStrategy, SimConfig, Slash};
use crate::gt_graph::Adjacency;
use crate::gt_incentive::{HistoryEntry, IncentiveState};
use crate::gt_interface::{
    Event, EventSink, MessageId, NoOpSink, NodeId, Policy, RefusalReason, Role, Timestamp,
};
use crate::gt_ledger::PropagationLedger;
use crate::gt_node::{Node, Reception};
use crate::gt_punishment::{policy_for, IncentiveAction, PunishmentPolicy};
use crate::gt_scheduler::{Action, EventScheduler, RunSummary, ScheduleError, ScheduledEvent};

/// Owns every node of a simulation together with the scheduler, ledger and
/// random source driving it.
///
/// All peer-set changes go through the network so that both ends of an edge
/// change in the same operation.
pub struct Network {
    scheduler: EventScheduler,
    state: NetworkState,
}

/// Everything an event handler may touch
struct NetworkState {
    nodes: Vec<Node>,
    ledger: PropagationLedger,
    rng: StdRng,
    policy: Policy,
    relay_delay: RelayDelay,
    relay_strategy: RelayStrategy,
    incentive: IncentiveConfig,
    punisher: Option<Box<dyn PunishmentPolicy>>,
    event_sink: Box<dyn EventSink>,
    next_message: MessageId,
}

impl Network {
    /// Build a network over `adjacency`. `roles[i]` is the role of node `i`;
    /// missing entries default to honest.
    pub fn new(adjacency: Adjacency, roles: &[Role], config: &SimConfig, rng: StdRng) -> Self {
        Self::new_with_sink(adjacency, roles, config, rng, Box::new(NoOpSink))
    }

    pub fn new_with_sink(
        adjacency: Adjacency,
        roles: &[Role],
        config: &SimConfig,
        rng: StdRng,
        event_sink: Box<dyn EventSink>,
    ) -> Self {
        let incentivized = config.policy == Policy::Incentivized;
        let nodes = adjacency
            .into_neighbors()
            .into_iter()
            .enumerate()
            .map(|(id, neighbors)| {
                let role = roles.get(id).copied().unwrap_or(Role::Honest);
                let incentive = incentivized.then(|| IncentiveState::new(&config.incentive));
                let mut node = Node::new(id, role, incentive);
                for peer in neighbors {
                    node.add_peer(peer);
                }
                node
            })
            .collect();

        Self {
            scheduler: EventScheduler::new(),
            state: NetworkState {
                nodes,
                ledger: PropagationLedger::new(),
                rng,
                policy: config.policy,
                relay_delay: config.relay_delay,
                relay_strategy: config.relay_strategy,
                incentive: config.incentive.clone(),
                punisher: incentivized.then(|| policy_for(&config.incentive.punishment)),
                event_sink,
                next_message: 0,
            },
        }
    }

    /// Replace the punishment policy
    pub fn set_punishment_policy(&mut self, policy: Box<dyn PunishmentPolicy>) {
        self.state.punisher = Some(policy);
    }

    pub fn policy(&self) -> Policy {
        self.state.policy
    }

    pub fn now(&self) -> Timestamp {
        self.scheduler.now()
    }

    pub fn len(&self) -> usize {
        self.state.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.state.nodes.get(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.state.nodes
    }

    pub fn ledger(&self) -> &PropagationLedger {
        &self.state.ledger
    }

    pub fn honest_nodes(&self) -> Vec<NodeId> {
        self.state
            .nodes
            .iter()
            .filter(|n| n.is_honest())
            .map(|n| n.id())
            .collect()
    }

    /// Pick a random honest node, `None` if there is none
    pub fn random_honest(&mut self) -> Option<NodeId> {
        let honest = self.honest_nodes();
        honest.choose(&mut self.state.rng).copied()
    }

    /// `B ∈ A.peers ⇔ A ∈ B.peers` for every pair
    pub fn edges_symmetric(&self) -> bool {
        self.state.edges_symmetric()
    }

    /// Start a new message at `source`, delivered to it immediately.
    ///
    /// Free-riders and unknown ids cannot originate messages.
    pub fn broadcast(&mut self, source: NodeId) -> Option<MessageId> {
        self.state.start_broadcast(&mut self.scheduler, source)
    }

    /// Broadcast from `source` at a later time
    pub fn schedule_broadcast(&mut self, at: Timestamp, source: NodeId) -> Result<(), ScheduleError> {
        self.scheduler.schedule_at(at, Action::Broadcast { source })
    }

    /// Deliver events up to `horizon`. Periodic incentive timers are armed
    /// for the duration of the call; anything left past the horizon is dropped.
    /// An unbounded horizon drains pending deliveries without arming timers.
    pub fn run(&mut self, horizon: Timestamp) -> RunSummary {
        if horizon.is_finite() {
            self.state.arm_timers(&mut self.scheduler);
        } else if self.state.policy == Policy::Incentivized {
            warn!("unbounded horizon, incentive timers stay disarmed");
        }

        let state = &mut self.state;
        self.scheduler
            .run(horizon, |scheduler, event| state.handle(scheduler, event))
    }

    /// Symmetric edge removal
    pub fn disconnect(&mut self, a: NodeId, b: NodeId) -> bool {
        self.state.disconnect(a, b)
    }

    /// Symmetric edge insertion. Self-loops and unknown ids are refused.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> bool {
        self.state.connect(a, b)
    }

    /// Punish `target` on behalf of `punisher`.
    ///
    /// Returns the stake taken, or why the punishment was a no-op.
    pub fn punish(&mut self, punisher: NodeId, target: NodeId, slash: &Slash) -> Result<f64, RefusalReason> {
        self.state.punish(punisher, target, slash)
    }

    pub fn apply_actions(&mut self, actions: Vec<IncentiveAction>) {
        let now = self.scheduler.now();
        self.state.apply_all(now, actions);
    }

    /// Convert relay evidence into stake for every enforcing node
    pub fn reward(&mut self) {
        let now = self.scheduler.now();
        self.state.reward_all(now);
    }

    /// Re-add edges for enforcing nodes below the connectivity floor
    pub fn maintain(&mut self) {
        let now = self.scheduler.now();
        self.state.maintain(now);
    }

    /// Clear seen sets, counters, incentive state, ledger and pending events.
    /// Peer sets are left as they are.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.state.ledger.clear();
        self.state.next_message = 0;
        let incentivized = self.state.policy == Policy::Incentivized;
        let config = &self.state.incentive;
        for node in &mut self.state.nodes {
            node.reset(incentivized.then(|| IncentiveState::new(config)));
        }
    }
}

impl NetworkState {
    fn handle(&mut self, scheduler: &mut EventScheduler, event: ScheduledEvent) {
        match event.action {
            Action::Deliver {
                target,
                message,
                source,
            } => self.deliver(scheduler, target, message, source),
            Action::Broadcast { source } => {
                self.start_broadcast(scheduler, source);
            }
            Action::Audit => {
                if let Some(punisher) = self.punisher.as_mut() {
                    let actions = punisher.on_audit(&mut self.nodes, &mut self.rng);
                    self.apply_all(event.time, actions);
                }
                let interval = self.punisher.as_ref().and_then(|p| p.audit_interval());
                self.rearm(scheduler, event.time, interval, Action::Audit);
            }
            Action::Reward => {
                self.reward_all(event.time);
                let interval = Some(self.incentive.reward_interval);
                self.rearm(scheduler, event.time, interval, Action::Reward);
            }
            Action::Maintain => {
                self.maintain(event.time);
                let interval = self.incentive.maintenance.as_ref().map(|m| m.interval);
                self.rearm(scheduler, event.time, interval, Action::Maintain);
            }
        }
    }

    fn arm_timers(&mut self, scheduler: &mut EventScheduler) {
        if self.policy != Policy::Incentivized {
            return;
        }
        let now = scheduler.now();
        let audit = self.punisher.as_ref().and_then(|p| p.audit_interval());
        self.rearm(scheduler, now, audit, Action::Audit);
        self.rearm(scheduler, now, Some(self.incentive.reward_interval), Action::Reward);
        let maintain = self.incentive.maintenance.as_ref().map(|m| m.interval);
        self.rearm(scheduler, now, maintain, Action::Maintain);
    }

    fn rearm(&self, scheduler: &mut EventScheduler, now: Timestamp, interval: Option<f64>, action: Action) {
        let Some(interval) = interval.filter(|i| *i > 0.0) else {
            return;
        };
        if let Err(e) = scheduler.schedule_at(now + interval, action) {
            warn!("could not re-arm timer: {}", e);
        }
    }

    fn start_broadcast(&mut self, scheduler: &mut EventScheduler, source: NodeId) -> Option<MessageId> {
        match self.nodes.get(source) {
            Some(node) if node.is_honest() => {}
            Some(_) => {
                warn!("node {} is a free-rider and cannot originate a broadcast", source);
                return None;
            }
            None => {
                warn!("broadcast from unknown node {}", source);
                return None;
            }
        }

        let message = self.next_message;
        self.next_message += 1;
        debug!("{:.2}: broadcast m:{} from {}", scheduler.now(), message, source);
        self.deliver(scheduler, source, message, None);
        Some(message)
    }

    fn deliver(
        &mut self,
        scheduler: &mut EventScheduler,
        target: NodeId,
        message: MessageId,
        source: Option<NodeId>,
    ) {
        let now = scheduler.now();
        let Some(node) = self.nodes.get_mut(target) else {
            warn!("delivery to unknown node {}", target);
            return;
        };
        let reception = node.receive(message, now, &mut self.ledger);

        if self.policy == Policy::Incentivized {
            self.score_delivery(target, source, reception);
        }

        let relay = match reception {
            Reception::Duplicate => {
                self.event_sink
                    .log(now, target, Event::DuplicateDropped { message, from: source });
                return;
            }
            Reception::Informed { relay } => relay,
        };

        let mut relayed = 0;
        if relay {
            let nodes = &self.nodes;
            let initial_reputation = self.incentive.initial_reputation;
            let own = &nodes[target];
            let targets = own.relay_targets(
                source,
                &self.relay_strategy,
                |peer| {
                    let reputation = nodes[peer].reputation().unwrap_or(initial_reputation);
                    let priority = own.incentive().map_or(1.0, |i| i.priority(peer));
                    reputation * priority
                },
                &mut self.rng,
            );

            for peer in targets {
                let delay = self.relay_delay.sample(&mut self.rng);
                match scheduler.schedule(delay, peer, message, Some(target)) {
                    Ok(()) => relayed += 1,
                    Err(e) => warn!("relay {} -> {} dropped: {}", target, peer, e),
                }
            }
            self.nodes[target].note_sent(relayed);
            self.ledger.note_sent(message, relayed as u64);
        }

        self.event_sink.log(
            now,
            target,
            Event::MessageReceived {
                message,
                from: source,
                relayed_to: relayed,
            },
        );

        if let Some(punisher) = self.punisher.as_mut() {
            let entry = HistoryEntry {
                message,
                source,
                time: now,
            };
            let actions = punisher.on_receive(target, entry, &mut self.nodes, &mut self.rng);
            self.apply_all(now, actions);
        }
    }

    /// Reputation follows delivery outcomes: new information rewards both
    /// ends, redundant traffic costs the sender.
    fn score_delivery(&mut self, target: NodeId, source: Option<NodeId>, reception: Reception) {
        let Some(sender) = source else {
            return;
        };
        let boost = self.incentive.boost_on_success;
        let penalty = self.incentive.penalty_on_redundancy;
        match reception {
            Reception::Informed { .. } => {
                if let Some(i) = self.nodes.get_mut(sender).and_then(|n| n.incentive_mut()) {
                    i.adjust_reputation(boost);
                }
                if let Some(i) = self.nodes[target].incentive_mut() {
                    i.adjust_reputation(boost);
                }
            }
            Reception::Duplicate => {
                if let Some(i) = self.nodes.get_mut(sender).and_then(|n| n.incentive_mut()) {
                    i.adjust_reputation(-penalty);
                }
            }
        }
    }

    fn apply_all(&mut self, now: Timestamp, actions: Vec<IncentiveAction>) {
        for action in actions {
            self.apply(now, action);
        }
    }

    fn apply(&mut self, now: Timestamp, action: IncentiveAction) {
        match action {
            IncentiveAction::Punish {
                punisher,
                target,
                slash,
            } => match self.punish(punisher, target, &slash) {
                Ok(slashed) => {
                    let stake_after = self.nodes[target].stake().unwrap_or(0.0);
                    debug!(
                        "{:.2}: {} punished {} (-{:.1}, stake {:.1})",
                        now, punisher, target, slashed, stake_after
                    );
                    self.event_sink.log(
                        now,
                        punisher,
                        Event::PeerPunished {
                            target,
                            slashed,
                            stake_after,
                        },
                    );
                }
                Err(reason) => {
                    debug!("{:.2}: {} did not punish {}: {:?}", now, punisher, target, reason);
                    self.event_sink
                        .log(now, punisher, Event::PunishmentRefused { target, reason });
                }
            },
            IncentiveAction::LowerPriority { node, peer, factor } => {
                if let Some(incentive) = self.nodes.get_mut(node).and_then(|n| n.incentive_mut()) {
                    let priority = incentive.lower_priority(peer, factor);
                    self.event_sink
                        .log(now, node, Event::PriorityLowered { target: peer, priority });
                }
            }
            IncentiveAction::AuditPassed { auditor, target } => {
                self.event_sink.log(now, auditor, Event::AuditPassed { target });
            }
        }
    }

    fn punish(&mut self, punisher: NodeId, target: NodeId, slash: &Slash) -> Result<f64, RefusalReason> {
        if punisher == target {
            return Err(RefusalReason::SelfTarget);
        }
        let Some(node) = self.nodes.get(punisher) else {
            return Err(RefusalReason::NotAPeer);
        };
        if !node.has_peer(target) {
            return Err(RefusalReason::NotAPeer);
        }
        if node.num_peers() <= self.incentive.min_connectivity {
            return Err(RefusalReason::ConnectivityFloor);
        }
        if self.nodes[target].incentive().is_none() {
            return Err(RefusalReason::NotIncentivized);
        }

        self.disconnect(punisher, target);

        let floor = self.incentive.stake_floor;
        let penalty = self.incentive.penalty_on_failure;
        let mut slashed = 0.0;
        if let Some(incentive) = self.nodes[target].incentive_mut() {
            slashed = incentive.slash(slash, floor);
            incentive.adjust_reputation(-penalty);
        }
        if let Some(incentive) = self.nodes[punisher].incentive_mut() {
            incentive.clear_suspicion(target);
        }
        Ok(slashed)
    }

    fn reward_all(&mut self, now: Timestamp) {
        let rate = self.incentive.reward_rate;
        let decay = self.incentive.decay_rate;
        let baseline = self.incentive.initial_reputation;
        for node in &mut self.nodes {
            let honest = node.is_honest();
            let id = node.id();
            let Some(incentive) = node.incentive_mut() else {
                continue;
            };
            incentive.decay_reputation(decay, baseline);
            if !honest {
                continue;
            }
            let relays = incentive.reward(rate);
            if relays > 0 {
                let stake_after = incentive.stake();
                self.event_sink
                    .log(now, id, Event::StakeRewarded { relays, stake_after });
            }
        }
    }

    fn maintain(&mut self, now: Timestamp) {
        let Some(maintenance) = self.incentive.maintenance.clone() else {
            return;
        };
        let floor = self.incentive.min_connectivity;

        for id in 0..self.nodes.len() {
            let node = &self.nodes[id];
            if !node.is_enforcer() || node.num_peers() >= floor {
                continue;
            }
            if !self.rng.gen_bool(maintenance.reconnect_probability) {
                continue;
            }

            let candidates: Vec<NodeId> = self
                .nodes
                .iter()
                .filter(|c| c.id() != id && !node.has_peer(c.id()))
                .filter(|c| !maintenance.honest_only || c.is_honest())
                .map(|c| c.id())
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let weights: Vec<f64> = candidates
                .iter()
                .map(|c| self.nodes[*c].stake().unwrap_or(0.0).max(0.0))
                .collect();
            let pick = match WeightedIndex::new(&weights) {
                Ok(dist) => candidates[dist.sample(&mut self.rng)],
                // every candidate at zero stake
                Err(_) => match candidates.choose(&mut self.rng) {
                    Some(c) => *c,
                    None => continue,
                },
            };

            if self.connect(id, pick) {
                debug!("{:.2}: {} reconnected to {}", now, id, pick);
                self.event_sink.log(now, id, Event::PeerReconnected { peer: pick });
            }
        }
    }

    fn disconnect(&mut self, a: NodeId, b: NodeId) -> bool {
        if a >= self.nodes.len() || b >= self.nodes.len() {
            return false;
        }
        let removed = self.nodes[a].remove_peer(b);
        self.nodes[b].remove_peer(a);
        removed
    }

    fn connect(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b || a >= self.nodes.len() || b >= self.nodes.len() {
            return false;
        }
        let added = self.nodes[a].add_peer(b);
        self.nodes[b].add_peer(a);
        added
    }

    fn edges_symmetric(&self) -> bool {
        self.nodes.iter().all(|node| {
            !node.has_peer(node.id())
                && node
                    .peers()
                    .iter()
                    .all(|peer| self.nodes[*peer].has_peer(node.id()))
        })
    }
}
