//! Event sinks for simulator runs

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, info};

use gt_rust::{Event, EventSink, NodeId, Timestamp};

// ============================================================================
// Log Sink
// ============================================================================

/// Forwards events to the `log` facade. Punishments and reconnects go to
/// `info`, per-delivery events to `debug`.
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn log(&mut self, time: Timestamp, node: NodeId, event: Event) {
        match event {
            Event::MessageReceived {
                message,
                from,
                relayed_to,
            } => {
                let from = from.map_or_else(|| "origin".to_string(), |f| f.to_string());
                debug!("{:>7.2} {:>4} Received    m:{} from:{} relayed:{}", time, node, message, from, relayed_to);
            }
            Event::DuplicateDropped { message, from } => {
                debug!("{:>7.2} {:>4} Duplicate   m:{} from:{:?}", time, node, message, from);
            }
            Event::PeerPunished {
                target,
                slashed,
                stake_after,
            } => {
                info!(
                    "{:>7.2} {:>4} Punished    {} -{:.1} stake:{:.1}",
                    time, node, target, slashed, stake_after
                );
            }
            Event::PunishmentRefused { target, reason } => {
                debug!("{:>7.2} {:>4} Refused     {} {:?}", time, node, target, reason);
            }
            Event::PriorityLowered { target, priority } => {
                debug!("{:>7.2} {:>4} Priority    {} -> {:.2}", time, node, target, priority);
            }
            Event::AuditPassed { target } => {
                debug!("{:>7.2} {:>4} AuditPassed {}", time, node, target);
            }
            Event::PeerReconnected { peer } => {
                info!("{:>7.2} {:>4} Reconnected {}", time, node, peer);
            }
            Event::StakeRewarded { relays, stake_after } => {
                debug!("{:>7.2} {:>4} Rewarded    {} relays stake:{:.1}", time, node, relays, stake_after);
            }
        }
    }
}

// ============================================================================
// Counting Sink
// ============================================================================

/// Counts events by kind. The counts are shared so they can be read after
/// the sink has been handed to a runner.
#[derive(Clone, Default)]
pub struct CountingSink {
    counts: Rc<RefCell<BTreeMap<&'static str, usize>>>,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.counts.borrow().get(kind).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<&'static str, usize> {
        self.counts.borrow().clone()
    }
}

fn kind(event: &Event) -> &'static str {
    match event {
        Event::MessageReceived { .. } => "received",
        Event::DuplicateDropped { .. } => "duplicate",
        Event::PeerPunished { .. } => "punished",
        Event::PunishmentRefused { .. } => "refused",
        Event::PriorityLowered { .. } => "priority_lowered",
        Event::AuditPassed { .. } => "audit_passed",
        Event::PeerReconnected { .. } => "reconnected",
        Event::StakeRewarded { .. } => "rewarded",
    }
}

impl EventSink for CountingSink {
    fn log(&mut self, _time: Timestamp, _node: NodeId, event: Event) {
        *self.counts.borrow_mut().entry(kind(&event)).or_insert(0) += 1;
    }
}
