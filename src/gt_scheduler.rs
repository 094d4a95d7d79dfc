use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use crate::gt_interface::{MessageId, NodeId, Timestamp};

/// What happens when a scheduled event fires
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Deliver a message to a node. `source` is `None` for the originating node.
    Deliver {
        target: NodeId,
        message: MessageId,
        source: Option<NodeId>,
    },
    /// Start a new broadcast from `source`
    Broadcast { source: NodeId },
    /// Periodic audit round
    Audit,
    /// Periodic conversion of relay evidence into stake
    Reward,
    /// Periodic re-connection of under-connected nodes
    Maintain,
}

/// An action bound to a point in simulated time.
///
/// Ordered for a min-heap: earliest time first, then lowest sequence number,
/// so events scheduled for the same instant come out in insertion order.
#[derive(Clone, Debug)]
pub struct ScheduledEvent {
    pub time: Timestamp,
    pub seq: u64,
    pub action: Action,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap
        match other.time.total_cmp(&self.time) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// Delay was negative, NaN or infinite
    InvalidDelay(f64),
    /// Absolute time lies before the current time
    InThePast { time: Timestamp, now: Timestamp },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::InvalidDelay(d) => write!(f, "invalid scheduling delay {}", d),
            ScheduleError::InThePast { time, now } => {
                write!(f, "cannot schedule at {} (current time {})", time, now)
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Outcome of one `run` call
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunSummary {
    pub delivered: usize,
    pub discarded: usize,
}

/// Time-ordered queue of pending events.
///
/// Simulated time only moves forward: it is advanced to the time of each
/// popped event and never past the horizon of a run.
pub struct EventScheduler {
    queue: BinaryHeap<ScheduledEvent>,
    now: Timestamp,
    next_seq: u64,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            now: 0.0,
            next_seq: 0,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Schedule delivery of `message` to `target` after `delay`
    pub fn schedule(
        &mut self,
        delay: f64,
        target: NodeId,
        message: MessageId,
        source: Option<NodeId>,
    ) -> Result<(), ScheduleError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(ScheduleError::InvalidDelay(delay));
        }
        let time = self.now + delay;
        self.push(
            time,
            Action::Deliver {
                target,
                message,
                source,
            },
        );
        Ok(())
    }

    /// Schedule an arbitrary action at an absolute time
    pub fn schedule_at(&mut self, time: Timestamp, action: Action) -> Result<(), ScheduleError> {
        if !time.is_finite() || time < self.now {
            return Err(ScheduleError::InThePast {
                time,
                now: self.now,
            });
        }
        self.push(time, action);
        Ok(())
    }

    fn push(&mut self, time: Timestamp, action: Action) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEvent { time, seq, action });
    }

    /// Pop the earliest event if it is due at or before `horizon`
    pub fn pop_due(&mut self, horizon: Timestamp) -> Option<ScheduledEvent> {
        if self.queue.peek()?.time > horizon {
            return None;
        }
        let event = self.queue.pop()?;
        self.now = event.time;
        Some(event)
    }

    /// Deliver events in time order until the queue is empty or the next
    /// event lies past `horizon`. Undelivered events are discarded.
    ///
    /// The handler may schedule further events through the scheduler it is given.
    pub fn run<F>(&mut self, horizon: Timestamp, mut handler: F) -> RunSummary
    where
        F: FnMut(&mut EventScheduler, ScheduledEvent),
    {
        let mut summary = RunSummary::default();
        while let Some(event) = self.pop_due(horizon) {
            handler(self, event);
            summary.delivered += 1;
        }
        summary.discarded = self.queue.len();
        self.queue.clear();
        summary
    }

    /// Drop all pending events and rewind the clock
    pub fn reset(&mut self) {
        self.queue.clear();
        self.now = 0.0;
        self.next_seq = 0;
    }
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deliver_target(event: &ScheduledEvent) -> NodeId {
        match event.action {
            Action::Deliver { target, .. } => target,
            _ => panic!("expected delivery"),
        }
    }

    #[test]
    fn test_events_come_out_in_time_order() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(3.0, 3, 0, None).unwrap();
        scheduler.schedule(1.0, 1, 0, None).unwrap();
        scheduler.schedule(2.0, 2, 0, None).unwrap();

        let mut order = Vec::new();
        scheduler.run(10.0, |_, event| order.push(deliver_target(&event)));

        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(scheduler.now(), 3.0);
    }

    #[test]
    fn test_equal_times_are_fifo() {
        let mut scheduler = EventScheduler::new();
        for target in [5, 2, 9, 0, 7] {
            scheduler.schedule(1.0, target, 0, Some(1)).unwrap();
        }

        let mut order = Vec::new();
        scheduler.run(1.0, |_, event| order.push(deliver_target(&event)));

        assert_eq!(order, vec![5, 2, 9, 0, 7]);
    }

    #[test]
    fn test_negative_delay_rejected() {
        let mut scheduler = EventScheduler::new();
        assert_eq!(
            scheduler.schedule(-0.5, 1, 0, None),
            Err(ScheduleError::InvalidDelay(-0.5))
        );
        assert!(scheduler.schedule(f64::NAN, 1, 0, None).is_err());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_schedule_at_rejects_past() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(2.0, 1, 0, None).unwrap();
        scheduler.run(5.0, |_, _| {});
        assert!(scheduler.schedule_at(1.0, Action::Audit).is_err());
        assert!(scheduler.schedule_at(2.0, Action::Audit).is_ok());
    }

    #[test]
    fn test_horizon_discards_late_events() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(1.0, 1, 0, None).unwrap();
        scheduler.schedule(5.0, 2, 0, None).unwrap();
        scheduler.schedule(7.5, 3, 0, None).unwrap();

        let mut delivered = Vec::new();
        let summary = scheduler.run(5.0, |_, event| delivered.push(deliver_target(&event)));

        assert_eq!(delivered, vec![1, 2]);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.discarded, 1);
        assert!(scheduler.is_empty());
        assert!(scheduler.now() <= 5.0);
    }

    #[test]
    fn test_handler_can_schedule_followups() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(0.0, 0, 0, None).unwrap();

        let mut times = Vec::new();
        scheduler.run(3.0, |sched, event| {
            times.push(event.time);
            let next = deliver_target(&event) + 1;
            sched.schedule(1.0, next, 0, Some(next - 1)).unwrap();
        });

        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_time_never_moves_backwards() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(4.0, 0, 0, None).unwrap();
        scheduler.schedule(0.5, 1, 0, None).unwrap();

        let mut last = 0.0;
        scheduler.run(10.0, |sched, event| {
            assert!(event.time >= last);
            last = event.time;
            if deliver_target(&event) == 1 {
                sched.schedule(0.25, 2, 0, Some(1)).unwrap();
            }
        });
    }
}
