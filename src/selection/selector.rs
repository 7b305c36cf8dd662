//! Best-candidate selection with switch hysteresis.
//!
//! # Responsibilities
//! - Answer "top n candidates" straight from the current snapshot
//! - Hold a best candidate and only replace it when a challenger wins by the margin
//! - Start draining the previous best when it is replaced

use std::sync::{Arc, Mutex};

use crate::drain::DrainTracker;
use crate::health::HealthState;
use crate::observability::metrics;
use crate::ranking::{Availability, CandidateStatus, RankingTable};
use crate::selection::margin::SwitchMargin;

/// Policy layer over the ranking table.
#[derive(Debug)]
pub struct Selector {
    table: Arc<RankingTable>,
    drains: Arc<DrainTracker>,
    margin: SwitchMargin,
    held: Mutex<Option<String>>,
}

impl Selector {
    pub fn new(table: Arc<RankingTable>, drains: Arc<DrainTracker>, margin: SwitchMargin) -> Self {
        Self {
            table,
            drains,
            margin,
            held: Mutex::new(None),
        }
    }

    /// The best `n` candidates in raw ranking order.
    pub fn select(&self, n: usize) -> Vec<CandidateStatus> {
        self.table.snapshot().top(n).to_vec()
    }

    /// Whether any candidate can carry traffic right now.
    pub fn availability(&self) -> Availability {
        self.table.snapshot().availability()
    }

    /// Tag of the currently held best, without re-evaluating.
    pub fn held_best(&self) -> Option<String> {
        self.held.lock().expect("selector mutex poisoned").clone()
    }

    /// The candidate to route new connections to, or `None` when nothing is usable.
    pub fn select_best(&self) -> Option<CandidateStatus> {
        let snapshot = self.table.snapshot();
        let challenger = snapshot.first().filter(|c| c.state.is_usable())?;

        let mut held = self.held.lock().expect("selector mutex poisoned");
        let incumbent = held.as_deref().and_then(|tag| snapshot.get(tag));

        let chosen = match incumbent {
            Some(incumbent) if self.keeps(incumbent, challenger) => incumbent,
            _ => challenger,
        };

        if held.as_deref() != Some(chosen.tag.as_str()) {
            let previous = held.replace(chosen.tag.clone());
            drop(held);
            self.on_switch(previous.as_deref(), chosen);
        }

        Some(chosen.clone())
    }

    /// Forget the held best if it is `tag`.
    pub fn release(&self, tag: &str) {
        let mut held = self.held.lock().expect("selector mutex poisoned");
        if held.as_deref() == Some(tag) {
            *held = None;
        }
    }

    fn keeps(&self, incumbent: &CandidateStatus, challenger: &CandidateStatus) -> bool {
        if incumbent.tag == challenger.tag {
            return true;
        }
        match (&incumbent.state, &challenger.state) {
            (HealthState::Qualified { rtt: held }, HealthState::Qualified { rtt: new }) => {
                !self.margin.exceeded_by(*held, *new)
            }
            (HealthState::Unqualified { .. }, HealthState::Unqualified { .. }) => true,
            _ => false,
        }
    }

    fn on_switch(&self, previous: Option<&str>, next: &CandidateStatus) {
        match previous {
            Some(previous) => {
                tracing::info!(
                    from = %previous,
                    to = %next.tag,
                    rtt = ?next.state.measured(),
                    "Selected outbound changed"
                );
                metrics::record_selection_switch();
                self.drains.mark_draining(previous);
            }
            None => {
                tracing::info!(to = %next.tag, rtt = ?next.state.measured(), "Selected outbound");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{CandidateHealth, Classifier};
    use crate::drain::DrainPhase;
    use crate::probe::{ProbeFailure, ProbeResult};
    use crate::ranking::TableUpdate;
    use std::time::Duration;

    struct Fixture {
        table: Arc<RankingTable>,
        drains: Arc<DrainTracker>,
        selector: Selector,
    }

    fn fixture(margin: SwitchMargin, tags: &[&str]) -> Fixture {
        let table = Arc::new(RankingTable::new());
        let drains = Arc::new(DrainTracker::new(Duration::from_secs(1)));
        table.apply(tags.iter().map(|tag| TableUpdate::Register {
            tag: tag.to_string(),
            generation: 1,
        }));
        let selector = Selector::new(table.clone(), drains.clone(), margin);
        Fixture { table, drains, selector }
    }

    fn set(table: &RankingTable, tag: &str, state: HealthState) {
        table.apply(vec![TableUpdate::Observe(CandidateStatus {
            state,
            ..CandidateStatus::untested(tag, 1)
        })]);
    }

    fn qualified(ms: u64) -> HealthState {
        HealthState::Qualified { rtt: Duration::from_millis(ms) }
    }

    #[test]
    fn keeps_incumbent_within_margin() {
        let f = fixture(SwitchMargin::Relative(0.1), &["a", "b"]);
        set(&f.table, "a", qualified(100));
        set(&f.table, "b", qualified(150));
        assert_eq!(f.selector.select_best().unwrap().tag, "a");

        set(&f.table, "b", qualified(98));
        assert_eq!(f.selector.select(1)[0].tag, "b");
        assert_eq!(f.selector.select_best().unwrap().tag, "a");

        set(&f.table, "b", qualified(80));
        assert_eq!(f.selector.select_best().unwrap().tag, "b");
        assert_eq!(f.selector.held_best().as_deref(), Some("b"));
    }

    #[test]
    fn switches_when_incumbent_degrades() {
        let f = fixture(SwitchMargin::AbsoluteMs(50), &["a", "b"]);
        set(&f.table, "a", qualified(100));
        set(&f.table, "b", qualified(120));
        assert_eq!(f.selector.select_best().unwrap().tag, "a");

        set(&f.table, "a", HealthState::Unqualified { rtt: Duration::from_secs(2) });
        assert_eq!(f.selector.select_best().unwrap().tag, "b");
    }

    #[test]
    fn switch_marks_previous_best_draining() {
        let f = fixture(SwitchMargin::AbsoluteMs(0), &["a", "b"]);
        set(&f.table, "a", qualified(100));
        set(&f.table, "b", qualified(200));
        f.selector.select_best();

        let conn = f.drains.open("a");
        set(&f.table, "b", qualified(10));
        assert_eq!(f.selector.select_best().unwrap().tag, "b");
        assert_eq!(conn.phase(), DrainPhase::Draining);
    }

    #[test]
    fn none_usable_returns_none() {
        let f = fixture(SwitchMargin::Relative(0.1), &["a", "b"]);
        assert_eq!(f.selector.availability(), Availability::NoneUsable);
        assert!(f.selector.select_best().is_none());

        set(&f.table, "a", HealthState::Failed { reason: ProbeFailure::Connect("refused".into()) });
        assert!(f.selector.select_best().is_none());
        assert!(f.selector.held_best().is_none());
    }

    #[test]
    fn removed_incumbent_is_replaced() {
        let f = fixture(SwitchMargin::Relative(0.5), &["a", "b"]);
        set(&f.table, "a", qualified(100));
        set(&f.table, "b", qualified(140));
        assert_eq!(f.selector.select_best().unwrap().tag, "a");

        f.table.apply(vec![TableUpdate::Remove { tag: "a".into(), generation: 1 }]);
        assert_eq!(f.selector.select_best().unwrap().tag, "b");
    }

    #[test]
    fn three_candidate_failover() {
        let f = fixture(SwitchMargin::Relative(0.1), &["A", "B", "C"]);
        let classifier = Classifier::new(3, Duration::from_millis(1000));
        let fail = ProbeResult::Failure(ProbeFailure::Timeout(Duration::from_secs(5)));

        let mut a = CandidateHealth::new();
        let mut b = CandidateHealth::new();
        let mut c = CandidateHealth::new();
        classifier.observe(&mut a, &ProbeResult::Success(Duration::from_millis(50)));
        classifier.observe(&mut b, &ProbeResult::Success(Duration::from_millis(120)));
        classifier.observe(&mut c, &fail);

        let publish = |tag: &str, health: &CandidateHealth| {
            f.table.apply(vec![TableUpdate::Observe(CandidateStatus::from_health(tag, 1, health))]);
        };
        publish("A", &a);
        publish("B", &b);
        publish("C", &c);

        let tags = |v: Vec<CandidateStatus>| v.into_iter().map(|c| c.tag).collect::<Vec<_>>();
        assert_eq!(tags(f.selector.select(2)), vec!["A", "B"]);

        for _ in 0..3 {
            classifier.observe(&mut a, &fail);
            publish("A", &a);
        }
        assert_eq!(a.state.label().as_str(), "failed");
        assert_eq!(tags(f.selector.select(2)), vec!["B", "A"]);
        assert_eq!(tags(f.selector.select(3)), vec!["B", "A", "C"]);
    }
}
