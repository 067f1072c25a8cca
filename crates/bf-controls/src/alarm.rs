//! Prioritized alarm states, threshold monitoring, and the alarm manager.

use serde::{Deserialize, Serialize};

/// Alarm state with two families (MAX above range, MIN below range) and
/// four severity ranks per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AlarmState {
    #[default]
    None,
    High1,
    High2,
    Max1,
    Max2,
    Low1,
    Low2,
    Min1,
    Min2,
}

/// Which side of the operating range a state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmFamily {
    Max,
    Min,
}

impl AlarmState {
    pub fn family(self) -> Option<AlarmFamily> {
        match self {
            AlarmState::None => None,
            AlarmState::High1 | AlarmState::High2 | AlarmState::Max1 | AlarmState::Max2 => {
                Some(AlarmFamily::Max)
            }
            AlarmState::Low1 | AlarmState::Low2 | AlarmState::Min1 | AlarmState::Min2 => {
                Some(AlarmFamily::Min)
            }
        }
    }

    /// Severity rank within a family; `None` ranks zero.
    pub fn severity(self) -> u8 {
        match self {
            AlarmState::None => 0,
            AlarmState::High1 | AlarmState::Low1 => 1,
            AlarmState::High2 | AlarmState::Low2 => 2,
            AlarmState::Max1 | AlarmState::Min1 => 3,
            AlarmState::Max2 | AlarmState::Min2 => 4,
        }
    }

    /// Priority-comparison law: `self` includes `other` iff `other` belongs
    /// to the same family and ranks lower or equal.
    pub fn includes(self, other: AlarmState) -> bool {
        match (self.family(), other.family()) {
            (Some(a), Some(b)) => a == b && other.severity() <= self.severity(),
            _ => false,
        }
    }
}

/// Threshold set of a monitored variable. Any level may be absent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Thresholds {
    pub high1: Option<f64>,
    pub high2: Option<f64>,
    pub max1: Option<f64>,
    pub max2: Option<f64>,
    pub low1: Option<f64>,
    pub low2: Option<f64>,
    pub min1: Option<f64>,
    pub min2: Option<f64>,
}

/// Classifies a scalar against its thresholds, most severe level first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdMonitor {
    pub thresholds: Thresholds,
    /// Suppressed monitors always report `None` (maintenance, startup).
    pub suppressed: bool,
}

impl ThresholdMonitor {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            suppressed: false,
        }
    }

    pub fn classify(&self, value: f64) -> AlarmState {
        if self.suppressed {
            return AlarmState::None;
        }
        let t = &self.thresholds;
        let above = [
            (t.max2, AlarmState::Max2),
            (t.max1, AlarmState::Max1),
            (t.high2, AlarmState::High2),
            (t.high1, AlarmState::High1),
        ];
        for (limit, state) in above {
            if let Some(limit) = limit {
                if value >= limit {
                    return state;
                }
            }
        }
        let below = [
            (t.min2, AlarmState::Min2),
            (t.min1, AlarmState::Min1),
            (t.low2, AlarmState::Low2),
            (t.low1, AlarmState::Low1),
        ];
        for (limit, state) in below {
            if let Some(limit) = limit {
                if value <= limit {
                    return state;
                }
            }
        }
        AlarmState::None
    }
}

/// Callback invoked on escalation: `(previous, current)`.
pub type AlarmHook = Box<dyn FnMut(AlarmState, AlarmState)>;

/// Tracks one monitored variable and fires action hooks on escalation.
///
/// Hooks fire exactly on a transition to a strictly-higher-severity state;
/// de-escalation and same-severity changes update the state silently.
pub struct AlarmManager {
    monitor: ThresholdMonitor,
    state: AlarmState,
    hooks: Vec<AlarmHook>,
}

impl AlarmManager {
    pub fn new(monitor: ThresholdMonitor) -> Self {
        Self {
            monitor,
            state: AlarmState::None,
            hooks: Vec::new(),
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn monitor_mut(&mut self) -> &mut ThresholdMonitor {
        &mut self.monitor
    }

    /// Register an action hook.
    pub fn on_escalation(&mut self, hook: AlarmHook) {
        self.hooks.push(hook);
    }

    /// Feed a sample; returns the resulting state.
    pub fn process(&mut self, value: f64) -> AlarmState {
        let next = self.monitor.classify(value);
        if next != self.state {
            let escalated = next.severity() > self.state.severity();
            let previous = self.state;
            self.state = next;
            if escalated {
                for hook in &mut self.hooks {
                    hook(previous, next);
                }
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn s6_thresholds() -> Thresholds {
        Thresholds {
            high1: Some(80.0),
            high2: Some(90.0),
            max1: Some(95.0),
            max2: Some(100.0),
            ..Thresholds::default()
        }
    }

    #[test]
    fn classification_picks_the_highest_crossed_level() {
        let monitor = ThresholdMonitor::new(s6_thresholds());
        assert_eq!(monitor.classify(79.0), AlarmState::None);
        assert_eq!(monitor.classify(85.0), AlarmState::High1);
        assert_eq!(monitor.classify(92.0), AlarmState::High2);
        assert_eq!(monitor.classify(96.0), AlarmState::Max1);
        assert_eq!(monitor.classify(101.0), AlarmState::Max2);
    }

    #[test]
    fn suppression_silences_everything() {
        let mut monitor = ThresholdMonitor::new(s6_thresholds());
        monitor.suppressed = true;
        assert_eq!(monitor.classify(101.0), AlarmState::None);
    }

    #[test]
    fn includes_law() {
        assert!(AlarmState::Max1.includes(AlarmState::High1));
        assert!(AlarmState::Max1.includes(AlarmState::Max1));
        assert!(!AlarmState::High1.includes(AlarmState::Max1));
        // Cross-family never includes.
        assert!(!AlarmState::Max2.includes(AlarmState::Min1));
        // None has no family.
        assert!(!AlarmState::Max1.includes(AlarmState::None));
        assert!(!AlarmState::None.includes(AlarmState::None));
    }

    #[test]
    fn hooks_fire_only_on_escalation() {
        let fired: Rc<RefCell<Vec<(AlarmState, AlarmState)>>> = Rc::default();
        let sink = fired.clone();

        let mut manager = AlarmManager::new(ThresholdMonitor::new(s6_thresholds()));
        manager.on_escalation(Box::new(move |prev, next| {
            sink.borrow_mut().push((prev, next));
        }));

        assert_eq!(manager.process(85.0), AlarmState::High1);
        assert_eq!(manager.process(96.0), AlarmState::Max1);
        // De-escalation is silent.
        assert_eq!(manager.process(85.0), AlarmState::High1);
        // Re-escalation fires again.
        assert_eq!(manager.process(101.0), AlarmState::Max2);

        let log = fired.borrow();
        assert_eq!(
            *log,
            vec![
                (AlarmState::None, AlarmState::High1),
                (AlarmState::High1, AlarmState::Max1),
                (AlarmState::High1, AlarmState::Max2),
            ]
        );
    }

    proptest! {
        // includes() is a partial order within a family: reflexive above
        // None, antisymmetric for distinct states, transitive.
        #[test]
        fn includes_is_transitive(a in 0u8..9, b in 0u8..9, c in 0u8..9) {
            let states = [
                AlarmState::None, AlarmState::High1, AlarmState::High2,
                AlarmState::Max1, AlarmState::Max2, AlarmState::Low1,
                AlarmState::Low2, AlarmState::Min1, AlarmState::Min2,
            ];
            let (a, b, c) = (states[a as usize], states[b as usize], states[c as usize]);
            if a.includes(b) && b.includes(c) {
                prop_assert!(a.includes(c));
            }
        }
    }
}
