//! Bounded time-series recording.

/// Ring-buffered `(t, value)` store with optional decimation.
///
/// Keeps at most `capacity` samples; when full, the oldest sample drops.
/// `record_every` decimates the input stream (1 records everything).
#[derive(Debug, Clone)]
pub struct TimeSeriesVault {
    samples: Vec<(f64, f64)>,
    capacity: usize,
    record_every: usize,
    pushed: usize,
}

impl TimeSeriesVault {
    pub fn new(capacity: usize, record_every: usize) -> Self {
        Self {
            samples: Vec::new(),
            capacity: capacity.max(1),
            record_every: record_every.max(1),
            pushed: 0,
        }
    }

    /// Offer a sample; records it if the decimation counter matches.
    pub fn push(&mut self, t: f64, value: f64) {
        let record = self.pushed % self.record_every == 0;
        self.pushed += 1;
        if !record {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.remove(0);
        }
        self.samples.push((t, value));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.samples.last().copied()
    }

    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }

    /// Mean of the recorded values within `[t_from, t_to]`.
    pub fn mean_between(&self, t_from: f64, t_to: f64) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &(t, v) in &self.samples {
            if (t_from..=t_to).contains(&t) {
                sum += v;
                count += 1;
            }
        }
        if count == 0 { None } else { Some(sum / count as f64) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_evicts_in_order() {
        let mut vault = TimeSeriesVault::new(3, 1);
        for i in 0..5 {
            vault.push(i as f64, 10.0 * i as f64);
        }
        assert_eq!(vault.len(), 3);
        assert_eq!(vault.samples()[0], (2.0, 20.0));
        assert_eq!(vault.last(), Some((4.0, 40.0)));
    }

    #[test]
    fn decimation_skips_samples() {
        let mut vault = TimeSeriesVault::new(100, 3);
        for i in 0..9 {
            vault.push(i as f64, i as f64);
        }
        assert_eq!(vault.len(), 3);
        assert_eq!(vault.samples()[1], (3.0, 3.0));
    }

    #[test]
    fn windowed_mean() {
        let mut vault = TimeSeriesVault::new(10, 1);
        for i in 0..5 {
            vault.push(i as f64, i as f64);
        }
        assert_eq!(vault.mean_between(1.0, 3.0), Some(2.0));
        assert_eq!(vault.mean_between(10.0, 20.0), None);
    }
}
