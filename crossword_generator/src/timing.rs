//! Per-phase timing accumulators.
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Accumulated time and call count of one phase
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PhaseTiming {
    pub total: Duration,
    pub calls: u64,
}
impl PhaseTiming {
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        }
        else {
            let nanos = self.total.as_nanos() / u128::from(self.calls);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        }
    }
}

/// Timing of every phase of a simulation; only ever grows
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimingStats {
    phases: BTreeMap<&'static str, PhaseTiming>,
}
impl TimingStats {
    pub fn new() -> TimingStats {
        TimingStats::default()
    }

    /// Adds one call of `elapsed` to `phase`
    pub fn add(&mut self, phase: &'static str, elapsed: Duration) {
        let timing = self.phases.entry(phase).or_default();
        timing.total += elapsed;
        timing.calls += 1;
    }

    /// Records the time since `start` against `phase` and returns it
    pub fn record(&mut self, phase: &'static str, start: Instant) -> Duration {
        let elapsed = start.elapsed();
        self.add(phase, elapsed);
        elapsed
    }

    pub fn get(&self, phase: &str) -> Option<&PhaseTiming> {
        self.phases.get(phase)
    }

    /// Phases in name order
    pub fn phases(&self) -> impl Iterator<Item = (&'static str, &PhaseTiming)> {
        self.phases.iter().map(|(name, timing)| (*name, timing))
    }

    pub fn total(&self) -> Duration {
        self.phases.values().map(|timing| timing.total).sum()
    }

    /// Report header entries: the overall total, then total/average/calls per phase
    ///
    /// Times are in milliseconds with three decimals, keyed `<prefix>_timing_...`.
    pub fn header_entries(&self, prefix: &str) -> Vec<(String, String)> {
        let mut entries = vec![(format!("{}_timing_total_ms", prefix), format_ms(self.total()))];
        for (phase, timing) in self.phases() {
            entries.push((format!("{}_timing_{}_total_ms", prefix, phase), format_ms(timing.total)));
            entries.push((format!("{}_timing_{}_avg_ms", prefix, phase), format_ms(timing.average())));
            entries.push((format!("{}_timing_{}_calls", prefix, phase), timing.calls.to_string()));
        }
        entries
    }
}

/// Milliseconds of `duration` as a float
pub fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn format_ms(duration: Duration) -> String {
    format!("{:.3}", millis(duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_accumulate() {
        let mut timing = TimingStats::new();
        timing.add("score", Duration::from_millis(3));
        timing.add("score", Duration::from_millis(5));
        timing.add("layout_build", Duration::from_millis(10));
        let score = timing.get("score").unwrap();
        assert_eq!(score.calls, 2);
        assert_eq!(score.average(), Duration::from_millis(4));
        assert_eq!(timing.total(), Duration::from_millis(18));
    }

    #[test]
    fn average_divides_by_full_call_count() {
        let calls = 1u64 << 33;
        let timing = PhaseTiming { total: Duration::from_secs(calls), calls };
        assert_eq!(timing.average(), Duration::from_secs(1));
        assert_eq!(PhaseTiming::default().average(), Duration::ZERO);
    }

    #[test]
    fn header_entries_are_sorted_by_phase() {
        let mut timing = TimingStats::new();
        timing.add("score", Duration::from_micros(1500));
        timing.add("layout_build", Duration::from_millis(2));
        let keys: Vec<String> = timing.header_entries("mutate").into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "mutate_timing_total_ms",
                "mutate_timing_layout_build_total_ms",
                "mutate_timing_layout_build_avg_ms",
                "mutate_timing_layout_build_calls",
                "mutate_timing_score_total_ms",
                "mutate_timing_score_avg_ms",
                "mutate_timing_score_calls",
            ]
        );
        assert_eq!(timing.header_entries("mutate")[0].1, "3.500");
    }
}
