
/// A detected pulse peak, positioned on the session sample clock.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Peak {
    /// Index of the peak sample since the estimator was created or reset.
    pub sample_index: u64,
    pub time_secs: f64,
    pub amplitude: f32,
}

/// Mean and population standard deviation of a window.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl WindowStats {
    pub fn compute(window: &[f32]) -> Self {
        if window.is_empty() {
            return Self { mean: 0.0, std_dev: 0.0 };
        }
        let n = window.len() as f64;
        let mean = window.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let variance = window
            .iter()
            .map(|&v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Self { mean, std_dev: variance.max(0.0).sqrt() }
    }
}

/// Adaptive-threshold local-maximum detector. Stateless: every call scans
/// the whole window it is given.
#[derive(Copy, Clone, Debug)]
pub struct PeakDetector {
    pub sample_rate: f64,
    pub min_distance_secs: f64,
    pub threshold_std_ratio: f64,
}

impl PeakDetector {
    pub fn new(sample_rate: f64, min_distance_secs: f64, threshold_std_ratio: f64) -> Self {
        Self { sample_rate, min_distance_secs, threshold_std_ratio }
    }

    pub fn threshold(&self, window: &[f32]) -> f64 {
        let stats = WindowStats::compute(window);
        stats.mean + self.threshold_std_ratio * stats.std_dev
    }

    /// Scans `window`, whose first sample sits at `window_start` on the
    /// session clock, and returns the newly accepted peaks in order.
    ///
    /// Acceptance is greedy: each candidate is compared with the most
    /// recently accepted peak only, starting from `last_peak` (the newest
    /// peak already on record, if any). Candidates at or before that peak
    /// are re-detections and are dropped.
    pub fn scan(&self, window: &[f32], window_start: u64, last_peak: Option<u64>) -> Vec<Peak> {
        let mut accepted = Vec::new();
        if window.len() < 3 {
            return accepted;
        }
        let threshold = self.threshold(window);
        let mut last = last_peak;

        for (offset, triple) in window.windows(3).enumerate() {
            let (prev, curr, next) = (triple[0], triple[1], triple[2]);
            if !(curr > prev && curr > next && f64::from(curr) > threshold) {
                continue;
            }
            let sample_index = window_start + offset as u64 + 1;
            if let Some(last) = last {
                if sample_index <= last {
                    continue;
                }
                let gap_secs = (sample_index - last) as f64 / self.sample_rate;
                if gap_secs < self.min_distance_secs {
                    continue;
                }
            }
            accepted.push(Peak {
                sample_index,
                time_secs: sample_index as f64 / self.sample_rate,
                amplitude: curr,
            });
            last = Some(sample_index);
        }
        accepted
    }
}

/// Converts peak positions into a rate: keeps consecutive intervals within
/// `[min_interval_secs, max_interval_secs]` (inclusive) and returns
/// `60 / mean(interval)`, or `None` when no interval survives.
///
/// Intervals are summed in whole samples and divided by the rate once, so
/// boundary spacings land exactly on the bounds.
pub fn bpm_from_peak_indices<I>(
    indices: I,
    sample_rate: f64,
    min_interval_secs: f64,
    max_interval_secs: f64,
) -> Option<f64>
where
    I: IntoIterator<Item = u64>,
{
    let mut previous: Option<u64> = None;
    let mut gap_sum: u64 = 0;
    let mut count: u64 = 0;

    for index in indices {
        if let Some(prev) = previous {
            let gap = index.saturating_sub(prev);
            let interval = gap as f64 / sample_rate;
            if (min_interval_secs..=max_interval_secs).contains(&interval) {
                gap_sum += gap;
                count += 1;
            }
        }
        previous = Some(index);
    }

    if count == 0 {
        return None;
    }
    let mean_interval = (gap_sum as f64 / count as f64) / sample_rate;
    Some(60.0 / mean_interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spikes(len: usize, positions: &[usize]) -> Vec<f32> {
        let mut window = vec![0.0; len];
        for &p in positions {
            window[p] = 1.0;
        }
        window
    }

    #[test]
    fn stats_of_constant_window() {
        let stats = WindowStats::compute(&[2.0; 10]);
        assert_relative_eq!(stats.mean, 2.0);
        assert_relative_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn stats_match_population_formula() {
        let stats = WindowStats::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_relative_eq!(stats.mean, 5.0);
        assert_relative_eq!(stats.std_dev, 2.0);
    }

    #[test]
    fn flat_window_has_no_peaks() {
        let detector = PeakDetector::new(100.0, 0.3, 0.5);
        assert!(detector.scan(&[0.0; 200], 0, None).is_empty());
    }

    #[test]
    fn finds_spikes_on_session_clock() {
        let detector = PeakDetector::new(100.0, 0.3, 0.5);
        let window = spikes(200, &[20, 80, 140]);
        let peaks = detector.scan(&window, 1000, None);
        let indices: Vec<u64> = peaks.iter().map(|p| p.sample_index).collect();
        assert_eq!(indices, vec![1020, 1080, 1140]);
        assert_relative_eq!(peaks[0].time_secs, 10.2);
        assert_relative_eq!(peaks[0].amplitude, 1.0);
    }

    #[test]
    fn edges_are_never_candidates() {
        let detector = PeakDetector::new(100.0, 0.3, 0.5);
        let window = spikes(100, &[0, 99]);
        assert!(detector.scan(&window, 0, None).is_empty());
    }

    #[test]
    fn plateau_is_not_a_peak() {
        let detector = PeakDetector::new(100.0, 0.3, 0.5);
        let mut window = vec![0.0; 100];
        window[50] = 1.0;
        window[51] = 1.0;
        assert!(detector.scan(&window, 0, None).is_empty());
    }

    #[test]
    fn close_candidates_are_greedy_left_to_right() {
        let detector = PeakDetector::new(100.0, 0.3, 0.5);
        // 60 is rejected; 85 is measured from 40, not from 60.
        let window = spikes(200, &[40, 60, 85, 130]);
        let indices: Vec<u64> = detector
            .scan(&window, 0, None)
            .iter()
            .map(|p| p.sample_index)
            .collect();
        assert_eq!(indices, vec![40, 85, 130]);
    }

    #[test]
    fn redetections_are_dropped() {
        let detector = PeakDetector::new(100.0, 0.3, 0.5);
        let window = spikes(200, &[20, 80, 140]);
        let indices: Vec<u64> = detector
            .scan(&window, 0, Some(80))
            .iter()
            .map(|p| p.sample_index)
            .collect();
        assert_eq!(indices, vec![140]);
    }

    #[test]
    fn small_bumps_below_threshold_are_ignored() {
        let detector = PeakDetector::new(100.0, 0.3, 0.5);
        let mut window = spikes(200, &[30, 130]);
        window[80] = 0.01;
        let indices: Vec<u64> = detector
            .scan(&window, 0, None)
            .iter()
            .map(|p| p.sample_index)
            .collect();
        assert_eq!(indices, vec![30, 130]);
    }

    #[test]
    fn interval_bounds_are_inclusive() {
        assert_relative_eq!(bpm_from_peak_indices([0, 30], 100.0, 0.3, 2.0).unwrap(), 200.0);
        assert_relative_eq!(bpm_from_peak_indices([0, 200], 100.0, 0.3, 2.0).unwrap(), 30.0);
        assert!(bpm_from_peak_indices([0, 29], 100.0, 0.3, 2.0).is_none());
        assert!(bpm_from_peak_indices([0, 201], 100.0, 0.3, 2.0).is_none());
    }

    #[test]
    fn out_of_range_intervals_are_skipped() {
        // 0.6 s, 2.5 s (skipped), 0.6 s
        let bpm = bpm_from_peak_indices([0, 60, 310, 370], 100.0, 0.3, 2.0).unwrap();
        assert_relative_eq!(bpm, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn needs_two_peaks() {
        assert!(bpm_from_peak_indices(std::iter::empty(), 100.0, 0.3, 2.0).is_none());
        assert!(bpm_from_peak_indices([42], 100.0, 0.3, 2.0).is_none());
    }
}
