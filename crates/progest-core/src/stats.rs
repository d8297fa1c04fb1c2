//! Online statistics used by the estimator: Welford ratios and the speed window.

use std::collections::VecDeque;

/// Weight of the newest sample in the speed average.
const EMA_ALPHA: f64 = 0.3;

/// Running mean and variance of a ratio (Welford / Knuth online update).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningRatio {
    mean: f64,
    m2: f64,
    samples: u64,
}

impl RunningRatio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation in and return the updated standard deviation.
    pub fn push(&mut self, x: f64) -> f64 {
        self.samples += 1;
        let delta = x - self.mean;
        self.mean += delta / self.samples as f64;
        self.m2 += delta * (x - self.mean);
        self.sigma()
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation, `sqrt(|M2| / n)`; 0 before the first sample.
    pub fn sigma(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        (self.m2.abs() / self.samples as f64).sqrt()
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

/// Bounded FIFO of instantaneous transfer rates (bytes/sec).
#[derive(Debug, Clone)]
pub struct RateWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RateWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a rate, evicting the oldest once over capacity.
    pub fn push(&mut self, rate: f64) {
        self.samples.push_back(rate);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Exponential moving average re-derived from the whole window, oldest first,
    /// starting from zero. A shorter window therefore smooths less.
    pub fn ema(&self) -> f64 {
        self.samples
            .iter()
            .fold(0.0, |speed, &x| EMA_ALPHA * x + (1.0 - EMA_ALPHA) * speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_ratio_has_zero_sigma() {
        let mut r = RunningRatio::new();
        for _ in 0..10 {
            r.push(0.5);
        }
        assert_eq!(r.mean(), 0.5);
        assert!(r.sigma() < 1e-12);
        assert_eq!(r.samples(), 10);
    }

    #[test]
    fn welford_matches_population_variance() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut r = RunningRatio::new();
        for x in xs {
            r.push(x);
        }
        assert!((r.mean() - 5.0).abs() < 1e-12);
        assert!((r.sigma() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_ratio_sigma_is_zero() {
        assert_eq!(RunningRatio::new().sigma(), 0.0);
    }

    #[test]
    fn window_evicts_oldest() {
        let mut w = RateWindow::new(3);
        for x in [1.0, 2.0, 3.0, 4.0] {
            w.push(x);
        }
        assert_eq!(w.len(), 3);
        // 0.3*2 = 0.6; 0.3*3 + 0.7*0.6 = 1.32; 0.3*4 + 0.7*1.32 = 2.124
        assert!((w.ema() - 2.124).abs() < 1e-9);
    }

    #[test]
    fn ema_of_empty_window_is_zero() {
        let w = RateWindow::new(30);
        assert!(w.is_empty());
        assert_eq!(w.ema(), 0.0);
    }
}
