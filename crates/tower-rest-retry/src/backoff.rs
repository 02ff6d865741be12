use std::time::Duration;

/// Computes the wait before a retry.
///
/// `attempt` is zero-based: `next_interval(0)` is the wait after the first
/// failed attempt.
pub trait IntervalFunction: Send + Sync {
    fn next_interval(&self, attempt: usize) -> Duration;
}

/// The same wait before every retry.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    delay: Duration,
}

impl FixedInterval {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _attempt: usize) -> Duration {
        self.delay
    }
}

/// `initial * multiplier^attempt`, optionally capped.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Doubles the wait after each attempt.
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Upper bound for any single wait.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        grow(self.initial, self.multiplier, attempt, self.max_interval)
    }
}

/// Exponential backoff with uniform jitter of `± factor` around each wait.
#[derive(Debug, Clone)]
pub struct ExponentialRandomBackoff {
    base: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    /// `randomization_factor` is clamped to `0.0..=1.0`; `0.5` spreads each
    /// wait over 50% to 150% of the exponential value.
    pub fn new(initial: Duration, randomization_factor: f64) -> Self {
        Self {
            base: ExponentialBackoff::new(initial),
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
        }
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.base = self.base.multiplier(multiplier);
        self
    }

    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.base = self.base.max_interval(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        use rand::Rng;

        let interval = self.base.next_interval(attempt);
        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        if delta <= 0.0 {
            return interval;
        }
        let jittered = rand::rng().random_range((secs - delta)..=(secs + delta));
        Duration::try_from_secs_f64(jittered.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Backoff computed by a closure.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, attempt: usize) -> Duration {
        (self.f)(attempt)
    }
}

fn grow(initial: Duration, multiplier: f64, attempt: usize, cap: Option<Duration>) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let nanos = initial.as_nanos() as f64 * multiplier.powi(exponent);
    // Non-finite or overflowing values saturate instead of panicking.
    let interval = if nanos.is_finite() && nanos >= 0.0 && nanos < u64::MAX as f64 {
        Duration::from_nanos(nanos as u64)
    } else {
        Duration::MAX
    };
    match cap {
        Some(max) => interval.min(max),
        None => interval,
    }
}
