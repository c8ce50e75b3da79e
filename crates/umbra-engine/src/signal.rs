//! Signal helpers for scripting scene ambience.
//!
//! Small building blocks that level scripts chain together: an
//! [`Oscillator`] emits a signal every `period ± spread` seconds, a
//! [`Listener`] fans a signal out to several entries (each with its own
//! probability and delay), a [`ProbabilityGate`] passes a signal with some
//! probability, and a [`Delay`] re-emits it later.
//!
//! None of them invoke callbacks. Every trigger or frame returns the outputs
//! that fired, and the caller decides what they mean (restore a node, force
//! a tick, play a sting). Delays are remaining-seconds timers advanced by
//! the caller's frame deltas.
//!
//! ```
//! use rand::SeedableRng;
//! use rand_pcg::Pcg64;
//! use umbra_engine::signal::{Oscillator, SignalEntry};
//!
//! let mut rng = Pcg64::seed_from_u64(0);
//! let entries = vec![SignalEntry::new("flash")];
//! let mut thunder = Oscillator::new("thunder", 4.0, 0.0, entries, &mut rng).unwrap();
//!
//! assert!(thunder.advance(3.0, &mut rng).is_empty());
//! assert_eq!(thunder.advance(1.0, &mut rng), vec!["flash"]);
//! ```

use rand::{Rng, RngCore};
use tracing::trace;

// ---------------------------------------------------------------------------
// SignalError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("probability must lie in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("delay must be non-negative and finite, got {0}")]
    InvalidDelay(f64),

    #[error("oscillator period must be non-negative and finite, got {0}")]
    InvalidPeriod(f64),

    #[error("oscillator spread must be non-negative and finite, got {0}")]
    InvalidSpread(f64),
}

fn check_probability(p: f64) -> Result<(), SignalError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SignalError::InvalidProbability(p))
    }
}

fn check_delay(seconds: f64) -> Result<(), SignalError> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(SignalError::InvalidDelay(seconds))
    }
}

/// One roll against `probability`. Passes when `u <= probability` for
/// `u ∈ [0, 1)`.
fn roll(probability: f64, rng: &mut dyn RngCore) -> bool {
    rng.gen::<f64>() <= probability
}

// ---------------------------------------------------------------------------
// SignalEntry
// ---------------------------------------------------------------------------

/// An output of a [`Listener`] or [`Oscillator`].
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEntry<T> {
    /// Chance that the output fires on a signal.
    pub probability: f64,
    /// Seconds between the signal and the output; zero fires at once.
    pub delay_seconds: f64,
    pub output: T,
}

impl<T> SignalEntry<T> {
    /// Always fires, immediately.
    pub fn new(output: T) -> Self {
        Self {
            probability: 1.0,
            delay_seconds: 0.0,
            output,
        }
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn with_delay(mut self, seconds: f64) -> Self {
        self.delay_seconds = seconds;
        self
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        check_probability(self.probability)?;
        check_delay(self.delay_seconds)
    }
}

// ---------------------------------------------------------------------------
// Delay
// ---------------------------------------------------------------------------

/// Re-emits its output `seconds` after every trigger. Overlapping triggers
/// each get their own timer.
#[derive(Debug, Clone)]
pub struct Delay<T> {
    seconds: f64,
    output: T,
    pending: Vec<f64>,
}

impl<T: Clone> Delay<T> {
    pub fn new(seconds: f64, output: T) -> Result<Self, SignalError> {
        check_delay(seconds)?;
        Ok(Self {
            seconds,
            output,
            pending: Vec::new(),
        })
    }

    pub fn trigger(&mut self) {
        self.pending.push(self.seconds);
    }

    /// Count pending timers down by `dt`; one output per expired timer.
    pub fn advance(&mut self, dt: f64) -> Vec<T> {
        let mut fired = 0;
        self.pending.retain_mut(|remaining| {
            *remaining -= dt;
            if *remaining <= 0.0 {
                fired += 1;
                false
            } else {
                true
            }
        });
        vec![self.output.clone(); fired]
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// ProbabilityGate
// ---------------------------------------------------------------------------

/// Passes a signal through with a fixed probability.
#[derive(Debug, Clone)]
pub struct ProbabilityGate<T> {
    probability: f64,
    output: T,
}

impl<T: Clone> ProbabilityGate<T> {
    pub fn new(probability: f64, output: T) -> Result<Self, SignalError> {
        check_probability(probability)?;
        Ok(Self {
            probability,
            output,
        })
    }

    pub fn trigger(&self, rng: &mut dyn RngCore) -> Option<T> {
        roll(self.probability, rng).then(|| self.output.clone())
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct PendingOutput<T> {
    remaining: f64,
    output: T,
}

/// Fans one signal out to several entries, each rolled independently.
#[derive(Debug, Clone)]
pub struct Listener<T> {
    entries: Vec<SignalEntry<T>>,
    pending: Vec<PendingOutput<T>>,
}

impl<T: Clone> Listener<T> {
    pub fn new(entries: Vec<SignalEntry<T>>) -> Result<Self, SignalError> {
        for entry in &entries {
            entry.validate()?;
        }
        Ok(Self {
            entries,
            pending: Vec::new(),
        })
    }

    /// Roll every entry. Returns the immediate outputs in entry order;
    /// delayed ones come out of later [`advance`](Self::advance) calls.
    pub fn trigger(&mut self, rng: &mut dyn RngCore) -> Vec<T> {
        let mut now = Vec::new();
        for entry in &self.entries {
            if !roll(entry.probability, rng) {
                continue;
            }
            if entry.delay_seconds > 0.0 {
                self.pending.push(PendingOutput {
                    remaining: entry.delay_seconds,
                    output: entry.output.clone(),
                });
            } else {
                now.push(entry.output.clone());
            }
        }
        now
    }

    /// Count delayed outputs down by `dt`. Returns those that came due, in
    /// the order they were scheduled.
    pub fn advance(&mut self, dt: f64) -> Vec<T> {
        let mut due = Vec::new();
        self.pending.retain_mut(|p| {
            p.remaining -= dt;
            if p.remaining <= 0.0 {
                due.push(p.output.clone());
                false
            } else {
                true
            }
        });
        due
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn entries(&self) -> &[SignalEntry<T>] {
        &self.entries
    }
}

// ---------------------------------------------------------------------------
// Oscillator
// ---------------------------------------------------------------------------

/// Emits a signal to its entries every `period` seconds, each interval
/// jittered by a uniform offset in `[-spread, spread]` and clamped at zero.
/// At most one signal per frame.
#[derive(Debug, Clone)]
pub struct Oscillator<T> {
    name: String,
    period: f64,
    spread: f64,
    timer: f64,
    current_interval: f64,
    listener: Listener<T>,
}

impl<T: Clone> Oscillator<T> {
    pub fn new(
        name: impl Into<String>,
        period: f64,
        spread: f64,
        entries: Vec<SignalEntry<T>>,
        rng: &mut dyn RngCore,
    ) -> Result<Self, SignalError> {
        if !(period.is_finite() && period >= 0.0) {
            return Err(SignalError::InvalidPeriod(period));
        }
        if !(spread.is_finite() && spread >= 0.0) {
            return Err(SignalError::InvalidSpread(spread));
        }
        let mut oscillator = Self {
            name: name.into(),
            period,
            spread,
            timer: 0.0,
            current_interval: period,
            listener: Listener::new(entries)?,
        };
        oscillator.current_interval = oscillator.randomized_interval(rng);
        Ok(oscillator)
    }

    fn randomized_interval(&self, rng: &mut dyn RngCore) -> f64 {
        let jitter = if self.spread > 0.0 {
            rng.gen_range(-self.spread..=self.spread)
        } else {
            0.0
        };
        (self.period + jitter).max(0.0)
    }

    /// Advance by one frame. Returns delayed outputs that came due, then the
    /// outputs of this frame's signal if one fired.
    pub fn advance(&mut self, dt: f64, rng: &mut dyn RngCore) -> Vec<T> {
        if !(dt >= 0.0 && dt.is_finite()) {
            return Vec::new();
        }
        let mut out = self.listener.advance(dt);
        self.timer += dt;
        if self.timer >= self.current_interval {
            self.timer -= self.current_interval;
            self.current_interval = self.randomized_interval(rng);
            trace!(oscillator = %self.name, "oscillator emitted signal");
            out.extend(self.listener.trigger(rng));
        }
        out
    }

    /// Emit a signal now and restart the interval.
    pub fn force_signal(&mut self, rng: &mut dyn RngCore) -> Vec<T> {
        self.timer = 0.0;
        self.current_interval = self.randomized_interval(rng);
        trace!(oscillator = %self.name, "oscillator emitted signal (forced)");
        self.listener.trigger(rng)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length of the interval currently being counted.
    pub fn current_interval(&self) -> f64 {
        self.current_interval
    }

    pub fn pending(&self) -> usize {
        self.listener.pending()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
