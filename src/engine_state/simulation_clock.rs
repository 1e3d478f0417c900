//! # Simulation Clock
//!
//! Decouples the fixed-rate physics step from the variable-rate render loop.
//!
//! Time is measured in performance-counter ticks. Each frame the elapsed ticks are added to a
//! remainder, and whole fixed steps are drained from it greedily. The leftover fraction of a
//! step becomes the interpolation factor used to blend the last two fixed-step snapshots.
//!
//! ## Lifecycle
//!
//! The first [`SimulationClock::tick`] only primes the clock and returns [`ClockTick::Primed`];
//! no interpolation exists before the first real step, so the caller skips rendering that
//! frame.
//!
//! ## Saturation
//!
//! At most `max_steps_per_frame` steps run per call. When the cap is hit the backlog stays in
//! the remainder and is drained on later frames. The simulation visibly lags but keeps going.

use log::{debug, warn};

/// Source of monotonic time in integer ticks.
pub trait PerformanceCounter {
    /// Ticks per second.
    fn frequency(&self) -> u64;

    /// Current tick count.
    fn now(&self) -> u64;
}

/// Wall clock backed by `web_time::Instant`, counting nanoseconds.
pub struct SystemPerformanceCounter {
    origin: web_time::Instant,
}

impl SystemPerformanceCounter {
    /// Starts counting from now.
    pub fn new() -> Self {
        Self {
            origin: web_time::Instant::now(),
        }
    }
}

impl Default for SystemPerformanceCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceCounter for SystemPerformanceCounter {
    fn frequency(&self) -> u64 {
        1_000_000_000
    }

    fn now(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Counter that only moves when told to.
#[derive(Clone, Debug)]
pub struct ManualPerformanceCounter {
    frequency: u64,
    now: u64,
}

impl ManualPerformanceCounter {
    /// Creates a counter at zero.
    pub fn new(frequency: u64) -> Self {
        Self { frequency, now: 0 }
    }

    /// Moves the counter forward.
    pub fn advance(&mut self, ticks: u64) {
        self.now += ticks;
    }

    /// Sets the counter to an absolute value.
    pub fn set(&mut self, now: u64) {
        self.now = now;
    }
}

impl PerformanceCounter for ManualPerformanceCounter {
    fn frequency(&self) -> u64 {
        self.frequency
    }

    fn now(&self) -> u64 {
        self.now
    }
}

/// What happened during one call to [`SimulationClock::tick`] after priming.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameTiming {
    /// Fixed steps run during this call.
    pub fixed_steps: u32,
    /// Progress from the last completed fixed step towards the next, in `[0, 1]`.
    pub interpolation: f64,
    /// Seconds since the previous call.
    pub variable_delta: f64,
    /// Whether the step cap cut draining short.
    pub saturated: bool,
    /// `false` when rendering lags behind the next step boundary and interpolation was
    /// clamped to 1.
    pub interpolation_possible: bool,
}

impl FrameTiming {
    /// At most one fixed step was needed to catch up.
    pub fn is_performance_optimal(&self) -> bool {
        self.fixed_steps <= 1
    }
}

/// Result of [`SimulationClock::tick`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClockTick {
    /// First call; the clock was primed and nothing should be rendered.
    Primed,
    /// Steady state.
    Stepped(FrameTiming),
}

/// Fixed/variable timestep clock state.
pub struct SimulationClock {
    fixed_steps_per_second: u32,
    max_steps_per_frame: u32,
    primed: bool,
    frequency: u64,
    ticks_per_fixed_step: u64,
    last_counter: u64,
    fixed_step_counter: u64,
    remainder: u64,
    current_tick: u64,
    interpolation: f64,
}

impl SimulationClock {
    /// Creates an unprimed clock.
    ///
    /// # Arguments
    /// * `fixed_steps_per_second` - Rate of the fixed step, must be positive
    /// * `max_steps_per_frame` - Cap on steps drained per call, must be positive
    pub fn new(fixed_steps_per_second: u32, max_steps_per_frame: u32) -> Self {
        assert!(
            fixed_steps_per_second > 0,
            "fixed_steps_per_second must be positive"
        );
        assert!(max_steps_per_frame > 0, "max_steps_per_frame must be positive");

        Self {
            fixed_steps_per_second,
            max_steps_per_frame,
            primed: false,
            frequency: 0,
            ticks_per_fixed_step: 0,
            last_counter: 0,
            fixed_step_counter: 0,
            remainder: 0,
            current_tick: 0,
            interpolation: 0.0,
        }
    }

    /// Advances the clock to `counter.now()`.
    ///
    /// `on_fixed_step` runs once per drained step and always receives the constant
    /// [`SimulationClock::fixed_delta`].
    pub fn tick<C, F>(&mut self, counter: &C, mut on_fixed_step: F) -> ClockTick
    where
        C: PerformanceCounter + ?Sized,
        F: FnMut(f64),
    {
        let now = counter.now();

        if !self.primed {
            self.frequency = counter.frequency();
            self.ticks_per_fixed_step = self.frequency / self.fixed_steps_per_second as u64;
            assert!(
                self.ticks_per_fixed_step > 0,
                "counter frequency {} is below the fixed step rate {}",
                self.frequency,
                self.fixed_steps_per_second
            );
            self.last_counter = now;
            self.fixed_step_counter = now;
            self.primed = true;
            return ClockTick::Primed;
        }

        let elapsed = now.saturating_sub(self.last_counter);
        self.last_counter = now;
        self.remainder += elapsed;

        let fixed_delta = self.fixed_delta();
        let mut fixed_steps = 0;
        let mut saturated = false;
        while self.remainder >= self.ticks_per_fixed_step {
            if fixed_steps == self.max_steps_per_frame {
                saturated = true;
                break;
            }
            on_fixed_step(fixed_delta);
            self.fixed_step_counter += self.ticks_per_fixed_step;
            self.remainder -= self.ticks_per_fixed_step;
            self.current_tick += 1;
            fixed_steps += 1;
        }

        if saturated {
            warn!(
                "Fixed step saturated after {} steps; carrying {} counter ticks ({} steps) forward",
                fixed_steps,
                self.remainder,
                self.remainder / self.ticks_per_fixed_step
            );
        }

        let next_boundary = self.fixed_step_counter + self.ticks_per_fixed_step;
        let interpolation_possible = now < next_boundary;
        self.interpolation = if interpolation_possible {
            1.0 - (next_boundary - now) as f64 / self.ticks_per_fixed_step as f64
        } else {
            debug!("Interpolation not possible at tick {}", self.current_tick);
            1.0
        };

        ClockTick::Stepped(FrameTiming {
            fixed_steps,
            interpolation: self.interpolation,
            variable_delta: elapsed as f64 / self.frequency as f64,
            saturated,
            interpolation_possible,
        })
    }

    /// Whether the first tick happened.
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Seconds simulated by one fixed step.
    pub fn fixed_delta(&self) -> f64 {
        1.0 / self.fixed_steps_per_second as f64
    }

    /// Counter ticks not yet consumed by a fixed step.
    pub fn remainder(&self) -> u64 {
        self.remainder
    }

    /// Fixed steps run since priming.
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Counter frequency captured when priming.
    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    /// Counter ticks per fixed step, zero before priming.
    pub fn ticks_per_fixed_step(&self) -> u64 {
        self.ticks_per_fixed_step
    }

    /// Interpolation factor from the last tick.
    pub fn interpolation(&self) -> f64 {
        self.interpolation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100 counter ticks per fixed step.
    fn primed_clock(max_steps: u32) -> (SimulationClock, ManualPerformanceCounter) {
        let mut clock = SimulationClock::new(10, max_steps);
        let counter = ManualPerformanceCounter::new(1000);
        assert_eq!(clock.tick(&counter, |_| panic!("primed frames never step")), ClockTick::Primed);
        assert_eq!(clock.ticks_per_fixed_step(), 100);
        (clock, counter)
    }

    fn stepped(tick: ClockTick) -> FrameTiming {
        match tick {
            ClockTick::Stepped(timing) => timing,
            ClockTick::Primed => panic!("clock was already primed"),
        }
    }

    #[test]
    fn drains_whole_steps_and_keeps_the_remainder() {
        let (mut clock, mut counter) = primed_clock(10);
        counter.advance(250);

        let mut deltas = Vec::new();
        let timing = stepped(clock.tick(&counter, |dt| deltas.push(dt)));

        assert_eq!(timing.fixed_steps, 2);
        assert_eq!(deltas, vec![0.1, 0.1]);
        assert_eq!(clock.remainder(), 50);
        assert_eq!(clock.current_tick(), 2);
        assert!((timing.interpolation - 0.5).abs() < 1e-9);
        assert!((timing.variable_delta - 0.25).abs() < 1e-9);
        assert!(!timing.is_performance_optimal());
    }

    #[test]
    fn caps_steps_per_call_and_carries_the_backlog() {
        let (mut clock, mut counter) = primed_clock(10);
        counter.advance(5000);

        let mut steps = 0;
        let timing = stepped(clock.tick(&counter, |_| steps += 1));

        assert_eq!(steps, 10);
        assert!(timing.saturated);
        assert_eq!(clock.remainder(), 4000);
        assert!(!timing.interpolation_possible);
        assert_eq!(timing.interpolation, 1.0);

        let timing = stepped(clock.tick(&counter, |_| steps += 1));
        assert_eq!(steps, 20);
        assert_eq!(clock.remainder(), 3000);
        assert!(timing.saturated);
    }

    #[test]
    fn interpolation_tracks_progress_between_boundaries() {
        let (mut clock, mut counter) = primed_clock(10);

        counter.set(301);
        let just_after = stepped(clock.tick(&counter, |_| {}));
        assert!(just_after.interpolation_possible);
        assert!(just_after.interpolation < 0.05);

        counter.set(399);
        let just_before = stepped(clock.tick(&counter, |_| {}));
        assert_eq!(just_before.fixed_steps, 0);
        assert!(just_before.interpolation > 0.95);
        assert!(just_before.interpolation < 1.0);
        assert!(just_before.is_performance_optimal());

        for now in (400..2000).step_by(37) {
            counter.set(now);
            let timing = stepped(clock.tick(&counter, |_| {}));
            assert!((0.0..=1.0).contains(&timing.interpolation));
            assert!(clock.remainder() < clock.ticks_per_fixed_step());
        }
    }

    #[test]
    fn system_counter_is_monotonic() {
        let counter = SystemPerformanceCounter::new();
        let first = counter.now();
        assert!(counter.now() >= first);
        assert_eq!(counter.frequency(), 1_000_000_000);
    }

    #[test]
    #[should_panic(expected = "fixed_steps_per_second must be positive")]
    fn zero_rate_is_rejected() {
        SimulationClock::new(0, 10);
    }
}
