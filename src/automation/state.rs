//! Operator-driven mode controller.
//!
//! A polling state machine: Idle → {RunningOnce, RunningLoop} → Idle, and
//! RunningLoop → Stopping → Idle. The stop signal is checked in every state,
//! including while a run key is being debounced, and wins over the others.
//! All waits are sliced so a stop is seen within one slice.

use std::time::{Duration, Instant};

use crate::automation::collaborators::{Signal, SignalSource};
use crate::automation::config::QuizConfig;

/// Controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Polling operator signals
    Idle,
    /// Running exactly one solve cycle
    RunningOnce,
    /// Running cycles until stopped
    RunningLoop,
    /// Loop stopped; waiting for the stop key to be released
    Stopping,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Idle => write!(f, "Idle"),
            ControllerState::RunningOnce => write!(f, "Running once"),
            ControllerState::RunningLoop => write!(f, "Running loop"),
            ControllerState::Stopping => write!(f, "Stopping"),
        }
    }
}

/// Which mode triggered a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Loop,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Once => "once",
            RunMode::Loop => "loop",
        }
    }
}

/// Mode controller holding the current state and timing.
pub struct ModeController<'a> {
    /// Current state
    pub state: ControllerState,
    signals: &'a dyn SignalSource,
    poll_interval: Duration,
    slice: Duration,
    loop_delay: Duration,
    /// Cycles started since creation
    pub cycles_run: u32,
}

impl<'a> ModeController<'a> {
    pub fn new(signals: &'a dyn SignalSource, config: &QuizConfig) -> Self {
        Self {
            state: ControllerState::Idle,
            signals,
            poll_interval: config.poll_interval(),
            slice: config.slice(),
            loop_delay: config.loop_delay(),
            cycles_run: 0,
        }
    }

    /// Advances the state machine by one step.
    ///
    /// Returns `false` when the operator asked to quit from Idle.
    pub fn step(&mut self, solve: &mut dyn FnMut(RunMode)) -> bool {
        match self.state {
            ControllerState::Idle => {
                if self.signals.is_active(Signal::Stop) {
                    crate::log("Exiting...");
                    self.wait_for_release(Signal::Stop);
                    return false;
                }

                if self.signals.is_active(Signal::RunOnce) {
                    if self.wait_for_release(Signal::RunOnce) {
                        crate::log("Manual trigger cancelled.");
                        self.wait_for_release(Signal::Stop);
                        return true;
                    }
                    crate::log(">>> [Manual] single question triggered");
                    self.state = ControllerState::RunningOnce;
                    return true;
                }

                if self.signals.is_active(Signal::RunLoop) {
                    if self.wait_for_release(Signal::RunLoop) {
                        crate::log("Auto mode cancelled.");
                        self.wait_for_release(Signal::Stop);
                        return true;
                    }
                    crate::log(">>> [AUTO MODE] started. Press stop to end.");
                    self.state = ControllerState::RunningLoop;
                    return true;
                }

                std::thread::sleep(self.poll_interval);
                true
            }

            ControllerState::RunningOnce => {
                if self.signals.is_active(Signal::Stop) {
                    crate::log("Manual sequence cancelled.");
                    self.wait_for_release(Signal::Stop);
                    self.state = ControllerState::Idle;
                    return true;
                }

                self.cycles_run += 1;
                solve(RunMode::Once);
                crate::log("Manual sequence finished.");
                self.state = ControllerState::Idle;
                true
            }

            ControllerState::RunningLoop => {
                if self.signals.is_active(Signal::Stop) {
                    self.state = ControllerState::Stopping;
                    return true;
                }

                self.cycles_run += 1;
                solve(RunMode::Loop);

                crate::log(&format!(
                    "Waiting {:.1}s for next question...",
                    self.loop_delay.as_secs_f32()
                ));
                if self.interruptible_wait(self.loop_delay) {
                    self.state = ControllerState::Stopping;
                }
                true
            }

            ControllerState::Stopping => {
                crate::log(">>> [AUTO MODE] stopped by user.");
                self.wait_for_release(Signal::Stop);
                self.state = ControllerState::Idle;
                true
            }
        }
    }

    /// Steps until the operator quits.
    pub fn run(&mut self, solve: &mut dyn FnMut(RunMode)) {
        while self.step(solve) {}
    }

    /// Blocks until `signal` is released (debounce).
    ///
    /// Returns true if stop went down while a run key was held.
    fn wait_for_release(&self, signal: Signal) -> bool {
        let mut stopped = false;
        while self.signals.is_active(signal) {
            if signal != Signal::Stop && self.signals.is_active(Signal::Stop) {
                stopped = true;
            }
            std::thread::sleep(self.slice);
        }
        stopped
    }

    /// Sleeps up to `total` in slices. Returns true if stop was signaled.
    fn interruptible_wait(&self, total: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.signals.is_active(Signal::Stop) {
                return true;
            }
            let elapsed = start.elapsed();
            if elapsed >= total {
                return false;
            }
            std::thread::sleep(self.slice.min(total - elapsed));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// Each press keeps a signal active for a number of polls, then releases.
    #[derive(Default)]
    pub(crate) struct ScriptedSignals {
        remaining: RefCell<HashMap<Signal, u32>>,
    }

    impl ScriptedSignals {
        pub(crate) fn press(&self, signal: Signal, polls: u32) {
            self.remaining.borrow_mut().insert(signal, polls);
        }
    }

    impl SignalSource for ScriptedSignals {
        fn is_active(&self, signal: Signal) -> bool {
            let mut remaining = self.remaining.borrow_mut();
            match remaining.get_mut(&signal) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            }
        }
    }

    fn config(loop_delay_ms: u64) -> QuizConfig {
        QuizConfig {
            poll_interval_ms: 1,
            slice_ms: 10,
            loop_delay_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(format!("{}", ControllerState::Idle), "Idle");
        assert_eq!(format!("{}", ControllerState::RunningLoop), "Running loop");
    }

    #[test]
    fn test_idle_without_signals_stays_idle() {
        let signals = ScriptedSignals::default();
        let mut controller = ModeController::new(&signals, &config(0));
        let mut runs = 0;

        for _ in 0..5 {
            assert!(controller.step(&mut |_| runs += 1));
        }
        assert_eq!(controller.state, ControllerState::Idle);
        assert_eq!(runs, 0);
    }

    #[test]
    fn test_run_once_executes_exactly_one_cycle() {
        let signals = ScriptedSignals::default();
        signals.press(Signal::RunOnce, 3);
        let mut controller = ModeController::new(&signals, &config(0));
        let mut modes = Vec::new();

        assert!(controller.step(&mut |m| modes.push(m)));
        assert_eq!(controller.state, ControllerState::RunningOnce);
        // Key was held: debounce consumed the remaining presses
        assert!(!signals.is_active(Signal::RunOnce));

        assert!(controller.step(&mut |m| modes.push(m)));
        assert_eq!(controller.state, ControllerState::Idle);

        for _ in 0..3 {
            controller.step(&mut |m| modes.push(m));
        }
        assert_eq!(modes, vec![RunMode::Once]);
        assert_eq!(controller.cycles_run, 1);
    }

    #[test]
    fn test_stop_in_idle_quits() {
        let signals = ScriptedSignals::default();
        signals.press(Signal::Stop, 2);
        let mut controller = ModeController::new(&signals, &config(0));

        assert!(!controller.step(&mut |_| {}));
    }

    #[test]
    fn test_stop_takes_precedence_in_idle() {
        let signals = ScriptedSignals::default();
        signals.press(Signal::RunOnce, 1);
        signals.press(Signal::Stop, 1);
        let mut controller = ModeController::new(&signals, &config(0));
        let mut runs = 0;

        assert!(!controller.step(&mut |_| runs += 1));
        assert_eq!(runs, 0);
    }

    #[test]
    fn test_loop_repeats_until_stopped() {
        let signals = ScriptedSignals::default();
        signals.press(Signal::RunLoop, 1);
        let mut controller = ModeController::new(&signals, &config(0));
        let mut runs = 0;

        controller.step(&mut |_| {});
        assert_eq!(controller.state, ControllerState::RunningLoop);

        for _ in 0..3 {
            controller.step(&mut |_| runs += 1);
            assert_eq!(controller.state, ControllerState::RunningLoop);
        }
        assert_eq!(runs, 3);

        signals.press(Signal::Stop, 1);
        controller.step(&mut |_| runs += 1);
        assert_eq!(controller.state, ControllerState::Stopping);
        assert_eq!(runs, 3);

        controller.step(&mut |_| runs += 1);
        assert_eq!(controller.state, ControllerState::Idle);
    }

    #[test]
    fn test_stop_during_delay_exits_within_a_slice() {
        let signals = ScriptedSignals::default();
        signals.press(Signal::RunLoop, 2);
        // 10s delay, 10ms slices
        let mut controller = ModeController::new(&signals, &config(10_000));
        let mut runs = 0;

        controller.step(&mut |_| {});
        assert_eq!(controller.state, ControllerState::RunningLoop);

        // Stop is pressed while the cycle runs, so the delay sees it
        let started = Instant::now();
        controller.step(&mut |_| {
            runs += 1;
            signals.press(Signal::Stop, 3);
        });
        let elapsed = started.elapsed();

        assert_eq!(controller.state, ControllerState::Stopping);
        assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);

        controller.step(&mut |_| runs += 1);
        assert_eq!(controller.state, ControllerState::Idle);
        // Stop was debounced: idle does not quit on the same press
        assert!(controller.step(&mut |_| runs += 1));
        assert_eq!(runs, 1);
    }

    #[test]
    fn test_stop_before_cycle_skips_cycle() {
        let signals = ScriptedSignals::default();
        let mut controller = ModeController::new(&signals, &config(0));
        controller.state = ControllerState::RunningLoop;
        signals.press(Signal::Stop, 1);
        let mut runs = 0;

        controller.step(&mut |_| runs += 1);
        assert_eq!(runs, 0);
        assert_eq!(controller.state, ControllerState::Stopping);
    }

    #[test]
    fn test_stop_in_running_once_returns_to_idle() {
        let signals = ScriptedSignals::default();
        let mut controller = ModeController::new(&signals, &config(0));
        controller.state = ControllerState::RunningOnce;
        signals.press(Signal::Stop, 2);
        let mut runs = 0;

        assert!(controller.step(&mut |_| runs += 1));
        assert_eq!(controller.state, ControllerState::Idle);
        assert_eq!(runs, 0);
        // The press was debounced, so Idle does not quit on it
        assert!(controller.step(&mut |_| runs += 1));
        assert_eq!(runs, 0);
    }

    /// Holds a run key and presses stop on its second poll.
    struct StopWhileHeld {
        inner: ScriptedSignals,
        run: Signal,
        run_polls: Cell<u32>,
    }

    impl StopWhileHeld {
        fn new(run: Signal) -> Self {
            let inner = ScriptedSignals::default();
            inner.press(run, 4);
            Self {
                inner,
                run,
                run_polls: Cell::new(0),
            }
        }
    }

    impl SignalSource for StopWhileHeld {
        fn is_active(&self, signal: Signal) -> bool {
            if signal == self.run {
                self.run_polls.set(self.run_polls.get() + 1);
                if self.run_polls.get() == 2 {
                    self.inner.press(Signal::Stop, 2);
                }
            }
            self.inner.is_active(signal)
        }
    }

    #[test]
    fn test_stop_while_run_key_held_cancels_run() {
        for run in [Signal::RunOnce, Signal::RunLoop] {
            let signals = StopWhileHeld::new(run);
            let mut controller = ModeController::new(&signals, &config(0));
            let mut runs = 0;

            assert!(controller.step(&mut |_| runs += 1));
            assert_eq!(controller.state, ControllerState::Idle, "{:?}", run);

            for _ in 0..3 {
                assert!(controller.step(&mut |_| runs += 1));
            }
            assert_eq!(runs, 0, "{:?}", run);
            assert_eq!(controller.cycles_run, 0);
        }
    }

    #[test]
    fn test_run_until_quit() {
        let signals = ScriptedSignals::default();
        signals.press(Signal::RunOnce, 1);
        let mut controller = ModeController::new(&signals, &config(0));
        let mut runs = 0;

        controller.run(&mut |_| {
            runs += 1;
            signals.press(Signal::Stop, 1);
        });

        // One cycle, then the stop press ends the run from Idle
        assert_eq!(runs, 1);
        assert_eq!(controller.state, ControllerState::Idle);
    }
}
