//! Controller runner - main entry point for the operator loop.
//!
//! Drives the mode controller with the quiz solver, records each outcome and
//! keeps going after any single cycle fails, including panics.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::automation::collaborators::SignalSource;
use crate::automation::config::QuizConfig;
use crate::automation::cycle::{CycleOutcome, QuizSolver};
use crate::automation::history::append_outcome;
use crate::automation::state::{ModeController, RunMode};

/// Runs `cycle`, turning a panic into `None` so the controller survives.
pub fn guard_cycle<F: FnOnce() -> CycleOutcome>(cycle: F) -> Option<CycleOutcome> {
    match panic::catch_unwind(AssertUnwindSafe(cycle)) {
        Ok(outcome) => Some(outcome),
        Err(payload) => {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            crate::log(&format!("Unexpected error in solve cycle: {}", msg));
            None
        }
    }
}

/// Runs the operator loop until the stop key is pressed while idle.
///
/// Outcomes are appended to `history_path` when given; write failures are
/// logged and ignored.
pub fn run_controller(
    config: &QuizConfig,
    signals: &dyn SignalSource,
    solver: &QuizSolver,
    history_path: Option<&Path>,
) {
    let mut controller = ModeController::new(signals, config);

    let mut solve = |mode: RunMode| {
        let Some(outcome) = guard_cycle(|| solver.solve()) else {
            return;
        };

        if let Some(path) = history_path {
            if let Err(e) = append_outcome(path, mode.as_str(), &outcome) {
                crate::log(&format!("Warning: failed to record history: {}", e));
            }
        }
    };

    controller.run(&mut solve);

    crate::log(&format!(
        "Controller stopped after {} cycle(s)",
        controller.cycles_run
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;
    use std::cell::Cell;

    use crate::automation::buttons::tests::{RecordingPointer, ScriptedLocator};
    use crate::automation::buttons::{QuizButtons, TemplateButton};
    use crate::automation::collaborators::Signal;
    use crate::automation::cycle::tests::{
        fast_config, quiz_regions, FakeCapture, FakeDecision, FakeRecognizer,
    };
    use crate::automation::history::init_history;

    /// Presses run-once once, then stop once the first capture happened.
    struct OnceThenStop<'a> {
        captures: &'a Cell<u32>,
        run_once_sent: Cell<bool>,
        stop_sent: Cell<bool>,
    }

    impl SignalSource for OnceThenStop<'_> {
        fn is_active(&self, signal: Signal) -> bool {
            match signal {
                Signal::RunOnce if !self.run_once_sent.get() => {
                    self.run_once_sent.set(true);
                    true
                }
                Signal::Stop if self.captures.get() > 0 && !self.stop_sent.get() => {
                    self.stop_sent.set(true);
                    true
                }
                _ => false,
            }
        }
    }

    #[test]
    fn test_guard_cycle_passes_outcome() {
        assert_eq!(guard_cycle(|| CycleOutcome::NoText), Some(CycleOutcome::NoText));
    }

    #[test]
    fn test_guard_cycle_catches_panic() {
        let result = guard_cycle(|| panic!("ocr engine crashed"));
        assert_eq!(result, None);
    }

    #[test]
    fn test_run_controller_records_history() {
        let config = QuizConfig {
            poll_interval_ms: 1,
            slice_ms: 1,
            ..fast_config()
        };
        let capture = FakeCapture {
            fail: true,
            calls: Cell::new(0),
        };
        let recognizer = FakeRecognizer {
            regions: quiz_regions(),
            calls: Cell::new(0),
        };
        let decision = FakeDecision {
            reply: Ok("A. Hanoi".to_string()),
            prompts: Default::default(),
        };
        let locator = ScriptedLocator::new(vec![]);
        let pointer = RecordingPointer::default();
        let buttons = QuizButtons {
            show_question: TemplateButton::new("Show Question button", GrayImage::new(2, 2)),
            check_answer: TemplateButton::missing("Check Answer button"),
            next_page: TemplateButton::missing("Next Page button"),
        };
        let solver = QuizSolver {
            config: &config,
            capture: &capture,
            recognizer: &recognizer,
            decision: &decision,
            locator: &locator,
            pointer: &pointer,
            buttons: &buttons,
            capture_dir: None,
        };
        let signals = OnceThenStop {
            captures: &capture.calls,
            run_once_sent: Cell::new(false),
            stop_sent: Cell::new(false),
        };

        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history.csv");
        init_history(&history).unwrap();

        run_controller(&config, &signals, &solver, Some(&history));

        assert_eq!(capture.calls.get(), 1);
        assert_eq!(recognizer.calls.get(), 0);
        let content = std::fs::read_to_string(&history).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(",once,capture_failed,"));
    }
}
