//! Quiz automation core.
//!
//! This module provides:
//! - Located OCR text and the fuzzy answer locator
//! - Template button clicks with bounded retries
//! - The solve cycle (reveal, capture, recognize, decide, click)
//! - The operator-driven mode controller and its runner
//! - Configuration and answer history

pub mod buttons;
pub mod collaborators;
pub mod config;
pub mod cycle;
pub mod fuzzy;
pub mod history;
pub mod locator;
pub mod regions;
pub mod runner;
pub mod state;

pub use buttons::QuizButtons;
pub use collaborators::{
    DecisionMaker, Pointer, ScreenCapture, Signal, SignalSource, TemplateLocator, TextRecognizer,
};
pub use config::{load_config, QuizConfig};
pub use cycle::{CycleOutcome, QuizSolver};
pub use regions::{LocatedText, Quad, TextRegionIndex};
pub use runner::run_controller;
