//! Capabilities the solve cycle and controller consume.
//!
//! Concrete implementations live in `capture`, `ocr`, `llm`, `template` and
//! `input`; tests substitute recorders.

use anyhow::Result;
use image::{GrayImage, RgbaImage};

use super::regions::{Point, TextRegionIndex};

/// Grabs the current screen contents.
pub trait ScreenCapture {
    fn capture(&self) -> Result<RgbaImage>;
}

/// Converts a capture into located text regions.
pub trait TextRecognizer {
    fn recognize(&self, image: &RgbaImage) -> Result<TextRegionIndex>;
}

/// Text-in/text-out completion service that picks the answer.
pub trait DecisionMaker {
    /// Liveness check run once before the control loop starts.
    fn probe(&self) -> Result<()>;

    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Finds a reference image on the current screen.
pub trait TemplateLocator {
    /// Returns the center of the best hit whose score reaches `confidence`.
    fn locate_on_screen(&self, template: &GrayImage, confidence: f32) -> Result<Option<Point>>;
}

/// Pointer movement and clicks in screen coordinates.
pub trait Pointer {
    fn move_to(&self, x: i32, y: i32) -> Result<()>;

    /// Left click at the current pointer position.
    fn click(&self) -> Result<()>;
}

/// Operator signals polled by the mode controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    Stop,
    RunOnce,
    RunLoop,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Stop => write!(f, "stop"),
            Signal::RunOnce => write!(f, "run once"),
            Signal::RunLoop => write!(f, "run loop"),
        }
    }
}

/// Non-blocking operator input.
pub trait SignalSource {
    fn is_active(&self, signal: Signal) -> bool;
}
