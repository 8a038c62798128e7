//! One quiz solve cycle: reveal, capture, recognize, decide, locate, click.
//!
//! The sequence never branches back. Every failure ends the cycle with a
//! `CycleOutcome`; nothing escapes to the controller.

use anyhow::Result;
use chrono::Local;
use image::RgbaImage;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use super::buttons::{find_and_click, QuizButtons, TemplateButton};
use super::collaborators::{DecisionMaker, Pointer, ScreenCapture, TemplateLocator, TextRecognizer};
use super::config::QuizConfig;
use super::locator::{locate, MatchResult};
use super::regions::Point;

/// Quote and emphasis markup models wrap answers in.
const MARKUP_PATTERN: &str = r#"\*\*|["'`“”‘’]"#;

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Answer clicked (confirm/advance buttons are best-effort)
    Answered {
        answer: String,
        matched_text: String,
        score: u8,
        point: Point,
    },
    /// No region scored above the threshold; nothing was clicked
    AnswerNotFound { answer: String, best: MatchResult },
    /// OCR returned no text
    NoText,
    CaptureFailed(String),
    RecognitionFailed(String),
    DecisionFailed(String),
    ClickFailed(String),
}

impl CycleOutcome {
    /// Short machine-friendly label, used in the history file.
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Answered { .. } => "answered",
            CycleOutcome::AnswerNotFound { .. } => "not_found",
            CycleOutcome::NoText => "no_text",
            CycleOutcome::CaptureFailed(_) => "capture_failed",
            CycleOutcome::RecognitionFailed(_) => "ocr_failed",
            CycleOutcome::DecisionFailed(_) => "decision_failed",
            CycleOutcome::ClickFailed(_) => "click_failed",
        }
    }
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleOutcome::Answered {
                answer,
                score,
                point,
                ..
            } => write!(
                f,
                "Answered '{}' (score {}) at ({}, {})",
                answer, score, point.0, point.1
            ),
            CycleOutcome::AnswerNotFound { answer, best } => write!(
                f,
                "Answer '{}' not found (best '{}', score {})",
                answer, best.matched_text, best.score
            ),
            CycleOutcome::NoText => write!(f, "No text detected"),
            CycleOutcome::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            CycleOutcome::RecognitionFailed(msg) => write!(f, "OCR failed: {}", msg),
            CycleOutcome::DecisionFailed(msg) => write!(f, "Decision failed: {}", msg),
            CycleOutcome::ClickFailed(msg) => write!(f, "Click failed: {}", msg),
        }
    }
}

static MARKUP: OnceLock<Option<Regex>> = OnceLock::new();

/// Compiled once; `None` only if the constant pattern were invalid.
fn markup() -> Option<&'static Regex> {
    MARKUP
        .get_or_init(|| Regex::new(MARKUP_PATTERN).ok())
        .as_ref()
}

/// Removes quote/emphasis markup and surrounding whitespace from a reply.
pub fn clean_answer(raw: &str) -> String {
    match markup() {
        Some(markup) => markup.replace_all(raw.trim(), "").trim().to_string(),
        None => raw.trim().to_string(),
    }
}

/// Everything one cycle needs, borrowed for the process lifetime.
pub struct QuizSolver<'a> {
    pub config: &'a QuizConfig,
    pub capture: &'a dyn ScreenCapture,
    pub recognizer: &'a dyn TextRecognizer,
    pub decision: &'a dyn DecisionMaker,
    pub locator: &'a dyn TemplateLocator,
    pub pointer: &'a dyn Pointer,
    pub buttons: &'a QuizButtons,
    /// Where to save captures, if enabled
    pub capture_dir: Option<PathBuf>,
}

impl QuizSolver<'_> {
    /// Runs one full attempt and reports how it ended.
    pub fn solve(&self) -> CycleOutcome {
        let start = Instant::now();
        let outcome = self.run_steps();
        crate::log(&format!(
            "Cycle finished in {:.1}s: {}",
            start.elapsed().as_secs_f32(),
            outcome
        ));
        outcome
    }

    fn run_steps(&self) -> CycleOutcome {
        // 1. Reveal the question if the button is there
        if self.click_button(&self.buttons.show_question) {
            std::thread::sleep(Duration::from_millis(self.config.reveal_settle_ms));
        }

        // 2. Capture
        crate::log("Capturing screen...");
        let screenshot = match self.capture.capture() {
            Ok(img) => img,
            Err(e) => {
                crate::log(&format!("Screenshot failed: {}", e));
                return CycleOutcome::CaptureFailed(e.to_string());
            }
        };
        self.save_capture(&screenshot);

        // 3. OCR
        crate::log("Reading text (OCR)...");
        let index = match self.recognizer.recognize(&screenshot) {
            Ok(index) => index,
            Err(e) => {
                crate::log(&format!("OCR failed: {}", e));
                return CycleOutcome::RecognitionFailed(e.to_string());
            }
        };

        let screen_text = index.full_text();
        if screen_text.is_empty() {
            crate::log("No text detected on screen.");
            return CycleOutcome::NoText;
        }
        crate::log(&format!(
            "Screen content ({} regions):\n{}",
            index.len(),
            screen_text
        ));

        // 4. Ask the decision-maker
        crate::log(&format!("Sending to decision-maker ({})...", self.config.model));
        let prompt = self.config.build_prompt(&screen_text);
        let answer = match self
            .decision
            .complete(&prompt)
            .map(|reply| clean_answer(&reply))
        {
            Ok(answer) => answer,
            Err(e) => {
                crate::log(&format!("Decision-maker error: {}", e));
                return CycleOutcome::DecisionFailed(e.to_string());
            }
        };
        crate::log(&format!("=== ANSWER: {} ===", answer));

        // 5. Locate against the same OCR pass
        let result = locate(&answer, &index, self.config.match_threshold);
        let Some((x, y)) = result.point else {
            crate::log(&format!("Could not locate answer '{}' on screen.", answer));
            return CycleOutcome::AnswerNotFound {
                answer,
                best: result,
            };
        };

        // 6. Click answer, then confirm and advance
        crate::log(&format!("Clicking answer at ({}, {})...", x, y));
        if let Err(e) = self.pointer.move_to(x, y).and_then(|_| self.pointer.click()) {
            crate::log(&format!("Failed to click answer: {}", e));
            return CycleOutcome::ClickFailed(e.to_string());
        }

        std::thread::sleep(Duration::from_millis(self.config.confirm_delay_ms));
        self.click_button(&self.buttons.check_answer);

        std::thread::sleep(Duration::from_millis(self.config.advance_delay_ms));
        self.click_button(&self.buttons.next_page);

        CycleOutcome::Answered {
            answer,
            matched_text: result.matched_text,
            score: result.score,
            point: (x, y),
        }
    }

    fn click_button(&self, button: &TemplateButton) -> bool {
        find_and_click(
            self.locator,
            self.pointer,
            button,
            self.config.template_confidence,
            self.config.template_retries,
            self.config.retry_interval(),
        )
    }

    fn save_capture(&self, screenshot: &RgbaImage) {
        let Some(dir) = &self.capture_dir else {
            return;
        };
        let filename = format!("{}.png", Local::now().format("%Y%m%d_%H%M%S_%3f"));
        let path = dir.join(filename);
        match screenshot.save(&path) {
            Ok(()) => crate::log(&format!("Capture saved to {}", path.display())),
            Err(e) => crate::log(&format!("Warning: failed to save capture: {}", e)),
        }
    }
}
