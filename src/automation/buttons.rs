//! Optional on-screen buttons found by template matching.
//!
//! A missing button is normal (the question may already be visible, the
//! quiz may have no "next" page), so every lookup reports a plain bool.

use image::GrayImage;
use std::path::Path;
use std::time::Duration;

use super::collaborators::{Pointer, TemplateLocator};
use super::config::QuizConfig;

/// A reference image plus a human-readable name for logs.
#[derive(Clone, Debug)]
pub struct TemplateButton {
    pub description: String,
    /// `None` when the image could not be loaded; never found
    pub image: Option<GrayImage>,
}

impl TemplateButton {
    pub fn new(description: impl Into<String>, image: GrayImage) -> Self {
        Self {
            description: description.into(),
            image: Some(image),
        }
    }

    /// A button whose image is unavailable.
    pub fn missing(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            image: None,
        }
    }

    /// Loads the image as grayscale. Load failures are logged, not returned.
    pub fn load(description: &str, path: &Path) -> Self {
        match image::open(path) {
            Ok(img) => {
                crate::log(&format!(
                    "Loaded {} template from {} ({}x{})",
                    description,
                    path.display(),
                    img.width(),
                    img.height()
                ));
                Self::new(description, img.to_luma8())
            }
            Err(e) => {
                crate::log(&format!(
                    "Warning: could not load {} template from {}: {}",
                    description,
                    path.display(),
                    e
                ));
                Self::missing(description)
            }
        }
    }
}

/// The three buttons used by the solve cycle.
#[derive(Clone, Debug)]
pub struct QuizButtons {
    pub show_question: TemplateButton,
    pub check_answer: TemplateButton,
    pub next_page: TemplateButton,
}

impl QuizButtons {
    /// Loads all templates named in the config, relative to `base_dir`.
    pub fn load(config: &QuizConfig, base_dir: &Path) -> Self {
        let paths = &config.templates;
        Self {
            show_question: TemplateButton::load(
                "Show Question button",
                &QuizConfig::resolve_path(base_dir, &paths.show_question),
            ),
            check_answer: TemplateButton::load(
                "Check Answer button",
                &QuizConfig::resolve_path(base_dir, &paths.check_answer),
            ),
            next_page: TemplateButton::load(
                "Next Page button",
                &QuizConfig::resolve_path(base_dir, &paths.next_page),
            ),
        }
    }
}

/// Looks for `button` up to `max_retries + 1` times and clicks its center.
///
/// Returns true once clicked. Lookup and click errors are logged and count
/// as "not found".
pub fn find_and_click(
    locator: &dyn TemplateLocator,
    pointer: &dyn Pointer,
    button: &TemplateButton,
    confidence: f32,
    max_retries: u32,
    retry_interval: Duration,
) -> bool {
    crate::log(&format!("Looking for {}...", button.description));

    let Some(template) = &button.image else {
        crate::log(&format!(
            "No template image for {}, skipping",
            button.description
        ));
        return false;
    };

    for attempt in 0..=max_retries {
        match locator.locate_on_screen(template, confidence) {
            Ok(Some((x, y))) => {
                crate::log(&format!(
                    "Found {} at ({}, {}). Clicking...",
                    button.description, x, y
                ));
                let clicked = pointer.move_to(x, y).and_then(|_| pointer.click());
                return match clicked {
                    Ok(()) => true,
                    Err(e) => {
                        crate::log(&format!(
                            "Failed to click {}: {}",
                            button.description, e
                        ));
                        false
                    }
                };
            }
            Ok(None) => {}
            Err(e) => {
                crate::log(&format!("Error searching for image: {}", e));
            }
        }

        if attempt < max_retries {
            std::thread::sleep(retry_interval);
        }
    }

    crate::log(&format!("Could not find {}.", button.description));
    false
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use std::cell::{Cell, RefCell};

    use crate::automation::regions::Point;

    /// Returns scripted lookup results in order, then `None`.
    pub(crate) struct ScriptedLocator {
        pub results: RefCell<Vec<Result<Option<Point>>>>,
        pub calls: Cell<u32>,
    }

    impl ScriptedLocator {
        pub(crate) fn new(results: Vec<Result<Option<Point>>>) -> Self {
            Self {
                results: RefCell::new(results),
                calls: Cell::new(0),
            }
        }
    }

    impl TemplateLocator for ScriptedLocator {
        fn locate_on_screen(&self, _template: &GrayImage, _confidence: f32) -> Result<Option<Point>> {
            self.calls.set(self.calls.get() + 1);
            let mut results = self.results.borrow_mut();
            if results.is_empty() {
                Ok(None)
            } else {
                results.remove(0)
            }
        }
    }

    /// Records pointer actions as strings like "move 1,2" and "click".
    #[derive(Default)]
    pub(crate) struct RecordingPointer {
        pub actions: RefCell<Vec<String>>,
        pub fail_clicks: bool,
    }

    impl Pointer for RecordingPointer {
        fn move_to(&self, x: i32, y: i32) -> Result<()> {
            self.actions.borrow_mut().push(format!("move {},{}", x, y));
            Ok(())
        }

        fn click(&self) -> Result<()> {
            if self.fail_clicks {
                return Err(anyhow!("input blocked"));
            }
            self.actions.borrow_mut().push("click".to_string());
            Ok(())
        }
    }

    fn button() -> TemplateButton {
        TemplateButton::new("Test button", GrayImage::new(4, 4))
    }

    #[test]
    fn test_found_first_try() {
        let locator = ScriptedLocator::new(vec![Ok(Some((50, 60)))]);
        let pointer = RecordingPointer::default();

        assert!(find_and_click(&locator, &pointer, &button(), 0.8, 1, Duration::ZERO));
        assert_eq!(locator.calls.get(), 1);
        assert_eq!(*pointer.actions.borrow(), vec!["move 50,60", "click"]);
    }

    #[test]
    fn test_found_after_retry() {
        let locator = ScriptedLocator::new(vec![Ok(None), Ok(Some((5, 5)))]);
        let pointer = RecordingPointer::default();

        assert!(find_and_click(&locator, &pointer, &button(), 0.8, 1, Duration::ZERO));
        assert_eq!(locator.calls.get(), 2);
    }

    #[test]
    fn test_retries_exhausted() {
        let locator = ScriptedLocator::new(vec![]);
        let pointer = RecordingPointer::default();

        assert!(!find_and_click(&locator, &pointer, &button(), 0.8, 2, Duration::ZERO));
        assert_eq!(locator.calls.get(), 3);
        assert!(pointer.actions.borrow().is_empty());
    }

    #[test]
    fn test_lookup_error_is_not_fatal() {
        let locator = ScriptedLocator::new(vec![Err(anyhow!("capture failed")), Ok(Some((1, 2)))]);
        let pointer = RecordingPointer::default();

        assert!(find_and_click(&locator, &pointer, &button(), 0.8, 1, Duration::ZERO));
    }

    #[test]
    fn test_click_error_reports_false() {
        let locator = ScriptedLocator::new(vec![Ok(Some((1, 2)))]);
        let pointer = RecordingPointer {
            fail_clicks: true,
            ..Default::default()
        };

        assert!(!find_and_click(&locator, &pointer, &button(), 0.8, 0, Duration::ZERO));
    }

    #[test]
    fn test_missing_image_never_searched() {
        let locator = ScriptedLocator::new(vec![Ok(Some((1, 2)))]);
        let pointer = RecordingPointer::default();
        let missing = TemplateButton::missing("Ghost");

        assert!(!find_and_click(&locator, &pointer, &missing, 0.8, 3, Duration::ZERO));
        assert_eq!(locator.calls.get(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let button = TemplateButton::load("Nothing", &dir.path().join("nope.png"));
        assert!(button.image.is_none());
    }
}
