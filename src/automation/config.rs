//! Configuration types for the quiz autopilot.
//!
//! Loaded once from config.json at startup and passed by reference to every
//! component. Nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Instruction sent to the decision-maker. `{screen_text}` is replaced with
/// the recognized screen text.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Dưới đây là nội dung câu hỏi và các đáp án trên màn hình:\n\
\"\"\"\n\
{screen_text}\n\
\"\"\"\n\
Yêu cầu:\n\
1. Xác định câu trả lời đúng.\n\
2. Trả về CHÍNH XÁC nguyên văn dòng text của đáp án đó xuất hiện trên màn hình (bao gồm cả ký tự A/B/C/D nếu có).\n\
3. KHÔNG giải thích, KHÔNG thêm lời dẫn. Chỉ in ra text đáp án.\n\
Ví dụ: Nếu đáp án đúng là 'C. Hà Nội', hãy in ra: C. Hà Nội";

/// Placeholder substituted in `prompt_template`.
pub const SCREEN_TEXT_PLACEHOLDER: &str = "{screen_text}";

/// Paths of the optional on-screen buttons.
/// Relative paths are resolved against the executable directory.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplatePaths {
    /// "Show question" button, clicked before each capture
    pub show_question: String,
    /// "Check answer" button, clicked after the answer
    pub check_answer: String,
    /// "Next page" button, clicked last
    pub next_page: String,
}

impl Default for TemplatePaths {
    fn default() -> Self {
        Self {
            show_question: "resources/buttons/show_question_button.png".to_string(),
            check_answer: "resources/buttons/check_answer_button.png".to_string(),
            next_page: "resources/buttons/next_page_button.png".to_string(),
        }
    }
}

/// Operator key bindings, by key name ("esc", "f", "f9", "space", ...).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeyBindings {
    /// Stops the loop; quits when idle
    pub stop: String,
    /// Solves one question
    pub run_once: String,
    /// Starts the continuous loop
    pub run_loop: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            stop: "esc".to_string(),
            run_once: "f".to_string(),
            run_loop: "g".to_string(),
        }
    }
}

/// Complete autopilot configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Tesseract language codes, joined with '+' on the command line
    pub ocr_languages: Vec<String>,
    /// Minimum normalized correlation for a template hit (0.0-1.0)
    pub template_confidence: f32,
    /// Minimum fuzzy score (0-100) for clicking an answer
    pub match_threshold: u8,
    /// Base URL of the Ollama server
    pub ollama_url: String,
    /// Model identifier passed to Ollama
    pub model: String,
    /// HTTP timeout for decision-maker requests (seconds)
    pub request_timeout_secs: u64,
    /// Instruction template, must contain `{screen_text}`
    pub prompt_template: String,
    /// Button reference images
    pub templates: TemplatePaths,
    /// Extra template lookups after the first miss
    pub template_retries: u32,
    /// Pause between template lookups (milliseconds)
    pub retry_interval_ms: u64,
    /// Wait after revealing the question (milliseconds)
    pub reveal_settle_ms: u64,
    /// Wait after clicking the answer, before "check answer" (milliseconds)
    pub confirm_delay_ms: u64,
    /// Wait after "check answer", before "next page" (milliseconds)
    pub advance_delay_ms: u64,
    /// Delay between cycles in loop mode (milliseconds)
    pub loop_delay_ms: u64,
    /// Idle polling interval (milliseconds)
    pub poll_interval_ms: u64,
    /// Slice used for debounce and interruptible waits (milliseconds)
    pub slice_ms: u64,
    /// Operator key bindings
    pub keys: KeyBindings,
    /// Save every capture to the screenshots directory
    pub save_captures: bool,
    /// Append each cycle outcome to history.csv
    pub record_history: bool,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            ocr_languages: vec!["vie".to_string(), "eng".to_string()],
            template_confidence: 0.8,
            match_threshold: 85,
            ollama_url: "http://localhost:11434".to_string(),
            model: "hf.co/arcee-ai/Arcee-VyLinh-GGUF:Q8_0".to_string(),
            request_timeout_secs: 120,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            templates: TemplatePaths::default(),
            template_retries: 1,
            retry_interval_ms: 500,
            reveal_settle_ms: 1500,
            confirm_delay_ms: 500,
            advance_delay_ms: 200,
            loop_delay_ms: 3000,
            poll_interval_ms: 50,
            slice_ms: 100,
            keys: KeyBindings::default(),
            save_captures: false,
            record_history: true,
        }
    }
}

impl QuizConfig {
    /// Builds the decision-maker prompt for the given screen text.
    pub fn build_prompt(&self, screen_text: &str) -> String {
        if self.prompt_template.contains(SCREEN_TEXT_PLACEHOLDER) {
            self.prompt_template
                .replace(SCREEN_TEXT_PLACEHOLDER, screen_text)
        } else {
            // Template without placeholder: append the text
            format!("{}\n\n{}", self.prompt_template, screen_text)
        }
    }

    /// Resolves a template path against `base_dir` unless it is absolute.
    pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            base_dir.join(p)
        }
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn loop_delay(&self) -> Duration {
        Duration::from_millis(self.loop_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Never zero, so wait loops always make progress.
    pub fn slice(&self) -> Duration {
        Duration::from_millis(self.slice_ms.max(1))
    }
}

/// Loads configuration from `config_path` or returns defaults.
pub fn load_config_from(config_path: &Path) -> QuizConfig {
    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    QuizConfig::default()
}

/// Loads configuration from config.json next to the executable.
pub fn load_config() -> QuizConfig {
    load_config_from(&crate::paths::get_exe_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = QuizConfig::default();
        assert_eq!(config.match_threshold, 85);
        assert_eq!(config.ocr_languages, vec!["vie", "eng"]);
        assert_eq!(config.keys.stop, "esc");
        assert!((config.template_confidence - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "match_threshold": 70, "keys": { "run_once": "f9" } }"#,
        )
        .unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.match_threshold, 70);
        assert_eq!(config.keys.run_once, "f9");
        assert_eq!(config.keys.stop, "esc");
        assert_eq!(config.loop_delay_ms, 3000);
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.match_threshold, 85);
    }

    #[test]
    fn test_missing_config_falls_back() {
        let dir = tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.json"));
        assert_eq!(config.model, QuizConfig::default().model);
    }

    #[test]
    fn test_build_prompt() {
        let config = QuizConfig {
            prompt_template: "Q:\n{screen_text}\nA:".to_string(),
            ..Default::default()
        };
        assert_eq!(config.build_prompt("1 + 1?"), "Q:\n1 + 1?\nA:");

        let config = QuizConfig {
            prompt_template: "Answer this".to_string(),
            ..Default::default()
        };
        assert_eq!(config.build_prompt("text"), "Answer this\n\ntext");
    }

    #[test]
    fn test_default_prompt_contains_text() {
        let prompt = QuizConfig::default().build_prompt("A. Hanoi\nB. Saigon");
        assert!(prompt.contains("A. Hanoi\nB. Saigon"));
        assert!(!prompt.contains(SCREEN_TEXT_PLACEHOLDER));
    }

    #[test]
    fn test_slice_never_zero() {
        let config = QuizConfig {
            slice_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.slice(), Duration::from_millis(1));
    }
}
