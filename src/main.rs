//! Quiz Autopilot
//!
//! A console tool that reads the current quiz question off the screen with
//! Tesseract, asks a local Ollama model for the answer, and clicks the
//! matching option. Operated with global hotkeys.

// Only the Windows build wires the collaborators together
#![cfg_attr(not(windows), allow(dead_code))]

mod automation;
mod capture;
mod input;
mod llm;
mod ocr;
mod paths;
mod template;

use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

const LOG_FILE: &str = "quiz_autopilot.log";

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join(LOG_FILE);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        let log_path = paths::get_logs_dir().join(LOG_FILE);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));
}

fn print_banner(config: &automation::QuizConfig) {
    let keys = &config.keys;
    log("==============================================");
    log("Quiz Autopilot ready");
    log(&format!("  [{}] solve one question", keys.run_once.to_uppercase()));
    log(&format!("  [{}] solve continuously", keys.run_loop.to_uppercase()));
    log(&format!(
        "  [{}] stop the loop, or quit when idle",
        keys.stop.to_uppercase()
    ));
    log("==============================================");
}

/// Collaborators that can be set up without touching the desktop.
struct Services {
    keys: input::KeyMap,
    decision: llm::OllamaClient,
    recognizer: ocr::TesseractRecognizer,
}

/// Validates the hotkeys, confirms Ollama answers, then prepares Tesseract.
/// Any failure here means the tool cannot work and startup stops.
fn start_services(config: &automation::QuizConfig) -> Result<Services> {
    use anyhow::Context;

    use automation::DecisionMaker;

    let keys = input::KeyMap::from_bindings(&config.keys)?;

    let decision = llm::OllamaClient::new(config)?;
    decision
        .probe()
        .context("Start Ollama (`ollama serve`) and try again")?;

    let tesseract =
        ocr::ensure_tesseract(&config.ocr_languages).context("Tesseract setup failed")?;
    let recognizer = ocr::TesseractRecognizer::new(tesseract, &config.ocr_languages);

    Ok(Services {
        keys,
        decision,
        recognizer,
    })
}

#[cfg(windows)]
fn run() -> Result<()> {
    use automation::{QuizButtons, QuizSolver};

    // Capture and SendInput must agree on physical pixels
    capture::enable_dpi_awareness();

    paths::ensure_directories()?;
    log("Quiz Autopilot starting...");

    let config = automation::load_config();
    let Services {
        keys,
        decision,
        recognizer,
    } = start_services(&config)?;

    let buttons = QuizButtons::load(&config, paths::get_exe_dir());

    let history_path = if config.record_history {
        let path = paths::get_history_path();
        match automation::history::init_history(&path) {
            Ok(()) => Some(path),
            Err(e) => {
                log(&format!("Warning: history disabled: {}", e));
                None
            }
        }
    } else {
        None
    };

    let capture = capture::GdiScreenCapture;
    let locator = template::ScreenMatcher::new(&capture);
    let pointer = input::SendInputPointer;
    let signals = input::KeyboardSignals::new(keys);

    let solver = QuizSolver {
        config: &config,
        capture: &capture,
        recognizer: &recognizer,
        decision: &decision,
        locator: &locator,
        pointer: &pointer,
        buttons: &buttons,
        capture_dir: config.save_captures.then(paths::get_screenshots_dir),
    };

    print_banner(&config);
    automation::run_controller(&config, &signals, &solver, history_path.as_deref());

    log("Quiz Autopilot exited");
    Ok(())
}

#[cfg(not(windows))]
fn run() -> Result<()> {
    Err(anyhow::anyhow!(
        "Quiz Autopilot needs Windows for screen capture and input"
    ))
}

fn main() {
    install_panic_hook();

    if let Err(e) = run() {
        log(&format!("Fatal: {:#}", e));
        std::process::exit(1);
    }
}
