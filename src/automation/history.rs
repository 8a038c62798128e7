//! Answer history, one CSV row per solve cycle.
//!
//! Append-only so a crash never loses earlier rows.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::automation::cycle::CycleOutcome;

/// Columns: timestamp, mode, outcome, answer, matched text, score, click x, click y, detail
const CSV_HEADER: &str = "timestamp,mode,outcome,answer,matched_text,score,x,y,detail";

/// Writes the header if the file doesn't exist or is empty.
pub fn init_history(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing history CSV")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            // Keep existing rows
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create history CSV")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write history header")?;
    Ok(())
}

/// Quotes a field when it contains a separator, quote or newline.
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Formats one row (without trailing newline).
pub fn format_row(at: DateTime<Local>, mode: &str, outcome: &CycleOutcome) -> String {
    let (answer, matched, score, point, detail) = match outcome {
        CycleOutcome::Answered {
            answer,
            matched_text,
            score,
            point,
        } => (
            answer.as_str(),
            matched_text.as_str(),
            score.to_string(),
            Some(*point),
            "",
        ),
        CycleOutcome::AnswerNotFound { answer, best } => (
            answer.as_str(),
            best.matched_text.as_str(),
            best.score.to_string(),
            None,
            "",
        ),
        CycleOutcome::NoText => ("", "", String::new(), None, ""),
        CycleOutcome::CaptureFailed(msg)
        | CycleOutcome::RecognitionFailed(msg)
        | CycleOutcome::DecisionFailed(msg)
        | CycleOutcome::ClickFailed(msg) => ("", "", String::new(), None, msg.as_str()),
    };

    let (x, y) = point
        .map(|(x, y)| (x.to_string(), y.to_string()))
        .unwrap_or_default();

    [
        at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        mode.to_string(),
        outcome.label().to_string(),
        escape_field(answer),
        escape_field(matched),
        score,
        x,
        y,
        escape_field(detail),
    ]
    .join(",")
}

/// Appends one outcome row, opening the file per write.
pub fn append_outcome(path: &Path, mode: &str, outcome: &CycleOutcome) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open history CSV for append")?;

    writeln!(file, "{}", format_row(Local::now(), mode, outcome))
        .context("Failed to write history row")?;
    Ok(())
}
