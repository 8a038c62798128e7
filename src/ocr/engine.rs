use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;
use crate::automation::collaborators::TextRecognizer;
use crate::automation::regions::{LocatedText, Quad, TextRegionIndex};

/// Page segmentation mode 3: fully automatic, no OSD. Quiz screens mix a
/// question block with scattered answer buttons.
const PAGE_SEG_MODE: &str = "3";

/// A horizontal gap wider than this many line heights splits a line into
/// separate regions, so answers laid out side by side stay apart.
const WORD_GAP_FACTOR: f32 = 1.5;

/// Runs the Tesseract CLI on full-screen captures.
pub struct TesseractRecognizer {
    paths: TesseractPaths,
    /// Joined language spec, e.g. "vie+eng"
    languages: String,
}

impl TesseractRecognizer {
    pub fn new(paths: TesseractPaths, languages: &[String]) -> Self {
        Self {
            paths,
            languages: languages.join("+"),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    /// Returns one region per recognized line, in reading order.
    fn recognize(&self, image: &RgbaImage) -> Result<TextRegionIndex> {
        let gray = image::imageops::grayscale(image);

        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        gray.save(temp_input.path())
            .context("Failed to write OCR input image")?;

        // Create temporary output file (Tesseract adds .tsv extension)
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let output = Command::new(&self.paths.executable)
            .arg(temp_input.path())
            .arg(&output_base)
            .arg("--tessdata-dir")
            .arg(&self.paths.tessdata)
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(PAGE_SEG_MODE)
            .arg("tsv")
            .output()
            .context("Failed to run Tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;

        // Clean up output file
        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_output(&tsv_content))
    }
}

/// A line being assembled from its words.
struct LineBuilder {
    key: (i32, i32, i32, i32),
    words: Vec<String>,
    conf_sum: f32,
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl LineBuilder {
    fn new(key: (i32, i32, i32, i32)) -> Self {
        Self {
            key,
            words: Vec::new(),
            conf_sum: 0.0,
            left: f32::MAX,
            top: f32::MAX,
            right: f32::MIN,
            bottom: f32::MIN,
        }
    }

    fn push(&mut self, text: &str, conf: f32, left: f32, top: f32, width: f32, height: f32) {
        self.words.push(text.to_string());
        self.conf_sum += conf;
        self.left = self.left.min(left);
        self.top = self.top.min(top);
        self.right = self.right.max(left + width);
        self.bottom = self.bottom.max(top + height);
    }

    /// True when a word starting at `left` is too far right to join this line.
    fn is_detached(&self, left: f32, height: f32) -> bool {
        if self.words.is_empty() {
            return false;
        }
        let line_height = (self.bottom - self.top).max(height);
        left - self.right > WORD_GAP_FACTOR * line_height
    }

    fn finish(self) -> Option<LocatedText> {
        if self.words.is_empty() {
            return None;
        }
        // Tesseract confidence is 0-100
        let confidence = self.conf_sum / self.words.len() as f32 / 100.0;
        let quad = Quad::from_rect(
            self.left,
            self.top,
            self.right - self.left,
            self.bottom - self.top,
        );
        Some(LocatedText::new(quad, self.words.join(" "), confidence))
    }
}

/// Parses Tesseract TSV output into one located region per text line.
///
/// A line's box is the union of its word boxes; its confidence is the mean
/// word confidence scaled to 0.0-1.0. Blank words and words with negative
/// confidence are skipped. Words separated by a wide horizontal gap start a
/// new region even within one Tesseract line.
pub fn parse_tsv_output(tsv: &str) -> TextRegionIndex {
    let mut regions = Vec::new();
    let mut current: Option<LineBuilder> = None;

    for line in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        // Level 5 = word
        if level != 5 {
            continue;
        }

        let num = |i: usize| fields[i].trim().parse::<i32>().unwrap_or(-1);
        let coord = |i: usize| fields[i].trim().parse::<f32>().unwrap_or(0.0);
        let key = (num(1), num(2), num(3), num(4));
        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let (left, top, width, height) = (coord(6), coord(7), coord(8), coord(9));

        // Flush when the word starts a new line or sits far from the previous word
        if current
            .as_ref()
            .is_some_and(|b| b.key != key || b.is_detached(left, height))
        {
            if let Some(done) = current.take().and_then(LineBuilder::finish) {
                regions.push(done);
            }
        }

        current
            .get_or_insert_with(|| LineBuilder::new(key))
            .push(text, conf, left, top, width, height);
    }

    // Don't forget the last line
    if let Some(done) = current.and_then(LineBuilder::finish) {
        regions.push(done);
    }

    TextRegionIndex::new(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn row(level: i32, block: i32, line: i32, word: i32, rect: (i32, i32, i32, i32), conf: f32, text: &str) -> String {
        format!(
            "{}\t1\t{}\t1\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            level, block, line, word, rect.0, rect.1, rect.2, rect.3, conf, text
        )
    }

    #[test]
    fn test_parse_groups_words_into_lines() {
        let tsv = [
            HEADER.to_string(),
            row(4, 1, 1, 0, (100, 100, 40, 20), -1.0, ""),
            row(5, 1, 1, 1, (100, 100, 15, 20), 90.0, "A."),
            row(5, 1, 1, 2, (120, 102, 20, 18), 80.0, "Hanoi"),
            row(5, 2, 1, 1, (100, 200, 15, 20), 95.0, "B."),
            row(5, 2, 1, 2, (120, 200, 20, 20), 85.0, "Saigon"),
        ]
        .join("\n");

        let index = parse_tsv_output(&tsv);
        let regions: Vec<_> = index.iter().collect();
        assert_eq!(regions.len(), 2);

        assert_eq!(regions[0].text, "A. Hanoi");
        assert_eq!(regions[0].quad, Quad::from_rect(100.0, 100.0, 40.0, 20.0));
        assert!((regions[0].confidence - 0.85).abs() < 1e-4);

        assert_eq!(regions[1].text, "B. Saigon");
        assert_eq!(regions[1].quad.center(), (120, 210));
    }

    #[test]
    fn test_parse_skips_blank_and_unconfident_words() {
        let tsv = [
            HEADER.to_string(),
            row(5, 1, 1, 1, (0, 0, 10, 10), 90.0, "   "),
            row(5, 1, 1, 2, (20, 0, 10, 10), -1.0, "ghost"),
            row(5, 1, 2, 1, (0, 30, 10, 10), 70.0, "Real"),
        ]
        .join("\n");

        let index = parse_tsv_output(&tsv);
        assert_eq!(index.len(), 1);
        assert_eq!(index.full_text(), "Real");
    }

    #[test]
    fn test_parse_same_line_number_in_different_blocks() {
        let tsv = [
            HEADER.to_string(),
            row(5, 1, 1, 1, (0, 0, 10, 10), 90.0, "Question?"),
            row(5, 3, 1, 1, (0, 50, 10, 10), 90.0, "C."),
            row(5, 3, 1, 2, (15, 50, 10, 10), 90.0, "Huế"),
        ]
        .join("\n");

        let index = parse_tsv_output(&tsv);
        assert_eq!(index.full_text(), "Question?\nC. Huế");
    }

    #[test]
    fn test_parse_splits_side_by_side_answers() {
        let tsv = [
            HEADER.to_string(),
            row(5, 2, 1, 1, (100, 300, 20, 20), 92.0, "A."),
            row(5, 2, 1, 2, (125, 300, 60, 20), 90.0, "Hanoi"),
            row(5, 2, 1, 3, (900, 300, 20, 20), 91.0, "B."),
            row(5, 2, 1, 4, (925, 300, 70, 20), 89.0, "Saigon"),
        ]
        .join("\n");

        let index = parse_tsv_output(&tsv);
        let regions: Vec<_> = index.iter().collect();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].text, "A. Hanoi");
        assert_eq!(regions[0].quad.center(), (143, 310));
        assert_eq!(regions[1].text, "B. Saigon");
        assert_eq!(regions[1].quad.center(), (948, 310));

        let result = crate::automation::locator::locate("A. Hanoi", &index, 85);
        assert_eq!(result.point, Some((143, 310)));
        assert_eq!(result.matched_text, "A. Hanoi");
    }

    #[test]
    fn test_parse_keeps_normal_word_spacing() {
        let tsv = [
            HEADER.to_string(),
            row(5, 1, 1, 1, (0, 0, 40, 20), 90.0, "Thủ"),
            row(5, 1, 1, 2, (55, 0, 30, 20), 90.0, "đô"),
        ]
        .join("\n");

        assert_eq!(parse_tsv_output(&tsv).full_text(), "Thủ đô");
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(parse_tsv_output("").is_empty());
        assert!(parse_tsv_output(HEADER).is_empty());
        assert!(parse_tsv_output(&format!("{}\n5\t1\t1", HEADER)).is_empty());
    }
}
