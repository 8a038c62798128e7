use anyhow::Result;
use image::imageops::FilterType;
use image::GrayImage;

use crate::automation::collaborators::{ScreenCapture, TemplateLocator};
use crate::automation::regions::Point;

/// Below this variance a window (or template) has no structure to correlate.
const MIN_VARIANCE: f64 = 1e-10;

/// Best placement of a template inside a larger image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchHit {
    /// Top-left corner of the placement
    pub x: u32,
    pub y: u32,
    /// Zero-mean normalized cross-correlation in [-1.0, 1.0]
    pub score: f32,
}

/// Template with its mean already removed.
struct Prepared {
    width: u32,
    height: u32,
    centered: Vec<f64>,
    energy: f64,
}

impl Prepared {
    fn new(template: &GrayImage) -> Option<Self> {
        let (width, height) = template.dimensions();
        let n = (width * height) as f64;
        if n == 0.0 {
            return None;
        }

        let mean = template.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n;
        let centered: Vec<f64> = template.pixels().map(|p| p.0[0] as f64 - mean).collect();
        let energy = centered.iter().map(|v| v * v).sum::<f64>();
        if energy < MIN_VARIANCE {
            return None;
        }

        Some(Self {
            width,
            height,
            centered,
            energy,
        })
    }

    /// NCC of the template against the window whose top-left is (x, y).
    fn score_at(&self, haystack: &GrayImage, x: u32, y: u32) -> f32 {
        let n = (self.width * self.height) as f64;
        let mut sum = 0.0_f64;
        let mut sum_sq = 0.0_f64;
        let mut cross = 0.0_f64;

        let mut i = 0;
        for ty in 0..self.height {
            for tx in 0..self.width {
                let c = haystack.get_pixel(x + tx, y + ty).0[0] as f64;
                sum += c;
                sum_sq += c * c;
                // Template values are zero-mean, so the window mean cancels out
                cross += self.centered[i] * c;
                i += 1;
            }
        }

        let variance = sum_sq - sum * sum / n;
        if variance < MIN_VARIANCE {
            return 0.0;
        }
        (cross / (self.energy * variance).sqrt()) as f32
    }

    /// Scores every placement with top-left inside the inclusive bounds.
    fn scan(&self, haystack: &GrayImage, xs: (u32, u32), ys: (u32, u32)) -> Vec<MatchHit> {
        let mut hits = Vec::new();
        for y in ys.0..=ys.1 {
            for x in xs.0..=xs.1 {
                let score = self.score_at(haystack, x, y);
                hits.push(MatchHit { x, y, score });
            }
        }
        hits
    }

    /// Best placement with top-left inside the given inclusive bounds.
    /// Earlier placements win ties.
    fn search(
        &self,
        haystack: &GrayImage,
        xs: (u32, u32),
        ys: (u32, u32),
    ) -> Option<MatchHit> {
        let mut best: Option<MatchHit> = None;
        for y in ys.0..=ys.1 {
            for x in xs.0..=xs.1 {
                let score = self.score_at(haystack, x, y);
                if best.is_none_or(|b| score > b.score) {
                    best = Some(MatchHit { x, y, score });
                }
            }
        }
        best
    }
}

/// Pyramid factors tried for the coarse pass, largest first.
const PYRAMID_FACTORS: [u32; 3] = [8, 4, 2];
/// The shrunken template must keep this many pixels to stay distinctive.
const MIN_COARSE_AREA: u32 = 64;
/// ...and at least this many on its short side.
const MIN_COARSE_SIDE: u32 = 4;
/// Coarse hits refined at full resolution.
const COARSE_CANDIDATES: usize = 3;

/// Downscale factor for the coarse pass: the largest one that leaves the
/// shrunken template with enough pixels. 1 means search exhaustively.
fn pyramid_factor(width: u32, height: u32) -> u32 {
    PYRAMID_FACTORS
        .into_iter()
        .find(|&f| {
            let (w, h) = (width / f, height / f);
            w.min(h) >= MIN_COARSE_SIDE && w * h >= MIN_COARSE_AREA
        })
        .unwrap_or(1)
}

fn shrink(img: &GrayImage, factor: u32) -> GrayImage {
    let w = (img.width() / factor).max(1);
    let h = (img.height() / factor).max(1);
    image::imageops::resize(img, w, h, FilterType::Triangle)
}

/// Best coarse placements, highest score first, at least `spacing` pixels
/// apart on some axis so near-duplicates of one peak are not refined twice.
fn top_candidates(mut hits: Vec<MatchHit>, count: usize, spacing: u32) -> Vec<MatchHit> {
    // Stable sort keeps scan order among equal scores
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut chosen: Vec<MatchHit> = Vec::with_capacity(count);
    for hit in hits {
        if chosen.len() == count {
            break;
        }
        let separate = chosen
            .iter()
            .all(|c| c.x.abs_diff(hit.x) > spacing || c.y.abs_diff(hit.y) > spacing);
        if separate {
            chosen.push(hit);
        }
    }
    chosen
}

/// Finds the best placement of `template` in `haystack`.
///
/// Large enough templates are searched on a downscaled copy first; the best
/// few coarse hits are then refined at full resolution within a few pixels.
/// Returns `None` when the template does not fit or has no contrast.
pub fn find_template(haystack: &GrayImage, template: &GrayImage) -> Option<MatchHit> {
    let full = Prepared::new(template)?;
    if full.width > haystack.width() || full.height > haystack.height() {
        return None;
    }
    let max_x = haystack.width() - full.width;
    let max_y = haystack.height() - full.height;

    let factor = pyramid_factor(full.width, full.height);
    if factor == 1 {
        return full.search(haystack, (0, max_x), (0, max_y));
    }

    let small_haystack = shrink(haystack, factor);
    let coarse_hits = Prepared::new(&shrink(template, factor)).and_then(|small| {
        if small.width > small_haystack.width() || small.height > small_haystack.height() {
            return None;
        }
        let xs = (0, small_haystack.width() - small.width);
        let ys = (0, small_haystack.height() - small.height);
        Some(small.scan(&small_haystack, xs, ys))
    });

    let Some(coarse_hits) = coarse_hits else {
        // Shrinking flattened the template; fall back to a full search
        return full.search(haystack, (0, max_x), (0, max_y));
    };

    let radius = factor * 2;
    let mut best: Option<MatchHit> = None;
    for coarse in top_candidates(coarse_hits, COARSE_CANDIDATES, 2) {
        let cx = (coarse.x * factor).min(max_x);
        let cy = (coarse.y * factor).min(max_y);
        let refined = full.search(
            haystack,
            (cx.saturating_sub(radius), (cx + radius).min(max_x)),
            (cy.saturating_sub(radius), (cy + radius).min(max_y)),
        );
        if let Some(hit) = refined {
            if best.is_none_or(|b| hit.score > b.score) {
                best = Some(hit);
            }
        }
    }
    best
}

/// Template locator that matches against fresh screen captures.
pub struct ScreenMatcher<'a> {
    capture: &'a dyn ScreenCapture,
}

impl<'a> ScreenMatcher<'a> {
    pub fn new(capture: &'a dyn ScreenCapture) -> Self {
        Self { capture }
    }
}

impl TemplateLocator for ScreenMatcher<'_> {
    fn locate_on_screen(&self, template: &GrayImage, confidence: f32) -> Result<Option<Point>> {
        let screen = image::imageops::grayscale(&self.capture.capture()?);

        let Some(hit) = find_template(&screen, template) else {
            return Ok(None);
        };
        if hit.score < confidence {
            crate::log(&format!(
                "Best template score {:.3} below {:.2}",
                hit.score, confidence
            ));
            return Ok(None);
        }

        let center = (
            (hit.x + template.width() / 2) as i32,
            (hit.y + template.height() / 2) as i32,
        );
        Ok(Some(center))
    }
}
