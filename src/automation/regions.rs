//! Located text records produced by one OCR pass.

/// A screen point in pixels.
pub type Point = (i32, i32);

/// Quadrilateral in screen pixel coordinates.
///
/// Corners are stored in OCR order: top-left, top-right, bottom-right,
/// bottom-left (any rotation of that order describes the same box).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad(pub [(f32, f32); 4]);

impl Quad {
    /// Builds an axis-aligned quad from a Tesseract-style rectangle.
    pub fn from_rect(left: f32, top: f32, width: f32, height: f32) -> Self {
        let right = left + width;
        let bottom = top + height;
        Quad([(left, top), (right, top), (right, bottom), (left, bottom)])
    }

    /// Center point: mean of the midpoints of both diagonals, rounded.
    pub fn center(&self) -> Point {
        let [p0, p1, p2, p3] = self.0;
        let mid_a = ((p0.0 + p2.0) / 2.0, (p0.1 + p2.1) / 2.0);
        let mid_b = ((p1.0 + p3.0) / 2.0, (p1.1 + p3.1) / 2.0);
        let x = (mid_a.0 + mid_b.0) / 2.0;
        let y = (mid_a.1 + mid_b.1) / 2.0;
        (x.round() as i32, y.round() as i32)
    }

    /// Returns the same corners starting one position later.
    pub fn rotated(&self) -> Self {
        let [p0, p1, p2, p3] = self.0;
        Quad([p1, p2, p3, p0])
    }
}

/// One recognized text region.
#[derive(Clone, Debug, PartialEq)]
pub struct LocatedText {
    pub quad: Quad,
    pub text: String,
    pub confidence: f32,
}

impl LocatedText {
    pub fn new(quad: Quad, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            quad,
            text: text.into(),
            confidence,
        }
    }
}

/// All regions from one screen capture, in OCR emission order.
#[derive(Clone, Debug, Default)]
pub struct TextRegionIndex {
    regions: Vec<LocatedText>,
}

impl TextRegionIndex {
    pub fn new(regions: Vec<LocatedText>) -> Self {
        Self { regions }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LocatedText> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// All region texts joined by newlines, trimmed.
    pub fn full_text(&self) -> String {
        self.regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

impl FromIterator<LocatedText> for TextRegionIndex {
    fn from_iter<I: IntoIterator<Item = LocatedText>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
