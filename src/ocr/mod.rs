pub mod engine;
pub mod setup;

pub use engine::{parse_tsv_output, TesseractRecognizer};
pub use setup::{ensure_tesseract, TesseractPaths};
