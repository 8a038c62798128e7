//! On-screen button lookup by grayscale template matching.

pub mod matcher;

pub use matcher::{find_template, ScreenMatcher};
