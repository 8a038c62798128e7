//! Operator hotkeys and simulated mouse input.
//!
//! Key name parsing is portable; the Win32 signal source and pointer are
//! only built on Windows.

pub mod keys;

#[cfg(windows)]
pub mod keyboard;
#[cfg(windows)]
pub mod mouse;

pub use keys::{parse_key_name, KeyMap};

#[cfg(windows)]
pub use keyboard::KeyboardSignals;
#[cfg(windows)]
pub use mouse::SendInputPointer;

/// Maps a pixel offset along an axis of `extent` pixels onto the 0-65535
/// range used by absolute mouse events. Out-of-range offsets are clamped.
pub fn normalize_coordinate(offset: i32, extent: i32) -> i32 {
    if extent <= 1 {
        return 0;
    }
    let clamped = offset.clamp(0, extent - 1) as i64;
    ((clamped * 65535) / (extent as i64 - 1)) as i32
}
