//! Hotkey polling via `GetAsyncKeyState`.

use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

use super::keys::KeyMap;
use crate::automation::collaborators::{Signal, SignalSource};

/// Reports a signal as active while its key is physically held down,
/// whichever window has focus.
pub struct KeyboardSignals {
    keys: KeyMap,
}

impl KeyboardSignals {
    pub fn new(keys: KeyMap) -> Self {
        Self { keys }
    }
}

impl SignalSource for KeyboardSignals {
    fn is_active(&self, signal: Signal) -> bool {
        let vk = self.keys.vk_for(signal) as i32;
        // High bit set = key currently down
        let state = unsafe { GetAsyncKeyState(vk) };
        (state as u16 & 0x8000) != 0
    }
}
