//! Mouse input simulation with `SendInput`.
//!
//! Hardware-level input is used because quiz clients running in browsers or
//! games ignore posted window messages. This moves the real cursor.

use anyhow::{anyhow, Result};
use std::time::Duration;

use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_VIRTUALDESK, MOUSE_EVENT_FLAGS, MOUSEINPUT,
};

use super::normalize_coordinate;
use crate::automation::collaborators::Pointer;
use crate::capture::screen::VirtualScreen;

/// Gap between button down and up
const CLICK_HOLD: Duration = Duration::from_millis(50);

/// Pointer driven by `SendInput`. Coordinates are capture pixels, i.e.
/// relative to the virtual desktop's top-left corner.
#[derive(Default)]
pub struct SendInputPointer;

impl SendInputPointer {
    fn send(&self, flags: MOUSE_EVENT_FLAGS, dx: i32, dy: i32) -> Result<()> {
        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    dwFlags: flags,
                    ..Default::default()
                },
            },
        };
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent != 1 {
            return Err(anyhow!("SendInput rejected the mouse event"));
        }
        Ok(())
    }
}

impl Pointer for SendInputPointer {
    fn move_to(&self, x: i32, y: i32) -> Result<()> {
        let screen = VirtualScreen::current();
        let dx = normalize_coordinate(x, screen.width);
        let dy = normalize_coordinate(y, screen.height);
        self.send(
            MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
            dx,
            dy,
        )
    }

    fn click(&self) -> Result<()> {
        // Relative events with zero delta keep the cursor where move_to left it
        self.send(MOUSEEVENTF_LEFTDOWN, 0, 0)?;
        std::thread::sleep(CLICK_HOLD);
        self.send(MOUSEEVENTF_LEFTUP, 0, 0)
    }
}
