use anyhow::{anyhow, Result};

use crate::automation::collaborators::Signal;
use crate::automation::config::KeyBindings;

/// Resolves a key name such as "esc", "f", "7" or "f5" to its virtual-key code.
/// Names are case-insensitive.
pub fn parse_key_name(name: &str) -> Result<u16> {
    let name = name.trim().to_ascii_lowercase();

    let named = match name.as_str() {
        "esc" | "escape" => Some(0x1B),
        "space" => Some(0x20),
        "enter" | "return" => Some(0x0D),
        "tab" => Some(0x09),
        "backspace" => Some(0x08),
        "pause" => Some(0x13),
        "insert" => Some(0x2D),
        "delete" => Some(0x2E),
        "home" => Some(0x24),
        "end" => Some(0x23),
        _ => None,
    };
    if let Some(vk) = named {
        return Ok(vk);
    }

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_lowercase() {
            return Ok(c.to_ascii_uppercase() as u16);
        }
        if c.is_ascii_digit() {
            return Ok(c as u16);
        }
    }

    // Function keys F1-F12 are 0x70-0x7B
    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u16>().ok()) {
        if (1..=12).contains(&n) {
            return Ok(0x6F + n);
        }
    }

    Err(anyhow!("Unknown key name: '{}'", name))
}

/// Virtual-key codes bound to each operator signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMap {
    pub stop: u16,
    pub run_once: u16,
    pub run_loop: u16,
}

impl KeyMap {
    pub fn from_bindings(keys: &KeyBindings) -> Result<Self> {
        let map = Self {
            stop: parse_key_name(&keys.stop)?,
            run_once: parse_key_name(&keys.run_once)?,
            run_loop: parse_key_name(&keys.run_loop)?,
        };

        if map.stop == map.run_once || map.stop == map.run_loop || map.run_once == map.run_loop {
            return Err(anyhow!(
                "Key bindings must be distinct (stop={}, run_once={}, run_loop={})",
                keys.stop,
                keys.run_once,
                keys.run_loop
            ));
        }
        Ok(map)
    }

    pub fn vk_for(&self, signal: Signal) -> u16 {
        match signal {
            Signal::Stop => self.stop,
            Signal::RunOnce => self.run_once,
            Signal::RunLoop => self.run_loop,
        }
    }
}
