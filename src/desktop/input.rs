//! Mouse, keyboard and clipboard primitives over enigo and arboard.
//!
//! Everything here is fire-and-forget with a short fixed settle; whether an
//! interaction "worked" is for the caller to observe through wait
//! conditions. Text always enters through the clipboard in one paste -
//! per-character typing corrupts emoji and trips search-as-you-type UIs.

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

use super::window::WindowInfo;

/// Delay between moving the pointer and clicking, and between key events
/// inside a chord.
const INPUT_SETTLE: Duration = Duration::from_millis(50);
/// Delay between writing the clipboard and pasting it.
const CLIPBOARD_SETTLE: Duration = Duration::from_millis(300);

pub struct Input {
    enigo: Enigo,
}

impl Input {
    pub fn new() -> anyhow::Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow!("failed to create input backend: {:?}", e))?;
        Ok(Self { enigo })
    }

    pub fn click_at(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| anyhow!("failed to move mouse: {:?}", e))?;
        thread::sleep(INPUT_SETTLE);
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| anyhow!("failed to click: {:?}", e))
    }

    /// Click at a fixed offset from the window origin.
    pub fn click_offset(&mut self, win: &WindowInfo, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.click_at(win.x + dx, win.y + dy)
    }

    /// Click at a fraction of the window's width/height.
    pub fn click_ratio(&mut self, win: &WindowInfo, rx: f32, ry: f32) -> anyhow::Result<()> {
        let x = win.x + (win.width as f32 * rx) as i32;
        let y = win.y + (win.height as f32 * ry) as i32;
        self.click_at(x, y)
    }

    pub fn press(&mut self, key: Key) -> anyhow::Result<()> {
        self.enigo
            .key(key, Direction::Click)
            .map_err(|e| anyhow!("failed to press key: {:?}", e))
    }

    /// Dispatch a key chord written as `"Ctrl+V"`, `"Alt+Tab"`, `"Enter"`.
    /// Modifiers are held in order, the final key tapped, modifiers released
    /// in reverse.
    pub fn send_keys(&mut self, chord: &str) -> anyhow::Result<()> {
        let (modifiers, key) = parse_chord(chord)?;
        for m in &modifiers {
            self.enigo
                .key(*m, Direction::Press)
                .map_err(|e| anyhow!("failed to hold modifier: {:?}", e))?;
        }
        thread::sleep(Duration::from_millis(20));
        let tap = self.press(key);
        thread::sleep(Duration::from_millis(20));
        for m in modifiers.iter().rev() {
            self.enigo
                .key(*m, Direction::Release)
                .map_err(|e| anyhow!("failed to release modifier: {:?}", e))?;
        }
        tap
    }

    /// Put `text` on the system clipboard and paste it with Ctrl+V.
    ///
    /// Mutates the shared clipboard; callers must treat it as a contended
    /// resource and not expect prior contents to survive.
    pub fn paste_text(&mut self, text: &str) -> anyhow::Result<()> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| anyhow!("clipboard unavailable: {}", e))?;
        clipboard
            .set_text(text)
            .context("failed to write clipboard")?;
        thread::sleep(CLIPBOARD_SETTLE);
        self.send_keys("Ctrl+V")
    }
}

fn parse_chord(chord: &str) -> anyhow::Result<(Vec<Key>, Key)> {
    let mut tokens: Vec<&str> = chord.split('+').map(str::trim).collect();
    let last = tokens
        .pop()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("empty key chord"))?;
    let key = key_from_token(last).ok_or_else(|| anyhow!("unknown key '{last}' in '{chord}'"))?;
    let modifiers = tokens
        .iter()
        .map(|t| modifier_from_token(t).ok_or_else(|| anyhow!("unknown modifier '{t}' in '{chord}'")))
        .collect::<anyhow::Result<Vec<Key>>>()?;
    Ok((modifiers, key))
}

fn modifier_from_token(token: &str) -> Option<Key> {
    match token.to_lowercase().as_str() {
        "ctrl" | "control" => Some(Key::Control),
        "alt" => Some(Key::Alt),
        "shift" => Some(Key::Shift),
        "meta" | "win" | "super" | "cmd" | "command" => Some(Key::Meta),
        _ => None,
    }
}

fn key_from_token(token: &str) -> Option<Key> {
    let lower = token.to_lowercase();
    match lower.as_str() {
        "enter" | "return" => Some(Key::Return),
        "tab" => Some(Key::Tab),
        "escape" | "esc" => Some(Key::Escape),
        "space" => Some(Key::Space),
        "backspace" => Some(Key::Backspace),
        "delete" | "del" => Some(Key::Delete),
        "up" => Some(Key::UpArrow),
        "down" => Some(Key::DownArrow),
        "left" => Some(Key::LeftArrow),
        "right" => Some(Key::RightArrow),
        "home" => Some(Key::Home),
        "end" => Some(Key::End),
        "pageup" => Some(Key::PageUp),
        "pagedown" => Some(Key::PageDown),
        _ => {
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => Some(Key::Unicode(c)),
                _ => modifier_from_token(&lower),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chords_parse_modifiers_in_order() {
        let (mods, key) = parse_chord("Ctrl+Shift+V").unwrap();
        assert_eq!(mods, vec![Key::Control, Key::Shift]);
        assert_eq!(key, Key::Unicode('v'));
    }

    #[test]
    fn bare_keys_parse_without_modifiers() {
        assert_eq!(parse_chord("Enter").unwrap(), (vec![], Key::Return));
        assert_eq!(parse_chord("down").unwrap(), (vec![], Key::DownArrow));
        assert_eq!(parse_chord("Win+D").unwrap(), (vec![Key::Meta], Key::Unicode('d')));
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!(parse_chord("Ctrl+Frobnicate").is_err());
        assert!(parse_chord("").is_err());
        assert!(parse_chord("Hyper+X").is_err());
    }
}
