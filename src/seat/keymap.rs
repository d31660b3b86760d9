//! Keymap compilation and key-symbol translation
//!
//! The compositor ships a keymap description over the wire; we compile
//! it with xkbcommon and keep a live modifier state next to it. A new
//! keymap replaces the previous pair only after both the keymap and
//! its state exist, so key translation never observes a half-updated
//! replacement; a failed compilation leaves whatever was valid before
//! fully intact.

use std::fs::File;
use std::os::fd::OwnedFd;

use anyhow::{anyhow, Context as _, Result};
use memmap2::MmapOptions;
use xkbcommon::xkb;

use crate::driver::Key;

/// Raw wl_keyboard key codes are evdev codes; xkb keycodes sit 8 above.
const EVDEV_KEYCODE_OFFSET: u32 = 8;

/// Compiled keymap plus live modifier state.
pub struct KeymapState {
    context: xkb::Context,
    keymap: Option<xkb::Keymap>,
    state: Option<xkb::State>,
}

impl KeymapState {
    pub fn new() -> Self {
        Self {
            context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
            keymap: None,
            state: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.keymap.is_some()
    }

    /// Compile a keymap received as a sealed fd from the compositor.
    /// The mapping is read-only and released before returning.
    pub fn load_from_fd(&mut self, fd: OwnedFd, size: usize) -> Result<()> {
        let file = File::from(fd);
        let map = unsafe {
            MmapOptions::new()
                .len(size)
                .map_copy_read_only(&file)
                .context("failed to map keymap fd")?
        };
        let text = std::str::from_utf8(&map).context("keymap is not valid UTF-8")?;
        self.load_source(text)
    }

    /// Compile a keymap from its textual form and atomically swap it
    /// in. On failure the previous keymap and state stay in place.
    pub fn load_source(&mut self, text: &str) -> Result<()> {
        let keymap = xkb::Keymap::new_from_string(
            &self.context,
            text.trim_end_matches('\0').to_string(),
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| anyhow!("failed to compile keymap"))?;
        let state = xkb::State::new(&keymap);

        self.keymap = Some(keymap);
        self.state = Some(state);
        Ok(())
    }

    /// Translate a raw wl_keyboard key code to a logical key. Returns
    /// `None` with no keymap loaded or for symbols outside the mapped
    /// set.
    pub fn translate(&self, raw_code: u32) -> Option<Key> {
        let state = self.state.as_ref()?;
        let sym = state.key_get_one_sym((raw_code + EVDEV_KEYCODE_OFFSET).into());
        map_keysym(u32::from(sym))
    }

    /// Feed a wl_keyboard modifiers event into the live state. Ignored
    /// while no keymap is loaded.
    pub fn update_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32) {
        if self.keymap.is_none() {
            return;
        }
        if let Some(state) = self.state.as_mut() {
            state.update_mask(depressed, latched, locked, 0, 0, group);
        }
    }
}

impl Default for KeymapState {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an xkb keysym to the GUI library's logical key code. Printable
/// ASCII and keypad digits pass through; named navigation and editing
/// keys map individually; everything else is unreported.
#[allow(non_upper_case_globals)]
pub fn map_keysym(sym: u32) -> Option<Key> {
    use xkb::keysyms::*;

    if (KEY_space..=KEY_asciitilde).contains(&sym) {
        return Some(Key(sym));
    }
    if (KEY_KP_0..=KEY_KP_9).contains(&sym) {
        return Some(Key(sym & 0x003f));
    }

    let key = match sym {
        KEY_BackSpace => Key::BACKSPACE,
        KEY_Return | KEY_KP_Enter => Key::ENTER,
        KEY_Escape => Key::ESC,
        KEY_Delete | KEY_KP_Delete => Key::DEL,
        KEY_Home | KEY_KP_Home => Key::HOME,
        KEY_Left | KEY_KP_Left => Key::LEFT,
        KEY_Up | KEY_KP_Up => Key::UP,
        KEY_Right | KEY_KP_Right => Key::RIGHT,
        KEY_Down | KEY_KP_Down => Key::DOWN,
        KEY_Prior | KEY_KP_Prior => Key::PREV,
        KEY_Next | KEY_KP_Next | KEY_Tab | KEY_KP_Tab => Key::NEXT,
        KEY_End | KEY_KP_End => Key::END,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xkb::keysyms;

    /// A default US keymap in textual form, or `None` when the host
    /// has no xkb data files.
    fn us_keymap_source() -> Option<String> {
        let ctx = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb::Keymap::new_from_names(
            &ctx,
            "",
            "",
            "us",
            "",
            None,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )?;
        Some(keymap.get_as_string(xkb::KEYMAP_FORMAT_TEXT_V1))
    }

    #[test]
    fn printable_range_passes_through() {
        assert_eq!(map_keysym(keysyms::KEY_space), Some(Key(0x20)));
        assert_eq!(map_keysym(keysyms::KEY_a), Some(Key(b'a' as u32)));
        assert_eq!(map_keysym(keysyms::KEY_asciitilde), Some(Key(0x7e)));
    }

    #[test]
    fn keypad_digits_map_to_ascii() {
        assert_eq!(map_keysym(keysyms::KEY_KP_0), Some(Key(b'0' as u32)));
        assert_eq!(map_keysym(keysyms::KEY_KP_9), Some(Key(b'9' as u32)));
    }

    #[test]
    fn named_keys_map_individually() {
        assert_eq!(map_keysym(keysyms::KEY_Escape), Some(Key::ESC));
        assert_eq!(map_keysym(keysyms::KEY_KP_Enter), Some(Key::ENTER));
        assert_eq!(map_keysym(keysyms::KEY_Tab), Some(Key::NEXT));
        assert_eq!(map_keysym(keysyms::KEY_Prior), Some(Key::PREV));
    }

    #[test]
    fn unmapped_symbols_are_unreported() {
        assert_eq!(map_keysym(keysyms::KEY_F1), None);
        assert_eq!(map_keysym(keysyms::KEY_Shift_L), None);
        assert_eq!(map_keysym(0), None);
    }

    #[test]
    fn failed_compilation_retains_previous_keymap() {
        let mut km = KeymapState::new();
        assert!(!km.is_loaded());
        assert!(km.load_source("definitely not a keymap").is_err());
        assert!(!km.is_loaded());

        let Some(source) = us_keymap_source() else {
            return; // no xkb data on this host
        };
        km.load_source(&source).unwrap();
        assert!(km.is_loaded());

        // A bad replacement leaves the compiled keymap functional.
        assert!(km.load_source("xkb_keymap { garbage").is_err());
        assert!(km.is_loaded());
        assert!(km.translate(1).is_some());
    }

    #[test]
    fn translate_applies_evdev_offset() {
        let Some(source) = us_keymap_source() else {
            return;
        };
        let mut km = KeymapState::new();
        km.load_source(&source).unwrap();

        // evdev code 1 (+8 = xkb keycode 9) is Escape on a US keymap.
        assert_eq!(km.translate(1), Some(Key::ESC));
        // evdev code 30 is 'a'.
        assert_eq!(km.translate(30), Some(Key(b'a' as u32)));
    }

    #[test]
    fn translate_without_keymap_is_inert() {
        let km = KeymapState::new();
        assert_eq!(km.translate(1), None);
    }

    #[test]
    fn modifiers_ignored_without_keymap() {
        let mut km = KeymapState::new();
        km.update_modifiers(1, 0, 0, 0); // must not panic
        assert!(!km.is_loaded());
    }
}
