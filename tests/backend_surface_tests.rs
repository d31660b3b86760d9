//! Integration tests for the public backend surface
//!
//! Everything here runs without a compositor: format negotiation,
//! keysym mapping, configuration and the connection-failure path.

use anyhow::Result;
use serial_test::serial;
use wayland_client::protocol::wl_shm;

use waybridge::config::BackendConfig;
use waybridge::driver::{DisplayDriver, Key};
use waybridge::error::BackendError;
use waybridge::pixel::{ColorDepth, FormatNegotiation, PixelFormat};
use waybridge::seat::keymap::map_keysym;
use waybridge::Area;

#[test]
fn argb_wins_over_xrgb_regardless_of_announcement_order() {
    let mut early = FormatNegotiation::new(ColorDepth::Depth32);
    early.offer(wl_shm::Format::Argb8888);
    early.offer(wl_shm::Format::Xrgb8888);
    assert_eq!(early.chosen(), Some(PixelFormat::Argb8888));

    let mut late = FormatNegotiation::new(ColorDepth::Depth32);
    late.offer(wl_shm::Format::Xrgb8888);
    late.offer(wl_shm::Format::Argb8888);
    assert_eq!(late.chosen(), Some(PixelFormat::Argb8888));
}

#[test]
fn negotiation_ignores_formats_for_other_depths() {
    let mut nego = FormatNegotiation::new(ColorDepth::Depth16);
    nego.offer(wl_shm::Format::Argb8888);
    nego.offer(wl_shm::Format::Rgb332);
    assert_eq!(nego.chosen(), None);
    nego.offer(wl_shm::Format::Rgb565);
    assert_eq!(nego.chosen(), Some(PixelFormat::Rgb565));
}

#[test]
fn printable_ascii_passes_through_keysym_mapping() {
    assert_eq!(map_keysym('a' as u32), Some(Key('a' as u32)));
    assert_eq!(map_keysym(' ' as u32), Some(Key(' ' as u32)));
    assert_eq!(map_keysym('~' as u32), Some(Key('~' as u32)));
}

#[test]
fn navigation_keysyms_map_to_control_codes() {
    // XK_Return, XK_Escape, XK_Left, XK_BackSpace.
    assert_eq!(map_keysym(0xFF0D), Some(Key::ENTER));
    assert_eq!(map_keysym(0xFF1B), Some(Key::ESC));
    assert_eq!(map_keysym(0xFF51), Some(Key::LEFT));
    assert_eq!(map_keysym(0xFF08), Some(Key::BACKSPACE));
}

#[test]
fn rotated_driver_swaps_window_dimensions() {
    let mut driver = DisplayDriver::new(480, 320);
    driver.rotated = true;
    assert_eq!(driver.effective_hor_res(), 320);
    assert_eq!(driver.effective_ver_res(), 480);
    assert!(driver.window_id().is_none());
}

#[test]
fn area_outside_display_is_detected() {
    let area = Area::new(320, 0, 329, 9);
    assert!(area.is_outside(320, 240));
    let inside = Area::new(310, 230, 329, 249);
    assert!(!inside.is_outside(320, 240));
}

#[test]
#[serial]
fn connect_fails_cleanly_without_a_display() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let saved_display = std::env::var_os("WAYLAND_DISPLAY");
    let saved_runtime = std::env::var_os("XDG_RUNTIME_DIR");
    std::env::remove_var("WAYLAND_DISPLAY");
    std::env::remove_var("WAYLAND_SOCKET");
    let runtime = tempfile::tempdir()?;
    std::env::set_var("XDG_RUNTIME_DIR", runtime.path());

    let result = waybridge::Backend::new(BackendConfig::default());
    assert!(matches!(result, Err(BackendError::Connect(_))));

    match saved_display {
        Some(v) => std::env::set_var("WAYLAND_DISPLAY", v),
        None => std::env::remove_var("WAYLAND_DISPLAY"),
    }
    match saved_runtime {
        Some(v) => std::env::set_var("XDG_RUNTIME_DIR", v),
        None => std::env::remove_var("XDG_RUNTIME_DIR"),
    }
    Ok(())
}
