//! Seat input routing
//!
//! Translates wl_seat pointer, keyboard and touch events into the
//! per-window input records the read functions expose. Focus is
//! tracked per input class; surface user data carries a
//! [`SurfaceTarget`] so an event can be routed to its window and
//! clamped to the bounds of the surface it actually hit.

pub mod keymap;

use log::{debug, warn};
use wayland_client::protocol::{
    wl_keyboard::{self, WlKeyboard},
    wl_pointer::{self, WlPointer},
    wl_seat::{self, WlSeat},
    wl_touch::{self, WlTouch},
};
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum};

use crate::backend::BackendState;
use crate::decoration::{ButtonKind, BUTTON_SIZE, TITLE_BAR_HEIGHT};
use crate::driver::{InputState, Key};
use crate::shell::ShellKind;
use crate::window::WindowId;

/// What a surface represents for input routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Window,
    TitleBar,
    Button(ButtonKind),
}

/// Window plus surface role; stored as wl_surface user data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceTarget {
    pub window: WindowId,
    pub kind: TargetKind,
}

/// User data for every wl_surface the backend creates. `None` marks a
/// surface that takes no input (the cursor surface).
pub struct SurfaceData(pub Option<SurfaceTarget>);

/// Input devices obtained from the seat, present while the matching
/// capability is advertised.
#[derive(Default)]
pub struct SeatDevices {
    pub pointer: Option<WlPointer>,
    pub keyboard: Option<WlKeyboard>,
    pub touch: Option<WlTouch>,
}

/// Per-class focus. A destroyed window must be forgotten here so no
/// event routes to a dead record.
#[derive(Debug, Default)]
pub struct InputRouter {
    pub pointer: Option<SurfaceTarget>,
    pub keyboard: Option<WindowId>,
    pub touch: Option<WindowId>,
}

impl InputRouter {
    /// Leave events may arrive for a surface that was never the focus
    /// (enter/leave can race with focus moves); only a leave for the
    /// current focus clears it.
    pub fn pointer_leave(&mut self, target: Option<SurfaceTarget>) {
        if target.is_none() || self.pointer == target {
            self.pointer = None;
        }
    }

    pub fn keyboard_leave(&mut self, window: Option<WindowId>) {
        if window.is_none() || self.keyboard == window {
            self.keyboard = None;
        }
    }

    pub fn forget_window(&mut self, window: WindowId) {
        if self.pointer.map(|t| t.window) == Some(window) {
            self.pointer = None;
        }
        if self.keyboard == Some(window) {
            self.keyboard = None;
        }
        if self.touch == Some(window) {
            self.touch = None;
        }
    }
}

#[derive(Debug, Default)]
pub struct PointerRecord {
    pub x: i32,
    pub y: i32,
    pub left: InputState,
    pub right: InputState,
    pub wheel: InputState,
    pub wheel_diff: i16,
}

impl PointerRecord {
    /// Consume the accumulated discrete scroll delta.
    pub fn take_wheel_diff(&mut self) -> i16 {
        std::mem::take(&mut self.wheel_diff)
    }
}

#[derive(Debug, Default)]
pub struct KeyRecord {
    pub key: Key,
    pub state: InputState,
}

#[derive(Debug, Default)]
pub struct TouchRecord {
    pub x: i32,
    pub y: i32,
    pub state: InputState,
}

/// Everything a window remembers about its input devices.
#[derive(Debug, Default)]
pub struct InputRecord {
    pub pointer: PointerRecord,
    pub keyboard: KeyRecord,
    pub touch: TouchRecord,
}

/// Clamp a surface-local coordinate into the bounds of the surface it
/// landed on. `win_w`/`win_h` are the owning window's dimensions.
pub(crate) fn clamp_for_target(
    kind: TargetKind,
    win_w: i32,
    win_h: i32,
    x: i32,
    y: i32,
) -> (i32, i32) {
    let (max_x, max_y) = match kind {
        TargetKind::Window => (win_w - 1, win_h - 1),
        TargetKind::TitleBar => (win_w - 1, TITLE_BAR_HEIGHT),
        TargetKind::Button(_) => (BUTTON_SIZE, BUTTON_SIZE),
    };
    (x.clamp(0, max_x.max(0)), y.clamp(0, max_y.max(0)))
}

/// One discrete scroll step per axis event, sign following the axis
/// direction.
pub(crate) fn wheel_step(pointer: &mut PointerRecord, value: f64) {
    if value > 0.0 {
        pointer.wheel_diff += 1;
    } else if value < 0.0 {
        pointer.wheel_diff -= 1;
    }
}

/// Map the low nibble of an evdev button code onto the generic
/// three-button model.
pub(crate) fn apply_button_code(pointer: &mut PointerRecord, code: u32, state: InputState) {
    match code & 0xF {
        0 => pointer.left = state,
        1 => pointer.right = state,
        2 => pointer.wheel = state,
        _ => {}
    }
}

fn surface_target(surface: &wayland_client::protocol::wl_surface::WlSurface) -> Option<SurfaceTarget> {
    surface.data::<SurfaceData>().and_then(|data| data.0)
}

impl Dispatch<WlSeat, ()> for BackendState {
    fn event(
        state: &mut Self,
        seat: &WlSeat,
        event: wl_seat::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let wl_seat::Event::Capabilities {
            capabilities: WEnum::Value(caps),
        } = event
        else {
            return;
        };

        if caps.contains(wl_seat::Capability::Pointer) {
            if state.seat.pointer.is_none() {
                debug!("seat gained pointer capability");
                state.seat.pointer = Some(seat.get_pointer(qh, ()));
                if let Some(compositor) = &state.globals.compositor {
                    state.cursor_surface = Some(compositor.create_surface(qh, SurfaceData(None)));
                }
            }
        } else if let Some(pointer) = state.seat.pointer.take() {
            debug!("seat lost pointer capability");
            if pointer.version() >= 3 {
                pointer.release();
            }
            if let Some(surface) = state.cursor_surface.take() {
                surface.destroy();
            }
            state.router.pointer = None;
        }

        if caps.contains(wl_seat::Capability::Keyboard) {
            if state.seat.keyboard.is_none() {
                debug!("seat gained keyboard capability");
                state.seat.keyboard = Some(seat.get_keyboard(qh, ()));
            }
        } else if let Some(keyboard) = state.seat.keyboard.take() {
            debug!("seat lost keyboard capability");
            if keyboard.version() >= 3 {
                keyboard.release();
            }
            state.router.keyboard = None;
        }

        if caps.contains(wl_seat::Capability::Touch) {
            if state.seat.touch.is_none() {
                debug!("seat gained touch capability");
                state.seat.touch = Some(seat.get_touch(qh, ()));
            }
        } else if let Some(touch) = state.seat.touch.take() {
            debug!("seat lost touch capability");
            if touch.version() >= 3 {
                touch.release();
            }
            state.router.touch = None;
        }
    }
}

impl Dispatch<WlPointer, ()> for BackendState {
    fn event(
        state: &mut Self,
        pointer: &WlPointer,
        event: wl_pointer::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_pointer::Event::Enter {
                serial,
                surface,
                surface_x,
                surface_y,
            } => {
                // The seat can gain its pointer before wl_compositor
                // is bound; catch up on the cursor surface here.
                if state.cursor_surface.is_none() {
                    if let Some(compositor) = &state.globals.compositor {
                        state.cursor_surface =
                            Some(compositor.create_surface(qh, SurfaceData(None)));
                    }
                }
                let Some(target) = surface_target(&surface) else {
                    state.router.pointer = None;
                    return;
                };
                state.router.pointer = Some(target);

                let Some((w, h, shell_kind)) = state
                    .window(target.window)
                    .map(|win| (win.width, win.height, win.shell.kind()))
                else {
                    return;
                };
                let (x, y) = clamp_for_target(target.kind, w, h, surface_x as i32, surface_y as i32);
                if let Some(win) = state.window_mut(target.window) {
                    win.input.pointer.x = x;
                    win.input.pointer.y = y;
                }

                let cursor = if target.kind == TargetKind::TitleBar && shell_kind == ShellKind::Xdg
                {
                    "grabbing"
                } else {
                    "left_ptr"
                };
                state.update_cursor(pointer, serial, cursor);
            }
            wl_pointer::Event::Leave { surface, .. } => {
                state.router.pointer_leave(surface_target(&surface));
            }
            wl_pointer::Event::Motion {
                surface_x,
                surface_y,
                ..
            } => {
                let Some(target) = state.router.pointer else {
                    return;
                };
                let Some((w, h)) = state.window(target.window).map(|win| (win.width, win.height))
                else {
                    return;
                };
                let (x, y) = clamp_for_target(target.kind, w, h, surface_x as i32, surface_y as i32);
                if let Some(win) = state.window_mut(target.window) {
                    win.input.pointer.x = x;
                    win.input.pointer.y = y;
                }
            }
            wl_pointer::Event::Button {
                serial,
                button,
                state: button_state,
                ..
            } => {
                let pressed = matches!(button_state, WEnum::Value(wl_pointer::ButtonState::Pressed));
                let input_state = if pressed {
                    InputState::Pressed
                } else {
                    InputState::Released
                };
                let Some(target) = state.router.pointer else {
                    return;
                };
                match target.kind {
                    TargetKind::Window => {
                        if let Some(win) = state.window_mut(target.window) {
                            apply_button_code(&mut win.input.pointer, button, input_state);
                        }
                    }
                    TargetKind::TitleBar => {
                        if !pressed {
                            return;
                        }
                        let Some(seat) = state.globals.seat.clone() else {
                            return;
                        };
                        if let Some(win) = state.window_mut(target.window) {
                            win.shell.request_move(&seat, serial);
                            win.life.flush_pending = true;
                        }
                    }
                    TargetKind::Button(kind) => {
                        // Activate on release, like any ordinary button.
                        if pressed {
                            return;
                        }
                        if let Some(win) = state.window_mut(target.window) {
                            match kind {
                                ButtonKind::Close => win.request_close(),
                                ButtonKind::Minimize => {
                                    if win.shell.request_minimize() {
                                        win.life.flush_pending = true;
                                    }
                                }
                            }
                        }
                    }
                }
            }
            wl_pointer::Event::Axis { axis, value, .. } => {
                if axis != WEnum::Value(wl_pointer::Axis::VerticalScroll) {
                    return;
                }
                let Some(target) = state.router.pointer else {
                    return;
                };
                if let Some(win) = state.window_mut(target.window) {
                    wheel_step(&mut win.input.pointer, value);
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<WlKeyboard, ()> for BackendState {
    fn event(
        state: &mut Self,
        _keyboard: &WlKeyboard,
        event: wl_keyboard::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                if format != WEnum::Value(wl_keyboard::KeymapFormat::XkbV1) {
                    warn!("ignoring keymap in unsupported format {:?}", format);
                    return;
                }
                if let Err(err) = state.keymap.load_from_fd(fd, size as usize) {
                    warn!("keymap update rejected: {:#}", err);
                }
            }
            wl_keyboard::Event::Enter { surface, .. } => {
                state.router.keyboard = surface_target(&surface).map(|t| t.window);
            }
            wl_keyboard::Event::Leave { surface, .. } => {
                state
                    .router
                    .keyboard_leave(surface_target(&surface).map(|t| t.window));
            }
            wl_keyboard::Event::Key {
                key,
                state: key_state,
                ..
            } => {
                let Some(focus) = state.router.keyboard else {
                    return;
                };
                let Some(translated) = state.keymap.translate(key) else {
                    return;
                };
                if let Some(win) = state.window_mut(focus) {
                    win.input.keyboard.key = translated;
                    win.input.keyboard.state =
                        if matches!(key_state, WEnum::Value(wl_keyboard::KeyState::Pressed)) {
                            InputState::Pressed
                        } else {
                            InputState::Released
                        };
                }
            }
            wl_keyboard::Event::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
                ..
            } => {
                state
                    .keymap
                    .update_modifiers(mods_depressed, mods_latched, mods_locked, group);
            }
            _ => {}
        }
    }
}

impl Dispatch<WlTouch, ()> for BackendState {
    fn event(
        state: &mut Self,
        _touch: &WlTouch,
        event: wl_touch::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            // Single contact model: the first contact wins, extra
            // touch points just overwrite it.
            wl_touch::Event::Down { surface, x, y, .. } => {
                let Some(target) = surface_target(&surface) else {
                    return;
                };
                state.router.touch = Some(target.window);
                if let Some(win) = state.window_mut(target.window) {
                    win.input.touch.x = x as i32;
                    win.input.touch.y = y as i32;
                    win.input.touch.state = InputState::Pressed;
                }
            }
            wl_touch::Event::Up { .. } => {
                let Some(focus) = state.router.touch.take() else {
                    return;
                };
                if let Some(win) = state.window_mut(focus) {
                    win.input.touch.state = InputState::Released;
                }
            }
            wl_touch::Event::Motion { x, y, .. } => {
                let Some(focus) = state.router.touch else {
                    return;
                };
                if let Some(win) = state.window_mut(focus) {
                    win.input.touch.x = x as i32;
                    win.input.touch.y = y as i32;
                }
            }
            _ => {}
        }
    }
}
