//! Shell-protocol abstraction
//!
//! A window's surface must be declared a toplevel through whichever
//! shell protocol the compositor offers. The [`Shell`] trait covers
//! the operations the backend needs (title, interactive move,
//! minimize, teardown); one implementation exists per protocol and the
//! variant is chosen once at window creation, preferring xdg-shell and
//! falling back to the legacy wl_shell.

use log::{debug, warn};
use wayland_client::protocol::{wl_seat::WlSeat, wl_shell_surface, wl_surface::WlSurface};
use wayland_client::{Dispatch, QueueHandle};
use wayland_protocols::xdg::shell::client::{xdg_surface, xdg_toplevel, xdg_wm_base};

use crate::backend::BackendState;
use crate::error::BackendError;
use crate::registry::Globals;
use crate::window::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Xdg,
    WlShell,
}

/// One toplevel binding on a shell protocol.
pub trait Shell {
    fn kind(&self) -> ShellKind;
    fn set_title(&self, title: &str);
    fn request_move(&self, seat: &WlSeat, serial: u32);
    /// Ask the compositor to minimize. Returns whether a request was
    /// issued (wl_shell has no minimize).
    fn request_minimize(&self) -> bool;
    fn destroy(&self);
}

/// xdg-shell toplevel: xdg_surface plus its xdg_toplevel role object.
pub struct XdgShell {
    surface: xdg_surface::XdgSurface,
    toplevel: xdg_toplevel::XdgToplevel,
}

impl Shell for XdgShell {
    fn kind(&self) -> ShellKind {
        ShellKind::Xdg
    }

    fn set_title(&self, title: &str) {
        self.toplevel.set_title(title.to_string());
    }

    fn request_move(&self, seat: &WlSeat, serial: u32) {
        self.toplevel._move(seat, serial);
    }

    fn request_minimize(&self) -> bool {
        self.toplevel.set_minimized();
        true
    }

    fn destroy(&self) {
        self.toplevel.destroy();
        self.surface.destroy();
    }
}

/// Legacy wl_shell toplevel.
pub struct LegacyShell {
    surface: wl_shell_surface::WlShellSurface,
}

impl Shell for LegacyShell {
    fn kind(&self) -> ShellKind {
        ShellKind::WlShell
    }

    fn set_title(&self, title: &str) {
        self.surface.set_title(title.to_string());
    }

    fn request_move(&self, seat: &WlSeat, serial: u32) {
        self.surface._move(seat, serial);
    }

    fn request_minimize(&self) -> bool {
        false
    }

    fn destroy(&self) {
        // wl_shell_surface has no destructor request; the proxy is
        // simply dropped with the window.
    }
}

/// Bind `surface` as a toplevel on the best available shell protocol.
pub fn bind_toplevel(
    globals: &Globals,
    qh: &QueueHandle<BackendState>,
    surface: &WlSurface,
    window: WindowId,
    title: &str,
) -> Result<Box<dyn Shell>, BackendError> {
    if let Some(wm) = &globals.xdg_wm {
        let xdg_surface = wm.get_xdg_surface(surface, qh, ());
        let toplevel = xdg_surface.get_toplevel(qh, window);
        toplevel.set_title(title.to_string());
        toplevel.set_app_id(title.to_string());
        debug!("bound window {} as xdg_toplevel", window.0);
        return Ok(Box::new(XdgShell {
            surface: xdg_surface,
            toplevel,
        }));
    }

    if let Some(shell) = &globals.wl_shell {
        let shell_surface = shell.get_shell_surface(surface, qh, window);
        shell_surface.set_toplevel();
        shell_surface.set_title(title.to_string());
        debug!("bound window {} as wl_shell toplevel", window.0);
        return Ok(Box::new(LegacyShell {
            surface: shell_surface,
        }));
    }

    warn!("no shell protocol available; cannot create a toplevel");
    Err(BackendError::NoShell)
}

impl Dispatch<xdg_wm_base::XdgWmBase, ()> for BackendState {
    fn event(
        _state: &mut Self,
        wm: &xdg_wm_base::XdgWmBase,
        event: xdg_wm_base::Event,
        _data: &(),
        _conn: &wayland_client::Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm.pong(serial);
        }
    }
}

impl Dispatch<xdg_surface::XdgSurface, ()> for BackendState {
    fn event(
        _state: &mut Self,
        surface: &xdg_surface::XdgSurface,
        event: xdg_surface::Event,
        _data: &(),
        _conn: &wayland_client::Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            surface.ack_configure(serial);
        }
    }
}

impl Dispatch<xdg_toplevel::XdgToplevel, WindowId> for BackendState {
    fn event(
        state: &mut Self,
        _toplevel: &xdg_toplevel::XdgToplevel,
        event: xdg_toplevel::Event,
        window: &WindowId,
        _conn: &wayland_client::Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, .. } => {
                // Resize is unhandled: the backing buffer keeps its
                // creation size.
                if width != 0 && height != 0 {
                    debug!(
                        "ignoring configure to {}x{} for window {}",
                        width, height, window.0
                    );
                }
            }
            xdg_toplevel::Event::Close => {
                if let Some(win) = state.window_mut(*window) {
                    win.request_close();
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_shell_surface::WlShellSurface, WindowId> for BackendState {
    fn event(
        _state: &mut Self,
        surface: &wl_shell_surface::WlShellSurface,
        event: wl_shell_surface::Event,
        _window: &WindowId,
        _conn: &wayland_client::Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_shell_surface::Event::Ping { serial } = event {
            surface.pong(serial);
        }
    }
}
