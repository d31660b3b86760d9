//! Global discovery and binding
//!
//! Binds the protocol globals the backend depends on as the registry
//! announces them, records the shm pixel formats the compositor
//! offers, and loads the cursor theme once wl_shm is available.

use log::{debug, warn};
use wayland_client::protocol::{
    wl_buffer::WlBuffer,
    wl_compositor::WlCompositor,
    wl_registry::{self, WlRegistry},
    wl_seat::WlSeat,
    wl_shell::WlShell,
    wl_shm::{self, WlShm},
    wl_shm_pool::WlShmPool,
    wl_subcompositor::WlSubcompositor,
    wl_subsurface::WlSubsurface,
};
use wayland_client::{delegate_noop, Connection, Dispatch, QueueHandle, WEnum};
use wayland_cursor::CursorTheme;
use wayland_protocols::xdg::shell::client::xdg_wm_base::XdgWmBase;

use crate::backend::BackendState;

/// Bound globals. Compositor, shm and at least one shell protocol
/// (xdg preferred) are mandatory for the backend to come up.
#[derive(Default)]
pub struct Globals {
    pub compositor: Option<WlCompositor>,
    pub subcompositor: Option<WlSubcompositor>,
    pub shm: Option<WlShm>,
    pub seat: Option<WlSeat>,
    pub xdg_wm: Option<XdgWmBase>,
    pub wl_shell: Option<WlShell>,
}

impl Dispatch<WlRegistry, ()> for BackendState {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _data: &(),
        conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let wl_registry::Event::Global {
            name,
            interface,
            version,
        } = event
        else {
            return;
        };

        match interface.as_str() {
            "wl_compositor" => {
                debug!("binding wl_compositor");
                state.globals.compositor = Some(registry.bind(name, 1, qh, ()));
            }
            "wl_subcompositor" => {
                debug!("binding wl_subcompositor");
                state.globals.subcompositor = Some(registry.bind(name, 1, qh, ()));
            }
            "wl_shm" => {
                debug!("binding wl_shm");
                let shm: WlShm = registry.bind(name, 1, qh, ());
                match CursorTheme::load(conn, shm.clone(), state.config.cursor_size) {
                    Ok(theme) => state.cursor_theme = Some(theme),
                    Err(err) => warn!("no cursor theme, pointer stays unset: {}", err),
                }
                state.globals.shm = Some(shm);
            }
            "wl_seat" => {
                debug!("binding wl_seat v{}", version.min(5));
                state.globals.seat = Some(registry.bind(name, version.min(5), qh, ()));
            }
            "xdg_wm_base" => {
                debug!("binding xdg_wm_base");
                state.globals.xdg_wm = Some(registry.bind(name, version.min(2), qh, ()));
            }
            "wl_shell" => {
                debug!("binding wl_shell");
                state.globals.wl_shell = Some(registry.bind(name, 1, qh, ()));
            }
            _ => {}
        }
    }
}

impl Dispatch<WlShm, ()> for BackendState {
    fn event(
        state: &mut Self,
        _shm: &WlShm,
        event: wl_shm::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_shm::Event::Format {
            format: WEnum::Value(format),
        } = event
        {
            state.formats.offer(format);
        }
    }
}

delegate_noop!(BackendState: WlCompositor);
delegate_noop!(BackendState: WlSubcompositor);
delegate_noop!(BackendState: WlShmPool);
delegate_noop!(BackendState: WlSubsurface);
delegate_noop!(BackendState: WlShell);
delegate_noop!(BackendState: ignore WlBuffer);
