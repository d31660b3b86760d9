//! Backend context and the frame cycle coordinator
//!
//! [`Backend`] owns the connection, its event queue and all protocol
//! state. Drawing is pull-driven by the rendering library: `draw`
//! blits rendered areas into the window's shared memory and commits on
//! the final area of a frame, `render_complete` runs the barrier and
//! the tick's single flush/read/dispatch round, and the read functions
//! hand the routed input back out.

use log::{debug, info, warn};
use wayland_client::backend::WaylandError;
use wayland_client::protocol::{wl_buffer::WlBuffer, wl_pointer::WlPointer, wl_surface::WlSurface};
use wayland_client::{Connection, EventQueue, QueueHandle};
use wayland_cursor::CursorTheme;

use crate::area::Area;
use crate::config::BackendConfig;
use crate::driver::{AxisData, DisplayDriver, KeyData, Point, PointerData, TouchData};
use crate::error::BackendError;
use crate::pixel::{self, FormatNegotiation, Rgba};
use crate::registry::Globals;
use crate::seat::keymap::KeymapState;
use crate::seat::{InputRouter, SeatDevices};
use crate::window::{self, CycleAction, CycleDecision, Window, WindowId};

/// Everything event dispatch mutates. Kept separate from [`Backend`]
/// so the queue can borrow it while the connection stays accessible.
pub struct BackendState {
    pub(crate) config: BackendConfig,
    pub(crate) globals: Globals,
    pub(crate) formats: FormatNegotiation,
    pub(crate) seat: SeatDevices,
    pub(crate) keymap: KeymapState,
    pub(crate) router: InputRouter,
    pub(crate) windows: Vec<Window>,
    next_window_id: u32,
    pub(crate) cursor_theme: Option<CursorTheme>,
    pub(crate) cursor_surface: Option<WlSurface>,
    /// A cursor commit happened outside any window's frame; folded
    /// into the next barrier's flush decision.
    pub(crate) cursor_flush_pending: bool,
}

impl BackendState {
    fn new(config: BackendConfig) -> Self {
        let depth = config.color_depth;
        Self {
            config,
            globals: Globals::default(),
            formats: FormatNegotiation::new(depth),
            seat: SeatDevices::default(),
            keymap: KeymapState::new(),
            router: InputRouter::default(),
            windows: Vec::new(),
            next_window_id: 0,
            cursor_theme: None,
            cursor_surface: None,
            cursor_flush_pending: false,
        }
    }

    pub(crate) fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|win| win.id == id)
    }

    pub(crate) fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|win| win.id == id)
    }

    /// Attach the named theme cursor to the pointer. Missing theme or
    /// cursor leaves the pointer image as-is.
    pub(crate) fn update_cursor(&mut self, pointer: &WlPointer, serial: u32, name: &str) {
        let Some(theme) = self.cursor_theme.as_mut() else {
            return;
        };
        let Some(surface) = self.cursor_surface.as_ref() else {
            return;
        };
        let Some(cursor) = theme.get_cursor(name) else {
            debug!("cursor '{}' not present in theme", name);
            return;
        };
        let image = &cursor[0];
        let (hot_x, hot_y) = image.hotspot();
        let (width, height) = image.dimensions();
        pointer.set_cursor(serial, Some(surface), hot_x as i32, hot_y as i32);
        let buffer: &WlBuffer = image;
        surface.attach(Some(buffer), 0, 0);
        surface.damage(0, 0, width as i32, height as i32);
        surface.commit();
        self.cursor_flush_pending = true;
    }
}

pub struct Backend {
    conn: Connection,
    queue: EventQueue<BackendState>,
    qh: QueueHandle<BackendState>,
    state: BackendState,
}

impl Backend {
    /// Connect to the compositor named by the environment, bind the
    /// globals and verify a usable pixel format was offered.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        // Fail before connecting if window creation could never
        // allocate its backing storage.
        config.resolve_runtime_dir()?;

        let conn = Connection::connect_to_env()?;
        let mut queue = conn.new_event_queue();
        let qh = queue.handle();
        let _registry = conn.display().get_registry(&qh, ());

        let mut state = BackendState::new(config);
        // First pass announces the globals, second delivers the shm
        // formats and seat capabilities of what got bound.
        queue.roundtrip(&mut state)?;
        queue.roundtrip(&mut state)?;

        if state.globals.compositor.is_none() {
            return Err(BackendError::MissingGlobal("wl_compositor"));
        }
        if state.globals.shm.is_none() {
            return Err(BackendError::MissingGlobal("wl_shm"));
        }
        if state.globals.xdg_wm.is_none() && state.globals.wl_shell.is_none() {
            return Err(BackendError::NoShell);
        }
        let format = state
            .formats
            .chosen()
            .ok_or(BackendError::NoPixelFormat(state.formats.depth()))?;

        info!("✅ connected, rendering {:?}", format);
        Ok(Self {
            conn,
            queue,
            qh,
            state,
        })
    }

    /// Blit one rendered area of `driver`'s frame into its window,
    /// creating the window on the first call. `last` marks the final
    /// area of the frame and triggers the commit.
    pub fn draw(
        &mut self,
        driver: &mut DisplayDriver,
        area: Area,
        pixels: &[Rgba],
        last: bool,
    ) -> Result<(), BackendError> {
        let hor_res = driver.effective_hor_res();
        let ver_res = driver.effective_ver_res();
        let format = self
            .state
            .formats
            .chosen()
            .ok_or(BackendError::NoPixelFormat(self.state.formats.depth()))?;

        let id = match driver.window {
            Some(id) => id,
            None => {
                let id = WindowId(self.state.next_window_id);
                let mut window = Window::create(
                    &self.state.globals,
                    &self.state.config,
                    format,
                    &self.qh,
                    id,
                    hor_res,
                    ver_res,
                )?;
                window.monitor_cb = driver.monitor_cb.take();
                self.state.next_window_id += 1;
                self.state.windows.push(window);
                driver.window = Some(id);
                id
            }
        };

        let Some(win) = self.state.window_mut(id) else {
            return Ok(());
        };
        // A closing window still acknowledges draws so the rendering
        // library never stalls on it.
        if win.life.closed || win.life.shall_close {
            return Ok(());
        }
        if area.is_outside(hor_res, ver_res) {
            return Ok(());
        }

        if let Some(map) = win.pixel_region(format) {
            pixel::blit(map, format, hor_res, ver_res, area, pixels);
        }
        win.push_damage(area);
        if last {
            win.commit_frame();
        }
        Ok(())
    }

    /// One window finished its frame. Runs close teardown or the
    /// render-complete callback for that window and, once every window
    /// has reported, the tick's single flush/read/dispatch round.
    pub fn render_complete(
        &mut self,
        driver: &DisplayDriver,
        time_ms: u32,
        px_rendered: u32,
    ) -> Result<(), BackendError> {
        let Some(id) = driver.window else {
            return Ok(());
        };
        let action = match self.state.window_mut(id) {
            Some(win) => window::begin_cycle(&mut win.life),
            None => return Ok(()),
        };
        match action {
            CycleAction::Teardown => {
                if let Some(win) = self.state.window_mut(id) {
                    win.destroy();
                }
                self.state.router.forget_window(id);
                info!("🪟 window {} closed", id.0);
            }
            CycleAction::Callback => {
                // Closed windows keep reporting; their callback stays
                // live until the process exits.
                if let Some(win) = self.state.window_mut(id) {
                    if let Some(cb) = win.monitor_cb.as_mut() {
                        cb(time_ms, px_rendered);
                    }
                }
            }
        }

        let mut lives: Vec<_> = self
            .state
            .windows
            .iter_mut()
            .map(|win| &mut win.life)
            .collect();
        let shall_flush = match window::cycle_barrier(&mut lives, self.state.cursor_flush_pending) {
            CycleDecision::Waiting => return Ok(()),
            CycleDecision::Flush { shall_flush } => shall_flush,
        };

        // Register as the queue's reader; anything already buffered is
        // dispatched until registration succeeds.
        let guard = loop {
            match self.queue.prepare_read() {
                Some(guard) => break guard,
                None => {
                    self.queue.dispatch_pending(&mut self.state)?;
                }
            }
        };

        if shall_flush {
            self.conn.flush()?;
            self.state.cursor_flush_pending = false;
        }

        if let Err(err) = guard.read() {
            // An empty socket reports WouldBlock, which simply means
            // no events arrived this tick.
            match err {
                WaylandError::Io(ref io) if io.kind() == std::io::ErrorKind::WouldBlock => {}
                other => return Err(other.into()),
            }
        }
        self.queue.dispatch_pending(&mut self.state)?;

        if !self.state.windows.is_empty() && self.state.windows.iter().all(|win| win.life.closed) {
            info!("💤 all windows closed, terminating");
            std::process::exit(0);
        }
        Ok(())
    }

    /// Screen invalidation hook; shared memory needs no action here.
    pub fn invalidate(&mut self, _driver: &DisplayDriver) {}

    /// Ask `driver`'s window to close at its next cycle.
    pub fn request_close(&mut self, driver: &DisplayDriver) {
        let Some(id) = driver.window else {
            return;
        };
        if let Some(win) = self.state.window_mut(id) {
            win.request_close();
        }
    }

    /// Retitle `driver`'s window.
    pub fn set_title(&mut self, driver: &DisplayDriver, title: &str) {
        let Some(id) = driver.window else {
            return;
        };
        if let Some(win) = self.state.window_mut(id) {
            win.shell.set_title(title);
            win.life.flush_pending = true;
        }
    }

    /// Pointer position and primary-button state for `driver`'s window.
    pub fn pointer_read(&self, driver: &DisplayDriver) -> PointerData {
        self.with_window(driver, |win| PointerData {
            point: Point {
                x: win.input.pointer.x,
                y: win.input.pointer.y,
            },
            state: win.input.pointer.left,
        })
    }

    /// Wheel-button state plus the accumulated scroll delta. The delta
    /// is consumed: an immediately following call reads zero.
    pub fn pointer_axis_read(&mut self, driver: &DisplayDriver) -> AxisData {
        let Some(id) = driver.window else {
            return AxisData::default();
        };
        match self.state.window_mut(id) {
            Some(win) => AxisData {
                state: win.input.pointer.wheel,
                diff: win.input.pointer.take_wheel_diff(),
            },
            None => AxisData::default(),
        }
    }

    /// Last translated key and its state for `driver`'s window.
    pub fn keyboard_read(&self, driver: &DisplayDriver) -> KeyData {
        self.with_window(driver, |win| KeyData {
            key: win.input.keyboard.key,
            state: win.input.keyboard.state,
        })
    }

    /// Touch contact position and state for `driver`'s window.
    pub fn touch_read(&self, driver: &DisplayDriver) -> TouchData {
        self.with_window(driver, |win| TouchData {
            point: Point {
                x: win.input.touch.x,
                y: win.input.touch.y,
            },
            state: win.input.touch.state,
        })
    }

    fn with_window<T: Default>(
        &self,
        driver: &DisplayDriver,
        read: impl FnOnce(&Window) -> T,
    ) -> T {
        driver
            .window
            .and_then(|id| self.state.window(id))
            .map(read)
            .unwrap_or_default()
    }

    /// Tear down every window and flush the goodbyes. The connection
    /// closes when the backend drops.
    pub fn deinit(mut self) {
        for win in &mut self.state.windows {
            win.destroy();
        }
        self.state.windows.clear();
        self.state.router = InputRouter::default();
        if let Some(surface) = self.state.cursor_surface.take() {
            surface.destroy();
        }
        if let Err(err) = self.conn.flush() {
            warn!("final flush failed: {}", err);
        }
        debug!("backend shut down");
    }
}
