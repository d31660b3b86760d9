//! Client-side window decorations
//!
//! A title bar and its buttons are desynchronized subsurfaces of the
//! window surface, each backed by a region carved out of the window's
//! shared-memory pool. They are painted once at creation and never
//! repainted. Decoration failures degrade the window to an undecorated
//! one instead of failing creation.

use log::warn;
use wayland_client::protocol::{
    wl_buffer::WlBuffer, wl_shm_pool::WlShmPool, wl_subsurface::WlSubsurface,
    wl_surface::WlSurface,
};
use wayland_client::QueueHandle;

use crate::backend::BackendState;
use crate::error::BackendError;
use crate::pixel::{PixelFormat, Rgba};
use crate::registry::Globals;
use crate::seat::{SurfaceData, SurfaceTarget, TargetKind};
use crate::shell::ShellKind;
use crate::shm::ShmBacking;
use crate::window::WindowId;

pub const TITLE_BAR_HEIGHT: i32 = 24;
pub const BUTTON_MARGIN: i32 = {
    let m = TITLE_BAR_HEIGHT / 6;
    if m > 1 {
        m
    } else {
        1
    }
};
pub const BUTTON_PADDING: i32 = {
    let p = TITLE_BAR_HEIGHT / 8;
    if p > 2 {
        p
    } else {
        2
    }
};
pub const BUTTON_SIZE: i32 = TITLE_BAR_HEIGHT - 2 * BUTTON_MARGIN;

const TITLE_BAR_COLOR: Rgba = Rgba::new(0x66, 0x66, 0x66, 0xFF);
const BUTTON_COLOR: Rgba = Rgba::new(0xCC, 0xCC, 0xCC, 0xFF);
const GLYPH_COLOR: Rgba = Rgba::new(0x33, 0x33, 0x33, 0xFF);
const GLYPH_EDGE_COLOR: Rgba = Rgba::new(0x66, 0x66, 0x66, 0xFF);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    Close,
    Minimize,
}

impl ButtonKind {
    /// Slot from the right edge of the title bar, zero-based.
    fn slot(self) -> i32 {
        match self {
            ButtonKind::Close => 0,
            ButtonKind::Minimize => 1,
        }
    }
}

struct DecorationPart {
    surface: WlSurface,
    subsurface: WlSubsurface,
    buffer: WlBuffer,
}

impl DecorationPart {
    fn destroy(&self) {
        self.buffer.destroy();
        self.subsurface.destroy();
        self.surface.destroy();
    }
}

pub struct Decorations {
    title_bar: DecorationPart,
    buttons: Vec<DecorationPart>,
}

impl Decorations {
    pub fn destroy(&self) {
        for button in &self.buttons {
            button.destroy();
        }
        self.title_bar.destroy();
    }

    /// Bytes of backing storage the decorations of a window of the
    /// given width will carve out of its pool.
    pub fn backing_size(window_width: i32, format: PixelFormat) -> usize {
        let bpp = format.bytes_per_pixel();
        let title_bar = (window_width * TITLE_BAR_HEIGHT) as usize * bpp;
        let buttons = 2 * (BUTTON_SIZE * BUTTON_SIZE) as usize * bpp;
        title_bar + buttons
    }
}

/// Create the title bar and buttons for `parent`. A button that fails
/// to come up is skipped with a warning; only title bar failure is an
/// error.
pub(crate) fn create_decorations(
    globals: &Globals,
    qh: &QueueHandle<BackendState>,
    window: WindowId,
    window_width: i32,
    format: PixelFormat,
    backing: &mut ShmBacking,
    pool: &WlShmPool,
    parent: &WlSurface,
    shell_kind: ShellKind,
) -> Result<Decorations, BackendError> {
    let title_bar = create_title_bar(
        globals,
        qh,
        window,
        window_width,
        format,
        backing,
        pool,
        parent,
    )?;

    let mut buttons = Vec::new();
    for kind in [ButtonKind::Close, ButtonKind::Minimize] {
        // Minimize only exists as a shell request on xdg-shell.
        if kind == ButtonKind::Minimize && shell_kind != ShellKind::Xdg {
            continue;
        }
        match create_button(
            globals,
            qh,
            window,
            window_width,
            format,
            backing,
            pool,
            parent,
            kind,
        ) {
            Ok(part) => buttons.push(part),
            Err(err) => warn!("skipping {:?} button for window {}: {}", kind, window.0, err),
        }
    }

    Ok(Decorations { title_bar, buttons })
}

fn create_title_bar(
    globals: &Globals,
    qh: &QueueHandle<BackendState>,
    window: WindowId,
    window_width: i32,
    format: PixelFormat,
    backing: &mut ShmBacking,
    pool: &WlShmPool,
    parent: &WlSurface,
) -> Result<DecorationPart, BackendError> {
    let compositor = globals
        .compositor
        .as_ref()
        .ok_or(BackendError::MissingGlobal("wl_compositor"))?;
    let subcompositor = globals
        .subcompositor
        .as_ref()
        .ok_or(BackendError::MissingGlobal("wl_subcompositor"))?;

    let bpp = format.bytes_per_pixel();
    let len = (window_width * TITLE_BAR_HEIGHT) as usize * bpp;
    let offset = backing.carve(len)?;
    fill(
        backing.region_mut(offset, len),
        format,
        (window_width * TITLE_BAR_HEIGHT) as usize,
        TITLE_BAR_COLOR,
    );

    let surface = compositor.create_surface(
        qh,
        SurfaceData(Some(SurfaceTarget {
            window,
            kind: TargetKind::TitleBar,
        })),
    );
    let subsurface = subcompositor.get_subsurface(&surface, parent, qh, ());
    subsurface.set_position(0, -TITLE_BAR_HEIGHT);
    subsurface.set_desync();

    let buffer = pool.create_buffer(
        offset as i32,
        window_width,
        TITLE_BAR_HEIGHT,
        window_width * bpp as i32,
        format.wl_format(),
        qh,
        (),
    );
    surface.attach(Some(&buffer), 0, 0);
    surface.damage(0, 0, window_width, TITLE_BAR_HEIGHT);
    surface.commit();

    Ok(DecorationPart {
        surface,
        subsurface,
        buffer,
    })
}

fn create_button(
    globals: &Globals,
    qh: &QueueHandle<BackendState>,
    window: WindowId,
    window_width: i32,
    format: PixelFormat,
    backing: &mut ShmBacking,
    pool: &WlShmPool,
    parent: &WlSurface,
    kind: ButtonKind,
) -> Result<DecorationPart, BackendError> {
    let compositor = globals
        .compositor
        .as_ref()
        .ok_or(BackendError::MissingGlobal("wl_compositor"))?;
    let subcompositor = globals
        .subcompositor
        .as_ref()
        .ok_or(BackendError::MissingGlobal("wl_subcompositor"))?;

    let bpp = format.bytes_per_pixel();
    let len = (BUTTON_SIZE * BUTTON_SIZE) as usize * bpp;
    let offset = backing.carve(len)?;
    let region = backing.region_mut(offset, len);
    fill(region, format, (BUTTON_SIZE * BUTTON_SIZE) as usize, BUTTON_COLOR);
    match kind {
        ButtonKind::Close => paint_close_glyph(region, format, BUTTON_SIZE),
        ButtonKind::Minimize => paint_minimize_glyph(region, format, BUTTON_SIZE),
    }

    let surface = compositor.create_surface(
        qh,
        SurfaceData(Some(SurfaceTarget {
            window,
            kind: TargetKind::Button(kind),
        })),
    );
    let subsurface = subcompositor.get_subsurface(&surface, parent, qh, ());
    let x = window_width - (BUTTON_SIZE + BUTTON_MARGIN) * (kind.slot() + 1);
    subsurface.set_position(x, -(BUTTON_SIZE + BUTTON_MARGIN));
    subsurface.set_desync();

    let buffer = pool.create_buffer(
        offset as i32,
        BUTTON_SIZE,
        BUTTON_SIZE,
        BUTTON_SIZE * bpp as i32,
        format.wl_format(),
        qh,
        (),
    );
    surface.attach(Some(&buffer), 0, 0);
    surface.damage(0, 0, BUTTON_SIZE, BUTTON_SIZE);
    surface.commit();

    Ok(DecorationPart {
        surface,
        subsurface,
        buffer,
    })
}

fn fill(buf: &mut [u8], format: PixelFormat, count: usize, color: Rgba) {
    let bpp = format.bytes_per_pixel();
    for i in 0..count {
        format.encode(color, &mut buf[i * bpp..(i + 1) * bpp]);
    }
}

fn put(buf: &mut [u8], format: PixelFormat, size: i32, x: i32, y: i32, color: Rgba) {
    let bpp = format.bytes_per_pixel();
    let idx = (y * size + x) as usize * bpp;
    format.encode(color, &mut buf[idx..idx + bpp]);
}

/// Diagonal cross, one pixel wide with a soft edge.
fn paint_close_glyph(buf: &mut [u8], format: PixelFormat, size: i32) {
    for y in BUTTON_PADDING..size - BUTTON_PADDING {
        for x in BUTTON_PADDING..size - BUTTON_PADDING {
            if x == y || x == size - 1 - y {
                put(buf, format, size, x, y, GLYPH_COLOR);
            } else if x == y - 1 || x == size - y {
                put(buf, format, size, x, y, GLYPH_EDGE_COLOR);
            }
        }
    }
}

/// Horizontal bar near the bottom edge.
fn paint_minimize_glyph(buf: &mut [u8], format: PixelFormat, size: i32) {
    for y in size - 2 * BUTTON_PADDING..size - BUTTON_PADDING {
        for x in BUTTON_PADDING..size - BUTTON_PADDING {
            put(buf, format, size, x, y, GLYPH_COLOR);
        }
    }
}
