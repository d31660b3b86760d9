//! Window lifecycle and the frame-cycle barrier
//!
//! A [`Window`] owns a shared-memory pool, a wl_buffer over its pixel
//! region, the wl_surface, a shell toplevel binding and optional
//! decorations. Its [`Lifecycle`] flags drive the per-frame barrier:
//! every window must report render completion before the backend does
//! its one flush/read/dispatch round for the tick.

use log::{debug, info, warn};
use wayland_client::protocol::{
    wl_buffer::WlBuffer, wl_shm_pool::WlShmPool, wl_surface::{self, WlSurface},
};
use wayland_client::{Connection, Dispatch, QueueHandle};

use crate::area::Area;
use crate::backend::BackendState;
use crate::config::BackendConfig;
use crate::decoration::{self, Decorations};
use crate::driver::MonitorCallback;
use crate::error::BackendError;
use crate::pixel::PixelFormat;
use crate::registry::Globals;
use crate::seat::{InputRecord, SurfaceData, SurfaceTarget, TargetKind};
use crate::shell::{self, Shell};
use crate::shm::ShmBacking;

/// Identity of a window within one backend instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u32);

/// Per-window frame and close state.
#[derive(Debug, Default)]
pub struct Lifecycle {
    /// A commit (frame, move, minimize or cursor-free equivalent)
    /// awaits the tick's single flush.
    pub flush_pending: bool,
    /// This window has reported render completion this tick.
    pub cycled: bool,
    /// Close requested; teardown happens at the start of the window's
    /// next cycle.
    pub shall_close: bool,
    /// Protocol resources are gone; the window only counts toward
    /// termination now.
    pub closed: bool,
}

/// What the owning window must do when its render-complete arrives.
#[derive(Debug, PartialEq, Eq)]
pub enum CycleAction {
    /// Release protocol resources, then mark closed.
    Teardown,
    /// Run the render-complete callback as usual.
    Callback,
}

/// Step a window's lifecycle at the start of its cycle. Marks it
/// cycled and converts a pending close request into a teardown, which
/// itself needs a flush.
pub(crate) fn begin_cycle(life: &mut Lifecycle) -> CycleAction {
    life.cycled = true;
    if life.shall_close && !life.closed {
        life.shall_close = false;
        life.closed = true;
        life.flush_pending = true;
        CycleAction::Teardown
    } else {
        CycleAction::Callback
    }
}

/// Outcome of the barrier check after one window cycled.
#[derive(Debug, PartialEq, Eq)]
pub enum CycleDecision {
    /// Not every window has cycled; do nothing this call.
    Waiting,
    /// Barrier reached; `shall_flush` says whether any commit awaits
    /// the flush.
    Flush { shall_flush: bool },
}

/// Barrier over all windows. When the last window cycles, every
/// `cycled` and `flush_pending` flag is reset and the aggregated flush
/// decision is returned. `extra_flush` folds in commits made outside
/// any window (the cursor surface).
pub(crate) fn cycle_barrier(lives: &mut [&mut Lifecycle], extra_flush: bool) -> CycleDecision {
    if !lives.iter().all(|life| life.cycled) {
        return CycleDecision::Waiting;
    }
    let mut shall_flush = extra_flush;
    for life in lives {
        shall_flush |= life.flush_pending;
        life.flush_pending = false;
        life.cycled = false;
    }
    CycleDecision::Flush { shall_flush }
}

/// Damage rectangles accumulated between commits. Every area drawn
/// during a frame is replayed in that frame's single commit.
#[derive(Debug, Default)]
pub(crate) struct DamageQueue {
    areas: Vec<Area>,
}

impl DamageQueue {
    pub fn push(&mut self, area: Area) {
        self.areas.push(area);
    }

    /// Hand the batched areas to one commit, leaving the queue empty
    /// for the next frame.
    pub fn take(&mut self) -> Vec<Area> {
        std::mem::take(&mut self.areas)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }
}

pub struct Window {
    pub id: WindowId,
    pub width: i32,
    pub height: i32,
    backing: Option<ShmBacking>,
    pool: WlShmPool,
    buffer: WlBuffer,
    surface: WlSurface,
    pub(crate) shell: Box<dyn Shell>,
    decorations: Option<Decorations>,
    pub(crate) input: InputRecord,
    pub(crate) life: Lifecycle,
    pending_damage: DamageQueue,
    pub(crate) monitor_cb: Option<MonitorCallback>,
    released: bool,
}

impl Window {
    /// Allocate backing storage and create the full protocol object
    /// tree for a toplevel of `width` x `height` pixels.
    pub(crate) fn create(
        globals: &Globals,
        config: &BackendConfig,
        format: PixelFormat,
        qh: &QueueHandle<BackendState>,
        id: WindowId,
        width: i32,
        height: i32,
    ) -> Result<Self, BackendError> {
        let bpp = format.bytes_per_pixel();
        let pixel_len = (width * height) as usize * bpp;
        let mut size = pixel_len;
        if !config.disable_decorations {
            size += Decorations::backing_size(width, format);
        }

        let runtime_dir = config.resolve_runtime_dir()?;
        let mut backing = ShmBacking::allocate(&runtime_dir, size)?;
        let pixel_offset = backing.carve(pixel_len)?;

        let compositor = globals
            .compositor
            .as_ref()
            .ok_or(BackendError::MissingGlobal("wl_compositor"))?;
        let shm = globals
            .shm
            .as_ref()
            .ok_or(BackendError::MissingGlobal("wl_shm"))?;

        let pool = shm.create_pool(backing.as_fd(), size as i32, qh, ());
        let buffer = pool.create_buffer(
            pixel_offset as i32,
            width,
            height,
            width * bpp as i32,
            format.wl_format(),
            qh,
            (),
        );
        let surface = compositor.create_surface(
            qh,
            SurfaceData(Some(SurfaceTarget {
                window: id,
                kind: TargetKind::Window,
            })),
        );

        let shell = match shell::bind_toplevel(globals, qh, &surface, id, &config.title) {
            Ok(shell) => shell,
            Err(err) => {
                surface.destroy();
                buffer.destroy();
                pool.destroy();
                return Err(err);
            }
        };

        let decorations = if config.disable_decorations {
            None
        } else {
            match decoration::create_decorations(
                globals,
                qh,
                id,
                width,
                format,
                &mut backing,
                &pool,
                &surface,
                shell.kind(),
            ) {
                Ok(decorations) => Some(decorations),
                Err(err) => {
                    warn!("window {} comes up undecorated: {}", id.0, err);
                    None
                }
            }
        };

        info!("🪟 created window {} ({}x{}, {:?})", id.0, width, height, format);

        Ok(Self {
            id,
            width,
            height,
            backing: Some(backing),
            pool,
            buffer,
            surface,
            shell,
            decorations,
            input: InputRecord::default(),
            life: Lifecycle::default(),
            pending_damage: DamageQueue::default(),
            monitor_cb: None,
            released: false,
        })
    }

    /// Mutable view of the pixel region inside the backing storage.
    pub(crate) fn pixel_region(&mut self, format: PixelFormat) -> Option<&mut [u8]> {
        let len = (self.width * self.height) as usize * format.bytes_per_pixel();
        self.backing.as_mut().map(|backing| backing.region_mut(0, len))
    }

    /// Record one rendered area; damage is replayed at commit time.
    pub(crate) fn push_damage(&mut self, area: Area) {
        self.pending_damage.push(area);
    }

    /// Final draw of a frame: attach, replay damage, commit, and arm
    /// the flush flag for the coordinator.
    pub(crate) fn commit_frame(&mut self) {
        self.surface.attach(Some(&self.buffer), 0, 0);
        for area in self.pending_damage.take() {
            self.surface
                .damage(area.x1, area.y1, area.width(), area.height());
        }
        self.surface.commit();
        self.life.flush_pending = true;
    }

    /// Ask for the window to close at its next cycle. Already-closed
    /// windows ignore the request.
    pub(crate) fn request_close(&mut self) {
        if !self.life.closed {
            self.life.shall_close = true;
        }
    }

    /// Drop every protocol object and the backing storage. Safe to
    /// call more than once; only the first call releases anything.
    pub(crate) fn destroy(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        if let Some(decorations) = self.decorations.take() {
            decorations.destroy();
        }
        self.shell.destroy();
        self.surface.destroy();
        self.buffer.destroy();
        self.pool.destroy();
        self.backing = None;
        debug!("released resources of window {}", self.id.0);
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl Dispatch<WlSurface, SurfaceData> for BackendState {
    fn event(
        _state: &mut Self,
        _surface: &WlSurface,
        _event: wl_surface::Event,
        _data: &SurfaceData,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // Output enter/leave carries nothing the backend acts on.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn barrier(lives: &mut [Lifecycle], extra: bool) -> CycleDecision {
        let mut refs: Vec<&mut Lifecycle> = lives.iter_mut().collect();
        cycle_barrier(&mut refs, extra)
    }

    #[test]
    fn single_area_frame_queues_one_damage_entry() {
        let mut damage = DamageQueue::default();
        damage.push(Area::new(0, 0, 9, 9));
        assert_eq!(damage.len(), 1);

        let batch = damage.take();
        assert_eq!(batch, vec![Area::new(0, 0, 9, 9)]);
        assert_eq!(damage.len(), 0);
    }

    #[test]
    fn damage_batches_every_area_into_one_commit() {
        let mut damage = DamageQueue::default();
        damage.push(Area::new(0, 0, 15, 15));
        damage.push(Area::new(16, 0, 31, 15));
        damage.push(Area::new(0, 16, 31, 31));

        // One drain replays the whole frame; the next frame starts
        // from an empty queue.
        let batch = damage.take();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[1], Area::new(16, 0, 31, 15));
        assert!(damage.take().is_empty());
    }

    #[test]
    fn barrier_waits_for_every_window() {
        let mut lives = [Lifecycle::default(), Lifecycle::default()];
        lives[0].cycled = true;
        lives[0].flush_pending = true;
        assert_eq!(barrier(&mut lives, false), CycleDecision::Waiting);
        // The early window's flags stay intact while waiting.
        assert!(lives[0].flush_pending);

        lives[1].cycled = true;
        assert_eq!(
            barrier(&mut lives, false),
            CycleDecision::Flush { shall_flush: true }
        );
        for life in &lives {
            assert!(!life.cycled);
            assert!(!life.flush_pending);
        }
    }

    #[test]
    fn barrier_without_pending_commits_skips_flush() {
        let mut lives = [Lifecycle::default()];
        lives[0].cycled = true;
        assert_eq!(
            barrier(&mut lives, false),
            CycleDecision::Flush { shall_flush: false }
        );
    }

    #[test]
    fn cursor_commit_forces_flush() {
        let mut lives = [Lifecycle::default()];
        lives[0].cycled = true;
        assert_eq!(
            barrier(&mut lives, true),
            CycleDecision::Flush { shall_flush: true }
        );
    }

    #[test]
    fn close_request_turns_into_exactly_one_teardown() {
        let mut life = Lifecycle::default();
        life.shall_close = true;
        assert_eq!(begin_cycle(&mut life), CycleAction::Teardown);
        assert!(life.closed);
        assert!(life.flush_pending);

        // A carelessly repeated close request on the closed window
        // must not tear down twice.
        life.shall_close = true;
        life.flush_pending = false;
        assert_eq!(begin_cycle(&mut life), CycleAction::Callback);
        assert!(!life.flush_pending);
    }

    #[test]
    fn two_windows_one_closing_mid_stream() {
        let mut a = Lifecycle::default();
        let mut b = Lifecycle::default();

        // Ticks 1..=4: both render normally.
        for _ in 0..4 {
            assert_eq!(begin_cycle(&mut a), CycleAction::Callback);
            a.flush_pending = true;
            {
                let mut refs = [&mut a, &mut b];
                assert_eq!(cycle_barrier(&mut refs, false), CycleDecision::Waiting);
            }
            assert_eq!(begin_cycle(&mut b), CycleAction::Callback);
            b.flush_pending = true;
            let mut refs = [&mut a, &mut b];
            assert_eq!(
                cycle_barrier(&mut refs, false),
                CycleDecision::Flush { shall_flush: true }
            );
        }

        // Tick 5: window A was asked to close.
        a.shall_close = true;
        assert_eq!(begin_cycle(&mut a), CycleAction::Teardown);
        assert_eq!(begin_cycle(&mut b), CycleAction::Callback);
        b.flush_pending = true;
        {
            let mut refs = [&mut a, &mut b];
            assert_eq!(
                cycle_barrier(&mut refs, false),
                CycleDecision::Flush { shall_flush: true }
            );
        }

        assert!(a.closed);
        assert!(!b.closed);

        // Tick 6: the closed window still cycles (its display keeps
        // ticking) but contributes nothing to the flush decision.
        assert_eq!(begin_cycle(&mut a), CycleAction::Callback);
        assert_eq!(begin_cycle(&mut b), CycleAction::Callback);
        let mut refs = [&mut a, &mut b];
        assert_eq!(
            cycle_barrier(&mut refs, false),
            CycleDecision::Flush { shall_flush: false }
        );
    }
}
