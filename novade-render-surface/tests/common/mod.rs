//! Presentation channel that hands buffers back from its own thread, shared by
//! the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use novade_buffer_cache::{BufferImporter, ExternalHandle, ImportDescriptor, PixelFormat};
use novade_render_surface::logging::init_minimal_logging;
use novade_render_surface::{
    BufferUsage, ChannelBuffer, Completion, NativeWindow, PresentMode, PresentationChannel,
    SlotState, Surface, SurfaceConfig,
};
use parking_lot::Mutex;

pub const XRGB8888_VISUAL: u32 = 4;

#[derive(Debug, Clone)]
pub struct ThreadedBuffer {
    id: u64,
    fd: i32,
    width: u32,
    height: u32,
}

impl PartialEq for ThreadedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl ChannelBuffer for ThreadedBuffer {
    fn external_handle(&self) -> ExternalHandle {
        ExternalHandle::new(self.fd)
    }

    fn reported_age(&self) -> u32 {
        1
    }

    fn stride(&self) -> u32 {
        self.width * 4
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

type Submission = (ThreadedBuffer, Completion<ThreadedBuffer>);

/// Returns submitted buffers from a worker thread after `latency`.
pub struct ThreadedChannel {
    next_id: AtomicU64,
    next_fd: AtomicI32,
    pub in_flight: Arc<Mutex<HashSet<i32>>>,
    pub allocated: AtomicUsize,
    pub submitted: AtomicUsize,
    pub released: AtomicUsize,
    /// Releases of a buffer the channel still held.
    pub violations: AtomicUsize,
    pub mode: Mutex<Option<PresentMode>>,
    queue: Mutex<mpsc::Sender<Submission>>,
}

impl ThreadedChannel {
    pub fn spawn(latency: Duration) -> Arc<Self> {
        let (queue, submissions) = mpsc::channel::<Submission>();
        let in_flight = Arc::new(Mutex::new(HashSet::new()));
        let worker_in_flight = Arc::clone(&in_flight);
        thread::spawn(move || {
            for (buffer, completion) in submissions {
                thread::sleep(latency);
                worker_in_flight.lock().remove(&buffer.fd);
                completion.complete(&buffer);
            }
        });

        Arc::new(Self {
            next_id: AtomicU64::new(1),
            next_fd: AtomicI32::new(200),
            in_flight,
            allocated: AtomicUsize::new(0),
            submitted: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            violations: AtomicUsize::new(0),
            mode: Mutex::new(None),
            queue: Mutex::new(queue),
        })
    }
}

impl PresentationChannel for ThreadedChannel {
    type Buffer = ThreadedBuffer;

    fn allocate(
        &self,
        width: u32,
        height: u32,
        _format: PixelFormat,
        usage: BufferUsage,
    ) -> Option<ThreadedBuffer> {
        assert!(usage.contains(BufferUsage::SCANOUT | BufferUsage::RENDERING));
        self.allocated.fetch_add(1, Ordering::SeqCst);
        Some(ThreadedBuffer {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            fd: self.next_fd.fetch_add(1, Ordering::Relaxed),
            width,
            height,
        })
    }

    fn submit(&self, buffer: ThreadedBuffer, completion: Completion<ThreadedBuffer>) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.in_flight.lock().insert(buffer.fd);
        // The worker only stops once the channel is dropped.
        let _ = self.queue.lock().send((buffer, completion));
    }

    fn release(&self, buffer: ThreadedBuffer) {
        if self.in_flight.lock().contains(&buffer.fd) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    fn set_present_mode(&self, mode: PresentMode) {
        *self.mode.lock() = Some(mode);
    }
}

pub struct ThreadedWindow {
    channel: Arc<ThreadedChannel>,
    pub size: Mutex<(u32, u32)>,
}

impl ThreadedWindow {
    pub fn new(channel: &Arc<ThreadedChannel>, size: (u32, u32)) -> Arc<Self> {
        Arc::new(Self {
            channel: Arc::clone(channel),
            size: Mutex::new(size),
        })
    }
}

impl NativeWindow for ThreadedWindow {
    type Channel = ThreadedChannel;

    fn is_valid(&self) -> bool {
        true
    }

    fn size(&self) -> (u32, u32) {
        *self.size.lock()
    }

    fn presentation_chain(&self) -> Option<Arc<ThreadedChannel>> {
        Some(Arc::clone(&self.channel))
    }
}

#[derive(Default)]
pub struct DescriptorImporter {
    pub imports: Arc<AtomicUsize>,
}

impl BufferImporter for DescriptorImporter {
    type Object = ImportDescriptor;

    fn import(&self, descriptor: &ImportDescriptor) -> Option<ImportDescriptor> {
        self.imports.fetch_add(1, Ordering::SeqCst);
        Some(*descriptor)
    }
}

pub type TestSurface = Surface<Arc<ThreadedWindow>, DescriptorImporter>;

/// Builds a 64x64 surface over a fresh threaded channel.
pub fn surface_with(
    latency: Duration,
    config: &SurfaceConfig,
) -> (Arc<ThreadedChannel>, Arc<ThreadedWindow>, TestSurface) {
    init_minimal_logging();
    let channel = ThreadedChannel::spawn(latency);
    let window = ThreadedWindow::new(&channel, (64, 64));
    let surface = Surface::create(
        Arc::clone(&window),
        XRGB8888_VISUAL,
        DescriptorImporter::default(),
        config,
    )
    .unwrap();
    (channel, window, surface)
}

pub fn surface(
    latency: Duration,
    buffer_count: usize,
) -> (Arc<ThreadedChannel>, Arc<ThreadedWindow>, TestSurface) {
    let config = SurfaceConfig {
        buffer_count,
        ..SurfaceConfig::default()
    };
    surface_with(latency, &config)
}

pub fn acquired_count(surface: &TestSurface) -> usize {
    surface
        .controller()
        .swap_chain()
        .states()
        .into_iter()
        .filter(|state| *state == SlotState::Acquired)
        .count()
}
