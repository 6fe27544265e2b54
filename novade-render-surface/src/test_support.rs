//! In-process fakes for the presentation channel, native window and importer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use novade_buffer_cache::{BufferImporter, ExternalHandle, ImportDescriptor, PixelFormat};
use parking_lot::Mutex;

use crate::channel::{
    BufferUsage, ChannelBuffer, Completion, NativeWindow, PresentMode, PresentationChannel,
};

#[derive(Debug, Clone)]
pub(crate) struct FakeBuffer {
    id: u64,
    fd: i32,
    width: u32,
    height: u32,
    age: Arc<AtomicU32>,
}

impl FakeBuffer {
    /// Changes the age the channel reports for this buffer.
    pub(crate) fn set_reported_age(&self, age: u32) {
        self.age.store(age, Ordering::SeqCst);
    }
}

impl PartialEq for FakeBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl ChannelBuffer for FakeBuffer {
    fn external_handle(&self) -> ExternalHandle {
        ExternalHandle::new(self.fd)
    }

    fn reported_age(&self) -> u32 {
        self.age.load(Ordering::SeqCst)
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChannelEvent {
    Allocated(i32),
    Submitted(i32),
    Completed(i32),
    Released(i32),
    Mode(PresentMode),
}

#[derive(Default)]
struct ChannelState {
    next_fd: i32,
    allocations: usize,
    fail_from: Option<usize>,
    auto_complete: bool,
    reported_age: u32,
    last_usage: Option<BufferUsage>,
    pending: VecDeque<(FakeBuffer, Completion<FakeBuffer>)>,
    events: Vec<ChannelEvent>,
}

/// Presentation channel that queues submissions until the test completes them.
pub(crate) struct FakeChannel {
    next_id: AtomicU64,
    state: Mutex<ChannelState>,
}

impl FakeChannel {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state: Mutex::new(ChannelState {
                next_fd: 100,
                reported_age: 1,
                ..ChannelState::default()
            }),
        }
    }

    /// Makes every allocation with index `>= n` fail.
    pub(crate) fn fail_allocations_from(&self, n: usize) {
        self.state.lock().fail_from = Some(n);
    }

    /// Completes submissions inline instead of queueing them.
    pub(crate) fn set_auto_complete(&self, enabled: bool) {
        self.state.lock().auto_complete = enabled;
    }

    /// Age reported by buffers allocated from now on.
    pub(crate) fn set_initial_age(&self, age: u32) {
        self.state.lock().reported_age = age;
    }

    /// Returns the oldest pending submission. Returns `false` if none is pending.
    pub(crate) fn complete_next(&self) -> bool {
        let next = {
            let mut state = self.state.lock();
            let next = state.pending.pop_front();
            if let Some((buffer, _)) = &next {
                state.events.push(ChannelEvent::Completed(buffer.fd));
            }
            next
        };
        match next {
            Some((buffer, completion)) => {
                completion.complete(&buffer);
                true
            }
            None => false,
        }
    }

    pub(crate) fn complete_all(&self) {
        while self.complete_next() {}
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub(crate) fn allocation_count(&self) -> usize {
        self.state.lock().allocations
    }

    pub(crate) fn released_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, ChannelEvent::Released(_)))
            .count()
    }

    pub(crate) fn last_usage(&self) -> Option<BufferUsage> {
        self.state.lock().last_usage
    }

    pub(crate) fn events(&self) -> Vec<ChannelEvent> {
        self.state.lock().events.clone()
    }
}

impl PresentationChannel for FakeChannel {
    type Buffer = FakeBuffer;

    fn allocate(
        &self,
        width: u32,
        height: u32,
        _format: PixelFormat,
        usage: BufferUsage,
    ) -> Option<FakeBuffer> {
        let mut state = self.state.lock();
        if state.fail_from.map_or(false, |n| state.allocations >= n) {
            return None;
        }
        state.allocations += 1;
        state.last_usage = Some(usage);
        let fd = state.next_fd;
        state.next_fd += 1;
        state.events.push(ChannelEvent::Allocated(fd));
        Some(FakeBuffer {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            fd,
            width,
            height,
            age: Arc::new(AtomicU32::new(state.reported_age)),
        })
    }

    fn submit(&self, buffer: FakeBuffer, completion: Completion<FakeBuffer>) {
        let mut state = self.state.lock();
        state.events.push(ChannelEvent::Submitted(buffer.fd));
        if state.auto_complete {
            state.events.push(ChannelEvent::Completed(buffer.fd));
            drop(state);
            completion.complete(&buffer);
        } else {
            state.pending.push_back((buffer, completion));
        }
    }

    fn release(&self, buffer: FakeBuffer) {
        self.state.lock().events.push(ChannelEvent::Released(buffer.fd));
    }

    fn set_present_mode(&self, mode: PresentMode) {
        self.state.lock().events.push(ChannelEvent::Mode(mode));
    }
}

pub(crate) struct FakeWindow {
    valid: bool,
    size: Mutex<(u32, u32)>,
    channel: Option<Arc<FakeChannel>>,
}

impl FakeWindow {
    pub(crate) fn new(channel: &Arc<FakeChannel>, size: (u32, u32)) -> Arc<Self> {
        Arc::new(Self {
            valid: true,
            size: Mutex::new(size),
            channel: Some(Arc::clone(channel)),
        })
    }

    pub(crate) fn invalid() -> Arc<Self> {
        Arc::new(Self {
            valid: false,
            size: Mutex::new((0, 0)),
            channel: None,
        })
    }

    pub(crate) fn without_chain(size: (u32, u32)) -> Arc<Self> {
        Arc::new(Self {
            valid: true,
            size: Mutex::new(size),
            channel: None,
        })
    }

    pub(crate) fn resize(&self, size: (u32, u32)) {
        *self.size.lock() = size;
    }
}

impl NativeWindow for FakeWindow {
    type Channel = FakeChannel;

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn size(&self) -> (u32, u32) {
        *self.size.lock()
    }

    fn presentation_chain(&self) -> Option<Arc<FakeChannel>> {
        self.channel.clone()
    }
}

#[derive(Debug)]
pub(crate) struct FakeBo {
    pub(crate) descriptor: ImportDescriptor,
    pub(crate) generation: usize,
}

/// Importer counting every import; shares its counter with the test.
#[derive(Default)]
pub(crate) struct FakeImporter {
    pub(crate) imports: Arc<AtomicUsize>,
    pub(crate) reject: Option<ExternalHandle>,
}

impl BufferImporter for FakeImporter {
    type Object = FakeBo;

    fn import(&self, descriptor: &ImportDescriptor) -> Option<FakeBo> {
        if self.reject == Some(descriptor.handle) {
            return None;
        }
        let generation = self.imports.fetch_add(1, Ordering::SeqCst) + 1;
        Some(FakeBo {
            descriptor: *descriptor,
            generation,
        })
    }
}
