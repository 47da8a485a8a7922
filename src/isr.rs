//! Interrupt-to-event-loop hand-off.
//!
//! Interrupt handlers never touch the MAC directly. They record what happened in a
//! [`TdmaShared`] instance and post a [`MacEvent`]; the event loop in
//! [`crate::mac::TdmaMac`] drains the queue in arrival order.
//!
//! Every access runs inside `critical_section::with`, and each producer writes its
//! data and posts the matching event in the same critical section. When the loop
//! dequeues an event, the data it refers to is therefore already visible.
//!
//! A typical board wires it up like this:
//!
//! ```rust,ignore
//! rf231_tdma::init_tdma_shared!();
//!
//! #[interrupt]
//! fn TIM2() {
//!     if capture_pending() {
//!         TDMA_SHARED.capture(read_capture());
//!     }
//!     if compare_pending() {
//!         TDMA_SHARED.post(MacEvent::TxModeTimerExpired);
//!     }
//! }
//! ```

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use crate::consts::{EVENT_QUEUE_LEN, MAX_FRAME_LEN, RX_BUFFERS};
use crate::mac::MacEvent;
use crate::period::CaptureBuffer;

/// One received-frame slot. A `length` of zero marks the slot as free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxFrame {
    /// PSDU length in bytes.
    pub length: u8,
    /// PSDU bytes; only the first `length` are meaningful.
    pub data: [u8; MAX_FRAME_LEN],
}

impl RxFrame {
    /// A free slot.
    pub const EMPTY: Self = Self {
        length: 0,
        data: [0; MAX_FRAME_LEN],
    };

    /// Copies `bytes` into a new frame, truncating to [`MAX_FRAME_LEN`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let len = bytes.len().min(MAX_FRAME_LEN);
        let mut frame = Self::EMPTY;
        frame.data[..len].copy_from_slice(&bytes[..len]);
        frame.length = len as u8;
        frame
    }

    /// The received bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.length as usize]
    }

    /// Whether the slot is free.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

struct IsrState {
    captures: CaptureBuffer,
    last_beacon: u32,
    frames: [RxFrame; RX_BUFFERS],
    head: usize,
    tail: usize,
    events: Deque<MacEvent, EVENT_QUEUE_LEN>,
    dropped: u16,
}

impl IsrState {
    const fn new() -> Self {
        Self {
            captures: CaptureBuffer::new(),
            last_beacon: 0,
            frames: [RxFrame::EMPTY; RX_BUFFERS],
            head: 0,
            tail: 0,
            events: Deque::new(),
            dropped: 0,
        }
    }

    fn post(&mut self, event: MacEvent) {
        if self.events.push_back(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!("event queue full, dropping {:?}", event);
        }
    }
}

/// State shared between the interrupt handlers and the event loop.
///
/// Place one instance in a `static` (see [`crate::init_tdma_shared`]) and hand a
/// reference to the MAC.
pub struct TdmaShared {
    inner: Mutex<RefCell<IsrState>>,
}

impl core::fmt::Debug for TdmaShared {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TdmaShared").finish_non_exhaustive()
    }
}

impl Default for TdmaShared {
    fn default() -> Self {
        Self::new()
    }
}

impl TdmaShared {
    /// Empty queue, empty capture ring, all frame slots free.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(IsrState::new())),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut IsrState) -> T) -> T {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Posts an event. Events beyond the queue capacity are dropped and counted.
    pub fn post(&self, event: MacEvent) {
        self.with(|state| state.post(event));
    }

    /// Records a beacon capture timestamp and posts [`MacEvent::BeaconCaptured`].
    pub fn capture(&self, ticks: u32) {
        self.with(|state| {
            state.captures.push(ticks);
            state.last_beacon = ticks;
            state.post(MacEvent::BeaconCaptured);
        });
    }

    /// Stores a received PSDU and posts [`MacEvent::PacketReceived`].
    ///
    /// # Arguments
    /// - `bytes`: The PSDU read from the frame buffer, truncated to [`MAX_FRAME_LEN`].
    ///
    /// # Notes
    /// Call from the TRX_END interrupt. Frames land in [`RX_BUFFERS`] slots that
    /// [`TdmaShared::take_frame`] frees in arrival order. When the next slot is still
    /// occupied the frame is dropped and counted, but the event is posted anyway
    /// so the loop can fetch the frame itself.
    pub fn frame_received(&self, bytes: &[u8]) {
        self.with(|state| {
            let head = state.head;
            if state.frames[head].is_empty() && !bytes.is_empty() {
                state.frames[head] = RxFrame::from_bytes(bytes);
                state.head = (head + 1) % RX_BUFFERS;
            } else {
                state.dropped = state.dropped.saturating_add(1);
                warn!("no free rx slot, dropping frame");
            }
            state.post(MacEvent::PacketReceived);
        });
    }

    /// Marks every frame slot free and forgets pending events.
    pub fn clear_frames(&self) {
        self.with(|state| {
            state.frames = [RxFrame::EMPTY; RX_BUFFERS];
            state.head = 0;
            state.tail = 0;
            state.events.clear();
        });
    }

    pub(crate) fn next_event(&self) -> Option<MacEvent> {
        self.with(|state| state.events.pop_front())
    }

    /// Number of events waiting.
    pub fn pending(&self) -> usize {
        self.with(|state| state.events.len())
    }

    /// Takes the oldest buffered frame, freeing its slot.
    pub fn take_frame(&self) -> Option<RxFrame> {
        self.with(|state| {
            let tail = state.tail;
            if state.frames[tail].is_empty() {
                return None;
            }
            let frame = state.frames[tail];
            state.frames[tail].length = 0;
            state.tail = (tail + 1) % RX_BUFFERS;
            Some(frame)
        })
    }

    /// Timestamp of the most recent beacon capture.
    pub fn last_beacon_time(&self) -> u32 {
        self.with(|state| state.last_beacon)
    }

    /// Runs `f` on the capture ring.
    pub fn with_captures<T>(&self, f: impl FnOnce(&CaptureBuffer) -> T) -> T {
        self.with(|state| f(&state.captures))
    }

    /// Events and frames dropped so far.
    pub fn dropped(&self) -> u16 {
        self.with(|state| state.dropped)
    }
}

/// Declares a static `TDMA_SHARED` instance for the interrupt handlers and the MAC.
///
/// # Example
/// ```rust
/// rf231_tdma::init_tdma_shared!();
///
/// TDMA_SHARED.capture(10_000);
/// assert_eq!(TDMA_SHARED.last_beacon_time(), 10_000);
/// ```
#[macro_export]
macro_rules! init_tdma_shared {
    () => {
        pub static TDMA_SHARED: $crate::isr::TdmaShared = $crate::isr::TdmaShared::new();
    };
}
