use crossbeam_channel::{Receiver, Sender};
use std::ops::{Deref, DerefMut};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Buffers kept idle by the shared pool.
const SHARED_POOL_CAPACITY: usize = 64;

/// Buffers that grew past this many bytes are freed instead of pooled.
const DEFAULT_MAX_RETAINED_BYTES: usize = 4 << 20;

static SHARED: LazyLock<BufferPool> = LazyLock::new(|| BufferPool::new(SHARED_POOL_CAPACITY));

/// Process-wide pool used by [`handle`](crate::handle) and
/// [`handle_for`](crate::handle_for).
pub fn shared() -> &'static BufferPool {
    &SHARED
}

/// Lock-free free list of response buffers.
///
/// Buffers keep their capacity between requests. At most `capacity` idle
/// buffers are retained; anything released beyond that is dropped, and so is
/// any buffer larger than the retention ceiling.
pub struct BufferPool {
    free_tx: Sender<Vec<u8>>,
    free_rx: Receiver<Vec<u8>>,
    outstanding: AtomicUsize,
    max_retained_bytes: usize,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        let (free_tx, free_rx) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            free_tx,
            free_rx,
            outstanding: AtomicUsize::new(0),
            max_retained_bytes: DEFAULT_MAX_RETAINED_BYTES,
        }
    }

    /// Free returned buffers whose capacity exceeds `bytes`.
    pub fn with_max_retained_bytes(mut self, bytes: usize) -> Self {
        self.max_retained_bytes = bytes;
        self
    }

    pub fn max_retained_bytes(&self) -> usize {
        self.max_retained_bytes
    }

    /// Take an empty buffer, reusing an idle one when available.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self.free_rx.try_recv().unwrap_or_default();
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        PooledBuffer { buf, pool: self }
    }

    /// Return a buffer early. Equivalent to dropping it.
    pub fn release(&self, buffer: PooledBuffer<'_>) {
        drop(buffer);
    }

    /// Buffers acquired and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Buffers waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free_rx.len()
    }

    fn give_back(&self, mut buf: Vec<u8>) {
        if buf.capacity() <= self.max_retained_bytes {
            buf.clear();
            // A full free list just lets the buffer go.
            let _ = self.free_tx.try_send(buf);
        }
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(SHARED_POOL_CAPACITY)
    }
}

/// A buffer on loan from a [`BufferPool`]; goes back on drop, unwinding included.
pub struct PooledBuffer<'a> {
    buf: Vec<u8>,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.buf));
    }
}
