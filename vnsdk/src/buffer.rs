use crate::error::Error;

/// A fixed-capacity circular byte buffer with O(1) append, non-destructive
/// peek-by-absolute-offset, and discard-prefix. A `put` that would exceed
/// capacity fails without a partial write.
pub struct RingBuffer {
    buf: Box<[u8]>,
    head: usize,
    size: usize,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            size: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Appends `src` in full, or fails and leaves the buffer untouched if it
    /// would not all fit.
    pub fn put(&mut self, src: &[u8]) -> Result<(), Error> {
        if src.len() > self.capacity() - self.size {
            return Err(Error::PrimaryBufferFull);
        }
        let cap = self.capacity();
        let mut tail = (self.head + self.size) % cap;
        for &b in src {
            self.buf[tail] = b;
            tail = (tail + 1) % cap;
        }
        self.size += src.len();
        Ok(())
    }

    /// Byte at `offset` from the head. Requires `offset < size()`.
    pub fn peek(&self, offset: usize) -> u8 {
        assert!(offset < self.size, "peek offset {offset} out of range ({})", self.size);
        self.buf[(self.head + offset) % self.capacity()]
    }

    /// Copies `n` bytes starting at `offset` into `dst`. Requires
    /// `offset + n <= size()` and `dst.len() >= n`.
    pub fn peek_range(&self, offset: usize, n: usize, dst: &mut [u8]) {
        assert!(offset + n <= self.size);
        assert!(dst.len() >= n);
        let cap = self.capacity();
        for i in 0..n {
            dst[i] = self.buf[(self.head + offset + i) % cap];
        }
    }

    /// Drops the first `n` bytes. Requires `n <= size()`.
    pub fn discard(&mut self, n: usize) {
        assert!(n <= self.size);
        self.head = (self.head + n) % self.capacity();
        self.size -= n;
    }

    pub fn reset(&mut self) {
        self.head = 0;
        self.size = 0;
    }

    /// The number of contiguous bytes available starting at the head without
    /// wrap-around (so a consumer can `memcpy` a prefix directly).
    pub fn linear_bytes_from_head(&self) -> usize {
        let cap = self.capacity();
        let until_wrap = cap - self.head;
        self.size.min(until_wrap)
    }
}
