/// Capacity of a freshly created ring buffer, in bytes
pub const INITIAL_CAPACITY: usize = 0x1000;

/// Growable FIFO of bytes sitting between the application, which writes whole
/// audio buffers at its own pace, and the hardware callback, which drains it
/// in frame sized pieces.
///
/// Writes never fail: when the data does not fit, the storage is reallocated
/// to the next power of two that can hold it. Reads never block and never
/// allocate.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<u8>,
    head: usize,
    len: usize,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity.max(1).next_power_of_two()],
            head: 0,
            len: 0,
        }
    }

    /// Number of bytes waiting to be read
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Drop everything that was written but not read yet
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Append the given bytes, growing the storage if needed
    pub fn write(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let needed = self.len + data.len();
        if needed > self.capacity() {
            self.grow(needed);
        }

        let capacity = self.capacity();
        let tail = (self.head + self.len) % capacity;
        let first = data.len().min(capacity - tail);
        self.buffer[tail..tail + first].copy_from_slice(&data[..first]);
        let rest = data.len() - first;
        if rest > 0 {
            self.buffer[..rest].copy_from_slice(&data[first..]);
        }
        self.len = needed;
    }

    /// Move up to `output.len()` bytes into the output. Returns the number of
    /// bytes read.
    pub fn read(&mut self, output: &mut [u8]) -> usize {
        let count = output.len().min(self.len);
        if count == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let first = count.min(capacity - self.head);
        output[..first].copy_from_slice(&self.buffer[self.head..self.head + first]);
        let rest = count - first;
        if rest > 0 {
            output[first..count].copy_from_slice(&self.buffer[..rest]);
        }

        self.len -= count;
        self.head = if self.len == 0 {
            0
        } else {
            (self.head + count) % capacity
        };
        count
    }

    /// Storage size a write would need for `needed` pending bytes. Equal to
    /// the current capacity when they already fit.
    pub fn capacity_for(&self, needed: usize) -> usize {
        let capacity = self.capacity();
        if needed <= capacity {
            return capacity;
        }
        needed.next_power_of_two().max(capacity * 2)
    }

    /// Move the pending bytes into `storage` and keep it as the new backing
    /// store, so a caller can allocate without holding whatever guards the
    /// ring. Returns the storage back if it cannot hold the pending bytes.
    pub fn replace_storage(&mut self, mut storage: Vec<u8>) -> Result<(), Vec<u8>> {
        if storage.is_empty() || storage.len() < self.len {
            return Err(storage);
        }
        let len = self.len;
        self.read(&mut storage[..len]);
        self.buffer = storage;
        self.head = 0;
        self.len = len;
        Ok(())
    }

    fn grow(&mut self, needed: usize) {
        let storage = vec![0; self.capacity_for(needed)];
        // Sized from the pending length, so the swap cannot be refused
        let _ = self.replace_storage(storage);
    }
}
