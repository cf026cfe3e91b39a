/// Fixed-capacity ring buffer holding the most recent mono samples for
/// visualization.
///
/// Wrap in `Arc<parking_lot::Mutex<ScopeBuffer>>` for cross-thread use:
/// the capture callback pushes, the visualizer takes snapshots. Contents
/// are never persisted.
///
/// Overflow behavior: the oldest samples are evicted first, so
/// `len() <= capacity()` always holds.
#[derive(Debug)]
pub struct ScopeBuffer {
    buffer: Vec<f32>,
    write_index: usize,
    len: usize,
    capacity: usize,
}

impl ScopeBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "scope buffer capacity must be positive");
        Self {
            buffer: vec![0.0; capacity],
            write_index: 0,
            len: 0,
            capacity,
        }
    }

    /// Append samples, evicting the oldest on overflow.
    ///
    /// If `samples` is larger than the whole capacity, only the tail is
    /// kept.
    pub fn push(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let samples = if samples.len() > self.capacity {
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.len = (self.len + samples.len()).min(self.capacity);
    }

    /// Copy of the current contents in chronological order, newest last.
    pub fn snapshot(&self) -> Vec<f32> {
        let start = (self.write_index + self.capacity - self.len) % self.capacity;
        let mut out = Vec::with_capacity(self.len);
        for i in 0..self.len {
            out.push(self.buffer[(start + i) % self.capacity]);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.write_index = 0;
        self.len = 0;
    }
}
