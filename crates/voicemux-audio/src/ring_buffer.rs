use rtrb::{Consumer, Producer, RingBuffer};

/// Lock-free SPSC sample buffer between the cpal callback (producer) and the
/// chunker task (consumer). The callback side never blocks; when the buffer
/// is full, samples are dropped and counted by the capture stats.
pub struct AudioRingBuffer {
    capacity: usize,
}

impl AudioRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        let (producer, consumer) = RingBuffer::new(self.capacity);
        (AudioProducer { inner: producer }, AudioConsumer { inner: consumer })
    }
}

pub struct AudioProducer {
    inner: Producer<i16>,
}

impl AudioProducer {
    /// Writes as many samples as fit; returns the number written.
    pub fn write(&mut self, samples: &[i16]) -> usize {
        let n = samples.len().min(self.inner.slots());
        if n == 0 {
            return 0;
        }
        match self.inner.write_chunk_uninit(n) {
            Ok(chunk) => chunk.fill_from_iter(samples.iter().copied()),
            Err(_) => 0,
        }
    }
}

pub struct AudioConsumer {
    inner: Consumer<i16>,
}

impl AudioConsumer {
    /// Moves up to `max` available samples into `out`; returns the count.
    pub fn read(&mut self, out: &mut Vec<i16>, max: usize) -> usize {
        let n = self.inner.slots().min(max);
        if n == 0 {
            return 0;
        }
        match self.inner.read_chunk(n) {
            Ok(chunk) => {
                out.extend(chunk.into_iter());
                n
            }
            Err(_) => 0,
        }
    }
}
