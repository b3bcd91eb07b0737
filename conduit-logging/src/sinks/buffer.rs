//! Buffers log events in memory, flushing to the wrapped sink once a
//! capacity or time threshold is crossed.

use crate::event::{LogEvent, LogLevel};
use crate::logger::StructuredLogger;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct BufferState {
    buffer: Vec<LogEvent>,
    last_flush: Instant,
}

pub struct BufferedSink {
    inner: Arc<dyn StructuredLogger>,
    capacity: usize,
    flush_interval: Duration,
    state: Mutex<BufferState>,
}

impl BufferedSink {
    pub fn new(inner: Arc<dyn StructuredLogger>, capacity: usize, flush_interval: Duration) -> Self {
        Self {
            inner,
            capacity,
            flush_interval,
            state: Mutex::new(BufferState {
                buffer: Vec::with_capacity(capacity),
                last_flush: Instant::now(),
            }),
        }
    }

    fn flush_locked(&self, state: &mut BufferState) {
        for event in state.buffer.drain(..) {
            self.inner.log(event);
        }
        state.last_flush = Instant::now();
    }
}

impl StructuredLogger for BufferedSink {
    fn log(&self, event: LogEvent) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.buffer.push(event);
        if state.buffer.len() >= self.capacity || state.last_flush.elapsed() >= self.flush_interval {
            self.flush_locked(&mut state);
        }
    }

    fn min_level(&self) -> LogLevel {
        self.inner.min_level()
    }
}

impl Drop for BufferedSink {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            self.flush_locked(&mut state);
        }
    }
}
