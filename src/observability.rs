use biometrics::{Collector, Counter, Moments, Sensor};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("aifun.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("aifun.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("aifun.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("aifun.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("aifun.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("aifun.stream.bytes");

pub(crate) static UPLOADS: Counter = Counter::new("aifun.attachment.uploads");
pub(crate) static UPLOAD_FAILURES: Counter = Counter::new("aifun.attachment.upload_failures");

pub(crate) static CYCLES_STARTED: Counter = Counter::new("aifun.cycle.started");
pub(crate) static CYCLES_COMMITTED: Counter = Counter::new("aifun.cycle.committed");
pub(crate) static CYCLES_FAILED: Counter = Counter::new("aifun.cycle.failed");
pub(crate) static CYCLES_CANCELLED: Counter = Counter::new("aifun.cycle.cancelled");
pub(crate) static CYCLES_REJECTED: Counter = Counter::new("aifun.cycle.rejected");
pub(crate) static CYCLE_CHUNKS: Counter = Counter::new("aifun.cycle.chunks");
pub(crate) static CYCLE_CHUNK_BYTES: Counter = Counter::new("aifun.cycle.chunk_bytes");
pub(crate) static CYCLE_DURATION: Moments = Moments::new("aifun.cycle.duration_seconds");

pub(crate) static RENDER_FALLBACKS: Counter = Counter::new("aifun.render.fallbacks");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&UPLOADS);
    collector.register_counter(&UPLOAD_FAILURES);

    collector.register_counter(&CYCLES_STARTED);
    collector.register_counter(&CYCLES_COMMITTED);
    collector.register_counter(&CYCLES_FAILED);
    collector.register_counter(&CYCLES_CANCELLED);
    collector.register_counter(&CYCLES_REJECTED);
    collector.register_counter(&CYCLE_CHUNKS);
    collector.register_counter(&CYCLE_CHUNK_BYTES);
    collector.register_moments(&CYCLE_DURATION);

    collector.register_counter(&RENDER_FALLBACKS);
}

/// A point-in-time view of the cycle counters, for the `/stats` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Cycles that opened a generation.
    pub started: u64,
    /// Cycles whose turns were committed.
    pub committed: u64,
    /// Cycles that ended with an error other than cancellation.
    pub failed: u64,
    /// Cycles cancelled by the user.
    pub cancelled: u64,
    /// Submissions rejected because a cycle was in flight.
    pub rejected: u64,
    /// Chunks received over all cycles.
    pub chunks: u64,
    /// Bytes of chunk text received over all cycles.
    pub chunk_bytes: u64,
}

impl CycleStats {
    /// Read the current counter values.
    pub fn snapshot() -> Self {
        Self {
            started: CYCLES_STARTED.read(),
            committed: CYCLES_COMMITTED.read(),
            failed: CYCLES_FAILED.read(),
            cancelled: CYCLES_CANCELLED.read(),
            rejected: CYCLES_REJECTED.read(),
            chunks: CYCLE_CHUNKS.read(),
            chunk_bytes: CYCLE_CHUNK_BYTES.read(),
        }
    }
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cycles: {} started, {} committed, {} failed, {} cancelled, {} rejected; chunks: {} ({} bytes)",
            self.started,
            self.committed,
            self.failed,
            self.cancelled,
            self.rejected,
            self.chunks,
            self.chunk_bytes
        )
    }
}
