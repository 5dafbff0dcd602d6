///
/// QueryTraceSink
///
/// Injected observability hook. The executor reports phase-by-phase row
/// counts to whatever sink the session carries; with no sink installed
/// tracing costs nothing.
///

pub trait QueryTraceSink {
    fn record(&self, event: &QueryTraceEvent);
}

///
/// TracePhase
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TracePhase {
    Source,
    Join,
    Filter,
    Group,
    Order,
    Page,
}

///
/// QueryTraceEvent
///

#[derive(Debug)]
pub enum QueryTraceEvent {
    /// Execution began for a query rooted at `entity`.
    Start { entity: &'static str },

    /// A pipeline phase completed with `rows` surviving.
    Phase { phase: TracePhase, rows: usize },

    /// Execution completed with `rows` results.
    Finish { rows: usize },

    /// Execution failed.
    Failed { message: String },
}

///
/// Tracer
///
/// Thin wrapper so call sites stay quiet when no sink is installed.
///

#[derive(Clone, Copy)]
pub(crate) struct Tracer {
    sink: Option<&'static dyn QueryTraceSink>,
}

impl Tracer {
    pub const fn new(sink: Option<&'static dyn QueryTraceSink>) -> Self {
        Self { sink }
    }

    pub fn record(&self, event: &QueryTraceEvent) {
        if let Some(sink) = self.sink {
            sink.record(event);
        }
    }

    pub fn phase(&self, phase: TracePhase, rows: usize) {
        self.record(&QueryTraceEvent::Phase { phase, rows });
    }
}
