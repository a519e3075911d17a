use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use tracing::warn;

use crate::trace::trace::TraceEvent;

/// Appends `TraceEvent`s to a file, one JSON object per line.
///
/// Both fan-out branches of a request write through the same logger, so the
/// file handle sits behind a mutex. A logger whose file could not be opened
/// silently drops events; tracing never fails a request.
pub struct TraceLogger {
    sink: Option<Mutex<File>>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let sink = File::options()
            .create(true)
            .append(true)
            .open(path)
            .map(Mutex::new)
            .inspect_err(|e| {
                warn!(path = %path.display(), error = %e, "could not open trace file; tracing disabled");
            })
            .ok();

        Self { sink }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else {
            return;
        };

        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(request_id = %event.request_id, error = %e, "failed to serialize trace event");
                return;
            }
        };

        let result = match sink.lock() {
            Ok(mut file) => writeln!(file, "{}", line),
            Err(_) => {
                warn!(request_id = %event.request_id, "trace file lock poisoned; event dropped");
                return;
            }
        };

        if let Err(e) = result {
            warn!(request_id = %event.request_id, error = %e, "failed to write trace event");
        }
    }
}
