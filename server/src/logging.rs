use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Install the process-wide subscriber. `RUST_LOG` wins when set.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,holdem_server=debug"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to set global default subscriber");
}

/// One captured log line, for assertions in tests.
#[derive(Debug, Clone)]
pub struct CapturedLog {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

/// A tracing layer that records events instead of printing them, so
/// tests can assert on what the server logged.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    entries: Arc<Mutex<Vec<CapturedLog>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<CapturedLog> {
        self.entries.lock().expect("log capture poisoned").clone()
    }

    pub fn clear(&self) {
        self.entries.lock().expect("log capture poisoned").clear();
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.message.contains(needle))
    }

    pub fn layer<S>(&self) -> CaptureLayer<S>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        CaptureLayer {
            capture: self.clone(),
            _subscriber: PhantomData,
        }
    }
}

pub struct CaptureLayer<S> {
    capture: LogCapture,
    _subscriber: PhantomData<S>,
}

impl<S> Layer<S> for CaptureLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut message = None;
        let mut fields = Vec::new();
        let mut visitor = |field: &tracing::field::Field, value: &dyn std::fmt::Debug| {
            let rendered = format!("{value:?}");
            if field.name() == "message" {
                message = Some(rendered);
            } else {
                fields.push((field.name().to_string(), rendered));
            }
        };
        event.record(&mut DebugVisitor(&mut visitor));

        let metadata = event.metadata();
        self.capture
            .entries
            .lock()
            .expect("log capture poisoned")
            .push(CapturedLog {
                level: *metadata.level(),
                target: metadata.target().to_string(),
                message: message.unwrap_or_default(),
                fields,
            });
    }
}

struct DebugVisitor<'a>(&'a mut dyn FnMut(&tracing::field::Field, &dyn std::fmt::Debug));

impl tracing::field::Visit for DebugVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        (self.0)(field, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[test]
    fn capture_records_levels_messages_and_fields() {
        let capture = LogCapture::new();
        let registry = Registry::default().with(capture.layer());

        tracing::subscriber::with_default(registry, || {
            tracing::info!(table_id = "t-1", "table created");
            tracing::warn!("slow subscriber");
        });

        let entries = capture.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, Level::INFO);
        assert!(entries[0].message.contains("table created"));
        assert!(entries[0]
            .fields
            .iter()
            .any(|(k, v)| k == "table_id" && v.contains("t-1")));
        assert_eq!(entries[1].level, Level::WARN);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let capture = LogCapture::new();
        let registry = Registry::default().with(capture.layer());
        tracing::subscriber::with_default(registry, || {
            tracing::info!("one");
        });
        assert_eq!(capture.entries().len(), 1);
        capture.clear();
        assert!(capture.entries().is_empty());
    }
}
