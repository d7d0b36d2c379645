use std::fmt;
use std::sync::{Arc, Mutex, Once};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub use meanfold_result::DIAGNOSTICS_TARGET;

static INIT: Once = Once::new();

/// Initialize tracing for test binaries. Safe to call multiple times.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let env = std::env::var("RUST_LOG").ok();
        let filter = match env {
            Some(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            None => EnvFilter::new("info"),
        };
        // Another harness may have installed a global subscriber already.
        let _ = fmt().with_env_filter(filter).with_target(false).try_init();
    });
}

#[cfg(feature = "auto-init")]
mod auto {
    use ctor::ctor;

    #[ctor]
    fn init() {
        super::init_tracing_for_tests();
    }
}

/// One warning captured on [`DIAGNOSTICS_TARGET`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    /// The `step` field, when the event carried one.
    pub step: Option<String>,
    /// The `error` field, when the event carried one.
    pub error: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(step) = &self.step {
            write!(f, " step={step}")?;
        }
        if let Some(error) = &self.error {
            write!(f, " error={error}")?;
        }
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return what it logged on
/// [`DIAGNOSTICS_TARGET`] at `WARN` or above.
///
/// Tests use this to assert that a computation produced no arithmetic
/// diagnostics, or exactly the expected ones.
pub fn capture_diagnostics<R>(f: impl FnOnce() -> R) -> (R, Vec<Diagnostic>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let layer = CaptureLayer {
        captured: Arc::clone(&captured),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    let result = tracing::subscriber::with_default(subscriber, f);
    let diagnostics = match Arc::try_unwrap(captured) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
        Err(shared) => shared
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default(),
    };
    (result, diagnostics)
}

struct CaptureLayer {
    captured: Arc<Mutex<Vec<Diagnostic>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() != DIAGNOSTICS_TARGET || *metadata.level() > Level::WARN {
            return;
        }
        let mut visitor = DiagnosticVisitor::default();
        event.record(&mut visitor);
        if let Ok(mut captured) = self.captured.lock() {
            captured.push(Diagnostic {
                message: visitor.message,
                step: visitor.step,
                error: visitor.error,
            });
        }
    }
}

#[derive(Default)]
struct DiagnosticVisitor {
    message: String,
    step: Option<String>,
    error: Option<String>,
}

impl Visit for DiagnosticVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "step" => self.step = Some(value.to_string()),
            "error" => self.error = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let text = format!("{value:?}");
        match field.name() {
            "step" => self.step = Some(text),
            "error" => self.error = Some(text),
            "message" => self.message = text,
            _ => {}
        }
    }
}
