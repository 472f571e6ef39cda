use std::sync::Mutex;

use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter, Registry};

lazy_static! {
    static ref LOGGING_INITIALIZED: Mutex<bool> = Mutex::new(false);
}

/// Initialize logging.  If you set the environment variable `RUST_LOG` to a
/// non-empty value, it is interpreted as an `EnvFilter` directive and events
/// are written to stderr; otherwise nothing is installed and the tracing
/// macros cost next to nothing.
///
/// Calling this more than once is harmless, which is convenient for tests.
pub fn init_logging() {
    let mut initialized = match LOGGING_INITIALIZED.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if *initialized {
        return;
    }
    *initialized = true;

    // Our test scripts frequently set RUST_LOG unconditionally but with an
    // empty value, and we don't want that to be interpreted as a desire to
    // enable logging.
    let rustlog = match std::env::var("RUST_LOG") {
        Ok(rustlog) if !rustlog.is_empty() => rustlog,
        _ => return,
    };
    let env_filter = match EnvFilter::try_new(&rustlog) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("Ignoring bad RUST_LOG value {:?}: {}", rustlog, err);
            return;
        }
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .compact()
        // Logs mostly end up in files attached to bug reports, where ANSI
        // escapes are just noise.
        .with_ansi(false)
        .without_time()
        .with_filter(env_filter);

    // Someone else may have installed a subscriber already, which is fine.
    let _ = Registry::default().with(layer).try_init();
}
