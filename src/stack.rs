//! Call-stack capture for error reports
//!
//! Walks the call stack starting immediately above the reporting call,
//! formatting one `file:line` entry per frame. The walk stops at the first
//! frame that cannot be resolved, typically the runtime boundary or a frame
//! with no debug info.

use std::any::Any;

/// Frames below the caller: capture machinery, this crate's reporting
/// plumbing, and panic unwinding. Skipped before the first reported frame.
const INTERNAL_PREFIXES: &[&str] = &[
    "backtrace::",
    "xavier_telemetry::",
    "std::panicking",
    "core::panicking",
    "std::panic",
    "rust_begin_unwind",
    "__rust",
];

fn is_internal(name: &str) -> bool {
    INTERNAL_PREFIXES.iter().any(|p| name.starts_with(p))
        || (name.starts_with('<') && INTERNAL_PREFIXES.iter().any(|p| name[1..].starts_with(p)))
}

/// Capture the current call stack as newline-separated `file:line` entries.
pub(crate) fn capture_stack() -> String {
    let bt = backtrace::Backtrace::new();
    let mut stack = String::new();
    let mut skipping = true;

    for frame in bt.frames() {
        let symbol = frame.symbols().first();

        if skipping {
            let internal = symbol
                .and_then(|s| s.name())
                .map(|name| is_internal(&name.to_string()))
                .unwrap_or(true);
            if internal {
                continue;
            }
            skipping = false;
        }

        let resolved = symbol.and_then(|s| Some((s.filename()?, s.lineno()?)));
        let (file, line) = match resolved {
            Some(location) => location,
            None => break,
        };

        stack.push_str(&format!("  {}:{}\n", file.display(), line));
    }

    stack
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
