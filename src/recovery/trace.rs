//! Panic trace capture.
//!
//! A process-wide panic hook records the panic location and a backtrace
//! while a recovery frame is active on the panicking thread. Panics outside
//! a recovery frame are forwarded to the previously installed hook untouched.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::{Cell, RefCell};
use std::panic;
use std::path::Path;
use std::sync::Once;

/// Maximum number of frames rendered into a trace.
const MAX_FRAMES: usize = 8;

/// Frames from the language runtime and from the recovery plumbing itself.
pub(crate) const INTERNAL_FRAMES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "__rust",
    "rust_begin_unwind",
    "rust_panic",
    "statewalk::recovery::catch",
    "statewalk::recovery::trace",
];

thread_local! {
    static ACTIVE_FRAMES: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Panic details recorded by the hook.
pub(crate) struct Captured {
    pub(crate) location: Option<String>,
    pub(crate) backtrace: Backtrace,
}

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let active = ACTIVE_FRAMES.try_with(|n| n.get() > 0).unwrap_or(false);
            if !active {
                previous(info);
                return;
            }

            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
            let captured = Captured {
                location,
                backtrace: Backtrace::force_capture(),
            };
            let _ = CAPTURED.try_with(|slot| *slot.borrow_mut() = Some(captured));
        }));
    });
}

/// Marks the current thread as running inside a recovery frame.
pub(crate) struct CaptureScope {
    _private: (),
}

impl CaptureScope {
    pub(crate) fn enter() -> Self {
        install_hook();
        ACTIVE_FRAMES.with(|n| n.set(n.get() + 1));
        Self { _private: () }
    }

    /// Take whatever the hook recorded for the most recent panic.
    pub(crate) fn take(&self) -> Option<Captured> {
        CAPTURED.with(|slot| slot.borrow_mut().take())
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        let _ = ACTIVE_FRAMES.try_with(|n| n.set(n.get().saturating_sub(1)));
    }
}

#[derive(Debug, PartialEq)]
struct Frame {
    function: String,
    location: Option<String>,
}

/// Render a panic location and backtrace as a multi-line description.
///
/// Each kept frame becomes one `path:line function` line. Paths, including
/// the leading location line, are made relative to the working directory.
/// The location line is dropped when the first kept frame already points
/// at it. Frames whose function name contains any entry of `skip` are left
/// out. The result is never empty.
pub fn describe(location: Option<&str>, backtrace: &Backtrace, skip: &[&str]) -> String {
    let frames = if backtrace.status() == BacktraceStatus::Captured {
        parse_frames(&backtrace.to_string())
    } else {
        Vec::new()
    };
    let workdir = std::env::current_dir().ok();
    render_frames(location, frames, skip, workdir.as_deref())
}

fn render_frames(
    location: Option<&str>,
    frames: Vec<Frame>,
    skip: &[&str],
    workdir: Option<&Path>,
) -> String {
    let location = location.map(|at| relative(at, workdir));
    let kept: Vec<Frame> = frames
        .into_iter()
        .filter(|frame| !skip.iter().any(|s| frame.function.contains(s)))
        .take(MAX_FRAMES)
        .map(|frame| Frame {
            location: frame.location.map(|at| relative(&at, workdir)),
            function: frame.function,
        })
        .collect();

    let mut lines: Vec<String> = Vec::with_capacity(kept.len() + 1);
    if let Some(location) = location {
        let repeated = kept
            .first()
            .is_some_and(|frame| frame.location.as_deref() == Some(location.as_str()));
        if !repeated {
            lines.push(location);
        }
    }
    lines.extend(kept.into_iter().map(|frame| match frame.location {
        Some(at) => format!("{at} {}", frame.function),
        None => frame.function,
    }));

    if lines.is_empty() {
        return "<unknown location>".to_string();
    }
    lines.join("\n")
}

/// Render the recorded panic, falling back to a backtrace of the caller
/// when the hook did not run (another hook replaced ours).
pub(crate) fn render(captured: Option<Captured>) -> (Option<String>, String) {
    match captured {
        Some(captured) => {
            let trace = describe(
                captured.location.as_deref(),
                &captured.backtrace,
                INTERNAL_FRAMES,
            );
            (captured.location, trace)
        }
        None => {
            let backtrace = Backtrace::force_capture();
            (None, describe(None, &backtrace, INTERNAL_FRAMES))
        }
    }
}

fn parse_frames(rendered: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    for line in rendered.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(at) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                frame.location.get_or_insert_with(|| at.to_string());
            }
            continue;
        }
        let function = match line.split_once(": ") {
            Some((index, name)) if index.chars().all(|c| c.is_ascii_digit()) => name,
            _ => line,
        };
        frames.push(Frame {
            function: strip_hash(function).to_string(),
            location: None,
        });
    }
    frames
}

/// Drop the `::h0123456789abcdef` suffix of legacy-mangled symbols.
fn strip_hash(function: &str) -> &str {
    match function.rsplit_once("::h") {
        Some((name, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
            name
        }
        _ => function,
    }
}

fn relative(path: &str, workdir: Option<&Path>) -> String {
    let under_workdir = workdir
        .and_then(Path::to_str)
        .and_then(|prefix| path.strip_prefix(prefix))
        .filter(|rest| rest.starts_with('/'));
    if let Some(rest) = under_workdir {
        return format!(".{rest}");
    }
    if Path::new(path).is_relative() && !path.starts_with("./") {
        return format!("./{path}");
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "   0: std::panicking::begin_panic
             at /rustc/abc/library/std/src/panicking.rs:652:12
   1: app::worker::run::{{closure}}::h0123456789abcdef
             at /work/app/src/worker.rs:42:9
   2: app::main
             at /work/app/src/main.rs:7:5
   3: __rust_begin_short_backtrace
";

    #[test]
    fn parse_frames_pairs_functions_with_locations() {
        let frames = parse_frames(SAMPLE);
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[1].function, "app::worker::run::{{closure}}");
        assert_eq!(
            frames[1].location.as_deref(),
            Some("/work/app/src/worker.rs:42:9")
        );
        assert_eq!(frames[3].location, None);
    }

    #[test]
    fn strip_hash_only_removes_symbol_hashes() {
        assert_eq!(strip_hash("a::b::h0123456789abcdef"), "a::b");
        assert_eq!(strip_hash("a::hello"), "a::hello");
    }

    #[test]
    fn relative_paths_start_at_workdir() {
        let workdir = Path::new("/work/app");
        assert_eq!(
            relative("/work/app/src/main.rs:7:5", Some(workdir)),
            "./src/main.rs:7:5"
        );
        assert_eq!(relative("/other/x.rs:1:1", Some(workdir)), "/other/x.rs:1:1");
        assert_eq!(
            relative("/work/application/x.rs:1:1", Some(workdir)),
            "/work/application/x.rs:1:1"
        );
        assert_eq!(relative("src/x.rs:1:1", None), "./src/x.rs:1:1");
        assert_eq!(relative("./src/x.rs:1:1", Some(workdir)), "./src/x.rs:1:1");
    }

    #[test]
    fn describe_without_frames_is_never_empty() {
        let backtrace = Backtrace::disabled();
        assert_eq!(describe(None, &backtrace, &[]), "<unknown location>");
        assert_eq!(
            describe(Some("src/lib.rs:1:1"), &backtrace, &[]),
            "./src/lib.rs:1:1"
        );
    }

    #[test]
    fn location_line_is_not_repeated_by_first_frame() {
        let workdir = Path::new("/work/app");
        let trace = render_frames(
            Some("src/worker.rs:42:9"),
            parse_frames(SAMPLE),
            &["std::", "__rust"],
            Some(workdir),
        );
        assert_eq!(
            trace,
            "./src/worker.rs:42:9 app::worker::run::{{closure}}\n./src/main.rs:7:5 app::main"
        );
    }

    #[test]
    fn location_line_kept_when_frames_point_elsewhere() {
        let workdir = Path::new("/work/app");
        let trace = render_frames(
            Some("src/lib.rs:3:1"),
            parse_frames(SAMPLE),
            &["std::", "__rust", "app::worker"],
            Some(workdir),
        );
        assert_eq!(trace, "./src/lib.rs:3:1\n./src/main.rs:7:5 app::main");
    }

    #[test]
    fn describe_skips_named_frames() {
        let backtrace = Backtrace::force_capture();
        let trace = describe(None, &backtrace, &["describe_skips_named_frames"]);
        assert!(!trace.contains("describe_skips_named_frames"));
    }
}
