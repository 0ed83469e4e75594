//! Escalation of unrecoverable ticker failures.
//!
//! A runtime whose tick source silently stopped would lose preemption and
//! profiling without noticing, so creation, handler-install and
//! (dis)arm failures end the process with a diagnostic instead.

use ticker_common::error::{TickerError, TickerResult};
use tracing::error;

/// Terminate the process with a diagnostic for `err`.
pub fn die(err: &TickerError) -> ! {
    error!(
        error = %err,
        primitive = err.primitive().unwrap_or("-"),
        "Ticker failure is unrecoverable, terminating"
    );
    eprintln!("{}: {err}", program_name());
    std::process::exit(libc::EXIT_FAILURE)
}

/// Pass through `result` unless it carries a fatal error.
///
/// # Errors
///
/// Non-fatal errors are returned unchanged; fatal ones never return.
pub fn escalate<T>(result: TickerResult<T>) -> TickerResult<T> {
    match result {
        Err(err) if err.is_fatal() => die(&err),
        other => other,
    }
}

fn program_name() -> String {
    std::env::args()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "ticker".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_fatal_passes_through() {
        let result: TickerResult<()> = Err(TickerError::AlreadyClaimed);
        assert_eq!(escalate(result), Err(TickerError::AlreadyClaimed));

        let deletion: TickerResult<()> = Err(TickerError::ResourceDeletion {
            primitive: "timer_delete",
            reason: "EINVAL: Invalid argument".into(),
        });
        assert!(escalate(deletion).is_err());

        assert_eq!(escalate(Ok(7)), Ok(7));
    }

    const CHILD_ENV: &str = "TICKER_FATAL_CHILD";

    // Re-runs this test binary filtered to this test; the child escalates a
    // fatal error and must exit with EXIT_FAILURE and a diagnostic.
    #[test]
    fn test_fatal_error_exits_process() {
        if std::env::var_os(CHILD_ENV).is_some() {
            let _ = escalate::<()>(Err(TickerError::HandlerInstall {
                primitive: "sigaction",
                reason: "EINVAL: Invalid argument".into(),
            }));
            unreachable!("fatal error returned");
        }

        let output = std::process::Command::new(std::env::current_exe().unwrap())
            .args([
                "fatal::tests::test_fatal_error_exits_process",
                "--exact",
                "--nocapture",
                "--test-threads=1",
            ])
            .env(CHILD_ENV, "1")
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(libc::EXIT_FAILURE));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains(": sigaction: EINVAL: Invalid argument"),
            "unexpected stderr: {stderr}"
        );
    }

    #[test]
    fn test_program_name_is_not_a_path() {
        assert!(!program_name().contains('/'));
    }
}
