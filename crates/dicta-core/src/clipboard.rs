//! Clipboard export for the current transcript.
//!
//! Primary path is the system clipboard via arboard. When that is
//! unavailable (headless session, missing portal, unsupported compositor
//! protocol), the text is piped through an external clipboard helper
//! instead. Either way the caller gets a typed result, never a panic.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::CopyError;

/// Helper utilities for the fallback path, tried in order.
const FALLBACK_HELPERS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Copy `text` to the system clipboard.
///
/// Empty input is a no-op that touches nothing and reports success; callers
/// gate the action on a non-empty transcript anyway. Otherwise the primary
/// clipboard is tried first and the helper chain after it; both failure
/// reasons are carried in the returned [`CopyError`].
pub fn copy_to_clipboard(text: &str) -> Result<(), CopyError> {
    if text.is_empty() {
        return Ok(());
    }

    match primary_copy(text) {
        Ok(()) => Ok(()),
        Err(primary) => {
            crate::verbose!("clipboard: primary copy failed ({primary}), trying helpers");
            fallback_copy(text).map_err(|fallback| CopyError {
                reason: format!("{primary}; {fallback}"),
            })
        }
    }
}

fn primary_copy(text: &str) -> Result<(), String> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| format!("clipboard unavailable: {e}"))?;
    clipboard
        .set_text(text)
        .map_err(|e| format!("clipboard write failed: {e}"))?;
    Ok(())
}

fn fallback_copy(text: &str) -> Result<(), String> {
    let mut failures = Vec::new();
    for (helper, args) in FALLBACK_HELPERS {
        match copy_via_helper(helper, args, text) {
            Ok(()) => {
                crate::verbose!("clipboard: copied via {helper}");
                return Ok(());
            }
            Err(e) => failures.push(format!("{helper}: {e}")),
        }
    }
    Err(failures.join(", "))
}

/// Pipe `text` through a helper's stdin.
///
/// The child is reaped before this function returns on every path, success
/// or failure, so an attempt never leaves a process behind.
fn copy_via_helper(helper: &str, args: &[&str], text: &str) -> Result<(), String> {
    let mut child = Command::new(helper)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("failed to spawn: {e}"))?;

    let write_result = match child.stdin.take() {
        // Dropping the handle closes the pipe so the helper sees EOF.
        Some(mut stdin) => stdin
            .write_all(text.as_bytes())
            .map_err(|e| format!("failed to write: {e}")),
        None => Err("no stdin handle".to_string()),
    };

    if let Err(e) = write_result {
        let _ = child.kill();
        let _ = child.wait();
        return Err(e);
    }

    let status = child
        .wait()
        .map_err(|e| format!("failed to wait on helper: {e}"))?;
    if !status.success() {
        return Err(format!("exited with {status}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_a_successful_noop() {
        // Returns before touching any clipboard mechanism.
        assert!(copy_to_clipboard("").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn helper_pipe_succeeds_with_a_consuming_command() {
        assert!(copy_via_helper("cat", &[], "hello").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn missing_helper_is_an_error_not_a_panic() {
        let result = copy_via_helper("definitely-not-a-clipboard-helper", &[], "hello");
        assert!(result.unwrap_err().contains("failed to spawn"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_helper_is_reaped_and_reported() {
        // `false` exits nonzero without reading stdin; depending on timing the
        // write fails with a broken pipe or the wait sees the exit status.
        // Both paths reap the child and return an error.
        let result = copy_via_helper("false", &[], "hello");
        assert!(result.is_err());
    }
}
