//! Per-OS dispatch for revealing files and posting notifications.
//!
//! Thin wrappers over the platform's own tools; message text is composed by
//! the caller.

use std::io;
use std::path::Path;
use std::process::Command;

/// Reveals a file or folder in the system file manager.
///
/// macOS opens Finder with the entry selected, Windows does the same in
/// Explorer, and other platforms open the parent folder with `xdg-open`.
pub fn reveal_in_file_manager(path: &Path) -> io::Result<()> {
    if cfg!(target_os = "macos") {
        Command::new("open").arg("-R").arg(path).status()?;
    } else if cfg!(target_os = "windows") {
        Command::new("explorer").arg("/select,").arg(path).status()?;
    } else {
        let target = path.parent().unwrap_or(path);
        Command::new("xdg-open").arg(target).status()?;
    }
    Ok(())
}

/// Posts a desktop notification.
///
/// Uses `osascript` on macOS and `notify-send` elsewhere; on platforms
/// without either this quietly does nothing.
pub fn send_notification(title: &str, message: &str) -> io::Result<()> {
    if cfg!(target_os = "macos") {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            escape_applescript(message),
            escape_applescript(title)
        );
        Command::new("osascript").arg("-e").arg(script).status()?;
    } else if cfg!(target_os = "windows") {
        // No portable native channel without extra dependencies; skip.
    } else {
        Command::new("notify-send").arg(title).arg(message).status()?;
    }
    Ok(())
}

/// Escapes double quotes and backslashes for embedding in an AppleScript
/// string literal.
fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
