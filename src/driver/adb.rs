use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::traits::{BackendError, RawInput};

/// Locate the adb binary on PATH or under ANDROID_HOME.
pub fn find_adb() -> Result<PathBuf, BackendError> {
    if let Ok(path) = which::which("adb") {
        return Ok(path);
    }
    if let Ok(home) = std::env::var("ANDROID_HOME") {
        let candidate = PathBuf::from(home).join("platform-tools").join("adb");
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(BackendError::Transport(
        "adb binary not found on PATH or under ANDROID_HOME".to_string(),
    ))
}

/// Represents a connected Android device.
#[derive(Debug, Clone)]
pub struct Device {
    pub serial: String,
    pub state: String,
}

/// Get the list of connected Android devices.
pub async fn list_devices() -> Result<Vec<Device>, BackendError> {
    let adb_path = find_adb()?;
    let output = Command::new(adb_path)
        .args(["devices"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| BackendError::Transport(format!("failed to execute adb devices: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut devices = Vec::new();
    for line in stdout.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            devices.push(Device {
                serial: parts[0].to_string(),
                state: parts[1].to_string(),
            });
        }
    }
    Ok(devices)
}

/// Execute an adb shell command against one device.
async fn shell(serial: Option<&str>, cmd: &str) -> Result<String, BackendError> {
    let mut args = Vec::new();
    if let Some(s) = serial {
        args.push("-s");
        args.push(s);
    }
    args.push("shell");
    args.push(cmd);

    let adb_path = find_adb()?;
    let output = Command::new(adb_path)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| BackendError::Transport(format!("failed to execute adb shell {}: {}", cmd, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BackendError::Transport(format!(
            "adb shell command failed: {}",
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Escape text for `input text`. Spaces become %s; shell metacharacters are
/// backslashed. The payload is wrapped in single quotes on the wire, where a
/// backslash is literal, so an apostrophe has to be spliced out as '\''.
fn escape_input_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(' ', "%s")
        .replace('"', "\\\"")
        .replace('\'', "'\\''")
        .replace('&', "\\&")
        .replace('<', "\\<")
        .replace('>', "\\>")
        .replace('|', "\\|")
        .replace(';', "\\;")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Raw input-injection channel backed by `adb shell input`.
///
/// Cannot target a specific element, only the focused field or fixed
/// coordinates; the engine uses it strictly as a last resort.
pub struct AdbInput {
    serial: Option<String>,
}

impl AdbInput {
    pub fn new(serial: Option<&str>) -> Self {
        Self {
            serial: serial.map(|s| s.to_string()),
        }
    }
}

#[async_trait]
impl RawInput for AdbInput {
    async fn inject_text(&self, text: &str) -> Result<(), BackendError> {
        let escaped = escape_input_text(text);
        shell(self.serial.as_deref(), &format!("input text '{}'", escaped)).await?;
        Ok(())
    }

    async fn inject_swipe(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration: Duration,
    ) -> Result<(), BackendError> {
        shell(
            self.serial.as_deref(),
            &format!(
                "input touchscreen swipe {} {} {} {} {}",
                x1,
                y1,
                x2,
                y2,
                duration.as_millis()
            ),
        )
        .await?;
        Ok(())
    }

    async fn inject_key(&self, keycode: u32) -> Result<(), BackendError> {
        shell(self.serial.as_deref(), &format!("input keyevent {}", keycode)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_input_text_spaces() {
        assert_eq!(escape_input_text("hello world"), "hello%sworld");
    }

    #[test]
    fn test_escape_input_text_metacharacters() {
        assert_eq!(escape_input_text("a&b;c"), "a\\&b\\;c");
    }

    #[test]
    fn test_escape_input_text_apostrophe_splices_quotes() {
        // Leaves the single-quoted word, emits a quoted apostrophe, reopens.
        assert_eq!(escape_input_text("it's"), "it'\\''s");
    }
}
