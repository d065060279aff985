//! External compiler driver.
//!
//! Invocation contract: `<compiler> <source.sp> -o<out>.smx -i<includes>`;
//! exit code 0 **and** the expected artifact present means success, anything
//! else is a build failure for that resource. Builds are never retried; a
//! hung compiler is killed after the configured timeout.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use kettle_core::ResourceName;

use crate::error::SyncError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How much compiler output to keep in a failure reason.
const OUTPUT_PREVIEW_LIMIT: usize = 600;

fn build_err(name: &ResourceName, reason: impl Into<String>) -> SyncError {
    SyncError::Build {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Compile a staged plugin source, returning the artifact path on success.
pub fn compile_plugin(
    compiler: &Path,
    source: &Path,
    out_dir: &Path,
    includes_dir: &Path,
    name: &ResourceName,
    timeout: Duration,
) -> Result<PathBuf, SyncError> {
    if !compiler.is_file() {
        return Err(build_err(
            name,
            format!("compiler not found at {}", compiler.display()),
        ));
    }

    let artifact = out_dir.join(format!("{name}.smx"));
    tracing::debug!("compiling '{name}' with {}", compiler.display());

    let mut child = Command::new(compiler)
        .arg(source)
        .arg(format!("-o{}", artifact.display()))
        .arg(format!("-i{}", includes_dir.display()))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| build_err(name, format!("failed to spawn compiler: {e}")))?;

    // Drain both pipes from the start; a compiler that fills the OS pipe
    // buffer with warnings would otherwise block on write and never exit.
    let stdout_tap = child.stdout.take().map(PipeTap::spawn);
    let stderr_tap = child.stderr.take().map(PipeTap::spawn);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                // Snapshot instead of joining: a grandchild may still hold
                // the pipe open after the kill.
                let output = preview([
                    stdout_tap.as_ref().map(PipeTap::snapshot).unwrap_or_default(),
                    stderr_tap.as_ref().map(PipeTap::snapshot).unwrap_or_default(),
                ]);
                return Err(build_err(
                    name,
                    format!("build timed out after {}s: {output}", timeout.as_secs()),
                ));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(build_err(name, format!("failed waiting on compiler: {e}")));
            }
        }
    };

    let output = preview([
        stdout_tap.map(PipeTap::finish).unwrap_or_default(),
        stderr_tap.map(PipeTap::finish).unwrap_or_default(),
    ]);

    if !status.success() {
        return Err(build_err(
            name,
            format!("compiler exited with {status}: {output}"),
        ));
    }
    if !artifact.is_file() {
        return Err(build_err(
            name,
            format!(
                "compiler exited 0 but produced no artifact at {}",
                artifact.display()
            ),
        ));
    }

    tracing::info!("compiled '{name}' -> {}", artifact.display());
    Ok(artifact)
}

/// Background reader for one compiler pipe.
struct PipeTap {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: thread::JoinHandle<()>,
}

impl PipeTap {
    fn spawn<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut sink) => sink.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                }
            }
        });
        PipeTap { buf, handle }
    }

    /// Whatever has been read so far; the reader keeps running.
    fn snapshot(&self) -> String {
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).trim().to_owned(),
            Err(_) => String::new(),
        }
    }

    /// Wait for EOF and return everything the pipe produced.
    fn finish(self) -> String {
        let _ = self.handle.join();
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).trim().to_owned(),
            Err(_) => String::new(),
        }
    }
}

/// Combine stdout and stderr into a reason-sized preview.
fn preview(parts: [String; 2]) -> String {
    let mut combined = String::new();
    for part in parts {
        if part.is_empty() {
            continue;
        }
        if !combined.is_empty() {
            combined.push('\n');
        }
        combined.push_str(&part);
    }
    if combined.len() > OUTPUT_PREVIEW_LIMIT {
        let mut cut = OUTPUT_PREVIEW_LIMIT;
        while !combined.is_char_boundary(cut) {
            cut -= 1;
        }
        combined.truncate(cut);
        combined.push('…');
    }
    if combined.is_empty() {
        combined.push_str("(no compiler output)");
    }
    combined
}
