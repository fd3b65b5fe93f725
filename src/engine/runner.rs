//! Fire-and-forget launching of bound shell commands.
//!
//! Dispatch must never block on a command, so children are spawned
//! detached with null stdio and reaped on a helper thread. A launch
//! failure is logged and never surfaced to the dispatch path.

use std::process::{Command, Stdio};
use std::thread;
use tracing::warn;

/// Seam between dispatch and process spawning, so the engine is
/// testable without launching anything.
pub trait CommandRunner {
    fn spawn(&self, shell: &str, command: &str);
}

/// Launches `<shell> -c <command>` detached.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn spawn(&self, shell: &str, command: &str) {
        match Command::new(shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(mut child) => {
                // Passive reaping; never joined by the event loop.
                thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(err) => {
                warn!(shell, command, error = %err, "failed to launch bound command");
            }
        }
    }
}
