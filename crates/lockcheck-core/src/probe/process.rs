//! Process-creation probes: spawn, shell indirection and fork

use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

use super::network::response_preview;
use super::{Attempt, Probe, names};

const OUTPUT_PREVIEW_CHARS: usize = 120;

/// Runs an external program directly through the process-creation API
#[derive(Debug, Clone)]
pub struct SpawnProbe {
    program: String,
    args: Vec<String>,
}

impl SpawnProbe {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for SpawnProbe {
    fn default() -> Self {
        Self::new("id", Vec::new())
    }
}

impl Probe for SpawnProbe {
    fn name(&self) -> &str {
        names::SPAWN_PROCESS
    }

    fn description(&self) -> &str {
        "Spawn an external program"
    }

    fn attempt(&self) -> Attempt {
        let result = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output();

        match result {
            // Any completed run counts, whatever the child's exit status
            Ok(output) => Attempt::succeeded(format!(
                "`{}` ran ({}): {}",
                self.program,
                output.status,
                response_preview(&output.stdout, OUTPUT_PREVIEW_CHARS).trim()
            )),
            Err(e) if e.raw_os_error().is_some() => {
                debug!("spawn of {} refused: {}", self.program, e);
                Attempt::denied(format!("spawn refused: {}", e))
            }
            Err(e) => Attempt::inconclusive(e.to_string()),
        }
    }
}

/// Runs a command line through `sh -c`, judged purely by exit status
#[derive(Debug, Clone)]
pub struct ShellProbe {
    shell: PathBuf,
    command: String,
}

impl ShellProbe {
    pub fn new(shell: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            command: command.into(),
        }
    }
}

impl Default for ShellProbe {
    fn default() -> Self {
        Self::new("/bin/sh", "echo 'should not work'")
    }
}

impl Probe for ShellProbe {
    fn name(&self) -> &str {
        names::SHELL_COMMAND
    }

    fn description(&self) -> &str {
        "Run a command through a shell"
    }

    fn attempt(&self) -> Attempt {
        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => {
                Attempt::succeeded(format!("shell command returned {}", status))
            }
            Ok(status) => Attempt::denied(format!("shell command returned {}", status)),
            Err(e) => Attempt::denied(format!("shell could not start: {}", e)),
        }
    }
}

/// Duplicates the current process. A child that does get created exits
/// immediately and is reaped before the probe returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForkProbe;

impl Probe for ForkProbe {
    fn name(&self) -> &str {
        names::FORK_PROCESS
    }

    fn description(&self) -> &str {
        "Duplicate the current process"
    }

    fn attempt(&self) -> Attempt {
        fork_and_reap()
    }
}

#[cfg(unix)]
fn fork_and_reap() -> Attempt {
    use nix::unistd::{ForkResult, fork};

    // SAFETY: the child calls nothing but `_exit`, which is async-signal-safe.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => unsafe { nix::libc::_exit(0) },
        Ok(ForkResult::Parent { child }) => match reap(child) {
            Ok(status) => {
                Attempt::succeeded(format!("fork created child {}, reaped: {:?}", child, status))
            }
            Err(e) => Attempt::succeeded(format!(
                "fork created child {}, reaping failed: {}",
                child, e
            )),
        },
        Err(errno) => Attempt::denied(format!("fork refused: {}", errno)),
    }
}

#[cfg(unix)]
fn reap(child: nix::unistd::Pid) -> nix::Result<nix::sys::wait::WaitStatus> {
    use nix::errno::Errno;
    use nix::sys::wait::waitpid;

    loop {
        match waitpid(child, None) {
            Err(Errno::EINTR) => continue,
            other => return other,
        }
    }
}

#[cfg(not(unix))]
fn fork_and_reap() -> Attempt {
    Attempt::inconclusive("fork is not available on this platform")
}
