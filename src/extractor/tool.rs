use crate::error::{PotGatherError, Result};
use std::ffi::{OsStr, OsString};
use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A single external program run, supervised by an optional deadline.
///
/// Arguments go straight to the process, never through a shell, so file
/// names with spaces or shell metacharacters arrive unchanged.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    program: String,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stderr: String,
}

impl ToolInvocation {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Human readable command line, for diagnostics only.
    pub fn command_line(&self) -> String {
        let mut line = quote_for_display(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote_for_display(&arg.to_string_lossy()));
        }
        line
    }

    pub fn run(&self) -> Result<ToolOutput> {
        debug!(target: "potgather::extractor", command = %self.command_line(), "running tool");

        let deadline = self.timeout.map(|limit| (Instant::now() + limit, limit));

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Own process group; a timeout kills the whole group.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| PotGatherError::ToolSpawn {
            program: self.program.clone(),
            source,
        })?;

        // Drain stderr concurrently so a chatty tool cannot block on a
        // full pipe while we poll for its exit.
        let pipe = child.stderr.take();
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut buffer = String::new();
            if let Some(mut pipe) = pipe {
                let _ = pipe.read_to_string(&mut buffer);
            }
            let _ = sender.send(buffer);
        });

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }

            if let Some((at, limit)) = deadline {
                if Instant::now() >= at {
                    terminate(&mut child);
                    return Err(self.timed_out(limit));
                }
            }

            thread::sleep(POLL_INTERVAL);
        };

        // stderr reaches EOF only once every process holding it is gone,
        // which includes anything the tool left running in the background.
        let stderr = match deadline {
            Some((at, limit)) => {
                match receiver.recv_timeout(at.saturating_duration_since(Instant::now())) {
                    Ok(buffer) => buffer,
                    Err(RecvTimeoutError::Disconnected) => String::new(),
                    Err(RecvTimeoutError::Timeout) => {
                        warn!(
                            target: "potgather::extractor",
                            program = %self.program,
                            "tool exited but a process it started still holds stderr open"
                        );
                        terminate(&mut child);
                        return Err(self.timed_out(limit));
                    }
                }
            }
            None => receiver.recv().unwrap_or_default(),
        };

        if !status.success() {
            return Err(PotGatherError::ToolFailed {
                program: self.program.clone(),
                status,
                stderr,
            });
        }

        Ok(ToolOutput { stderr })
    }

    fn timed_out(&self, limit: Duration) -> PotGatherError {
        PotGatherError::ToolTimeout {
            program: self.program.clone(),
            timeout: limit,
        }
    }
}

/// Kills the tool together with its process group.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let _ = Command::new("kill")
            .args(["-KILL", "--", group.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }

    let _ = child.kill();
    let _ = child.wait();
}

fn quote_for_display(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || "'\"\\$`;&|<>()*?[]{}".contains(c));

    if needs_quotes {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}
