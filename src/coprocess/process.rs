//! Spawned producer process

use super::{Connection, Launcher, Producer};
use crate::config::ProducerConfig;
use crate::error::{MikrError, Result};
use crate::protocol::RawPayload;
use std::io::{self, BufReader, BufWriter};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How long `stop` waits for the producer to exit on its own
const REAP_GRACE: Duration = Duration::from_millis(250);
const REAP_POLL: Duration = Duration::from_millis(10);

/// Producer running as a child process, spoken to over its stdin/stdout
#[derive(Debug)]
pub struct CoProcess {
    program: String,
    child: Option<Child>,
    connection: Connection<BufReader<ChildStdout>, BufWriter<ChildStdin>>,
}

impl CoProcess {
    /// Spawn the producer described by `config`
    pub fn start(config: &ProducerConfig) -> Result<Self> {
        let (program, args) = config.command_line();
        let program_name = program.display().to_string();

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if config.inherit_stderr {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .spawn()
            .map_err(|source| MikrError::Spawn {
                program: program_name.clone(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MikrError::Spawn {
                program: program_name,
                source: io::Error::other("producer pipes were not captured"),
            });
        };

        tracing::info!("Started producer '{}' (pid {})", program_name, child.id());

        Ok(Self {
            program: program_name,
            child: Some(child),
            connection: Connection::with_block_limit(
                BufReader::new(stdout),
                BufWriter::new(stdin),
                config.max_block_bytes,
            ),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// OS process id, while the child is still owned
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Wait briefly for the child to exit. It is never killed.
    fn reap(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        let deadline = Instant::now() + REAP_GRACE;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::info!("Producer '{}' exited with {}", self.program, status);
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(REAP_POLL),
                Ok(None) => {
                    tracing::warn!(
                        "Producer '{}' (pid {}) still running after its streams closed; detaching",
                        self.program,
                        child.id()
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!("Failed to query producer '{}': {}", self.program, e);
                    return;
                }
            }
        }
    }
}

impl Producer for CoProcess {
    fn request_catalog_with(
        &mut self,
        on_name: &mut dyn FnMut(usize, usize) -> Result<()>,
    ) -> Result<Vec<String>> {
        self.connection.request_catalog_with(on_name)
    }

    fn request_timestep_payload(&mut self, index: usize) -> Result<RawPayload> {
        self.connection.request_timestep_payload(index)
    }

    fn stop(&mut self) {
        self.connection.stop();
        self.reap();
    }

    fn is_open(&self) -> bool {
        self.connection.is_open()
    }
}

impl Drop for CoProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Launches [`CoProcess`] producers from a [`ProducerConfig`]
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    config: ProducerConfig,
}

impl ProcessLauncher {
    pub fn new(config: ProducerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self) -> Result<Box<dyn Producer>> {
        Ok(Box::new(CoProcess::start(&self.config)?))
    }
}
