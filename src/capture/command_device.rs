//! Microphone access through an external recorder process (ffmpeg by
//! default) that writes an encoded stream to stdout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::audio::{CaptureDevice, CaptureError, CaptureStream};
use crate::core::config::data::AudioConfig;

const READ_BUFFER: usize = 16 * 1024;
const STOP_GRACE: Duration = Duration::from_secs(3);

pub struct CommandCaptureDevice {
    program: String,
    args: Vec<String>,
    stop_input: Option<String>,
}

impl CommandCaptureDevice {
    pub fn new(command: &[String], stop_input: Option<String>) -> Self {
        let (program, args) = match command.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => (String::new(), Vec::new()),
        };
        Self {
            program,
            args,
            stop_input,
        }
    }

    pub fn from_config(config: &AudioConfig) -> Self {
        Self::new(&config.command(), config.stop_input())
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Resolves `program` the way a shell would: as a path when it contains a
/// separator, otherwise by searching `PATH`.
pub fn find_program(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        let exe = dir.join(format!("{program}.exe"));
        exe.is_file().then_some(exe)
    })
}

#[async_trait]
impl CaptureDevice for CommandCaptureDevice {
    async fn probe(&self) -> Result<(), CaptureError> {
        if self.program.is_empty() {
            return Err(CaptureError::PermissionDenied(
                "no recorder command configured".to_string(),
            ));
        }
        match find_program(&self.program) {
            Some(path) => {
                debug!(recorder = %path.display(), "recorder found");
                Ok(())
            }
            None => Err(CaptureError::PermissionDenied(format!(
                "recorder `{}` was not found on PATH",
                self.program
            ))),
        }
    }

    async fn open(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        self.probe().await?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take();
        let mut stdout = child.stdout.take().ok_or_else(|| {
            CaptureError::Io(std::io::Error::other("recorder stdout was not captured"))
        })?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            let mut buffer = vec![0_u8; READ_BUFFER];
            loop {
                match stdout.read(&mut buffer).await {
                    Ok(0) => break,
                    Ok(read) => {
                        if sender.send(buffer[..read].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "failed reading recorder output");
                        break;
                    }
                }
            }
        });

        debug!(recorder = %self.program, "recorder started");
        Ok(Box::new(CommandCaptureStream {
            child: Some(child),
            stdin,
            chunks: receiver,
            reader: Some(reader),
            stop_input: self.stop_input.clone(),
        }))
    }
}

struct CommandCaptureStream {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    chunks: mpsc::UnboundedReceiver<Vec<u8>>,
    reader: Option<JoinHandle<()>>,
    stop_input: Option<String>,
}

#[async_trait]
impl CaptureStream for CommandCaptureStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        Ok(self.chunks.recv().await)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(mut stdin) = self.stdin.take() {
            if let Some(input) = &self.stop_input {
                if let Err(err) = stdin.write_all(input.as_bytes()).await {
                    debug!(error = %err, "recorder stdin closed before stop input");
                }
                let _ = stdin.flush().await;
            }
        }

        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(%status, "recorder exited");
                Ok(())
            }
            Ok(Err(err)) => Err(err.into()),
            Err(_) => {
                warn!("recorder ignored stop request; killing it");
                child.start_kill()?;
                Ok(())
            }
        }
    }

    fn release(&mut self) {
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            // Already-exited children report an error here; nothing to do.
            let _ = child.start_kill();
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
