//! Interactive chat session on stdin/stdout.
//!
//! Lines are read one at a time and parsed by [`crate::commands`]. A
//! submission is awaited before the next line is read, so input typed while
//! Sage is analyzing waits its turn. Messages reach the screen through the
//! controller's event channel, printed by a separate render task that also
//! feeds the transcript log.

use std::error::Error;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::{AnalysisBackend, HttpBackend};
use crate::capture::file;
use crate::capture::{AudioAdapter, CaptureDevice, CommandCaptureDevice, RecorderState};
use crate::commands::{help_text, process_input, CommandResult};
use crate::core::config::data::Config;
use crate::core::dispatch::{DispatchController, DispatchError, SessionEvent};
use crate::core::message::Message;
use crate::ui::transcript::{format_duration, render_entry, RESPONDING_INDICATOR};
use crate::utils::logging::LoggingState;

const RECORDING_PROGRESS_EVERY_SECS: u64 = 10;

pub struct ChatOptions {
    /// Overrides the configured backend URL.
    pub backend_url: Option<String>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

type SharedLogging = Arc<Mutex<LoggingState>>;

fn log_entry(logging: &SharedLogging, message: &Message) {
    let logging = logging.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(err) = logging.log_message(message) {
        warn!(error = %err, "failed to write transcript log");
    }
}

fn show(message: &Message, logging: &SharedLogging) {
    println!("{}\n", render_entry(message));
    log_entry(logging, message);
}

fn notice(text: impl AsRef<str>) {
    println!("* {}", text.as_ref());
}

fn spawn_renderer(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    logging: SharedLogging,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::MessageAppended(message) => show(&message, &logging),
                SessionEvent::RespondingChanged(true) => println!("{RESPONDING_INDICATOR}"),
                SessionEvent::RespondingChanged(false) => {}
            }
        }
    })
}

/// State of one interactive session. Generic over the backend and the
/// capture device so the command handling can run against fakes.
pub struct ChatSession<B, D> {
    controller: DispatchController<B>,
    recorder: AudioAdapter<D>,
    logging: SharedLogging,
    last_progress: u64,
}

impl<B: AnalysisBackend, D: CaptureDevice> ChatSession<B, D> {
    pub fn new(
        controller: DispatchController<B>,
        recorder: AudioAdapter<D>,
        logging: SharedLogging,
    ) -> Self {
        Self {
            controller,
            recorder,
            logging,
            last_progress: 0,
        }
    }

    pub fn controller(&self) -> &DispatchController<B> {
        &self.controller
    }

    pub fn recorder(&self) -> &AudioAdapter<D> {
        &self.recorder
    }

    pub async fn handle_line(&mut self, line: &str) -> Flow {
        match process_input(line) {
            CommandResult::Continue => Flow::Continue,
            CommandResult::ProcessAsMessage(text) => {
                settle(self.controller.submit_text(&text)).await
            }
            CommandResult::AttachFile(path) => self.attach_file(path).await,
            CommandResult::StartRecording => {
                self.start_recording().await;
                Flow::Continue
            }
            CommandResult::StopRecording => self.stop_recording().await,
            CommandResult::ShowHelp => {
                print!("{}", help_text());
                Flow::Continue
            }
            CommandResult::ShowStatus => {
                print!("{}", self.status_text());
                Flow::Continue
            }
            CommandResult::ToggleLog => {
                let result = self.logging().toggle_logging();
                report_log_change(result);
                Flow::Continue
            }
            CommandResult::SetLogFile(path) => {
                let result = self.logging().set_log_file(path);
                report_log_change(result);
                Flow::Continue
            }
            CommandResult::Usage(usage) => {
                notice(usage);
                Flow::Continue
            }
            CommandResult::UnknownCommand { name, suggestions } => {
                let options: Vec<String> = suggestions.iter().map(|s| format!("/{s}")).collect();
                notice(format!(
                    "Unknown command /{name}; did you mean {}?",
                    options.join(", ")
                ));
                Flow::Continue
            }
            CommandResult::Quit => Flow::Quit,
        }
    }

    async fn attach_file(&mut self, path: PathBuf) -> Flow {
        match file::load(&path).await {
            Ok(file) => settle(self.controller.submit_file(file)).await,
            Err(rejection) => {
                notice(format!("Cannot attach file: {rejection}"));
                Flow::Continue
            }
        }
    }

    async fn start_recording(&mut self) {
        if self.recorder.is_recording() {
            notice("Already recording. Type /stop to send.");
            return;
        }
        if self.recorder.state() == RecorderState::Unavailable
            && self.recorder.probe().await == RecorderState::Unavailable
        {
            notice("Microphone unavailable. Configure a recorder with `sagechat set recorder <command>`.");
            return;
        }
        match self.recorder.start().await {
            Ok(()) => {
                self.last_progress = 0;
                notice("Recording... type /stop to send the voice message.");
            }
            Err(err) => notice(format!("Could not start recording: {err}")),
        }
    }

    async fn stop_recording(&mut self) -> Flow {
        if !self.recorder.is_recording() {
            notice("Not recording. Type /record to start.");
            return Flow::Continue;
        }
        match self.recorder.stop().await {
            Ok(Some(clip)) => {
                debug!(bytes = clip.data.len(), "voice message captured");
                settle(self.controller.submit_audio(clip)).await
            }
            Ok(None) => Flow::Continue,
            Err(err) => {
                notice(format!("Recording failed: {err}"));
                Flow::Continue
            }
        }
    }

    /// Called once a second while recording; prints the counter every few
    /// seconds so the prompt stays usable.
    pub fn show_recording_progress(&mut self) {
        let elapsed = self.recorder.elapsed_display_seconds();
        if elapsed >= self.last_progress + RECORDING_PROGRESS_EVERY_SECS {
            self.last_progress = elapsed;
            notice(format!(
                "Recording {} (type /stop to send)",
                format_duration(elapsed as f64)
            ));
        }
    }

    fn status_text(&self) -> String {
        let recorder = match self.recorder.state() {
            RecorderState::Unavailable => "unavailable".to_string(),
            RecorderState::Idle => "ready".to_string(),
            RecorderState::Recording => format!(
                "recording ({})",
                format_duration(self.recorder.elapsed_display_seconds() as f64)
            ),
        };
        format!(
            "  messages: {}\n  responding: {}\n  microphone: {recorder}\n  logging: {}\n",
            self.controller.messages().len(),
            if self.controller.is_responding() { "yes" } else { "no" },
            self.logging().get_status_string(),
        )
    }

    fn logging(&self) -> std::sync::MutexGuard<'_, LoggingState> {
        self.logging.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn report_log_change(result: Result<String, Box<dyn Error>>) {
    match result {
        Ok(message) => notice(message),
        Err(err) => notice(format!("Log error: {err}")),
    }
}

/// Awaits one submission. Ctrl-C abandons it and ends the session.
async fn settle<F>(submission: F) -> Flow
where
    F: Future<Output = Result<Message, DispatchError>>,
{
    tokio::select! {
        result = submission => {
            if let Err(err) = result {
                notice(format!("Not sent: {err}"));
            }
            Flow::Continue
        }
        _ = tokio::signal::ctrl_c() => Flow::Quit,
    }
}

/// Next line from the prompt. Lines that are not valid UTF-8 are reported
/// and skipped; the reader resumes at the following line.
pub async fn next_prompt_line<R>(lines: &mut Lines<R>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match lines.next_line().await {
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                debug!(error = %err, "skipping undecodable input line");
                notice("Input was not valid UTF-8 and was ignored.");
            }
            other => return other,
        }
    }
}

pub async fn run_chat(config: Config, options: ChatOptions) -> Result<(), Box<dyn Error>> {
    let backend_url = options
        .backend_url
        .as_deref()
        .unwrap_or_else(|| config.backend_url());
    let backend = HttpBackend::new(backend_url, config.request_timeout())?;
    debug!(endpoint = backend.endpoint(), "chat session starting");

    let logging: SharedLogging = Arc::new(Mutex::new(LoggingState::new(options.log_file)?));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let controller = DispatchController::new(backend).with_events(events_tx);
    for message in controller.messages() {
        show(&message, &logging);
    }
    let renderer = spawn_renderer(events_rx, Arc::clone(&logging));

    let mut recorder = AudioAdapter::new(CommandCaptureDevice::from_config(&config.audio));
    recorder.probe().await;

    let mut session = ChatSession::new(controller, recorder, logging);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut input_error = None;

    loop {
        tokio::select! {
            line = next_prompt_line(&mut lines) => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        input_error = Some(err);
                        break;
                    }
                };
                if session.handle_line(&line).await == Flow::Quit {
                    break;
                }
            }
            _ = ticker.tick(), if session.recorder().is_recording() => {
                session.show_recording_progress();
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    // Dropping the session releases the microphone and closes the event
    // channel, which lets the renderer drain and finish.
    drop(session);
    renderer.await?;
    match input_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
