//! Turns one user input into a user/assistant message pair.
//!
//! The controller owns the session state: the message store and the
//! responding flag. Each accepted submission appends the user message
//! immediately, calls the backend once, and appends exactly one assistant
//! message when the call settles, whatever the outcome.

use std::error::Error as StdError;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::api::{AnalysisBackend, AnalyzeRequest};
use crate::capture::{AudioClip, ValidatedFile};
use crate::core::constants::{
    audio_fallback, file_caption, AUDIO_CAPTION, AUDIO_ERROR, FILE_ERROR, FILE_FALLBACK,
    TEXT_ERROR, TEXT_FALLBACK,
};
use crate::core::message::{Message, MessageKind};
use crate::core::store::MessageStore;

/// Notifications for the render surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAppended(Message),
    RespondingChanged(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A dispatch is already waiting on the backend.
    Busy,
    EmptyMessage,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Busy => write!(f, "still waiting for the previous response"),
            DispatchError::EmptyMessage => write!(f, "message is empty"),
        }
    }
}

impl StdError for DispatchError {}

/// User-facing copy for one input kind.
struct ReplyCopy {
    fallback: String,
    error: &'static str,
}

pub struct DispatchController<B> {
    backend: B,
    store: Mutex<MessageStore>,
    responding: watch::Sender<bool>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

/// Clears the responding flag when dropped, so every exit path (including
/// a cancelled future) leaves the session usable.
struct RespondingGuard<'a> {
    responding: &'a watch::Sender<bool>,
    events: Option<&'a mpsc::UnboundedSender<SessionEvent>>,
}

impl Drop for RespondingGuard<'_> {
    fn drop(&mut self) {
        self.responding.send_replace(false);
        if let Some(events) = self.events {
            let _ = events.send(SessionEvent::RespondingChanged(false));
        }
    }
}

impl<B: AnalysisBackend> DispatchController<B> {
    pub fn new(backend: B) -> Self {
        let (responding, _) = watch::channel(false);
        Self {
            backend,
            store: Mutex::new(MessageStore::seeded()),
            responding,
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn messages(&self) -> Vec<Message> {
        self.store().messages().to_vec()
    }

    pub fn is_responding(&self) -> bool {
        *self.responding.borrow()
    }

    pub fn subscribe_responding(&self) -> watch::Receiver<bool> {
        self.responding.subscribe()
    }

    pub async fn submit_text(&self, text: &str) -> Result<Message, DispatchError> {
        if text.trim().is_empty() {
            return Err(DispatchError::EmptyMessage);
        }
        let copy = ReplyCopy {
            fallback: TEXT_FALLBACK.to_string(),
            error: TEXT_ERROR,
        };
        self.dispatch(
            MessageKind::Text,
            text.to_string(),
            AnalyzeRequest::Text {
                message: text.to_string(),
            },
            copy,
        )
        .await
    }

    pub async fn submit_file(&self, file: ValidatedFile) -> Result<Message, DispatchError> {
        let kind = MessageKind::File {
            file_name: file.file_name().to_string(),
            file_size_bytes: file.size_bytes(),
        };
        let caption = file_caption(file.file_name());
        let (file_name, mime, bytes) = file.into_parts();
        let copy = ReplyCopy {
            fallback: FILE_FALLBACK.to_string(),
            error: FILE_ERROR,
        };
        self.dispatch(
            kind,
            caption,
            AnalyzeRequest::File {
                file_name,
                mime: mime.to_string(),
                bytes,
            },
            copy,
        )
        .await
    }

    pub async fn submit_audio(&self, clip: AudioClip) -> Result<Message, DispatchError> {
        let AudioClip {
            data,
            duration_seconds,
        } = clip;
        let copy = ReplyCopy {
            fallback: audio_fallback(duration_seconds),
            error: AUDIO_ERROR,
        };
        self.dispatch(
            MessageKind::Audio { duration_seconds },
            AUDIO_CAPTION.to_string(),
            AnalyzeRequest::Audio {
                data,
                duration_seconds,
            },
            copy,
        )
        .await
    }

    async fn dispatch(
        &self,
        kind: MessageKind,
        caption: String,
        request: AnalyzeRequest,
        copy: ReplyCopy,
    ) -> Result<Message, DispatchError> {
        let _guard = self.begin()?;
        let request_kind = request.kind();

        let user = self.store().push_user(kind, caption);
        self.emit(SessionEvent::MessageAppended(user));
        // Announced after the user's own line so it renders below it.
        self.emit(SessionEvent::RespondingChanged(true));

        let reply = match self.backend.analyze(request).await {
            Ok(response) => match response.reply_text() {
                Some(text) => text.to_string(),
                None => {
                    debug!(kind = request_kind, "analysis response had no text; using fallback");
                    copy.fallback
                }
            },
            Err(err) => {
                warn!(
                    kind = request_kind,
                    error = %err,
                    body = err.response_body().unwrap_or(""),
                    "analysis request failed"
                );
                copy.error.to_string()
            }
        };

        let assistant = self.store().push_assistant(reply);
        self.emit(SessionEvent::MessageAppended(assistant.clone()));
        Ok(assistant)
    }

    fn begin(&self) -> Result<RespondingGuard<'_>, DispatchError> {
        let acquired = self.responding.send_if_modified(|responding| {
            if *responding {
                false
            } else {
                *responding = true;
                true
            }
        });
        if !acquired {
            return Err(DispatchError::Busy);
        }
        Ok(RespondingGuard {
            responding: &self.responding,
            events: self.events.as_ref(),
        })
    }

    fn store(&self) -> MutexGuard<'_, MessageStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // The render surface may already be gone during shutdown.
            let _ = events.send(event);
        }
    }
}
