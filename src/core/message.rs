use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-session message identifier. Allocated by the store in creation order,
/// so comparing two ids tells which message came first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    pub(crate) fn from_sequence(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Sender::User
    }

    pub fn is_assistant(self) -> bool {
        self == Sender::Assistant
    }
}

impl AsRef<str> for Sender {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Sender {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Sender::User),
            "assistant" | "ai" => Ok(Sender::Assistant),
            _ => Err(format!("invalid message sender: {value}")),
        }
    }
}

impl TryFrom<String> for Sender {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Sender> for String {
    fn from(value: Sender) -> Self {
        value.as_str().to_string()
    }
}

/// What a message carries besides its caption. Consumers match on this
/// exhaustively; adding a variant must be handled everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    File {
        file_name: String,
        file_size_bytes: u64,
    },
    Audio {
        duration_seconds: f64,
    },
}

impl MessageKind {
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::File { .. } => "file",
            MessageKind::Audio { .. } => "audio",
        }
    }
}

/// One entry of the visible conversation. Fields are private; a message is
/// never changed after the store hands it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    sender: Sender,
    kind: MessageKind,
    content: String,
    created_at: DateTime<Local>,
}

impl Message {
    pub(crate) fn new(
        id: MessageId,
        sender: Sender,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            sender,
            kind,
            content: content.into(),
            created_at: Local::now(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn is_user(&self) -> bool {
        self.sender.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.sender.is_assistant()
    }

    pub fn file_name(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::File { file_name, .. } => Some(file_name),
            MessageKind::Text | MessageKind::Audio { .. } => None,
        }
    }

    pub fn file_size_bytes(&self) -> Option<u64> {
        match &self.kind {
            MessageKind::File {
                file_size_bytes, ..
            } => Some(*file_size_bytes),
            MessageKind::Text | MessageKind::Audio { .. } => None,
        }
    }

    pub fn audio_duration_seconds(&self) -> Option<f64> {
        match &self.kind {
            MessageKind::Audio { duration_seconds } => Some(*duration_seconds),
            MessageKind::Text | MessageKind::File { .. } => None,
        }
    }
}
