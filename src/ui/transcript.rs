//! Text projection of the conversation.

use crate::core::message::{Message, MessageKind};

pub const USER_LABEL: &str = "You";
pub const ASSISTANT_LABEL: &str = "Sage";
pub const RESPONDING_INDICATOR: &str = "Sage is analyzing…";

/// Human-readable byte count: `512 B`, `14.2 KB`, `3.4 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let value = bytes as f64;
    if value < KB {
        format!("{bytes} B")
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{:.1} MB", value / MB)
    }
}

/// `m:ss`, rounded to the nearest second.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn body(message: &Message) -> String {
    match message.kind() {
        MessageKind::Text => message.content().to_string(),
        MessageKind::File {
            file_name,
            file_size_bytes,
        } => format!(
            "[file] {file_name} ({})",
            format_file_size(*file_size_bytes)
        ),
        MessageKind::Audio { duration_seconds } => format!(
            "[voice] {} ({})",
            message.content(),
            format_duration(*duration_seconds)
        ),
    }
}

fn sender_label(message: &Message) -> &'static str {
    if message.is_user() {
        USER_LABEL
    } else {
        ASSISTANT_LABEL
    }
}

/// Entry as written to a transcript log: `Label: body`.
pub fn plain_entry(message: &Message) -> String {
    format!("{}: {}", sender_label(message), body(message))
}

/// Entry as shown in the terminal, with the local send time.
pub fn render_entry(message: &Message) -> String {
    format!(
        "[{}] {}",
        message.created_at().format("%H:%M"),
        plain_entry(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MessageStore;

    #[test]
    fn file_sizes_use_binary_units() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10.0 MB");
    }

    #[test]
    fn durations_round_to_seconds() {
        assert_eq!(format_duration(2.3), "0:02");
        assert_eq!(format_duration(7.0), "0:07");
        assert_eq!(format_duration(59.6), "1:00");
        assert_eq!(format_duration(125.0), "2:05");
    }

    #[test]
    fn entries_label_each_kind() {
        let mut store = MessageStore::seeded();
        let text = store.push_user(MessageKind::Text, "disk full?");
        let file = store.push_user(
            MessageKind::File {
                file_name: "app.log".to_string(),
                file_size_bytes: 2048,
            },
            "Uploaded file: app.log",
        );
        let audio = store.push_user(
            MessageKind::Audio {
                duration_seconds: 7.2,
            },
            "Voice message recorded",
        );
        let reply = store.push_assistant("Rotate the logs.\nThen restart.");

        assert_eq!(plain_entry(&text), "You: disk full?");
        assert_eq!(plain_entry(&file), "You: [file] app.log (2.0 KB)");
        assert_eq!(
            plain_entry(&audio),
            "You: [voice] Voice message recorded (0:07)"
        );
        assert_eq!(plain_entry(&reply), "Sage: Rotate the logs.\nThen restart.");
        assert!(render_entry(&reply).starts_with('['));
    }
}
