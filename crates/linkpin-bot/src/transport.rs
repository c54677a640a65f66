use linkpin_telegram::{SendOptions, TelegramGateway};

use crate::error::TransportError;

/// Where summaries and confirmations go: a chat plus, for forum chats, a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub chat_id: i64,
    pub thread_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Markdown,
}

/// The messaging operations the bot needs. Every call may block on a network round trip.
pub trait ChatTransport {
    /// Sends a message and returns its id.
    fn send(
        &self,
        dest: Destination,
        text: &str,
        format: TextFormat,
        buttons: &[(&str, &str)],
    ) -> Result<i64, TransportError>;
    /// Pins without notifying chat members.
    fn pin(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError>;
    fn unpin(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError>;
    fn delete(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError>;
    fn answer_callback(
        &self,
        callback_id: &str,
        text: &str,
        show_alert: bool,
    ) -> Result<(), TransportError>;
}

impl ChatTransport for TelegramGateway {
    fn send(
        &self,
        dest: Destination,
        text: &str,
        format: TextFormat,
        buttons: &[(&str, &str)],
    ) -> Result<i64, TransportError> {
        let options = SendOptions {
            thread_id: dest.thread_id,
            markdown: format == TextFormat::Markdown,
            buttons,
        };
        self.send_message(dest.chat_id, text, &options)
            .map(|message| message.message_id)
            .map_err(|err| TransportError::new("send", &err))
    }

    fn pin(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError> {
        self.pin_chat_message(chat_id, message_id, true)
            .map_err(|err| TransportError::new("pin", &err))
    }

    fn unpin(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError> {
        self.unpin_chat_message(chat_id, message_id)
            .map_err(|err| TransportError::new("unpin", &err))
    }

    fn delete(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError> {
        self.delete_message(chat_id, message_id)
            .map_err(|err| TransportError::new("delete", &err))
    }

    fn answer_callback(
        &self,
        callback_id: &str,
        text: &str,
        show_alert: bool,
    ) -> Result<(), TransportError> {
        self.answer_callback_query(callback_id, text, show_alert)
            .map_err(|err| TransportError::new("answer callback", &err))
    }
}
