use std::time::{Duration, Instant};

use linkpin_registry::{Registry, RegistryError, Requester, ResetOrigin, Summary, format_summary};
use linkpin_telegram::Update;
use tracing::{debug, error, info, warn};

use crate::deferred::DeferredDeletions;
use crate::pin::{PinSynchronizer, RepublishOutcome};
use crate::transport::{ChatTransport, Destination, TextFormat};

/// Callback data carried by the reset button under `/list`.
pub const RESET_CALLBACK: &str = "reset_data";

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Only this discussion thread is served; `None` serves every thread.
    pub topic_id: Option<i64>,
    pub confirmation_ttl: Duration,
    /// Used to drop commands addressed to a different bot (`/list@other_bot`).
    pub bot_username: Option<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            topic_id: None,
            confirmation_ttl: Duration::from_secs(5),
            bot_username: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message {
        chat_id: i64,
        thread_id: Option<i64>,
        message_id: i64,
        sender: Requester,
        text: String,
    },
    Callback {
        callback_id: String,
        chat_id: Option<i64>,
        thread_id: Option<i64>,
        sender: Requester,
        data: String,
    },
}

impl InboundEvent {
    /// Text messages and button presses from humans; everything else is dropped.
    pub fn from_update(update: Update) -> Option<Self> {
        if let Some(message) = update.message {
            let from = message.from?;
            if from.is_bot {
                return None;
            }
            return Some(Self::Message {
                chat_id: message.chat.id,
                thread_id: message.message_thread_id,
                message_id: message.message_id,
                sender: Requester::new(from.id, from.display_name()),
                text: message.text?,
            });
        }
        let query = update.callback_query?;
        Some(Self::Callback {
            sender: Requester::new(query.from.id, query.from.display_name()),
            chat_id: query.message.as_ref().map(|message| message.chat.id),
            thread_id: query
                .message
                .as_ref()
                .and_then(|message| message.message_thread_id),
            callback_id: query.id,
            data: query.data.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    List,
    Remove(String),
}

/// Parses `/link <url>`, `/add <url>`, `/list` and `/remove <n>`, with an optional
/// `@botname` suffix on the command word.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let text = text.trim();
    let (word, rest) = match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    };
    let word = word.strip_prefix('/')?;
    let name = match word.split_once('@') {
        Some((name, target)) => {
            if let Some(me) = bot_username
                && !target.eq_ignore_ascii_case(me)
            {
                return None;
            }
            name
        }
        None => word,
    };
    match name {
        "link" | "add" => Some(Command::Add(rest.to_string())),
        "list" if rest.is_empty() => Some(Command::List),
        "remove" => Some(Command::Remove(rest.to_string())),
        _ => None,
    }
}

/// Maps chat commands onto registry operations and keeps the pinned summary current.
pub struct CommandDispatcher<T: ChatTransport> {
    registry: Registry,
    pins: PinSynchronizer,
    deferred: DeferredDeletions,
    transport: T,
    config: DispatcherConfig,
}

impl<T: ChatTransport> CommandDispatcher<T> {
    pub fn new(registry: Registry, transport: T, config: DispatcherConfig) -> Self {
        let pins = PinSynchronizer::new(registry.store().clone());
        let deferred = DeferredDeletions::new(config.confirmation_ttl);
        Self {
            registry,
            pins,
            deferred,
            transport,
            config,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pending_deletions(&self) -> usize {
        self.deferred.len()
    }

    pub fn handle(&mut self, event: InboundEvent, now: Instant) {
        match event {
            InboundEvent::Message {
                chat_id,
                thread_id,
                message_id,
                sender,
                text,
            } => {
                let Some(command) = parse_command(&text, self.config.bot_username.as_deref())
                else {
                    return;
                };
                if !self.in_scope(thread_id) {
                    debug!(chat_id, ?thread_id, "command outside the link thread ignored");
                    return;
                }
                let dest = self.destination(chat_id, thread_id);
                match command {
                    Command::Add(content) => self.add(dest, message_id, &sender, &content, now),
                    Command::List => self.list(dest),
                    Command::Remove(arg) => self.remove(dest, &sender, &arg, now),
                }
            }
            InboundEvent::Callback {
                callback_id,
                chat_id,
                thread_id,
                sender,
                data,
            } => {
                if data != RESET_CALLBACK {
                    debug!(data = %data, "unknown callback acknowledged");
                    self.answer(&callback_id, "", false);
                    return;
                }
                let dest = chat_id.map(|chat_id| self.destination(chat_id, thread_id));
                self.reset_from_button(&callback_id, dest, &sender, now);
            }
        }
    }

    /// Reset requested by the daily trigger. No identity check.
    pub fn scheduled_reset(&mut self) -> usize {
        match self.registry.reset(ResetOrigin::Scheduled) {
            Ok(cleared) => {
                info!(cleared, "scheduled reset completed");
                cleared
            }
            Err(err) => {
                error!(error = %err, "scheduled reset rejected");
                0
            }
        }
    }

    pub fn run_deferred(&mut self, now: Instant) -> usize {
        self.deferred.run_due(now, &self.transport)
    }

    pub fn shutdown(&mut self) -> usize {
        self.deferred.shutdown(&self.transport)
    }

    fn add(
        &mut self,
        dest: Destination,
        message_id: i64,
        sender: &Requester,
        content: &str,
        now: Instant,
    ) {
        if content.is_empty() {
            self.send_temporary(dest, "ℹ️ Usage: /link <url>", now);
            return;
        }
        match self.registry.add(&sender.name, content) {
            Ok(_) => {
                self.republish(dest);
                if let Err(err) = self.transport.delete(dest.chat_id, message_id) {
                    warn!(error = %err, message_id, "could not delete command message");
                }
                self.send_temporary(dest, "✅ Link saved!", now);
            }
            Err(err) => {
                let text = rejection_text(&err);
                self.send_temporary(dest, &text, now);
            }
        }
    }

    fn list(&mut self, dest: Destination) {
        let sent = match format_summary(self.registry.entries()) {
            Summary::Empty => {
                self.transport
                    .send(dest, "📭 No links saved yet.", TextFormat::Plain, &[])
            }
            Summary::Text(text) => self.transport.send(
                dest,
                &text,
                TextFormat::Markdown,
                &[("🗑 Reset list", RESET_CALLBACK)],
            ),
        };
        if let Err(err) = sent {
            warn!(error = %err, "could not send link list");
        }
    }

    fn remove(&mut self, dest: Destination, sender: &Requester, arg: &str, now: Instant) {
        let Ok(position) = arg.parse::<usize>() else {
            self.send_temporary(dest, "⚠️ Invalid position!", now);
            return;
        };
        match self.registry.remove_at(position, sender) {
            Ok(removed) => {
                let text = format!("🗑 Removed link: {}", removed.content);
                self.send_temporary(dest, &text, now);
                self.republish(dest);
            }
            Err(err) => {
                let text = rejection_text(&err);
                self.send_temporary(dest, &text, now);
            }
        }
    }

    fn reset_from_button(
        &mut self,
        callback_id: &str,
        dest: Option<Destination>,
        sender: &Requester,
        now: Instant,
    ) {
        match self.registry.reset(ResetOrigin::Interactive(sender)) {
            Ok(_) => {
                self.answer(callback_id, "✅ The list has been reset", false);
                if let Some(dest) = dest {
                    self.send_temporary(dest, "🗑 The list was reset manually!", now);
                    self.republish(dest);
                }
            }
            Err(_) => self.answer(callback_id, "❌ You are not allowed to reset the list", true),
        }
    }

    fn answer(&self, callback_id: &str, text: &str, show_alert: bool) {
        if let Err(err) = self.transport.answer_callback(callback_id, text, show_alert) {
            warn!(error = %err, "could not answer callback");
        }
    }

    fn send_temporary(&mut self, dest: Destination, text: &str, now: Instant) {
        match self.transport.send(dest, text, TextFormat::Plain, &[]) {
            Ok(message_id) => self.deferred.schedule(now, dest.chat_id, message_id),
            Err(err) => warn!(error = %err, "could not send confirmation"),
        }
    }

    fn republish(&self, dest: Destination) {
        match self.pins.republish(&self.transport, &self.registry, dest) {
            Ok(RepublishOutcome::Skipped) => {}
            Ok(RepublishOutcome::Pinned {
                message_id,
                replaced,
            }) => info!(message_id, ?replaced, "pinned summary updated"),
            Err(err) => error!(error = %err, "failed to update pinned summary"),
        }
    }

    fn in_scope(&self, thread_id: Option<i64>) -> bool {
        self.config
            .topic_id
            .is_none_or(|topic| thread_id == Some(topic))
    }

    fn destination(&self, chat_id: i64, thread_id: Option<i64>) -> Destination {
        Destination {
            chat_id,
            thread_id: self.config.topic_id.or(thread_id),
        }
    }
}

fn rejection_text(err: &RegistryError) -> String {
    match err {
        RegistryError::Validation { reason } => format!("❌ {}", capitalize(reason)),
        RegistryError::Duplicate { .. } => "⚠️ This link is already in the list!".to_string(),
        RegistryError::Range { len: 0, .. } => "⚠️ The list is empty.".to_string(),
        RegistryError::Range { len, .. } => format!("⚠️ Invalid position! Pick 1 to {len}."),
        RegistryError::Authorization { action, .. } => {
            format!("❌ You are not allowed to {action}!")
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
