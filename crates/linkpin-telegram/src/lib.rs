use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Blocking client for the handful of Bot API methods the bot uses.
#[derive(Debug, Clone)]
pub struct TelegramGateway {
    client: Client,
    base: String,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub message_thread_id: Option<i64>,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

impl User {
    /// Handle if set, otherwise the first name.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.first_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Optional `sendMessage` parameters.
#[derive(Debug, Clone, Default)]
pub struct SendOptions<'a> {
    pub thread_id: Option<i64>,
    pub markdown: bool,
    /// `(label, callback_data)` buttons rendered as one inline keyboard row.
    pub buttons: &'a [(&'a str, &'a str)],
}

impl TelegramGateway {
    pub fn new(token: &str, timeout_ms: u64) -> Result<Self> {
        Self::with_api_base(TELEGRAM_API_BASE, token, timeout_ms)
    }

    pub fn with_api_base(api_base: &str, token: &str, timeout_ms: u64) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            bail!("telegram token is empty");
        }
        let api_base = api_base.trim().trim_end_matches('/');
        if api_base.is_empty() {
            bail!("telegram api base is empty");
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .with_context(|| "failed to build telegram HTTP client")?;

        Ok(Self {
            client,
            base: format!("{api_base}/bot{token}"),
            timeout_ms,
        })
    }

    pub fn get_me(&self) -> Result<BotIdentity> {
        self.call("getMe", json!({}), None)
    }

    /// Long-polls for updates. The HTTP timeout is stretched by the poll window so an
    /// idle poll does not look like a network failure.
    pub fn get_updates(&self, offset: Option<i64>, poll_timeout_secs: u64) -> Result<Vec<Update>> {
        let mut body = json!({
            "timeout": poll_timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        let timeout = Duration::from_millis(self.timeout_ms) + Duration::from_secs(poll_timeout_secs);
        self.call("getUpdates", body, Some(timeout))
    }

    pub fn send_message(&self, chat_id: i64, text: &str, options: &SendOptions<'_>) -> Result<Message> {
        if text.trim().is_empty() {
            bail!("message text is required");
        }
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(thread_id) = options.thread_id {
            body["message_thread_id"] = json!(thread_id);
        }
        if options.markdown {
            body["parse_mode"] = json!("Markdown");
        }
        if !options.buttons.is_empty() {
            let row: Vec<Value> = options
                .buttons
                .iter()
                .map(|(label, data)| json!({ "text": label, "callback_data": data }))
                .collect();
            body["reply_markup"] = json!({ "inline_keyboard": [row] });
        }
        self.call("sendMessage", body, None)
    }

    pub fn pin_chat_message(&self, chat_id: i64, message_id: i64, silent: bool) -> Result<()> {
        self.call_unit(
            "pinChatMessage",
            json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "disable_notification": silent,
            }),
        )
    }

    pub fn unpin_chat_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.call_unit(
            "unpinChatMessage",
            json!({ "chat_id": chat_id, "message_id": message_id }),
        )
    }

    pub fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.call_unit(
            "deleteMessage",
            json!({ "chat_id": chat_id, "message_id": message_id }),
        )
    }

    pub fn answer_callback_query(&self, callback_id: &str, text: &str, show_alert: bool) -> Result<()> {
        self.call_unit(
            "answerCallbackQuery",
            json!({
                "callback_query_id": callback_id,
                "text": text,
                "show_alert": show_alert,
            }),
        )
    }

    fn call_unit(&self, method: &str, body: Value) -> Result<()> {
        self.call::<Value>(method, body, None).map(|_| ())
    }

    fn call<T: DeserializeOwned>(&self, method: &str, body: Value, timeout: Option<Duration>) -> Result<T> {
        debug!(method, "telegram call");
        let mut request = self.client.post(format!("{}/{method}", self.base)).json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .with_context(|| format!("failed to call telegram {method}"))?;
        let status = response.status();
        let envelope = response
            .json::<Envelope<T>>()
            .with_context(|| format!("failed to parse telegram {method} response ({status})"))?;
        if !envelope.ok {
            bail!(
                "telegram {method} failed: {} {}",
                status.as_u16(),
                envelope.description.unwrap_or_default()
            );
        }
        envelope
            .result
            .with_context(|| format!("telegram {method} returned ok without result"))
    }
}
