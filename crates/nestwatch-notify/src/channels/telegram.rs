use crate::channels::format_message;
use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use async_trait::async_trait;
use nestwatch_common::types::{AlertNotice, ChannelKind};
use serde::Deserialize;
use serde_json::Value;

pub struct TelegramChannel {
    client: reqwest::Client,
    bot_token: String,
    chat_ids: Vec<String>,
}

impl TelegramChannel {
    pub fn new(bot_token: &str, chat_ids: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: bot_token.to_string(),
            chat_ids,
        }
    }

    fn send_url(&self) -> String {
        format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token)
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    fn is_available(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_ids.is_empty()
    }

    async fn send(&self, notice: &AlertNotice) -> Result<()> {
        let text = format_message(notice);
        let url = self.send_url();
        let mut failed: Option<NotifyError> = None;

        for chat_id in &self.chat_ids {
            let payload = serde_json::json!({
                "chat_id": chat_id,
                "text": text,
            });

            let mut last_err = None;
            for attempt in 0..3u32 {
                match self.client.post(&url).json(&payload).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        last_err = None;
                        break;
                    }
                    Ok(resp) => {
                        let status = resp.status();
                        tracing::warn!(
                            attempt = attempt + 1,
                            chat_id = %chat_id,
                            status = %status,
                            "Telegram API returned error, retrying"
                        );
                        last_err = Some(NotifyError::ApiError {
                            service: "telegram".to_string(),
                            status: status.as_u16(),
                            body: resp.text().await.unwrap_or_default(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            attempt = attempt + 1,
                            chat_id = %chat_id,
                            error = %e,
                            "Telegram send failed, retrying"
                        );
                        last_err = Some(e.into());
                    }
                }
                if attempt < 2 {
                    tokio::time::sleep(std::time::Duration::from_millis(100 * 2u64.pow(attempt)))
                        .await;
                }
            }

            if let Some(e) = last_err {
                tracing::error!(chat_id = %chat_id, error = %e, "Telegram failed after 3 retries");
                failed = Some(e);
            }
        }

        match failed {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// Plugin

#[derive(Deserialize)]
struct TelegramConfig {
    bot_token: String,
    chat_ids: Vec<String>,
}

pub struct TelegramPlugin;

impl ChannelPlugin for TelegramPlugin {
    fn name(&self) -> &str {
        "telegram"
    }

    fn recipient_type(&self) -> &str {
        "chat_id"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        serde_json::from_value::<TelegramConfig>(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("telegram: {e}")))?;
        Ok(())
    }

    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>> {
        let cfg: TelegramConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("telegram: {e}")))?;
        Ok(Box::new(TelegramChannel::new(&cfg.bot_token, cfg.chat_ids)))
    }

    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = config.clone();
        if let Some(obj) = redacted.as_object_mut() {
            if obj.contains_key("bot_token") {
                obj.insert("bot_token".to_string(), Value::String("***".to_string()));
            }
        }
        redacted
    }
}
