use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use async_trait::async_trait;
use nestwatch_common::types::{AlertNotice, ChannelKind};
use serde::Deserialize;
use serde_json::Value;

/// Mobile push delivered through a push gateway. The payload carries
/// the sound profile and volume so the companion app can ramp alarm
/// intensity with the escalation level.
pub struct PushChannel {
    client: reqwest::Client,
    gateway_url: String,
    api_key: String,
    device_tokens: Vec<String>,
}

impl PushChannel {
    pub fn new(gateway_url: &str, api_key: &str, device_tokens: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url: gateway_url.to_string(),
            api_key: api_key.to_string(),
            device_tokens,
        }
    }
}

#[async_trait]
impl NotificationChannel for PushChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    fn is_available(&self) -> bool {
        !self.gateway_url.is_empty() && !self.device_tokens.is_empty()
    }

    async fn send(&self, notice: &AlertNotice) -> Result<()> {
        let mut failed: Option<NotifyError> = None;

        for token in &self.device_tokens {
            let payload = serde_json::json!({
                "to": token,
                "title": format!("[{}] nestwatch alert", notice.severity),
                "body": notice.message,
                "data": {
                    "alert_id": notice.alert_id,
                    "stream_id": notice.stream_id,
                    "level": notice.level,
                    "sound_profile": notice.sound_profile,
                    "volume_percent": notice.volume_percent,
                },
            });

            let mut last_err = None;
            for attempt in 0..3u32 {
                match self
                    .client
                    .post(&self.gateway_url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .json(&payload)
                    .send()
                    .await
                {
                    Ok(resp) if resp.status().is_success() => {
                        last_err = None;
                        break;
                    }
                    Ok(resp) => {
                        let status = resp.status();
                        tracing::warn!(
                            attempt = attempt + 1,
                            status = %status,
                            "Push gateway returned error, retrying"
                        );
                        last_err = Some(NotifyError::ApiError {
                            service: "push".to_string(),
                            status: status.as_u16(),
                            body: resp.text().await.unwrap_or_default(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            attempt = attempt + 1,
                            error = %e,
                            "Push send failed, retrying"
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
                tracing::error!(error = %e, "Push failed after 3 retries");
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
struct PushConfig {
    gateway_url: String,
    api_key: String,
    device_tokens: Vec<String>,
}

pub struct PushPlugin;

impl ChannelPlugin for PushPlugin {
    fn name(&self) -> &str {
        "push"
    }

    fn recipient_type(&self) -> &str {
        "device_token"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        serde_json::from_value::<PushConfig>(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("push: {e}")))?;
        Ok(())
    }

    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>> {
        let cfg: PushConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("push: {e}")))?;
        Ok(Box::new(PushChannel::new(
            &cfg.gateway_url,
            &cfg.api_key,
            cfg.device_tokens,
        )))
    }
}
