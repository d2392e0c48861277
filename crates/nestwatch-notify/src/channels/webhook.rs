use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use async_trait::async_trait;
use nestwatch_common::types::{AlertNotice, ChannelKind};
use serde::Deserialize;
use serde_json::Value;

pub struct WebhookChannel {
    client: reqwest::Client,
    urls: Vec<String>,
    body_template: Option<String>,
}

impl WebhookChannel {
    pub fn new(urls: Vec<String>, body_template: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            urls,
            body_template,
        }
    }

    fn render_body(&self, notice: &AlertNotice) -> String {
        if let Some(template) = &self.body_template {
            template
                .replace("{{alert_id}}", &notice.alert_id)
                .replace("{{stream_id}}", &notice.stream_id)
                .replace("{{severity}}", &notice.severity.to_string())
                .replace("{{message}}", &notice.message)
                .replace("{{level}}", &notice.level.to_string())
                .replace("{{sound_profile}}", &notice.sound_profile)
                .replace("{{volume_percent}}", &notice.volume_percent.to_string())
                .replace("{{timestamp}}", &notice.created_at.to_rfc3339())
        } else {
            serde_json::json!({
                "alert_id": notice.alert_id,
                "stream_id": notice.stream_id,
                "severity": notice.severity.to_string(),
                "message": notice.message,
                "level": notice.level,
                "sound_profile": notice.sound_profile,
                "volume_percent": notice.volume_percent,
                "timestamp": notice.created_at.to_rfc3339(),
            })
            .to_string()
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    fn is_available(&self) -> bool {
        !self.urls.is_empty()
    }

    async fn send(&self, notice: &AlertNotice) -> Result<()> {
        let body = self.render_body(notice);
        let mut failed: Option<NotifyError> = None;

        for url in &self.urls {
            let mut last_err = None;
            for attempt in 0..3u32 {
                match self
                    .client
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .body(body.clone())
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
                            "Webhook returned non-success status, retrying"
                        );
                        last_err = Some(NotifyError::ApiError {
                            service: "webhook".to_string(),
                            status: status.as_u16(),
                            body: resp.text().await.unwrap_or_default(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            attempt = attempt + 1,
                            error = %e,
                            "Webhook send failed, retrying"
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
                tracing::error!(url = %url, error = %e, "Webhook failed after 3 retries");
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
struct WebhookConfig {
    urls: Vec<String>,
    body_template: Option<String>,
}

pub struct WebhookPlugin;

impl ChannelPlugin for WebhookPlugin {
    fn name(&self) -> &str {
        "webhook"
    }

    fn recipient_type(&self) -> &str {
        "webhook_url"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        serde_json::from_value::<WebhookConfig>(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("webhook: {e}")))?;
        Ok(())
    }

    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>> {
        let cfg: WebhookConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("webhook: {e}")))?;
        Ok(Box::new(WebhookChannel::new(cfg.urls, cfg.body_template)))
    }
}
