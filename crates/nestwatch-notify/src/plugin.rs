use crate::error::{NotifyError, Result};
use crate::NotificationChannel;
use serde_json::Value;
use std::collections::HashMap;

/// Factory for one channel type. Plugins validate raw JSON config and
/// construct ready-to-send channel instances from it.
pub trait ChannelPlugin: Send + Sync {
    /// Channel type name, for example "push" or "sms".
    fn name(&self) -> &str;

    /// What kind of recipient identifier this channel addresses
    /// (phone, chat_id, device_token, webhook_url).
    fn recipient_type(&self) -> &str;

    /// Check that the config has the required shape without building
    /// a channel.
    fn validate_config(&self, config: &Value) -> Result<()>;

    /// Build a channel instance from validated config.
    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>>;

    /// Return a copy of the config safe for logging. Plugins holding
    /// secrets override this to mask them.
    fn redact_config(&self, config: &Value) -> Value {
        config.clone()
    }
}

/// Registry of available channel plugins, keyed by type name.
pub struct ChannelRegistry {
    plugins: HashMap<String, Box<dyn ChannelPlugin>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in channel types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::channels::push::PushPlugin));
        registry.register(Box::new(crate::channels::sms::SmsPlugin));
        registry.register(Box::new(crate::channels::telegram::TelegramPlugin));
        registry.register(Box::new(crate::channels::webhook::WebhookPlugin));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ChannelPlugin> {
        self.plugins.get(name).map(|p| p.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn validate_config(&self, channel_type: &str, config: &Value) -> Result<()> {
        let plugin = self
            .plugins
            .get(channel_type)
            .ok_or_else(|| NotifyError::UnknownChannelType(channel_type.to_string()))?;
        plugin.validate_config(config)
    }

    pub fn create_channel(
        &self,
        channel_type: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let plugin = self
            .plugins
            .get(channel_type)
            .ok_or_else(|| NotifyError::UnknownChannelType(channel_type.to_string()))?;
        plugin.validate_config(config)?;
        plugin.create_channel(config)
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
