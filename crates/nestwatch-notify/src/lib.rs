//! Notification delivery framework with pluggable channel support.
//!
//! Alert notices are fanned out to the channels listed for the current
//! escalation level, best-effort: one channel failing never prevents
//! the others from being attempted. Built-in channels cover push, SMS,
//! Telegram, and generic webhooks. The [`dispatcher::NotificationDispatcher`]
//! applies quiet-hours suppression and keeps per-channel counters.

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod plugin;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use error::Result;
use nestwatch_common::types::{AlertNotice, ChannelKind};

pub use dispatcher::{
    ChannelResult, ChannelStatus, DispatchReport, NotificationDispatcher, QuietHours,
};
pub use error::NotifyError;

/// A notification delivery channel that sends alert notices to an
/// external service (push gateway, SMS gateway, chat bot, webhook).
///
/// Implementations are created by the corresponding [`plugin::ChannelPlugin`]
/// and registered with the dispatcher.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// The channel kind escalation levels route by.
    fn kind(&self) -> ChannelKind;

    /// Whether the channel has the configuration it needs to attempt a
    /// send (registered recipients, a bot token). Unavailable channels
    /// are skipped by the dispatcher, not counted as failures.
    fn is_available(&self) -> bool;

    /// Delivers the alert notice through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after retries.
    async fn send(&self, notice: &AlertNotice) -> Result<()>;
}
