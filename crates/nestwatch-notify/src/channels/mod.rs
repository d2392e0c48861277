pub mod push;
pub mod sms;
pub mod telegram;
pub mod webhook;

use nestwatch_common::types::AlertNotice;

/// Short single-line rendering shared by the text-oriented channels.
pub(crate) fn format_message(notice: &AlertNotice) -> String {
    format!(
        "[nestwatch][{severity}] stream {stream}: {message} (escalation level {level})",
        severity = notice.severity,
        stream = notice.stream_id,
        message = notice.message,
        level = notice.level,
    )
}
