//! Notification sink abstraction.

use async_trait::async_trait;

/// Delivers one pre-formatted text message.
///
/// Implementations log their own failures and never retry; the caller
/// decides what a `false` means.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> bool;

    /// Short label for logs.
    fn name(&self) -> &'static str {
        "notifier"
    }
}
