pub mod compose;
pub mod dispatch;

use std::future::Future;

use crate::error::DispatchError;
use compose::Notification;

/// How a notification was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Transport not configured; the payload was only logged.
    Degraded,
}

/// Sink for change notifications.
pub trait Notifier {
    fn notify(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<Delivery, DispatchError>> + Send;
}
