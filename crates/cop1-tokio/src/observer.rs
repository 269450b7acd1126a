use cop1_core::{AlertCode, FopDirective, FopNotification, FopResponse, FopStatus, TransferFrame};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Receives the notifications of an engine.
///
/// Methods are called on the engine task in the order the FOP emitted the notifications, so
/// they must not block. Every method has an empty default; implement the ones you need, or
/// override [`FopObserver::notify`] to get the raw records.
pub trait FopObserver: Send + Sync {
    /// Accept, reject, positive or negative confirm for a frame.
    fn transfer_notification(&self, _response: FopResponse, _frame: &TransferFrame) {}

    /// Accept, reject, positive or negative confirm for a directive.
    fn directive_notification(
        &self,
        _response: FopResponse,
        _tag: u64,
        _directive: &FopDirective,
    ) {
    }

    /// The AD service was aborted with `code`.
    fn alert(&self, _code: AlertCode) {}

    /// The AD service was suspended.
    fn suspend(&self) {}

    /// Snapshot taken after every event the FOP did not ignore.
    fn status_report(&self, _status: &FopStatus) {}

    /// Entry point for every notification; dispatches to the methods above.
    fn notify(&self, notification: &FopNotification) {
        match notification {
            FopNotification::Transfer { response, frame } => {
                self.transfer_notification(*response, frame);
            }
            FopNotification::Directive {
                response,
                tag,
                directive,
            } => self.directive_notification(*response, *tag, directive),
            FopNotification::Alert(code) => self.alert(*code),
            FopNotification::Suspend => self.suspend(),
            FopNotification::Status(status) => self.status_report(status),
        }
    }
}

/// Forwards the raw notification stream into a channel.
impl FopObserver for UnboundedSender<FopNotification> {
    fn notify(&self, notification: &FopNotification) {
        if self.send(notification.clone()).is_err() {
            debug!("observer channel closed, dropping {notification:?}");
        }
    }
}
