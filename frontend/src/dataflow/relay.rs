use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

/// Sending half of a viewer event stream.
///
/// Cloning a relay yields another sender into the same stream, so a chart
/// widget callback and a UI control can both feed one panel task.
#[derive(Clone, Debug)]
pub struct Relay<T> {
    sender: UnboundedSender<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("relay receiver has been dropped")]
    ChannelClosed,
}

impl<T> Relay<T> {
    pub fn new() -> (Self, UnboundedReceiver<T>) {
        let (sender, receiver) = unbounded();
        (Relay { sender }, receiver)
    }

    /// Sends an event, discarding it if the receiving task is gone.
    ///
    /// A torn-down chart panel drops its receivers; controls that still hold
    /// relays must not fail because of that.
    pub fn send(&self, value: T) {
        let _ = self.sender.unbounded_send(value);
    }

    pub fn try_send(&self, value: T) -> Result<(), RelayError> {
        self.sender
            .unbounded_send(value)
            .map_err(|_| RelayError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<T> Default for Relay<T> {
    /// Disconnected relay: every event is silently discarded.
    fn default() -> Self {
        let (relay, _receiver) = Self::new();
        relay
    }
}

pub fn relay<T>() -> (Relay<T>, UnboundedReceiver<T>) {
    Relay::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn delivers_events_in_send_order() {
        let (bound_edited_relay, mut bound_edited_stream) = relay::<f64>();
        let other_sender = bound_edited_relay.clone();

        bound_edited_relay.send(10.0);
        other_sender.send(90.0);

        assert_eq!(bound_edited_stream.next().await, Some(10.0));
        assert_eq!(bound_edited_stream.next().await, Some(90.0));
    }

    #[test]
    fn send_after_receiver_dropped_is_silent() {
        let (pause_pressed_relay, stream) = relay::<()>();
        drop(stream);

        pause_pressed_relay.send(());
        assert!(pause_pressed_relay.is_closed());
        assert_eq!(
            pause_pressed_relay.try_send(()),
            Err(RelayError::ChannelClosed)
        );
    }

    #[test]
    fn default_relay_is_disconnected() {
        let relay = Relay::<u32>::default();
        assert!(relay.is_closed());
    }
}
