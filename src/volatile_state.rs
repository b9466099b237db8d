use serenity::all::{ChannelId, ComponentInteraction, MessageId, UserId};
use std::collections::HashMap;
use tokio::sync::oneshot;

/// State which is lost across sessions
pub struct VolatileState {
    /// The panel message currently considered authoritative
    pub panel: Option<MessageId>,
    pub selections: PendingSelections,
    janitor_started: bool,
}

pub type PendingSelections = Pending<ComponentInteraction>;

/// Users who were shown an item prompt and whose next button press in that channel answers it.
pub struct Pending<T>(HashMap<(UserId, ChannelId), oneshot::Sender<T>>);

impl VolatileState {
    pub fn new() -> Self {
        Self {
            panel: None,
            selections: Pending::new(),
            janitor_started: false,
        }
    }

    pub fn janitor_started(&self) -> bool {
        self.janitor_started
    }

    pub fn mark_janitor_started(&mut self) {
        self.janitor_started = true;
    }
}

impl<T> Pending<T> {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Start waiting for `user`'s next press in `channel`.
    pub fn open(&mut self, user: UserId, channel: ChannelId) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        self.0.insert((user, channel), tx);
        rx
    }

    /// Claim the waiting prompt, if any, so the press can be delivered to it.
    pub fn take(&mut self, user: UserId, channel: ChannelId) -> Option<oneshot::Sender<T>> {
        self.0.remove(&(user, channel))
    }

    /// Forget the entry for `(user, channel)` once nobody is listening on it anymore.
    pub fn prune(&mut self, user: UserId, channel: ChannelId) {
        if self
            .0
            .get(&(user, channel))
            .is_some_and(|tx| tx.is_closed())
        {
            self.0.remove(&(user, channel));
        }
    }

    pub fn is_waiting(&self, user: UserId, channel: ChannelId) -> bool {
        self.0.contains_key(&(user, channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: UserId = UserId::new(1);
    const BOB: UserId = UserId::new(2);
    const PANEL_CHANNEL: ChannelId = ChannelId::new(10);
    const OTHER_CHANNEL: ChannelId = ChannelId::new(11);

    #[tokio::test]
    async fn press_is_delivered_to_matching_prompt_only() {
        let mut pending = Pending::<&str>::new();
        let rx = pending.open(ALICE, PANEL_CHANNEL);

        assert!(pending.take(BOB, PANEL_CHANNEL).is_none());
        assert!(pending.take(ALICE, OTHER_CHANNEL).is_none());

        let tx = pending.take(ALICE, PANEL_CHANNEL).unwrap();
        tx.send("add_pipa").unwrap();
        assert_eq!(rx.await.unwrap(), "add_pipa");
        assert!(!pending.is_waiting(ALICE, PANEL_CHANNEL));
    }

    #[tokio::test]
    async fn abandoned_prompt_stops_capturing_presses() {
        let mut pending = Pending::<u8>::new();
        let rx = pending.open(ALICE, PANEL_CHANNEL);

        let waited = tokio::time::timeout(std::time::Duration::from_millis(5), rx).await;
        assert!(waited.is_err());

        pending.prune(ALICE, PANEL_CHANNEL);
        assert!(!pending.is_waiting(ALICE, PANEL_CHANNEL));
    }

    #[test]
    fn prune_keeps_a_live_prompt() {
        let mut pending = Pending::<u8>::new();
        let _old = pending.open(ALICE, PANEL_CHANNEL);
        let _rx = pending.open(BOB, PANEL_CHANNEL);

        pending.prune(ALICE, PANEL_CHANNEL);
        pending.prune(BOB, PANEL_CHANNEL);
        assert!(pending.is_waiting(ALICE, PANEL_CHANNEL));
        assert!(pending.is_waiting(BOB, PANEL_CHANNEL));
    }

    #[test]
    fn late_press_after_timeout_is_returned() {
        let mut pending = Pending::<u8>::new();
        let rx = pending.open(ALICE, PANEL_CHANNEL);
        let tx = pending.take(ALICE, PANEL_CHANNEL).unwrap();
        drop(rx);

        assert_eq!(tx.send(7), Err(7));
    }
}
