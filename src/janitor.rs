//! Background upkeep of the panel channel.
//!
//! Two loops run for the lifetime of the process:
//! - the existence check reposts the panel when someone deletes it
//! - the sweep deletes any other message the bot left behind
//!
//! Neither coordinates with interactions beyond reading the canonical panel id, so a freshly
//! reposted panel and its predecessor may coexist until the next sweep.

use crate::{
    config,
    helper::{purge_bot_messages, ErrorHelper},
    log_error, log_internal,
    logging::{AsyncPrintColor, PrintColor},
    panel::Presenter,
    volatile_state::VolatileState,
};
use anyhow::Result;
use serenity::all::{Cache, Http, MessageId, UserId};
use std::sync::Arc;
use tokio::{
    sync::RwLock,
    time::{interval, MissedTickBehavior},
};

#[derive(Clone)]
pub struct Janitor {
    pub cache: Arc<Cache>,
    pub http: Arc<Http>,
    pub vstate: Arc<RwLock<VolatileState>>,
    pub presenter: Presenter,
    pub settings: config::Janitor,
    pub bot_id: UserId,
}

impl Janitor {
    /// Spawn both loops.  They never stop.
    pub fn start(self) {
        tokio::spawn(self.clone().panel_check_loop());
        tokio::spawn(self.sweep_loop());
    }

    async fn panel_check_loop(self) {
        let mut ticks = interval(self.settings.panel_check_interval());
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticks.tick().await;
            if let Err(err) = self.check_panel().await {
                log_error!("Panel check failed: {}", err);
            }
        }
    }

    async fn sweep_loop(self) {
        let mut ticks = interval(self.settings.sweep_interval());
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticks.tick().await;
            if let Err(err) = self.sweep().await {
                log_error!("Duplicate sweep failed: {}", err);
            }
        }
    }

    /// Repost the panel if the canonical message no longer exists.
    async fn check_panel(&self) -> Result<()> {
        let panel = self.vstate.read().await.panel;

        let lookup = match panel {
            None => Lookup::Missing,
            Some(panel_id) => match self
                .presenter
                .channel_id
                .message(&*self.http, panel_id)
                .await
            {
                Ok(_) => Lookup::Found,
                Err(e) if e.is_not_found() => Lookup::Missing,
                Err(e) => {
                    log_error!("Could not look up panel {}: {}", panel_id.color(), e);
                    Lookup::Failed
                }
            },
        };

        let current = self.vstate.read().await.panel;
        if !should_repost(panel, lookup, current) {
            return Ok(());
        }

        log_internal!(
            "Panel {} missing from {}, reposting",
            panel.map(|id| id.color()).unwrap_or("<none>".to_owned()),
            self.presenter.channel_id.color(&self.http).await,
        );
        self.presenter
            .repost((&self.cache, &*self.http), &self.vstate, None)
            .await?;
        Ok(())
    }

    /// Delete every bot message in the recent window except the canonical panel.
    async fn sweep(&self) -> Result<()> {
        let keep = self.vstate.read().await.panel;
        let deleted = purge_bot_messages(
            (&self.cache, &*self.http),
            self.presenter.channel_id,
            self.bot_id,
            keep,
            self.settings.window(),
        )
        .await?;

        if !deleted.is_empty() {
            log_internal!(
                "Swept {} stray message(s) from {}",
                deleted.len(),
                self.presenter.channel_id.color(&self.http).await,
            );
        }
        Ok(())
    }
}

/// Result of looking up the canonical panel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lookup {
    Found,
    /// Deleted, or never posted
    Missing,
    /// Anything but a 404; retried on the next tick
    Failed,
}

/// Whether the existence check posts a new panel.  `seen` is the canonical id the lookup was
/// made for and `current` the canonical id once it finished; if they differ someone else already
/// reposted.
fn should_repost(seen: Option<MessageId>, lookup: Lookup, current: Option<MessageId>) -> bool {
    lookup == Lookup::Missing && seen == current
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANEL: MessageId = MessageId::new(7);
    const NEWER: MessageId = MessageId::new(8);

    #[test]
    fn deleted_panel_is_reposted() {
        assert!(should_repost(Some(PANEL), Lookup::Missing, Some(PANEL)));
    }

    #[test]
    fn existing_panel_is_left_alone() {
        assert!(!should_repost(Some(PANEL), Lookup::Found, Some(PANEL)));
    }

    #[test]
    fn failed_lookup_does_not_repost() {
        assert!(!should_repost(Some(PANEL), Lookup::Failed, Some(PANEL)));
    }

    #[test]
    fn panel_replaced_during_lookup_is_not_reposted_again() {
        assert!(!should_repost(Some(PANEL), Lookup::Missing, Some(NEWER)));
        assert!(!should_repost(None, Lookup::Missing, Some(NEWER)));
    }

    #[test]
    fn missing_panel_is_posted() {
        assert!(should_repost(None, Lookup::Missing, None));
    }
}
