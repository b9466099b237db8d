use crate::{
    config::Config, context::Context, event::Event, persistent_state::PersistentState,
    volatile_state::VolatileState,
};
use serenity::all::{Interaction, Ready};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Discord event handler
pub struct Handler {
    cfg: Arc<RwLock<Config>>,
    pstate: Arc<RwLock<PersistentState>>,
    vstate: Arc<RwLock<VolatileState>>,
}

impl<'a> Handler {
    pub fn new(cfg: Config, pstate: PersistentState, vstate: VolatileState) -> Self {
        Self {
            cfg: Arc::new(RwLock::new(cfg)),
            pstate: Arc::new(RwLock::new(pstate)),
            vstate: Arc::new(RwLock::new(vstate)),
        }
    }

    fn ctx(&'a self, discord_ctx: &'a serenity::all::Context) -> Context<'a> {
        Context {
            cfg: &self.cfg,
            pstate: &self.pstate,
            vstate: &self.vstate,
            cache: &discord_ctx.cache,
            http: &discord_ctx.http,
            cache_http: discord_ctx,
        }
    }
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, discord_ctx: serenity::all::Context, ready: Ready) {
        Event::Ready(ready).handle(self.ctx(&discord_ctx)).await;
    }

    async fn interaction_create(
        &self,
        discord_ctx: serenity::all::Context,
        interaction: Interaction,
    ) {
        // Only buttons drive this bot
        let Interaction::Component(component) = interaction else {
            return;
        };

        Event::Interaction(component)
            .handle(self.ctx(&discord_ctx))
            .await;
    }
}
