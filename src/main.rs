mod config;
mod context;
mod event;
mod handler;
mod helper;
mod janitor;
mod logging;
mod panel;
mod persistent_state;
mod plugin;
mod selector;
mod volatile_state;

use serenity::{all::GatewayIntents, Client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = crate::config::Config::load().await?;
    let token = cfg.general.discord_token.clone();
    let pstate = crate::persistent_state::PersistentState::load().await?;
    let vstate = crate::volatile_state::VolatileState::new();
    let handler = handler::Handler::new(cfg, pstate, vstate);

    // Things we want discord to tell us about.  Button presses arrive regardless of intents.
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES;

    Client::builder(&token, intents)
        .event_handler(handler)
        .await?
        .start()
        .await
        .map_err(Into::into)
}
