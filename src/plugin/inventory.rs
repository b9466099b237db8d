use crate::{
    event::*,
    helper::{purge_bot_messages, ResultHelper},
    log_error, log_internal,
    panel::{PanelButton, Presenter},
    persistent_state::Action,
    plugin::*,
    selector,
};
use anyhow::Result;
use serenity::all::{
    ChannelId, ComponentInteraction, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateMessage,
};

const FAILURE_NOTICE: &str = "Hubo un error al procesar la interacción. Inténtalo de nuevo.";

/// Panel buttons.  Also routes presses that answer an open item prompt.
pub struct Inventory;

#[serenity::async_trait]
impl Plugin for Inventory {
    fn name(&self) -> &'static str {
        "inventory"
    }

    async fn handle(&self, ctx: &Context<'_>, event: &Event) -> Result<EventHandled> {
        let Event::Interaction(interaction) = event else {
            return Ok(EventHandled::No);
        };

        let waiting = ctx
            .vstate
            .write()
            .await
            .selections
            .take(interaction.user.id, interaction.channel_id);
        if let Some(prompt) = waiting {
            // If the prompt already gave up, the press is an ordinary one.
            if prompt.send(interaction.clone()).is_ok() {
                return Ok(EventHandled::Yes);
            }
        }

        let Some(button) = PanelButton::from_custom_id(&interaction.data.custom_id) else {
            return Ok(EventHandled::No);
        };

        if let Err(err) = dispatch(ctx, interaction, button).await {
            log_error!("Failed to handle \"{}\": {}", button.custom_id(), err);
            notify(ctx, interaction, FAILURE_NOTICE).await;
        }

        Ok(EventHandled::Yes)
    }
}

async fn dispatch(
    ctx: &Context<'_>,
    interaction: &ComponentInteraction,
    button: PanelButton,
) -> Result<()> {
    // Acknowledge right away; notices for the presser go out as ephemeral follow-ups.
    interaction
        .create_response(ctx.cache_http, CreateInteractionResponse::Acknowledge)
        .await?;

    match button {
        PanelButton::AddItem => selector::run(ctx, interaction, Action::Add).await?,
        PanelButton::RemoveItem => selector::run(ctx, interaction, Action::Remove).await?,
        PanelButton::ViewInventory => {
            let listing = ctx.pstate.read().await.inventory.listing();
            show_briefly(ctx, interaction.channel_id, "Inventario", &listing).await?;
        }
        PanelButton::ViewHistory => {
            let listing = ctx.pstate.read().await.history.listing();
            show_briefly(ctx, interaction.channel_id, "Historial", &listing).await?;
        }
        PanelButton::ClearChat => clear_chat(ctx, interaction.channel_id).await?,
    }

    save(ctx).await;
    Ok(())
}

/// Post an embed and delete it again after the configured lifetime.
async fn show_briefly(
    ctx: &Context<'_>,
    channel_id: ChannelId,
    title: &str,
    body: &str,
) -> Result<()> {
    let presenter = Presenter::new(&*ctx.cfg.read().await);
    let lifetime = ctx.cfg.read().await.interaction.transient_lifetime();

    let embed = presenter.embed(ctx.cache_http, title, body).await;
    let message = channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(embed))
        .await?;

    tokio::time::sleep(lifetime).await;
    message.delete(ctx.cache_http).await.allow_missing()?;
    Ok(())
}

/// Remove the bot's clutter, then post a new panel.
///
/// The previous panel is spared by the purge and left alongside the new one until the next sweep.
async fn clear_chat(ctx: &Context<'_>, channel_id: ChannelId) -> Result<()> {
    let keep = ctx.vstate.read().await.panel;
    let window = ctx.cfg.read().await.janitor.window();
    let bot_id = ctx.cache.current_user().id;

    let deleted = purge_bot_messages(ctx.cache_http, channel_id, bot_id, keep, window).await?;
    log_internal!("Cleared {} message(s)", deleted.len());

    let presenter = Presenter::new(&*ctx.cfg.read().await);
    presenter.repost(ctx.cache_http, ctx.vstate, None).await?;
    Ok(())
}

/// Snapshot inventory and history.  Failures are only logged; in-memory state stays as is.
async fn save(ctx: &Context<'_>) {
    // Held for writing so concurrent saves don't share the temporary files.
    let pstate = ctx.pstate.write().await;
    if let Err(err) = pstate.save().await {
        log_error!("Failed to save state: {}", err);
    }
}

/// Message only the presser can see, sent after the press was acknowledged.
pub async fn notify(ctx: &Context<'_>, interaction: &ComponentInteraction, text: &str) {
    let followup = CreateInteractionResponseFollowup::new()
        .content(text)
        .ephemeral(true);

    if let Err(err) = interaction.create_followup(ctx.cache_http, followup).await {
        log_error!("Failed to notify {}: {}", interaction.user.name, err);
    }
}
