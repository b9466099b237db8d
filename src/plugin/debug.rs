use crate::{event::*, log_event, logging::*, plugin::*};
use anyhow::Result;

/// Prints debug information about event to stdout
pub struct Debug;

#[serenity::async_trait]
impl Plugin for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn handle(&self, ctx: &Context<'_>, event: &Event) -> Result<EventHandled> {
        match event {
            Event::Ready(ready) => {
                log_event!(
                    "Connected to {} server(s) as {}",
                    ready.guilds.len(),
                    ready.user.color(),
                );
            }
            Event::Interaction(interaction) => {
                let answering = ctx
                    .vstate
                    .read()
                    .await
                    .selections
                    .is_waiting(interaction.user.id, interaction.channel_id);

                log_event!(
                    "{}{}{}{} pressed \"{}\"{}",
                    interaction.channel_id.color(ctx.http).await,
                    Glue {}.color(),
                    interaction.user.color(),
                    Glue {}.color(),
                    interaction.data.custom_id,
                    if answering { " (answering item prompt)" } else { "" },
                );
            }
        }

        Ok(EventHandled::No)
    }
}
