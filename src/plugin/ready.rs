use crate::{event::*, janitor::Janitor, log_internal, panel::Presenter, plugin::*};
use anyhow::Result;

/// Posts the panel and starts the janitor once the connection to Discord is ready.
pub struct Ready;

#[serenity::async_trait]
impl Plugin for Ready {
    fn name(&self) -> &'static str {
        "ready"
    }

    async fn handle(&self, ctx: &Context<'_>, event: &Event) -> Result<EventHandled> {
        let Event::Ready(ready) = event else {
            return Ok(EventHandled::No);
        };

        // Reconnects fire `Ready` again; the panel and loops from the first one are still alive.
        if ctx.vstate.read().await.janitor_started() {
            return Ok(EventHandled::Yes);
        }

        let cfg = ctx.cfg.read().await;
        let presenter = Presenter::new(&cfg);
        let settings = cfg.janitor.clone();
        drop(cfg);

        // If the channel is unusable the loops would only fail forever, so don't start them.
        presenter.repost(ctx.cache_http, ctx.vstate, None).await?;

        ctx.vstate.write().await.mark_janitor_started();
        Janitor {
            cache: ctx.cache.clone(),
            http: ctx.http.clone(),
            vstate: ctx.vstate.clone(),
            presenter,
            settings,
            bot_id: ready.user.id,
        }
        .start();
        log_internal!("Janitor started");

        Ok(EventHandled::Yes)
    }
}
