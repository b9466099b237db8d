use crate::{context::Context, event::EventHandled};
use anyhow::Result;

mod debug;
pub mod inventory;
mod ready;

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used for debug
    fn name(&self) -> &'static str;
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt to
    /// handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context<'_>, event: &crate::event::Event) -> Result<EventHandled>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    use crate::plugin::*;

    vec![
        // Core bot operations
        Box::new(debug::Debug),
        Box::new(ready::Ready),
        // Panel buttons and item prompts
        Box::new(inventory::Inventory),
    ]
}
