//! The control panel: the one message in the channel carrying the inventory buttons.
//!
//! The panel is never edited.  Every refresh posts a new message and makes it the canonical one;
//! older copies are left for the janitor or the caller to purge.

use crate::{config::Config, log_internal, logging::PrintColor, volatile_state::VolatileState};
use anyhow::Result;
use serenity::all::{
    ButtonStyle, ChannelId, Colour, CreateActionRow, CreateButton, CreateEmbed, CreateMessage,
    GuildId, MessageId,
};
use serenity::http::CacheHttp;
use tokio::sync::RwLock;

pub const TITLE: &str = "Inventario de Objetos";
const INSTRUCTIONS: &str = "Gestiona los objetos utilizando los botones de abajo.";
const ACCENT: Colour = Colour::BLUE;

/// Buttons on the panel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelButton {
    AddItem,
    RemoveItem,
    ViewInventory,
    ViewHistory,
    ClearChat,
}

impl PanelButton {
    pub const ALL: [PanelButton; 5] = [
        PanelButton::AddItem,
        PanelButton::RemoveItem,
        PanelButton::ViewInventory,
        PanelButton::ViewHistory,
        PanelButton::ClearChat,
    ];

    pub fn custom_id(self) -> &'static str {
        match self {
            PanelButton::AddItem => "add_item",
            PanelButton::RemoveItem => "remove_item",
            PanelButton::ViewInventory => "view_inventory",
            PanelButton::ViewHistory => "view_history",
            PanelButton::ClearChat => "clear_chat",
        }
    }

    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|button| button.custom_id() == custom_id)
    }

    fn label(self) -> &'static str {
        match self {
            PanelButton::AddItem => "Añadir",
            PanelButton::RemoveItem => "Restar",
            PanelButton::ViewInventory => "Ver Inventario",
            PanelButton::ViewHistory => "Ver Historial",
            PanelButton::ClearChat => "Vaciar Chat",
        }
    }

    fn style(self) -> ButtonStyle {
        match self {
            PanelButton::AddItem => ButtonStyle::Success,
            PanelButton::RemoveItem | PanelButton::ClearChat => ButtonStyle::Danger,
            PanelButton::ViewInventory | PanelButton::ViewHistory => ButtonStyle::Secondary,
        }
    }
}

/// Panel body: the instructions, then either the latest change or the standing help text.
pub fn description(footer_help: &str, last_action: Option<&str>) -> String {
    format!("{}\n\n{}", INSTRUCTIONS, last_action.unwrap_or(footer_help))
}

fn controls() -> Vec<CreateActionRow> {
    let buttons = PanelButton::ALL
        .into_iter()
        .map(|button| {
            CreateButton::new(button.custom_id())
                .label(button.label())
                .style(button.style())
        })
        .collect();

    vec![CreateActionRow::Buttons(buttons)]
}

/// Renders embeds for the configured guild and posts the panel to the configured channel.
#[derive(Clone)]
pub struct Presenter {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    footer_help: String,
}

impl Presenter {
    pub fn new(cfg: &Config) -> Self {
        Self {
            guild_id: cfg.general.guild_id(),
            channel_id: cfg.general.channel_id(),
            footer_help: cfg.panel.footer_help.clone(),
        }
    }

    /// Guild icon for the thumbnail, if the guild has one.
    async fn icon_url(&self, cache_http: impl CacheHttp) -> Option<String> {
        let cached = cache_http
            .cache()
            .and_then(|cache| self.guild_id.to_guild_cached(cache).map(|g| g.icon_url()));
        if let Some(icon_url) = cached {
            return icon_url;
        }

        self.guild_id
            .to_partial_guild(cache_http.http())
            .await
            .ok()
            .and_then(|guild| guild.icon_url())
    }

    /// Embed in the panel's style
    pub async fn embed(
        &self,
        cache_http: impl CacheHttp,
        title: &str,
        description: &str,
    ) -> CreateEmbed {
        let embed = CreateEmbed::new()
            .title(title)
            .description(description)
            .color(ACCENT);

        match self.icon_url(cache_http).await {
            Some(icon_url) => embed.thumbnail(icon_url),
            None => embed,
        }
    }

    /// Post a fresh panel and make it the canonical one.
    pub async fn repost(
        &self,
        cache_http: impl CacheHttp,
        vstate: &RwLock<VolatileState>,
        last_action: Option<&str>,
    ) -> Result<MessageId> {
        let description = description(&self.footer_help, last_action);
        let embed = self.embed(&cache_http, TITLE, &description).await;
        let message = CreateMessage::new().embed(embed).components(controls());

        let panel = self.channel_id.send_message(&cache_http, message).await?;
        vstate.write().await.panel = Some(panel.id);

        log_internal!("Posted panel {}", panel.id.color());
        Ok(panel.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_button_round_trips_through_its_id() {
        for button in PanelButton::ALL {
            assert_eq!(PanelButton::from_custom_id(button.custom_id()), Some(button));
        }
    }

    #[test]
    fn item_choices_are_not_panel_buttons() {
        assert_eq!(PanelButton::from_custom_id("add_pipa"), None);
        assert_eq!(PanelButton::from_custom_id("remove_sns"), None);
        assert_eq!(PanelButton::from_custom_id(""), None);
    }

    #[test]
    fn idle_panel_shows_help() {
        assert_eq!(
            description("help text", None),
            "Gestiona los objetos utilizando los botones de abajo.\n\nhelp text"
        );
    }

    #[test]
    fn refreshed_panel_shows_latest_change() {
        let text = description("help text", Some("<@1> ha añadido 1 pipa. Total: 8"));
        assert!(text.starts_with(INSTRUCTIONS));
        assert!(text.ends_with("<@1> ha añadido 1 pipa. Total: 8"));
        assert!(!text.contains("help text"));
    }
}
