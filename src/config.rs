use anyhow::{anyhow, Result};
use serenity::all::{ChannelId, GuildId};
use std::{path::PathBuf, time::Duration};
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/invbot/config.toml";

/// Discord caps message history requests at this many messages.
const MAX_HISTORY_WINDOW: u8 = 100;

const DEFAULT_FOOTER_HELP: &str = "Si ves algún mensaje de interacción fallida o error, verifica si \
                                   la acción se realizó correctamente. Si tienes problemas, \
                                   pregunta a Albertito.";

/// Bot configuration
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub general: General,
    #[serde(default)]
    pub janitor: Janitor,
    #[serde(default)]
    pub interaction: Interaction,
    #[serde(default)]
    pub panel: Panel,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct General {
    pub discord_token: String,
    guild_id: u64,
    channel_id: u64,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Janitor {
    pub panel_check_seconds: u64,
    pub sweep_seconds: u64,
    pub sweep_window: u32,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Interaction {
    pub selection_timeout_seconds: u64,
    pub transient_seconds: u64,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Panel {
    /// Second paragraph of the idle panel description
    pub footer_help: String,
}

impl Default for Janitor {
    fn default() -> Self {
        Self {
            panel_check_seconds: 3,
            sweep_seconds: 15,
            sweep_window: MAX_HISTORY_WINDOW.into(),
        }
    }
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            selection_timeout_seconds: 60,
            transient_seconds: 3,
        }
    }
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            footer_help: DEFAULT_FOOTER_HELP.to_owned(),
        }
    }
}

impl General {
    pub fn guild_id(&self) -> GuildId {
        GuildId::new(self.guild_id)
    }

    /// The channel holding the panel
    pub fn channel_id(&self) -> ChannelId {
        ChannelId::new(self.channel_id)
    }
}

impl Janitor {
    pub fn panel_check_interval(&self) -> Duration {
        Duration::from_secs(self.panel_check_seconds.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_seconds.max(1))
    }

    /// Number of recent messages inspected when cleaning up the channel
    pub fn window(&self) -> u8 {
        let window = self.sweep_window.clamp(1, MAX_HISTORY_WINDOW.into());
        u8::try_from(window).unwrap_or(MAX_HISTORY_WINDOW)
    }
}

impl Interaction {
    pub fn selection_timeout(&self) -> Duration {
        Duration::from_secs(self.selection_timeout_seconds)
    }

    pub fn transient_lifetime(&self) -> Duration {
        Duration::from_secs(self.transient_seconds)
    }
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        Self::parse(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;

        // Discord ids are never zero
        if config.general.guild_id == 0 || config.general.channel_id == 0 {
            return Err(anyhow!("`guild_id` and `channel_id` must be non-zero"));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = Config::parse(
            r#"
            [general]
            discord_token = "abc"
            guild_id = 10
            channel_id = 20
            "#,
        )
        .unwrap();

        assert_eq!(cfg.general.discord_token, "abc");
        assert_eq!(cfg.general.guild_id(), GuildId::new(10));
        assert_eq!(cfg.general.channel_id(), ChannelId::new(20));
        assert_eq!(cfg.janitor.panel_check_interval(), Duration::from_secs(3));
        assert_eq!(cfg.janitor.sweep_interval(), Duration::from_secs(15));
        assert_eq!(cfg.janitor.window(), 100);
        assert_eq!(cfg.interaction.selection_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.interaction.transient_lifetime(), Duration::from_secs(3));
        assert!(cfg.panel.footer_help.contains("Albertito"));
    }

    #[test]
    fn overrides_are_read_and_clamped() {
        let cfg = Config::parse(
            r#"
            [general]
            discord_token = "abc"
            guild_id = 10
            channel_id = 20

            [janitor]
            sweep_seconds = 30
            sweep_window = 250

            [interaction]
            selection_timeout_seconds = 5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.janitor.sweep_interval(), Duration::from_secs(30));
        assert_eq!(cfg.janitor.panel_check_interval(), Duration::from_secs(3));
        assert_eq!(cfg.janitor.window(), 100);
        assert_eq!(cfg.interaction.selection_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.interaction.transient_lifetime(), Duration::from_secs(3));
    }

    #[test]
    fn sweep_window_beyond_a_byte_is_clamped() {
        let cfg = Config::parse(
            r#"
            [general]
            discord_token = "abc"
            guild_id = 10
            channel_id = 20

            [janitor]
            sweep_window = 300
            "#,
        )
        .unwrap();
        assert_eq!(cfg.janitor.window(), 100);

        let cfg = Config::parse(
            "[general]\ndiscord_token = \"abc\"\nguild_id = 10\nchannel_id = 20\n\
             [janitor]\nsweep_window = 0\n",
        )
        .unwrap();
        assert_eq!(cfg.janitor.window(), 1);
    }

    #[test]
    fn missing_required_settings_fail() {
        assert!(Config::parse("[general]\ndiscord_token = \"abc\"\n").is_err());
        assert!(Config::parse("").is_err());
        assert!(Config::parse(
            "[general]\ndiscord_token = \"abc\"\nguild_id = 0\nchannel_id = 20\n"
        )
        .is_err());
    }
}
