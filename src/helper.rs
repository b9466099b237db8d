//! Miscellaneous convenience methods

use serenity::all::{ChannelId, GetMessages, HttpError, Message, MessageId, UserId};
use serenity::http::CacheHttp;

pub trait ErrorHelper {
    /// Discord answered 404, e.g. the message is already gone.
    fn is_not_found(&self) -> bool;
}

impl ErrorHelper for serenity::Error {
    fn is_not_found(&self) -> bool {
        matches!(
            self,
            serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
                if response.status_code.as_u16() == 404
        )
    }
}

pub trait ResultHelper {
    /// Treat "already gone" as success.  Deletes race with the janitor and with each other.
    fn allow_missing(self) -> serenity::Result<()>;
}

impl ResultHelper for serenity::Result<()> {
    fn allow_missing(self) -> serenity::Result<()> {
        match self {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}

/// Messages from `bot_id` other than `keep`
pub fn stale_messages<I>(messages: I, bot_id: UserId, keep: Option<MessageId>) -> Vec<MessageId>
where
    I: IntoIterator<Item = (MessageId, UserId)>,
{
    messages
        .into_iter()
        .filter(|(id, author)| *author == bot_id && Some(*id) != keep)
        .map(|(id, _)| id)
        .collect()
}

/// Delete every message the bot wrote among the last `window` messages of `channel_id`, except
/// `keep`.  Returns the deleted ids.
pub async fn purge_bot_messages(
    cache_http: impl CacheHttp,
    channel_id: ChannelId,
    bot_id: UserId,
    keep: Option<MessageId>,
    window: u8,
) -> serenity::Result<Vec<MessageId>> {
    let recent: Vec<Message> = channel_id
        .messages(&cache_http, GetMessages::new().limit(window))
        .await?;
    let stale = stale_messages(recent.iter().map(|m| (m.id, m.author.id)), bot_id, keep);

    for id in &stale {
        channel_id
            .delete_message(cache_http.http(), *id)
            .await
            .allow_missing()?;
    }

    Ok(stale)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: UserId = UserId::new(100);
    const HUMAN: UserId = UserId::new(200);

    fn msg(id: u64, author: UserId) -> (MessageId, UserId) {
        (MessageId::new(id), author)
    }

    #[test]
    fn keeps_panel_and_human_messages() {
        let recent = vec![
            msg(9, BOT),
            msg(8, HUMAN),
            msg(7, BOT),
            msg(6, BOT),
            msg(5, HUMAN),
        ];

        let stale = stale_messages(recent, BOT, Some(MessageId::new(7)));
        assert_eq!(stale, vec![MessageId::new(9), MessageId::new(6)]);
    }

    #[test]
    fn without_a_panel_every_bot_message_is_stale() {
        let recent = vec![msg(3, BOT), msg(2, HUMAN), msg(1, BOT)];

        let stale = stale_messages(recent, BOT, None);
        assert_eq!(stale, vec![MessageId::new(3), MessageId::new(1)]);
    }

    #[test]
    fn at_most_the_panel_survives_a_sweep() {
        let panel = MessageId::new(4);
        let recent: Vec<_> = (1..=6).map(|id| msg(id, BOT)).collect();

        let stale = stale_messages(recent.clone(), BOT, Some(panel));
        let survivors: Vec<_> = recent
            .into_iter()
            .filter(|(id, author)| *author == BOT && !stale.contains(id))
            .collect();
        assert_eq!(survivors, vec![(panel, BOT)]);
    }
}
