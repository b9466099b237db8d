//! Item prompt shown after "add" or "remove" was pressed.
//!
//! The prompt lists one button per item and waits, bounded by the configured timeout, for the
//! presser's next button press in the same channel.  That press is delivered by the inventory
//! plugin through [`crate::volatile_state::PendingSelections`].

use crate::{
    context::Context,
    helper::{purge_bot_messages, ResultHelper},
    log_internal,
    panel::Presenter,
    persistent_state::{Action, Item, PersistentState},
    plugin::inventory::notify,
};
use anyhow::Result;
use serenity::all::{
    ButtonStyle, ChannelId, Colour, ComponentInteraction, CreateActionRow, CreateButton,
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage,
    Mentionable, Message, UserId,
};

const TIMEOUT_NOTICE: &str = "Tiempo de espera agotado. Por favor, intenta de nuevo.";
const INVALID_ITEM_NOTICE: &str = "Item no válido";

/// Custom id of the button choosing `item` for `action`, e.g. `add_pipa`
pub fn choice_id(action: Action, item: Item) -> String {
    format!("{}_{}", action.name(), item)
}

/// Item named by a choice button's custom id.  Anything else pressed while the prompt is open,
/// such as a panel button, names no item.
pub fn parse_choice(custom_id: &str) -> Option<Item> {
    let (_, item) = custom_id.split_once('_')?;
    item.parse().ok()
}

/// How an open prompt was answered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    TimedOut,
    Invalid,
    Commit(Item),
}

impl Outcome {
    /// `answer` is the custom id of the press that answered the prompt, if any did in time.
    fn of(answer: Option<&str>) -> Self {
        match answer {
            None => Outcome::TimedOut,
            Some(custom_id) => parse_choice(custom_id).map_or(Outcome::Invalid, Outcome::Commit),
        }
    }

    /// Record the change this outcome commits, if it commits one.
    fn apply(self, pstate: &mut PersistentState, actor: &str, action: Action) -> Option<String> {
        match self {
            Outcome::Commit(item) => Some(pstate.record(actor, action, item)),
            Outcome::TimedOut | Outcome::Invalid => None,
        }
    }
}

fn choice_buttons(action: Action) -> Vec<CreateActionRow> {
    let style = match action {
        Action::Add => ButtonStyle::Success,
        Action::Remove => ButtonStyle::Danger,
    };

    let buttons = Item::ALL
        .into_iter()
        .map(|item| {
            CreateButton::new(choice_id(action, item))
                .label(item.name())
                .style(style)
        })
        .collect();

    vec![CreateActionRow::Buttons(buttons)]
}

/// Ask `invocation`'s presser which item to `action`, then apply it.
pub async fn run(
    ctx: &Context<'_>,
    invocation: &ComponentInteraction,
    action: Action,
) -> Result<()> {
    let user_id = invocation.user.id;
    let channel_id = invocation.channel_id;

    let answer = ctx.vstate.write().await.selections.open(user_id, channel_id);
    let waited = prompt_and_wait(ctx, channel_id, action, answer).await;
    ctx.vstate.write().await.selections.prune(user_id, channel_id);

    let (prompt, selection) = waited?;
    let outcome = Outcome::of(selection.as_ref().map(|s| s.data.custom_id.as_str()));

    match (outcome, selection) {
        (Outcome::Commit(_), Some(selection)) => {
            selection
                .create_response(ctx.cache_http, CreateInteractionResponse::Acknowledge)
                .await?;

            commit(ctx, user_id, channel_id, action, outcome).await?;
            prompt.delete(ctx.cache_http).await.allow_missing()?;
        }
        (Outcome::Invalid, Some(selection)) => {
            // Prompt stays up until the next sweep.
            let reply = CreateInteractionResponseMessage::new()
                .content(INVALID_ITEM_NOTICE)
                .ephemeral(true);
            selection
                .create_response(ctx.cache_http, CreateInteractionResponse::Message(reply))
                .await?;
        }
        _ => {
            prompt.delete(ctx.cache_http).await.allow_missing()?;
            notify(ctx, invocation, TIMEOUT_NOTICE).await;
        }
    }

    Ok(())
}

async fn prompt_and_wait(
    ctx: &Context<'_>,
    channel_id: ChannelId,
    action: Action,
    answer: tokio::sync::oneshot::Receiver<ComponentInteraction>,
) -> Result<(Message, Option<ComponentInteraction>)> {
    let timeout = ctx.cfg.read().await.interaction.selection_timeout();

    let embed = CreateEmbed::new()
        .title(format!("Selecciona el item que quieres {}", action.name()))
        .color(Colour::BLUE);
    let message = CreateMessage::new()
        .embed(embed)
        .components(choice_buttons(action));
    let prompt = channel_id.send_message(ctx.cache_http, message).await?;

    // A dropped sender means nobody will ever answer; same as running out of time.
    let selection = tokio::time::timeout(timeout, answer)
        .await
        .ok()
        .and_then(|received| received.ok());
    Ok((prompt, selection))
}

/// Apply the change and refresh the panel around it.
async fn commit(
    ctx: &Context<'_>,
    user_id: UserId,
    channel_id: ChannelId,
    action: Action,
    outcome: Outcome,
) -> Result<()> {
    let actor = user_id.mention().to_string();
    let Some(line) = outcome.apply(&mut *ctx.pstate.write().await, &actor, action) else {
        return Ok(());
    };
    log_internal!("{}", line);

    let presenter = Presenter::new(&*ctx.cfg.read().await);
    let window = ctx.cfg.read().await.janitor.window();
    let bot_id = ctx.cache.current_user().id;

    let panel = presenter
        .repost(ctx.cache_http, ctx.vstate, Some(&line))
        .await?;
    purge_bot_messages(ctx.cache_http, channel_id, bot_id, Some(panel), window).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_ids_name_action_and_item() {
        assert_eq!(choice_id(Action::Add, Item::Pipa), "add_pipa");
        assert_eq!(choice_id(Action::Remove, Item::Minisubfusil), "remove_minisubfusil");
    }

    #[test]
    fn every_choice_button_parses_back_to_its_item() {
        for action in [Action::Add, Action::Remove] {
            for item in Item::ALL {
                assert_eq!(parse_choice(&choice_id(action, item)), Some(item));
            }
        }
    }

    #[test]
    fn presses_naming_no_item_are_invalid() {
        assert_eq!(parse_choice("view_inventory"), None);
        assert_eq!(parse_choice("clear_chat"), None);
        assert_eq!(parse_choice("add_item"), None);
        assert_eq!(parse_choice("add_rifle"), None);
        assert_eq!(parse_choice("pipa"), None);
        assert_eq!(parse_choice(""), None);
    }

    #[test]
    fn answers_decide_the_outcome() {
        assert_eq!(Outcome::of(None), Outcome::TimedOut);
        assert_eq!(Outcome::of(Some("view_history")), Outcome::Invalid);
        assert_eq!(Outcome::of(Some("add_rifle")), Outcome::Invalid);
        assert_eq!(
            Outcome::of(Some("remove_micro")),
            Outcome::Commit(Item::Micro)
        );
    }

    #[test]
    fn unanswered_or_invalid_prompts_change_nothing() {
        let mut pstate = PersistentState::default();
        pstate.record("<@1>", Action::Add, Item::Pipa);
        let before = pstate.clone();

        for answer in [None, Some("clear_chat"), Some("add_rifle")] {
            for action in [Action::Add, Action::Remove] {
                let line = Outcome::of(answer).apply(&mut pstate, "<@2>", action);
                assert_eq!(line, None);
                assert_eq!(pstate, before);
            }
        }
    }

    #[test]
    fn committed_choice_moves_one_unit_and_logs_one_line() {
        let quantity = |pstate: &PersistentState, item: Item| {
            pstate.inventory.iter().find(|(i, _)| *i == item).unwrap().1
        };

        let mut pstate = PersistentState::default();
        let line = Outcome::of(Some("add_sns")).apply(&mut pstate, "<@3>", Action::Add);
        assert_eq!(line.as_deref(), Some("<@3> ha añadido 1 sns. Total: 10"));
        assert_eq!(quantity(&pstate, Item::Sns), 10);

        let line = Outcome::of(Some("remove_minisubfusil"))
            .apply(&mut pstate, "<@3>", Action::Remove)
            .unwrap();
        assert_eq!(line, "<@3> ha quitado 1 minisubfusil. Total: -1");
        assert_eq!(quantity(&pstate, Item::Minisubfusil), -1);
        assert_eq!(quantity(&pstate, Item::Pipa), 7);
        assert_eq!(
            pstate.history.listing(),
            "<@3> ha añadido 1 sns. Total: 10\n<@3> ha quitado 1 minisubfusil. Total: -1"
        );
    }
}
