//! Serenity side of the presence handler: event dispatch, cache lookups and
//! message sending.

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ChannelSnapshot, GuildSnapshot, MemberSnapshot, Outbox, VoiceSnapshot};
use crate::{Data, Error};

/// Sends through the Discord HTTP API.
pub struct HttpOutbox {
    http: Arc<serenity::Http>,
}

impl HttpOutbox {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Outbox for HttpOutbox {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<(), Error> {
        serenity::ChannelId::new(channel_id)
            .say(&self.http, content)
            .await?;
        Ok(())
    }
}

/// Copies what the handler needs out of the cached guild.
fn guild_snapshot(ctx: &serenity::Context, guild_id: serenity::GuildId) -> Option<GuildSnapshot> {
    let guild = ctx.cache.guild(guild_id)?;

    let mut channels: Vec<&serenity::GuildChannel> = guild
        .channels
        .values()
        .filter(|channel| channel.kind == serenity::ChannelType::Text)
        .collect();
    channels.sort_by_key(|channel| (channel.position, channel.id));

    Some(GuildSnapshot {
        id: guild_id.get(),
        name: guild.name.clone(),
        channels: channels
            .into_iter()
            .map(|channel| ChannelSnapshot {
                id: channel.id.get(),
                name: channel.name.clone(),
            })
            .collect(),
        default_channel: guild.system_channel_id.map(|id| id.get()),
        afk_channel: guild
            .afk_metadata
            .as_ref()
            .map(|afk| afk.afk_channel_id.get()),
    })
}

fn member_snapshot(user: &serenity::User) -> MemberSnapshot {
    MemberSnapshot {
        id: user.id.get(),
        name: user.name.clone(),
    }
}

fn voice_snapshot(state: Option<&serenity::VoiceState>, afk_channel: Option<u64>) -> VoiceSnapshot {
    state
        .map(|state| {
            let channel_id = state.channel_id.map(|id| id.get());
            VoiceSnapshot {
                channel_id,
                afk: channel_id.is_some() && channel_id == afk_channel,
                self_mute: state.self_mute,
                self_deaf: state.self_deaf,
            }
        })
        .unwrap_or_default()
}

pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    debug!("Got an event in event handler: {:?}", event.snake_case_name());

    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
            info!("Bot ID: {}", data_about_bot.user.id);
            info!("Connected to {} guilds", data_about_bot.guilds.len());
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            let Some(guild) = guild_snapshot(ctx, new_member.guild_id) else {
                warn!("Guild {} not cached, skipping member join", new_member.guild_id);
                return Ok(());
            };
            let outbox = HttpOutbox::new(ctx.http.clone());
            data.presence
                .on_member_join(&outbox, &guild, &member_snapshot(&new_member.user))
                .await?;
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            let Some(guild_id) = new.guild_id else {
                return Ok(());
            };
            let Some(guild) = guild_snapshot(ctx, guild_id) else {
                warn!("Guild {} not cached, skipping voice update", guild_id);
                return Ok(());
            };

            let member = match &new.member {
                Some(member) => member_snapshot(&member.user),
                None => member_snapshot(&new.user_id.to_user(ctx).await?),
            };
            let before = voice_snapshot(old.as_ref(), guild.afk_channel);
            let after = voice_snapshot(Some(new), guild.afk_channel);

            let outbox = HttpOutbox::new(ctx.http.clone());
            let transitions = data
                .presence
                .on_voice_state_change(&outbox, &guild, &member, &before, &after)
                .await?;
            debug!("Voice update for {} in {}: {:?}", member.name, guild.name, transitions);
        }
        serenity::FullEvent::Message { new_message } => {
            if new_message.author.bot {
                return Ok(());
            }
            let Some(guild_id) = new_message.guild_id else {
                return Ok(());
            };

            data.presence
                .on_message(guild_id.get(), &member_snapshot(&new_message.author), &new_message.content)
                .await?;
        }
        _ => {}
    }

    Ok(())
}
