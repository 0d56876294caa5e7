//! Reactions to member, voice and message events.
//!
//! The handler works on plain snapshots of the guild, member and voice
//! state so it can run without a gateway connection. Sending goes through
//! [`Outbox`]; `discord` provides the serenity-backed implementation and the
//! event dispatch.

pub mod discord;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::db::{ActivityStore, MemberRecord};
use crate::greeting::{self, GreetingPool};
use crate::Error;

/// Somewhere messages can be sent.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<(), Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildSnapshot {
    pub id: u64,
    pub name: String,
    /// Text channels in display order
    pub channels: Vec<ChannelSnapshot>,
    /// The platform's configured default (system) channel
    pub default_channel: Option<u64>,
    pub afk_channel: Option<u64>,
}

impl GuildSnapshot {
    /// First channel named `general` or matching the configured default.
    pub fn greeting_channel(&self) -> Option<u64> {
        self.channels
            .iter()
            .find(|channel| channel.name == "general" || Some(channel.id) == self.default_channel)
            .map(|channel| channel.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceSnapshot {
    pub channel_id: Option<u64>,
    pub afk: bool,
    pub self_mute: bool,
    pub self_deaf: bool,
}

impl VoiceSnapshot {
    pub fn in_voice(&self) -> bool {
        self.channel_id.is_some()
    }
}

/// What changed between two voice snapshots. The flags are independent;
/// joining straight into the AFK channel sets both `joined_voice` and
/// `entered_afk`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceTransitions {
    pub joined_voice: bool,
    pub left_voice: bool,
    pub entered_afk: bool,
    pub left_afk: bool,
}

impl VoiceTransitions {
    pub fn between(before: &VoiceSnapshot, after: &VoiceSnapshot) -> Self {
        Self {
            joined_voice: !before.in_voice() && after.in_voice(),
            left_voice: before.in_voice() && !after.in_voice(),
            entered_afk: !before.afk && after.afk,
            left_afk: before.afk && !after.afk,
        }
    }

    pub fn any(&self) -> bool {
        self.joined_voice || self.left_voice || self.entered_afk || self.left_afk
    }
}

pub struct PresenceHandler {
    store: ActivityStore,
    greetings: GreetingPool,
}

impl PresenceHandler {
    pub fn new(store: ActivityStore, greetings: GreetingPool) -> Self {
        Self { store, greetings }
    }

    pub fn store(&self) -> &ActivityStore {
        &self.store
    }

    async fn record_for(&self, guild_id: u64, member: &MemberSnapshot) -> Result<MemberRecord, Error> {
        Ok(self
            .store
            .get_or_create(&guild_id.to_string(), &member.id.to_string(), &member.name)
            .await?)
    }

    async fn greet<O: Outbox + ?Sized>(
        &self,
        outbox: &O,
        guild: &GuildSnapshot,
        text: String,
    ) -> Result<(), Error> {
        match guild.greeting_channel() {
            Some(channel_id) => {
                outbox.send_message(channel_id, &text).await?;
                info!("Sent to channel {} in {}: {}", channel_id, guild.name, text);
            }
            None => warn!("No general or default channel in {} ({})", guild.name, guild.id),
        }
        Ok(())
    }

    pub async fn on_member_join<O: Outbox + ?Sized>(
        &self,
        outbox: &O,
        guild: &GuildSnapshot,
        member: &MemberSnapshot,
    ) -> Result<(), Error> {
        self.record_for(guild.id, member).await?;

        let text = self.greetings.compose(&member.name, &guild.name);
        self.greet(outbox, guild, text).await
    }

    pub async fn on_voice_state_change<O: Outbox + ?Sized>(
        &self,
        outbox: &O,
        guild: &GuildSnapshot,
        member: &MemberSnapshot,
        before: &VoiceSnapshot,
        after: &VoiceSnapshot,
    ) -> Result<VoiceTransitions, Error> {
        let transitions = VoiceTransitions::between(before, after);
        if !transitions.any() {
            return Ok(transitions);
        }

        let mut record = self.record_for(guild.id, member).await?;

        if transitions.joined_voice {
            self.store.record_connection(&mut record).await?;
        }
        if transitions.left_voice {
            self.store.record_disconnection(&mut record).await?;
        }
        if transitions.entered_afk {
            self.store.record_afk_enter(&mut record).await?;
        }
        if transitions.left_afk {
            self.store.record_afk_exit(&mut record).await?;
        }

        if transitions.joined_voice {
            let text = self.greetings.compose(&member.name, &guild.name);
            self.greet(outbox, guild, text).await?;
        }
        if transitions.left_voice && (before.afk || before.self_mute || before.self_deaf) {
            self.greet(outbox, guild, greeting::farewell(&member.name)).await?;
        }

        Ok(transitions)
    }

    pub async fn on_message(
        &self,
        guild_id: u64,
        member: &MemberSnapshot,
        text: &str,
    ) -> Result<(), Error> {
        let mut record = self.record_for(guild_id, member).await?;
        self.store.record_message(&mut record, text).await?;
        Ok(())
    }
}
