// Domain models for the quote system.
// Nothing in here knows about serenity - ids are plain u64 so the core can be
// exercised from tests with in-memory fakes.

use chrono::{DateTime, Utc};

/// Base URL for message deep links.
pub const DISCORD_CHANNELS_URL: &str = "https://discord.com/channels";

/// The quote channel designated for one guild.
/// At most one binding exists per guild; re-registering replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuildBinding {
    pub guild_id: u64,
    pub channel_id: u64,
}

/// Minimal view of a channel, enough to bind it and confirm it by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: u64,
    /// `None` for channels outside any guild (DMs).
    pub guild_id: Option<u64>,
    pub name: String,
    /// Text or announcement channel, i.e. somewhere a quote can be posted.
    pub accepts_text: bool,
}

/// Points at another message, e.g. the parent of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: u64,
    pub message_id: u64,
}

/// An attachment on a source message. The bytes are fetched lazily while staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteAttachment {
    pub id: u64,
    pub filename: String,
    pub url: String,
}

/// A single message resolved for quoting.
#[derive(Debug, Clone)]
pub struct QuoteSource {
    /// Messages fetched over REST do not always carry their guild.
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub message_id: u64,
    pub author_display_name: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub attachments: Vec<QuoteAttachment>,
    /// Set when this message replies to another one.
    pub reply_to: Option<MessageRef>,
}

impl QuoteSource {
    /// True when there is neither text nor a file to republish.
    pub fn is_blank(&self) -> bool {
        self.body.is_empty() && self.attachments.is_empty()
    }
}

/// One invocation of the quote command, reduced to primitives.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub guild_id: u64,
    pub channel_id: u64,
    pub user_id: u64,
    /// Raw id as typed by the user; parsed by the service.
    pub message_id: Option<String>,
    pub message_count: u32,
}

/// Where the quote ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteReceipt {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
}

impl QuoteReceipt {
    pub fn permalink(&self) -> String {
        permalink(self.guild_id, self.channel_id, self.message_id)
    }
}

pub fn permalink(guild_id: u64, channel_id: u64, message_id: u64) -> String {
    format!("{DISCORD_CHANNELS_URL}/{guild_id}/{channel_id}/{message_id}")
}
