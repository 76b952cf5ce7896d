// Ports the quote core needs from the chat platform.
// The discord layer implements these on top of serenity; tests implement them
// in memory.

use super::attachment_staging::StagedAttachment;
use super::quote_errors::PlatformError;
use super::quote_models::{ChannelSummary, QuoteAttachment, QuoteSource};
use async_trait::async_trait;

/// Checks used when restoring persisted bindings.
#[async_trait]
pub trait BindingResolver: Send + Sync {
    async fn guild_exists(&self, guild_id: u64) -> bool;
    async fn channel_exists(&self, channel_id: u64) -> bool;
}

/// Message, channel and attachment access for the quote assembler.
#[async_trait]
pub trait QuotePlatform: Send + Sync {
    /// Look a channel up by id. `Ok(None)` means the id does not exist.
    async fn channel(&self, channel_id: u64) -> Result<Option<ChannelSummary>, PlatformError>;

    /// All text channels of a guild.
    async fn text_channels(&self, guild_id: u64) -> Result<Vec<ChannelSummary>, PlatformError>;

    async fn fetch_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<QuoteSource, PlatformError>;

    /// Up to `limit` messages posted right after `message_id`, oldest first.
    async fn messages_after(
        &self,
        channel_id: u64,
        message_id: u64,
        limit: u8,
    ) -> Result<Vec<QuoteSource>, PlatformError>;

    /// The latest `limit` messages of a channel, newest first.
    async fn recent_messages(
        &self,
        channel_id: u64,
        limit: u8,
    ) -> Result<Vec<QuoteSource>, PlatformError>;

    async fn download_attachment(
        &self,
        attachment: &QuoteAttachment,
    ) -> Result<Vec<u8>, PlatformError>;

    /// Send text plus files, returning the id of the created message.
    async fn send_message(
        &self,
        channel_id: u64,
        content: &str,
        files: &[StagedAttachment],
    ) -> Result<u64, PlatformError>;
}
