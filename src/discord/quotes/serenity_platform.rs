// Serenity-backed implementation of the quote ports.
//
// This is the only place that turns Discord SDK types into core models. Ids go
// in and out as u64; serenity's NonZero ids are built behind a zero check so a
// stray 0 becomes "not found" instead of a panic.

use crate::core::quotes::{
    BindingResolver, ChannelSummary, MessageRef, PlatformError, QuoteAttachment, QuotePlatform,
    QuoteSource, StagedAttachment,
};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::collections::HashMap;
use std::sync::Arc;

/// Nicknames already resolved while converting one batch of messages.
type Nicknames = HashMap<serenity::UserId, Option<String>>;

pub struct SerenityQuotePlatform {
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    downloader: reqwest::Client,
}

impl SerenityQuotePlatform {
    pub fn new(http: Arc<serenity::Http>, cache: Arc<serenity::Cache>) -> Self {
        Self {
            http,
            cache,
            downloader: reqwest::Client::new(),
        }
    }

    /// Messages fetched over REST usually come without a guild id, so fall back
    /// to the channel's guild.
    async fn guild_of(&self, channel_id: serenity::ChannelId) -> Option<u64> {
        channel_id
            .to_channel(&self.http)
            .await
            .ok()
            .and_then(|channel| channel.guild())
            .map(|channel| channel.guild_id.get())
    }

    /// Messages fetched over REST carry no member data, so the guild nickname
    /// comes from the cache or, failing that, the members endpoint.
    async fn nickname(&self, guild_id: Option<u64>, user_id: serenity::UserId) -> Option<String> {
        let guild_id = serenity::GuildId::new(guild_id.filter(|id| *id != 0)?);

        let cached = self
            .cache
            .member(guild_id, user_id)
            .map(|member| member.nick.clone());
        if let Some(nick) = cached {
            return nick;
        }

        match guild_id.member(&self.http, user_id).await {
            Ok(member) => member.nick,
            Err(e) => {
                tracing::debug!(
                    guild_id = guild_id.get(),
                    user_id = user_id.get(),
                    error = %e,
                    "Could not fetch member for display name"
                );
                None
            }
        }
    }

    async fn to_source(
        &self,
        message: &serenity::Message,
        channel_guild: Option<u64>,
        nicknames: &mut Nicknames,
    ) -> QuoteSource {
        let guild_id = message.guild_id.map(|id| id.get()).or(channel_guild);
        let author = &message.author;

        let nick = match nicknames.get(&author.id) {
            Some(known) => known.clone(),
            None => {
                let nick = self.nickname(guild_id, author.id).await;
                nicknames.insert(author.id, nick.clone());
                nick
            }
        };

        QuoteSource {
            guild_id,
            channel_id: message.channel_id.get(),
            message_id: message.id.get(),
            author_display_name: display_name(nick, author.global_name.clone(), &author.name),
            body: message.content.clone(),
            timestamp: chrono::DateTime::from_timestamp(message.timestamp.unix_timestamp(), 0)
                .unwrap_or_default(),
            attachments: message
                .attachments
                .iter()
                .map(|a| QuoteAttachment {
                    id: a.id.get(),
                    filename: a.filename.clone(),
                    url: a.url.clone(),
                })
                .collect(),
            reply_to: message.message_reference.as_ref().and_then(|reference| {
                reference.message_id.map(|message_id| MessageRef {
                    channel_id: reference.channel_id.get(),
                    message_id: message_id.get(),
                })
            }),
        }
    }

    async fn to_sources(
        &self,
        messages: &[serenity::Message],
        channel_guild: Option<u64>,
    ) -> Vec<QuoteSource> {
        let mut nicknames = Nicknames::new();
        let mut sources = Vec::with_capacity(messages.len());
        for message in messages {
            sources.push(self.to_source(message, channel_guild, &mut nicknames).await);
        }
        sources
    }
}

/// Guild nickname, then global display name, then username.
fn display_name(nick: Option<String>, global_name: Option<String>, username: &str) -> String {
    nick.filter(|n| !n.is_empty())
        .or(global_name.filter(|n| !n.is_empty()))
        .unwrap_or_else(|| username.to_string())
}

/// Only text and announcement channels can receive quotes.
fn accepts_text(kind: serenity::ChannelType) -> bool {
    matches!(
        kind,
        serenity::ChannelType::Text | serenity::ChannelType::News
    )
}

fn is_not_found(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(::serenity::http::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}

fn api_error(error: serenity::Error) -> PlatformError {
    PlatformError::Http(error.to_string())
}

fn channel_id(id: u64) -> Result<serenity::ChannelId, PlatformError> {
    (id != 0)
        .then(|| serenity::ChannelId::new(id))
        .ok_or_else(|| PlatformError::NotFound(format!("channel {id}")))
}

fn message_id(id: u64) -> Result<serenity::MessageId, PlatformError> {
    (id != 0)
        .then(|| serenity::MessageId::new(id))
        .ok_or_else(|| PlatformError::NotFound(format!("message {id}")))
}

#[async_trait]
impl BindingResolver for SerenityQuotePlatform {
    async fn guild_exists(&self, guild_id: u64) -> bool {
        if guild_id == 0 {
            return false;
        }
        let guild_id = serenity::GuildId::new(guild_id);
        if self.cache.guild(guild_id).is_some() {
            return true;
        }
        self.http.get_guild(guild_id).await.is_ok()
    }

    async fn channel_exists(&self, channel_id: u64) -> bool {
        matches!(self.channel(channel_id).await, Ok(Some(_)))
    }
}

#[async_trait]
impl QuotePlatform for SerenityQuotePlatform {
    async fn channel(&self, id: u64) -> Result<Option<ChannelSummary>, PlatformError> {
        let Ok(id) = channel_id(id) else {
            return Ok(None);
        };

        match id.to_channel(&self.http).await {
            Ok(serenity::Channel::Guild(channel)) => Ok(Some(ChannelSummary {
                id: channel.id.get(),
                guild_id: Some(channel.guild_id.get()),
                name: channel.name.clone(),
                accepts_text: accepts_text(channel.kind),
            })),
            Ok(other) => Ok(Some(ChannelSummary {
                id: other.id().get(),
                guild_id: None,
                name: "direct-message".to_string(),
                accepts_text: false,
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(api_error(e)),
        }
    }

    async fn text_channels(&self, guild_id: u64) -> Result<Vec<ChannelSummary>, PlatformError> {
        if guild_id == 0 {
            return Err(PlatformError::NotFound(format!("guild {guild_id}")));
        }

        let channels = serenity::GuildId::new(guild_id)
            .channels(&self.http)
            .await
            .map_err(api_error)?;

        Ok(channels
            .into_values()
            .filter(|channel| accepts_text(channel.kind))
            .map(|channel| ChannelSummary {
                id: channel.id.get(),
                guild_id: Some(channel.guild_id.get()),
                name: channel.name,
                accepts_text: true,
            })
            .collect())
    }

    async fn fetch_message(
        &self,
        channel: u64,
        message: u64,
    ) -> Result<QuoteSource, PlatformError> {
        let channel = channel_id(channel)?;
        let found = channel
            .message(&self.http, message_id(message)?)
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    PlatformError::NotFound(format!("message {message}"))
                } else {
                    api_error(e)
                }
            })?;

        let guild = self.guild_of(channel).await;
        Ok(self.to_source(&found, guild, &mut Nicknames::new()).await)
    }

    async fn messages_after(
        &self,
        channel: u64,
        message: u64,
        limit: u8,
    ) -> Result<Vec<QuoteSource>, PlatformError> {
        let channel = channel_id(channel)?;
        let mut messages = channel
            .messages(
                &self.http,
                serenity::GetMessages::new()
                    .after(message_id(message)?)
                    .limit(limit),
            )
            .await
            .map_err(api_error)?;
        messages.sort_by_key(|m| m.id);

        let guild = self.guild_of(channel).await;
        Ok(self.to_sources(&messages, guild).await)
    }

    async fn recent_messages(
        &self,
        channel: u64,
        limit: u8,
    ) -> Result<Vec<QuoteSource>, PlatformError> {
        let channel = channel_id(channel)?;
        let mut messages = channel
            .messages(&self.http, serenity::GetMessages::new().limit(limit))
            .await
            .map_err(api_error)?;
        messages.sort_by_key(|m| std::cmp::Reverse(m.id));

        let guild = self.guild_of(channel).await;
        Ok(self.to_sources(&messages, guild).await)
    }

    async fn download_attachment(
        &self,
        attachment: &QuoteAttachment,
    ) -> Result<Vec<u8>, PlatformError> {
        let download_error = |e: reqwest::Error| {
            PlatformError::Download(format!("{} ({})", attachment.filename, e))
        };

        let response = self
            .downloader
            .get(&attachment.url)
            .send()
            .await
            .map_err(download_error)?
            .error_for_status()
            .map_err(download_error)?;
        let bytes = response.bytes().await.map_err(download_error)?;
        Ok(bytes.to_vec())
    }

    async fn send_message(
        &self,
        channel: u64,
        content: &str,
        files: &[StagedAttachment],
    ) -> Result<u64, PlatformError> {
        let channel = channel_id(channel)?;

        let mut uploads = Vec::with_capacity(files.len());
        for file in files {
            let mut upload = serenity::CreateAttachment::path(file.path())
                .await
                .map_err(api_error)?;
            upload.filename = file.filename().to_string();
            uploads.push(upload);
        }

        // Quoted text must never ping anyone a second time.
        let mut builder = serenity::CreateMessage::new()
            .allowed_mentions(serenity::CreateAllowedMentions::new())
            .add_files(uploads);
        if !content.is_empty() {
            builder = builder.content(content);
        }

        let sent = channel
            .send_message(&self.http, builder)
            .await
            .map_err(api_error)?;
        Ok(sent.id.get())
    }
}
