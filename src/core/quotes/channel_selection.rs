use super::quote_errors::{PlatformError, QuoteError};
use super::quote_models::ChannelSummary;
use super::quote_platform::QuotePlatform;

/// How the set-channel command picks its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelector {
    /// A channel name as typed by the user, matched against the guild's text channels.
    Name(String),
    /// A raw channel id as typed by the user.
    Id(String),
    /// The channel the command was issued in.
    Invoking,
}

impl ChannelSelector {
    /// Build a selector from the optional command arguments. A name wins over an id;
    /// blank strings count as absent.
    pub fn from_options(channel_name: Option<String>, channel_id: Option<String>) -> Self {
        let present = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(name) = present(channel_name) {
            ChannelSelector::Name(name)
        } else if let Some(id) = present(channel_id) {
            ChannelSelector::Id(id)
        } else {
            ChannelSelector::Invoking
        }
    }
}

/// Discord channel names are lowercase with hyphens instead of spaces.
pub fn normalize_channel_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

pub fn parse_id(raw: &str, what: &str) -> Result<u64, QuoteError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| QuoteError::Resolution(format!("`{raw}` is not a valid {what} id")))
}

/// Resolve a selector to a concrete channel in `guild_id`.
pub async fn select_channel<P>(
    platform: &P,
    guild_id: u64,
    invoking_channel_id: u64,
    selector: &ChannelSelector,
) -> Result<ChannelSummary, QuoteError>
where
    P: QuotePlatform + ?Sized,
{
    match selector {
        ChannelSelector::Name(name) => {
            let wanted = normalize_channel_name(name);
            let channels = platform
                .text_channels(guild_id)
                .await
                .map_err(|e| QuoteError::Resolution(e.to_string()))?;
            channels
                .into_iter()
                .find(|channel| channel.name.to_lowercase() == wanted)
                .ok_or_else(|| {
                    QuoteError::Resolution(format!(
                        "No text channel found with provided channel name `{wanted}`"
                    ))
                })
        }
        ChannelSelector::Id(raw) => {
            let channel_id = parse_id(raw, "channel")?;
            let channel = lookup(platform, channel_id).await?.ok_or_else(|| {
                QuoteError::Resolution(format!(
                    "No text channel found with provided channel id `{channel_id}`"
                ))
            })?;
            if channel.guild_id != Some(guild_id) {
                return Err(QuoteError::Resolution(format!(
                    "Channel `{channel_id}` does not belong to this server"
                )));
            }
            require_text(channel)
        }
        ChannelSelector::Invoking => {
            let channel = lookup(platform, invoking_channel_id)
                .await?
                .ok_or_else(|| QuoteError::Resolution("Could not resolve this channel".to_string()))?;
            require_text(channel)
        }
    }
}

fn require_text(channel: ChannelSummary) -> Result<ChannelSummary, QuoteError> {
    if channel.accepts_text {
        Ok(channel)
    } else {
        Err(QuoteError::Resolution(format!(
            "<#{}> is not a text channel",
            channel.id
        )))
    }
}

async fn lookup<P>(platform: &P, channel_id: u64) -> Result<Option<ChannelSummary>, QuoteError>
where
    P: QuotePlatform + ?Sized,
{
    match platform.channel(channel_id).await {
        Ok(channel) => Ok(channel),
        Err(PlatformError::NotFound(_)) => Ok(None),
        Err(e) => Err(QuoteError::Resolution(e.to_string())),
    }
}
