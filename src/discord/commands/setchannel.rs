use crate::core::quotes::ChannelSelector;
use crate::discord::{Context, Error};

/// Set a quote channel for a guild.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_CHANNELS"
)]
pub async fn setchannel(
    ctx: Context<'_>,
    #[description = "Name of the quote channel."] channel_name: Option<String>,
    #[description = "ID of the quote channel."] channel_id: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let invoking_channel_id = ctx.channel_id().get();
    let selector = ChannelSelector::from_options(channel_name, channel_id);

    tracing::info!(guild_id, selector = ?selector, "Setting quote channel");

    let reply = match ctx
        .data()
        .quotes
        .set_channel(guild_id, invoking_channel_id, &selector)
        .await
    {
        Ok(channel) => format!(
            "Successfully set quote channel for this guild to <#{}>.",
            channel.id
        ),
        Err(e) => {
            tracing::error!(
                guild_id,
                channel_id = invoking_channel_id,
                selector = ?selector,
                error = %e,
                "Failed to set channel"
            );
            format!("Failed to set channel: {e}")
        }
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}
