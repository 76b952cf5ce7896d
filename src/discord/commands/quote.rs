// Discord command for quoting messages.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result
//
// This layer is THIN - no business logic, just translation.

use crate::core::quotes::{QuoteError, QuoteRequest, QuoteService};
use crate::discord::platform::SerenityQuotePlatform;
use crate::infra::quotes::JsonBindingStore;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
pub struct Data {
    pub quotes: Arc<QuoteService<SerenityQuotePlatform, JsonBindingStore>>,
}

/// Quote the most recent or a specific Discord message.
#[poise::command(slash_command, guild_only)]
pub async fn quote(
    ctx: Context<'_>,
    #[description = "Number of messages to quote (default 1). With message_id: that one plus the next n-1."]
    #[min = 1]
    #[max = 100]
    message_count: Option<u32>,
    #[description = "Discord message id to quote."] message_id: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command only works in servers")?
        .get();
    let channel_id = ctx.channel_id().get();
    let user_id = ctx.author().id.get();

    ctx.defer_ephemeral().await?;

    let request = QuoteRequest {
        guild_id,
        channel_id,
        user_id,
        message_id,
        message_count: message_count.unwrap_or(1),
    };

    let reply = match ctx.data().quotes.quote(&request).await {
        Ok(receipt) => format!("Quote successfully added! {}", receipt.permalink()),
        Err(e @ QuoteError::NotConfigured) => {
            tracing::warn!(guild_id, channel_id, user_id, "Quote requested without a quote channel");
            e.to_string()
        }
        Err(QuoteError::EmptyQuote) => {
            tracing::warn!(guild_id, channel_id, user_id, message_id = ?request.message_id, "Empty quote");
            "Empty quote.".to_string()
        }
        Err(e) => {
            tracing::error!(
                guild_id,
                channel_id,
                user_id,
                message_id = ?request.message_id,
                message_count = request.message_count,
                error = %e,
                "Failed to quote message(s)"
            );
            format!("Failed to quote message(s): {e}.")
        }
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}
