// This is the entry point of the quote bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (storage)
// - `discord/` = Discord-specific adapters (commands, serenity platform)
//
// This file's job is to:
// 1. Load configuration and set up logging
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::quotes::{QuoteRegistry, QuoteService, QuoteSettings};
use crate::discord::commands::presence;
use crate::discord::platform::SerenityQuotePlatform;
use crate::discord::{Data, Error};
use crate::infra::quotes::JsonBindingStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

/// Event handler for non-command Discord events.
async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::CacheReady { guilds } = event {
        // Every guild is in the cache now, so bindings that failed to resolve
        // during setup get a second chance. Known guilds are skipped.
        match data.quotes.reload_bindings().await {
            Ok(added) => tracing::info!(
                guilds = guilds.len(),
                added,
                "Quote channels reloaded after cache became ready"
            ),
            Err(e) => tracing::error!("Failed to reload quote channels: {}", e),
        }
    }

    Ok(())
}

/// Log to stdout and to the configured log file. The returned guard must stay
/// alive for the file writer to flush.
fn init_logging(config: &BotConfig) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env().context("Invalid configuration")?;

    // Initialize logging so we can see what's happening
    let _log_guard = init_logging(&config)?;

    std::fs::create_dir_all(&config.attachment_dir).with_context(|| {
        format!(
            "Failed to create attachment staging directory {}",
            config.attachment_dir.display()
        )
    })?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // The registry can be built now; the quote service needs serenity's HTTP
    // client and cache, which only exist once the framework is set up.

    let registry = Arc::new(QuoteRegistry::new(JsonBindingStore::new(&config.info_file)));
    let settings = QuoteSettings {
        staging_dir: config.attachment_dir.clone(),
        timezone: config.timezone,
    };

    tracing::info!(
        info_file = %config.info_file.display(),
        attachment_dir = %config.attachment_dir.display(),
        timezone = %config.timezone,
        "Configuration loaded"
    );

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::quote::quote(),
                discord::commands::setchannel::setchannel(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, "Connected to Discord");

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                presence::on_ready(ctx);

                let platform = SerenityQuotePlatform::new(ctx.http.clone(), ctx.cache.clone());
                let quotes = Arc::new(QuoteService::new(platform, registry, settings));

                match quotes.reload_bindings().await {
                    Ok(added) => tracing::info!(added, "Quote channels loaded"),
                    Err(e) => tracing::error!("Failed to load quote channels: {}", e),
                }

                Ok(Data { quotes })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
