// The quote assembler.
//
// One invocation is a straight line: Resolve -> Render -> Deliver. Any stage
// can fail and abort the rest; the Discord layer turns the result into the
// private report for the issuer.

use super::attachment_staging::StagedAttachment;
use super::channel_selection::{parse_id, select_channel, ChannelSelector};
use super::quote_errors::{QuoteError, StoreError};
use super::quote_formatting::{render_marker, render_quote, split_content, MAX_MESSAGE_CHARS};
use super::quote_models::{ChannelSummary, QuoteReceipt, QuoteRequest, QuoteSource};
use super::quote_platform::{BindingResolver, QuotePlatform};
use super::quote_registry::{BindingStore, QuoteRegistry};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::sync::Arc;

/// Largest batch a single quote may cover (one page of channel history).
pub const MAX_QUOTE_MESSAGES: u8 = 100;
/// Discord accepts at most this many files per message.
pub const MAX_FILES_PER_MESSAGE: usize = 10;

#[derive(Debug, Clone)]
pub struct QuoteSettings {
    /// Where attachments are staged between download and re-upload.
    pub staging_dir: PathBuf,
    /// Zone used for rendered timestamps.
    pub timezone: Tz,
}

pub struct QuoteService<P, S>
where
    P: QuotePlatform + BindingResolver,
    S: BindingStore,
{
    platform: P,
    registry: Arc<QuoteRegistry<S>>,
    settings: QuoteSettings,
}

impl<P, S> QuoteService<P, S>
where
    P: QuotePlatform + BindingResolver,
    S: BindingStore,
{
    pub fn new(platform: P, registry: Arc<QuoteRegistry<S>>, settings: QuoteSettings) -> Self {
        Self {
            platform,
            registry,
            settings,
        }
    }

    /// Load persisted bindings, resolving them against the live platform.
    pub async fn reload_bindings(&self) -> Result<usize, StoreError> {
        self.registry.load(&self.platform).await
    }

    /// Resolve the target channel and make it the guild's quote channel.
    pub async fn set_channel(
        &self,
        guild_id: u64,
        invoking_channel_id: u64,
        selector: &ChannelSelector,
    ) -> Result<ChannelSummary, QuoteError> {
        let channel =
            select_channel(&self.platform, guild_id, invoking_channel_id, selector).await?;
        self.registry.set_binding(guild_id, &channel).await?;

        tracing::info!(
            guild_id,
            channel_id = channel.id,
            channel_name = %channel.name,
            "Quote channel set"
        );
        Ok(channel)
    }

    /// Republish the requested message(s) in the guild's quote channel.
    pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteReceipt, QuoteError> {
        let binding = self
            .registry
            .get_binding(request.guild_id)
            .ok_or(QuoteError::NotConfigured)?;

        let sources = self.resolve_sources(request).await?;
        if sources.iter().all(QuoteSource::is_blank) {
            return Err(QuoteError::EmptyQuote);
        }

        let content = render_quote(&sources, self.settings.timezone);
        // Dropping `staged` removes the files, whichever way we leave this function.
        let staged = self.stage_attachments(&sources).await?;

        if sources.len() > 1 {
            self.send_marker(binding.channel_id, &sources).await?;
        }

        let message_id = self
            .deliver(binding.channel_id, &content, &staged)
            .await
            .map_err(|e| {
                tracing::error!(
                    guild_id = binding.guild_id,
                    channel_id = binding.channel_id,
                    error = %e,
                    "Failed to deliver quote"
                );
                e
            })?;

        tracing::info!(
            guild_id = binding.guild_id,
            channel_id = binding.channel_id,
            message_id,
            user_id = request.user_id,
            sources = sources.len(),
            attachments = staged.len(),
            "Successfully quoted message(s)"
        );

        Ok(QuoteReceipt {
            guild_id: binding.guild_id,
            channel_id: binding.channel_id,
            message_id,
        })
    }

    async fn resolve_sources(&self, request: &QuoteRequest) -> Result<Vec<QuoteSource>, QuoteError> {
        let count = u8::try_from(request.message_count)
            .ok()
            .filter(|count| (1..=MAX_QUOTE_MESSAGES).contains(count))
            .ok_or_else(|| {
                QuoteError::Resolution(format!(
                    "message_count must be between 1 and {MAX_QUOTE_MESSAGES}"
                ))
            })?;

        let mut sources = match request.message_id.as_deref() {
            Some(raw) => {
                let message_id = parse_id(raw, "message")?;
                let first = self
                    .platform
                    .fetch_message(request.channel_id, message_id)
                    .await
                    .map_err(|e| {
                        QuoteError::Resolution(format!(
                            "failed to fetch message with id {message_id}: {e}"
                        ))
                    })?;

                let mut sources = vec![first];
                if count > 1 {
                    let following = self
                        .platform
                        .messages_after(request.channel_id, message_id, count - 1)
                        .await
                        .map_err(|e| QuoteError::Resolution(e.to_string()))?;
                    sources.extend(following.into_iter().take(usize::from(count - 1)));
                }
                sources
            }
            None => {
                let mut recent = self
                    .platform
                    .recent_messages(request.channel_id, count)
                    .await
                    .map_err(|e| QuoteError::Resolution(e.to_string()))?;
                recent.truncate(usize::from(count));
                recent.reverse();
                recent
            }
        };

        let Some(first) = sources.first() else {
            return Err(QuoteError::Resolution(
                "Failed to fetch message(s)".to_string(),
            ));
        };

        if let Some(parent) = first.reply_to {
            let parent = self
                .platform
                .fetch_message(parent.channel_id, parent.message_id)
                .await
                .map_err(|e| {
                    QuoteError::Resolution(format!(
                        "failed to fetch replied-to message {}: {e}",
                        parent.message_id
                    ))
                })?;
            sources.insert(0, parent);
        }

        Ok(sources)
    }

    async fn stage_attachments(
        &self,
        sources: &[QuoteSource],
    ) -> Result<Vec<StagedAttachment>, QuoteError> {
        let mut staged = Vec::new();

        for source in sources {
            for (index, attachment) in source.attachments.iter().enumerate() {
                let bytes = self
                    .platform
                    .download_attachment(attachment)
                    .await
                    .map_err(|e| QuoteError::Delivery(e.to_string()))?;

                let file = StagedAttachment::write(
                    &self.settings.staging_dir,
                    source.message_id,
                    index,
                    &attachment.filename,
                    &bytes,
                )
                .await
                .map_err(|e| {
                    tracing::error!(
                        message_id = source.message_id,
                        attachment_id = attachment.id,
                        error = %e,
                        "Failed to stage attachment"
                    );
                    QuoteError::Delivery(format!("could not stage {}: {e}", attachment.filename))
                })?;
                staged.push(file);
            }
        }

        Ok(staged)
    }

    /// Send the marker that introduces a multi-message quote.
    ///
    /// The first message is referenced; if that fails the second one is tried
    /// before giving up.
    async fn send_marker(&self, channel_id: u64, sources: &[QuoteSource]) -> Result<(), QuoteError> {
        let mut last_error = String::from("no message to reference");

        for (attempt, source) in sources.iter().take(2).enumerate() {
            let result = match render_marker(source, self.settings.timezone) {
                Ok(marker) => self
                    .platform
                    .send_message(channel_id, &marker, &[])
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) if attempt == 0 => {
                    tracing::error!(
                        channel_id,
                        message_id = source.message_id,
                        error = %e,
                        "Error sending marker referencing first message, trying the second"
                    );
                    last_error = e;
                }
                Err(e) => {
                    tracing::error!(
                        channel_id,
                        message_id = source.message_id,
                        error = %e,
                        "Error sending marker referencing second message"
                    );
                    last_error = e;
                }
            }
        }

        Err(QuoteError::Render(last_error))
    }

    /// Send the rendered text and every staged file, returning the id of the
    /// first body message.
    async fn deliver(
        &self,
        channel_id: u64,
        content: &str,
        files: &[StagedAttachment],
    ) -> Result<u64, QuoteError> {
        let chunks = split_content(content, MAX_MESSAGE_CHARS);
        let mut batches = files.chunks(MAX_FILES_PER_MESSAGE);
        let mut first_id = None;

        for (i, chunk) in chunks.iter().enumerate() {
            // Files ride along with the last piece of text.
            let attached: &[StagedAttachment] = if i + 1 == chunks.len() {
                batches.next().unwrap_or_default()
            } else {
                &[]
            };
            let id = self
                .platform
                .send_message(channel_id, chunk, attached)
                .await
                .map_err(|e| QuoteError::Delivery(e.to_string()))?;
            first_id.get_or_insert(id);
        }

        for batch in batches {
            let id = self
                .platform
                .send_message(channel_id, "", batch)
                .await
                .map_err(|e| QuoteError::Delivery(e.to_string()))?;
            first_id.get_or_insert(id);
        }

        first_id.ok_or_else(|| QuoteError::Delivery("nothing to send".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quotes::quote_errors::PlatformError;
    use crate::core::quotes::quote_models::{GuildBinding, MessageRef, QuoteAttachment};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    const GUILD: u64 = 1;
    const SOURCE_CHANNEL: u64 = 10;
    const QUOTE_CHANNEL: u64 = 99;
    const VOICE_CHANNEL: u64 = 77;

    #[derive(Default)]
    struct NullStore;

    #[async_trait]
    impl BindingStore for NullStore {
        async fn read_bindings(&self) -> Result<Vec<GuildBinding>, StoreError> {
            Ok(Vec::new())
        }

        async fn write_bindings(&self, _bindings: &[GuildBinding]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Sent {
        channel_id: u64,
        content: String,
        files: Vec<String>,
        files_on_disk: bool,
    }

    struct FakePlatform {
        channels: Vec<ChannelSummary>,
        messages: Vec<QuoteSource>,
        blobs: HashMap<u64, Vec<u8>>,
        fail_sends: bool,
        sent: Mutex<Vec<Sent>>,
        next_id: AtomicU64,
    }

    impl FakePlatform {
        fn new(messages: Vec<QuoteSource>) -> Self {
            Self {
                channels: vec![
                    text_channel(SOURCE_CHANNEL, GUILD, "general"),
                    text_channel(QUOTE_CHANNEL, GUILD, "best-quotes"),
                    text_channel(500, 2, "elsewhere"),
                    ChannelSummary {
                        accepts_text: false,
                        ..text_channel(VOICE_CHANNEL, GUILD, "voice-lounge")
                    },
                ],
                messages,
                blobs: HashMap::new(),
                fail_sends: false,
                sent: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(9000),
            }
        }

        fn in_channel(&self, channel_id: u64) -> Vec<QuoteSource> {
            let mut messages: Vec<QuoteSource> = self
                .messages
                .iter()
                .filter(|m| m.channel_id == channel_id)
                .cloned()
                .collect();
            messages.sort_by_key(|m| m.message_id);
            messages
        }
    }

    #[async_trait]
    impl BindingResolver for FakePlatform {
        async fn guild_exists(&self, guild_id: u64) -> bool {
            self.channels.iter().any(|c| c.guild_id == Some(guild_id))
        }

        async fn channel_exists(&self, channel_id: u64) -> bool {
            self.channels.iter().any(|c| c.id == channel_id)
        }
    }

    #[async_trait]
    impl QuotePlatform for FakePlatform {
        async fn channel(&self, channel_id: u64) -> Result<Option<ChannelSummary>, PlatformError> {
            Ok(self.channels.iter().find(|c| c.id == channel_id).cloned())
        }

        async fn text_channels(&self, guild_id: u64) -> Result<Vec<ChannelSummary>, PlatformError> {
            Ok(self
                .channels
                .iter()
                .filter(|c| c.guild_id == Some(guild_id) && c.accepts_text)
                .cloned()
                .collect())
        }

        async fn fetch_message(
            &self,
            channel_id: u64,
            message_id: u64,
        ) -> Result<QuoteSource, PlatformError> {
            self.in_channel(channel_id)
                .into_iter()
                .find(|m| m.message_id == message_id)
                .ok_or_else(|| PlatformError::NotFound(format!("message {message_id}")))
        }

        async fn messages_after(
            &self,
            channel_id: u64,
            message_id: u64,
            limit: u8,
        ) -> Result<Vec<QuoteSource>, PlatformError> {
            Ok(self
                .in_channel(channel_id)
                .into_iter()
                .filter(|m| m.message_id > message_id)
                .take(usize::from(limit))
                .collect())
        }

        async fn recent_messages(
            &self,
            channel_id: u64,
            limit: u8,
        ) -> Result<Vec<QuoteSource>, PlatformError> {
            Ok(self
                .in_channel(channel_id)
                .into_iter()
                .rev()
                .take(usize::from(limit))
                .collect())
        }

        async fn download_attachment(
            &self,
            attachment: &QuoteAttachment,
        ) -> Result<Vec<u8>, PlatformError> {
            self.blobs
                .get(&attachment.id)
                .cloned()
                .ok_or_else(|| PlatformError::Download(attachment.url.clone()))
        }

        async fn send_message(
            &self,
            channel_id: u64,
            content: &str,
            files: &[StagedAttachment],
        ) -> Result<u64, PlatformError> {
            if self.fail_sends {
                return Err(PlatformError::Http("503 Service Unavailable".to_string()));
            }
            self.sent.lock().unwrap().push(Sent {
                channel_id,
                content: content.to_string(),
                files: files.iter().map(|f| f.filename().to_string()).collect(),
                files_on_disk: files.iter().all(|f| f.path().exists()),
            });
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn text_channel(id: u64, guild_id: u64, name: &str) -> ChannelSummary {
        ChannelSummary {
            id,
            guild_id: Some(guild_id),
            name: name.to_string(),
            accepts_text: true,
        }
    }

    fn message(message_id: u64, author: &str, body: &str) -> QuoteSource {
        QuoteSource {
            guild_id: Some(GUILD),
            channel_id: SOURCE_CHANNEL,
            message_id,
            author_display_name: author.to_string(),
            body: body.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
                + Duration::minutes(message_id as i64 % 60),
            attachments: Vec::new(),
            reply_to: None,
        }
    }

    fn attachment(id: u64, filename: &str) -> QuoteAttachment {
        QuoteAttachment {
            id,
            filename: filename.to_string(),
            url: format!("https://cdn.example/{id}/{filename}"),
        }
    }

    fn conversation() -> Vec<QuoteSource> {
        vec![
            message(101, "Ana", "first"),
            message(102, "Bo", "second"),
            message(103, "Cy", "third"),
            message(104, "Ana", "fourth"),
        ]
    }

    fn service(
        platform: FakePlatform,
        staging_dir: &Path,
    ) -> QuoteService<FakePlatform, NullStore> {
        QuoteService::new(
            platform,
            Arc::new(QuoteRegistry::new(NullStore)),
            QuoteSettings {
                staging_dir: staging_dir.to_path_buf(),
                timezone: chrono_tz::UTC,
            },
        )
    }

    async fn bound_service(
        platform: FakePlatform,
        staging_dir: &Path,
    ) -> QuoteService<FakePlatform, NullStore> {
        let service = service(platform, staging_dir);
        service
            .set_channel(
                GUILD,
                SOURCE_CHANNEL,
                &ChannelSelector::Id(QUOTE_CHANNEL.to_string()),
            )
            .await
            .unwrap();
        service
    }

    fn request(message_id: Option<&str>, message_count: u32) -> QuoteRequest {
        QuoteRequest {
            guild_id: GUILD,
            channel_id: SOURCE_CHANNEL,
            user_id: 77,
            message_id: message_id.map(str::to_string),
            message_count,
        }
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_quote_without_binding_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(FakePlatform::new(conversation()), dir.path());

        let result = service.quote(&request(None, 1)).await;

        assert!(matches!(result, Err(QuoteError::NotConfigured)));
        assert!(service.platform.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quote_latest_message_uses_single_format() {
        let dir = tempfile::tempdir().unwrap();
        let service = bound_service(FakePlatform::new(conversation()), dir.path()).await;

        let receipt = service.quote(&request(None, 1)).await.unwrap();

        let sent = service.platform.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel_id, QUOTE_CHANNEL);
        assert_eq!(
            sent[0].content,
            "\"fourth\"\n**- Ana, Tue Jan  2 03:48:05 2024, in <#10>**\n"
        );
        assert_eq!(receipt.channel_id, QUOTE_CHANNEL);
        assert_eq!(receipt.guild_id, GUILD);
        assert_eq!(
            receipt.permalink(),
            format!("https://discord.com/channels/1/99/{}", receipt.message_id)
        );
    }

    #[tokio::test]
    async fn test_quote_latest_three_in_chronological_order_with_marker() {
        let dir = tempfile::tempdir().unwrap();
        let service = bound_service(FakePlatform::new(conversation()), dir.path()).await;

        let receipt = service.quote(&request(None, 3)).await.unwrap();

        let sent = service.platform.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0].content,
            "**https://discord.com/channels/1/10/102, Tue Jan  2 03:46:05 2024:**"
        );
        assert_eq!(
            sent[1].content,
            "**Bo:** \"second\"\n**Cy:** \"third\"\n**Ana:** \"fourth\"\n"
        );
        // The deep link points at the quote itself, not the marker.
        assert_eq!(receipt.message_id, 9001);
    }

    #[tokio::test]
    async fn test_marker_falls_back_to_second_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut messages = conversation();
        messages[1].guild_id = None;
        let service = bound_service(FakePlatform::new(messages), dir.path()).await;

        service.quote(&request(None, 3)).await.unwrap();

        let sent = service.platform.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0]
            .content
            .starts_with("**https://discord.com/channels/1/10/103,"));
    }

    #[tokio::test]
    async fn test_marker_failure_aborts_before_quote() {
        let dir = tempfile::tempdir().unwrap();
        let mut messages = conversation();
        messages[2].guild_id = None;
        messages[3].guild_id = None;
        let service = bound_service(FakePlatform::new(messages), dir.path()).await;

        let result = service.quote(&request(None, 2)).await;

        assert!(matches!(result, Err(QuoteError::Render(_))));
        assert!(service.platform.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quote_explicit_id_with_following_messages() {
        let dir = tempfile::tempdir().unwrap();
        let service = bound_service(FakePlatform::new(conversation()), dir.path()).await;

        service.quote(&request(Some("102"), 2)).await.unwrap();

        let sent = service.platform.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].content, "**Bo:** \"second\"\n**Cy:** \"third\"\n");
    }

    #[tokio::test]
    async fn test_quote_explicit_id_near_end_of_history() {
        let dir = tempfile::tempdir().unwrap();
        let service = bound_service(FakePlatform::new(conversation()), dir.path()).await;

        service.quote(&request(Some("103"), 5)).await.unwrap();

        let sent = service.platform.sent.lock().unwrap();
        assert_eq!(sent[1].content, "**Cy:** \"third\"\n**Ana:** \"fourth\"\n");
    }

    #[tokio::test]
    async fn test_quote_unknown_or_malformed_id_is_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = bound_service(FakePlatform::new(conversation()), dir.path()).await;

        let missing = service.quote(&request(Some("555"), 1)).await;
        assert!(matches!(missing, Err(QuoteError::Resolution(_))));

        let malformed = service.quote(&request(Some("not-an-id"), 1)).await;
        assert!(matches!(malformed, Err(QuoteError::Resolution(_))));

        assert!(service.platform.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quote_count_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let service = bound_service(FakePlatform::new(conversation()), dir.path()).await;

        for count in [0, 101, 1_000] {
            let result = service.quote(&request(None, count)).await;
            assert!(matches!(result, Err(QuoteError::Resolution(_))));
        }
    }

    #[tokio::test]
    async fn test_quote_empty_channel() {
        let dir = tempfile::tempdir().unwrap();
        let service = bound_service(FakePlatform::new(Vec::new()), dir.path()).await;

        let result = service.quote(&request(None, 1)).await;
        assert!(matches!(result, Err(QuoteError::Resolution(_))));
    }

    #[tokio::test]
    async fn test_reply_parent_is_prepended() {
        let dir = tempfile::tempdir().unwrap();
        let mut messages = conversation();
        messages[3].reply_to = Some(MessageRef {
            channel_id: SOURCE_CHANNEL,
            message_id: 101,
        });
        let service = bound_service(FakePlatform::new(messages), dir.path()).await;

        service.quote(&request(None, 1)).await.unwrap();

        let sent = service.platform.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0]
            .content
            .starts_with("**https://discord.com/channels/1/10/101,"));
        assert_eq!(sent[1].content, "**Ana:** \"first\"\n**Ana:** \"fourth\"\n");
    }

    #[tokio::test]
    async fn test_empty_message_is_empty_quote() {
        let dir = tempfile::tempdir().unwrap();
        let service =
            bound_service(FakePlatform::new(vec![message(101, "Ana", "")]), dir.path()).await;

        let result = service.quote(&request(None, 1)).await;

        assert!(matches!(result, Err(QuoteError::EmptyQuote)));
        assert!(service.platform.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attachments_are_uploaded_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut picture = message(101, "Ana", "");
        picture.attachments = vec![attachment(1, "cat.png"), attachment(2, "dog.jpg")];
        let mut platform = FakePlatform::new(vec![picture]);
        platform.blobs.insert(1, b"cat".to_vec());
        platform.blobs.insert(2, b"dog".to_vec());
        let service = bound_service(platform, dir.path()).await;

        service.quote(&request(None, 1)).await.unwrap();

        let sent = service.platform.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].files, vec!["cat.png", "dog.jpg"]);
        assert!(sent[0].files_on_disk);
        // Blank body still gets the attribution line.
        assert!(sent[0].content.starts_with("**- Ana,"));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_attachments_cleaned_up_when_send_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut picture = message(101, "Ana", "look");
        picture.attachments = vec![attachment(1, "cat.png")];
        let mut platform = FakePlatform::new(vec![picture]);
        platform.blobs.insert(1, b"cat".to_vec());
        platform.fail_sends = true;
        let service = bound_service(platform, dir.path()).await;

        let result = service.quote(&request(None, 1)).await;

        assert!(matches!(result, Err(QuoteError::Delivery(_))));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_attachments_cleaned_up_when_download_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut picture = message(101, "Ana", "look");
        picture.attachments = vec![attachment(1, "cat.png"), attachment(2, "gone.png")];
        let mut platform = FakePlatform::new(vec![picture]);
        platform.blobs.insert(1, b"cat".to_vec());
        let service = bound_service(platform, dir.path()).await;

        let result = service.quote(&request(None, 1)).await;

        assert!(matches!(result, Err(QuoteError::Delivery(_))));
        assert!(service.platform.sent.lock().unwrap().is_empty());
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_many_attachments_are_batched() {
        let dir = tempfile::tempdir().unwrap();
        let mut album = message(101, "Ana", "album");
        let mut platform = FakePlatform::new(Vec::new());
        for id in 1..=12 {
            album.attachments.push(attachment(id, &format!("{id}.png")));
            platform.blobs.insert(id, vec![id as u8]);
        }
        platform.messages.push(album);
        let service = bound_service(platform, dir.path()).await;

        let receipt = service.quote(&request(None, 1)).await.unwrap();

        let sent = service.platform.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].files.len(), MAX_FILES_PER_MESSAGE);
        assert!(sent[0].content.starts_with("\"album\""));
        assert_eq!(sent[1].files, vec!["11.png", "12.png"]);
        assert_eq!(sent[1].content, "");
        assert_eq!(receipt.message_id, 9000);
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_set_channel_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(FakePlatform::new(Vec::new()), dir.path());

        let channel = service
            .set_channel(GUILD, SOURCE_CHANNEL, &ChannelSelector::Name("Best Quotes".into()))
            .await
            .unwrap();

        assert_eq!(channel.id, QUOTE_CHANNEL);
        assert_eq!(service.registry.get_binding(GUILD).unwrap().channel_id, QUOTE_CHANNEL);
    }

    #[tokio::test]
    async fn test_set_channel_defaults_to_invoking_channel() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(FakePlatform::new(Vec::new()), dir.path());

        let channel = service
            .set_channel(GUILD, SOURCE_CHANNEL, &ChannelSelector::Invoking)
            .await
            .unwrap();

        assert_eq!(channel.name, "general");
        assert_eq!(service.registry.get_binding(GUILD).unwrap().channel_id, SOURCE_CHANNEL);
    }

    #[tokio::test]
    async fn test_set_channel_rejects_bad_targets() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(FakePlatform::new(Vec::new()), dir.path());

        let selectors = [
            ChannelSelector::Name("no such channel".into()),
            ChannelSelector::Id("12345".into()),
            ChannelSelector::Id("twelve".into()),
            // Exists, but in another guild.
            ChannelSelector::Id("500".into()),
            // Exists, but nothing can be posted there.
            ChannelSelector::Id(VOICE_CHANNEL.to_string()),
            ChannelSelector::Name("voice lounge".into()),
        ];
        for selector in &selectors {
            let result = service.set_channel(GUILD, SOURCE_CHANNEL, selector).await;
            assert!(
                matches!(result, Err(QuoteError::Resolution(_))),
                "{selector:?} should not resolve"
            );
        }
        assert!(service.registry.get_binding(GUILD).is_none());
    }

    #[tokio::test]
    async fn test_set_channel_from_voice_channel_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(FakePlatform::new(Vec::new()), dir.path());

        let result = service
            .set_channel(GUILD, VOICE_CHANNEL, &ChannelSelector::Invoking)
            .await;

        assert!(matches!(result, Err(QuoteError::Resolution(_))));
        assert!(service.registry.get_binding(GUILD).is_none());
    }
}
