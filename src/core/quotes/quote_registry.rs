// The quote-channel registry: guild id -> quote channel.
//
// Bindings live in a key-indexed map so "one binding per guild" holds by
// construction. Every mutation rewrites the whole store, and memory only
// changes once that write has succeeded.

use super::quote_errors::StoreError;
use super::quote_models::{ChannelSummary, GuildBinding};
use super::quote_platform::BindingResolver;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Persistence port for the registry.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Every binding on record. A missing backing file is an empty list, not an error.
    async fn read_bindings(&self) -> Result<Vec<GuildBinding>, StoreError>;

    /// Replace the stored set with `bindings`.
    async fn write_bindings(&self, bindings: &[GuildBinding]) -> Result<(), StoreError>;
}

pub struct QuoteRegistry<S: BindingStore> {
    store: S,
    bindings: DashMap<u64, GuildBinding>,
    /// Stored entries that did not resolve at load time. They stay in the
    /// store until they resolve or the guild is bound again.
    unresolved: DashMap<u64, GuildBinding>,
    /// Serializes writes so concurrent saves cannot drop each other's binding.
    write_lock: Mutex<()>,
}

impl<S: BindingStore> QuoteRegistry<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            bindings: DashMap::new(),
            unresolved: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Restore bindings from the store, checking each against the live platform.
    ///
    /// Guilds already known in memory are skipped, so loading twice is harmless.
    /// An entry whose guild or channel cannot be resolved is logged and left
    /// inactive without affecting the others; it is retried on the next load.
    /// Returns how many bindings were added.
    pub async fn load<R>(&self, resolver: &R) -> Result<usize, StoreError>
    where
        R: BindingResolver + ?Sized,
    {
        let stored = self.store.read_bindings().await?;
        let mut added = 0;

        for binding in stored {
            if self.bindings.contains_key(&binding.guild_id) {
                continue;
            }

            if !resolver.guild_exists(binding.guild_id).await {
                tracing::warn!(
                    guild_id = binding.guild_id,
                    channel_id = binding.channel_id,
                    "Skipping stored quote channel: guild not found"
                );
                self.unresolved.insert(binding.guild_id, binding);
                continue;
            }

            if !resolver.channel_exists(binding.channel_id).await {
                tracing::warn!(
                    guild_id = binding.guild_id,
                    channel_id = binding.channel_id,
                    "Skipping stored quote channel: channel not found"
                );
                self.unresolved.insert(binding.guild_id, binding);
                continue;
            }

            tracing::info!(
                guild_id = binding.guild_id,
                channel_id = binding.channel_id,
                "Loaded quote channel"
            );
            self.unresolved.remove(&binding.guild_id);
            // A concurrent set_binding may have landed while we were resolving;
            // the fresher in-memory value wins.
            if self.bindings.entry(binding.guild_id).or_insert(binding).value() == &binding {
                added += 1;
            }
        }

        Ok(added)
    }

    pub fn get_binding(&self, guild_id: u64) -> Option<GuildBinding> {
        self.bindings.get(&guild_id).map(|entry| *entry.value())
    }

    /// Bind `channel` as the quote channel of `guild_id` and persist everything.
    ///
    /// If the store rejects the write, the previous binding stays in effect.
    pub async fn set_binding(
        &self,
        guild_id: u64,
        channel: &ChannelSummary,
    ) -> Result<GuildBinding, StoreError> {
        let binding = GuildBinding {
            guild_id,
            channel_id: channel.id,
        };

        let _guard = self.write_lock.lock().await;
        self.persist(binding).await?;
        self.bindings.insert(guild_id, binding);
        self.unresolved.remove(&guild_id);
        Ok(binding)
    }

    /// Current bindings ordered by guild id.
    pub fn snapshot(&self) -> Vec<GuildBinding> {
        let mut bindings: Vec<GuildBinding> =
            self.bindings.iter().map(|entry| *entry.value()).collect();
        bindings.sort_by_key(|b| b.guild_id);
        bindings
    }

    /// Write the live bindings plus `change`, keeping unresolved entries.
    async fn persist(&self, change: GuildBinding) -> Result<(), StoreError> {
        let mut merged: BTreeMap<u64, GuildBinding> = self
            .unresolved
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        merged.extend(self.bindings.iter().map(|entry| (*entry.key(), *entry.value())));
        merged.insert(change.guild_id, change);

        let records: Vec<GuildBinding> = merged.into_values().collect();
        tracing::info!(
            bindings = records.len(),
            unresolved = self.unresolved.len(),
            "Writing quote channel registry"
        );
        self.store.write_bindings(&records).await
    }
}
