use crate::core::quotes::{BindingStore, GuildBinding, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;

/// One entry of `info.json`, keyed by the stringified guild id:
/// `{ "<guild_id>": { "quote_channel_id": "<channel_id>" } }`
#[derive(Debug, Serialize, Deserialize)]
struct StoredBinding {
    quote_channel_id: StoredId,
}

/// Ids are written as strings; older files carried bare numbers, so both are read.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredId {
    Text(String),
    Number(u64),
}

impl StoredId {
    fn parse(&self) -> Option<u64> {
        match self {
            StoredId::Text(text) => text.trim().parse().ok(),
            StoredId::Number(number) => Some(*number),
        }
    }
}

/// Registry persistence in a single JSON file, fully rewritten on every save.
pub struct JsonBindingStore {
    path: PathBuf,
}

impl JsonBindingStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Pretty JSON with 4-space indentation.
fn encode(bindings: &[GuildBinding]) -> Result<Vec<u8>, serde_json::Error> {
    let data: BTreeMap<String, StoredBinding> = bindings
        .iter()
        .map(|b| {
            (
                b.guild_id.to_string(),
                StoredBinding {
                    quote_channel_id: StoredId::Text(b.channel_id.to_string()),
                },
            )
        })
        .collect();

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut serializer)?;
    Ok(buf)
}

fn decode(text: &str) -> Result<Vec<GuildBinding>, serde_json::Error> {
    let data: HashMap<String, StoredBinding> = serde_json::from_str(text)?;

    Ok(data
        .into_iter()
        .filter_map(|(guild_key, entry)| {
            let guild_id = guild_key.trim().parse::<u64>().ok();
            let channel_id = entry.quote_channel_id.parse();
            match (guild_id, channel_id) {
                (Some(guild_id), Some(channel_id)) => Some(GuildBinding {
                    guild_id,
                    channel_id,
                }),
                _ => {
                    tracing::warn!(
                        guild = %guild_key,
                        entry = ?entry,
                        "Skipping malformed quote channel entry"
                    );
                    None
                }
            }
        })
        .collect())
}

#[async_trait]
impl BindingStore for JsonBindingStore {
    async fn read_bindings(&self) -> Result<Vec<GuildBinding>, StoreError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "Quote channel file does not exist");
            return Ok(Vec::new());
        }

        tracing::info!(path = %self.path.display(), "Loading quote channel file");
        let text = fs::read_to_string(&self.path).await?;
        Ok(decode(&text)?)
    }

    async fn write_bindings(&self, bindings: &[GuildBinding]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let bytes = encode(bindings)?;
        // Write beside the target and swap it in so readers never see half a file.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
