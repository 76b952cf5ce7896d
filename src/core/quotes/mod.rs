pub mod attachment_staging;
pub mod channel_selection;
pub mod quote_errors;
pub mod quote_formatting;
pub mod quote_models;
pub mod quote_platform;
pub mod quote_registry;
pub mod quote_service;

pub use attachment_staging::StagedAttachment;
pub use channel_selection::ChannelSelector;
pub use quote_errors::{PlatformError, QuoteError, StoreError};
pub use quote_models::{
    ChannelSummary, GuildBinding, MessageRef, QuoteAttachment, QuoteRequest, QuoteSource,
};
pub use quote_platform::{BindingResolver, QuotePlatform};
pub use quote_registry::{BindingStore, QuoteRegistry};
pub use quote_service::{QuoteService, QuoteSettings};
