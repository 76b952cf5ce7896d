// Text rendering for quotes.
//
// Two layouts exist:
// - single message: `"<body>"` then a bold attribution line
// - several messages ("alternate"): one `**<name>:** "<body>"` line each,
//   introduced by a separate marker message pointing at the first source

use super::quote_models::{permalink, QuoteSource};
use chrono_tz::Tz;

/// Discord rejects message content above this many characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// C `ctime` layout, e.g. `Sun Oct 19 06:43:00 2026`.
const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

pub fn format_timestamp(source: &QuoteSource, timezone: Tz) -> String {
    source
        .timestamp
        .with_timezone(&timezone)
        .format(CTIME_FORMAT)
        .to_string()
}

/// Render one message in the single-message layout.
pub fn render_single(source: &QuoteSource, timezone: Tz) -> String {
    let mut quote = String::new();
    if !source.body.is_empty() {
        quote.push_str(&format!("\"{}\"\n", source.body));
    }
    quote.push_str(&format!(
        "**- {}, {}, in <#{}>**\n",
        source.author_display_name,
        format_timestamp(source, timezone),
        source.channel_id
    ));
    quote
}

/// Render one message in the multi-message layout.
pub fn render_alternate(source: &QuoteSource) -> String {
    if source.body.is_empty() {
        format!("**{}:**\n", source.author_display_name)
    } else {
        format!("**{}:** \"{}\"\n", source.author_display_name, source.body)
    }
}

/// Render the whole batch. One source uses the single layout, anything else the
/// alternate layout.
pub fn render_quote(sources: &[QuoteSource], timezone: Tz) -> String {
    match sources {
        [only] => render_single(only, timezone),
        _ => sources.iter().map(render_alternate).collect(),
    }
}

/// Marker line sent ahead of a multi-message quote.
///
/// Fails when the source does not know its guild, since no deep link can be
/// built without it.
pub fn render_marker(source: &QuoteSource, timezone: Tz) -> Result<String, String> {
    let guild_id = source
        .guild_id
        .ok_or_else(|| format!("message {} has no guild", source.message_id))?;
    Ok(format!(
        "**{}, {}:**",
        permalink(guild_id, source.channel_id, source.message_id),
        format_timestamp(source, timezone)
    ))
}

/// Split content into pieces Discord will accept, preferring line boundaries.
pub fn split_content(content: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in content.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > max_chars {
            // A single line that cannot fit anywhere gets hard-split.
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                let piece: String = piece.iter().collect();
                if piece.chars().count() == max_chars {
                    chunks.push(piece);
                } else {
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
