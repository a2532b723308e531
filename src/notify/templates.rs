use std::time::Duration;

use crate::models::FulfillmentResult;

pub fn render_fulfilled(target_id: &str, result: &FulfillmentResult) -> String {
    format!(
        "✅ *Request Processed Successfully*\n\n\
         👤 Player: {name}\n\
         🆔 UID: `{target}`\n\
         🎖️ Level: {level}\n\
         📊 Likes Before: {before}\n\
         📈 Likes Added: {added}\n\
         🗿 Total Likes Now: {after}\n\
         ⏰ Processed At: {processed_at}",
        name = escape_markdown(&result.name),
        target = strip_backticks(target_id),
        level = result.level,
        before = result.likes_before,
        added = result.likes_added,
        after = result.likes_after,
        processed_at = escape_markdown(&result.processed_at),
    )
}

/// Plain text; the link must not pass through Markdown parsing.
pub fn render_request(requester_name: &str, target_id: &str, link: &str, ttl: Duration) -> String {
    format!(
        "Like Request\n\
         👤 From: {requester_name}\n\
         🆔 UID: {target_id}\n\
         ⚠️ Verify within {minutes} minutes\n\n\
         Open this link to verify and send the like:\n{link}",
        minutes = ttl.as_secs().div_ceil(60),
    )
}

pub fn render_usage() -> String {
    "Usage: /like <uid>".to_string()
}

pub fn render_not_allowed() -> String {
    "🚫 You are not allowed to use this command.".to_string()
}

/// Escape the characters legacy Telegram Markdown treats as entity markers.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn strip_backticks(text: &str) -> String {
    text.replace('`', "")
}
