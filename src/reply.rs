//! Reply text composition.
//!
//! Model output is cleaned, a call-to-action is appended, and the result is cut
//! to the platform limit. When the model gives nothing usable a fixed fallback
//! reply is used instead.

use rand::seq::SliceRandom;
use rand::Rng;

/// Maximum reply length accepted by the platform, in characters.
pub const MAX_REPLY_CHARS: usize = 280;

pub const FALLBACK_REPLIES: &[&str] = &[
    "Just diagnosed? Don't settle for one opinion. Our AI scans your data and all treatments worldwide. DM if you want the link.",
    "Cancer's terrifying. We built an AI to help with treatment decisions. Can't launch it in the West, so we built it in Albania. DM if you want to see it.",
    "Sending love. Most people don't get the best options. AI can help, but the system blocks it. We're bypassing that. Let me know if you're curious.",
    "This is why we built our AI. It finds better paths when things feel hopeless. Can't promise a cure, but it can guide. DM if you want it.",
];

pub const CALLS_TO_ACTION: &[&str] = &[
    "Feel free to message me if you want more info.",
    "Happy to share the link if it's useful.",
    "Can send you more if you're curious.",
    "DM me if you want the link.",
];

pub const SYSTEM_INSTRUCTIONS: &str = "You are a real person on Twitter, not a bot or a brand. \
You reply to people posting about cancer, who are often scared, overwhelmed or grieving. \
A close friend of yours has cancer, and watching them struggle for clarity pushed you to build an AI tool, \
outside the U.S. in Albania, that compares a patient's records, scans and genetics against global studies, \
trials and real-world outcomes to suggest better treatment paths. It is not a miracle and you are not selling it. \
Every reply must be under 60 words and sound emotionally honest. Never use marketing language, therapy cliches, \
hashtags, links or emojis, and never mention celebrity names. If a post is about a public figure, do not express \
sympathy or treat it as a personal loss; acknowledge the topic generally and talk about why you are building the tool. \
If the post is personal, you may briefly mention your friend. Do not add a closing offer; one is appended for you.";

/// Builds the user prompt for one post.
pub fn build_prompt(post_text: &str) -> String {
    format!(
        "Tweet: \"{}\"\n\nYou're replying to someone tweeting about cancer. Read the context first. \
If it's about a public figure, do not reply with condolences; shift back to your own experience. \
If it's personal (they mention a parent, sibling, partner or themselves), reply with brief emotional honesty. \
Keep it under 60 words.",
        post_text
    )
}

/// Cleans raw model output: trims, strips wrapping quotes and removes emoji.
///
/// Returns `None` when nothing usable is left.
pub fn clean_generated(raw: &str) -> Option<String> {
    let stripped = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    let cleaned: String = remove_emojis(stripped).trim().to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Drops every character outside the Basic Multilingual Plane.
pub fn remove_emojis(text: &str) -> String {
    text.chars().filter(|c| (*c as u32) < 0x10000).collect()
}

/// Cuts `text` to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Appends the call-to-action and enforces [`MAX_REPLY_CHARS`].
pub fn compose_reply(body: &str, call_to_action: &str) -> String {
    let combined = if call_to_action.is_empty() {
        body.trim().to_string()
    } else {
        format!("{} {}", body.trim(), call_to_action)
    };
    truncate_chars(&combined, MAX_REPLY_CHARS)
}

pub fn pick_fallback<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    FALLBACK_REPLIES.choose(rng).copied().unwrap_or(FALLBACK_REPLIES[0])
}

pub fn pick_call_to_action<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    CALLS_TO_ACTION.choose(rng).copied().unwrap_or("")
}
