//! Approval tokens and free-text reply classification.
//!
//! An approval requested over WhatsApp or email carries a token of the form
//! `APP-XXXXXX`. The approver answers in free text; [`parse_approval_reply`]
//! pulls the token back out and guesses the intent from keywords.
//!
//! The keyword scan is not tied to the token's position. A reply holding
//! both an approve word and a reject word is classified as approve because
//! approve keywords are checked first. That behaviour is kept as-is and
//! flagged, not resolved.

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const TOKEN_PREFIX: &str = "APP-";
const TOKEN_SUFFIX_LEN: usize = 6;
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

/// Result of scanning a reply. Both fields absent means "ignore this reply".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalReply {
    pub token: Option<String>,
    pub action: Option<ApprovalAction>,
}

impl ApprovalReply {
    /// Token and action both present.
    pub fn is_actionable(&self) -> bool {
        self.token.is_some() && self.action.is_some()
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ASCII-only case folding: lookalikes such as the Kelvin sign are not token characters.
    PATTERN
        .get_or_init(|| Regex::new(r"\b(?i-u:APP-[A-Z0-9]{6})\b").expect("valid token regex"))
}

fn approve_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(approve|approved|yes|ok|accept)\b").expect("valid approve regex")
    })
}

fn reject_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(reject|rejected|no|deny|decline)\b").expect("valid reject regex")
    })
}

/// Extract the approval token and intent from a free-text reply.
///
/// The token is returned upper-cased. Without a token there is nothing to
/// correlate, so the action is left unset as well.
pub fn parse_approval_reply(content: &str) -> ApprovalReply {
    let Some(token) = token_pattern().find(content) else {
        return ApprovalReply::default();
    };

    let action = if approve_pattern().is_match(content) {
        Some(ApprovalAction::Approve)
    } else if reject_pattern().is_match(content) {
        Some(ApprovalAction::Reject)
    } else {
        None
    };

    ApprovalReply {
        token: Some(token.as_str().to_ascii_uppercase()),
        action,
    }
}

/// Generate a fresh `APP-XXXXXX` token.
pub fn generate_approval_token() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TOKEN_SUFFIX_LEN)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", TOKEN_PREFIX, suffix)
}

/// Text sent to an approver asking them to answer with the token.
pub fn approval_request_message(
    deliverable_title: &str,
    version_number: u32,
    token: &str,
    review_url: Option<&str>,
) -> String {
    let mut message = format!(
        "*Approval needed*\n\n\"{}\" (version {}) is ready for your review.\n\n\
         Reply *APPROVE {}* to approve or *REJECT {}* to request changes.",
        deliverable_title, version_number, token, token
    );
    if let Some(url) = review_url {
        message.push_str(&format!("\n\nReview it here: {}", url));
    }
    message
}
