//! Illustration augmentation: optionally attach one generated image per
//! topic.
//!
//! Every topic's request is independent — one topic's failure never affects
//! its siblings — and all requests are issued as a fan-out joined before the
//! lesson proceeds. `join_all` returns results in the order the futures
//! were created, so the topic sequence is preserved regardless of which
//! request finished first.
//!
//! A missing image is a *normal* outcome, not an error: when the service
//! returns nothing, hits its quota, or fails outright, the topic simply
//! proceeds without an image and no placeholder is substituted.

use crate::backend::GenerativeBackend;
use crate::material::Topic;
use crate::prompts::illustration_prompt;
use futures::future::join_all;
use tracing::{debug, warn};

/// Bound on the topic-title excerpt embedded in the illustration prompt,
/// keeping the request under downstream prompt-size limits.
pub const MAX_TITLE_PROMPT_CHARS: usize = 200;

/// Attach illustrations to every topic, preserving order.
///
/// When `enabled` is false no network call is made and every topic is
/// returned untouched.
pub async fn augment_with_illustrations<B: GenerativeBackend>(
    backend: &B,
    topics: Vec<Topic>,
    enabled: bool,
) -> Vec<Topic> {
    if !enabled {
        debug!(
            topic_count = topics.len(),
            "illustrations disabled; skipping image generation"
        );
        return topics;
    }

    join_all(
        topics
            .into_iter()
            .map(|topic| illustrate_topic(backend, topic)),
    )
    .await
}

/// Request one illustration for a single topic. Stateless per call: the
/// prompt derives deterministically from the topic title alone.
async fn illustrate_topic<B: GenerativeBackend>(backend: &B, mut topic: Topic) -> Topic {
    let prompt = illustration_prompt(truncate_chars(&topic.title, MAX_TITLE_PROMPT_CHARS));

    match backend.generate_image(&prompt).await {
        Ok(Some(image)) => {
            debug!(topic = topic.title, "illustration attached");
            topic.image = Some(image);
        }
        Ok(None) => {
            warn!(
                topic = topic.title,
                "no illustration produced; topic proceeds without an image"
            );
        }
        Err(e) => {
            let detail = e.to_string();
            if looks_like_quota_error(&detail) {
                warn!(
                    topic = topic.title,
                    detail, "illustration skipped: quota/rate limit"
                );
            } else {
                warn!(topic = topic.title, detail, "illustration request failed");
            }
        }
    }

    topic
}

/// `429` / `RESOURCE_EXHAUSTED` / quota failures are expected under load
/// and logged at a calmer level than genuine transport errors.
fn looks_like_quota_error(detail: &str) -> bool {
    let upper = detail.to_uppercase();
    detail.contains("429") || upper.contains("RESOURCE_EXHAUSTED") || upper.contains("QUOTA")
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
