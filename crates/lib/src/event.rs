//! Reader event wire model and per-event validation.
//!
//! The reader emits one JSON object per line. Only `tagInventory` events carry
//! tag sightings; everything else on the feed (heartbeats, status frames) is
//! ignored. [`classify`] applies the validation rules in order and reduces an
//! event to exactly one of three outcomes:
//!
//! - [`Classification::Ignored`]: no downstream interaction at all.
//! - [`Classification::Invalid`]: the tag is recorded as present, but the
//!   authentication payload is unusable; a negative verdict is cached and
//!   persisted without ever consulting the verifier.
//! - [`Classification::Valid`]: a complete challenge ready for verification.

use serde::Deserialize;

use crate::verifier::AuthChallenge;

/// The event type string marking a tag sighting on the feed.
pub const TAG_INVENTORY_EVENT: &str = "tagInventory";

/// One decoded line from the reader's event feed.
///
/// Fields the gateway does not consume are left undeclared and dropped during
/// deserialization.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReaderEvent {
    /// Declared event type; only [`TAG_INVENTORY_EVENT`] is processed.
    #[serde(default)]
    pub event_type: Option<String>,
    /// The inventory record, present on tag-sighting events.
    #[serde(default)]
    pub tag_inventory_event: Option<TagInventoryEvent>,
}

/// The inventory record nested in a `tagInventory` event.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagInventoryEvent {
    /// Primary tag identifier (TID memory bank).
    #[serde(default)]
    pub tid_hex: Option<String>,
    /// Product/EPC identifier correlated with the tag.
    #[serde(default)]
    pub epc_hex: Option<String>,
    /// The challenge-response exchange captured during the read cycle.
    #[serde(default)]
    pub tag_authentication_response: Option<TagAuthenticationResponse>,
}

/// The raw authentication exchange reported by the reader.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagAuthenticationResponse {
    /// Challenge message the reader sent to the tag.
    #[serde(default)]
    pub message_hex: Option<String>,
    /// The tag's response to the challenge.
    #[serde(default)]
    pub response_hex: Option<String>,
    /// Tag identifier as reported inside the exchange. May be absent; the
    /// envelope identifier is the only permitted fallback.
    #[serde(default)]
    pub tid_hex: Option<String>,
}

/// Why an event produced no downstream interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The declared event type is not a tag inventory.
    NotTagInventory,
    /// The envelope carries no usable primary tag identifier.
    MissingTagId,
}

/// Why an authentication payload is unusable.
///
/// This is a terminal classification for one event cycle, not an error: the
/// canonical reason string becomes both the cached verdict detail and the
/// persisted record detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The inventory record has no authentication sub-object.
    MissingAuthResponse,
    /// The authentication sub-object's response field is an empty string.
    EmptyResponse,
}

impl InvalidReason {
    /// The canonical human-readable reason string.
    pub fn detail(&self) -> &'static str {
        match self {
            InvalidReason::MissingAuthResponse => "missing authentication response",
            InvalidReason::EmptyResponse => "empty response",
        }
    }
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.detail())
    }
}

/// The outcome of validating one reader event. First matching rule wins.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Skip the event entirely; no registry, cache, or verifier interaction.
    Ignored(IgnoreReason),
    /// Record presence, cache and persist a negative verdict, never invoke
    /// the verifier.
    Invalid {
        tag_id: String,
        epc_hex: Option<String>,
        reason: InvalidReason,
    },
    /// Proceed to cache lookup and, on a miss, verification.
    Valid {
        tag_id: String,
        epc_hex: Option<String>,
        challenge: AuthChallenge,
    },
}

/// Classify one decoded reader event.
///
/// # Example
///
/// ```
/// use tagwatch::event::{Classification, ReaderEvent, classify};
///
/// let event: ReaderEvent = serde_json::from_str(
///     r#"{"eventType": "heartbeat"}"#,
/// ).unwrap();
/// assert!(matches!(classify(&event), Classification::Ignored(_)));
/// ```
pub fn classify(event: &ReaderEvent) -> Classification {
    if event.event_type.as_deref() != Some(TAG_INVENTORY_EVENT) {
        return Classification::Ignored(IgnoreReason::NotTagInventory);
    }

    let Some(inventory) = &event.tag_inventory_event else {
        return Classification::Ignored(IgnoreReason::MissingTagId);
    };

    let tag_id = match inventory.tid_hex.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Classification::Ignored(IgnoreReason::MissingTagId),
    };
    let epc_hex = inventory.epc_hex.clone();

    let Some(auth) = &inventory.tag_authentication_response else {
        return Classification::Invalid {
            tag_id,
            epc_hex,
            reason: InvalidReason::MissingAuthResponse,
        };
    };

    let response_hex = auth.response_hex.clone().unwrap_or_default();
    if response_hex.is_empty() {
        return Classification::Invalid {
            tag_id,
            epc_hex,
            reason: InvalidReason::EmptyResponse,
        };
    }

    // The exchange may omit its own tag id; the envelope id is the only
    // permitted substitution. A missing challenge passes through as empty.
    let challenge_tag_id = match auth.tid_hex.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => tag_id.clone(),
    };

    Classification::Valid {
        tag_id,
        epc_hex,
        challenge: AuthChallenge {
            tid_hex: challenge_tag_id,
            message_hex: auth.message_hex.clone().unwrap_or_default(),
            response_hex,
        },
    }
}
