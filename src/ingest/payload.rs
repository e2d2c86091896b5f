//! Raw webhook payload.

use serde::Deserialize;

use crate::reading::is_field_safe;

/// The untrusted input of one webhook call.
///
/// Every field is optional from the transport's point of view. Field names
/// follow the SMS gateway's form encoding (`MessageSid`, `From`, `Body`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawPayload {
    #[serde(rename = "MessageSid", default)]
    pub message_id: Option<String>,
    #[serde(rename = "From", default)]
    pub from_address: Option<String>,
    #[serde(rename = "Body", default)]
    pub body: Option<String>,
}

impl RawPayload {
    /// Build a payload from already-extracted fields.
    pub fn new(
        message_id: impl Into<String>,
        from_address: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            message_id: Some(message_id.into()),
            from_address: Some(from_address.into()),
            body: Some(body.into()),
        }
    }

    /// Decode an `application/x-www-form-urlencoded` request body.
    ///
    /// An undecodable body yields an empty payload, which ingestion treats as
    /// having every field missing.
    pub fn from_form(bytes: &[u8]) -> Self {
        serde_urlencoded::from_bytes(bytes).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Undecodable webhook body");
            Self::default()
        })
    }

    /// Split into `(message_id, from_address, body)` when all three are usable.
    ///
    /// Identity fields containing the field delimiter or a line break would
    /// shift columns or split the stored line, so they count as missing.
    pub(crate) fn into_parts(self) -> Option<(String, String, String)> {
        let message_id = self.message_id.filter(|id| is_field_safe(id))?;
        let from_address = self.from_address.filter(|from| is_field_safe(from))?;
        Some((message_id, from_address, self.body?))
    }
}
