//! Gmail REST client — implements `MailboxProvider` over the v1 users API.
//!
//! Constructed per ingestion run from the stored credential; there is no
//! process-wide mailbox client. The caller injects the access token.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::mailbox::{
    LabelChange, MailboxError, MailboxProvider, MessageHeaders, MimeNode, RawMessage,
};

const UNREAD_LABEL: &str = "UNREAD";

/// One Gmail API session scoped to a single ingestion run.
pub struct GmailClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl GmailClient {
    pub fn new(base_url: &str, access_token: String) -> Result<Self, MailboxError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/gmail/v1/users/me/{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MailboxError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::Auth(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (Gmail REST schema) — confined to this module
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListResponse {
    messages: Option<Vec<MessageRef>>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    id: String,
    label_ids: Option<Vec<String>>,
    payload: WirePart,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    filename: String,
    headers: Option<Vec<WireHeader>>,
    body: Option<WireBody>,
    parts: Option<Vec<WirePart>>,
}

#[derive(Debug, Deserialize)]
struct WireHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBody {
    data: Option<String>,
    attachment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireAttachment {
    data: Option<String>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyRequest<'a> {
    add_label_ids: &'a [String],
    remove_label_ids: &'a [String],
}

/// Gmail inlines part payloads as unpadded URL-safe base64.
fn decode_part_data(data: &str) -> Option<Vec<u8>> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| general_purpose::URL_SAFE.decode(data))
        .ok()
}

fn header_value(headers: &[WireHeader], name: &str) -> String {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
        .unwrap_or_default()
}

fn into_mime_node(part: WirePart) -> MimeNode {
    match part.parts {
        Some(children) if !children.is_empty() => MimeNode::Multipart {
            mime_type: part.mime_type,
            children: children.into_iter().map(into_mime_node).collect(),
        },
        _ => {
            let (data, attachment_id) = match part.body {
                Some(body) => (
                    body.data.as_deref().and_then(decode_part_data).map(Bytes::from),
                    body.attachment_id,
                ),
                None => (None, None),
            };
            MimeNode::Leaf {
                mime_type: part.mime_type,
                filename: (!part.filename.is_empty()).then_some(part.filename),
                data,
                attachment_id,
            }
        }
    }
}

fn into_raw_message(wire: WireMessage) -> RawMessage {
    let headers = wire.payload.headers.as_deref().unwrap_or_default();
    let headers = MessageHeaders {
        from: header_value(headers, "From"),
        subject: header_value(headers, "Subject"),
    };
    let unread = wire
        .label_ids
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|l| l == UNREAD_LABEL);
    RawMessage {
        id: wire.id,
        headers,
        payload: into_mime_node(wire.payload),
        unread,
    }
}

#[async_trait]
impl MailboxProvider for GmailClient {
    async fn list_unread(&self, query: &str) -> Result<Vec<String>, MailboxError> {
        let response: ListResponse = self
            .get_json(&self.url("messages"), &[("q", query)])
            .await?;
        let ids: Vec<String> = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.id)
            .collect();
        debug!("Listed {} candidate messages for query {query:?}", ids.len());
        Ok(ids)
    }

    async fn get_message(&self, id: &str) -> Result<RawMessage, MailboxError> {
        let wire: WireMessage = self
            .get_json(&self.url(&format!("messages/{id}")), &[("format", "full")])
            .await?;
        Ok(into_raw_message(wire))
    }

    async fn get_attachment_data(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Bytes, MailboxError> {
        let wire: WireAttachment = self
            .get_json(
                &self.url(&format!("messages/{message_id}/attachments/{attachment_id}")),
                &[],
            )
            .await?;
        let data = wire
            .data
            .as_deref()
            .and_then(decode_part_data)
            .ok_or(MailboxError::Api {
                status: 200,
                message: "attachment response carried no data".to_string(),
            })?;
        Ok(Bytes::from(data))
    }

    async fn modify_labels(
        &self,
        message_id: &str,
        change: &LabelChange,
    ) -> Result<(), MailboxError> {
        let response = self
            .http
            .post(self.url(&format!("messages/{message_id}/modify")))
            .bearer_auth(&self.access_token)
            .json(&ModifyRequest {
                add_label_ids: &change.add,
                remove_label_ids: &change.remove,
            })
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::Auth(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_part_data_urlsafe_no_pad() {
        // "hello" → aGVsbG8 (unpadded URL-safe)
        assert_eq!(decode_part_data("aGVsbG8"), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_decode_part_data_urlsafe_padded() {
        assert_eq!(decode_part_data("aGVsbG8="), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_decode_part_data_invalid() {
        assert_eq!(decode_part_data("!!not base64!!"), None);
    }

    #[test]
    fn test_single_part_message_becomes_leaf() {
        let wire: WireMessage = serde_json::from_str(
            r#"{
                "id": "m1",
                "labelIds": ["INBOX", "UNREAD"],
                "payload": {
                    "mimeType": "text/plain",
                    "filename": "",
                    "headers": [
                        {"name": "From", "value": "Jan Kowalski <jan@example.com>"},
                        {"name": "Subject", "value": "Backend Engineer Application"}
                    ],
                    "body": {"data": "aGVsbG8"}
                }
            }"#,
        )
        .unwrap();
        let msg = into_raw_message(wire);
        assert_eq!(msg.id, "m1");
        assert!(msg.unread);
        assert_eq!(msg.headers.subject, "Backend Engineer Application");
        match msg.payload {
            MimeNode::Leaf { data, filename, .. } => {
                assert_eq!(data.as_deref(), Some(b"hello".as_slice()));
                assert!(filename.is_none());
            }
            MimeNode::Multipart { .. } => panic!("expected leaf"),
        }
    }

    #[test]
    fn test_nested_multipart_preserves_attachment_reference() {
        let wire: WireMessage = serde_json::from_str(
            r#"{
                "id": "m2",
                "labelIds": [],
                "payload": {
                    "mimeType": "multipart/mixed",
                    "filename": "",
                    "headers": [{"name": "From", "value": "a@b.c"}],
                    "parts": [
                        {"mimeType": "text/plain", "filename": "", "body": {"data": "aGVsbG8"}},
                        {
                            "mimeType": "application/pdf",
                            "filename": "resume.pdf",
                            "body": {"attachmentId": "att-1"}
                        }
                    ]
                }
            }"#,
        )
        .unwrap();
        let msg = into_raw_message(wire);
        assert!(!msg.unread);
        match msg.payload {
            MimeNode::Multipart { children, .. } => {
                assert_eq!(children.len(), 2);
                match &children[1] {
                    MimeNode::Leaf {
                        filename,
                        attachment_id,
                        data,
                        ..
                    } => {
                        assert_eq!(filename.as_deref(), Some("resume.pdf"));
                        assert_eq!(attachment_id.as_deref(), Some("att-1"));
                        assert!(data.is_none());
                    }
                    MimeNode::Multipart { .. } => panic!("expected leaf"),
                }
            }
            MimeNode::Leaf { .. } => panic!("expected multipart"),
        }
    }
}
