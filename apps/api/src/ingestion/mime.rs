//! MIME walking — turns a `RawMessage` body tree into plain-text body and a
//! flat attachment list, resolving remotely-referenced attachment content.

use bytes::Bytes;
use tracing::warn;

use crate::mailbox::{MailboxProvider, MimeNode, RawMessage};

/// An attachment lifted out of the body tree. `data` is None when the part
/// referenced remote content and the fetch failed — the walk never aborts on
/// a missing attachment.
#[derive(Debug, Clone)]
pub struct ExtractedAttachment {
    pub filename: String,
    pub mime_type: String,
    pub data: Option<Bytes>,
}

/// Everything the pipeline needs from one message.
#[derive(Debug, Clone)]
pub struct ParsedEmail {
    pub subject: String,
    pub applicant_email: String,
    pub applicant_name: Option<String>,
    pub body_text: String,
    pub attachments: Vec<ExtractedAttachment>,
}

/// Walks the body tree of `msg`: concatenates `text/plain` leaves depth-first
/// into the body, collects named leaves as attachments, and resolves
/// attachment content referenced by id with one provider round-trip each.
pub async fn parse_message(mailbox: &dyn MailboxProvider, msg: &RawMessage) -> ParsedEmail {
    let mut body_text = String::new();
    let mut pending = Vec::new();
    walk(&msg.payload, &mut body_text, &mut pending);

    let mut attachments = Vec::with_capacity(pending.len());
    for part in pending {
        let data = match (part.data, part.attachment_id) {
            (Some(data), _) => Some(data),
            (None, Some(attachment_id)) => {
                match mailbox.get_attachment_data(&msg.id, &attachment_id).await {
                    Ok(data) => Some(data),
                    Err(e) => {
                        warn!(
                            "Attachment fetch failed for message {} part {attachment_id}: {e}",
                            msg.id
                        );
                        None
                    }
                }
            }
            (None, None) => None,
        };
        attachments.push(ExtractedAttachment {
            filename: part.filename,
            mime_type: part.mime_type,
            data,
        });
    }

    ParsedEmail {
        subject: msg.headers.subject.clone(),
        applicant_email: extract_email(&msg.headers.from),
        applicant_name: extract_name(&msg.headers.from),
        body_text,
        attachments,
    }
}

struct PendingAttachment {
    filename: String,
    mime_type: String,
    data: Option<Bytes>,
    attachment_id: Option<String>,
}

fn walk(node: &MimeNode, body: &mut String, attachments: &mut Vec<PendingAttachment>) {
    match node {
        MimeNode::Leaf {
            mime_type,
            filename,
            data,
            attachment_id,
        } => match filename {
            Some(filename) => attachments.push(PendingAttachment {
                filename: filename.clone(),
                mime_type: mime_type.clone(),
                data: data.clone(),
                attachment_id: attachment_id.clone(),
            }),
            None => {
                if mime_type.eq_ignore_ascii_case("text/plain") {
                    if let Some(data) = data {
                        body.push_str(&String::from_utf8_lossy(data));
                    }
                }
            }
        },
        MimeNode::Multipart { children, .. } => {
            for child in children {
                walk(child, body, attachments);
            }
        }
    }
}

/// Pulls the address out of `"Jane Doe" <jane@example.com>` or returns the
/// header verbatim when there are no angle brackets.
pub fn extract_email(from: &str) -> String {
    match (from.rfind('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => from[start + 1..end].trim().to_string(),
        _ => from.trim().to_string(),
    }
}

/// Pulls the display name, falling back to the address local part.
pub fn extract_name(from: &str) -> Option<String> {
    if let Some(start) = from.find('<') {
        let name = from[..start].trim().trim_matches('"').trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    from.split('@').next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    use crate::mailbox::{LabelChange, MailboxError, MessageHeaders};

    struct AttachmentMailbox {
        attachments: HashMap<String, Bytes>,
    }

    #[async_trait]
    impl MailboxProvider for AttachmentMailbox {
        async fn list_unread(&self, _query: &str) -> Result<Vec<String>, MailboxError> {
            Ok(vec![])
        }

        async fn get_message(&self, _id: &str) -> Result<RawMessage, MailboxError> {
            unimplemented!("not exercised")
        }

        async fn get_attachment_data(
            &self,
            _message_id: &str,
            attachment_id: &str,
        ) -> Result<Bytes, MailboxError> {
            self.attachments
                .get(attachment_id)
                .cloned()
                .ok_or(MailboxError::Api {
                    status: 404,
                    message: "no such attachment".to_string(),
                })
        }

        async fn modify_labels(
            &self,
            _message_id: &str,
            _change: &LabelChange,
        ) -> Result<(), MailboxError> {
            Ok(())
        }
    }

    fn mailbox_with(attachments: &[(&str, &[u8])]) -> AttachmentMailbox {
        AttachmentMailbox {
            attachments: attachments
                .iter()
                .map(|(id, data)| (id.to_string(), Bytes::copy_from_slice(data)))
                .collect(),
        }
    }

    fn message(payload: MimeNode) -> RawMessage {
        RawMessage {
            id: "m1".to_string(),
            headers: MessageHeaders {
                from: "\"Jane Doe\" <jane@example.com>".to_string(),
                subject: "Backend Engineer Application".to_string(),
            },
            payload,
            unread: true,
        }
    }

    fn attachment_leaf(filename: &str, attachment_id: &str) -> MimeNode {
        MimeNode::Leaf {
            mime_type: "application/pdf".to_string(),
            filename: Some(filename.to_string()),
            data: None,
            attachment_id: Some(attachment_id.to_string()),
        }
    }

    #[tokio::test]
    async fn test_single_part_message_yields_body_no_attachments() {
        let mailbox = mailbox_with(&[]);
        let msg = message(MimeNode::text_leaf("I would like to apply."));
        let parsed = parse_message(&mailbox, &msg).await;
        assert_eq!(parsed.body_text, "I would like to apply.");
        assert!(parsed.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_nested_multipart_concatenates_text_depth_first() {
        let mailbox = mailbox_with(&[]);
        let msg = message(MimeNode::Multipart {
            mime_type: "multipart/mixed".to_string(),
            children: vec![
                MimeNode::text_leaf("first "),
                MimeNode::Multipart {
                    mime_type: "multipart/alternative".to_string(),
                    children: vec![
                        MimeNode::text_leaf("second"),
                        MimeNode::Leaf {
                            mime_type: "text/html".to_string(),
                            filename: None,
                            data: Some(Bytes::from_static(b"<p>ignored</p>")),
                            attachment_id: None,
                        },
                    ],
                },
            ],
        });
        let parsed = parse_message(&mailbox, &msg).await;
        assert_eq!(parsed.body_text, "first second");
    }

    #[tokio::test]
    async fn test_attachment_resolved_by_round_trip() {
        let mailbox = mailbox_with(&[("att-1", b"%PDF-1.4 fake")]);
        let msg = message(MimeNode::Multipart {
            mime_type: "multipart/mixed".to_string(),
            children: vec![
                MimeNode::text_leaf("see attached"),
                attachment_leaf("resume.pdf", "att-1"),
            ],
        });
        let parsed = parse_message(&mailbox, &msg).await;
        assert_eq!(parsed.attachments.len(), 1);
        assert_eq!(parsed.attachments[0].filename, "resume.pdf");
        assert_eq!(
            parsed.attachments[0].data.as_deref(),
            Some(b"%PDF-1.4 fake".as_slice())
        );
    }

    #[tokio::test]
    async fn test_failed_attachment_fetch_degrades_to_none() {
        let mailbox = mailbox_with(&[]);
        let msg = message(MimeNode::Multipart {
            mime_type: "multipart/mixed".to_string(),
            children: vec![
                MimeNode::text_leaf("body survives"),
                attachment_leaf("resume.pdf", "gone"),
            ],
        });
        let parsed = parse_message(&mailbox, &msg).await;
        assert_eq!(parsed.body_text, "body survives");
        assert_eq!(parsed.attachments.len(), 1);
        assert!(parsed.attachments[0].data.is_none());
    }

    #[test]
    fn test_extract_email_from_display_form() {
        assert_eq!(
            extract_email("\"Jane Doe\" <jane@example.com>"),
            "jane@example.com"
        );
        assert_eq!(extract_email("jane@example.com"), "jane@example.com");
    }

    #[test]
    fn test_extract_name() {
        assert_eq!(
            extract_name("\"Jane Doe\" <jane@example.com>"),
            Some("Jane Doe".to_string())
        );
        assert_eq!(
            extract_name("jane@example.com"),
            Some("jane".to_string())
        );
    }
}
