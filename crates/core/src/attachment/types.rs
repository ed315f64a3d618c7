//! Attachment types and data structures.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use postline_shared::types::{AttachmentId, PostId};

/// Attachment metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique identifier.
    pub id: AttachmentId,
    /// Upload time; the reaper's retention clock starts here.
    pub created_at: DateTime<Utc>,
    /// Name of the blob in the blob store.
    pub blob_name: String,
    /// MIME type of the stored file.
    pub content_type: String,
    /// Owning post. Set once, never cleared.
    pub post_id: Option<PostId>,
}

impl Attachment {
    /// Whether a post has claimed this attachment.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.post_id.is_some()
    }

    /// Whether the reaper may remove this attachment given the cutoff
    /// (`now - retention`).
    #[must_use]
    pub fn is_orphaned_before(&self, cutoff: DateTime<Utc>) -> bool {
        !self.is_linked() && self.created_at < cutoff
    }
}

/// Input for creating an attachment record.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    /// Upload time.
    pub created_at: DateTime<Utc>,
    /// Blob name returned by the blob store.
    pub blob_name: String,
    /// MIME type.
    pub content_type: String,
}

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadInput {
    /// Original filename, if the client sent one.
    pub filename: Option<String>,
    /// Declared MIME type, if the client sent one.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Bytes,
}

impl UploadInput {
    /// Fallback type when nothing better is known.
    pub const OCTET_STREAM: &'static str = "application/octet-stream";

    /// Effective content type of the upload, detected from the file bytes.
    ///
    /// Known signatures decide first. Signature-less UTF-8 is `text/plain`.
    /// Otherwise the declared type or filename extension is used, unless it
    /// names a format with a signature the bytes did not carry.
    #[must_use]
    pub fn resolved_content_type(&self) -> String {
        if let Some(kind) = infer::get(&self.bytes) {
            return kind.mime_type().to_string();
        }

        if self.bytes.is_empty() {
            return Self::OCTET_STREAM.to_string();
        }

        if std::str::from_utf8(&self.bytes).is_ok() {
            return "text/plain".to_string();
        }

        match self.hinted_content_type() {
            Some(hint) if !infer::is_mime_supported(&hint) => hint,
            _ => Self::OCTET_STREAM.to_string(),
        }
    }

    /// Type claimed by the client, from the part header or the filename.
    fn hinted_content_type(&self) -> Option<String> {
        let declared = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| !ct.is_empty() && !ct.eq_ignore_ascii_case(Self::OCTET_STREAM))
            .map(str::to_ascii_lowercase);

        declared.or_else(|| {
            self.filename
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|m| m.essence_str().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const PE: &[u8] = b"MZ\x90\0\x03\0\0\0\x04\0\0\0\xff\xff\0\0";

    fn upload(
        filename: Option<&str>,
        content_type: Option<&str>,
        bytes: &'static [u8],
    ) -> UploadInput {
        UploadInput {
            filename: filename.map(String::from),
            content_type: content_type.map(String::from),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn test_signature_beats_declared_type() {
        let input = upload(Some("photo.jpg"), Some("image/JPEG"), PNG);
        assert_eq!(input.resolved_content_type(), "image/png");
    }

    #[test]
    fn test_executable_declared_as_image_is_detected() {
        let input = upload(Some("cat.png"), Some("image/png"), PE);
        let detected = input.resolved_content_type();
        assert_ne!(detected, "image/png");
        assert!(detected.contains("executable"), "got {detected}");
    }

    #[test]
    fn test_plain_text_detected() {
        let input = upload(Some("notes.png"), Some("image/png"), b"just some notes");
        assert_eq!(input.resolved_content_type(), "text/plain");
    }

    #[test]
    fn test_unsigned_binary_uses_hint() {
        assert_eq!(
            upload(Some("data.csv"), None, b"\x13\x37\xfe\xed\xfa").resolved_content_type(),
            "text/csv"
        );
        assert_eq!(
            upload(None, Some("application/x-custom; v=1"), b"\x13\x37\xfe\xed\xfa")
                .resolved_content_type(),
            "application/x-custom"
        );
    }

    #[test]
    fn test_unsigned_binary_claiming_signed_format() {
        let input = upload(Some("cat.png"), Some("image/png"), b"\x13\x37\xfe\xed\xfa");
        assert_eq!(input.resolved_content_type(), UploadInput::OCTET_STREAM);
    }

    #[test]
    fn test_content_type_fallback() {
        assert_eq!(
            upload(None, None, b"").resolved_content_type(),
            UploadInput::OCTET_STREAM
        );
        assert_eq!(
            upload(Some("noextension"), Some(""), b"\x13\x37\xfe\xed\xfa").resolved_content_type(),
            UploadInput::OCTET_STREAM
        );
    }

    #[test]
    fn test_orphaned_before() {
        let now = Utc::now();
        let mut attachment = Attachment {
            id: AttachmentId::new(1),
            created_at: now - Duration::minutes(61),
            blob_name: "abc".to_string(),
            content_type: "image/png".to_string(),
            post_id: None,
        };

        let cutoff = now - Duration::hours(1);
        assert!(attachment.is_orphaned_before(cutoff));

        attachment.post_id = Some(PostId::new(9));
        assert!(!attachment.is_orphaned_before(cutoff));

        attachment.post_id = None;
        attachment.created_at = now - Duration::minutes(59);
        assert!(!attachment.is_orphaned_before(cutoff));
    }
}
