//! Attachment download with Content-Disposition filename recovery.

use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Method;

use pavilion_shared::types::MessageId;

use crate::client::ApiClient;
use crate::error::Result;

/// A downloaded attachment: raw bytes plus the server-reported file name.
#[derive(Debug, Clone)]
pub struct AttachmentDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ApiClient {
    /// Download the attachment of a message.  The file name comes from the
    /// `Content-Disposition` header; when the header is missing or
    /// unparseable, the message id stands in.
    pub async fn download_attachment(&self, message_id: &MessageId) -> Result<AttachmentDownload> {
        let response = self
            .request(
                Method::GET,
                &format!("/api/messages/{message_id}/attachment"),
                &[],
                None,
            )
            .await?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| message_id.to_string());

        let bytes = response.bytes().await?;
        Ok(AttachmentDownload {
            file_name,
            bytes: bytes.to_vec(),
        })
    }
}

/// Extract the file name from a `Content-Disposition` header value.
///
/// Prefers the RFC 5987 `filename*=UTF-8''...` form (percent-encoded,
/// decoded here; the raw value is kept when decoding fails) over the plain
/// `filename="..."` form.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    for part in header.split(';') {
        let part = part.trim();
        if let Some(encoded) = part.strip_prefix("filename*=") {
            let encoded = encoded
                .strip_prefix("UTF-8''")
                .or_else(|| encoded.strip_prefix("utf-8''"))
                .unwrap_or(encoded);
            return Some(match urlencoding::decode(encoded) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => encoded.to_string(),
            });
        }
    }
    for part in header.split(';') {
        let part = part.trim();
        if let Some(name) = part.strip_prefix("filename=") {
            let name = name.trim_matches('"');
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filename() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="notes.txt""#),
            Some("notes.txt".to_string())
        );
    }

    #[test]
    fn test_unquoted_filename() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=notes.txt"),
            Some("notes.txt".to_string())
        );
    }

    #[test]
    fn test_rfc5987_filename_is_percent_decoded() {
        let header = "attachment; filename*=UTF-8''b%C3%A1o%20c%C3%A1o.pdf";
        assert_eq!(
            filename_from_content_disposition(header),
            Some("báo cáo.pdf".to_string())
        );
    }

    #[test]
    fn test_rfc5987_wins_over_plain() {
        let header = r#"attachment; filename="fallback.pdf"; filename*=UTF-8''real%20name.pdf"#;
        assert_eq!(
            filename_from_content_disposition(header),
            Some("real name.pdf".to_string())
        );
    }

    #[test]
    fn test_undecodable_value_falls_back_to_raw() {
        // Truncated percent escape: decoding fails, raw value is kept.
        let header = "attachment; filename*=UTF-8''bad%ZZname";
        assert_eq!(
            filename_from_content_disposition(header),
            Some("bad%ZZname".to_string())
        );
    }

    #[test]
    fn test_header_without_filename() {
        assert_eq!(filename_from_content_disposition("inline"), None);
    }
}
