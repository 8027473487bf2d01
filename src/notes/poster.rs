use crate::backend::{api, unwrap_data, BackendClient, FileUpload};
use crate::models::IncidentId;
use crate::notes::error::{NoteError, NoteResult};
use base64ct::{Base64, Encoding};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// How an image is attached to a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    /// Embedded as a base64 `data:` URI
    Inline,
    /// Uploaded as an incident attachment and linked by URL
    Attachment,
}

/// Posts rich-text notes, optionally carrying an image, to an incident
#[derive(Clone)]
pub struct NotePoster {
    client: Arc<dyn BackendClient>,
}

impl NotePoster {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    /// Post a note containing `note_html` followed by the image
    pub async fn post_with_image(
        &self,
        incident_id: IncidentId,
        note_html: &str,
        image_path: &Path,
        mode: ImageMode,
    ) -> NoteResult<Value> {
        match mode {
            ImageMode::Inline => self.post_inline_image(incident_id, note_html, image_path).await,
            ImageMode::Attachment => {
                self.post_with_attachment(incident_id, note_html, image_path)
                    .await
            }
        }
    }

    /// Embed the image in the note HTML as a base64 data URI
    pub async fn post_inline_image(
        &self,
        incident_id: IncidentId,
        note_html: &str,
        image_path: &Path,
    ) -> NoteResult<Value> {
        let content = read_image(image_path).await?;
        let src = format!(
            "data:{};base64,{}",
            guess_mime(image_path),
            Base64::encode_string(&content)
        );
        let html = append_image(note_html, &src, &file_name(image_path));

        self.post_note(incident_id, &html).await
    }

    /// Upload the image as an attachment, then reference its download URL in the note
    pub async fn post_with_attachment(
        &self,
        incident_id: IncidentId,
        note_html: &str,
        image_path: &Path,
    ) -> NoteResult<Value> {
        let content = read_image(image_path).await?;
        let name = file_name(image_path);
        let upload = FileUpload {
            field: "attachment".to_string(),
            file_name: name.clone(),
            mime_type: guess_mime(image_path).to_string(),
            content,
        };

        let response = self
            .client
            .upload(&api::attachments_path(incident_id), upload)
            .await
            .map_err(|source| NoteError::Backend {
                incident_id,
                source,
            })?;
        let attachment_id = unwrap_data(response)
            .get("attachment_id")
            .and_then(Value::as_i64)
            .ok_or(NoteError::MissingAttachmentId(incident_id))?;

        info!(incident_id, attachment_id, file_name = %name, "Uploaded note attachment");

        let src = self
            .client
            .resource_url(&api::attachment_data_path(incident_id, attachment_id));
        let html = append_image(note_html, &src, &name);

        self.post_note(incident_id, &html).await
    }

    /// Post a rich-text note and return the created note
    pub async fn post_note(&self, incident_id: IncidentId, html: &str) -> NoteResult<Value> {
        let response = self
            .client
            .post(&api::notes_path(incident_id), &api::note_body(html))
            .await
            .map_err(|source| NoteError::Backend {
                incident_id,
                source,
            })?;
        let note = unwrap_data(response);

        info!(
            incident_id,
            note_id = ?note.get("id"),
            bytes = html.len(),
            "Posted incident note"
        );
        Ok(note)
    }
}

async fn read_image(path: &Path) -> NoteResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| NoteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn append_image(note_html: &str, src: &str, alt: &str) -> String {
    format!(
        "{}<br/><br/><img src=\"{}\" alt=\"{}\"/>",
        note_html,
        escape_attribute(src),
        escape_attribute(alt)
    )
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// MIME type from the file extension
pub fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use std::io::Write;

    fn image_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .unwrap();
        file.write_all(b"\x89PNG-fake").unwrap();
        file
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("shot.PNG")), "image/png");
        assert_eq!(guess_mime(Path::new("a/b.jpeg")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("notes.bin")), "application/octet-stream");
        assert_eq!(guess_mime(Path::new("README")), "application/octet-stream");
    }

    #[test]
    fn test_append_image_escapes_alt() {
        let html = append_image("<p>x</p>", "data:image/png;base64,AA==", "a\"b.png");
        assert_eq!(
            html,
            "<p>x</p><br/><br/><img src=\"data:image/png;base64,AA==\" alt=\"a&quot;b.png\"/>"
        );
    }

    #[tokio::test]
    async fn test_inline_image_note() {
        let backend = InMemoryBackend::new();
        let poster = NotePoster::new(Arc::new(backend.clone()));
        let image = image_file();

        let note = poster
            .post_inline_image(42, "<h2>Findings</h2>", image.path())
            .await
            .unwrap();

        assert!(note["id"].as_i64().is_some());
        let notes = backend.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, 42);
        let content = notes[0].1["content"].as_str().unwrap();
        let encoded = Base64::encode_string(b"\x89PNG-fake");
        assert!(content.starts_with("<h2>Findings</h2><br/><br/><img src=\"data:image/png;base64,"));
        assert!(content.contains(&encoded));
        assert_eq!(notes[0].1["type_id"], 0);
    }

    #[tokio::test]
    async fn test_attachment_note() {
        let backend = InMemoryBackend::new();
        let poster = NotePoster::new(Arc::new(backend.clone()));
        let image = image_file();

        poster
            .post_with_image(42, "<p>see below</p>", image.path(), ImageMode::Attachment)
            .await
            .unwrap();

        let uploads = backend.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1.field, "attachment");
        assert_eq!(uploads[0].1.mime_type, "image/png");
        assert_eq!(uploads[0].1.content, b"\x89PNG-fake".to_vec());

        let attachment_id = 1;
        let content = backend.notes()[0].1["content"].as_str().unwrap().to_string();
        assert!(content.contains(&format!(
            "memory://rest/orgs/0/incidents/42/attachments/{}/data",
            attachment_id
        )));
    }

    #[tokio::test]
    async fn test_missing_image() {
        let poster = NotePoster::new(Arc::new(InMemoryBackend::new()));
        let err = poster
            .post_inline_image(1, "x", Path::new("/nonexistent/shot.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::Io { .. }));
    }
}
