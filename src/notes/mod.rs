/// Incident note posting
///
/// Rich-text notes with an image, either embedded as a base64 data URI or uploaded
/// as an incident attachment and linked from the note.

pub mod error;
pub mod poster;

pub use error::{NoteError, NoteResult};
pub use poster::{guess_mime, ImageMode, NotePoster};
