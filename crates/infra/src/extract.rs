//! Input document text extraction.
//!
//! The declared type comes from the storage key's extension:
//!
//! - `txt`, `md`: strict UTF-8
//! - `pdf`, `doc`, `docx`: rejected, no extractor is wired in
//! - anything else: lossy UTF-8 decode

use tracing::{info, warn};

use deckgen_core::JobError;

/// How an input is handled, decided from its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    PlainText,
    Pdf,
    Word,
    Unknown,
}

impl InputFormat {
    pub fn from_key(key: &str) -> (Self, String) {
        let extension = key.rsplit('.').next().unwrap_or_default().to_lowercase();
        let format = match extension.as_str() {
            "txt" | "md" => InputFormat::PlainText,
            "pdf" => InputFormat::Pdf,
            "doc" | "docx" => InputFormat::Word,
            _ => InputFormat::Unknown,
        };
        (format, extension)
    }
}

/// Convert raw input bytes to plain text.
pub fn extract_text(content: &[u8], key: &str) -> Result<String, JobError> {
    let (format, extension) = InputFormat::from_key(key);
    info!(key = key, extension = %extension, "extracting text from document");

    match format {
        InputFormat::PlainText => String::from_utf8(content.to_vec()).map_err(|e| JobError::Encoding {
            key: key.to_string(),
            detail: e.utf8_error().to_string(),
        }),
        InputFormat::Pdf => Err(JobError::UnsupportedFormat {
            extension,
            message: "PDF parsing is not implemented; upload a plain text (.txt or .md) document".to_string(),
        }),
        InputFormat::Word => Err(JobError::UnsupportedFormat {
            extension,
            message: "Word document parsing is not implemented; upload a plain text (.txt or .md) document"
                .to_string(),
        }),
        InputFormat::Unknown => {
            warn!(key = key, extension = %extension, "unrecognized file type, attempting lossy text decode");
            Ok(String::from_utf8_lossy(content).into_owned())
        }
    }
}
