use crate::error::{CompareError, Result};

/// Turns an uploaded document into plain text, pages joined in reading order.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, name: &str, bytes: &[u8]) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, name: &str, bytes: &[u8]) -> Result<String> {
        extract_text(name, bytes)
    }
}

/// Pulls the text of every page out of an in-memory PDF, in reading order.
///
/// A document that cannot be opened at all is an error; the caller is expected
/// to abandon the comparison rather than continue with an empty record set.
pub fn extract_text(name: &str, bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|source| CompareError::Pdf {
        name: name.to_string(),
        source,
    })?;
    tracing::debug!(name, bytes = bytes.len(), chars = text.len(), "extracted PDF text");
    Ok(text)
}

/// Numbered non-blank lines of extracted text, for eyeballing a new booking
/// list layout before adjusting the detection rules.
pub fn numbered_lines(text: &str) -> Vec<(usize, &str)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect()
}
