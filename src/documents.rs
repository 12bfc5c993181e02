use anyhow::{Context, Result};

/// Text and page count pulled out of an uploaded file
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub text: String,
    pub pages: i64,
}

/// Source of document text for uploaded study material
pub trait DocumentTextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedDocument>;
}

/// PDF extraction delegated to `pdf-extract` (text) and `lopdf` (page count)
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl DocumentTextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedDocument> {
        let pages = lopdf::Document::load_mem(bytes)
            .context("file is not a readable PDF")?
            .get_pages()
            .len() as i64;

        let text = pdf_extract::extract_text_from_mem(bytes).context("failed to extract text from PDF")?;

        Ok(ExtractedDocument { text, pages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let result = PdfTextExtractor.extract(b"definitely not a pdf");
        assert!(result.is_err());
    }
}
