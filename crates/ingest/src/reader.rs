use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    Doc,
    Txt,
    Md,
    Other,
}

impl DocumentType {
    /// Detect from the file extension. Anything unrecognised, including a
    /// missing extension, is `Other`.
    pub fn from_path(path: &Path) -> Self {
        match extension(path).as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "doc" => Self::Doc,
            "txt" => Self::Txt,
            "md" => Self::Md,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Txt => "txt",
            Self::Md => "md",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "txt" => Some(Self::Txt),
            "md" => Some(Self::Md),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Txt | Self::Md)
    }
}

pub struct FileReader;

impl FileReader {
    pub async fn read_file(path: &Path) -> Result<String> {
        if !DocumentType::from_path(path).is_text() {
            anyhow::bail!("Unsupported file format: {}", extension(path));
        }

        let bytes = fs::read(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        String::from_utf8(bytes).context(format!("File is not valid UTF-8 text: {:?}", path))
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_from_extension() {
        assert_eq!(DocumentType::from_path(Path::new("a/report.PDF")), DocumentType::Pdf);
        assert_eq!(DocumentType::from_path(Path::new("notes.md")), DocumentType::Md);
        assert_eq!(DocumentType::from_path(Path::new("notes.TXT")), DocumentType::Txt);
        assert_eq!(DocumentType::from_path(Path::new("data.csv")), DocumentType::Other);
        assert_eq!(DocumentType::from_path(Path::new("notes.markdown")), DocumentType::Other);
        assert_eq!(DocumentType::from_path(Path::new("no_extension")), DocumentType::Other);
        assert_eq!(DocumentType::parse("other"), Some(DocumentType::Other));
        assert_eq!(DocumentType::parse("docx"), Some(DocumentType::Docx));
        assert_eq!(DocumentType::parse("xls"), None);
    }

    #[tokio::test]
    async fn test_read_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "hello\n\nworld").unwrap();

        let content = FileReader::read_file(&path).await.unwrap();
        assert_eq!(content, "hello\n\nworld");
    }

    #[tokio::test]
    async fn test_read_rejects_binary_formats_and_bad_utf8() {
        let dir = tempfile::tempdir().unwrap();

        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, "%PDF-1.4").unwrap();
        let err = FileReader::read_file(&pdf).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));

        let csv = dir.path().join("data.csv");
        std::fs::write(&csv, "a,b\n1,2").unwrap();
        let err = FileReader::read_file(&csv).await.unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file format: csv");

        let bare = dir.path().join("README");
        std::fs::write(&bare, "plain words").unwrap();
        assert!(FileReader::read_file(&bare).await.is_err());

        let bad = dir.path().join("bad.txt");
        std::fs::write(&bad, [0xffu8, 0xfe, 0x00]).unwrap();
        assert!(FileReader::read_file(&bad).await.is_err());

        let missing = dir.path().join("missing.txt");
        assert!(FileReader::read_file(&missing).await.is_err());
    }
}
