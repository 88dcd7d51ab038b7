//! Document references attached to assistant replies: titles, type labels,
//! and the view/download actions.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::messages::Reference;

/// Document type inferred from the URL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Word,
    Other,
}

impl DocumentKind {
    pub fn from_url(url: &str) -> Self {
        let url = url.to_ascii_lowercase();
        if url.contains(".pdf") {
            DocumentKind::Pdf
        } else if url.contains(".doc") {
            DocumentKind::Word
        } else {
            DocumentKind::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF Document",
            DocumentKind::Word => "Word Document",
            DocumentKind::Other => "Document",
        }
    }
}

/// Final path segment of `url`, ignoring query string and fragment.
fn last_segment(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// Display title: final path segment without its extension, each `-`/`_`
/// turned into one space, each word capitalised. Falls back to the URL itself.
pub fn document_title(url: &str) -> String {
    let segment = last_segment(url);
    let stem = match segment.rfind('.') {
        Some(dot) if dot > 0 => &segment[..dot],
        _ => segment,
    };
    let mut title = String::with_capacity(stem.len());
    let mut word_start = true;
    for c in stem.chars() {
        match c {
            '-' | '_' | ' ' => {
                title.push(' ');
                word_start = true;
            }
            c if word_start => {
                title.extend(c.to_uppercase());
                word_start = false;
            }
            c => title.push(c),
        }
    }
    if title.trim().is_empty() {
        url.to_string()
    } else {
        title
    }
}

/// Whether the download action fetches the bytes itself.
fn is_pdf_path(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".pdf")
}

/// One row of the reference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    /// 1-based.
    pub position: usize,
    pub title: String,
    pub kind: DocumentKind,
    pub url: String,
}

pub fn reference_entries(references: &[Reference]) -> Vec<ReferenceEntry> {
    references
        .iter()
        .enumerate()
        .map(|(i, r)| ReferenceEntry {
            position: i + 1,
            title: document_title(&r.url),
            kind: DocumentKind::from_url(&r.url),
            url: r.url.clone(),
        })
        .collect()
}

/// Opens a URL outside the chat view.
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Hands URLs to the platform's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

#[derive(Debug, Error)]
#[error("could not open {url}: {source}")]
pub struct OpenError {
    pub url: String,
    #[source]
    pub source: std::io::Error,
}

/// Internal reasons a fetch-and-save attempt fell through to the browser.
#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not write file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    OpenedInBrowser,
}

/// Runs the view and download actions for reference entries.
#[derive(Debug, Clone)]
pub struct Downloader<B = SystemBrowser> {
    http: reqwest::Client,
    directory: PathBuf,
    browser: B,
}

impl Downloader<SystemBrowser> {
    pub fn system(directory: impl Into<PathBuf>) -> Self {
        Self::new(directory, SystemBrowser)
    }
}

impl<B: Browser> Downloader<B> {
    pub fn new(directory: impl Into<PathBuf>, browser: B) -> Self {
        Self {
            http: reqwest::Client::new(),
            directory: directory.into(),
            browser,
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// Opens the document directly.
    pub fn view(&self, url: &str) -> Result<(), OpenError> {
        debug!(url, "opening reference");
        self.browser.open(url).map_err(|source| OpenError {
            url: url.to_string(),
            source,
        })
    }

    /// PDFs are fetched and saved into the download directory; on any
    /// failure, and for every other document type, the URL is opened instead.
    pub async fn download(&self, url: &str) -> Result<DownloadOutcome, OpenError> {
        if is_pdf_path(url) {
            match self.fetch_to_disk(url).await {
                Ok(path) => {
                    info!(url, path = %path.display(), "reference saved");
                    return Ok(DownloadOutcome::Saved(path));
                }
                Err(e) => warn!(url, "download failed, opening instead: {e}"),
            }
        }
        self.view(url)?;
        Ok(DownloadOutcome::OpenedInBrowser)
    }

    async fn fetch_to_disk(&self, url: &str) -> Result<PathBuf, FetchError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.directory.join(file_name(url));
        tokio::fs::write(&path, &bytes).await?;
        Ok(path)
    }
}

fn file_name(url: &str) -> String {
    let segment = last_segment(url);
    if segment.is_empty() || segment.contains(':') || segment == ".." {
        "document.pdf".to_string()
    } else {
        segment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_from_last_segment() {
        assert_eq!(document_title("https://x/my-file_name.pdf"), "My File Name");
        assert_eq!(document_title("https://docs.example.com/a/b/install-guide.docx"), "Install Guide");
        assert_eq!(document_title("https://x/README"), "README");
        assert_eq!(document_title("https://x/release-notes.pdf?v=2#page=3"), "Release Notes");
    }

    #[test]
    fn title_edge_cases() {
        assert_eq!(document_title("https://x/"), "X");
        assert_eq!(document_title("---"), "---");
    }

    #[test]
    fn each_separator_becomes_one_space() {
        assert_eq!(document_title("https://x/a--b.pdf"), "A  B");
        assert_eq!(document_title("https://x/_draft-v2.pdf"), " Draft V2");
    }

    #[test]
    fn kind_labels() {
        assert_eq!(DocumentKind::from_url("https://x/a.pdf").label(), "PDF Document");
        assert_eq!(DocumentKind::from_url("https://x/a.PDF?dl=1").label(), "PDF Document");
        assert_eq!(DocumentKind::from_url("https://x/a.doc").label(), "Word Document");
        assert_eq!(DocumentKind::from_url("https://x/a.docx").label(), "Word Document");
        assert_eq!(DocumentKind::from_url("https://x/a.html").label(), "Document");
    }

    #[test]
    fn entries_are_numbered_from_one() {
        let refs = vec![
            Reference { url: "https://x/first.pdf".into(), content: String::new() },
            Reference { url: "https://x/second.docx".into(), content: String::new() },
        ];
        let entries = reference_entries(&refs);
        assert_eq!(entries[0].position, 1);
        assert_eq!(entries[1].position, 2);
        assert_eq!(entries[1].title, "Second");
        assert_eq!(entries[1].kind, DocumentKind::Word);
    }

    #[test]
    fn only_pdf_paths_are_fetched() {
        assert!(is_pdf_path("https://x/a.pdf"));
        assert!(is_pdf_path("https://x/a.pdf?token=1"));
        assert!(!is_pdf_path("https://x/a.pdf.html"));
        assert!(!is_pdf_path("https://x/a.docx"));
    }

    #[test]
    fn saved_file_name() {
        assert_eq!(file_name("https://x/files/report.pdf?x=1"), "report.pdf");
        assert_eq!(file_name("https://x/"), "x");
        assert_eq!(file_name(""), "document.pdf");
    }
}
