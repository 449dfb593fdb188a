//! Where downloaded statements go.
//!
//! [`StatementSink`] persists a statement under its name and hands back the
//! location it was written to. [`DownloadReporter`] announces that location
//! once per completed download.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait StatementSink: Send + Sync {
    /// Persist `pdf` as `<name>.pdf` and return where it ended up.
    async fn write(&self, name: &str, pdf: &[u8]) -> io::Result<String>;
}

pub trait DownloadReporter: Send + Sync {
    fn downloaded(&self, location: &str);
}

/// Writes statements as files into a directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        let file_name = format!("{}.pdf", name);
        if self.dir.as_os_str().is_empty() || self.dir == Path::new(".") {
            PathBuf::from(file_name)
        } else {
            self.dir.join(file_name)
        }
    }
}

#[async_trait]
impl StatementSink for FileSink {
    async fn write(&self, name: &str, pdf: &[u8]) -> io::Result<String> {
        let path = self.path_for(name);
        debug!(path = %path.display(), bytes = pdf.len(), "Writing statement");

        tokio::fs::write(&path, pdf).await?;
        Ok(path.display().to_string())
    }
}

/// Prints one line per written statement on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutReporter;

impl DownloadReporter for StdoutReporter {
    fn downloaded(&self, location: &str) {
        println!("{}", location);
    }
}
