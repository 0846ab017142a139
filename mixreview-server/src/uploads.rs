//! Incoming file uploads
//!
//! An upload is validated by extension before any byte reaches disk, then
//! streamed into a staging file. The service that owns the upload decides the
//! final path and moves the staged file there.

use mixreview_common::storage::{
    allowed_extension, MediaStore, StagedFile, UploadWriter, AUDIO_EXTENSIONS, LOGO_EXTENSIONS,
    MAX_LOGO_BYTES,
};
use mixreview_common::Result;

/// What an upload is for; decides the allow-list and size cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Audio,
    Logo,
}

impl UploadKind {
    fn allowed(self) -> &'static [&'static str] {
        match self {
            UploadKind::Audio => AUDIO_EXTENSIONS,
            UploadKind::Logo => LOGO_EXTENSIONS,
        }
    }

    fn limit(self) -> Option<u64> {
        match self {
            UploadKind::Audio => None,
            UploadKind::Logo => Some(MAX_LOGO_BYTES),
        }
    }
}

/// An upload being received
pub struct IncomingFile {
    writer: UploadWriter,
    ext: String,
    original_filename: String,
}

impl IncomingFile {
    /// Validate `filename` for `kind` and open a staging file
    pub async fn begin(store: &MediaStore, kind: UploadKind, filename: &str) -> Result<Self> {
        let ext = allowed_extension(filename, kind.allowed())?;
        let writer = store.begin_upload(&ext, kind.limit()).await?;
        Ok(Self {
            writer,
            ext,
            original_filename: filename.to_string(),
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.writer.write_chunk(chunk).await
    }

    pub async fn finish(self) -> Result<ReceivedFile> {
        Ok(ReceivedFile {
            staged: self.writer.finish().await?,
            ext: self.ext,
            original_filename: self.original_filename,
        })
    }
}

/// A completely received upload
///
/// Dropping it discards the staged bytes.
#[derive(Debug)]
pub struct ReceivedFile {
    pub(crate) staged: StagedFile,
    pub(crate) ext: String,
    pub(crate) original_filename: String,
}

impl ReceivedFile {
    /// Receive an upload already held in memory
    pub async fn from_bytes(
        store: &MediaStore,
        kind: UploadKind,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Self> {
        let mut incoming = IncomingFile::begin(store, kind, filename).await?;
        incoming.write_chunk(bytes).await?;
        incoming.finish().await
    }

    /// Bytes received
    pub fn size(&self) -> u64 {
        self.staged.size()
    }
}
