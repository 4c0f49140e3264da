//! CSV artifacts uploaded alongside jobs.
//!
//! Uploads are validated before any storage work begins: the client filename
//! must carry a `.csv` extension and the body must be non-empty UTF-8 text that
//! parses as delimited rows. Stored artifacts get a generated filename and a
//! SHA-256 checksum of their content, computed once at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::job::uuid_identifier;

/// Largest upload accepted, in bytes.
pub const MAX_CSV_BYTES: usize = 10 * 1024 * 1024;

uuid_identifier!(
    /// Identifier of a stored CSV artifact.
    CsvFileId
);

/// Reasons an upload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CsvValidationError {
    #[error("file name must end with .csv")]
    NotCsvFileName,
    #[error("CSV content must not be empty")]
    Empty,
    #[error("CSV content exceeds {max} bytes")]
    TooLarge { max: usize },
    #[error("CSV content must be valid UTF-8")]
    NotUtf8,
    #[error("CSV content must not contain NUL bytes")]
    ContainsNul,
    #[error("CSV content is malformed near line {line}: {message}")]
    Malformed { line: u64, message: String },
}

/// Hex-encoded SHA-256 digest of `content`.
///
/// # Examples
/// ```
/// use portal::domain::sha256_hex;
///
/// let digest = sha256_hex("a,b\n");
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, sha256_hex("a,b\n"));
/// ```
pub fn sha256_hex(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Upload that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvUpload {
    content: String,
    row_count: u64,
}

impl CsvUpload {
    /// Validate an upload from its client filename and raw bytes.
    pub fn parse(file_name: &str, bytes: Vec<u8>) -> Result<Self, CsvValidationError> {
        if !has_csv_extension(file_name) {
            return Err(CsvValidationError::NotCsvFileName);
        }
        if bytes.is_empty() {
            return Err(CsvValidationError::Empty);
        }
        if bytes.len() > MAX_CSV_BYTES {
            return Err(CsvValidationError::TooLarge { max: MAX_CSV_BYTES });
        }
        if bytes.contains(&0) {
            return Err(CsvValidationError::ContainsNul);
        }
        let content = String::from_utf8(bytes).map_err(|_| CsvValidationError::NotUtf8)?;
        let row_count = count_rows(&content)?;
        if row_count == 0 {
            return Err(CsvValidationError::Empty);
        }
        Ok(Self { content, row_count })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of delimited rows, header included.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Build the artifact row for this upload with a generated filename.
    pub fn into_artifact(self, uploaded_at: DateTime<Utc>) -> NewCsvFile {
        let id = CsvFileId::random();
        let checksum = sha256_hex(&self.content);
        let size_bytes = i64::try_from(self.content.len()).unwrap_or(i64::MAX);
        NewCsvFile {
            id,
            filename: format!("{id}.csv"),
            content: self.content,
            size_bytes,
            checksum,
            uploaded_at,
        }
    }
}

fn has_csv_extension(file_name: &str) -> bool {
    std::path::Path::new(file_name.trim())
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn count_rows(content: &str) -> Result<u64, CsvValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut record = csv::ByteRecord::new();
    let mut rows = 0_u64;
    loop {
        match reader.read_byte_record(&mut record) {
            Ok(true) => rows += 1,
            Ok(false) => return Ok(rows),
            Err(err) => {
                let line = err.position().map_or(rows + 1, csv::Position::line);
                return Err(CsvValidationError::Malformed {
                    line,
                    message: err.to_string(),
                });
            }
        }
    }
}

/// Artifact row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCsvFile {
    pub id: CsvFileId,
    pub filename: String,
    pub content: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub uploaded_at: DateTime<Utc>,
}

impl NewCsvFile {
    /// Metadata view of the row once stored.
    pub fn metadata(&self) -> CsvFileMetadata {
        CsvFileMetadata {
            id: self.id,
            filename: self.filename.clone(),
            size_bytes: self.size_bytes,
            checksum: self.checksum.clone(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// Stored artifact without its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsvFileMetadata {
    #[schema(value_type = String)]
    pub id: CsvFileId,
    pub filename: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Stored artifact including its content, used for downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFile {
    pub metadata: CsvFileMetadata,
    pub content: String,
}
