//! Multipart parsing and on-disk storage for papers and datasets.

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::UploadConfig;
use crate::error::{ApiError, ApiResult};
use crate::types::ApiRequest;

/// Form field that carries the uploaded file.
pub const FILE_FIELD: &str = "file";

/// What is being uploaded; decides the subdirectory and accepted extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Paper,
    Dataset,
}

impl UploadKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Paper => "papers",
            Self::Dataset => "datasets",
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Paper => &[".pdf", ".doc", ".docx"],
            Self::Dataset => &[".csv", ".json", ".xlsx", ".zip"],
        }
    }

    /// Lowercased extension (with the dot) of `file_name` if this kind accepts it.
    pub fn check_extension(&self, file_name: &str) -> ApiResult<String> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .ok_or_else(|| ApiError::bad_request("Invalid file type"))?;

        if self.allowed_extensions().contains(&ext.as_str()) {
            Ok(ext)
        } else {
            Err(ApiError::bad_request("Invalid file type"))
        }
    }
}

/// File part of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Parsed `multipart/form-data` body: text fields plus at most one file.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    /// Trimmed text field, blank treated as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Parse the request body as `multipart/form-data`.
///
/// Any single field larger than `max_file_size` yields a 413.
pub async fn parse_multipart(req: &ApiRequest, max_file_size: usize) -> ApiResult<MultipartForm> {
    let content_type = req
        .content_type()
        .ok_or_else(|| ApiError::bad_request("Missing content type"))?;
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?;

    let body = Bytes::from(req.body.clone().unwrap_or_default());
    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let constraints = multer::Constraints::new()
        .size_limit(multer::SizeLimit::new().per_field(max_file_size as u64));
    let mut multipart = multer::Multipart::with_constraints(stream, boundary, constraints);

    let mut form = MultipartForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) if name == FILE_FIELD => {
                let content_type = field.content_type().map(|m| m.to_string());
                let data = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part when no file was chosen.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            Some(_) => {
                field.bytes().await.map_err(multipart_error)?;
            }
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

fn multipart_error(err: multer::Error) -> ApiError {
    match err {
        multer::Error::FieldSizeExceeded { .. } | multer::Error::StreamSizeExceeded { .. } => {
            ApiError::payload_too_large("File too large")
        }
        other => ApiError::bad_request(format!("Invalid multipart body: {}", other)),
    }
}

/// Where a saved upload landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    /// Public URL, e.g. `/uploads/papers/1700000000000-12345.pdf`.
    pub url: String,
}

/// Writes uploads below the configured directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    public_path: String,
    max_file_size: usize,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: config.upload_dir.clone(),
            public_path: config.public_path.trim_end_matches('/').to_string(),
            max_file_size: config.max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate and persist `file` under `{root}/{kind}/{millis}-{random}{ext}`.
    pub async fn save(&self, kind: UploadKind, file: &UploadedFile) -> ApiResult<StoredFile> {
        let ext = kind.check_extension(&file.file_name)?;
        if file.data.len() > self.max_file_size {
            return Err(ApiError::payload_too_large("File too large"));
        }

        let dir = self.root.join(kind.dir_name());
        tokio::fs::create_dir_all(&dir).await?;

        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
        let stored_name = format!("{}-{}{}", Utc::now().timestamp_millis(), suffix, ext);
        let path = dir.join(&stored_name);
        tokio::fs::write(&path, &file.data).await?;

        tracing::debug!(path = %path.display(), bytes = file.data.len(), "stored upload");

        Ok(StoredFile {
            url: format!("{}/{}/{}", self.public_path, kind.dir_name(), stored_name),
            path,
        })
    }

    /// Best-effort removal of a file written by [`UploadStore::save`].
    pub async fn discard(&self, stored: &StoredFile) {
        if let Err(e) = tokio::fs::remove_file(&stored.path).await {
            tracing::warn!(path = %stored.path.display(), error = %e, "failed to remove upload");
        }
    }
}
