use bytes::Buf;
use futures_util::{future, TryStreamExt};
use std::collections::HashMap;
use tdrcore::prelude::{AnalysisError, AnalysisResult};
use warp::multipart::FormData;

pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A drained multipart body: the `file` part plus every plain text field.
#[derive(Default)]
pub struct UploadForm {
    file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

fn malformed(err: warp::Error) -> AnalysisError {
    AnalysisError::MalformedInput(format!("unreadable multipart body: {}", err))
}

impl UploadForm {
    /// Parts are read one at a time; each body is drained before the next
    /// part is requested from the parser.
    pub async fn read(mut form: FormData) -> AnalysisResult<Self> {
        let mut upload = Self::default();
        while let Some(part) = form.try_next().await.map_err(malformed)? {
            let name = part.name().to_string();
            let filename = part.filename().map(str::to_string);
            let bytes = part
                .stream()
                .try_fold(Vec::new(), |mut acc, chunk| {
                    acc.extend_from_slice(chunk.chunk());
                    future::ready(Ok(acc))
                })
                .await
                .map_err(malformed)?;

            if name == "file" {
                upload.file = Some(UploadedFile {
                    filename: filename.unwrap_or_default(),
                    bytes,
                });
            } else {
                let value = String::from_utf8_lossy(&bytes).trim().to_string();
                upload.fields.insert(name, value);
            }
        }
        Ok(upload)
    }

    pub fn take_file(&mut self) -> AnalysisResult<UploadedFile> {
        self.file
            .take()
            .ok_or_else(|| AnalysisError::MalformedInput("form field 'file' is required".into()))
    }

    /// Numeric field, `None` when absent or blank.
    pub fn number(&self, name: &str) -> AnalysisResult<Option<f64>> {
        match self.fields.get(name).map(String::as_str) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                AnalysisError::InvalidParameter(format!("{} must be a number, got '{}'", name, raw))
            }),
        }
    }

    pub fn required_number(&self, name: &str) -> AnalysisResult<f64> {
        self.number(name)?
            .ok_or_else(|| AnalysisError::InvalidParameter(format!("{} is required", name)))
    }
}
