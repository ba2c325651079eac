//! Uploads to the imgbb image host.

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{configuration::Imgbb, error::Error};

pub const UPLOAD_FAILED: &str = "فشل رفع الصورة إلى imgbb";
pub const CONNECTION_FAILED: &str = "فشل الاتصال بـ imgbb. تحقق من اتصال الإنترنت.";
pub const BAD_RESPONSE: &str = "خطأ في معالجة استجابة imgbb";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub url: String,
    pub thumb: String,
    pub delete_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Thumb {
    Object { url: Option<String> },
    Plain(String),
}

#[derive(Deserialize)]
struct UploadData {
    url: String,
    thumb: Option<Thumb>,
    #[serde(default)]
    delete_url: String,
}

#[derive(Deserialize)]
struct UploadError {
    message: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadData>,
    error: Option<UploadError>,
}

impl UploadResponse {
    fn into_result(self) -> Result<Uploaded, Error> {
        match (self.success, self.data) {
            (true, Some(data)) => {
                let thumb = match data.thumb {
                    Some(Thumb::Object { url: Some(url) }) | Some(Thumb::Plain(url))
                        if !url.is_empty() =>
                    {
                        url
                    }
                    _ => data.url.clone(),
                };
                Ok(Uploaded {
                    url: data.url,
                    thumb,
                    delete_url: data.delete_url,
                })
            }
            _ => Err(Error::Upload(
                self.error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| UPLOAD_FAILED.to_string()),
            )),
        }
    }
}

#[derive(Clone)]
pub struct ImageHost {
    http: reqwest::Client,
    upload_url: String,
    api_key: SecretString,
}

impl ImageHost {
    pub fn new(config: &Imgbb) -> Result<Self, Error> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            upload_url: config.upload_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
    }

    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, Error> {
        Ok(self.upload_full(file_name, bytes).await?.url)
    }

    #[tracing::instrument(name = "[POST] imgbb upload", skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_full(&self, file_name: &str, bytes: Vec<u8>) -> Result<Uploaded, Error> {
        if !self.is_configured() {
            return Err(Error::Upload(UPLOAD_FAILED.to_string()));
        }

        let form = Form::new().part("image", Part::bytes(bytes).file_name(file_name.to_string()));

        let response = self
            .http
            .post(&self.upload_url)
            .query(&[("key", self.api_key.expose_secret())])
            .multipart(form)
            .send()
            .await
            .map_err(|error| {
                tracing::error!(err.msg = %error, err.details = ?error, "imgbb unreachable");
                Error::Upload(CONNECTION_FAILED.to_string())
            })?;

        let body = response.bytes().await.map_err(|error| {
            tracing::error!(err.msg = %error, err.details = ?error, "imgbb response interrupted");
            Error::Upload(CONNECTION_FAILED.to_string())
        })?;
        let parsed: UploadResponse = serde_json::from_slice(&body).map_err(|error| {
            tracing::error!(err.msg = %error, err.details = ?error, "imgbb response is not json");
            Error::Upload(BAD_RESPONSE.to_string())
        })?;

        parsed.into_result()
    }

    /// Uploads `files` one after another, reporting `(percent, current,
    /// total)` after each one. Stops at the first failure.
    pub async fn upload_many<F>(
        &self,
        files: Vec<(String, Vec<u8>)>,
        mut on_progress: F,
    ) -> Result<Vec<String>, Error>
    where
        F: FnMut(u8, usize, usize),
    {
        let total = files.len();
        let mut urls = Vec::with_capacity(total);

        for (index, (file_name, bytes)) in files.into_iter().enumerate() {
            urls.push(self.upload(&file_name, bytes).await?);

            let done = index + 1;
            let percent = (done * 100 + total / 2) / total;
            on_progress(percent as u8, done, total);
        }

        Ok(urls)
    }
}
