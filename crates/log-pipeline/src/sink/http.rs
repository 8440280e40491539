//! 원격 HTTP 싱크
//!
//! 배치를 `POST`로 보내고 `Filename` 헤더에 타임스탬프 파일 이름을 싣습니다.
//! 2xx가 아닌 응답은 실패로 처리합니다.

use std::time::{Duration, Instant};

use eventship_core::pipeline::BoxFuture;
use reqwest::header::CONTENT_TYPE;

use super::{MIN_PAYLOAD_LEN, Sink, timestamped_filename};
use crate::error::LogPipelineError;

/// 배치 파일 이름을 싣는 헤더
pub const FILENAME_HEADER: &str = "Filename";

/// 원격 엔드포인트로 배치를 보내는 싱크
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    /// 요청 타임아웃을 적용한 클라이언트로 싱크를 만듭니다.
    ///
    /// URL을 해석할 수 없으면 에러입니다.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LogPipelineError> {
        let url = url.into();
        reqwest::Url::parse(&url).map_err(|e| LogPipelineError::Sink {
            sink: "http".to_owned(),
            reason: format!("invalid url '{url}': {e}"),
        })?;

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, payload: &str) -> Result<(), LogPipelineError> {
        if payload.len() < MIN_PAYLOAD_LEN {
            tracing::debug!(len = payload.len(), "payload too short, nothing posted");
            return Ok(());
        }

        let filename = timestamped_filename();
        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(FILENAME_HEADER, &filename)
            .body(payload.to_owned())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LogPipelineError::Sink {
                sink: "http".to_owned(),
                reason: format!("{} responded {status}", self.url),
            });
        }

        tracing::info!(
            url = %self.url,
            filename = %filename,
            bytes = payload.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch posted"
        );
        Ok(())
    }
}

impl Sink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn deliver<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<(), LogPipelineError>> {
        Box::pin(self.post(payload))
    }
}
