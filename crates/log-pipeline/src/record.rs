//! 이벤트 렌더링 -- 원시 이벤트를 고정 필드 레코드로 변환합니다.
//!
//! 모니터는 소스에서 받은 원시 이벤트를 [`render_event`]로 변환한 뒤
//! [`format`](crate::format) 모듈로 최종 문자열을 만듭니다.
//! 렌더링은 순수 함수이며 원시 이벤트를 참조로만 읽습니다.

use std::borrow::Cow;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::error::LogPipelineError;

/// 1601-01-01부터 1970-01-01까지의 초
const FILETIME_UNIX_EPOCH_SECS: i64 = 11_644_473_600;
/// FILETIME 틱(100ns) per second
const FILETIME_TICKS_PER_SEC: u64 = 10_000_000;

/// 레코드 시각 형식
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000Z";

/// 이벤트 소스가 넘겨주는 원시 이벤트
///
/// 플랫폼 API에서 추출 가능한 시스템 속성과 렌더링된 메시지를 담습니다.
/// 없는 속성은 `None`입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    /// 프로바이더 이름
    pub provider: Option<String>,
    /// 채널 이름
    pub channel: Option<String>,
    /// 이벤트 ID
    pub event_id: Option<u32>,
    /// 원시 레벨 값 (0~5)
    pub level: Option<u8>,
    /// 생성 시각 (FILETIME, 1601-01-01 UTC 기준 100ns 틱)
    pub time_created: Option<u64>,
    /// 렌더링된 메시지
    pub message: Option<String>,
}

/// 이벤트 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Unknown,
    Critical,
    Error,
    Warning,
    Information,
    Verbose,
}

impl EventLevel {
    /// 원시 레벨 값을 변환합니다. 0~5 범위 밖이면 `None`입니다.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Unknown),
            1 => Some(Self::Critical),
            2 => Some(Self::Error),
            3 => Some(Self::Warning),
            4 => Some(Self::Information),
            5 => Some(Self::Verbose),
            _ => None,
        }
    }

    /// 레벨 이름을 반환합니다.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Critical => "Critical",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Information => "Information",
            Self::Verbose => "Verbose",
        }
    }
}

/// 템플릿 치환과 XML 출력을 위한 레코드 공통 인터페이스
pub trait LogRecord: Serialize {
    /// 대소문자 구분 없이 필드 값을 찾습니다. 모르는 필드면 `None`입니다.
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;

    /// `<Log>...</Log>` XML 조각을 만듭니다.
    fn to_xml(&self) -> String;
}

/// 이벤트 로그 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventLogEntry {
    #[serde(rename = "Source")]
    pub source: &'static str,
    #[serde(rename = "LogEntry")]
    pub entry: EventLogFields,
}

/// 이벤트 로그 레코드의 본문 필드
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventLogFields {
    #[serde(rename = "EventSource")]
    pub event_source: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Level")]
    pub level: String,
    #[serde(rename = "EventId")]
    pub event_id: u32,
    #[serde(rename = "Message")]
    pub message: String,
}

impl LogRecord for EventLogEntry {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let e = &self.entry;
        let value = match name.to_ascii_lowercase().as_str() {
            "timestamp" | "time" => Cow::Borrowed(e.time.as_str()),
            "severity" | "level" => Cow::Borrowed(e.level.as_str()),
            "source" => Cow::Borrowed(self.source),
            "eventsource" => Cow::Borrowed(e.event_source.as_str()),
            "eventid" => Cow::Owned(e.event_id.to_string()),
            "channel" => Cow::Borrowed(e.channel.as_str()),
            "message" => Cow::Borrowed(e.message.as_str()),
            _ => return None,
        };
        Some(value)
    }

    fn to_xml(&self) -> String {
        let e = &self.entry;
        format!(
            "<Log><Source>{}</Source><LogEntry><EventSource>{}</EventSource><Time>{}</Time>\
             <Channel>{}</Channel><Level>{}</Level><EventId>{}</EventId>\
             <Message>{}</Message></LogEntry></Log>",
            self.source, e.event_source, e.time, e.channel, e.level, e.event_id, e.message
        )
    }
}

/// 원시 이벤트를 이벤트 로그 레코드로 렌더링합니다.
///
/// `multi_line`이 false이면 메시지의 CR/LF를 공백으로 바꿉니다.
/// 레벨이 0~5 범위를 벗어나면 렌더링 실패입니다.
pub fn render_event(raw: &RawEvent, multi_line: bool) -> Result<EventLogEntry, LogPipelineError> {
    let level = match raw.level {
        None => EventLevel::Unknown,
        Some(value) => EventLevel::from_raw(value)
            .ok_or_else(|| LogPipelineError::Render(format!("unsupported event level {value}")))?,
    };

    let time = format_filetime(raw.time_created.unwrap_or(0))?;

    let message = raw.message.clone().unwrap_or_default();
    let message = if multi_line {
        message
    } else {
        collapse_line_breaks(&message)
    };

    Ok(EventLogEntry {
        source: "EventLog",
        entry: EventLogFields {
            event_source: raw.provider.clone().unwrap_or_default(),
            time,
            channel: raw.channel.clone().unwrap_or_default(),
            level: level.as_str().to_owned(),
            event_id: raw.event_id.unwrap_or(0),
            message,
        },
    })
}

/// FILETIME 값을 `YYYY-MM-DDTHH:MM:SS.000Z` 형식으로 변환합니다.
pub fn format_filetime(ticks: u64) -> Result<String, LogPipelineError> {
    let secs = i64::try_from(ticks / FILETIME_TICKS_PER_SEC)
        .map_err(|_| LogPipelineError::Render(format!("time out of range: {ticks}")))?
        - FILETIME_UNIX_EPOCH_SECS;
    let time = DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| LogPipelineError::Render(format!("time out of range: {ticks}")))?;
    Ok(time.format(RECORD_TIME_FORMAT).to_string())
}

/// 현재 UTC 시각을 레코드 시각 형식으로 반환합니다.
pub fn now_timestamp() -> String {
    Utc::now().format(RECORD_TIME_FORMAT).to_string()
}

/// 파일 싱크 이름용 로컬 시각 (`YYYYMMDD_HHMMSS`)
pub fn local_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn collapse_line_breaks(message: &str) -> String {
    message.replace(['\r', '\n'], " ")
}

/// 파일 소스 레코드 (추가된 한 줄)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileLogEntry {
    #[serde(rename = "Source")]
    pub source: &'static str,
    #[serde(rename = "LogEntry")]
    pub entry: FileLogFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileLogFields {
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "FileName")]
    pub file_name: String,
    #[serde(rename = "Logline")]
    pub line: String,
}

impl FileLogEntry {
    pub fn new(file_name: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            source: "File",
            entry: FileLogFields {
                time: now_timestamp(),
                file_name: file_name.into(),
                line: line.into(),
            },
        }
    }
}

impl LogRecord for FileLogEntry {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let e = &self.entry;
        let value = match name.to_ascii_lowercase().as_str() {
            "timestamp" | "time" => e.time.as_str(),
            "source" => self.source,
            "filename" => e.file_name.as_str(),
            "logline" | "message" => e.line.as_str(),
            _ => return None,
        };
        Some(Cow::Borrowed(value))
    }

    fn to_xml(&self) -> String {
        let e = &self.entry;
        format!(
            "<Log><Source>{}</Source><LogEntry><Time>{}</Time><FileName>{}</FileName>\
             <Logline>{}</Logline></LogEntry></Log>",
            self.source, e.time, e.file_name, e.line
        )
    }
}

/// 프로세스 소스 레코드 (표준 출력/에러 한 줄)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessLogEntry {
    #[serde(rename = "Source")]
    pub source: &'static str,
    #[serde(rename = "LogEntry")]
    pub entry: ProcessLogFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessLogFields {
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Command")]
    pub command: String,
    #[serde(rename = "Stream")]
    pub stream: &'static str,
    #[serde(rename = "Message")]
    pub message: String,
}

impl ProcessLogEntry {
    pub fn new(command: impl Into<String>, stream: &'static str, message: impl Into<String>) -> Self {
        Self {
            source: "Process",
            entry: ProcessLogFields {
                time: now_timestamp(),
                command: command.into(),
                stream,
                message: message.into(),
            },
        }
    }
}

impl LogRecord for ProcessLogEntry {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let e = &self.entry;
        let value = match name.to_ascii_lowercase().as_str() {
            "timestamp" | "time" => e.time.as_str(),
            "source" => self.source,
            "command" => e.command.as_str(),
            "stream" => e.stream,
            "message" | "logline" => e.message.as_str(),
            _ => return None,
        };
        Some(Cow::Borrowed(value))
    }

    fn to_xml(&self) -> String {
        let e = &self.entry;
        format!(
            "<Log><Source>{}</Source><LogEntry><Time>{}</Time><Command>{}</Command>\
             <Stream>{}</Stream><Message>{}</Message></LogEntry></Log>",
            self.source, e.time, e.command, e.stream, e.message
        )
    }
}
