//! 레코드 포맷 -- JSON, XML, 사용자 정의 템플릿
//!
//! 렌더링된 레코드를 큐에 들어갈 최종 문자열로 만듭니다.
//!
//! # 사용자 정의 템플릿
//! `%FieldName%` 토큰을 왼쪽부터 겹치지 않게 치환합니다. 필드 이름은
//! 대소문자를 구분하지 않고, 모르는 필드는 빈 문자열이 됩니다.
//! 템플릿은 마지막 `|` 앞까지만 사용합니다. `|` 뒤의 꼬리에서 공백을 뺀 값이
//! 대소문자 구분 없이 `JSON`이면 작은따옴표를 큰따옴표로 바꾸고 치환 값을
//! JSON 이스케이프합니다.

use std::fmt::Write as _;

use crate::error::LogPipelineError;
use crate::record::LogRecord;

const JSON_MARKER: &str = "JSON";

/// 출력 형식 선택자
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Xml,
    Custom(CustomTemplate),
}

impl OutputFormat {
    /// 형식 이름과 템플릿으로 선택자를 만듭니다.
    ///
    /// 이름은 대소문자를 구분하지 않습니다 (`json`, `xml`, `custom`).
    pub fn from_name(name: &str, template: &str) -> Result<Self, LogPipelineError> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "custom" => {
                if template.trim().is_empty() {
                    return Err(LogPipelineError::Config {
                        field: "custom_log_format".to_owned(),
                        reason: "custom format requires a template".to_owned(),
                    });
                }
                Ok(Self::Custom(CustomTemplate::parse(template)))
            }
            other => Err(LogPipelineError::Config {
                field: "log_format".to_owned(),
                reason: format!("unknown output format '{other}'"),
            }),
        }
    }

    /// 레코드를 선택된 형식의 문자열로 변환합니다.
    pub fn format<R: LogRecord>(&self, record: &R) -> Result<String, LogPipelineError> {
        match self {
            Self::Json => serde_json::to_string(record)
                .map_err(|e| LogPipelineError::Render(format!("json encoding failed: {e}"))),
            Self::Xml => Ok(record.to_xml()),
            Self::Custom(template) => Ok(template.expand(record)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Custom(_) => "custom",
        }
    }
}

/// 사용자 정의 템플릿
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomTemplate {
    pattern: String,
    json: bool,
}

impl CustomTemplate {
    /// 템플릿 문자열을 해석합니다.
    pub fn parse(raw: &str) -> Self {
        let Some(split) = raw.rfind('|') else {
            return Self {
                pattern: raw.to_owned(),
                json: false,
            };
        };

        let (body, tail) = (&raw[..split], &raw[split + 1..]);
        let marker: String = tail.chars().filter(|c| *c != ' ').collect();
        if marker.eq_ignore_ascii_case(JSON_MARKER) {
            Self {
                pattern: body.replace('\'', "\""),
                json: true,
            }
        } else {
            Self {
                pattern: body.to_owned(),
                json: false,
            }
        }
    }

    /// JSON 템플릿인지 확인합니다.
    pub fn is_json(&self) -> bool {
        self.json
    }

    /// 접미사 처리가 끝난 템플릿 본문
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// 레코드 필드로 토큰을 치환합니다.
    pub fn expand<R: LogRecord>(&self, record: &R) -> String {
        let mut out = String::with_capacity(self.pattern.len() + 64);
        let mut rest = self.pattern.as_str();

        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('%') else {
                // 닫히지 않은 '%'는 그대로 둔다
                out.push_str(&rest[start..]);
                return out;
            };

            let name = &after[..end];
            let value = record.field(name).unwrap_or_default();
            if self.json {
                out.push_str(&escape_json(&value));
            } else {
                out.push_str(&value);
            }
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        out
    }
}

/// 문자열을 JSON 문자열 내부에 넣을 수 있도록 이스케이프합니다.
///
/// 따옴표, 역슬래시, CR, LF, TAB은 짧은 형식으로, 나머지 제어 문자는
/// `\u00XX`로 바꿉니다.
pub fn escape_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for ch in input.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() && (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
