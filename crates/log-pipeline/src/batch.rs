//! 전송 배치 -- 레코드를 모은 JSON 배열 문자열
//!
//! 빈 배치는 `[]`이고, 레코드를 추가할 때마다 `[r1,r2,...]` 형태를 유지합니다.

use crate::error::LogPipelineError;

const EMPTY_BATCH: &str = "[]";

/// 전송 대기 중인 JSON 배열 페이로드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonBatch {
    payload: String,
    count: usize,
}

impl JsonBatch {
    /// 빈 배치를 생성합니다.
    pub fn new() -> Self {
        Self {
            payload: EMPTY_BATCH.to_owned(),
            count: 0,
        }
    }

    /// 레코드를 배열 끝에 추가합니다.
    ///
    /// 비어 있거나 공백뿐인 레코드는 거부합니다.
    pub fn append(&mut self, record: &str) -> Result<(), LogPipelineError> {
        if record.trim().is_empty() {
            return Err(LogPipelineError::RecordRejected(
                "record is empty".to_owned(),
            ));
        }

        self.payload.pop();
        if self.count > 0 {
            self.payload.push(',');
        }
        self.payload.push_str(record);
        self.payload.push(']');
        self.count += 1;
        Ok(())
    }

    /// 페이로드 문자열
    pub fn as_str(&self) -> &str {
        &self.payload
    }

    /// 레코드가 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 담긴 레코드 수
    pub fn len(&self) -> usize {
        self.count
    }

    /// 배치를 `[]`로 되돌립니다.
    pub fn reset(&mut self) {
        self.payload.clear();
        self.payload.push_str(EMPTY_BATCH);
        self.count = 0;
    }
}

impl Default for JsonBatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_brackets() {
        let batch = JsonBatch::new();
        assert_eq!(batch.as_str(), "[]");
        assert!(batch.is_empty());
    }

    #[test]
    fn append_builds_array() {
        let mut batch = JsonBatch::new();
        batch.append(r#"{"a":1}"#).unwrap();
        assert_eq!(batch.as_str(), r#"[{"a":1}]"#);
        batch.append(r#"{"a":2}"#).unwrap();
        assert_eq!(batch.as_str(), r#"[{"a":1},{"a":2}]"#);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn blank_record_is_rejected() {
        let mut batch = JsonBatch::new();
        assert!(batch.append("").is_err());
        assert!(batch.append(" \n").is_err());
        assert_eq!(batch.as_str(), "[]");
    }

    #[test]
    fn reset_returns_to_empty() {
        let mut batch = JsonBatch::new();
        batch.append("1").unwrap();
        batch.reset();
        assert_eq!(batch.as_str(), "[]");
        batch.append("2").unwrap();
        assert_eq!(batch.as_str(), "[2]");
    }

    #[test]
    fn json_records_parse_back_in_order() {
        let mut batch = JsonBatch::new();
        let records = [
            r#"{"Source":"EventLog","LogEntry":{"Message":"a"}}"#,
            r#"{"Source":"File","LogEntry":{"Logline":"b"}}"#,
        ];
        for r in records {
            batch.append(r).unwrap();
        }
        let parsed: Vec<serde_json::Value> = serde_json::from_str(batch.as_str()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["LogEntry"]["Message"], "a");
        assert_eq!(parsed[1]["Source"], "File");
    }
}
