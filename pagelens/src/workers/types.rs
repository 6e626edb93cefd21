//! Typed views over worker response bodies.
//!
//! Responses are decoded leniently: missing fields default to empty so a
//! sparse reply degrades the corresponding UI section instead of failing
//! the branch.

use super::Worker;
use crate::error::{WorkerError, WorkerResult};
use crate::events::{SourceRef, TranscriptLine, Video};
use serde::Deserialize;
use serde_json::Value;

/// Decode a worker response body into its typed view.
pub(crate) fn decode<T: for<'de> Deserialize<'de>>(
    worker: Worker,
    value: Value,
) -> WorkerResult<T> {
    serde_json::from_value(value).map_err(|e| WorkerError::InvalidResponse {
        worker: worker.wire_name(),
        message: e.to_string(),
    })
}

/// `analyzer` response: detected topic and named entities.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzerReport {
    /// Detected page topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Named entities found on the page.
    #[serde(default)]
    pub entities: Vec<String>,
}

impl AnalyzerReport {
    /// Decode from a raw response body.
    pub fn from_value(value: Value) -> WorkerResult<Self> {
        decode(Worker::Analyzer, value)
    }
}

/// `search` response: related videos.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchReport {
    /// Related-video suggestions.
    #[serde(default)]
    pub videos: Vec<Video>,
}

impl SearchReport {
    /// Decode from a raw response body.
    pub fn from_value(value: Value) -> WorkerResult<Self> {
        decode(Worker::Search, value)
    }
}

/// `insights` response: insight bullets and critical takes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightsReport {
    /// Insight bullet points.
    #[serde(default)]
    pub insights: Vec<String>,
    /// Critical takes.
    #[serde(default)]
    pub takes: Vec<String>,
}

impl InsightsReport {
    /// Decode from a raw response body.
    pub fn from_value(value: Value) -> WorkerResult<Self> {
        decode(Worker::Insights, value)
    }
}

/// `qa` / `analyze_question` response: answer with cited sources.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QaReport {
    /// Generated answer text.
    #[serde(default)]
    pub answer: String,
    /// Cited sources.
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}

impl QaReport {
    /// Decode from a raw response body.
    pub fn from_value(worker: Worker, value: Value) -> WorkerResult<Self> {
        decode(worker, value)
    }
}

/// `youtube_transcript` response: ordered transcript lines.
///
/// The worker returns either `{"lines": [...]}` or a bare line array.
#[derive(Debug, Clone, Default)]
pub struct TranscriptReport {
    /// Transcript lines in playback order.
    pub lines: Vec<TranscriptLine>,
}

impl TranscriptReport {
    /// Decode from a raw response body, accepting both shapes.
    pub fn from_value(value: Value) -> WorkerResult<Self> {
        #[derive(Deserialize)]
        struct Wrapped {
            #[serde(default)]
            lines: Vec<TranscriptLine>,
        }

        let lines = match value {
            Value::Array(_) => decode::<Vec<TranscriptLine>>(Worker::YoutubeTranscript, value)?,
            other => decode::<Wrapped>(Worker::YoutubeTranscript, other)?.lines,
        };
        Ok(Self { lines })
    }

    /// Concatenate line text, bounded to `max_chars` bytes.
    #[must_use]
    pub fn joined_text(&self, max_chars: usize) -> String {
        let joined = self
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        crate::util::truncate_str(&joined, max_chars).to_string()
    }
}

/// `clear-session` response: teardown acknowledgement.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ClearReport {
    /// Whether the teardown request was accepted.
    #[serde(default)]
    pub ok: bool,
    /// Number of cache entries deleted.
    #[serde(default)]
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analyzer_report_lenient() {
        let report = AnalyzerReport::from_value(json!({ "topic": "Rust ownership" })).unwrap();
        assert_eq!(report.topic.as_deref(), Some("Rust ownership"));
        assert!(report.entities.is_empty());

        let report = AnalyzerReport::from_value(json!({})).unwrap();
        assert!(report.topic.is_none());
    }

    #[test]
    fn test_transcript_both_shapes() {
        let wrapped = json!({ "lines": [{ "text": "hello", "start": 0.0, "duration": 1.5 }] });
        let report = TranscriptReport::from_value(wrapped).unwrap();
        assert_eq!(report.lines.len(), 1);

        let bare = json!([{ "text": "hi" }, { "text": "there" }]);
        let report = TranscriptReport::from_value(bare).unwrap();
        assert_eq!(report.joined_text(100), "hi there");
    }

    #[test]
    fn test_transcript_text_bounded() {
        let lines: Vec<_> = (0..100).map(|_| json!({ "text": "wordwordword" })).collect();
        let report = TranscriptReport::from_value(json!(lines)).unwrap();
        assert!(report.joined_text(50).len() <= 50);
    }

    #[test]
    fn test_qa_report_sources() {
        let report = QaReport::from_value(
            Worker::Qa,
            json!({
                "answer": "because",
                "sources": [{ "title": "Doc", "url": "https://x", "source": "google" }],
                "insertedIds": []
            }),
        )
        .unwrap();
        assert_eq!(report.sources.len(), 1);
        assert_eq!(report.sources[0].source, "google");
    }

    #[test]
    fn test_non_object_is_invalid() {
        let err = SearchReport::from_value(json!("nope")).unwrap_err();
        assert!(matches!(err, WorkerError::InvalidResponse { .. }));
    }
}
