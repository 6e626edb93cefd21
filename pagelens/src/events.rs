//! Message types exchanged with the injected page UI.
//!
//! Inbound requests and outbound pushes use the extension wire format:
//! externally tagged JSON objects with a `type` discriminator and
//! camelCase payload fields. [`AnalysisUpdate`] is a partial-merge record:
//! a present key means "update this section", an absent key means "leave
//! as-is", so every field is optional and omitted when `None`.

use crate::util::generate_message_id;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Browser tab identifier, stable for the tab's lifetime.
pub type TabId = i64;

/// Page content captured by the content script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagePayload {
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    #[serde(default)]
    pub url: String,
    /// Extracted readable text.
    #[serde(default)]
    pub text: String,
    /// Whether the page is a YouTube watch page.
    #[serde(rename = "isYouTube", default)]
    pub is_youtube: bool,
    /// Video id when `is_youtube` is set.
    #[serde(rename = "videoId", default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

/// A related-video suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Video title.
    pub title: String,
    /// Video URL.
    pub url: String,
}

/// A cited source article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Article title.
    pub title: String,
    /// Article URL.
    pub url: String,
    /// Provider the article was found through.
    #[serde(default)]
    pub source: String,
}

/// Video-analysis summary for YouTube pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    /// Headline result.
    #[serde(default)]
    pub result: String,
    /// Educational-value note.
    #[serde(rename = "educationalValue", default)]
    pub educational_value: String,
    /// Target-audience note.
    #[serde(rename = "targetAudience", default)]
    pub target_audience: String,
}

/// One line of a video transcript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptLine {
    /// Spoken text.
    #[serde(default)]
    pub text: String,
    /// Start offset in seconds.
    #[serde(default)]
    pub start: f64,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: f64,
}

/// Partial analysis payload pushed to the tab.
///
/// The renderer merges these section by section and never overwrites a
/// populated section with an absent one, so fragments may arrive in any
/// order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisUpdate {
    /// Insight bullet points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<String>>,
    /// Critical takes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub takes: Option<Vec<String>>,
    /// Related videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<Video>>,
    /// Cited sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,
    /// Video-analysis summary (YouTube pages only).
    #[serde(
        rename = "videoAnalysis",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub video_analysis: Option<VideoAnalysis>,
    /// Whether this update belongs to a YouTube flow.
    #[serde(rename = "isYouTube", default, skip_serializing_if = "Option::is_none")]
    pub is_youtube: Option<bool>,
    /// Whether this update answers an explicit question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa: Option<bool>,
    /// Non-fatal failure note attached to a fallback payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisUpdate {
    /// Update carrying only the insights section.
    #[must_use]
    pub fn insights(insights: Vec<String>) -> Self {
        Self {
            insights: Some(insights),
            qa: Some(false),
            ..Self::default()
        }
    }

    /// Update carrying only the videos section.
    #[must_use]
    pub fn videos(videos: Vec<Video>) -> Self {
        Self {
            videos: Some(videos),
            qa: Some(false),
            ..Self::default()
        }
    }

    /// Update carrying only the sources section.
    #[must_use]
    pub fn sources(sources: Vec<SourceRef>) -> Self {
        Self {
            sources: Some(sources),
            qa: Some(false),
            ..Self::default()
        }
    }
}

/// A request from the injected page UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiRequest {
    /// Run the page-analysis pipeline.
    #[serde(rename = "ANALYZE_PAGE")]
    AnalyzePage {
        /// Captured page content.
        payload: PagePayload,
    },

    /// Answer a user question.
    #[serde(rename = "QUESTION")]
    Question {
        /// The question text.
        query: String,
        /// Whether the retrieval-augmented Lumen mode is active.
        #[serde(default)]
        lumen: bool,
    },

    /// Lumen mode was toggled.
    #[serde(rename = "LUMEN_TOGGLE")]
    LumenToggle {
        /// New state of the toggle.
        enabled: bool,
    },

    /// The user ended the session explicitly.
    #[serde(rename = "SESSION_END")]
    SessionEnd,

    /// The tab was closed (tab-lifecycle collaborator).
    #[serde(rename = "TAB_CLOSED")]
    TabClosed,
}

/// An unsolicited push from the coordinator to a tab's UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TabPush {
    /// Partial or final analysis payload.
    #[serde(rename = "ANALYSIS_RESULT")]
    AnalysisResult {
        /// Merge-friendly payload.
        payload: AnalysisUpdate,
    },

    /// Analysis or question failure.
    #[serde(rename = "ANALYSIS_ERROR")]
    AnalysisError {
        /// Human-readable failure message.
        error: String,
    },
}

/// Outbound push addressed to one tab.
#[derive(Debug, Clone)]
pub struct TabMessage {
    /// Target tab.
    pub tab_id: TabId,
    /// Push content.
    pub push: TabPush,
}

impl TabMessage {
    /// Create a push addressed to `tab_id`.
    #[must_use]
    pub fn new(tab_id: TabId, push: TabPush) -> Self {
        Self { tab_id, push }
    }

    /// Convenience: an `ANALYSIS_RESULT` push.
    #[must_use]
    pub fn result(tab_id: TabId, payload: AnalysisUpdate) -> Self {
        Self::new(tab_id, TabPush::AnalysisResult { payload })
    }

    /// Convenience: an `ANALYSIS_ERROR` push.
    #[must_use]
    pub fn error(tab_id: TabId, error: impl Into<String>) -> Self {
        Self::new(
            tab_id,
            TabPush::AnalysisError {
                error: error.into(),
            },
        )
    }
}

/// Direct response delivered to the original caller.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UiResponse {
    /// Merged analysis payload.
    Analysis(AnalysisUpdate),
    /// Session-end acknowledgement.
    SessionEnd {
        /// Number of session slots cleared.
        cleared: usize,
    },
    /// Bare acknowledgement for fire-and-forget requests.
    Ack {
        /// Whether the request was accepted.
        ok: bool,
    },
    /// Handler-level failure.
    Error {
        /// Failure message.
        error: String,
    },
}

/// An inbound request envelope with its response channel.
///
/// The substrate requires handlers to signal whether a response will
/// arrive asynchronously; here that contract is a `oneshot` sender the
/// router resolves exactly once. Fire-and-forget requests carry `None`.
pub struct UiMessage {
    /// Unique message id.
    pub id: String,
    /// Originating tab.
    pub tab_id: TabId,
    /// The request itself.
    pub request: UiRequest,
    /// Direct-response channel, if the caller expects one.
    pub responder: Option<oneshot::Sender<UiResponse>>,
}

impl std::fmt::Debug for UiMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiMessage")
            .field("id", &self.id)
            .field("tab_id", &self.tab_id)
            .field("request", &self.request)
            .field("responds", &self.responder.is_some())
            .finish()
    }
}

impl UiMessage {
    /// Create a fire-and-forget message.
    #[must_use]
    pub fn new(tab_id: TabId, request: UiRequest) -> Self {
        Self {
            id: generate_message_id(),
            tab_id,
            request,
            responder: None,
        }
    }

    /// Create a message expecting a direct response; returns the receiver.
    #[must_use]
    pub fn with_responder(
        tab_id: TabId,
        request: UiRequest,
    ) -> (Self, oneshot::Receiver<UiResponse>) {
        let (tx, rx) = oneshot::channel();
        let mut msg = Self::new(tab_id, request);
        msg.responder = Some(tx);
        (msg, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_tags() {
        let msg: UiRequest =
            serde_json::from_str(r#"{"type":"QUESTION","query":"why?","lumen":true}"#).unwrap();
        assert!(matches!(msg, UiRequest::Question { ref query, lumen: true } if query == "why?"));

        let msg: UiRequest = serde_json::from_str(r#"{"type":"SESSION_END"}"#).unwrap();
        assert!(matches!(msg, UiRequest::SessionEnd));

        let msg: UiRequest =
            serde_json::from_str(r#"{"type":"LUMEN_TOGGLE","enabled":false}"#).unwrap();
        assert!(matches!(msg, UiRequest::LumenToggle { enabled: false }));
    }

    #[test]
    fn test_payload_wire_casing() {
        let payload: PagePayload = serde_json::from_str(
            r#"{"title":"t","url":"u","text":"x","isYouTube":true,"videoId":"abc"}"#,
        )
        .unwrap();
        assert!(payload.is_youtube);
        assert_eq!(payload.video_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_partial_update_omits_absent_keys() {
        let update = AnalysisUpdate::videos(vec![Video {
            title: "clip".into(),
            url: "https://youtu.be/x".into(),
        }]);
        let json = serde_json::to_value(&update).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("videos"));
        assert!(obj.contains_key("qa"));
        assert!(!obj.contains_key("insights"));
        assert!(!obj.contains_key("sources"));
        assert!(!obj.contains_key("videoAnalysis"));
    }

    #[test]
    fn test_push_wire_tags() {
        let push = TabPush::AnalysisError {
            error: "boom".into(),
        };
        let json = serde_json::to_string(&push).unwrap();
        assert!(json.contains(r#""type":"ANALYSIS_ERROR""#));
    }

    #[test]
    fn test_responder_roundtrip() {
        let (msg, mut rx) = UiMessage::with_responder(7, UiRequest::SessionEnd);
        assert_eq!(msg.tab_id, 7);
        let tx = msg.responder.unwrap();
        tx.send(UiResponse::SessionEnd { cleared: 2 }).ok();
        match rx.try_recv().unwrap() {
            UiResponse::SessionEnd { cleared } => assert_eq!(cleared, 2),
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
