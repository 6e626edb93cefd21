//! Page-analysis pipeline.

use super::AnalysisFlow;
use crate::error::WorkerResult;
use crate::events::{AnalysisUpdate, PagePayload, TabId, TabMessage, Video, VideoAnalysis};
use crate::session::Mode;
use crate::util::truncate_str;
use crate::workers::{
    AnalyzerReport, InsightsReport, QaReport, SearchReport, TranscriptReport, Worker,
};
use serde_json::json;
use tracing::{debug, warn};

/// Character budget for synthetic transcript text.
const TRANSCRIPT_CHAR_BUDGET: usize = 5000;

impl AnalysisFlow {
    /// Run the analysis pipeline for one page.
    ///
    /// Streams partial results to the tab as branches complete and
    /// returns the merged payload for the direct response path. Never
    /// fails: a dead analyzer yields a local mock payload, a failed
    /// YouTube pipeline yields an in-progress fallback.
    pub async fn handle_analysis(&self, tab_id: TabId, payload: PagePayload) -> AnalysisUpdate {
        if payload.is_youtube && payload.video_id.is_some() {
            return match self.youtube_pipeline(tab_id, &payload).await {
                Ok(update) => update,
                Err(e) => {
                    warn!(tab = tab_id, error = %e, "youtube analysis failed");
                    youtube_fallback(&payload.title, e.to_string())
                }
            };
        }

        match self.analyze_page(tab_id, &payload).await {
            Ok(update) => update,
            Err(e) => {
                warn!(tab = tab_id, error = %e, "workers not reachable, using mock payload");
                mock_insights(&payload)
            }
        }
    }

    /// Non-video pipeline: analyzer, then three concurrent branches.
    async fn analyze_page(
        &self,
        tab_id: TabId,
        payload: &PagePayload,
    ) -> WorkerResult<AnalysisUpdate> {
        let analyzer_raw = self
            .workers
            .call(
                Worker::Analyzer,
                json!({ "title": payload.title, "url": payload.url, "text": payload.text }),
            )
            .await?;
        let analyzer = AnalyzerReport::from_value(analyzer_raw.clone())?;
        let topic = analyzer.topic.clone().unwrap_or_default();
        self.remember_topic(tab_id, &topic);

        // Tell the UI analysis has started before the slow branches run.
        let headline = if topic.is_empty() {
            "Analyzing…".to_string()
        } else {
            topic.clone()
        };
        self.pushes
            .push(TabMessage::result(
                tab_id,
                AnalysisUpdate::insights(vec![headline]),
            ))
            .await;

        // Three independent branches. Each pushes its fragment on
        // completion and degrades to an empty default on failure; one
        // branch failing never aborts its siblings.
        let search_branch = async {
            let result = self
                .workers
                .call(
                    Worker::Search,
                    json!({
                        "topic": topic,
                        "entities": analyzer.entities,
                        "pageContent": payload.text,
                        "query": ""
                    }),
                )
                .await
                .and_then(SearchReport::from_value);
            match result {
                Ok(report) => {
                    self.pushes
                        .push(TabMessage::result(
                            tab_id,
                            AnalysisUpdate::videos(report.videos.clone()),
                        ))
                        .await;
                    report
                }
                Err(e) => {
                    warn!(tab = tab_id, error = %e, "search branch failed");
                    SearchReport::default()
                }
            }
        };

        let insights_branch = async {
            let result = self
                .workers
                .call(
                    Worker::Insights,
                    json!({ "analyzer": analyzer_raw, "search": {} }),
                )
                .await
                .and_then(InsightsReport::from_value);
            match result {
                Ok(report) => {
                    self.pushes
                        .push(TabMessage::result(
                            tab_id,
                            AnalysisUpdate {
                                insights: Some(report.insights.clone()),
                                videos: Some(Vec::new()),
                                sources: Some(Vec::new()),
                                qa: Some(false),
                                ..AnalysisUpdate::default()
                            },
                        ))
                        .await;
                    report
                }
                Err(e) => {
                    warn!(tab = tab_id, error = %e, "insights branch failed");
                    InsightsReport::default()
                }
            }
        };

        let qa_branch = async {
            let session_id = self.sessions.get_or_create(tab_id, Mode::Off);
            debug!(tab = tab_id, session = %session_id, "auto qa start");
            let result = self
                .workers
                .call(
                    Worker::Qa,
                    json!({ "query": topic, "topic": topic, "sessionId": session_id }),
                )
                .await
                .and_then(|v| QaReport::from_value(Worker::Qa, v));
            match result {
                Ok(report) => {
                    self.pushes
                        .push(TabMessage::result(
                            tab_id,
                            AnalysisUpdate::sources(report.sources.clone()),
                        ))
                        .await;
                    report
                }
                Err(e) => {
                    warn!(tab = tab_id, error = %e, "auto qa failed");
                    QaReport::default()
                }
            }
        };

        let (search, insights, qa) = tokio::join!(search_branch, insights_branch, qa_branch);

        Ok(AnalysisUpdate {
            insights: Some(insights.insights),
            takes: Some(insights.takes),
            videos: Some(search.videos),
            sources: Some(qa.sources),
            qa: Some(false),
            ..AnalysisUpdate::default()
        })
    }

    /// YouTube pipeline: transcript text feeds the regular analyzer and
    /// insights workers for a consistent flow.
    async fn youtube_pipeline(
        &self,
        tab_id: TabId,
        payload: &PagePayload,
    ) -> WorkerResult<AnalysisUpdate> {
        let video_id = payload.video_id.clone().unwrap_or_default();
        debug!(tab = tab_id, video = %video_id, "youtube analysis");

        let transcript = self
            .workers
            .call(Worker::YoutubeTranscript, json!({ "videoId": video_id }))
            .await
            .and_then(TranscriptReport::from_value)?;

        let transcript_text = transcript.joined_text(TRANSCRIPT_CHAR_BUDGET);
        let text = if transcript_text.is_empty() {
            payload.text.clone()
        } else {
            transcript_text
        };

        let analyzer_raw = self
            .workers
            .call(
                Worker::Analyzer,
                json!({ "title": payload.title, "url": payload.url, "text": text }),
            )
            .await?;
        let analyzer = AnalyzerReport::from_value(analyzer_raw.clone())?;
        let topic = analyzer.topic.unwrap_or_default();
        self.remember_topic(tab_id, &topic);

        let insights = self
            .workers
            .call(
                Worker::Insights,
                json!({ "analyzer": analyzer_raw, "search": {} }),
            )
            .await
            .and_then(InsightsReport::from_value)?;

        let result = if topic.is_empty() {
            "Video transcript analyzed".to_string()
        } else {
            topic
        };

        Ok(AnalysisUpdate {
            insights: Some(insights.insights),
            takes: Some(insights.takes),
            video_analysis: Some(VideoAnalysis {
                result,
                ..VideoAnalysis::default()
            }),
            is_youtube: Some(true),
            videos: Some(Vec::new()),
            sources: Some(Vec::new()),
            ..AnalysisUpdate::default()
        })
    }
}

/// Fixed local payload used when the workers are unreachable.
fn mock_insights(payload: &PagePayload) -> AnalysisUpdate {
    let topic = if !payload.title.is_empty() {
        payload.title.as_str()
    } else if !payload.url.is_empty() {
        payload.url.as_str()
    } else {
        "this page"
    };
    let topic = truncate_str(topic, 80);

    AnalysisUpdate {
        insights: Some(vec![
            format!("Summary for {topic}: page analyzed locally (mock)."),
            "Core idea extraction pending worker connection.".to_string(),
            "This is a placeholder demonstrating the overlay flow.".to_string(),
        ]),
        takes: Some(vec![
            "Critique: analyze only on explicit user action to preserve privacy.".to_string(),
            "Consider trade-offs between speed and depth of analysis.".to_string(),
        ]),
        videos: Some(vec![
            Video {
                title: "What is a context overlay?".to_string(),
                url: "https://www.youtube.com/results?search_query=ai+context+overlay".to_string(),
            },
            Video {
                title: "Contextual AI UX patterns".to_string(),
                url: "https://www.youtube.com/results?search_query=contextual+ai+ux".to_string(),
            },
        ]),
        ..AnalysisUpdate::default()
    }
}

/// Fixed in-progress payload for a failed YouTube pipeline.
fn youtube_fallback(title: &str, error: String) -> AnalysisUpdate {
    AnalysisUpdate {
        insights: Some(vec![
            format!("YouTube video analysis for: {title}"),
            "Video content detected and processing initiated".to_string(),
            "AI analysis may take a moment to complete".to_string(),
        ]),
        takes: Some(vec![
            "Consider multiple perspectives on video content".to_string(),
            "Verify claims with additional sources".to_string(),
        ]),
        video_analysis: Some(VideoAnalysis {
            result: "Video analysis in progress.".to_string(),
            educational_value: "Educational content detected".to_string(),
            target_audience: "General audience".to_string(),
        }),
        is_youtube: Some(true),
        videos: Some(Vec::new()),
        sources: Some(Vec::new()),
        error: Some(error),
        ..AnalysisUpdate::default()
    }
}
