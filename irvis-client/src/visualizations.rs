//! Visualization payload decoding and the rendering-ready view model
//!
//! The backend legitimately omits artifacts (clustering may be skipped for
//! small datasets) and may emit malformed ones. Each of the five slots is
//! decoded in isolation, so a bad artifact disables only its own chart.
//! Consumers read a fully decoded view model and never parse anything
//! themselves.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// The artifact slots the backend may populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Incident cluster scatter (string-encoded plot spec)
    Cluster,
    /// Incident type counts (string-encoded plot spec)
    Bar,
    /// Incidents over time (string-encoded plot spec)
    TimeSeries,
    /// Incident frequency by hour (structured series)
    HourlyHistogram,
    /// Incident trends by day of week (structured series)
    WeeklyTrends,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Cluster,
        ArtifactKind::Bar,
        ArtifactKind::TimeSeries,
        ArtifactKind::HourlyHistogram,
        ArtifactKind::WeeklyTrends,
    ];

    /// Payload key for this slot.
    pub fn key(self) -> &'static str {
        match self {
            ArtifactKind::Cluster => "cluster",
            ArtifactKind::Bar => "bar",
            ArtifactKind::TimeSeries => "time_series",
            ArtifactKind::HourlyHistogram => "hourly_histogram",
            ArtifactKind::WeeklyTrends => "weekly_trends",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Decoded plot specification.
///
/// The interior of `data` and `layout` belongs to the charting widget and
/// stays opaque here; decoding only guarantees both members exist and are
/// JSON containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSpec {
    pub data: Value,
    pub layout: Value,
}

/// Category label on a structured series axis.
///
/// The backend emits both strings (weekday names) and numbers (hours).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryLabel {
    Text(String),
    Number(f64),
}

/// Structured series artifact: paired category labels and counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySeries {
    pub x: Vec<CategoryLabel>,
    pub y: Vec<f64>,
}

/// Rendering-ready projection of one fetched payload.
///
/// `None` means "do not render that chart", never an error by itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisualizationViewModel {
    pub cluster: Option<PlotSpec>,
    pub bar: Option<PlotSpec>,
    pub time_series: Option<PlotSpec>,
    pub hourly_histogram: Option<CategorySeries>,
    pub weekly_trends: Option<CategorySeries>,
}

impl VisualizationViewModel {
    pub fn rendered_count(&self) -> usize {
        usize::from(self.cluster.is_some())
            + usize::from(self.bar.is_some())
            + usize::from(self.time_series.is_some())
            + usize::from(self.hourly_histogram.is_some())
            + usize::from(self.weekly_trends.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.rendered_count() == 0
    }
}

/// Per-artifact decode failure, absorbed into the load summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactIssue {
    pub kind: ArtifactKind,
    pub reason: String,
}

/// Result of a load with at least one renderable artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub rendered: Vec<ArtifactKind>,
    pub skipped: Vec<ArtifactIssue>,
}

/// Payload-level load failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// All five artifacts absent or invalid
    #[error("payload contained no renderable visualizations")]
    EmptyPayload,
}

/// Owns the current decoded payload.
///
/// Each load wholly replaces the previous payload; clones share the same
/// underlying state so the controller and the presentation layer observe
/// one view model.
#[derive(Debug, Clone, Default)]
pub struct VisualizationStore {
    current: Arc<RwLock<VisualizationViewModel>>,
}

impl VisualizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and classify an untrusted payload.
    ///
    /// Per-artifact failures disable only their own slot. The view model is
    /// replaced in all cases; the error is returned only when nothing at
    /// all is renderable.
    pub async fn load(&self, raw: &Value) -> Result<LoadSummary, LoadError> {
        let mut view = VisualizationViewModel::default();
        let mut rendered = Vec::new();
        let mut skipped = Vec::new();

        if let Some(object) = raw.as_object() {
            for kind in ArtifactKind::ALL {
                let Some(value) = object.get(kind.key()) else {
                    continue;
                };
                let outcome = match kind {
                    ArtifactKind::Cluster => {
                        decode_plot_spec(value).map(|spec| view.cluster = Some(spec))
                    }
                    ArtifactKind::Bar => decode_plot_spec(value).map(|spec| view.bar = Some(spec)),
                    ArtifactKind::TimeSeries => {
                        decode_plot_spec(value).map(|spec| view.time_series = Some(spec))
                    }
                    ArtifactKind::HourlyHistogram => {
                        decode_series(value).map(|series| view.hourly_histogram = Some(series))
                    }
                    ArtifactKind::WeeklyTrends => {
                        decode_series(value).map(|series| view.weekly_trends = Some(series))
                    }
                };
                match outcome {
                    Ok(()) => rendered.push(kind),
                    Err(reason) => {
                        tracing::warn!(
                            artifact = %kind,
                            reason = %reason,
                            "disabling undecodable visualization artifact"
                        );
                        skipped.push(ArtifactIssue { kind, reason });
                    }
                }
            }
        } else {
            tracing::warn!("visualization payload is not a JSON object");
        }

        let empty = view.is_empty();
        *self.current.write().await = view;

        if empty {
            Err(LoadError::EmptyPayload)
        } else {
            Ok(LoadSummary { rendered, skipped })
        }
    }

    /// Read-only snapshot of the current view model.
    pub async fn view_model(&self) -> VisualizationViewModel {
        self.current.read().await.clone()
    }

    /// Drop the current payload.
    pub async fn clear(&self) {
        *self.current.write().await = VisualizationViewModel::default();
    }
}

/// Decode a string-encoded plot specification.
fn decode_plot_spec(value: &Value) -> Result<PlotSpec, String> {
    let encoded = value
        .as_str()
        .ok_or_else(|| "expected a string-encoded plot specification".to_string())?;
    let spec: PlotSpec = serde_json::from_str(encoded)
        .map_err(|e| format!("embedded specification did not parse: {}", e))?;
    if !spec.data.is_object() && !spec.data.is_array() {
        return Err("`data` is not a JSON container".to_string());
    }
    if !spec.layout.is_object() && !spec.layout.is_array() {
        return Err("`layout` is not a JSON container".to_string());
    }
    Ok(spec)
}

/// Decode a structured series, enforcing paired axis lengths.
fn decode_series(value: &Value) -> Result<CategorySeries, String> {
    let series: CategorySeries =
        serde_json::from_value(value.clone()).map_err(|e| format!("series did not parse: {}", e))?;
    if series.x.len() != series.y.len() {
        return Err(format!(
            "x/y length mismatch: {} labels vs {} counts",
            series.x.len(),
            series.y.len()
        ));
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plot_spec_string() -> String {
        json!({
            "data": [{"type": "scatter", "x": [9, 13], "y": [2, 5]}],
            "layout": {"title": "Incident Clusters"}
        })
        .to_string()
    }

    #[test]
    fn test_decode_plot_spec_valid() {
        let value = Value::String(plot_spec_string());
        let spec = decode_plot_spec(&value).expect("valid spec decodes");
        assert!(spec.data.is_array());
        assert!(spec.layout.is_object());
    }

    #[test]
    fn test_decode_plot_spec_rejects_non_string() {
        let value = json!({"data": [], "layout": {}});
        assert!(decode_plot_spec(&value).is_err());
    }

    #[test]
    fn test_decode_plot_spec_rejects_missing_layout() {
        let value = Value::String(json!({"data": []}).to_string());
        assert!(decode_plot_spec(&value).is_err());
    }

    #[test]
    fn test_decode_plot_spec_rejects_scalar_members() {
        let value = Value::String(json!({"data": 1, "layout": {}}).to_string());
        assert!(decode_plot_spec(&value).is_err());
    }

    #[test]
    fn test_decode_series_accepts_numeric_and_text_labels() {
        let hours = json!({"x": [0, 1, 2], "y": [4.0, 1.0, 7.0]});
        let days = json!({"x": ["Mon", "Tue"], "y": [3, 9]});
        assert!(decode_series(&hours).is_ok());
        assert!(decode_series(&days).is_ok());
    }

    #[test]
    fn test_decode_series_rejects_length_mismatch() {
        let value = json!({"x": [1, 2, 3], "y": [5, 6]});
        let reason = decode_series(&value).expect_err("mismatch rejected");
        assert!(reason.contains("length mismatch"));
    }

    #[test]
    fn test_decode_series_rejects_missing_axis() {
        let value = json!({"x": [1, 2, 3]});
        assert!(decode_series(&value).is_err());
    }

    #[tokio::test]
    async fn test_load_isolates_malformed_artifact() {
        let store = VisualizationStore::new();
        let payload = json!({
            "cluster": plot_spec_string(),
            "bar": "this is not an embedded specification",
        });

        let summary = store.load(&payload).await.expect("partial load succeeds");
        assert_eq!(summary.rendered, vec![ArtifactKind::Cluster]);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].kind, ArtifactKind::Bar);

        let view = store.view_model().await;
        assert!(view.cluster.is_some());
        assert!(view.bar.is_none());
    }

    #[tokio::test]
    async fn test_load_empty_payload_reports_empty_and_clears_slots() {
        let store = VisualizationStore::new();

        let result = store.load(&json!({})).await;
        assert_eq!(result, Err(LoadError::EmptyPayload));

        let view = store.view_model().await;
        assert!(view.is_empty());
        assert!(view.cluster.is_none());
        assert!(view.bar.is_none());
        assert!(view.time_series.is_none());
        assert!(view.hourly_histogram.is_none());
        assert!(view.weekly_trends.is_none());
    }

    #[tokio::test]
    async fn test_load_non_object_payload_is_empty() {
        let store = VisualizationStore::new();
        let result = store.load(&json!(["not", "an", "object"])).await;
        assert_eq!(result, Err(LoadError::EmptyPayload));
    }

    #[tokio::test]
    async fn test_load_mismatched_series_leaves_other_slots_intact() {
        let store = VisualizationStore::new();
        let payload = json!({
            "hourly_histogram": {"x": [1, 2, 3], "y": [5, 6]},
            "weekly_trends": {"x": ["Mon", "Tue"], "y": [3, 9]},
        });

        let summary = store.load(&payload).await.expect("partial load succeeds");
        assert_eq!(summary.rendered, vec![ArtifactKind::WeeklyTrends]);

        let view = store.view_model().await;
        assert!(view.hourly_histogram.is_none());
        assert!(view.weekly_trends.is_some());
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let store = VisualizationStore::new();
        let payload = json!({
            "time_series": plot_spec_string(),
            "weekly_trends": {"x": ["Mon", "Tue"], "y": [3, 9]},
        });

        let first = store.load(&payload).await.expect("load succeeds");
        let first_view = store.view_model().await;
        let second = store.load(&payload).await.expect("load succeeds");
        let second_view = store.view_model().await;

        assert_eq!(first, second);
        assert_eq!(first_view, second_view);
    }

    #[tokio::test]
    async fn test_load_replaces_prior_payload() {
        let store = VisualizationStore::new();
        store
            .load(&json!({"cluster": plot_spec_string()}))
            .await
            .expect("load succeeds");
        store
            .load(&json!({"bar": plot_spec_string()}))
            .await
            .expect("load succeeds");

        let view = store.view_model().await;
        assert!(view.cluster.is_none());
        assert!(view.bar.is_some());
    }

    #[tokio::test]
    async fn test_clear_drops_payload() {
        let store = VisualizationStore::new();
        store
            .load(&json!({"cluster": plot_spec_string()}))
            .await
            .expect("load succeeds");

        store.clear().await;
        assert!(store.view_model().await.is_empty());
    }
}
