//! Plain-text and JSON rendering of the status surface.
//!
//! Rendering reads the model and never mutates it. Colors are applied by the
//! CLI layer; everything here is plain text so it can be asserted in tests.

#![allow(missing_docs)]

use serde::Serialize;

use crate::modal::orchestrator::ModalSession;
use crate::monitor::ewma::RateTrend;
use crate::monitor::sync_tracker::SyncState;

use super::model::StatusModel;

/// One-line sync summary.
#[must_use]
pub fn status_line(state: &SyncState) -> String {
    let height = |h: i64| {
        if h < 0 {
            "?".to_string()
        } else {
            h.to_string()
        }
    };
    let mut parts = vec![
        format!(
            "height {}/{}",
            height(state.internal_height),
            height(state.network_height)
        ),
        format!("{:.2} %", state.percentage),
    ];
    if state.samples > 1 {
        parts.push(format!("+{:.2} %/min", state.increase_per_minute));
    }
    if let Some(eta) = state.estimated_time_left {
        parts.push(format!("eta {eta}"));
    }
    if state.rate_trend != RateTrend::Unknown {
        parts.push(format!(
            "{:.1} blk/s {}",
            state.blocks_per_second,
            trend_label(state.rate_trend)
        ));
    }
    parts.join(" | ")
}

#[must_use]
pub const fn trend_label(trend: RateTrend) -> &'static str {
    match trend {
        RateTrend::Unknown => "unknown",
        RateTrend::Stable => "stable",
        RateTrend::Accelerating => "accelerating",
        RateTrend::Decelerating => "decelerating",
        RateTrend::Stalled => "stalled",
    }
}

/// Line describing the mounted dialog, if any.
#[must_use]
pub fn dialog_line(model: &StatusModel) -> Option<String> {
    let session = model.modal.session()?;
    let body = model
        .modal
        .content()
        .map_or_else(|| session.kind.to_string(), |c| c.describe());
    let mut flags = Vec::new();
    if session.force_open {
        flags.push("forced");
    }
    if !session.closable {
        flags.push("locked");
    }
    let suffix = if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join(", "))
    };
    Some(format!("[{} {}] {body}{suffix}", session.kind, session.handle))
}

/// Full plain-text frame: status line, dialog line, notice.
#[must_use]
pub fn render_frame(model: &StatusModel) -> Vec<String> {
    let mut lines = vec![status_line(model.tracker.state())];
    if let Some(dialog) = dialog_line(model) {
        lines.push(dialog);
    }
    if let Some(notice) = &model.notice {
        lines.push(format!("! {notice}"));
    }
    lines
}

/// Machine-readable snapshot for `--json` output.
#[derive(Debug, Serialize)]
pub struct StatusSnapshot<'a> {
    pub state: &'a SyncState,
    pub dialog: Option<&'a ModalSession>,
    pub progress_text: Option<String>,
    pub notice: Option<&'a str>,
    pub ingest_errors: u64,
    pub dialogs_opened: u64,
}

#[must_use]
pub fn snapshot(model: &StatusModel) -> StatusSnapshot<'_> {
    StatusSnapshot {
        state: model.tracker.state(),
        dialog: model.modal.session(),
        progress_text: model.modal.progress_text(),
        notice: model.notice.as_deref(),
        ingest_errors: model.ingest_errors,
        dialogs_opened: model.dialogs_opened,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::core::config::Config;
    use crate::ingest::HeightEvent;
    use crate::monitor::sync_tracker::HeightSample;
    use crate::ui::model::StatusMsg;
    use crate::ui::update::update;

    fn feed(model: &mut StatusModel, network: i64, heights: &[i64]) {
        let t0 = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        update(model, StatusMsg::Heights(vec![HeightEvent::Network(network)]));
        for (i, h) in heights.iter().enumerate() {
            let at = t0 + Duration::seconds(60 * i64::try_from(i).unwrap());
            update(
                model,
                StatusMsg::Heights(vec![HeightEvent::Internal(HeightSample::new(*h, at))]),
            );
        }
    }

    #[test]
    fn unknown_heights_render_question_marks() {
        let line = status_line(&SyncState::default());
        assert_eq!(line, "height ?/? | 0.00 %");
    }

    #[test]
    fn catching_up_renders_rate_and_eta() {
        let mut model = StatusModel::new(&Config::default());
        feed(&mut model, 300, &[100, 150]);
        let line = status_line(model.tracker.state());
        assert!(line.starts_with("height 150/300 | 33.33 % | +25.00 %/min | eta 4 minutes"), "{line}");
    }

    #[test]
    fn dialog_line_shows_kind_handle_and_progress() {
        let mut model = StatusModel::new(&Config::default());
        feed(&mut model, 300, &[100, 150]);
        let line = dialog_line(&model).unwrap();
        assert_eq!(line, "[syncing #1] Synchronizing with the network: 33.33 %");
    }

    #[test]
    fn frame_includes_notice() {
        let mut model = StatusModel::new(&Config::default());
        model.notice = Some("closing dialogs is disabled".to_string());
        let frame = render_frame(&model);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame[1], "! closing dialogs is disabled");
    }

    #[test]
    fn snapshot_serializes_state_and_dialog() {
        let mut model = StatusModel::new(&Config::default());
        feed(&mut model, 300, &[100, 150]);
        let json = serde_json::to_value(snapshot(&model)).unwrap();
        assert_eq!(json["state"]["internal_height"], 150);
        assert_eq!(json["state"]["estimated_time_left"], "4 minutes");
        assert_eq!(json["dialog"]["kind"], "syncing");
        assert_eq!(json["progress_text"], "33.33 %");
    }
}
