//! Pure update function: applies a [`StatusMsg`] to the [`StatusModel`] and
//! describes the resulting side-effects as a [`StatusCmd`].
//!
//! The tracker's auto-open verdict is routed to the orchestrator here, which
//! is the only place the two components meet.

use crate::ingest::HeightEvent;
use crate::logger::activity::ActivityEvent;
use crate::modal::content::DialogKind;
use crate::modal::orchestrator::{CloseOutcome, ModalRequest, ModalSession};
use crate::monitor::sync_tracker::{AutoOpen, HeightSample, SuppressReason};

use super::model::{StatusCmd, StatusModel, StatusMsg};

pub fn update(model: &mut StatusModel, msg: StatusMsg) -> StatusCmd {
    match msg {
        StatusMsg::Tick => {
            model.tick = model.tick.wrapping_add(1);
            StatusCmd::Render
        }

        StatusMsg::Heights(events) => {
            let mut cmds = Vec::with_capacity(events.len() * 2);
            for event in events {
                match event {
                    HeightEvent::Network(height) => {
                        model.tracker.on_network_sample(height);
                        cmds.push(StatusCmd::Log(ActivityEvent::NetworkHeight { height }));
                    }
                    HeightEvent::Internal(sample) => apply_internal(model, sample, &mut cmds),
                }
            }
            cmds.push(StatusCmd::Render);
            StatusCmd::batch(cmds)
        }

        StatusMsg::IngestFailed { source, error } => {
            model.ingest_errors += 1;
            StatusCmd::Log(ActivityEvent::IngestError {
                source: source.to_string(),
                code: error.code().to_string(),
                message: error.to_string(),
            })
        }

        StatusMsg::SourceExhausted { .. } => {
            model.live_sources = model.live_sources.saturating_sub(1);
            if model.stop_when_exhausted && model.live_sources == 0 {
                model.quit = true;
                StatusCmd::Quit
            } else {
                StatusCmd::None
            }
        }

        StatusMsg::UserOpen(request) => {
            let mut cmds = Vec::new();
            open_modal(model, request, &mut cmds);
            StatusCmd::batch(cmds)
        }

        StatusMsg::OpenSyncing => {
            model.tracker.mark_manually_opened();
            let mut cmds = Vec::new();
            open_modal(model, ModalRequest::forced(DialogKind::SYNCING), &mut cmds);
            StatusCmd::batch(cmds)
        }

        StatusMsg::Cancel => match model.modal.request_close() {
            CloseOutcome::Closed { session, reason } => {
                model.notice = None;
                model.tracker.note_dialog_dismissed(&session.kind);
                StatusCmd::batch(vec![
                    StatusCmd::Log(closed_event(&session, &reason.to_string())),
                    StatusCmd::Render,
                ])
            }
            CloseOutcome::NotClosable => {
                model.notice = Some("this dialog cannot be dismissed".to_string());
                StatusCmd::Render
            }
            CloseOutcome::Disabled => {
                model.notice = Some("closing dialogs is disabled".to_string());
                StatusCmd::Render
            }
            CloseOutcome::NoSession => StatusCmd::None,
        },

        StatusMsg::Close => match model.modal.close() {
            CloseOutcome::Closed { session, reason } => StatusCmd::batch(vec![
                StatusCmd::Log(closed_event(&session, &reason.to_string())),
                StatusCmd::Render,
            ]),
            _ => StatusCmd::None,
        },

        StatusMsg::SetEnableClose(enabled) => {
            model.modal.set_enable_close(enabled);
            StatusCmd::None
        }

        StatusMsg::Quit => {
            model.quit = true;
            StatusCmd::Quit
        }
    }
}

fn apply_internal(model: &mut StatusModel, sample: HeightSample, cmds: &mut Vec<StatusCmd>) {
    let verdict = model.tracker.ingest_internal(sample, &model.modal);
    let state = model.tracker.state();

    cmds.push(StatusCmd::Log(ActivityEvent::SyncSample {
        height: state.internal_height,
        network_height: state.network_height,
        percentage: state.percentage,
        increase_per_minute: state.increase_per_minute,
        eta: state.estimated_time_left.map(|t| t.to_string()),
    }));
    let percentage = state.percentage;
    let (height, network_height) = (state.internal_height, state.network_height);

    if model.forward_progress {
        model.modal.push_progress(percentage);
    }

    match verdict {
        AutoOpen::Request(request) => {
            model.last_suppression = None;
            open_modal(model, request, cmds);
        }
        AutoOpen::Suppressed(SuppressReason::DialogActive) => {}
        AutoOpen::Suppressed(reason) => {
            if model.last_suppression != Some(reason) {
                cmds.push(StatusCmd::Log(ActivityEvent::AutoOpenSuppressed {
                    reason: reason.to_string(),
                    height,
                    network_height,
                }));
            }
            model.last_suppression = Some(reason);
        }
        AutoOpen::NotNeeded => model.last_suppression = None,
    }
}

fn open_modal(model: &mut StatusModel, request: ModalRequest, cmds: &mut Vec<StatusCmd>) {
    match model.modal.open(request) {
        Ok(outcome) => {
            model.notice = None;
            model.dialogs_opened += 1;
            if let Some(replaced) = &outcome.replaced {
                cmds.push(StatusCmd::Log(closed_event(replaced, "replaced")));
            }
            let session = &outcome.session;
            cmds.push(StatusCmd::Log(ActivityEvent::ModalOpened {
                kind: session.kind.to_string(),
                instance: session.handle.get(),
                forced: session.force_open,
                closable: session.closable,
                replaced: outcome.replaced.as_ref().map(|s| s.kind.to_string()),
            }));
            cmds.push(StatusCmd::Render);
        }
        Err(err) => {
            model.notice = Some(err.to_string());
            cmds.push(StatusCmd::Log(ActivityEvent::from_error(&err)));
            cmds.push(StatusCmd::Render);
        }
    }
}

fn closed_event(session: &ModalSession, reason: &str) -> ActivityEvent {
    ActivityEvent::ModalClosed {
        kind: session.kind.to_string(),
        instance: session.handle.get(),
        reason: reason.to_string(),
    }
}
