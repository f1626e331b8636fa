//! Full-screen drawing for `wss watch`.
//!
//! Fixed layout redrawn on every render command: header, progress gauge,
//! status line, the mounted dialog as a framed box, the last notice and the
//! key help. Text comes from [`super::render`]; this module only positions
//! and colors it.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Attribute, Color, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use crate::monitor::ewma::RateTrend;

use super::input::HELP;
use super::model::StatusModel;
use super::render::{dialog_line, status_line};

/// Horizontal bar like `[██████░░░░] 60.00 %`.
#[must_use]
pub fn render_gauge(percentage: f64, width: usize) -> String {
    let pct = percentage.clamp(0.0, 100.0);
    let filled = ((pct / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!(
        "[{}{}] {pct:.2} %",
        "█".repeat(filled),
        "░".repeat(width - filled)
    )
}

const fn trend_color(trend: RateTrend) -> Color {
    match trend {
        RateTrend::Accelerating => Color::Green,
        RateTrend::Stable => Color::White,
        RateTrend::Decelerating => Color::Yellow,
        RateTrend::Stalled => Color::Red,
        RateTrend::Unknown => Color::DarkGrey,
    }
}

/// Draw one frame. Does not flush.
pub fn draw<W: Write>(out: &mut W, model: &StatusModel, width: u16) -> io::Result<()> {
    let width = usize::from(width);
    let state = model.tracker.state();
    let mut row = 0_u16;

    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;

    queue!(
        out,
        MoveTo(0, row),
        SetForegroundColor(Color::Cyan),
        SetAttribute(Attribute::Bold)
    )?;
    write!(out, " Wallet sync status v{}", env!("CARGO_PKG_VERSION"))?;
    queue!(out, SetAttribute(Attribute::Reset))?;
    row += 2;

    let gauge_width = width.saturating_sub(20).clamp(10, 50);
    let gauge_color = if state.heights_known() && state.remaining_blocks == 0 {
        Color::Green
    } else {
        Color::Yellow
    };
    queue!(out, MoveTo(2, row), SetForegroundColor(gauge_color))?;
    write!(out, "{}", render_gauge(state.percentage, gauge_width))?;
    queue!(out, SetAttribute(Attribute::Reset))?;
    row += 1;

    queue!(out, MoveTo(2, row), SetForegroundColor(trend_color(state.rate_trend)))?;
    write!(out, "{}", status_line(state))?;
    queue!(out, SetAttribute(Attribute::Reset))?;
    row += 2;

    if let Some(line) = dialog_line(model) {
        let inner = line.chars().count().min(width.saturating_sub(6));
        let body: String = line.chars().take(inner).collect();
        let border = "─".repeat(inner + 2);
        let color = if model.modal.session().is_some_and(|s| !s.closable) {
            Color::Red
        } else {
            Color::White
        };
        queue!(out, SetForegroundColor(color))?;
        queue!(out, MoveTo(2, row))?;
        write!(out, "┌{border}┐")?;
        queue!(out, MoveTo(2, row + 1))?;
        write!(out, "│ {body} │")?;
        queue!(out, MoveTo(2, row + 2))?;
        write!(out, "└{border}┘")?;
        queue!(out, SetAttribute(Attribute::Reset))?;
        row += 4;
    }

    if let Some(notice) = &model.notice {
        queue!(out, MoveTo(2, row), SetForegroundColor(Color::Yellow))?;
        write!(out, "! {notice}")?;
        queue!(out, SetAttribute(Attribute::Reset))?;
        row += 2;
    }

    let help = HELP
        .iter()
        .map(|h| format!("{} {}", h.keys, h.description))
        .collect::<Vec<_>>()
        .join("  ");
    queue!(out, MoveTo(2, row), SetForegroundColor(Color::DarkGrey))?;
    write!(out, "{help}")?;
    queue!(out, SetAttribute(Attribute::Reset))?;
    Ok(())
}
