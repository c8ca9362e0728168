use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use super::utils::{status_color, truncate};
use crate::board::Status;
use crate::worker::WorkerState;

/// Draw the status subline: connectivity, offline cache state, last error
pub fn draw_status_line(
  frame: &mut Frame,
  area: Rect,
  status: Status,
  worker: Option<WorkerState>,
  last_error: Option<&str>,
) {
  let mut spans = vec![
    Span::raw(" "),
    Span::styled("●", Style::default().fg(status_color(status))),
    Span::raw(" "),
    Span::styled(status.message(), Style::default().fg(Color::White)),
  ];

  let cache_label = match worker {
    Some(WorkerState::Activated) => "offline cache ready",
    Some(WorkerState::Redundant) | None => "no offline cache",
    Some(_) => "offline cache starting",
  };
  spans.push(Span::styled("  │  ", Style::default().fg(Color::DarkGray)));
  spans.push(Span::styled(cache_label, Style::default().fg(Color::DarkGray)));

  if let Some(err) = last_error {
    spans.push(Span::styled("  │  ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      truncate(err, 60),
      Style::default().fg(Color::Red),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
