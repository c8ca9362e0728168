mod renderfns;
mod views;

use crate::app::App;
use ratatui::prelude::*;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Length(1), // Status subline
      Constraint::Min(1),    // Cards
      Constraint::Length(1), // Key hints
    ])
    .split(frame.area());

  let board = app.board();

  renderfns::draw_header(
    frame,
    chunks[0],
    app.title(),
    board.server_updated(),
    board.client_now(),
  );
  renderfns::draw_status_line(
    frame,
    chunks[1],
    board.status(),
    app.worker_state(),
    board.last_error(),
  );
  views::cards::draw_cards(frame, chunks[2], board.cards());
  renderfns::draw_footer(frame, chunks[3]);
}
