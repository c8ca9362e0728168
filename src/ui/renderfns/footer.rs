use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the bottom bar with key hints
pub fn draw_footer(frame: &mut Frame, area: Rect) {
  let hints = Line::from(vec![
    Span::styled(" r", Style::default().fg(Color::Cyan)),
    Span::styled(":refresh  ", Style::default().fg(Color::DarkGray)),
    Span::styled("q", Style::default().fg(Color::Cyan)),
    Span::styled(":quit  ", Style::default().fg(Color::DarkGray)),
    Span::styled("Ctrl-C", Style::default().fg(Color::Cyan)),
    Span::styled(":quit", Style::default().fg(Color::DarkGray)),
  ]);

  frame.render_widget(Paragraph::new(hints), area);
}

#[cfg(test)]
mod tests {
  use super::*;
  use ratatui::backend::TestBackend;

  #[test]
  fn test_footer_lists_key_hints() {
    let mut terminal = Terminal::new(TestBackend::new(40, 1)).unwrap();
    terminal
      .draw(|frame| draw_footer(frame, frame.area()))
      .unwrap();

    let line: String = terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect();
    assert!(line.starts_with(" r:refresh  q:quit  Ctrl-C:quit"));
  }
}
