use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with title, server timestamp and local clock
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  server_updated: &str,
  client_now: &str,
) {
  let header = Line::from(vec![
    Span::styled(" ratemon ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(" Server updated ", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!("{} ", server_updated),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(" Now ", Style::default().fg(Color::DarkGray)),
    Span::styled(format!("{} ", client_now), Style::default().fg(Color::White)),
  ]);

  let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}
