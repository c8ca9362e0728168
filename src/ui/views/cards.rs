use crate::board::{Card, RateCard};
use crate::ui::renderfns::truncate;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Card size in terminal cells
const CARD_WIDTH: u16 = 32;
const CARD_HEIGHT: u16 = 7;

/// Number of card columns that fit in `width` (at least one).
pub fn grid_columns(width: u16) -> usize {
  (width / CARD_WIDTH).max(1) as usize
}

/// Cell rectangle of card `index`, or None when it falls below `area`.
pub fn card_rect(area: Rect, index: usize) -> Option<Rect> {
  let cols = grid_columns(area.width);
  let row = (index / cols) as u16;
  let col = (index % cols) as u16;

  let y = area.y.checked_add(row.checked_mul(CARD_HEIGHT)?)?;
  if y + CARD_HEIGHT > area.bottom() {
    return None;
  }

  let x = area.x + col * CARD_WIDTH;
  let width = CARD_WIDTH.min(area.right().saturating_sub(x));
  Some(Rect::new(x, y, width, CARD_HEIGHT))
}

pub fn draw_cards(frame: &mut Frame, area: Rect, cards: &[Card]) {
  if cards.is_empty() {
    let paragraph = Paragraph::new("Loading rates...").style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  for (i, card) in cards.iter().enumerate() {
    let Some(rect) = card_rect(area, i) else {
      break;
    };
    match card {
      Card::Rate(rate) => draw_rate_card(frame, rect, rate),
      Card::Placeholder { title, detail } => draw_placeholder(frame, rect, title, detail),
    }
  }
}

fn draw_rate_card(frame: &mut Frame, area: Rect, rate: &RateCard) {
  let inner_width = area.width.saturating_sub(2) as usize;

  let block = Block::default()
    .title(format!(" {} ", truncate(&rate.title, inner_width.saturating_sub(2))))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let lines = vec![
    Line::from(vec![
      Span::styled(
        truncate(&rate.pair, inner_width.saturating_sub(9)),
        Style::default().fg(Color::Cyan),
      ),
      Span::raw(" "),
      Span::styled("● Online", Style::default().fg(Color::Green)),
    ]),
    Line::from(""),
    Line::from(vec![
      Span::styled(rate.value.clone(), Style::default().fg(Color::White).bold()),
      Span::raw(" "),
      Span::styled(rate.unit.clone(), Style::default().fg(Color::Yellow)),
    ]),
    Line::from(""),
    Line::from(Span::styled(
      truncate(&format!("Last load: {}", rate.updated), inner_width),
      Style::default().fg(Color::DarkGray),
    )),
  ];

  frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_placeholder(frame: &mut Frame, area: Rect, title: &str, detail: &str) {
  let block = Block::default()
    .title(format!(" {} ", title))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let paragraph = Paragraph::new(detail.to_string())
    .block(block)
    .wrap(Wrap { trim: true })
    .style(Style::default().fg(Color::DarkGray));

  frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_grid_columns() {
    assert_eq!(grid_columns(10), 1);
    assert_eq!(grid_columns(64), 2);
    assert_eq!(grid_columns(100), 3);
  }

  #[test]
  fn test_card_rect_layout() {
    let area = Rect::new(0, 2, 70, 15);
    assert_eq!(card_rect(area, 0), Some(Rect::new(0, 2, 32, 7)));
    assert_eq!(card_rect(area, 1), Some(Rect::new(32, 2, 32, 7)));
    assert_eq!(card_rect(area, 2), Some(Rect::new(0, 9, 32, 7)));
    // Third row would end below the area
    assert_eq!(card_rect(area, 4), None);
  }

  #[test]
  fn test_narrow_area_clips_width() {
    let area = Rect::new(0, 0, 20, 7);
    assert_eq!(card_rect(area, 0), Some(Rect::new(0, 0, 20, 7)));
  }
}
