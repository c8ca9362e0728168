//! Markup rendering of the board.
//!
//! Produces the same structure the static page styles expect: a header
//! with the two time labels and the status subline, then the card grid.

use super::{Board, Card};
use crate::rates::format::escape_html;

pub fn render_html(board: &Board) -> String {
  let mut out = String::new();

  out.push_str("<header class=\"top\">\n");
  out.push_str(&format!(
    "  <div class=\"small\">Server updated: <span id=\"serverUpdated\">{}</span></div>\n",
    escape_html(board.server_updated())
  ));
  out.push_str(&format!(
    "  <div class=\"small\">Now: <span id=\"clientNow\">{}</span></div>\n",
    escape_html(board.client_now())
  ));
  out.push_str(&format!(
    "  <div id=\"subline\" class=\"subline\">{}</div>\n",
    escape_html(board.status().message())
  ));
  out.push_str("</header>\n");

  out.push_str("<section id=\"ratesGrid\" class=\"grid\">\n");
  for card in board.cards() {
    out.push_str(&render_card(card));
  }
  out.push_str("</section>\n");

  out
}

fn render_card(card: &Card) -> String {
  match card {
    Card::Rate(r) => format!(
      r#"<article class="card">
  <div class="card__head">
    <div>
      <div class="title">{title}</div>
      <div class="pair">{pair}</div>
    </div>
    <div class="badge"><span class="dot" aria-hidden="true"></span><span>Online</span></div>
  </div>
  <div class="rate">
    <div class="rate__value">{value}</div>
    <div class="rate__unit">{unit}</div>
  </div>
  <div class="small">Last load: <span>{updated}</span></div>
</article>
"#,
      title = escape_html(&r.title),
      pair = escape_html(&r.pair),
      value = escape_html(&r.value),
      unit = escape_html(&r.unit),
      updated = escape_html(&r.updated),
    ),
    Card::Placeholder { title, detail } => format!(
      "<div class=\"card\"><div class=\"title\">{}</div><div class=\"small\">{}</div></div>\n",
      escape_html(title),
      escape_html(detail)
    ),
  }
}
