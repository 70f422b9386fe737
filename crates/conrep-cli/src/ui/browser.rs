//! Project, document and condition lists with a detail pane for the item
//! under the cursor.

use conrep_core::service::ConditionService;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use super::approval_badge;
use crate::app::{App, Screen};

pub fn draw<S: ConditionService>(f: &mut Frame, area: Rect, app: &App<S>) {
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
    .split(area);

  draw_list(f, cols[0], app);
  draw_detail(f, cols[1], app);
}

// ─── List pane ────────────────────────────────────────────────────────────────

fn draw_list<S: ConditionService>(f: &mut Frame, area: Rect, app: &App<S>) {
  let labels = app.list_labels();
  let filtered = app.filtered_indices();
  let noun = match app.screen {
    Screen::Documents => "Documents",
    Screen::Conditions => "Conditions",
    _ => "Projects",
  };

  let title = if app.filter_active || !app.filter.is_empty() {
    format!(" {noun} ({}/{}) ", filtered.len(), labels.len())
  } else {
    format!(" {noun} ({}) ", labels.len())
  };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let items: Vec<ListItem> = filtered
    .iter()
    .map(|&i| {
      let mut spans = vec![Span::raw(labels[i].clone())];
      if app.screen == Screen::Conditions {
        if let Some(c) = app.conditions.as_ref().and_then(|l| l.conditions.get(i)) {
          let mark = if c.is_approved && c.is_condition_attributes_approved { "  ✓" } else { "" };
          spans.push(Span::styled(mark, Style::default().fg(Color::Green)));
        }
      }
      ListItem::new(Line::from(spans))
    })
    .collect();

  let mut inner = block.inner(area);
  f.render_widget(block, area);

  if (app.filter_active || !app.filter.is_empty()) && inner.height > 2 {
    let filter_area = Rect {
      x:      inner.x,
      y:      inner.y + inner.height - 1,
      width:  inner.width,
      height: 1,
    };
    inner.height -= 1;
    let text = if app.filter_active {
      format!("/{}_", app.filter)
    } else {
      format!("/{}", app.filter)
    };
    f.render_widget(
      Paragraph::new(text).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  let mut state = ListState::default();
  state.select((!filtered.is_empty()).then_some(app.list_cursor));
  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner,
    &mut state,
  );
}

// ─── Detail pane ──────────────────────────────────────────────────────────────

fn draw_detail<S: ConditionService>(f: &mut Frame, area: Rect, app: &App<S>) {
  let block = Block::default()
    .title(" Detail ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let lines = match app.cursor_index() {
    Some(i) => detail_lines(app, i),
    None => vec![Line::from(Span::styled(
      "Nothing here.",
      Style::default().fg(Color::DarkGray),
    ))],
  };
  f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn field(label: &str, value: String) -> Line<'static> {
  Line::from(vec![
    Span::styled(
      format!("{label:<12}"),
      Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ),
    Span::raw(value),
  ])
}

fn detail_lines<S: ConditionService>(app: &App<S>, i: usize) -> Vec<Line<'static>> {
  let mut lines = Vec::new();
  match app.screen {
    Screen::Projects => {
      let Some(project) = app.projects.get(i) else {
        return lines;
      };
      lines.push(field("project", project.project_name.clone()));
      lines.push(field("type", project.project_type.clone().unwrap_or_default()));
      lines.push(Line::from(""));
      for doc in &project.documents {
        lines.push(Line::from(format!("  {}", doc.document_label)));
      }
    }
    Screen::Documents => {
      let Some(doc) = app.documents.get(i) else {
        return lines;
      };
      lines.push(field("document", doc.document_label.clone()));
      lines.push(field("type", doc.document_type.clone().unwrap_or_default()));
      lines.push(field(
        "issued",
        doc.date_issued.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
      ));
      lines.push(field("status", doc.status_label().to_string()));
      lines.push(field("amendments", doc.amendment_count.to_string()));
    }
    Screen::Conditions => {
      let Some(c) = app.cursor_condition() else {
        return lines;
      };
      lines.push(field("condition", c.title()));
      lines.push(Line::from(vec![
        approval_badge("description", c.is_approved),
        Span::raw("  "),
        approval_badge("attributes", c.is_condition_attributes_approved),
      ]));
      if let Some(names) = &c.amendment_names {
        lines.push(field("amended by", names.clone()));
      }
      if !app.amendments.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
          "Amendments of this document",
          Style::default().add_modifier(Modifier::BOLD),
        )));
        for a in &app.amendments {
          let date = a.date_issued.map(|d| d.format(" (%Y-%m-%d)").to_string()).unwrap_or_default();
          lines.push(Line::from(format!("  {}{date}", a.amendment_name)));
        }
      }
    }
    Screen::Condition | Screen::NotFound(_) => {}
  }
  lines
}
