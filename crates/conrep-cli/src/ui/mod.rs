//! TUI rendering: header, body and status bar.

pub mod browser;
pub mod condition;

use chrono::Local;
use conrep_core::service::ConditionService;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, Screen, Tab};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw<S: ConditionService>(f: &mut Frame, app: &App<S>) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);
  match &app.screen {
    Screen::Projects | Screen::Documents | Screen::Conditions => browser::draw(f, rows[1], app),
    Screen::Condition => condition::draw(f, rows[1], app),
    Screen::NotFound(what) => draw_not_found(f, rows[1], what),
  }
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header<S: ConditionService>(f: &mut Frame, area: Rect, app: &App<S>) {
  let date = Local::now().format("%Y-%m-%d").to_string();

  let mut crumbs = vec![" conrep".to_string()];
  if let Some(list) = &app.conditions {
    crumbs.push(list.project_name.clone());
    crumbs.push(list.document_label.clone());
  } else if let Some(project) = app
    .project_id
    .as_ref()
    .and_then(|id| app.projects.iter().find(|p| &p.project_id == id))
  {
    crumbs.push(project.project_name.clone());
  }
  if let Some(condition) = &app.condition {
    crumbs.push(condition.title());
  }

  let left = Span::styled(
    crumbs.join(" › "),
    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(format!("{date} "), Style::default().fg(Color::DarkGray));

  let pad = area
    .width
    .saturating_sub(left.width() as u16)
    .saturating_sub(right.width() as u16);
  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Not found ────────────────────────────────────────────────────────────────

fn draw_not_found(f: &mut Frame, area: Rect, what: &str) {
  let block = Block::default()
    .title(" Not found ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Red));
  let inner = block.inner(area);
  f.render_widget(block, area);
  let lines = vec![
    Line::from(Span::styled(
      "The requested record does not exist.",
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    Line::from(Span::styled(what.to_string(), Style::default().fg(Color::DarkGray))),
    Line::from(""),
    Line::from(Span::styled(
      "Press Esc to return to the project list.",
      Style::default().fg(Color::DarkGray),
    )),
  ];
  f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status<S: ConditionService>(f: &mut Frame, area: Rect, app: &App<S>) {
  let editing = app.description.focus().is_some() || app.attributes.is_focused();
  let (mode_label, hints) = match &app.screen {
    _ if app.filter_active => ("SEARCH", "Type to filter  Esc cancel  Enter select"),
    Screen::Projects => ("PROJECTS", "↑↓/jk navigate  / search  Enter open  q quit"),
    Screen::Documents => ("DOCUMENTS", "↑↓/jk navigate  / search  Enter open  Esc back  q quit"),
    Screen::Conditions => (
      "CONDITIONS",
      "↑↓/jk navigate  / search  Enter open  n new  c copy  Esc back",
    ),
    Screen::Condition if editing => ("EDIT", "Type to edit  Tab field  Enter commit  Esc leave"),
    Screen::Condition => match app.tab {
      Tab::Description => (
        "DESCRIPTION",
        "e edit  a child  A root  d delete  J/K move  u discard  s save  p approve  t tags  Tab attributes",
      ),
      Tab::Attributes => (
        "ATTRIBUTES",
        "e edit  u discard  s save  p approve  m plan  x delete plan  M plan required  Tab description",
      ),
    },
    Screen::NotFound(_) => ("NOT FOUND", "Esc back  q quit"),
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(format!("  {status}"), Style::default().fg(Color::DarkGray));

  f.render_widget(
    Paragraph::new(Line::from(vec![mode_span, hint_span])).style(Style::default().bg(Color::Black)),
    area,
  );
}

/// `✓ label` in green or `○ label` in grey.
pub(crate) fn approval_badge(label: &str, approved: bool) -> Span<'static> {
  if approved {
    Span::styled(format!("✓ {label}"), Style::default().fg(Color::Green))
  } else {
    Span::styled(format!("○ {label}"), Style::default().fg(Color::DarkGray))
  }
}
