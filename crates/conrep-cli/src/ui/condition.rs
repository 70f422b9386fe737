//! The condition screen: description tree and attribute tabs.

use conrep_core::{attribute::AttributeKey, service::ConditionService};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs},
};

use super::approval_badge;
use crate::{
  app::{App, Tab},
  editor::{AttributeLine, NodeField},
};

pub fn draw<S: ConditionService>(f: &mut Frame, area: Rect, app: &App<S>) {
  let Some(condition) = &app.condition else {
    return;
  };

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // tabs
      Constraint::Length(1), // approvals
      Constraint::Min(0),    // editor
    ])
    .split(area);

  let selected = match app.tab {
    Tab::Description => 0,
    Tab::Attributes => 1,
  };
  let description_mark = if app.description.is_dirty() { "Description*" } else { "Description" };
  f.render_widget(
    Tabs::new(vec![description_mark, "Attributes"])
      .select(selected)
      .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
    rows[0],
  );

  let mut badges = vec![
    approval_badge("description", condition.is_approved),
    Span::raw("  "),
    approval_badge("attributes", condition.is_condition_attributes_approved),
    Span::raw("  "),
    approval_badge("topic tags", condition.is_topic_tags_approved),
  ];
  if condition.requires_management_plan {
    badges.push(Span::styled("  [management plan]", Style::default().fg(Color::Magenta)));
  }
  f.render_widget(Paragraph::new(Line::from(badges)), rows[1]);

  match app.tab {
    Tab::Description => draw_description(f, rows[2], app),
    Tab::Attributes => draw_attributes(f, rows[2], app),
  }
}

fn pane(title: &str) -> Block<'_> {
  Block::default()
    .title(format!(" {title} "))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray))
}

fn draft_style() -> Style { Style::default().fg(Color::Yellow) }

// ─── Description ──────────────────────────────────────────────────────────────

fn draw_description<S: ConditionService>(f: &mut Frame, area: Rect, app: &App<S>) {
  let editor = &app.description;
  let block = pane("Subconditions");
  let inner = block.inner(area);
  f.render_widget(block, area);

  if editor.tree().is_empty() {
    f.render_widget(
      Paragraph::new("No subconditions. Press A to add one.")
        .style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  let rows = editor.rows();
  let items: Vec<ListItem> = rows
    .iter()
    .enumerate()
    .map(|(i, row)| {
      let indent = "  ".repeat(row.depth);
      let node = row.node;
      let spans = match editor.draft(&node.id) {
        Some(draft) => {
          let focus = (i == editor.cursor()).then(|| editor.focus()).flatten();
          let caret = |field: NodeField| if focus == Some(field) { "_" } else { "" };
          vec![
            Span::raw(indent),
            Span::styled("✎ ", draft_style()),
            Span::styled(
              format!("{}{}", draft.identifier, caret(NodeField::Identifier)),
              draft_style().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(format!("{}{}", draft.text, caret(NodeField::Text)), draft_style()),
          ]
        }
        None => vec![
          Span::raw(indent),
          Span::styled(
            node.identifier.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
          ),
          Span::raw(" "),
          Span::raw(node.text.clone()),
        ],
      };
      ListItem::new(Line::from(spans))
    })
    .collect();

  let mut state = ListState::default();
  state.select(Some(editor.cursor()));
  f.render_stateful_widget(
    List::new(items).highlight_style(Style::default().bg(Color::Blue).fg(Color::White)),
    inner,
    &mut state,
  );
}

// ─── Attributes ───────────────────────────────────────────────────────────────

fn draw_attributes<S: ConditionService>(f: &mut Frame, area: Rect, app: &App<S>) {
  let editor = &app.attributes;
  let block = pane("Attributes");
  let inner = block.inner(area);
  f.render_widget(block, area);

  let lines = editor.lines();
  if lines.is_empty() {
    f.render_widget(
      Paragraph::new("No attributes.").style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  let attributes = editor.attributes();
  let items: Vec<ListItem> = lines
    .iter()
    .enumerate()
    .map(|(i, line)| match *line {
      AttributeLine::Plan(id) => {
        let (name, approved) = attributes
          .plan(id)
          .map_or(("", false), |p| (p.name.as_str(), p.is_approved));
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("▸ {name} "),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
          ),
          approval_badge("approved", approved),
        ]))
      }
      AttributeLine::Attribute { id, plan } => {
        let indent = if plan.is_some() { "    " } else { "  " };
        let label = Span::styled(
          format!("{indent}{:<44}", editor.key_label(id)),
          Style::default().fg(Color::Cyan),
        );
        let value = match editor.draft(id) {
          Some(draft) => {
            let caret = if i == editor.cursor() && editor.is_focused() { "_" } else { "" };
            Span::styled(format!("✎ {draft}{caret}"), draft_style())
          }
          None => {
            let attr = attributes.find(id);
            let required = attr
              .and_then(|a| a.known_key())
              .is_some_and(|k| is_required(app, k, plan));
            match attr {
              Some(attr) if attr.is_empty() && required => {
                Span::styled("(required)", Style::default().fg(Color::Red))
              }
              Some(attr) => Span::raw(attr.display_value()),
              None => Span::raw(""),
            }
          }
        };
        ListItem::new(Line::from(vec![label, value]))
      }
    })
    .collect();

  let mut state = ListState::default();
  state.select(Some(editor.cursor()));
  f.render_stateful_widget(
    List::new(items).highlight_style(Style::default().bg(Color::Blue).fg(Color::White)),
    inner,
    &mut state,
  );
}

/// Whether `key` is part of the requirement set its owner must fill in.
fn is_required<S: ConditionService>(app: &App<S>, key: AttributeKey, plan: Option<i64>) -> bool {
  let attributes = app.attributes.attributes();
  let owner = match plan {
    Some(id) => attributes.plan(id).map(|p| p.attributes.as_slice()),
    None => Some(attributes.independent_attributes.as_slice()),
  };
  owner.is_some_and(|attrs| {
    conrep_core::attribute::required_keys(attrs, plan.is_some()).contains(&key)
  })
}
