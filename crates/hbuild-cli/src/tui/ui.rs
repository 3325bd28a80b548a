use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use hbuild_core::BuildState;
use hbuild_sync::{ChannelState, LogTransport};

use super::app::{App, Panel};

/// Render the full TUI frame.
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // main area
            Constraint::Length(1), // status bar
        ])
        .split(f.area());

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30), // packages
            Constraint::Percentage(70), // log + graph
        ])
        .split(chunks[0]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(65), // log
            Constraint::Percentage(35), // graph
        ])
        .split(main_chunks[1]);

    render_packages(f, app, main_chunks[0]);
    render_log(f, app, right_chunks[0]);
    render_graph(f, app, right_chunks[1]);
    render_status_bar(f, app, chunks[1]);
}

fn panel_style(app: &App, panel: Panel) -> Style {
    if app.active_panel == panel {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn state_color(state: BuildState) -> Color {
    match state {
        BuildState::Unbuilt => Color::DarkGray,
        BuildState::Configured => Color::Yellow,
        BuildState::Built => Color::Blue,
        BuildState::Installed => Color::Green,
    }
}

fn render_packages(f: &mut Frame, app: &App, area: Rect) {
    let packages = app.package_list();
    let title = format!(" Packages ({}) ", packages.len());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(panel_style(app, Panel::Packages));

    if packages.is_empty() {
        let msg = if app.packages.is_failed() {
            "Server unreachable"
        } else if app.packages.data.is_none() {
            "Loading..."
        } else {
            "No packages"
        };
        let p = Paragraph::new(msg).alignment(Alignment::Center).block(block);
        f.render_widget(p, area);
        return;
    }

    // Keep the selection on screen.
    let height = area.height.saturating_sub(2) as usize;
    let skip = (app.selected + 1).saturating_sub(height.max(1));

    let items: Vec<ListItem> = packages
        .iter()
        .enumerate()
        .skip(skip)
        .map(|(i, pkg)| {
            let state = pkg.aggregate_status();
            let name_style = if i == app.selected {
                Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {:<10}", state.as_str()), Style::default().fg(state_color(state))),
                Span::styled(format!(" {}", pkg.name), name_style),
            ]))
        })
        .collect();

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

fn render_log(f: &mut Frame, app: &App, area: Rect) {
    let Some(view) = &app.log else {
        let block = Block::default()
            .title(" Log ")
            .borders(Borders::ALL)
            .border_style(panel_style(app, Panel::Log));
        let p = Paragraph::new("Select a package").alignment(Alignment::Center).block(block);
        f.render_widget(p, area);
        return;
    };

    let transport = match view.transport {
        LogTransport::Push => "stream",
        LogTransport::Poll => "poll",
    };
    let state = match view.state {
        ChannelState::Connecting => "connecting".to_string(),
        ChannelState::Open => "live".to_string(),
        ChannelState::Reconnecting { attempt } => format!("reconnecting #{attempt}"),
        ChannelState::Closed => "closed".to_string(),
    };
    let title = format!(" Log: {} [{transport}, {state}] ", view.package);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(panel_style(app, Panel::Log));

    // Tail of the log, `log_scroll` lines up from the bottom.
    let lines: Vec<&str> = view.text.lines().collect();
    let height = area.height.saturating_sub(2) as usize;
    let end = lines.len().saturating_sub(app.log_scroll);
    let start = end.saturating_sub(height);
    let text: Vec<Line> = lines[start..end].iter().map(|l| Line::from(*l)).collect();

    let p = Paragraph::new(text).block(block);
    f.render_widget(p, area);
}

fn render_graph(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Graph ")
        .borders(Borders::ALL)
        .border_style(panel_style(app, Panel::Graph));

    let Some(graph) = &app.graph else {
        let msg = app.graph_error.as_deref().unwrap_or("Loading...");
        let p = Paragraph::new(msg).alignment(Alignment::Center).block(block);
        f.render_widget(p, area);
        return;
    };

    let text = crate::cmd_graph::render_text(graph);
    let lines: Vec<Line> = text
        .lines()
        .skip(app.graph_scroll)
        .map(|l| {
            if l.starts_with("warning:") {
                Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Yellow)))
            } else {
                Line::from(l.to_string())
            }
        })
        .collect();
    let p = Paragraph::new(lines).block(block);
    f.render_widget(p, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let panel_name = match app.active_panel {
        Panel::Packages => "Packages",
        Panel::Log => "Log",
        Panel::Graph => "Graph",
    };
    let (text, style) = match app.packages.error() {
        Some(err) if app.packages.is_failed() => (
            format!(" ERROR: {err}"),
            Style::default().fg(Color::White).bg(Color::Red),
        ),
        Some(err) => (
            format!(" STALE: {err} (showing last good data)"),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
        None => {
            let notice = app
                .notice
                .as_deref()
                .map(|n| format!(" | {n}"))
                .unwrap_or_default();
            (
                format!(
                    " hbctl watch | {panel_name}{notice} | Tab:switch  j/k:move  b:build  r:refresh  q:quit"
                ),
                Style::default().fg(Color::White).bg(Color::DarkGray),
            )
        }
    };
    let bar = Paragraph::new(Line::from(Span::styled(text, style)));
    f.render_widget(bar, area);
}
