use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};

use hbuild_core::{PackageInfo, PackageList};
use hbuild_graph::RenderedGraph;
use hbuild_sync::{LogView, PollState};

/// Which panel is currently focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Packages,
    Log,
    Graph,
}

impl Panel {
    pub fn next(self) -> Self {
        match self {
            Panel::Packages => Panel::Log,
            Panel::Log => Panel::Graph,
            Panel::Graph => Panel::Packages,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Panel::Packages => Panel::Graph,
            Panel::Log => Panel::Packages,
            Panel::Graph => Panel::Log,
        }
    }
}

/// Work a key press asks of the live services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Refresh,
    Build(PackageInfo),
}

/// Application state for the TUI. Holds snapshots only; the services that
/// produce them live in the run loop.
pub struct App {
    pub should_quit: bool,
    pub active_panel: Panel,

    // Data
    pub packages: PollState<PackageList>,
    pub graph: Option<Arc<RenderedGraph>>,
    pub graph_error: Option<String>,
    pub log: Option<LogView>,
    /// Last build outcome or other one-off notice.
    pub notice: Option<String>,

    // Selection and scroll positions
    pub selected: usize,
    /// Lines scrolled up from the bottom of the log.
    pub log_scroll: usize,
    pub graph_scroll: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            active_panel: Panel::Packages,
            packages: PollState::default(),
            graph: None,
            graph_error: None,
            log: None,
            notice: None,
            selected: 0,
            log_scroll: 0,
            graph_scroll: 0,
        }
    }

    pub fn package_list(&self) -> &[PackageInfo] {
        self.packages
            .data
            .as_deref()
            .map(|l| l.packages.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_package(&self) -> Option<&PackageInfo> {
        self.package_list().get(self.selected)
    }

    /// New status snapshot. Keeps the same package selected when it moved.
    pub fn set_packages(&mut self, state: PollState<PackageList>) {
        let current = self.selected_package().map(|p| p.name.clone());
        self.packages = state;
        let list = self.package_list();
        self.selected = current
            .and_then(|name| list.iter().position(|p| p.name == name))
            .unwrap_or_else(|| self.selected.min(list.len().saturating_sub(1)));
    }

    pub fn set_log(&mut self, view: LogView) {
        if self.log.as_ref().map(|l| l.package.as_str()) != Some(view.package.as_str()) {
            self.log_scroll = 0;
        }
        self.log = Some(view);
    }

    pub fn set_graph(&mut self, graph: Result<Arc<RenderedGraph>, String>) {
        match graph {
            Ok(g) => {
                self.graph = Some(g);
                self.graph_error = None;
            }
            Err(e) => self.graph_error = Some(e),
        }
    }

    /// Handle a key press.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.active_panel = self.active_panel.next(),
            KeyCode::BackTab => self.active_panel = self.active_panel.prev(),
            KeyCode::Char('j') | KeyCode::Down => self.scroll_down(),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_up(),
            KeyCode::Char('r') => return Some(Action::Refresh),
            KeyCode::Char('b') => {
                return self.selected_package().cloned().map(Action::Build);
            }
            _ => {}
        }
        None
    }

    fn scroll_down(&mut self) {
        match self.active_panel {
            Panel::Packages => {
                if self.selected + 1 < self.package_list().len() {
                    self.selected += 1;
                }
            }
            Panel::Log => self.log_scroll = self.log_scroll.saturating_sub(1),
            Panel::Graph => {
                let max = self.graph.as_ref().map_or(0, |g| g.layout.nodes.len());
                if self.graph_scroll + 1 < max {
                    self.graph_scroll += 1;
                }
            }
        }
    }

    fn scroll_up(&mut self) {
        match self.active_panel {
            Panel::Packages => self.selected = self.selected.saturating_sub(1),
            Panel::Log => {
                let lines = self.log.as_ref().map_or(0, |l| l.text.lines().count());
                if self.log_scroll + 1 < lines {
                    self.log_scroll += 1;
                }
            }
            Panel::Graph => self.graph_scroll = self.graph_scroll.saturating_sub(1),
        }
    }
}
