mod app;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::{mpsc, watch};

use hbuild_client::{BuildAccepted, BuildServer, SubmitError};
use hbuild_core::{PackageGraph, PackageList};
use hbuild_graph::GraphBuilder;
use hbuild_sync::{
    GraphSource, LogOptions, LogStreamConsumer, LogView, PackagesSource, PollOptions, PollState,
    Poller, StatusPoller,
};

use crate::context::Context;
use app::{Action, App};

/// The graph changes only when packages are added, so it refreshes slower
/// than status.
const GRAPH_INTERVAL_FACTOR: u32 = 5;

/// Run the watch TUI until the user quits.
pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let rt = ctx.runtime()?;
    let _guard = rt.enter();
    let mut live = Live::start(ctx)?;

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut live);
    ratatui::restore();

    live.stop();
    result
}

fn event_loop(terminal: &mut ratatui::DefaultTerminal, live: &mut Live) -> anyhow::Result<()> {
    let mut app = App::new();

    loop {
        live.sync(&mut app);
        terminal.draw(|f| ui::render(f, &app))?;

        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(action) = app.handle_key(key) {
                        live.perform(action, &mut app);
                    }
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Background services feeding the [`App`].
struct Live {
    server: Arc<dyn BuildServer>,
    status: StatusPoller,
    status_rx: watch::Receiver<PollState<PackageList>>,
    graph: Poller<PackageGraph>,
    graph_rx: watch::Receiver<PollState<PackageGraph>>,
    builder: GraphBuilder,
    log: Option<(LogStreamConsumer, watch::Receiver<LogView>)>,
    log_options: LogOptions,
    builds_tx: mpsc::UnboundedSender<Result<BuildAccepted, SubmitError>>,
    builds_rx: mpsc::UnboundedReceiver<Result<BuildAccepted, SubmitError>>,
}

impl Live {
    /// Must be called inside a tokio runtime context.
    fn start(ctx: &Context) -> anyhow::Result<Self> {
        let server = ctx.server()?;
        let timeout = ctx.config.request_timeout();
        let status_interval = ctx.config.status_interval();

        let status = StatusPoller::start(
            PackagesSource::new(Arc::clone(&server)),
            PollOptions::new(status_interval).with_timeout(timeout),
        );
        let graph = Poller::start(
            GraphSource::new(Arc::clone(&server)),
            PollOptions::new(status_interval * GRAPH_INTERVAL_FACTOR).with_timeout(timeout),
        );
        let (builds_tx, builds_rx) = mpsc::unbounded_channel();

        Ok(Self {
            status_rx: status.subscribe(),
            graph_rx: graph.subscribe(),
            server,
            status,
            graph,
            builder: GraphBuilder::default(),
            log: None,
            log_options: LogOptions::from_config(&ctx.config),
            builds_tx,
            builds_rx,
        })
    }

    /// Copy whatever changed since the last frame into `app`.
    fn sync(&mut self, app: &mut App) {
        if self.status_rx.has_changed().unwrap_or(false) {
            app.set_packages(self.status_rx.borrow_and_update().clone());
        }

        if self.graph_rx.has_changed().unwrap_or(false) {
            let state = self.graph_rx.borrow_and_update().clone();
            if let Some(raw) = &state.data {
                app.set_graph(self.builder.build(raw).map_err(|e| e.to_string()));
            }
            if let Some(err) = state.error() {
                app.set_graph(Err(err.to_string()));
            }
        }

        self.follow(app.selected_package().map(|p| p.name.clone()));
        if let Some((_, rx)) = &mut self.log {
            if rx.has_changed().unwrap_or(false) {
                app.set_log(rx.borrow_and_update().clone());
            }
        }

        while let Ok(outcome) = self.builds_rx.try_recv() {
            match outcome {
                Ok(accepted) => {
                    let names: Vec<&str> = accepted
                        .request
                        .packages
                        .iter()
                        .map(|i| i.name.as_str())
                        .collect();
                    app.notice = Some(format!(
                        "queued {} of {}",
                        accepted.request.build_to.as_str(),
                        names.join(", ")
                    ));
                    self.status.refresh();
                }
                Err(e) => app.notice = Some(format!("build failed: {e}")),
            }
        }
    }

    /// Keep exactly one log consumer, attached to the selected package.
    fn follow(&mut self, package: Option<String>) {
        let current = self.log.as_ref().map(|(c, _)| c.latest().package);
        if current == package {
            return;
        }
        if let Some((consumer, _)) = self.log.take() {
            consumer.stop();
        }
        if let Some(name) = package {
            tracing::debug!(package = %name, "following log");
            let consumer =
                LogStreamConsumer::start(Arc::clone(&self.server), name, self.log_options.clone());
            let rx = consumer.subscribe();
            self.log = Some((consumer, rx));
        }
    }

    fn perform(&mut self, action: Action, app: &mut App) {
        match action {
            Action::Refresh => {
                self.status.refresh();
                self.graph.refresh();
                app.notice = None;
            }
            Action::Build(package) => {
                app.notice = Some(format!("submitting build of {}", package.name));
                let submitter = hbuild_client::BuildSubmitter::new(Arc::clone(&self.server));
                let tx = self.builds_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(submitter.submit_package(&package).await);
                });
            }
        }
    }

    fn stop(&mut self) {
        self.status.stop();
        self.graph.stop();
        if let Some((consumer, _)) = self.log.take() {
            consumer.stop();
        }
    }
}
