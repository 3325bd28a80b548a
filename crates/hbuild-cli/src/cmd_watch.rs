use crate::context::Context;

/// Launch the live view.
///
/// With the `tui` feature (default): opens the interactive ratatui TUI.
/// Without: prints status changes to stdout until Ctrl-C.
pub fn execute(ctx: &Context) -> anyhow::Result<()> {
    #[cfg(feature = "tui")]
    {
        crate::tui::run(ctx)
    }

    #[cfg(not(feature = "tui"))]
    {
        plain::run(ctx)
    }
}

#[cfg_attr(feature = "tui", allow(dead_code))]
mod plain {
    use hbuild_core::StatusDiff;
    use hbuild_sync::{PackagesSource, PollOptions, StatusPoller};
    use tokio_util::sync::CancellationToken;

    use crate::context::Context;

    pub fn run(ctx: &Context) -> anyhow::Result<()> {
        let server = ctx.server()?;
        let options = PollOptions::new(ctx.config.status_interval())
            .with_timeout(ctx.config.request_timeout());

        let cancel = CancellationToken::new();
        let handler_cancel = cancel.clone();
        let _ = ctrlc::set_handler(move || handler_cancel.cancel());

        eprintln!("hbctl watch (plain mode, rebuild with `tui` feature for interactive UI)");
        eprintln!("Press Ctrl-C to stop.\n");

        ctx.runtime()?.block_on(async {
            let poller = StatusPoller::start(PackagesSource::new(server), options);
            let mut rx = poller.subscribe();
            let mut seen_revision = 0;
            let mut last_error: Option<String> = None;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let state = rx.borrow_and_update().clone();
                if state.revision != seen_revision {
                    seen_revision = state.revision;
                    for line in describe(&state.diff()) {
                        println!("{line}");
                    }
                }
                let error = state.error().map(str::to_string);
                if error != last_error {
                    if let Some(e) = &error {
                        eprintln!("error: {e}");
                    }
                    last_error = error;
                }
            }
            poller.stop();
        });
        Ok(())
    }

    pub fn describe(diff: &StatusDiff) -> Vec<String> {
        let mut lines = Vec::new();
        for name in &diff.added {
            lines.push(format!("+ {name}"));
        }
        for name in &diff.removed {
            lines.push(format!("- {name}"));
        }
        for change in &diff.changed {
            lines.push(format!("  {}: {} -> {}", change.name, change.from, change.to));
        }
        lines
    }

}
