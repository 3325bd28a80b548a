use std::io::Write;

use tokio_util::sync::CancellationToken;

use hbuild_client::LogTransportKind;
use hbuild_sync::{ChannelState, LogBuffer, LogOptions, LogStreamConsumer, LogTransport, LogsSource};

use crate::context::Context;

/// `hbctl log <name>`: one snapshot, printed in id order.
pub fn print(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let snapshot = ctx.fetch(LogsSource::new(ctx.server()?, name))?;
    let mut buffer = LogBuffer::new();
    buffer.merge(snapshot.logs);
    if buffer.is_empty() {
        eprintln!("No log output for {name}.");
        return Ok(());
    }
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(buffer.render().as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// `hbctl log <name> --follow`: print output as it arrives until Ctrl-C.
pub fn follow(ctx: &Context, name: &str, poll: bool) -> anyhow::Result<()> {
    let server = ctx.server()?;
    let mut options = LogOptions::from_config(&ctx.config);
    if poll {
        options.transport = LogTransportKind::Poll;
    }

    let cancel = CancellationToken::new();
    ctrlc_cancel(cancel.clone());

    ctx.runtime()?.block_on(async {
        let consumer = LogStreamConsumer::start(server, name, options);
        let mut rx = consumer.subscribe();
        let mut shown = String::new();
        let mut last_state = ChannelState::Connecting;
        let mut last_transport = rx.borrow().transport;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            let view = rx.borrow_and_update().clone();

            if view.transport != last_transport && view.transport == LogTransport::Poll {
                eprintln!("[server does not stream logs, polling every {:?}]", ctx.config.log_interval());
            }
            last_transport = view.transport;
            if view.state != last_state {
                if let ChannelState::Reconnecting { attempt } = view.state {
                    let reason = view.error.as_deref().unwrap_or("connection lost");
                    eprintln!("[reconnecting, attempt {attempt}: {reason}]");
                }
                last_state = view.state;
            }

            let mut stdout = std::io::stdout().lock();
            match unseen(&shown, &view.text) {
                Some(tail) => stdout.write_all(tail.as_bytes())?,
                None => {
                    eprintln!("\n[earlier output arrived late, reprinting]");
                    stdout.write_all(view.text.as_bytes())?;
                }
            }
            stdout.flush()?;
            shown.clear();
            shown.push_str(&view.text);
        }

        consumer.stop();
        Ok::<_, anyhow::Error>(())
    })
}

/// Part of `text` not printed yet, or `None` if already printed output changed.
fn unseen<'a>(shown: &str, text: &'a str) -> Option<&'a str> {
    text.strip_prefix(shown)
}

fn ctrlc_cancel(cancel: CancellationToken) {
    let _ = ctrlc::set_handler(move || {
        cancel.cancel();
    });
}
