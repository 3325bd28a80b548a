use std::fmt::Write as _;

use hbuild_core::HistoryList;
use hbuild_sync::HistorySource;

use crate::context::Context;

/// `hbctl history [--limit N]`
pub fn execute(ctx: &Context, limit: usize) -> anyhow::Result<()> {
    let history = ctx.fetch(HistorySource::new(ctx.server()?))?;
    print!("{}", render(&history, limit));
    Ok(())
}

/// Newest job first. `limit == 0` shows everything.
fn render(history: &HistoryList, limit: usize) -> String {
    if history.past_jobs.is_empty() {
        return "No past jobs.\n".to_string();
    }
    let mut jobs: Vec<_> = history.past_jobs.iter().collect();
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    if limit > 0 {
        jobs.truncate(limit);
    }

    let mut out = String::new();
    for job in jobs {
        let _ = writeln!(
            out,
            "#{:<5} {}  {:<10} {}",
            job.id,
            job.created_at_rfc3339(),
            job.runner,
            job.packages.join(", ")
        );
    }
    out
}
