use std::fmt::Write as _;

use anyhow::Context as _;

use hbuild_core::{BuildState, PackageInfo, PackageList, ReturnCode};

use crate::context::Context;

/// `hbctl status [name]`
pub fn execute(ctx: &Context, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let server = ctx.server()?;
    let rt = ctx.runtime()?;

    let list = rt
        .block_on(server.packages())
        .context("failed to load packages")?;

    let Some(name) = name else {
        if json {
            println!("{}", serde_json::to_string_pretty(&list)?);
        } else {
            print!("{}", render_table(&list));
        }
        return Ok(());
    };

    let package = list
        .get(name)
        .with_context(|| format!("no package named {name}"))?;
    // 404 means the name is unknown. A package that never built reports 0.
    let rc = match rt.block_on(server.return_code(name)) {
        Ok(rc) => Some(rc),
        Err(e) if e.status() == Some(404) => None,
        Err(e) => return Err(e).context("failed to load return code"),
    };

    if json {
        let mut val = serde_json::to_value(package)?;
        val["return_code"] = rc.map(|r| r.return_code).into();
        println!("{}", serde_json::to_string_pretty(&val)?);
    } else {
        print!("{}", render_detail(package, rc));
    }
    Ok(())
}

pub fn render_table(list: &PackageList) -> String {
    if list.is_empty() {
        return "No packages.\n".to_string();
    }
    let width = list
        .names()
        .map(str::len)
        .max()
        .unwrap_or(0)
        .max("PACKAGE".len());
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:<7}  {:<10}  STAGES", "PACKAGE", "TYPE", "STATUS");
    for pkg in &list.packages {
        let stages = if pkg.stages.is_empty() {
            "-".to_string()
        } else {
            pkg.stages.len().to_string()
        };
        let _ = writeln!(
            out,
            "{:<width$}  {:<7}  {:<10}  {stages}",
            pkg.name,
            pkg.package_type.as_str(),
            pkg.aggregate_status().as_str(),
        );
    }
    out
}

fn render_detail(pkg: &PackageInfo, rc: Option<ReturnCode>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", pkg.name, pkg.package_type);
    let _ = writeln!(out, "  status:      {}", pkg.aggregate_status());
    match rc {
        Some(rc) if rc.succeeded() && pkg.aggregate_status() == BuildState::Unbuilt => {
            let _ = writeln!(out, "  last build:  none (the server reports 0 for never-built packages)");
        }
        Some(rc) if rc.succeeded() => {
            let _ = writeln!(out, "  last build:  ok");
        }
        Some(rc) => {
            let _ = writeln!(out, "  last build:  failed (exit {})", rc.return_code);
        }
        None => {
            let _ = writeln!(out, "  last build:  unknown to the server");
        }
    }
    for stage in &pkg.stages {
        let _ = writeln!(out, "  - {:<12} {}", stage.stage_name, stage.status);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> PackageList {
        serde_json::from_str(
            r#"{"packages": [
                {"name": "libfoo", "type": "source", "status": "built"},
                {"name": "gcc", "type": "tool", "stages": [
                    {"stage_name": "pass1", "package": "gcc", "status": "installed"},
                    {"stage_name": "pass2", "package": "gcc", "status": "configured"}
                ]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn table_lists_every_package() {
        let table = render_table(&list());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("PACKAGE"));
        assert!(lines[1].starts_with("libfoo"));
        assert!(lines[1].contains("built"));
        assert!(lines[2].contains("installed"));
        assert!(lines[2].trim_end().ends_with('2'));
    }

    #[test]
    fn empty_table() {
        assert_eq!(render_table(&PackageList::default()), "No packages.\n");
    }

    #[test]
    fn detail_shows_stages_and_return_code() {
        let l = list();
        let gcc = l.get("gcc").unwrap();
        let text = render_detail(gcc, Some(ReturnCode { return_code: 2 }));
        assert!(text.starts_with("gcc (tool)"));
        assert!(text.contains("failed (exit 2)"));
        assert!(text.contains("pass1"));
        assert!(render_detail(gcc, None).contains("unknown to the server"));
    }

    #[test]
    fn zero_return_code_of_unbuilt_package_is_not_success() {
        let l: PackageList = serde_json::from_str(
            r#"{"packages": [
                {"name": "fresh", "type": "source", "status": "unbuilt"},
                {"name": "libfoo", "type": "source", "status": "built"}
            ]}"#,
        )
        .unwrap();
        let ok = ReturnCode { return_code: 0 };
        let fresh = render_detail(l.get("fresh").unwrap(), Some(ok));
        assert!(fresh.contains("last build:  none"));
        assert!(fresh.contains("reports 0 for never-built"));
        let built = render_detail(l.get("libfoo").unwrap(), Some(ok));
        assert!(built.contains("last build:  ok"));
    }
}
