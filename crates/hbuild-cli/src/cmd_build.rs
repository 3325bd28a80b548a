use anyhow::Context as _;

use hbuild_client::{BuildAccepted, BuildSubmitter};
use hbuild_core::{BuildRequest, PackageList, StageSelector};

use crate::context::Context;

/// `hbctl build <name> [--stage S]`
pub fn execute(ctx: &Context, name: &str, stage: Option<&str>) -> anyhow::Result<()> {
    let server = ctx.server()?;
    let rt = ctx.runtime()?;

    let list = rt
        .block_on(server.packages())
        .context("failed to load packages")?;
    let request = request_for(&list, name, stage)?;

    let accepted = rt.block_on(BuildSubmitter::new(server).submit(request))?;
    println!("{}", summary(&accepted));
    Ok(())
}

fn request_for(list: &PackageList, name: &str, stage: Option<&str>) -> anyhow::Result<BuildRequest> {
    let package = list
        .get(name)
        .with_context(|| format!("no package named {name}"))?;
    match stage {
        None => Ok(BuildRequest::for_package(package)),
        Some(stage) => {
            if package.find_stage(stage).is_none() {
                anyhow::bail!("{name} has no stage {stage}");
            }
            Ok(BuildRequest::for_stage(package, stage))
        }
    }
}

fn summary(accepted: &BuildAccepted) -> String {
    let items: Vec<String> = accepted
        .request
        .packages
        .iter()
        .map(|item| match &item.stage {
            StageSelector::AllStages => item.name.clone(),
            StageSelector::Stage(s) => format!("{}[{s}]", item.name),
        })
        .collect();
    let mut line = format!("Queued {} of {}", accepted.request.build_to.as_str(), items.join(", "));
    if let Some(msg) = &accepted.message {
        line.push_str(": ");
        line.push_str(msg);
    }
    line
}
