pub mod generate;
pub mod init;
pub mod prune;
pub mod status;

use anyhow::Result;

use crate::context::ProjectContext;

/// Load the project context, failing when `svcgen init` has not been run
pub fn initialized_context() -> Result<ProjectContext> {
    let ctx = ProjectContext::find()?;
    if !ctx.is_initialized() {
        anyhow::bail!("svcgen is not initialized here; run 'svcgen init' first");
    }
    Ok(ctx)
}
