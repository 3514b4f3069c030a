use anyhow::anyhow;

use crate::client::{AppContext, CliError, CliResult, classify_client};

pub(crate) async fn handle_seedbox(ctx: &AppContext) -> CliResult<()> {
    let label = ctx.label.as_deref().ok_or_else(|| {
        CliError::validation("a session label is required (pass --label or set WHISKER_LABEL)")
    })?;

    let outcome = ctx
        .client
        .update_seedbox(label)
        .await
        .map_err(classify_client)?;

    if outcome.success {
        println!("{}", outcome.message);
        Ok(())
    } else {
        Err(CliError::failure(anyhow!(outcome.message)))
    }
}
