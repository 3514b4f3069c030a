use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult, classify_client};
use crate::output::render_sessions;

pub(crate) async fn handle_sessions(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let sessions = ctx.client.list_sessions().await.map_err(classify_client)?;
    render_sessions(&sessions, format)
}

pub(crate) async fn handle_use(ctx: &AppContext, label: &str) -> CliResult<()> {
    ctx.client
        .set_last_session(label)
        .await
        .map_err(classify_client)?;
    println!("Last session set to '{label}'.");
    Ok(())
}
