use whisker_model::normalize;

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult, classify_client};
use crate::output::render_status;

pub(crate) async fn handle_status(
    ctx: &AppContext,
    force: bool,
    format: OutputFormat,
) -> CliResult<()> {
    let payload = ctx
        .client
        .fetch_status(ctx.label.as_deref(), force)
        .await
        .map_err(classify_client)?;
    let (record, _) = normalize(payload);
    render_status(&record, format)
}

pub(crate) async fn handle_check(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let payload = ctx
        .client
        .fetch_status(ctx.label.as_deref(), true)
        .await
        .map_err(classify_client)?;
    let (record, _) = normalize(payload);
    if matches!(format, OutputFormat::Table) {
        println!("Checked now!");
    }
    render_status(&record, format)
}
