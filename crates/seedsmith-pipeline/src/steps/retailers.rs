use seedsmith_core::{escape_sql, InsertStatement};
use tracing::info;

use super::{empty_input, StepContext};
use crate::errors::PipelineError;
use crate::model::StepReport;
use crate::output::{read_input, write_atomic};

/// Turn `name = url` lines into the `Retailer` insert.
pub(super) fn run(ctx: &mut StepContext<'_>) -> Result<StepReport, PipelineError> {
    let mut report = ctx.step_report();
    let source = ctx.paths.retailers_list();
    let content = read_input(&source)?;

    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| line.contains('='))
        .collect();
    if lines.is_empty() {
        return Err(empty_input(&source, "retailer entries"));
    }

    let mut statement = InsertStatement::new("Retailer", &["id", "name", "web_page_url"]);
    for line in &lines {
        let Some((name, url)) = parse_retailer(line) else {
            ctx.warn(
                "malformed_line",
                Some(source.as_path()),
                format!("expected 'name = url': {line}"),
            );
            report.placeholders += 1;
            continue;
        };
        let id = statement.len() + 1;
        statement.push_row([
            id.to_string(),
            format!("'{}'", escape_sql(name)),
            format!("'{}'", escape_sql(url)),
        ]);
    }
    if statement.is_empty() {
        return Err(empty_input(&source, "valid retailer entries"));
    }
    info!(event = "retailers_parsed", retailers = statement.len());

    let output = ctx.paths.retailers();
    write_atomic(&output, statement.render().as_bytes())?;

    report.records_read = lines.len() as u64;
    report.records_written = statement.len() as u64;
    report.output = Some(output.display().to_string());
    Ok(report)
}

/// Split a line on its single `=`; both sides must be non-empty.
fn parse_retailer(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split('=');
    let name = parts.next()?.trim();
    let url = parts.next()?.trim();
    if parts.next().is_some() || name.is_empty() || url.is_empty() {
        return None;
    }
    Some((name, url))
}
