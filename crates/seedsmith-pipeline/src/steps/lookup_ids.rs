use std::path::PathBuf;

use seedsmith_core::{first_quoted, list_entries, InsertStatement, LookupMap, MatchMode};
use tracing::info;

use super::{empty_input, StepContext};
use crate::errors::PipelineError;
use crate::model::StepReport;
use crate::output::{read_input, write_atomic};

/// Where a name-to-id substitution reads and writes.
struct Substitution {
    entity: &'static str,
    list: PathBuf,
    products: PathBuf,
    output: PathBuf,
    column: &'static str,
    mode: MatchMode,
    missing_code: &'static str,
}

pub(super) fn run_brands(ctx: &mut StepContext<'_>) -> Result<StepReport, PipelineError> {
    let substitution = Substitution {
        entity: "brand",
        list: ctx.paths.brands_list(),
        products: ctx.paths.text_brands(),
        output: ctx.paths.brand_ids(),
        column: "brand_id",
        mode: MatchMode::CaseInsensitive,
        missing_code: "missing_brand",
    };
    substitute_ids(ctx, &substitution)
}

pub(super) fn run_categories(ctx: &mut StepContext<'_>) -> Result<StepReport, PipelineError> {
    let substitution = Substitution {
        entity: "category",
        list: ctx.paths.categories_list(),
        products: ctx.paths.text_categories(),
        output: ctx.paths.category_ids(),
        column: "category_id",
        mode: MatchMode::Exact,
        missing_code: "missing_category",
    };
    substitute_ids(ctx, &substitution)
}

/// Replace each product's entity name with the id it has in the list file.
fn substitute_ids(
    ctx: &mut StepContext<'_>,
    substitution: &Substitution,
) -> Result<StepReport, PipelineError> {
    let mut report = ctx.step_report();

    let lookup = LookupMap::from_list(&read_input(&substitution.list)?, substitution.mode);
    if lookup.is_empty() {
        return Err(empty_input(
            &substitution.list,
            &format!("{} entries", substitution.entity),
        ));
    }
    for line in lookup.malformed() {
        ctx.warn(
            "malformed_line",
            Some(substitution.list.as_path()),
            format!("unreadable {} entry: {line}", substitution.entity),
        );
    }
    info!(
        event = "lookup_loaded",
        entity = substitution.entity,
        entries = lookup.len(),
        path = %substitution.list.display()
    );

    let products = read_input(&substitution.products)?;
    let lines: Vec<&str> = list_entries(&products).collect();
    if lines.is_empty() {
        return Err(empty_input(&substitution.products, "product entries"));
    }

    let mut statement = InsertStatement::new("Products", &[substitution.column]);
    for line in &lines {
        let id = match first_quoted(line) {
            Some(name) => match lookup.get(name) {
                Some(id) => id.to_string(),
                None => {
                    ctx.warn(
                        substitution.missing_code,
                        Some(substitution.products.as_path()),
                        format!("no {} named '{name}'", substitution.entity),
                    );
                    report.placeholders += 1;
                    "NULL".to_string()
                }
            },
            None => {
                ctx.warn(
                    "malformed_line",
                    Some(substitution.products.as_path()),
                    format!("no quoted {} name in: {line}", substitution.entity),
                );
                report.placeholders += 1;
                "NULL".to_string()
            }
        };
        statement.push_row([id]);
    }

    write_atomic(&substitution.output, statement.render().as_bytes())?;

    report.records_read = lines.len() as u64;
    report.records_written = statement.len() as u64;
    report.output = Some(substitution.output.display().to_string());
    Ok(report)
}
