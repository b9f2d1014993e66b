use std::io;
use std::path::Path;

use seedsmith_core::{escape_sql, first_quoted, list_entries, unescape_sql, InsertStatement};
use serde::Serialize;
use serde_json::ser::Formatter;
use tracing::info;

use super::{empty_input, ensure_aligned, StepContext};
use crate::errors::PipelineError;
use crate::model::StepReport;
use crate::output::{read_input, write_atomic};

/// JSON stored in `Product.specifications`.
#[derive(Debug, Serialize)]
struct Specification {
    brand: Option<String>,
    category: Option<String>,
    dimensions: Option<String>,
}

/// Single-line JSON with a space after every `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

fn to_spaced_json<T: Serialize>(value: &T) -> Result<String, PipelineError> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub(super) fn run(ctx: &mut StepContext<'_>) -> Result<StepReport, PipelineError> {
    let mut report = ctx.step_report();
    let brands_path = ctx.paths.text_brands();
    let categories_path = ctx.paths.text_categories();
    let dimensions_path = ctx.paths.dimensions();

    let brands = read_names(ctx, &brands_path, "brand")?;
    let categories = read_names(ctx, &categories_path, "category")?;
    let dimensions = read_dimensions(ctx, &dimensions_path)?;

    ensure_aligned(&[
        (brands_path.as_path(), brands.len()),
        (categories_path.as_path(), categories.len()),
        (dimensions_path.as_path(), dimensions.len()),
    ])?;
    info!(event = "specifications_aligned", products = brands.len());

    let mut statement = InsertStatement::new("Products", &["specifications"]);
    for ((brand, category), dimensions) in brands.into_iter().zip(categories).zip(dimensions) {
        let spec = Specification {
            brand,
            category,
            dimensions,
        };
        let json = to_spaced_json(&spec)?;
        statement.push_row([format!("'{}'", escape_sql(&json))]);
    }

    let output = ctx.paths.specifications();
    write_atomic(&output, statement.render().as_bytes())?;

    report.records_read = statement.len() as u64;
    report.records_written = statement.len() as u64;
    report.output = Some(output.display().to_string());
    Ok(report)
}

/// Quoted name of every entry line; unreadable lines become `None`.
fn read_names(
    ctx: &mut StepContext<'_>,
    path: &Path,
    entity: &str,
) -> Result<Vec<Option<String>>, PipelineError> {
    let content = read_input(path)?;
    let mut names = Vec::new();
    for line in list_entries(&content) {
        let name = first_quoted(line).map(unescape_sql);
        if name.is_none() {
            ctx.warn(
                "malformed_line",
                Some(path),
                format!("no quoted {entity} name in: {line}"),
            );
        }
        names.push(name);
    }
    if names.is_empty() {
        return Err(empty_input(path, &format!("{entity} entries")));
    }
    Ok(names)
}

/// Dimension text per product; `(NULL)` rows have none.
fn read_dimensions(
    ctx: &mut StepContext<'_>,
    path: &Path,
) -> Result<Vec<Option<String>>, PipelineError> {
    let content = read_input(path)?;
    let mut dimensions = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.starts_with("(NULL") {
            dimensions.push(None);
        } else if line.starts_with("('") {
            let value = first_quoted(line).map(unescape_sql);
            if value.is_none() {
                ctx.warn(
                    "malformed_line",
                    Some(path),
                    format!("unreadable dimensions: {line}"),
                );
            }
            dimensions.push(value);
        }
    }
    if dimensions.is_empty() {
        return Err(empty_input(path, "dimension entries"));
    }
    Ok(dimensions)
}
