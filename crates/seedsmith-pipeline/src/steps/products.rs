use std::path::Path;

use seedsmith_core::{
    extract_records, parse_record, single_value_rows, values_body, InsertStatement, RecordError,
    PRODUCT_RECORD_FIELDS,
};
use tracing::info;

use super::{empty_input, ensure_aligned, preview, StepContext};
use crate::errors::PipelineError;
use crate::model::StepReport;
use crate::output::{read_input, write_atomic};

const PRODUCT_COLUMNS: [&str; 11] = [
    "id",
    "category_id",
    "brand_id",
    "title",
    "description",
    "created_at",
    "updated_at",
    "image_url",
    "images",
    "specifications",
    "features",
];

/// One bulk dump record, fields kept as SQL literal text.
#[derive(Debug)]
struct ProductRecord {
    title: String,
    description: String,
    created_at: String,
    updated_at: String,
    image_url: String,
    features: String,
    images: String,
}

impl ProductRecord {
    fn from_fields(fields: Vec<String>) -> Result<Self, RecordError> {
        let found = fields.len();
        let [title, description, created_at, updated_at, image_url, features, images] =
            <[String; PRODUCT_RECORD_FIELDS]>::try_from(fields).map_err(|_| {
                RecordError::FieldCount {
                    expected: PRODUCT_RECORD_FIELDS,
                    found,
                }
            })?;
        Ok(Self {
            title,
            description,
            created_at,
            updated_at,
            image_url,
            features,
            images,
        })
    }
}

/// Merge brand ids, category ids, specifications and bulk records into the
/// `Product` insert.
pub(super) fn run(ctx: &mut StepContext<'_>) -> Result<StepReport, PipelineError> {
    let mut report = ctx.step_report();

    let brand_path = ctx.paths.brand_ids();
    let category_path = ctx.paths.category_ids();
    let spec_path = ctx.paths.specifications();
    let bulk_path = ctx.paths.bulk();

    let brand_ids = read_values(&brand_path, "brand ids")?;
    let category_ids = read_values(&category_path, "category ids")?;
    let specifications = read_values(&spec_path, "specifications")?;

    let bulk = read_input(&bulk_path)?;
    if bulk.trim().is_empty() {
        return Err(empty_input(&bulk_path, "content"));
    }
    let extracted = extract_records(values_body(&bulk));
    if let Some(tail) = extracted.unterminated {
        ctx.warn(
            "unterminated_record",
            Some(bulk_path.as_path()),
            format!("record never closed: {}", preview(tail)),
        );
    }
    if extracted.records.is_empty() {
        return Err(empty_input(&bulk_path, "product records"));
    }

    ensure_aligned(&[
        (brand_path.as_path(), brand_ids.len()),
        (category_path.as_path(), category_ids.len()),
        (spec_path.as_path(), specifications.len()),
        (bulk_path.as_path(), extracted.records.len()),
    ])?;
    info!(
        event = "products_aligned",
        records = extracted.records.len(),
        path = %bulk_path.display()
    );

    let mut statement = InsertStatement::new("Product", &PRODUCT_COLUMNS);
    for (index, inner) in extracted.records.iter().enumerate() {
        let record = match parse_record(inner, PRODUCT_RECORD_FIELDS)
            .and_then(ProductRecord::from_fields)
        {
            Ok(record) => record,
            Err(err) => {
                ctx.warn(
                    "malformed_record",
                    Some(bulk_path.as_path()),
                    format!("record {} rejected ({err}): {}", index + 1, preview(inner)),
                );
                report.placeholders += 1;
                continue;
            }
        };

        let id = (statement.len() + 1).to_string();
        statement.push_row([
            id.as_str(),
            category_ids[index].as_str(),
            brand_ids[index].as_str(),
            record.title.as_str(),
            record.description.as_str(),
            record.created_at.as_str(),
            record.updated_at.as_str(),
            record.image_url.as_str(),
            record.images.as_str(),
            specifications[index].as_str(),
            record.features.as_str(),
        ]);
    }

    if statement.is_empty() {
        return Err(empty_input(&bulk_path, "valid product records"));
    }

    let output = ctx.paths.merged_products();
    write_atomic(&output, statement.render().as_bytes())?;

    report.records_read = extracted.records.len() as u64;
    report.records_written = statement.len() as u64;
    report.output = Some(output.display().to_string());
    Ok(report)
}

/// Row values of a single-column intermediate written by an earlier step.
fn read_values(path: &Path, what: &str) -> Result<Vec<String>, PipelineError> {
    let values = single_value_rows(&read_input(path)?);
    if values.is_empty() {
        return Err(empty_input(path, what));
    }
    Ok(values)
}
