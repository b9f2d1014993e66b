use std::collections::BTreeMap;
use std::path::PathBuf;

use seedsmith_core::dependency_order;
use sha2::{Digest, Sha256};
use tracing::info;

use super::StepContext;
use crate::errors::PipelineError;
use crate::model::StepReport;
use crate::output::{read_input, write_atomic};
use crate::paths::{normalize_path, PipelinePaths};

/// One table's data file in the final script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSection {
    pub table: String,
    pub path: PathBuf,
    /// Tables whose rows must be inserted first.
    pub depends_on: Vec<String>,
    /// Optional sections are skipped with a warning when the file is absent.
    pub required: bool,
}

impl SeedSection {
    fn new(table: &str, path: PathBuf, depends_on: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            path,
            depends_on: depends_on.iter().map(|table| table.to_string()).collect(),
            required: true,
        }
    }

    fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Sections of the seed script and the foreign keys between them.
pub fn default_sections(paths: &PipelinePaths) -> Vec<SeedSection> {
    vec![
        SeedSection::new("Brand", paths.brands_list(), &[]),
        SeedSection::new("Category", paths.categories_list(), &[]),
        SeedSection::new("Retailer", paths.retailers(), &[]),
        SeedSection::new("User", paths.users(), &[]).optional(),
        SeedSection::new("Product", paths.merged_products(), &["Brand", "Category"]),
        SeedSection::new(
            "Product_Retailer",
            paths.product_retailers(),
            &["Product", "Retailer"],
        ),
        SeedSection::new("Review", paths.reviews(), &["Product", "User"]),
    ]
}

pub(super) fn run(ctx: &mut StepContext<'_>) -> Result<StepReport, PipelineError> {
    let mut report = ctx.step_report();
    let paths = ctx.paths;
    let sections = default_sections(paths);
    let order = section_order(&sections)?;
    info!(event = "assemble_order", order = %order.join(" -> "));

    let schema = read_input(&paths.schema_path)?;
    let mut script = String::with_capacity(schema.len());
    script.push_str(schema.trim_end());
    script.push('\n');

    for table in &order {
        let Some(section) = sections.iter().find(|section| &section.table == table) else {
            continue;
        };
        let content = match read_input(&section.path) {
            Ok(content) => content,
            Err(PipelineError::MissingInput(path)) if !section.required => {
                ctx.warn(
                    "missing_section",
                    Some(path.as_path()),
                    format!("optional section {} skipped", section.table),
                );
                report.placeholders += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        report.records_read += 1;
        script.push_str(&format!("\n-- Table: {}\n", section.table));
        script.push_str(content.trim_end());
        script.push('\n');
        report.records_written += 1;
    }

    let output = &paths.output_path;
    write_atomic(output, script.as_bytes())?;
    let digest = hex::encode(Sha256::digest(script.as_bytes()));
    info!(
        event = "seed_script_written",
        path = %output.display(),
        sections = report.records_written,
        sha256 = %digest
    );
    {
        let run_report = ctx.report_mut();
        run_report.output_path = Some(output.display().to_string());
        run_report.output_sha256 = Some(digest);
    }
    report.output = Some(output.display().to_string());

    if !ctx.settings.keep_intermediates {
        remove_intermediates(ctx)?;
    }
    Ok(report)
}

fn section_order(sections: &[SeedSection]) -> Result<Vec<String>, PipelineError> {
    let dependencies: BTreeMap<String, Vec<String>> = sections
        .iter()
        .map(|section| (section.table.clone(), section.depends_on.clone()))
        .collect();
    Ok(dependency_order(&dependencies)?)
}

/// Delete the files the steps wrote, then the work dir itself if nothing
/// else is left in it.
fn remove_intermediates(ctx: &mut StepContext<'_>) -> Result<(), PipelineError> {
    let paths = ctx.paths;
    let protected: Vec<PathBuf> = paths.protected().iter().map(|path| normalize_path(path)).collect();
    let mut removed = 0_usize;
    for path in paths.intermediates() {
        if !path.is_file() {
            continue;
        }
        if protected.contains(&normalize_path(&path)) {
            ctx.warn(
                "intermediate_kept",
                Some(path.as_path()),
                "intermediate shares its path with an input or the seed script",
            );
            continue;
        }
        std::fs::remove_file(&path)?;
        removed += 1;
    }

    let work_dir = &paths.work_dir;
    match std::fs::remove_dir(work_dir) {
        Ok(()) => info!(event = "work_dir_removed", path = %work_dir.display(), files = removed),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => ctx.warn(
            "work_dir_kept",
            Some(work_dir.as_path()),
            format!("intermediates removed ({removed}), directory kept: {err}"),
        ),
    }
    Ok(())
}
