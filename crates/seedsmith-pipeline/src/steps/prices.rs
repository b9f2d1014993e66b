use std::collections::BTreeMap;

use regex::Regex;
use seedsmith_core::InsertStatement;
use tracing::info;

use super::{empty_input, StepContext};
use crate::errors::PipelineError;
use crate::model::StepReport;
use crate::output::{read_input, write_atomic};
use crate::settings::CurrencySettings;

/// Convert every price row into the target currency and drop the currency
/// column.
pub(super) fn run(ctx: &mut StepContext<'_>) -> Result<StepReport, PipelineError> {
    let mut report = ctx.step_report();
    let source = ctx.paths.prices();
    let content = read_input(&source)?;

    let header_pattern = Regex::new(r"(?is)^\s*(INSERT\s+INTO\s+.+?\s+VALUES)")?;
    let header = header_pattern
        .captures(&content)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| PipelineError::InvalidInput {
            path: source.clone(),
            message: "no INSERT ... VALUES header".to_string(),
        })?;
    let header = strip_currency_column(&header)?;

    let entry_pattern = Regex::new(r"\((\d+(?:\.\d+)?),\s*(\d+(?:\.\d+)?),\s*'(\w+)'\)")?;
    let settings = ctx.settings;
    let currency = &settings.currency;
    let mut statement = InsertStatement::with_header(header);
    let mut per_currency: BTreeMap<String, u64> = BTreeMap::new();
    let mut unknown = Vec::new();

    for caps in entry_pattern.captures_iter(&content) {
        let (initial, final_price, code) = (&caps[1], &caps[2], &caps[3]);
        *per_currency.entry(code.to_string()).or_insert(0) += 1;

        if code == currency.target {
            statement.push_row([initial, final_price]);
            continue;
        }
        match conversion_factor(currency, code) {
            Some(factor) => statement.push_row([
                convert(initial, factor),
                convert(final_price, factor),
            ]),
            None => {
                unknown.push(code.to_string());
                statement.push_row([convert(initial, 1.0), convert(final_price, 1.0)]);
            }
        }
    }
    if statement.is_empty() {
        return Err(empty_input(&source, "price rows"));
    }

    for code in unknown {
        ctx.warn(
            "unknown_currency",
            Some(source.as_path()),
            format!("no rate for {code}; value kept unconverted"),
        );
        report.placeholders += 1;
    }
    for (code, count) in &per_currency {
        info!(
            event = "prices_converted",
            currency = %code,
            target = %currency.target,
            rows = count
        );
    }

    let output = ctx.paths.converted_prices();
    write_atomic(&output, statement.render().as_bytes())?;

    report.records_read = statement.len() as u64;
    report.records_written = statement.len() as u64;
    report.output = Some(output.display().to_string());
    Ok(report)
}

/// Multiplier from `code` into the target currency.
fn conversion_factor(currency: &CurrencySettings, code: &str) -> Option<f64> {
    let rate = currency.rates.get(code)?;
    let target = currency.rates.get(&currency.target)?;
    Some(rate / target)
}

fn convert(amount: &str, factor: f64) -> String {
    // The entry pattern only captures decimal numbers.
    let value: f64 = amount.parse().unwrap_or_default();
    format!("{:.2}", value * factor)
}

fn strip_currency_column(header: &str) -> Result<String, PipelineError> {
    let column = Regex::new(r"(?i),\s*`?currency`?")?;
    Ok(column.replace(header, "").into_owned())
}
