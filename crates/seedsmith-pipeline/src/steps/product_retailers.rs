use std::path::Path;

use rand::Rng;
use rand::seq::index;
use regex::Regex;
use seedsmith_core::InsertStatement;
use tracing::info;

use super::{empty_input, read_product_ids, StepContext};
use crate::errors::PipelineError;
use crate::model::StepReport;
use crate::output::{read_input, write_atomic};
use crate::random::{round2, triangular};
use crate::settings::PricingSettings;

const COLUMNS: [&str; 5] = [
    "product_id",
    "retailer_id",
    "product_url",
    "initial_price",
    "final_price",
];

#[derive(Debug, Clone, PartialEq)]
struct Retailer {
    id: u64,
    /// Escaped literal text, written back verbatim.
    url: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PricePair {
    initial: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct Listing {
    retailer_id: u64,
    url: String,
    initial: f64,
    final_price: f64,
}

/// Link every product to a random set of retailers with jittered prices.
pub(super) fn run(ctx: &mut StepContext<'_>) -> Result<StepReport, PipelineError> {
    let mut report = ctx.step_report();
    let retailers_path = ctx.paths.retailers();
    let prices_path = ctx.paths.converted_prices();

    let retailers = read_retailers(&retailers_path)?;
    let product_ids = read_product_ids(&ctx.paths.merged_products())?;
    let (prices, rejected) = parse_prices(&read_input(&prices_path)?)?;
    for text in rejected {
        ctx.warn(
            "malformed_line",
            Some(prices_path.as_path()),
            format!("unreadable price pair {text}"),
        );
    }
    if prices.is_empty() {
        return Err(empty_input(&prices_path, "price rows"));
    }
    info!(
        event = "product_retailers_inputs",
        products = product_ids.len(),
        retailers = retailers.len(),
        prices = prices.len()
    );

    let pricing = &ctx.settings.pricing;
    let rng = &mut ctx.rng;
    let mut statement = InsertStatement::new("Product_Retailer", &COLUMNS);
    for (position, product_id) in product_ids.iter().enumerate() {
        let base = prices[position % prices.len()];
        for listing in listings(rng, &retailers, base, pricing) {
            statement.push_row([
                product_id.to_string(),
                listing.retailer_id.to_string(),
                format!("'{}'", listing.url),
                format!("{:.2}", listing.initial),
                format!("{:.2}", listing.final_price),
            ]);
        }
    }

    let output = ctx.paths.product_retailers();
    write_atomic(&output, statement.render().as_bytes())?;
    info!(event = "product_retailers_generated", rows = statement.len());

    report.records_read = product_ids.len() as u64;
    report.records_written = statement.len() as u64;
    report.output = Some(output.display().to_string());
    Ok(report)
}

/// Listings of one product: between one and all retailers, each with its own
/// scaled price and discount.
fn listings<R: Rng + ?Sized>(
    rng: &mut R,
    retailers: &[Retailer],
    base: PricePair,
    pricing: &PricingSettings,
) -> Vec<Listing> {
    let count = rng.random_range(1..=retailers.len());
    index::sample(rng, retailers.len(), count)
        .into_iter()
        .map(|choice| {
            let retailer = &retailers[choice];
            let scale = rng.random_range(pricing.scale_min..pricing.scale_max);
            let initial = round2(base.initial * scale);
            let discount = triangular(rng, 0.0, pricing.max_discount_percent, 0.0);
            Listing {
                retailer_id: retailer.id,
                url: retailer.url.clone(),
                initial,
                final_price: round2(initial * (1.0 - discount / 100.0)),
            }
        })
        .collect()
}

fn read_retailers(path: &Path) -> Result<Vec<Retailer>, PipelineError> {
    let content = read_input(path)?;
    let pattern = Regex::new(r"\((\d+),\s*'((?:[^'\\]|\\.)*)',\s*'((?:[^'\\]|\\.)*)'\)")?;
    let retailers: Vec<Retailer> = pattern
        .captures_iter(&content)
        .filter_map(|caps| {
            Some(Retailer {
                id: caps[1].parse().ok()?,
                url: caps[3].to_string(),
            })
        })
        .collect();
    if retailers.is_empty() {
        return Err(empty_input(path, "retailer rows"));
    }
    Ok(retailers)
}

/// Price pairs in row order, plus the text of pairs whose numbers do not
/// parse.
fn parse_prices(content: &str) -> Result<(Vec<PricePair>, Vec<String>), PipelineError> {
    let pattern = Regex::new(r"\(([\d.]+),\s*([\d.]+)\)")?;
    let mut prices = Vec::new();
    let mut rejected = Vec::new();
    for caps in pattern.captures_iter(content) {
        match caps[1].parse::<f64>() {
            Ok(initial) if caps[2].parse::<f64>().is_ok() => prices.push(PricePair { initial }),
            _ => rejected.push(caps[0].to_string()),
        }
    }
    Ok((prices, rejected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::step_rng;

    fn retailers(count: u64) -> Vec<Retailer> {
        (1..=count)
            .map(|id| Retailer {
                id,
                url: format!("https://shop{id}.example"),
            })
            .collect()
    }

    #[test]
    fn listings_use_distinct_retailers_and_bounded_prices() {
        let mut rng = step_rng("DROP TABLE", "product-retailers");
        let pricing = PricingSettings::default();
        let retailers = retailers(5);
        for _ in 0..200 {
            let listings = listings(&mut rng, &retailers, PricePair { initial: 100.0 }, &pricing);
            assert!((1..=5).contains(&listings.len()));

            let mut ids: Vec<u64> = listings.iter().map(|l| l.retailer_id).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), listings.len());

            for listing in &listings {
                assert!((85.0..=115.0).contains(&listing.initial), "{listing:?}");
                assert!(listing.final_price <= listing.initial);
                assert!(listing.final_price >= 0.0);
            }
        }
    }

    #[test]
    fn unparsable_price_pairs_are_reported() {
        let content = "INSERT INTO `Prices` (`initial_price`, `final_price`) VALUES\n\
                       (10.00, 8.00),\n(1.2.3, 4),\n(5, 4..0),\n(7.5, 7);\n";
        let (prices, rejected) = parse_prices(content).expect("pattern");
        assert_eq!(prices, vec![PricePair { initial: 10.0 }, PricePair { initial: 7.5 }]);
        assert_eq!(rejected, vec!["(1.2.3, 4)", "(5, 4..0)"]);
    }

    #[test]
    fn same_seed_same_listings() {
        let pricing = PricingSettings::default();
        let retailers = retailers(4);
        let base = PricePair { initial: 42.5 };
        let a = listings(&mut step_rng("s", "product-retailers"), &retailers, base, &pricing);
        let b = listings(&mut step_rng("s", "product-retailers"), &retailers, base, &pricing);
        assert_eq!(a, b);
    }
}
