use rand::Rng;
use rand::seq::{index, IndexedRandom};
use seedsmith_core::{escape_sql, InsertStatement};
use serde::Deserialize;
use tracing::info;

use super::{empty_input, read_product_ids, StepContext};
use crate::errors::PipelineError;
use crate::model::StepReport;
use crate::output::{read_input, write_atomic};

const NO_REVIEWS: &str = "-- No reviews were generated\n";

/// Entry of `reviews.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ReviewTemplate {
    rating: u8,
    comment: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Review<'a> {
    user_id: u64,
    product_id: u64,
    template: &'a ReviewTemplate,
}

pub(super) fn run(ctx: &mut StepContext<'_>) -> Result<StepReport, PipelineError> {
    let mut report = ctx.step_report();
    let templates_path = ctx.paths.review_templates();
    let templates: Vec<ReviewTemplate> = serde_json::from_str(&read_input(&templates_path)?)?;
    if templates.is_empty() {
        return Err(empty_input(&templates_path, "review templates"));
    }
    let product_ids = read_product_ids(&ctx.paths.merged_products())?;

    let settings = &ctx.settings.reviews;
    let users: Vec<u64> = (settings.first_user_id..=settings.last_user_id).collect();
    let reviews = generate(
        &mut ctx.rng,
        &product_ids,
        &users,
        &templates,
        settings.max_per_product,
    );

    let mut statement =
        InsertStatement::new("Review", &["user_id", "product_id", "score", "comment"]);
    for review in &reviews {
        statement.push_row([
            review.user_id.to_string(),
            review.product_id.to_string(),
            review.template.rating.to_string(),
            format!("'{}'", escape_sql(&review.template.comment)),
        ]);
    }
    let rendered = if statement.is_empty() {
        NO_REVIEWS.to_string()
    } else {
        statement.render()
    };

    let output = ctx.paths.reviews();
    write_atomic(&output, rendered.as_bytes())?;
    info!(
        event = "reviews_generated",
        reviews = reviews.len(),
        products = product_ids.len(),
        templates = templates.len()
    );

    report.records_read = product_ids.len() as u64;
    report.records_written = statement.len() as u64;
    report.output = Some(output.display().to_string());
    Ok(report)
}

/// Per product, a uniform number of distinct users each leave one review
/// drawn from the templates.
fn generate<'a, R: Rng + ?Sized>(
    rng: &mut R,
    product_ids: &[u64],
    users: &[u64],
    templates: &'a [ReviewTemplate],
    max_per_product: usize,
) -> Vec<Review<'a>> {
    let mut reviews = Vec::new();
    let limit = max_per_product.min(users.len());
    for &product_id in product_ids {
        let count = rng.random_range(0..=limit);
        for choice in index::sample(rng, users.len(), count) {
            let Some(template) = templates.choose(rng) else {
                continue;
            };
            reviews.push(Review {
                user_id: users[choice],
                product_id,
                template,
            });
        }
    }
    reviews
}
