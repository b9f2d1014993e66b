use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::settings::PipelineSettings;

/// File layout of a pipeline run: originals in `input_dir`, intermediates in
/// `work_dir`.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    pub input_dir: PathBuf,
    pub work_dir: PathBuf,
    pub output_path: PathBuf,
    pub schema_path: PathBuf,
}

impl PipelinePaths {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            input_dir: settings.input_dir.clone(),
            work_dir: settings.work_dir.clone(),
            output_path: settings.output_path.clone(),
            schema_path: settings.schema_path.clone(),
        }
    }

    pub fn brands_list(&self) -> PathBuf {
        self.input_dir.join("brands.sql")
    }

    pub fn categories_list(&self) -> PathBuf {
        self.input_dir.join("categories.sql")
    }

    pub fn text_brands(&self) -> PathBuf {
        self.input_dir.join("products_with_text_brand.sql")
    }

    pub fn text_categories(&self) -> PathBuf {
        self.input_dir.join("products_with_text_category.sql")
    }

    pub fn dimensions(&self) -> PathBuf {
        self.input_dir.join("dimensions.sql")
    }

    pub fn bulk(&self) -> PathBuf {
        self.input_dir.join("bulk.sql")
    }

    pub fn retailers_list(&self) -> PathBuf {
        self.input_dir.join("retailers.txt")
    }

    pub fn prices(&self) -> PathBuf {
        self.input_dir.join("prices.sql")
    }

    pub fn review_templates(&self) -> PathBuf {
        self.input_dir.join("reviews.json")
    }

    pub fn users(&self) -> PathBuf {
        self.input_dir.join("users.sql")
    }

    pub fn brand_ids(&self) -> PathBuf {
        self.work_dir.join("products_with_brand_ids.sql")
    }

    pub fn category_ids(&self) -> PathBuf {
        self.work_dir.join("products_with_category_ids.sql")
    }

    pub fn specifications(&self) -> PathBuf {
        self.work_dir.join("products_with_specifications.sql")
    }

    pub fn merged_products(&self) -> PathBuf {
        self.work_dir.join("merged_products.sql")
    }

    pub fn retailers(&self) -> PathBuf {
        self.work_dir.join("retailers.sql")
    }

    pub fn converted_prices(&self) -> PathBuf {
        self.work_dir.join("prices_in_zar.sql")
    }

    pub fn product_retailers(&self) -> PathBuf {
        self.work_dir.join("product_retailers.sql")
    }

    pub fn reviews(&self) -> PathBuf {
        self.work_dir.join("reviews.sql")
    }

    /// Every file a step writes into `work_dir`.
    pub fn intermediates(&self) -> Vec<PathBuf> {
        vec![
            self.brand_ids(),
            self.category_ids(),
            self.specifications(),
            self.merged_products(),
            self.retailers(),
            self.converted_prices(),
            self.product_retailers(),
            self.reviews(),
        ]
    }

    /// Original inputs, the schema and the seed script. Cleanup never
    /// deletes these.
    pub fn protected(&self) -> Vec<PathBuf> {
        vec![
            self.brands_list(),
            self.categories_list(),
            self.text_brands(),
            self.text_categories(),
            self.dimensions(),
            self.bulk(),
            self.retailers_list(),
            self.prices(),
            self.review_templates(),
            self.users(),
            self.schema_path.clone(),
            self.output_path.clone(),
        ]
    }
}

/// Absolute form of `path` for comparisons.
///
/// `.` and `..` are resolved lexically, then the longest existing prefix is
/// canonicalized so symlinked directories compare equal to their targets.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other.as_os_str()),
        }
    }

    let mut existing = lexical.as_path();
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |path, name| path.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return lexical.clone(),
        }
    }
}
