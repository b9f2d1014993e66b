use std::fs;
use std::path::{Path, PathBuf};

use seedsmith_pipeline::{PipelineEngine, PipelineError, PipelineSettings, Step};

const BRANDS: &str = "INSERT INTO `Brand` (`name`) VALUES\n('Acme'),\n('Globex');\n";
const CATEGORIES: &str = "INSERT INTO `Category` (`name`) VALUES\n('Tools'),\n('Toys');\n";
const TEXT_BRANDS: &str = "INSERT INTO `Products` (`brand`) VALUES\n('acme'),\n('Globex'),\n('Initech');\n";
const TEXT_CATEGORIES: &str =
    "INSERT INTO `Products` (`category`) VALUES\n('Tools'),\n('Toys'),\n('Tools');\n";
const DIMENSIONS: &str = "INSERT INTO `Products` (`dimensions`) VALUES\n('10 x 10 cm'),\n(NULL),\n('1 x 2 m');\n";
const BULK: &str = "INSERT INTO `Product` (`title`, `description`, `created_at`, `updated_at`, `image_url`, `features`, `images`) VALUES
('Widget', 'A nice, useful widget', '2024-01-01', '2024-01-02', 'https://img.example/1.png', '[\"sturdy\", \"cheap\"]', '[1,2,3]'),
('Gadget', 'It\\'s (mostly) harmless', '2024-02-01', '2024-02-02', 'https://img.example/2.png', '[\"shiny\"]', '[4]'),
('Gizmo', 'Does things', '2024-03-01', '2024-03-02', 'https://img.example/3.png', '[]', '[[5,6],[7]]');
";
const RETAILERS: &str = "Takealot = https://www.takealot.com\nMakro = https://www.makro.co.za\nnot a retailer\n";
const PRICES: &str = "INSERT INTO `Prices` (`initial_price`, `final_price`, `currency`) VALUES
(10.00, 8.00, 'USD'),
(100, 90, 'ZAR'),
(50, 40, 'CNY');
";
const REVIEWS: &str = r#"[
  {"rating": 5, "comment": "Works as advertised"},
  {"rating": 2, "comment": "Didn't last"}
]"#;
const USERS: &str = "INSERT INTO `User` (`id`, `name`) VALUES\n(1, 'admin'),\n(2, 'ada');\n";
const SCHEMA: &str = "CREATE TABLE `Brand` (`id` INT PRIMARY KEY, `name` VARCHAR(255));\n";

struct Fixture {
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = std::env::temp_dir().join(format!("seedsmith_pipeline_{}", uuid::Uuid::new_v4()));
        let input = root.join("original-data");
        fs::create_dir_all(&input).expect("create input dir");
        let files = [
            ("brands.sql", BRANDS),
            ("categories.sql", CATEGORIES),
            ("products_with_text_brand.sql", TEXT_BRANDS),
            ("products_with_text_category.sql", TEXT_CATEGORIES),
            ("dimensions.sql", DIMENSIONS),
            ("bulk.sql", BULK),
            ("retailers.txt", RETAILERS),
            ("prices.sql", PRICES),
            ("reviews.json", REVIEWS),
            ("users.sql", USERS),
        ];
        for (name, content) in files {
            fs::write(input.join(name), content).expect("write fixture");
        }
        fs::write(root.join("schema.sql"), SCHEMA).expect("write schema");
        Self { root }
    }

    fn input(&self, name: &str) -> PathBuf {
        self.root.join("original-data").join(name)
    }

    fn settings(&self, run: &str) -> PipelineSettings {
        PipelineSettings {
            input_dir: self.root.join("original-data"),
            work_dir: self.root.join(format!("work-{run}")),
            output_path: self.root.join(format!("{run}.sql")),
            schema_path: self.root.join("schema.sql"),
            ..PipelineSettings::default()
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.root).ok();
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read output")
}

#[test]
fn full_run_writes_ordered_script() {
    let fixture = Fixture::new();
    let settings = fixture.settings("full");
    let work_dir = settings.work_dir.clone();
    let engine = PipelineEngine::new(settings).expect("engine");

    let result = engine.run().expect("pipeline run");
    let output = result.output_path.expect("output path");
    let script = read(&output);

    assert!(script.starts_with("CREATE TABLE `Brand`"));
    let position = |table: &str| {
        script
            .find(&format!("-- Table: {table}\n"))
            .unwrap_or_else(|| panic!("missing section {table}"))
    };
    assert!(position("Brand") < position("Product"));
    assert!(position("Category") < position("Product"));
    assert!(position("Product") < position("Product_Retailer"));
    assert!(position("Retailer") < position("Product_Retailer"));
    assert!(position("User") < position("Review"));

    assert!(script.contains("(1, 1, 1, 'Widget', 'A nice, useful widget'"));
    assert!(script.contains("(2, 2, 2, 'Gadget', 'It\\'s (mostly) harmless'"));
    assert!(script.contains("(3, 1, NULL, 'Gizmo'"));
    assert!(script.contains("(1, 'Takealot', 'https://www.takealot.com')"));
    assert!(script.contains("'[[5,6],[7]]'"));

    let report = result.report;
    assert_eq!(report.steps.len(), Step::ALL.len());
    assert_eq!(report.warning_count("missing_brand"), 1);
    assert_eq!(report.warning_count("malformed_line"), 0);
    assert_eq!(report.step("retailers").map(|s| s.records_written), Some(2));
    assert_eq!(report.step("products").map(|s| s.records_written), Some(3));
    assert_eq!(report.output_sha256.as_deref().map(str::len), Some(64));
    assert!(!work_dir.exists(), "intermediates are removed");
}

#[test]
fn same_seed_reproduces_the_script() {
    let fixture = Fixture::new();
    let first = PipelineEngine::new(fixture.settings("a"))
        .and_then(|engine| engine.run())
        .expect("first run");
    let second = PipelineEngine::new(fixture.settings("b"))
        .and_then(|engine| engine.run())
        .expect("second run");

    assert_eq!(first.report.output_sha256, second.report.output_sha256);
    assert_eq!(
        read(&fixture.root.join("a.sql")),
        read(&fixture.root.join("b.sql"))
    );
}

#[test]
fn prices_are_converted_to_target_currency() {
    let fixture = Fixture::new();
    let settings = PipelineSettings {
        keep_intermediates: true,
        ..fixture.settings("prices")
    };
    let converted = settings.work_dir.join("prices_in_zar.sql");
    let engine = PipelineEngine::new(settings).expect("engine");
    engine.run_step(Step::Prices).expect("prices step");

    assert_eq!(
        read(&converted),
        "INSERT INTO `Prices` (`initial_price`, `final_price`) VALUES\n\
         (178.30, 142.64),\n(100, 90),\n(124.00, 99.20);\n"
    );
}

#[test]
fn mismatched_counts_abort_the_run() {
    let fixture = Fixture::new();
    fs::write(
        fixture.input("dimensions.sql"),
        "INSERT INTO `Products` (`dimensions`) VALUES\n('1 cm'),\n(NULL);\n",
    )
    .expect("rewrite dimensions");
    let engine = PipelineEngine::new(fixture.settings("mismatch")).expect("engine");

    match engine.run() {
        Err(PipelineError::Failed {
            step,
            source,
            report,
        }) => {
            assert_eq!(step, Step::Specifications);
            assert!(matches!(*source, PipelineError::CountMismatch { .. }));
            assert_eq!(report.steps.len(), 2);
        }
        other => panic!("expected count mismatch, got {other:?}"),
    }
    assert!(!fixture.root.join("mismatch.sql").exists());
}

#[test]
fn missing_input_aborts_the_run() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.input("retailers.txt")).expect("remove retailers");
    let engine = PipelineEngine::new(fixture.settings("missing")).expect("engine");

    match engine.run() {
        Err(PipelineError::Failed { step, source, .. }) => {
            assert_eq!(step, Step::Retailers);
            assert!(
                matches!(&*source, PipelineError::MissingInput(path) if path.ends_with("retailers.txt"))
            );
        }
        other => panic!("expected missing input, got {other:?}"),
    }
}

#[test]
fn malformed_bulk_record_is_skipped() {
    let fixture = Fixture::new();
    let bulk = BULK.replace(
        "('Gadget', 'It\\'s (mostly) harmless', '2024-02-01', ",
        "('Gadget', 'It\\'s (mostly) harmless', ",
    );
    fs::write(fixture.input("bulk.sql"), bulk).expect("rewrite bulk");
    let settings = PipelineSettings {
        keep_intermediates: true,
        ..fixture.settings("malformed")
    };
    let merged = settings.work_dir.join("merged_products.sql");
    let engine = PipelineEngine::new(settings).expect("engine");

    let result = engine
        .run_steps(&[Step::Brands, Step::Categories, Step::Specifications, Step::Products])
        .expect("merge");
    assert_eq!(result.report.warning_count("malformed_record"), 1);

    let merged = read(&merged);
    assert!(merged.contains("(1, 1, 1, 'Widget'"));
    assert!(merged.contains("(2, 1, NULL, 'Gizmo'"));
    assert!(!merged.contains("Gadget"));
}

#[test]
fn missing_optional_users_section_is_skipped() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.input("users.sql")).expect("remove users");
    let engine = PipelineEngine::new(fixture.settings("nousers")).expect("engine");

    let result = engine.run().expect("pipeline run");
    assert_eq!(result.report.warning_count("missing_section"), 1);
    let script = read(&fixture.root.join("nousers.sql"));
    assert!(!script.contains("-- Table: User\n"));
    assert!(script.contains("-- Table: Review\n"));
}

#[test]
fn unescaped_quote_in_one_record_skips_only_that_record() {
    let fixture = Fixture::new();
    let bulk = BULK.replace("'It\\'s (mostly) harmless'", "'It's (mostly) harmless'");
    fs::write(fixture.input("bulk.sql"), bulk).expect("rewrite bulk");
    let settings = PipelineSettings {
        keep_intermediates: true,
        ..fixture.settings("quote")
    };
    let merged = settings.work_dir.join("merged_products.sql");
    let engine = PipelineEngine::new(settings).expect("engine");

    let result = engine
        .run_steps(&[Step::Brands, Step::Categories, Step::Specifications, Step::Products])
        .expect("merge");
    assert_eq!(result.report.warning_count("malformed_record"), 1);
    assert_eq!(result.report.warning_count("unterminated_record"), 0);
    assert_eq!(result.report.step("products").map(|s| s.records_written), Some(2));

    let merged = read(&merged);
    assert!(merged.contains("(1, 1, 1, 'Widget'"));
    assert!(merged.contains("(2, 1, NULL, 'Gizmo'"));
    assert!(!merged.contains("Gadget"));
}

#[test]
fn cleanup_leaves_unrelated_files_in_work_dir() {
    let fixture = Fixture::new();
    let settings = fixture.settings("foreign");
    let work_dir = settings.work_dir.clone();
    fs::create_dir_all(&work_dir).expect("create work dir");
    fs::write(work_dir.join("notes.txt"), "keep me").expect("write notes");
    let engine = PipelineEngine::new(settings).expect("engine");

    let result = engine.run().expect("pipeline run");
    assert_eq!(read(&work_dir.join("notes.txt")), "keep me");
    assert!(!work_dir.join("merged_products.sql").exists());
    assert!(!work_dir.join("reviews.sql").exists());
    assert_eq!(result.report.warning_count("work_dir_kept"), 1);
}

#[test]
fn work_dir_resolving_to_fixture_root_keeps_inputs_and_output() {
    let fixture = Fixture::new();
    let settings = PipelineSettings {
        work_dir: fixture.root.join("work").join(".."),
        ..fixture.settings("parent")
    };
    let output = settings.output_path.clone();
    let engine = PipelineEngine::new(settings).expect("engine");

    engine.run().expect("pipeline run");
    assert!(read(&output).contains("-- Table: Product\n"));
    assert_eq!(read(&fixture.input("bulk.sql")), BULK);
    assert!(fixture.root.join("schema.sql").exists());
    assert!(!fixture.root.join("merged_products.sql").exists());
}
