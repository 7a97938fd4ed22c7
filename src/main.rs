use anyhow::{Context, Result, ensure};
use clap::{Args, Parser, Subcommand};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use grove_forest::{
    Dataset, ForestConfig, ForestError, RandomForest, RankedFeature, ValidationSummary, accuracy,
};

#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Random forest training, scoring and streaming on synthetic data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for data generation and tree building
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of concurrent tree builders (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Synthetic data shape: uniform features labelled `round(sum) mod classes`.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Number of feature columns
    #[arg(long, default_value_t = 4)]
    features: usize,

    /// Number of classes
    #[arg(long, default_value_t = 2)]
    classes: usize,
}

/// Tree-growth parameters. Unset values are derived from the data.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Candidate features drawn per split (default: floor(sqrt(features)))
    #[arg(long)]
    m_features: Option<usize>,

    /// Row count at or below which a node becomes a leaf
    #[arg(long)]
    leaf_size: Option<usize>,

    /// Depth at which nodes become leaves
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Train a forest, evaluate it on a held-out split and score the training rows
    Train {
        /// Number of rows to generate
        #[arg(long, default_value_t = 1000)]
        rows: usize,

        /// Fraction of rows held out for testing
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        /// Number of trees
        #[arg(long, default_value_t = 50)]
        trees: usize,

        /// Standard deviations below the mean isolation depth that flag an outlier
        #[arg(long, default_value_t = 2.0)]
        outlier_cutoff: f64,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Seed a forest, then feed it rows one at a time
    Stream {
        /// Rows used to train the initial forest
        #[arg(long, default_value_t = 100)]
        seed_rows: usize,

        /// Rows streamed after the initial training
        #[arg(long, default_value_t = 500)]
        stream_rows: usize,

        /// Trees in the initial forest
        #[arg(long, default_value_t = 20)]
        trees: usize,

        /// Trees grown per streamed row
        #[arg(long, default_value_t = 1)]
        trees_per_row: usize,

        /// Keep at most this many rows (0 = unlimited)
        #[arg(long, default_value_t = 500)]
        max_rows: usize,

        /// Keep at most this many trees (0 = unlimited)
        #[arg(long, default_value_t = 100)]
        max_trees: usize,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    n_train: usize,
    n_test: usize,
    n_features: usize,
    n_classes: usize,
    n_trees: usize,
    accuracy: f64,
    weighted_accuracy: Option<f64>,
    validation: ValidationSummary,
    importances: Vec<RankedFeature>,
    isolation: IsolationOutput,
}

#[derive(Serialize)]
struct IsolationOutput {
    mean_depth: f64,
    std_dev: f64,
    outliers: Vec<usize>,
}

#[derive(Serialize)]
struct StreamOutput {
    n_streamed: usize,
    prequential_accuracy: f64,
    n_rows: usize,
    n_trees: usize,
    validation: ValidationSummary,
    importances: Vec<RankedFeature>,
}

/// Generate rows of uniform features in [0, 1) labelled `round(sum) mod classes`.
fn generate(n_rows: usize, data: &DataArgs, rng: &mut impl Rng) -> (Vec<Vec<f64>>, Vec<usize>) {
    (0..n_rows)
        .map(|_| {
            let row: Vec<f64> = (0..data.features).map(|_| rng.r#gen::<f64>()).collect();
            let label = (row.iter().sum::<f64>().round() as usize) % data.classes;
            (row, label)
        })
        .unzip()
}

fn build_config(cli_seed: u64, threads: Option<usize>, args: &ForestArgs) -> ForestConfig {
    ForestConfig::new()
        .with_seed(cli_seed)
        .with_n_workers(threads.unwrap_or(0))
        .with_m_features(args.m_features.unwrap_or(0))
        .with_leaf_size(args.leaf_size.unwrap_or(0))
        .with_max_depth(args.max_depth.unwrap_or(0))
}

/// Accuracy of the validation-weighted vote, or `None` when no tree carries weight.
fn weighted_accuracy(
    forest: &RandomForest,
    rows: &[Vec<f64>],
    labels: &[usize],
) -> Result<Option<f64>> {
    let mut predictions = Vec::with_capacity(rows.len());
    for row in rows {
        match forest.weight_vote(row) {
            Ok(dist) => predictions.push(dist.predicted_class()),
            Err(ForestError::ZeroTotalWeight) => {
                warn!("no tree has a positive validation weight; skipping weighted vote");
                return Ok(None);
            }
            Err(e) => return Err(e).context("weighted vote failed"),
        }
    }
    Ok(Some(accuracy(&predictions, labels)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);

    match cli.command {
        Command::Train {
            rows,
            test_fraction,
            trees,
            outlier_cutoff,
            data,
            forest,
        } => {
            ensure!(data.classes >= 1, "--classes must be at least 1");
            ensure!(
                (0.0..1.0).contains(&test_fraction),
                "--test-fraction must be in [0, 1), got {test_fraction}"
            );

            // 1. Generate and split
            let (features, labels) = generate(rows, &data, &mut rng);
            let n_test = (rows as f64 * test_fraction).round() as usize;
            let n_train = rows - n_test;
            let (train_rows, test_rows) = features.split_at(n_train);
            let (train_labels, test_labels) = labels.split_at(n_train);
            info!(n_train, n_test, n_features = data.features, "synthetic data generated");

            // 2. Train
            let dataset = Dataset::new(train_rows.to_vec(), train_labels.to_vec())
                .context("invalid training data")?;
            let config = build_config(cli.seed, cli.threads, &forest);
            let model = config.fit(dataset, trees).context("training failed")?;

            // 3. Evaluate on the held-out rows
            let (test_accuracy, weighted) = if test_rows.is_empty() {
                (f64::NAN, None)
            } else {
                let predictions = model.predict(test_rows).context("prediction failed")?;
                (
                    accuracy(&predictions, test_labels)?,
                    weighted_accuracy(&model, test_rows, test_labels)?,
                )
            };
            info!(accuracy = test_accuracy, ?weighted, "held-out evaluation complete");

            // 4. Score training rows
            let scores = model.isolation_forest()?;
            let outliers = scores.outliers(outlier_cutoff);
            info!(
                mean_depth = scores.mean,
                std_dev = scores.std_dev,
                n_outliers = outliers.len(),
                "isolation depths computed"
            );

            let output = TrainOutput {
                n_train,
                n_test,
                n_features: model.n_features(),
                n_classes: model.n_classes(),
                n_trees: model.n_trees(),
                accuracy: test_accuracy,
                weighted_accuracy: weighted,
                validation: model.validation_summary()?,
                importances: model.ranked_importances(),
                isolation: IsolationOutput {
                    mean_depth: scores.mean,
                    std_dev: scores.std_dev,
                    outliers,
                },
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Stream {
            seed_rows,
            stream_rows,
            trees,
            trees_per_row,
            max_rows,
            max_trees,
            data,
            forest,
        } => {
            ensure!(data.classes >= 1, "--classes must be at least 1");

            // 1. Seed the forest
            let (features, labels) = generate(seed_rows, &data, &mut rng);
            let dataset = Dataset::new(features, labels).context("invalid seed data")?;
            let config = build_config(cli.seed, cli.threads, &forest)
                .with_max_rows(max_rows)
                .with_max_trees(max_trees);
            let mut model = config.fit(dataset, trees).context("training failed")?;

            // 2. Predict each row before learning from it
            let (stream, stream_labels) = generate(stream_rows, &data, &mut rng);
            let mut correct = 0usize;
            for (i, (row, label)) in stream.into_iter().zip(stream_labels).enumerate() {
                if model.predict_one(&row)? == label {
                    correct += 1;
                }
                model
                    .add_data_row(row, label, trees_per_row)
                    .with_context(|| format!("failed to add streamed row {i}"))?;
            }
            let prequential_accuracy = if stream_rows == 0 {
                f64::NAN
            } else {
                correct as f64 / stream_rows as f64
            };
            info!(
                prequential_accuracy,
                n_rows = model.dataset().len(),
                n_trees = model.n_trees(),
                "stream complete"
            );

            let output = StreamOutput {
                n_streamed: stream_rows,
                prequential_accuracy,
                n_rows: model.dataset().len(),
                n_trees: model.n_trees(),
                validation: model.validation_summary()?,
                importances: model.ranked_importances(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
