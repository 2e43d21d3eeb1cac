//! digit-scanner CLI: train, test and query feed-forward digit classifiers on MNIST.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use digit_scanner::datasets::{self, Split};
use digit_scanner::training::TrainingOptions;
use digit_scanner::{
    load_config, model_summary, render_digit, summary_table, DatasetWindow, DigitScanner,
    TrainingConfig,
};
use log::info;
use std::env;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "digit-scanner")]
#[command(about = "Feed-forward neural network for handwritten digit recognition")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a network on the MNIST training set
    Train {
        /// Directory holding the MNIST IDX files
        #[arg(short, long)]
        data: PathBuf,

        /// Layer sizes of a new network, input first
        #[arg(short, long, value_delimiter = ',', conflicts_with = "model_in")]
        layers: Option<Vec<usize>>,

        /// Continue training a saved network
        #[arg(long)]
        model_in: Option<PathBuf>,

        /// JSON training configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        epochs: Option<usize>,

        /// Mini-batch size
        #[arg(long)]
        batch: Option<usize>,

        /// Learning rate
        #[arg(long)]
        eta: Option<f64>,

        /// L2 weight decay
        #[arg(long)]
        alpha: Option<f64>,

        /// Training records to skip
        #[arg(long)]
        skip: Option<usize>,

        /// Training records to use
        #[arg(long)]
        count: Option<usize>,

        /// Gradient workers
        #[arg(short, long)]
        threads: Option<usize>,

        /// Random seed for the initial parameters
        #[arg(long)]
        seed: Option<u64>,

        /// Where to save the trained network
        #[arg(short, long)]
        model_out: Option<PathBuf>,

        /// Per-epoch loss history (CSV)
        #[arg(long)]
        loss_log: Option<PathBuf>,

        /// Report the elapsed time
        #[arg(long)]
        time: bool,
    },

    /// Measure the accuracy of a saved network on the MNIST test set
    Test {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(long)]
        model_in: PathBuf,

        /// Test records to skip
        #[arg(long, default_value = "0")]
        skip: usize,

        /// Test records to use
        #[arg(long, default_value = "10000")]
        count: usize,

        #[arg(short, long, default_value = "1")]
        threads: usize,

        #[arg(long)]
        time: bool,
    },

    /// Show one test image and the digit the network reads in it
    Guess {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(long)]
        model_in: PathBuf,

        /// Record of the test set to classify
        #[arg(short, long)]
        index: usize,
    },
}

fn main() -> Result<()> {
    pretty_env_logger::formatted_builder()
        .parse_filters(&env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train {
            data,
            layers,
            model_in,
            config,
            epochs,
            batch,
            eta,
            alpha,
            skip,
            count,
            threads,
            seed,
            model_out,
            loss_log,
            time,
        } => {
            let mut cfg = match config {
                Some(path) => load_config(path)?,
                None => TrainingConfig::default(),
            };
            if let Some(layers) = layers {
                cfg.layers = layers;
            }
            cfg.epochs = epochs.unwrap_or(cfg.epochs);
            cfg.batch_size = batch.unwrap_or(cfg.batch_size);
            cfg.eta = eta.unwrap_or(cfg.eta);
            cfg.alpha = alpha.unwrap_or(cfg.alpha);
            cfg.threads = threads.unwrap_or(cfg.threads);
            cfg.seed = seed.or(cfg.seed);
            cfg.train_window = DatasetWindow::new(
                skip.unwrap_or(cfg.train_window.skip),
                count.unwrap_or(cfg.train_window.count),
            );
            cfg.validate()?;

            let mut scanner = match model_in {
                Some(path) => DigitScanner::<f64>::open(path, cfg.threads)?,
                None => DigitScanner::from_config(&cfg)?,
            };
            println!("{}", model_summary(scanner.network()));

            let start = Instant::now();
            let report = scanner.train(&data, cfg.train_window, &TrainingOptions::from(&cfg))?;
            if time {
                println!("Training took {:.2} s", start.elapsed().as_secs_f64());
            }
            if cfg.track_loss {
                println!("{}", summary_table(&report, "Training Loss"));
            }
            if let Some(path) = loss_log {
                report.write_csv(&path)?;
                info!("loss history written to {}", path.display());
            }
            if let Some(path) = model_out {
                scanner.save(&path)?;
            }
        }
        Commands::Test {
            data,
            model_in,
            skip,
            count,
            threads,
            time,
        } => {
            let scanner = DigitScanner::<f64>::open(model_in, threads)?;
            let start = Instant::now();
            let report = scanner.test(&data, DatasetWindow::new(skip, count))?;
            if time {
                println!("Testing took {:.2} s", start.elapsed().as_secs_f64());
            }
            println!("Accuracy: {}", report);
        }
        Commands::Guess {
            data,
            model_in,
            index,
        } => {
            let scanner = DigitScanner::<f64>::open(model_in, 1)?;
            let sample = datasets::load_mnist::<f64>(&data, Split::Test, DatasetWindow::new(index, 1))?;
            let (image, label) = sample
                .inputs
                .first()
                .zip(sample.labels.first())
                .ok_or_else(|| anyhow!("no test record at index {}", index))?;
            println!("{}", render_digit(image));
            println!("Label: {}  Guess: {}", label, scanner.guess(image)?);
        }
    }
    Ok(())
}
