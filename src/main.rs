use std::fs;
use std::path::{ Path, PathBuf };

use anyhow::{ Context, Result, bail };
use clap::{ Args, Parser, Subcommand };

use microtrain::{
  checkpoint,
  config::{ TrainConfig, OptimizerKind },
  data::{ Dataset, synthetic },
  loss::LossKind,
  module::{ Activation, Module, Sequential },
  train::{ Trainer, evaluate },
  visualize::{ render_confusion, render_curve, render_image },
  manual_seed,
};


#[derive(Parser)]
#[command(name = "microtrain")]
#[command(about = "Train a feed-forward image classifier with gradient descent")]
#[command(version)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Train a classifier and report its test accuracy
  Train {
    #[command(flatten)]
    data: DataArgs,

    #[command(flatten)]
    params: HyperParams,

    /// Write the trained parameters to this file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Write per-epoch statistics as JSON to this file
    #[arg(long, value_name = "FILE")]
    history: Option<PathBuf>,
  },

  /// Score a saved checkpoint on the test split
  Evaluate {
    #[command(flatten)]
    data: DataArgs,

    #[command(flatten)]
    params: HyperParams,

    /// Checkpoint written by `train --save`
    #[arg(long, value_name = "FILE")]
    checkpoint: PathBuf,
  },

  /// Print a few images along with their labels
  Show {
    #[command(flatten)]
    data: DataArgs,

    /// Number of images to print
    #[arg(short = 'n', long, default_value_t = 4)]
    count: usize,

    /// Intensity at or below which pixels stay blank
    #[arg(long, default_value_t = 0.2)]
    threshold: f32,

    /// Show images from the test split
    #[arg(long)]
    test: bool,

    #[arg(long, default_value_t = 42)]
    seed: u64,
  },
}

#[derive(Args)]
struct DataArgs {
  /// Directory holding the unpacked Fashion-MNIST IDX files
  #[arg(long, value_name = "DIR", required_unless_present = "synthetic")]
  data_dir: Option<PathBuf>,

  /// Use generated blobs instead of files
  #[arg(long, conflicts_with = "data_dir")]
  synthetic: bool,

  /// Number of generated samples, a fifth of which is held out for testing
  #[arg(long, default_value_t = 2000)]
  samples: usize,
}

/// Flags that override values from the config file.

#[derive(Args)]
struct HyperParams {
  /// JSON file with training configuration
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  #[arg(long)]
  epochs: Option<usize>,

  #[arg(long)]
  batch_size: Option<usize>,

  #[arg(long)]
  learning_rate: Option<f64>,

  /// Hidden layer sizes, comma separated
  #[arg(long, value_delimiter = ',')]
  hidden: Option<Vec<usize>>,

  #[arg(long)]
  activation: Option<Activation>,

  #[arg(long)]
  optimizer: Option<OptimizerKind>,

  #[arg(long)]
  loss: Option<LossKind>,

  #[arg(long)]
  seed: Option<u64>,
}

impl HyperParams {
  fn resolve(self) -> Result<TrainConfig> {
    let mut config = match &self.config {
      Some(path) => TrainConfig::from_json_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()) )?,
      None => TrainConfig::default(),
    };
    if let Some(epochs) = self.epochs { config = config.epochs(epochs) }
    if let Some(size) = self.batch_size { config = config.batch_size(size) }
    if let Some(rate) = self.learning_rate { config = config.learning_rate(rate) }
    if let Some(hidden) = &self.hidden { config = config.hidden(hidden) }
    if let Some(activation) = self.activation { config = config.activation(activation) }
    if let Some(optimizer) = self.optimizer { config = config.optimizer(optimizer) }
    if let Some(loss) = self.loss { config = config.loss(loss) }
    if let Some(seed) = self.seed { config = config.seed(seed) }
    config.validate()?;
    Ok(config)
  }
}


fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  if let Err(e) = run(Cli::parse()) {
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  match cli.command {
    Command::Train { data, params, save, history } => train(&data, params.resolve()?, save.as_deref(), history.as_deref()),
    Command::Evaluate { data, params, checkpoint } => score(&data, params.resolve()?, &checkpoint),
    Command::Show { data, count, threshold, test, seed } => show(&data, count, threshold, test, seed),
  }
}

/// Training and test split of the chosen dataset.

fn load_data(args: &DataArgs) -> Result<(Dataset<f32>, Dataset<f32>)> {
  match &args.data_dir {
    Some(dir) => {
      let train = Dataset::fashion_mnist(dir, true)
        .with_context(|| format!("Failed to load training set from {}", dir.display()) )?;
      let test = Dataset::fashion_mnist(dir, false)
        .with_context(|| format!("Failed to load test set from {}", dir.display()) )?;
      Ok((train, test))
    },
    None if args.synthetic => {
      let data = synthetic::blobs(args.samples, 10, 14, 14, 0.3)?;
      Ok(data.split(0.2))
    },
    None => bail!("Either --data-dir or --synthetic is required"),
  }
}

fn build_model(data: &Dataset<f32>, config: &TrainConfig) -> Sequential<f32> {
  let (height, width) = data.image_dims();
  Sequential::classifier(height * width, &config.hidden, data.num_classes(), config.activation)
}

fn train(args: &DataArgs, config: TrainConfig, save: Option<&Path>, history_path: Option<&Path>) -> Result<()> {
  manual_seed(config.seed);
  let (data, test) = load_data(args)?;
  let (train, validation) = data.split(config.validation_fraction);
  log::info!("{} training, {} validation and {} test images of {:?}",
    train.len(), validation.len(), test.len(), train.image_dims());

  let model = build_model(&train, &config);
  log::info!("Model {} with {} parameters", model.describe(), model.num_parameters());

  let mut trainer = Trainer::new(config.clone())?;
  let history = trainer.fit(&model, &train, Some(&validation))?;
  println!("Training loss per epoch:\n{}\n", render_curve(&history.train_losses(), 8));

  let result = evaluate(&model, &test, config.batch_size, config.loss)?;
  println!("Test loss {:.4}, accuracy {:.2}%", result.loss, result.accuracy * 100.0);

  if let Some(path) = save {
    checkpoint::save(&model, path)
      .with_context(|| format!("Failed to save checkpoint {}", path.display()) )?;
  }
  if let Some(path) = history_path {
    fs::write(path, serde_json::to_string_pretty(&history)?)
      .with_context(|| format!("Failed to write history {}", path.display()) )?;
  }
  Ok(())
}

fn score(args: &DataArgs, config: TrainConfig, path: &Path) -> Result<()> {
  manual_seed(config.seed);
  let (_, test) = load_data(args)?;
  let model = build_model(&test, &config);
  checkpoint::load(&model, path)
    .with_context(|| format!("Failed to load checkpoint {}", path.display()) )?;
  let result = evaluate(&model, &test, config.batch_size, config.loss)?;
  println!("Test loss {:.4}, accuracy {:.2}% on {} images\n", result.loss, result.accuracy * 100.0, test.len());
  println!("{}", render_confusion(&result.confusion, &test.classes));
  Ok(())
}

fn show(args: &DataArgs, count: usize, threshold: f32, test: bool, seed: u64) -> Result<()> {
  manual_seed(seed);
  let (train, test_data) = load_data(args)?;
  let data = if test { test_data } else { train };
  for i in 0..count.min(data.len()) {
    let (image, label) = data.sample(i);
    println!("#{} {} ({})\n{}\n", i, data.class_name(label), label, render_image(&image, threshold));
  }
  Ok(())
}
