use std::env;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use log::{info, LevelFilter};
use ndarray::Array2;
use structopt::StructOpt;

use vocnet::config::PipelineConfig;
use vocnet::dataset::common_structs::{JoinedAnnotation, TargetSize, Task};
use vocnet::dataset::data_loaders::voc_batch_loader::VocBatchLoader;
use vocnet::dataset::data_transformers::voc_dataset::{
    join_annotations, primary_objects, read_annotations_file,
};
use vocnet::dataset::DataLoader;
use vocnet::metrics::mean_iou;

#[derive(Debug, Clone, StructOpt)]
/// Prepare Pascal VOC annotations and image batches for classification and localization
struct Args {
    #[structopt(long, default_value = "vocnet.json5")]
    /// configuration file, optional when both paths are given on the command line
    config_file: PathBuf,
    #[structopt(long)]
    annotations_file: Option<PathBuf>,
    #[structopt(long)]
    image_dir: Option<PathBuf>,
    #[structopt(long)]
    batch_size: Option<usize>,
    #[structopt(long)]
    /// walk the table in order instead of drawing random rows
    no_shuffle: bool,
    #[structopt(long)]
    /// classification, localization or both
    task: Option<Task>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, StructOpt)]
enum Command {
    /// Write the joined and the primary object tables as json
    Tables {
        #[structopt(long, default_value = "tables")]
        output_dir: PathBuf,
    },
    /// Draw batches and report their shapes and targets
    Batches {
        #[structopt(long, default_value = "3")]
        count: usize,
    },
}

fn main() -> Result<()> {
    let mut builder = pretty_env_logger::formatted_builder();
    match env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            builder.filter_level(LevelFilter::Info);
        }
    }
    builder.init();

    let args = Args::from_args();
    let config = load_config(&args)?;

    let tables = read_annotations_file(&config.annotations_file)?;
    let joined = join_annotations(&tables, config.target())?;
    let primary = primary_objects(&joined);
    info!(
        "{} joined boxes, {} images with a primary object",
        joined.len(),
        primary.len()
    );

    match args.command {
        Command::Tables { output_dir } => write_tables(&output_dir, &joined, &primary),
        Command::Batches { count } => {
            let rows = if config.primary_only { primary } else { joined };
            preview_batches(&config, rows, count)
        }
    }
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = if args.config_file.exists() {
        PipelineConfig::open(&args.config_file)?
    } else {
        match (&args.annotations_file, &args.image_dir) {
            (Some(annotations_file), Some(image_dir)) => {
                PipelineConfig::new(annotations_file, image_dir)
            }
            _ => bail!(
                "config file {} not found, pass --annotations-file and --image-dir instead",
                args.config_file.display()
            ),
        }
    };
    if let Some(annotations_file) = &args.annotations_file {
        config.annotations_file = annotations_file.clone();
    }
    if let Some(image_dir) = &args.image_dir {
        config.image_dir = image_dir.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if args.no_shuffle {
        config.shuffle = false;
    }
    if let Some(task) = args.task {
        config.task = task;
    }
    config.validate()?;
    Ok(config)
}

fn write_tables(
    output_dir: &Path,
    joined: &[JoinedAnnotation],
    primary: &[JoinedAnnotation],
) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create {}", output_dir.display()))?;
    for (file_name, rows) in &[("joined.json", joined), ("primary.json", primary)] {
        let path = output_dir.join(file_name);
        let file =
            File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), rows)?;
        info!("wrote {} rows to {}", rows.len(), path.display());
    }
    Ok(())
}

/// Box covering the whole target image, used as a reference to sanity check box targets
fn whole_image_boxes(nb_boxes: usize, target: TargetSize) -> Array2<f32> {
    let corners = [
        0.,
        0.,
        target.width as f32 - 1.,
        target.height as f32 - 1.,
    ];
    Array2::from_shape_fn((nb_boxes, 4), |(_, coord)| corners[coord])
}

fn preview_batches(
    config: &PipelineConfig,
    rows: Vec<JoinedAnnotation>,
    count: usize,
) -> Result<()> {
    let mut loader = VocBatchLoader::new(&config.image_dir, rows, config.loader_options())?;
    for batch_index in 0..count {
        let batch = loader.next_batch()?;
        info!(
            "batch {}: images {:?}, next row {} of {}",
            batch_index,
            batch.images.dim(),
            loader.next_element_index(),
            loader.max_elem_index()
        );
        if batch.targets.classes().is_some() {
            let per_class = batch
                .indices
                .iter()
                .map(|&index| loader.rows()[index].category_name.as_str())
                .counts()
                .into_iter()
                .sorted()
                .map(|(name, count)| format!("{}: {}", name, count))
                .join(", ");
            info!("batch {}: classes {}", batch_index, per_class);
        }
        if let Some(boxes) = batch.targets.boxes() {
            let reference = whole_image_boxes(batch.len(), config.target());
            let iou = mean_iou(boxes.view(), reference.view(), config.iou_policy)?;
            info!(
                "batch {}: boxes {:?}, mean IoU against the whole image {:.3}",
                batch_index,
                boxes.dim(),
                iou
            );
        }
    }
    Ok(())
}
