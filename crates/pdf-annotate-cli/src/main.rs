use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use pdf_annotate::{DocumentSource, EditorOptions, Thumbnail};
use pdf_annotate_runtime::{AppLogger, EditorCommand, EditorUpdate, worker_task};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

#[cfg(feature = "pdfium")]
type Source = pdf_annotate::PdfiumSource;
#[cfg(not(feature = "pdfium"))]
type Source = pdf_annotate::BlankSource;

#[derive(Parser)]
#[command(name = "pdfa", about = "PDF annotation CLI", version)]
struct Cli {
    /// Editor configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the log after the command finishes
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show page count, sizes and rotations
    Info {
        /// Input PDF file
        input: PathBuf,
    },

    /// Apply a JSON edit script and export the edited document
    Edit {
        /// Input PDF file
        input: PathBuf,

        /// Edit script: a JSON array of commands tagged by "op"
        #[arg(short, long)]
        script: PathBuf,

        /// Directory for the exported file
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Render page thumbnails as PNG files
    Thumbnails {
        /// Input PDF file
        input: PathBuf,

        /// Directory for the PNG files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Thumbnail scale (overrides the configuration)
        #[arg(long)]
        scale: Option<f32>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = AppLogger::new(1000, level).init()?;

    let mut options = match &cli.config {
        Some(path) => EditorOptions::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EditorOptions::default(),
    };

    let result = match cli.command {
        Commands::Info { input } => info(&input).await,
        Commands::Edit {
            input,
            script,
            output_dir,
        } => edit(input, &script, output_dir, options).await,
        Commands::Thumbnails {
            input,
            output_dir,
            scale,
        } => {
            if let Some(scale) = scale {
                options.view.thumbnail_scale = scale;
            }
            options.validate()?;
            thumbnails(input, &output_dir, options).await
        }
    };

    if cli.verbose {
        for entry in logger.get_entries() {
            eprintln!("{}", entry);
        }
    }

    result
}

async fn info(input: &Path) -> Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let source = Source::open(Arc::from(bytes)).await?;

    println!("{}: {} pages", input.display(), source.page_count());
    for page in 1..=source.page_count() {
        let (width, height) = source.page_size(page)?;
        let rotation = source.intrinsic_rotation(page)?;
        println!(
            "  Page {}: {:.0} x {:.0} pt, rotated {}°",
            page,
            width,
            height,
            rotation.degrees()
        );
    }
    Ok(())
}

async fn edit(
    input: PathBuf,
    script: &Path,
    output_dir: PathBuf,
    options: EditorOptions,
) -> Result<()> {
    let text = tokio::fs::read_to_string(script)
        .await
        .with_context(|| format!("Failed to read script {}", script.display()))?;
    let steps: Vec<EditorCommand> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid edit script {}", script.display()))?;
    let step_count = steps.len();

    let mut commands = vec![EditorCommand::Open { path: input }];
    commands.extend(steps);
    commands.push(EditorCommand::Export { dir: output_dir });
    commands.push(EditorCommand::Close);

    let updates = run_session(commands, options).await;

    let mut exported = None;
    let mut page_count = 0;
    for update in updates {
        match update {
            EditorUpdate::Exported { path } => exported = Some(path),
            EditorUpdate::Error { message } => eprintln!("{}", message),
            EditorUpdate::Loaded { page_count: count } => page_count = count,
            EditorUpdate::PagesChanged { order } => page_count = order.len(),
            _ => {}
        }
    }

    let Some(path) = exported else {
        bail!("No document was exported");
    };
    println!(
        "Applied {} steps, {} pages → {}",
        step_count,
        page_count,
        path.display()
    );
    Ok(())
}

async fn thumbnails(input: PathBuf, output_dir: &Path, options: EditorOptions) -> Result<()> {
    let commands = vec![
        EditorCommand::Open { path: input },
        EditorCommand::Thumbnails,
        EditorCommand::Close,
    ];

    let mut rendered = None;
    for update in run_session(commands, options).await {
        match update {
            EditorUpdate::ThumbnailsReady { thumbnails } => rendered = Some(thumbnails),
            EditorUpdate::Error { message } => eprintln!("{}", message),
            _ => {}
        }
    }
    let Some(thumbnails) = rendered else {
        bail!("No thumbnails were rendered");
    };

    tokio::fs::create_dir_all(output_dir).await?;
    let mut written = 0;
    for thumbnail in &thumbnails {
        if write_thumbnail(thumbnail, output_dir).await? {
            written += 1;
        }
    }
    println!(
        "Wrote {} of {} thumbnails → {}",
        written,
        thumbnails.len(),
        output_dir.display()
    );
    Ok(())
}

async fn write_thumbnail(thumbnail: &Thumbnail, output_dir: &Path) -> Result<bool> {
    let Some(raster) = &thumbnail.raster else {
        return Ok(false);
    };
    let png = raster.to_png()?;
    let path = output_dir.join(format!("page_{:03}.png", thumbnail.position + 1));
    tokio::fs::write(&path, png).await?;
    Ok(true)
}

/// Feed `commands` to a worker and collect every update it sends.
///
/// The worker runs on this thread, joined with the collector.
async fn run_session(commands: Vec<EditorCommand>, options: EditorOptions) -> Vec<EditorUpdate> {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    for command in commands {
        let _ = command_tx.send(command);
    }
    drop(command_tx);

    let collect = async {
        let mut updates = Vec::new();
        while let Some(update) = update_rx.recv().await {
            updates.push(update);
        }
        updates
    };

    let ((), updates) = tokio::join!(
        worker_task::<Source>(options, command_rx, update_tx),
        collect
    );
    updates
}
