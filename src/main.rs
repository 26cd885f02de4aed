use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use form2txt::{CandidateSheetNames, ConverterBuilder, LineEnding, OutputLayout};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Extract the narrative sheets of Excel securities reports into text files.
#[derive(Parser, Debug)]
#[command(name = "form2txt", version, about)]
struct Cli {
    /// Directory searched recursively for .xls/.xlsx files
    #[arg(value_name = "INPUT_DIR")]
    input: Option<PathBuf>,

    /// Empty (or missing) directory receiving the .txt files
    #[arg(value_name = "OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Write every file directly into OUTPUT_DIR as <parent>_<name>.txt
    #[arg(long)]
    flatten: bool,

    /// Sheet to extract, in output order (repeatable; defaults to the report sections)
    #[arg(long = "sheet", value_name = "NAME")]
    sheets: Vec<String>,

    /// Line terminator of the text files
    #[arg(long, value_enum, default_value_t = LineEndingArg::Native)]
    line_ending: LineEndingArg,

    /// Let a later file overwrite an output already written in this run
    #[arg(long)]
    allow_overwrite: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LineEndingArg {
    Native,
    Lf,
    Crlf,
}

impl From<LineEndingArg> for LineEnding {
    fn from(arg: LineEndingArg) -> Self {
        match arg {
            LineEndingArg::Native => LineEnding::Native,
            LineEndingArg::Lf => LineEnding::Lf,
            LineEndingArg::Crlf => LineEnding::CrLf,
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn print_usage() {
    println!("{}", Cli::command().render_usage());
}

/// 出力先が使えるかを確認し、なければ作成する（使えない場合は`false`）
fn prepare_output_dir(output: &Path) -> bool {
    if output.exists() {
        if !output.is_dir() {
            return false;
        }
        return match fs::read_dir(output) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) => {
                tracing::error!(output = %output.display(), error = %e, "cannot read output directory");
                false
            }
        };
    }

    match fs::create_dir_all(output) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(output = %output.display(), error = %e, "cannot create output directory");
            false
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (Some(input), Some(output)) = (cli.input.as_deref(), cli.output.as_deref()) else {
        print_usage();
        return Ok(());
    };
    if !input.is_dir() || !prepare_output_dir(output) {
        print_usage();
        return Ok(());
    }

    let mut builder = ConverterBuilder::new()
        .with_layout(if cli.flatten {
            OutputLayout::Flattened
        } else {
            OutputLayout::Mirrored
        })
        .with_line_ending(cli.line_ending.into())
        .detect_collisions(!cli.allow_overwrite);
    if !cli.sheets.is_empty() {
        builder = builder.with_candidate_sheets(CandidateSheetNames::new(cli.sheets.iter().cloned()));
    }
    let converter = builder.build().context("invalid configuration")?;

    let summary = converter
        .tree()
        .convert_all(input, output)
        .with_context(|| format!("failed to convert {}", input.display()))?;

    tracing::info!(
        converted = summary.converted,
        skipped = summary.skipped,
        "finished"
    );
    Ok(())
}
