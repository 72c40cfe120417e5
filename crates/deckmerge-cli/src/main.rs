use clap::{Parser, Subcommand};
use deckmerge_core::{
    verify_package, Assembly, AssemblySettings, AssemblyStatistics, DeckMergeError, OoxmlPackage,
};
use log::{debug, info};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "deckmerge")]
#[command(about = "Assemble presentations from slides of other presentations", long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("DECKMERGE_COMMIT"), ")"))]
struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a deck from a root package and slides of source packages.
    Assemble {
        #[arg(short, long)]
        root: PathBuf,

        /// Source package as NAME=PATH; repeatable.
        #[arg(short, long = "source", value_parser = parse_source)]
        sources: Vec<(String, PathBuf)>,

        /// Slide to append as NAME:N (1-based), in order; repeatable.
        #[arg(long = "slide", value_parser = parse_slide)]
        slides: Vec<(String, usize)>,

        #[arg(short, long)]
        output: PathBuf,

        /// JSON file with assembly settings.
        #[arg(long)]
        settings: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// Print part statistics of a package.
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },
    /// Check a package's relationships, content types and slide ids.
    Verify {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

fn parse_source(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got '{arg}'")),
    }
}

fn parse_slide(arg: &str) -> Result<(String, usize), String> {
    let (name, number) = arg
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NAME:N, got '{arg}'"))?;
    let number: usize = number
        .parse()
        .map_err(|_| format!("'{number}' is not a slide number"))?;
    if name.is_empty() || number == 0 {
        return Err(format!("expected NAME:N with N >= 1, got '{arg}'"));
    }
    Ok((name.to_string(), number))
}

fn load_settings(path: Option<&Path>) -> Result<AssemblySettings, Box<dyn Error>> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            let settings = AssemblySettings::from_json(&json)
                .map_err(|e| format!("{}: {e}", path.display()))?;
            debug!("settings from {}: {settings:?}", path.display());
            Ok(settings)
        }
        None => Ok(AssemblySettings::default()),
    }
}

fn print_statistics(stats: &AssemblyStatistics, json: bool) {
    if json {
        println!("{}", stats.to_json());
        return;
    }
    println!("Slides:             {}", stats.slides);
    println!("Masters:            {}", stats.masters);
    println!("Layouts:            {}", stats.layouts);
    println!("Images:             {}", stats.images);
    println!("Charts:             {}", stats.charts);
    println!("Embedded workbooks: {}", stats.embedded_workbooks);
    println!("Notes slides:       {}", stats.notes_slides);
    println!("Parts:              {}", stats.parts);
}

fn run(command: Commands) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Commands::Assemble {
            root,
            sources,
            slides,
            output,
            settings,
            json,
        } => {
            let settings = load_settings(settings.as_deref())?;
            let mut assembly = Assembly::open_file(&root, settings)?;
            for (name, path) in &sources {
                assembly.load_source_file(name, path)?;
            }
            for (name, number) in &slides {
                assembly.add_slide(name, *number)?;
            }
            assembly.write_file(&output)?;
            info!("wrote {}", output.display());
            print_statistics(&assembly.statistics()?, json);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Info { file, json } => {
            let pkg = OoxmlPackage::open_file(&file)?;
            print_statistics(&AssemblyStatistics::collect(&pkg)?, json);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify { file, json } => {
            let pkg = OoxmlPackage::open_file(&file)?;
            let report = verify_package(&pkg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for violation in &report.violations {
                    println!("{violation}");
                }
                println!(
                    "{}: {} parts checked, {} violation(s)",
                    file.display(),
                    report.parts_checked,
                    report.violations.len()
                );
            }
            Ok(if report.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<DeckMergeError>() {
                Some(err) => eprintln!("error[{}]: {err}", err.code()),
                None => eprintln!("error: {e}"),
            }
            ExitCode::from(2)
        }
    }
}
