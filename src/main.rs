use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::{Level, LevelFilter, Log, Metadata, Record};

use guido::{parse_file, write_guido, NodeId, NodeKind, ParserConfig, Score};

/// What to print for a parsed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Indented dump of the score tree
    Tree,
    /// Canonical GUIDO text
    Gmn,
}

/// Parse a GUIDO (.gmn) file and print its score tree.
#[derive(Parser)]
#[command(name = "guido", version, about = "GUIDO music notation parser")]
struct Cli {
    /// Path to the .gmn source file
    input: PathBuf,

    /// YAML parser configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log every grammar production as it is tried
    #[arg(long)]
    trace: bool,

    /// Log tree-building steps
    #[arg(short, long)]
    verbose: bool,

    /// Don't report warnings
    #[arg(long)]
    no_warnings: bool,

    /// Output format
    #[arg(long, default_value = "tree", value_enum)]
    format: Format,
}

/// Writes log records to stderr.
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Warn => eprintln!("Warning: {}", record.args()),
            Level::Error => eprintln!("Error: {}", record.args()),
            _ => eprintln!("[{}] {}", record.level(), record.args()),
        }
    }

    fn flush(&self) {}
}

fn init_logging(cli: &Cli) {
    let level = if cli.trace {
        LevelFilter::Trace
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let logger = Box::new(StderrLogger { level });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut config = match &cli.config {
        Some(path) => match ParserConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        },
        None => ParserConfig::default(),
    };
    config.trace |= cli.trace;
    if cli.no_warnings {
        config.warnings = false;
    }

    // Warnings are logged by the parser as they are collected.
    let parsed = match parse_file(&cli.input, &config) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    match cli.format {
        Format::Tree => print!("{}", dump_tree(&parsed.score)),
        Format::Gmn => print!("{}", write_guido(&parsed.score)),
    }
}

fn dump_tree(score: &Score) -> String {
    let mut out = String::new();
    dump_node(score, score.root(), 0, &mut out);
    out
}

fn dump_node(score: &Score, id: NodeId, depth: usize, out: &mut String) {
    let node = &score[id];
    let label = match &node.kind {
        NodeKind::Collection { kind, .. } => kind.name().to_string(),
        NodeKind::Note(note) => format!("Note {}{}", note.pitch, note.duration),
        NodeKind::Rest(duration) => format!("Rest {}", duration),
        NodeKind::Empty(duration) => format!("Empty {}", duration),
        NodeKind::Tag(tag) => format!("Tag {}", tag),
        NodeKind::Barline => "Barline".to_string(),
    };
    out.push_str(&format!("{}{} @ {}\n", "  ".repeat(depth), label, node.time_spine));
    for child in score.children(id) {
        dump_node(score, *child, depth + 1, out);
    }
}
