use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codeblocks::block::{BlockTree, Category};
use codeblocks::builder::parse_blocks;
use codeblocks::config::{discover, EngineConfig};
use codeblocks::context::FileContext;
use codeblocks::edit::{read_source, BlockEdit};
use codeblocks::lang::Language;
use codeblocks::print::{print_block, print_by_block_path, print_by_spans, SpanMarker};
use codeblocks::span::Span;
use codeblocks::ts::validate_syntax;
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "codeblocks")]
#[command(about = "Semantic block trees for source files: outline, excerpt and edit", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./codeblocks.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log engine internals to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the block outline of a file
    Tree {
        file: PathBuf,

        /// Emit the outline as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a file, or an excerpt of it
    Print {
        file: PathBuf,

        /// Keep lines START:END (0-indexed, inclusive)
        #[arg(short, long = "span", value_parser = parse_line_range)]
        spans: Vec<(usize, usize)>,

        /// Keep the block at a dotted path such as Foo.bar
        #[arg(short, long = "path")]
        paths: Vec<String>,

        /// Leave no marker where blocks were skipped
        #[arg(long)]
        no_marker: bool,

        /// Show where code would be added inside the single --path block
        #[arg(long)]
        add: bool,
    },

    /// Verify that every supported file under a path round-trips
    Check { path: PathBuf },

    /// Replace a block, or add code inside it
    Edit {
        file: PathBuf,

        /// Target block path or span id (Foo.bar or Foo.bar_L10_L12)
        #[arg(short, long)]
        path: String,

        /// File holding the new code ("-" reads stdin)
        #[arg(short, long = "with")]
        with: PathBuf,

        /// Add the code inside the target instead of replacing it
        #[arg(long)]
        add: bool,

        /// Show what would change without writing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cwd = env::current_dir().context("failed to read current directory")?;
    let config = discover(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Tree { file, json } => cmd_tree(&file, json),

        Commands::Print {
            file,
            spans,
            paths,
            no_marker,
            add,
        } => cmd_print(&config, &file, spans, paths, no_marker, add),

        Commands::Check { path } => cmd_check(&config, &path),

        Commands::Edit {
            file,
            path,
            with,
            add,
            dry_run,
            diff,
        } => cmd_edit(&file, &path, &with, add, dry_run, diff),
    }
}

fn parse_line_range(value: &str) -> Result<(usize, usize), String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{value}'"))?;
    let start: usize = start
        .trim()
        .parse()
        .map_err(|e| format!("invalid start line '{start}': {e}"))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid end line '{end}': {e}"))?;
    if end < start {
        return Err(format!("end line {end} is before start line {start}"));
    }
    Ok((start, end))
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Serialize)]
struct OutlineEntry<'a> {
    depth: usize,
    category: Category,
    grammar_kind: &'a str,
    label: Option<&'a str>,
    start_line: usize,
    end_line: usize,
    path: Option<String>,
}

fn outline(tree: &BlockTree) -> Vec<OutlineEntry<'_>> {
    tree.iter_preorder()
        .filter(|(_, block)| block.category != Category::Space)
        .map(|(id, block)| OutlineEntry {
            depth: tree.ancestors(id).len(),
            category: block.category,
            grammar_kind: &block.grammar_kind,
            label: block.label.as_deref(),
            start_line: block.start_line,
            end_line: block.end_line,
            path: block
                .label
                .as_ref()
                .and_then(|_| tree.path_of(id))
                .map(|path| path.join(".")),
        })
        .collect()
}

fn cmd_tree(file: &Path, json: bool) -> Result<()> {
    let context = FileContext::load(file)?;
    let entries = outline(context.tree());

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let category = match entry.category {
            Category::Class | Category::Module => entry.category.to_string().bold(),
            Category::Function => entry.category.to_string().cyan(),
            Category::Error => entry.category.to_string().red(),
            Category::Comment | Category::CommentedOutCode => entry.category.to_string().dimmed(),
            _ => entry.category.to_string().normal(),
        };
        let label = entry
            .label
            .map(|label| format!(" {}", label.green()))
            .unwrap_or_default();
        println!(
            "{}{}{} {} {}",
            "  ".repeat(entry.depth),
            category,
            label,
            format!("L{}-L{}", entry.start_line, entry.end_line).yellow(),
            entry.grammar_kind.dimmed()
        );
    }
    Ok(())
}

fn cmd_print(
    config: &EngineConfig,
    file: &Path,
    spans: Vec<(usize, usize)>,
    paths: Vec<String>,
    no_marker: bool,
    add: bool,
) -> Result<()> {
    let context = FileContext::load(file)?;
    let tree = context.tree();

    let output = if add {
        let [path] = paths.as_slice() else {
            anyhow::bail!("--add needs exactly one --path");
        };
        context.excerpt_for_add(&Span::parse_id(path), &config.excerpt.placeholder)?
    } else if spans.is_empty() && paths.is_empty() {
        print_block(tree)
    } else if spans.is_empty() && paths.len() == 1 {
        print_by_block_path(tree, split_path(&paths[0]).as_slice())?
    } else {
        let marker = if no_marker {
            SpanMarker::None
        } else {
            config.excerpt.marker
        };
        let spans: Vec<Span> = spans
            .into_iter()
            .map(|(start, end)| Span::lines(start, end))
            .chain(paths.iter().map(|path| Span::from_path(split_path(path))))
            .collect();
        print_by_spans(tree, &spans, marker)?
    };

    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Result of checking one file.
enum FileReport {
    Ok {
        blocks: usize,
        errors: usize,
        detail: Option<String>,
    },
    Failed(String),
}

fn check_file(path: &Path, language: Language) -> FileReport {
    let source = match read_source(path) {
        Ok(source) => source,
        Err(e) => return FileReport::Failed(e.to_string()),
    };
    let tree = match parse_blocks(&source, language) {
        Ok(tree) => tree,
        Err(e) => return FileReport::Failed(e.to_string()),
    };
    if let Err(e) = tree.verify(&source) {
        return FileReport::Failed(e.to_string());
    }
    let errors = tree
        .iter_preorder()
        .filter(|(_, block)| block.category == Category::Error)
        .count();
    let detail = match errors {
        0 => None,
        _ => validate_syntax(&source, language).err().map(|e| e.to_string()),
    };
    FileReport::Ok {
        blocks: tree.iter_preorder().count(),
        errors,
        detail,
    }
}

fn discover_files(root: &Path, exclude: &[String]) -> Result<Vec<(PathBuf, Language)>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !exclude
                .iter()
                .any(|name| entry.file_name().to_str() == Some(name.as_str()))
    });
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(language) = Language::from_path(entry.path()) {
            files.push((entry.path().to_path_buf(), language));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn cmd_check(config: &EngineConfig, root: &Path) -> Result<()> {
    let files = discover_files(root, &config.check.exclude)?;
    if files.is_empty() {
        println!("{}", "No supported source files found".yellow());
        return Ok(());
    }

    let threads = config.check.threads.clamp(1, files.len());
    debug!(files = files.len(), threads, "checking files");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to start checker threads")?;
    let reports: Vec<FileReport> = pool.install(|| {
        files
            .par_iter()
            .map(|(path, language)| check_file(path, *language))
            .collect()
    });

    let (mut passed, mut with_errors, mut failed) = (0usize, 0usize, 0usize);
    for ((path, _), report) in files.iter().zip(&reports) {
        match report {
            FileReport::Ok {
                blocks,
                errors: 0,
                ..
            } => {
                passed += 1;
                println!("{} {} ({} blocks)", "✓".green(), path.display(), blocks);
            }
            FileReport::Ok {
                blocks,
                errors,
                detail,
            } => {
                with_errors += 1;
                println!(
                    "{} {} ({} blocks, {} error blocks)",
                    "⚠".yellow(),
                    path.display(),
                    blocks,
                    errors
                );
                if let Some(detail) = detail {
                    println!("    {}", detail.dimmed());
                }
            }
            FileReport::Failed(reason) => {
                failed += 1;
                eprintln!("{} {}: {}", "✗".red(), path.display(), reason);
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} round-tripped", format!("{}", passed).green());
    println!(
        "  {} round-tripped with syntax errors",
        format!("{}", with_errors).yellow()
    );
    println!("  {} failed", format!("{}", failed).red());

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (edited)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn read_snippet(with: &Path) -> Result<String> {
    if with.as_os_str() == "-" {
        let mut snippet = String::new();
        std::io::stdin()
            .read_to_string(&mut snippet)
            .context("failed to read snippet from stdin")?;
        return Ok(snippet);
    }
    fs::read_to_string(with).with_context(|| format!("failed to read {}", with.display()))
}

fn cmd_edit(
    file: &Path,
    path: &str,
    with: &Path,
    add: bool,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let snippet = read_snippet(with)?;
    let mut context = FileContext::load(file)?;
    let original = context.source().to_string();

    let target = Span::parse_id(path);
    let edit = if add {
        BlockEdit::add(target, snippet)
    } else {
        BlockEdit::update(target, snippet)
    };
    let outcome = context
        .apply(&edit)
        .with_context(|| format!("failed to edit {} at '{}'", file.display(), path))?;

    if dry_run {
        println!("{}", "[DRY RUN - showing what would be applied]".cyan());
    }
    if show_diff || dry_run {
        display_diff(file, &original, context.source());
    }
    if !dry_run {
        context.save()?;
    }

    let action = if add { "added to" } else { "updated" };
    println!(
        "{} {} {} ({}, {})",
        "✓".green(),
        action,
        outcome
            .target_path
            .map(|p| if p.is_empty() { "<module>".to_string() } else { p.join(".") })
            .unwrap_or_else(|| path.to_string()),
        format!("+{}", outcome.delta.added).green(),
        format!("-{}", outcome.delta.removed).red()
    );
    Ok(())
}
