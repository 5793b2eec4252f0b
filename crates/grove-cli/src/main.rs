//! `grove` - parse files with the bundled grammars from the command line.

mod cli;
mod config;
mod render;

use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser as _;
use grove_syntax::{InputEdit, Language, Parser, ParserOptions, Tree};
use text_size::{TextRange, TextSize};
use tracing::{debug, info, warn};

use crate::cli::{Cli, Command, Format};
use crate::config::{GroveConfig, LogSection};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let loaded = GroveConfig::load(cli.config.as_deref());
    init_tracing(cli.verbose, &loaded.config.log);
    if let Some(problem) = &loaded.problem {
        warn!("{problem}; using defaults");
    } else if let Some(source) = &loaded.source {
        debug!("loaded grove config from {}", source.display());
    }
    let options = loaded.config.parser.options();

    match cli.command {
        Command::Parse {
            file,
            language,
            format,
            quiet,
        } => parse_file(&file, language.as_deref(), format, quiet, options),
        Command::Edit {
            file,
            language,
            at,
            delete,
            insert,
            verify,
            format,
        } => {
            let change = EditArgs {
                at,
                delete,
                insert,
                verify,
                format,
            };
            edit_file(&file, language.as_deref(), &change, options)
        }
        Command::Languages => {
            list_languages();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool, log: &LogSection) {
    let (level, problem) = match log.level() {
        Ok(level) => (level.unwrap_or(tracing::Level::INFO), None),
        Err(problem) => (tracing::Level::INFO, Some(problem)),
    };
    let level = if verbose { tracing::Level::DEBUG } else { level };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
    if let Some(problem) = problem {
        warn!("{problem}; logging at info");
    }
}

/// The language named on the command line, or the one claiming the file's
/// extension.
fn resolve_language(name: Option<&str>, file: &Path) -> anyhow::Result<Arc<Language>> {
    if let Some(name) = name {
        return grove_langs::language(name)
            .with_context(|| format!("unknown language `{name}`; see `grove languages`"));
    }
    let info = file
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(grove_langs::language_for_extension)
        .with_context(|| {
            format!(
                "cannot infer a language for {}; pass --language",
                file.display()
            )
        })?;
    debug!("inferred language {} for {}", info.name, file.display());
    Ok(info.load())
}

fn read_source(file: &Path) -> anyhow::Result<String> {
    fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

fn new_parser(language: Arc<Language>, options: ParserOptions) -> Parser {
    let mut parser = Parser::with_language(language);
    parser.set_options(options);
    parser
}

/// Prints the syntax errors of `tree`. Returns whether there were any.
fn report_errors(file: &Path, tree: &Tree) -> bool {
    let errors = tree.errors();
    for error in &errors {
        eprintln!("{}:{error}", file.display());
    }
    !errors.is_empty()
}

fn parse_file(
    file: &Path,
    language: Option<&str>,
    format: Format,
    quiet: bool,
    options: ParserOptions,
) -> anyhow::Result<ExitCode> {
    let source = read_source(file)?;
    let language = resolve_language(language, file)?;
    let mut parser = new_parser(language, options);

    let started = Instant::now();
    let tree = parser
        .parse(&source, None)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    let stats = parser.stats();
    info!(
        elapsed_ms = started.elapsed().as_millis(),
        tokens = stats.tokens_lexed,
        recoveries = stats.recoveries,
        "parsed {}",
        file.display()
    );

    if !quiet {
        let rendered = render::render(&tree, &source, format);
        println!("{}", rendered.trim_end());
    }
    Ok(if report_errors(file, &tree) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[derive(Debug)]
struct EditArgs {
    at: u32,
    delete: u32,
    insert: String,
    verify: bool,
    format: Option<Format>,
}

impl EditArgs {
    /// The replaced range, checked against `source`.
    fn range(&self, source: &str) -> anyhow::Result<TextRange> {
        let end = self
            .at
            .checked_add(self.delete)
            .context("edit range overflows")?;
        let len = TextSize::of(source);
        if TextSize::new(end) > len {
            bail!("edit {}..{end} runs past the end of the file ({} bytes)", self.at, u32::from(len));
        }
        for offset in [self.at, end] {
            if !source.is_char_boundary(offset as usize) {
                bail!("byte {offset} is not on a character boundary");
            }
        }
        Ok(TextRange::new(TextSize::new(self.at), TextSize::new(end)))
    }
}

fn edit_file(
    file: &Path,
    language: Option<&str>,
    args: &EditArgs,
    options: ParserOptions,
) -> anyhow::Result<ExitCode> {
    let source = read_source(file)?;
    let language = resolve_language(language, file)?;
    let range = args.range(&source)?;
    let mut parser = new_parser(Arc::clone(&language), options.clone());

    let old_tree = parser
        .parse(&source, None)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    let change = InputEdit::replace(&source, range, &args.insert);
    let mut text = source.clone();
    text.replace_range(std::ops::Range::<usize>::from(range), &args.insert);

    let started = Instant::now();
    let edited = old_tree.edit(&change);
    let tree = parser
        .parse(&text, Some(&edited))
        .context("incremental reparse failed")?;
    let stats = parser.stats();
    info!(
        elapsed_ms = started.elapsed().as_millis(),
        "reparsed {} after edit",
        file.display()
    );

    println!(
        "reused {} subtrees and {} leaves ({} bytes), lexed {} tokens",
        stats.reused_subtrees, stats.reused_leaves, stats.reused_bytes, stats.tokens_lexed
    );
    for changed in tree.changed_ranges(&old_tree) {
        println!(
            "changed {}..{}",
            u32::from(changed.start()),
            u32::from(changed.end())
        );
    }
    if let Some(format) = args.format {
        println!("{}", render::render(&tree, &text, format).trim_end());
    }

    if args.verify {
        let fresh = new_parser(language, options)
            .parse(&text, None)
            .context("full parse of the edited text failed")?;
        let expected = render::outline(&fresh, &text);
        let actual = render::outline(&tree, &text);
        if expected != actual {
            debug!("full parse:\n{expected}\nincremental parse:\n{actual}");
            bail!("incremental reparse differs from a full parse of the edited text");
        }
        println!("verified against a full parse");
    }
    report_errors(file, &tree);
    Ok(ExitCode::SUCCESS)
}

fn list_languages() {
    for info in grove_langs::LANGUAGES {
        let extensions: Vec<String> = info
            .extensions
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect();
        println!("{:<14} {}", info.name, extensions.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(at: u32, delete: u32) -> EditArgs {
        EditArgs {
            at,
            delete,
            insert: String::new(),
            verify: false,
            format: None,
        }
    }

    #[test]
    fn test_language_from_extension() {
        let language = resolve_language(None, Path::new("demo/main.tpy")).unwrap();
        assert_eq!(language.name(), "transparency");
        let language = resolve_language(None, Path::new("lib.SCM")).unwrap();
        assert_eq!(language.name(), "sexp");
    }

    #[test]
    fn test_explicit_language_wins() {
        let language = resolve_language(Some("sexp"), Path::new("main.tpy")).unwrap();
        assert_eq!(language.name(), "sexp");
    }

    #[test]
    fn test_unknown_language_is_an_error() {
        let err = resolve_language(None, Path::new("notes.txt")).unwrap_err();
        assert!(err.to_string().starts_with("cannot infer a language for notes.txt"));
        let err = resolve_language(Some("cobol"), Path::new("a.sexp")).unwrap_err();
        assert!(err.to_string().contains("unknown language `cobol`"));
    }

    #[test]
    fn test_edit_range_is_checked() {
        let source = "(é)";
        assert_eq!(
            args(1, 2).range(source).unwrap(),
            TextRange::new(TextSize::new(1), TextSize::new(3))
        );
        assert!(args(2, 0).range(source).is_err());
        assert!(args(3, 5).range(source).is_err());
        assert!(args(u32::MAX, 1).range(source).is_err());
    }
}
