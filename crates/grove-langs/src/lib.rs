//! `grove-langs` - Grammars bundled with the grove parser.
//!
//! Each language is built from a [`GrammarBuilder`] declaration and a
//! `logos` scanner the first time it is requested, then shared for the rest
//! of the process:
//!
//! - **`sexp`**: parenthesised lists of atoms and strings with `;` comments
//! - **`transparency`**: definitions, statements and expressions of the
//!   Transparency dataflow language
//!
//! # Example
//!
//! ```
//! let tree = grove_syntax::parse(&grove_langs::sexp(), "(a (b c))").unwrap();
//! assert_eq!(tree.root_node().to_sexp(), "(list (atom) (list (atom) (atom)))");
//! ```
//!
//! [`GrammarBuilder`]: grove_syntax::language::GrammarBuilder

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sexp;
pub mod transparency;

use std::sync::Arc;

use grove_syntax::Language;
use once_cell::sync::Lazy;
use tracing::debug;

static SEXP: Lazy<Arc<Language>> =
    Lazy::new(|| built(sexp::grammar().expect("sexp grammar is well formed")));

static TRANSPARENCY: Lazy<Arc<Language>> = Lazy::new(|| {
    built(transparency::grammar().expect("transparency grammar is well formed"))
});

fn built(language: Language) -> Arc<Language> {
    let table = language.table();
    debug!(
        states = table.state_count(),
        lex_modes = table.lex_mode_count(),
        conflicts = table.conflict_count(),
        "built {} grammar",
        language.name()
    );
    Arc::new(language)
}

/// A registered language: its name and the file extensions it claims.
#[derive(Debug, Clone, Copy)]
pub struct LanguageInfo {
    /// Name accepted by [`language`].
    pub name: &'static str,
    /// Extensions without the leading dot.
    pub extensions: &'static [&'static str],
    load: fn() -> Arc<Language>,
}

impl LanguageInfo {
    /// Builds the language, or returns the already built one.
    #[must_use]
    pub fn load(&self) -> Arc<Language> {
        (self.load)()
    }
}

/// Every bundled language.
pub const LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo {
        name: "sexp",
        extensions: &["sexp", "scm"],
        load: sexp,
    },
    LanguageInfo {
        name: "transparency",
        extensions: &["tpy"],
        load: transparency,
    },
];

/// The S-expression language.
#[must_use]
pub fn sexp() -> Arc<Language> {
    Arc::clone(&SEXP)
}

/// The Transparency language.
#[must_use]
pub fn transparency() -> Arc<Language> {
    Arc::clone(&TRANSPARENCY)
}

/// Looks a language up by name.
#[must_use]
pub fn language(name: &str) -> Option<Arc<Language>> {
    LANGUAGES
        .iter()
        .find(|info| info.name.eq_ignore_ascii_case(name))
        .map(LanguageInfo::load)
}

/// Looks a language up by file extension, given without the leading dot.
#[must_use]
pub fn language_for_extension(extension: &str) -> Option<&'static LanguageInfo> {
    LANGUAGES.iter().find(|info| {
        info.extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(extension))
    })
}
