//! Timeline text format
//!
//! A line-oriented INI-like format. Comments start with `;` or `#` anywhere on a
//! line; section names and setting keys are case-insensitive.
//!
//! ```text
//! [General]
//! resetOnPairEnd = true
//!
//! [TriggerMap]
//! HugStart = Greet
//!
//! [Group:Greet|Initiator]
//! 0.0 Scale_Head(0.5)
//!
//! [Group:Greet|Partner]
//! 0.0 2_Scale_Head(0.8)
//! 1.0 2_Morph_Belly(40, 2.0)
//! ```
//!
//! Parsing never fails. Malformed lines and sections are skipped and reported
//! as [`ParseWarning`]s when strict mode is on.

mod parser;
mod resolver;
mod sections;
mod text;
pub mod token;

use std::fmt;

use tandem_types::Settings;

use crate::timeline::TimelineBook;

pub use parser::parse;
pub use resolver::{IdentityResolver, KeyResolver, TableResolver};

/// Inputs that do not come from the text itself
pub struct ParseOptions<'a> {
    /// Starting settings; `[General]` / `[Debug]` entries override them
    pub settings: Settings,
    /// Force strict mode on or off regardless of `[Debug] bStrictIni`
    pub strict: Option<bool>,
    pub resolver: &'a dyn KeyResolver,
}

impl Default for ParseOptions<'static> {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            strict: None,
            resolver: &IdentityResolver,
        }
    }
}

impl<'a> ParseOptions<'a> {
    pub fn with_resolver(resolver: &'a dyn KeyResolver) -> Self {
        Self {
            settings: Settings::default(),
            strict: None,
            resolver,
        }
    }
}

/// A skipped line or section
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    /// 1-based line number
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub book: TimelineBook,
    /// Empty unless strict mode was on
    pub warnings: Vec<ParseWarning>,
}
