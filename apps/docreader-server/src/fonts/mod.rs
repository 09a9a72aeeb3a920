//! Font resolution for PDF output
//!
//! The chain is a Unicode TrueType family when one is installed, then the
//! built-in base-14 fonts.

pub mod builtin;
pub mod chain;
pub mod resolver;

pub use builtin::BuiltinFont;
pub use chain::{FontChain, FontDescriptor, FontWeight, LoadedFont, UnicodeFamily};
pub use resolver::{default_candidates, system_font_dirs, FontCandidate, FontResolver};
