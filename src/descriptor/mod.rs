//! Descriptor loading subsystem.
//!
//! # Data Flow
//! ```text
//! descriptor text (gitlab.rb)
//!     → lexer.rs (tokens with positions)
//!     → parser.rs (statements → SettingsBuilder)
//!     → Settings (immutable, duplicate-free)
//!     → render.rs (canonical text, optional redaction)
//!
//! Watch mode:
//!     watcher.rs detects change
//!     → loader.rs reloads
//!     → validation checks
//!     → accepted snapshot swapped in, rejected ones logged
//! ```
//!
//! # Design Decisions
//! - Load aborts on the first syntax error
//! - Keys are unique; a mapping is assigned whole or member by member, never both
//! - Settings never change after construction

pub mod error;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod render;
pub mod settings;
pub mod value;
pub mod watcher;

pub use error::{LoadError, ParseError, SettingsError};
pub use loader::{load, load_file};
pub use parser::parse;
pub use render::{render, render_with};
pub use settings::{Entry, Settings, SettingsBuilder};
pub use value::{Kind, KeyPath, Value};
