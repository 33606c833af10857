//! # luadata-core
//!
//! Deep comparison and canonical pretty-printing of **Lua table data files**,
//! the `module("Data")` files that carry game and configuration tables:
//!
//! ```lua
//! module("Data")
//! RoomData = {
//!     [1] = { name = "Lobby", seats = { 4, 8 } },
//! }
//! ```
//!
//! A file is executed in an embedded Lua 5.1 state, its entry table is decoded
//! into an immutable [`Value`] tree, and the tree is either compared against
//! another file's tree or written back out in a canonical, sorted and
//! indented form.
//!
//! ## Quick start
//!
//! ```rust
//! use luadata_core::{LoadOptions, Prettifier};
//!
//! let source = r#"
//!     module("Data")
//!     RoomData = { [2] = { size = 1.5 }, [1] = { name = "Lobby" } }
//! "#;
//! let pretty = Prettifier::from_source(source, LoadOptions::default()).unwrap();
//! assert_eq!(pretty.entry(), "RoomData");
//!
//! let document = pretty.render().unwrap();
//! assert!(document.contains("\t[1]={\r\n\t\tname=\"Lobby\",\r\n\t},\r\n"));
//! assert!(document.contains("\t\tsize=1.500000,\r\n"));
//! ```
//!
//! ## Modules
//!
//! - [`runtime`]: one embedded Lua 5.1 state per loaded file
//! - [`decoder`]: Lua table to [`Value`] tree
//! - [`compare`]: deep structural equality with a cycle guard
//! - [`encoder`]: [`Value`] tree to flat canonical text
//! - [`layout`]: brace-depth indentation of the flat text
//! - [`loader`]: compare-mode and prettify-mode file drivers
//! - [`error`]: error types

pub mod compare;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod layout;
pub mod loader;
pub mod runtime;
pub mod value;

pub use compare::{deep_equal, Comparator};
pub use decoder::{decode, Decoder};
pub use encoder::{encode, Encoder};
pub use error::{ErrorKind, LuaDataError, Result};
pub use layout::layout;
pub use loader::{
    entry_name_from_path, render_document, ComparedFile, Comparison, LoadOptions, Prettifier,
};
pub use value::{Entries, Key, Mapping, Table, Value};

/// Default nesting limit for decoding, comparing and encoding.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Encode `root` and lay it out: the body of a canonical document.
pub fn canonicalize(root: &Value) -> Result<String> {
    Ok(layout(&encode(root)?))
}
