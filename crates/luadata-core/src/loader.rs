//! File-level drivers: compare two data files, or canonicalize one.
//!
//! Both drivers read whole files, execute them in a fresh
//! [`Environment`] (one Lua state) per file, pick the data entry out of the
//! module table and hand it to the [`decoder`](crate::decoder). The
//! environment is dropped as soon as the entry has been decoded.
//!
//! # Compare mode
//!
//! [`Comparison::load`] takes exactly two files. Before execution every line
//! containing the checksum marker is dropped and the module declaration
//! `module("Data")` is rewritten to `module("Data0")` / `module("Data1")`, so
//! each file's globals land in a table of its own. The entry of each file is
//! the module field whose name does not start with `_`; if there are several,
//! the alphabetically first is used (Lua tables keep no field order) and the
//! rest are reported with a warning. Both files must have one, under the same
//! name.
//!
//! # Prettify mode
//!
//! [`Prettifier::load`] executes one file under its own module name. The
//! entry name comes from the file name (its letters only: `RoomData_01.lua`
//! → `RoomData`) unless set in [`LoadOptions`].

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use mlua::{Table as LuaTable, Value as LuaValue};

use crate::compare::Comparator;
use crate::decoder::Decoder;
use crate::encoder::{Encoder, EOL};
use crate::error::{LuaDataError, Result};
use crate::layout::layout;
use crate::runtime::{type_name, Environment};
use crate::value::Table;
use crate::DEFAULT_MAX_DEPTH;

/// Settings shared by both load modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    module: String,
    marker: String,
    header: String,
    entry: Option<String>,
    max_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            module: "Data".to_string(),
            marker: "md5sum".to_string(),
            header: "-- $Id$".to_string(),
            entry: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the module table the data files declare (`Data`).
    pub fn module(mut self, name: impl Into<String>) -> Self {
        self.module = name.into();
        self
    }

    /// Lines containing this text are skipped before execution (`md5sum`).
    /// An empty marker skips nothing.
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// First line of a rendered document (`-- $Id$`).
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Entry to prettify, instead of the one derived from the file name.
    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Nesting limit for decoding, comparing and encoding.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }

    pub fn marker_text(&self) -> &str {
        &self.marker
    }

    pub fn header_line(&self) -> &str {
        &self.header
    }

    pub fn entry_name(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    pub fn depth_limit(&self) -> usize {
        self.max_depth
    }

    fn declaration(&self, module: &str) -> String {
        format!("module(\"{}\")", module)
    }
}

/// The letters of a file's stem: `RoomData_01.lua` → `RoomData`.
pub fn entry_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| {
            stem.to_string_lossy()
                .chars()
                .filter(char::is_ascii_alphabetic)
                .collect()
        })
        .unwrap_or_default()
}

/// One input of a [`Comparison`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparedFile {
    pub path: PathBuf,
    /// Lower-case hex MD5 of the file's raw bytes.
    pub checksum: String,
}

/// Two decoded entries, ready to compare.
#[derive(Debug)]
pub struct Comparison {
    entry: String,
    files: Vec<ComparedFile>,
    tables: [Table; 2],
    max_depth: usize,
}

impl Comparison {
    /// Load two files with default [`LoadOptions`].
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        Self::load_with_options(paths, &LoadOptions::default())
    }

    pub fn load_with_options<P: AsRef<Path>>(paths: &[P], options: &LoadOptions) -> Result<Self> {
        let inputs = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                read_file(path).map(|bytes| (path.to_path_buf(), bytes))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_inputs(inputs, options)
    }

    /// Compare in-memory sources. Their paths are reported as `<source N>`.
    pub fn from_sources(sources: &[&str], options: &LoadOptions) -> Result<Self> {
        let inputs = sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                let path = PathBuf::from(format!("<source {}>", i));
                (path, source.as_bytes().to_vec())
            })
            .collect();
        Self::from_inputs(inputs, options)
    }

    fn from_inputs(inputs: Vec<(PathBuf, Vec<u8>)>, options: &LoadOptions) -> Result<Self> {
        if inputs.len() != 2 {
            return Err(LuaDataError::Aggregation(format!(
                "expected exactly two files, got {}",
                inputs.len()
            )));
        }

        let mut files = Vec::with_capacity(2);
        let mut entries: Vec<(String, Table)> = Vec::with_capacity(2);
        for (slot, (path, bytes)) in inputs.into_iter().enumerate() {
            let checksum = hex::encode(Md5::digest(&bytes));
            log::debug!("loading {} ({} bytes, md5 {})", path.display(), bytes.len(), checksum);

            let module = format!("{}{}", options.module, slot);
            let text = source_text(&path, &bytes);
            let chunk = preprocess(&text, options, Some(&module));
            let env = Environment::new();
            execute(&env, &path, &chunk)?;
            let root = module_table(&env, &path, &module)?;

            match discover_entry(&root, &path)? {
                Some(entry) => {
                    let value = field(&root, &path, &entry)?;
                    let table = Decoder::new()
                        .with_max_depth(options.max_depth)
                        .decode_named(&entry, &value)?;
                    entries.push((entry, table));
                }
                None => log::warn!("no entry found in {}", path.display()),
            }
            files.push(ComparedFile { path, checksum });
        }

        let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
        if entries.len() < 2 {
            return Err(LuaDataError::Aggregation(format!(
                "fewer than two entries found: {:?}",
                names
            )));
        }
        if names[0] != names[1] {
            return Err(LuaDataError::Aggregation(format!(
                "entry names differ: {} vs {}",
                names[0], names[1]
            )));
        }

        let mut entries = entries.into_iter();
        match (entries.next(), entries.next()) {
            (Some((entry, left)), Some((_, right))) => Ok(Self {
                entry,
                files,
                tables: [left, right],
                max_depth: options.max_depth,
            }),
            _ => Err(LuaDataError::Aggregation("fewer than two entries found".to_string())),
        }
    }

    /// The entry name both files share.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn files(&self) -> &[ComparedFile] {
        &self.files
    }

    /// MD5 checksums in input order.
    pub fn checksums(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.checksum.as_str()).collect()
    }

    pub fn tables(&self) -> (&Table, &Table) {
        (&self.tables[0], &self.tables[1])
    }

    /// Deep-compare the two entries.
    pub fn equal(&self) -> Result<bool> {
        let [left, right] = &self.tables;
        Comparator::new()
            .with_max_depth(self.max_depth)
            .equal_tables(left, right)
    }

    /// Like [`Comparison::equal`], but first checks that `name` is the
    /// loaded entry.
    pub fn equal_entry(&self, name: &str) -> Result<bool> {
        if name != self.entry {
            return Err(LuaDataError::Aggregation(format!(
                "requested entry {} but the files define {}",
                name, self.entry
            )));
        }
        self.equal()
    }
}

/// One decoded entry, ready to render in canonical form.
#[derive(Debug)]
pub struct Prettifier {
    name: String,
    value: Table,
    options: LoadOptions,
}

impl Prettifier {
    /// Load `path` with default [`LoadOptions`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_options(path, LoadOptions::default())
    }

    pub fn load_with_options(path: impl AsRef<Path>, options: LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let bytes = read_file(path)?;
        log::debug!("loading {} ({} bytes)", path.display(), bytes.len());
        let text = source_text(path, &bytes);
        let name = match options.entry_name() {
            Some(name) => Some(name.to_string()),
            None => Some(entry_name_from_path(path)).filter(|name| !name.is_empty()),
        };
        Self::from_text(path, &text, name, options)
    }

    /// Load an in-memory source. Without an entry in `options`, the module's
    /// public field is used (the alphabetically first, if there are several).
    pub fn from_source(source: &str, options: LoadOptions) -> Result<Self> {
        let name = options.entry_name().map(str::to_string);
        Self::from_text(Path::new("<source>"), source, name, options)
    }

    fn from_text(
        path: &Path,
        text: &str,
        name: Option<String>,
        options: LoadOptions,
    ) -> Result<Self> {
        let chunk = preprocess(text, &options, None);
        let env = Environment::new();
        execute(&env, path, &chunk)?;
        let root = module_table(&env, path, &options.module)?;

        let name = match name {
            Some(name) => name,
            None => discover_entry(&root, path)?.ok_or_else(|| LuaDataError::MissingEntry {
                name: format!("{}.<public field>", options.module),
            })?,
        };
        let value = field(&root, path, &name)?;
        if value.is_nil() {
            return Err(LuaDataError::MissingEntry { name });
        }
        let value = Decoder::new()
            .with_max_depth(options.max_depth)
            .decode_named(&name, &value)?;
        Ok(Self {
            name,
            value,
            options,
        })
    }

    /// The entry name, also the assignment target in the rendered document.
    pub fn entry(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Table {
        &self.value
    }

    /// The canonical document.
    pub fn render(&self) -> Result<String> {
        let flat = Encoder::new()
            .with_max_depth(self.options.max_depth)
            .encode_table(&self.value)?;
        Ok(render_document(&self.name, &layout(&flat), &self.options))
    }

    /// Render and write the canonical document to `path`.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let document = self.render()?;
        fs::write(path, document).map_err(|source| LuaDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

/// Wrap a laid-out body in the document frame:
///
/// ```text
/// -- $Id$
///
/// module("Data")
///
/// RoomData=
/// {
/// <body>
/// }
/// ```
pub fn render_document(name: &str, body: &str, options: &LoadOptions) -> String {
    let declaration = options.declaration(&options.module);
    let assignment = format!("{}=", name);
    let mut out = String::with_capacity(body.len() + 64);
    for line in [
        options.header.as_str(),
        "",
        declaration.as_str(),
        "",
        assignment.as_str(),
        "{",
    ] {
        out.push_str(line);
        out.push_str(EOL);
    }
    if !body.is_empty() {
        out.push_str(body);
        out.push_str(EOL);
    }
    out.push('}');
    out.push_str(EOL);
    out
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| LuaDataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn source_text<'a>(path: &Path, bytes: &'a [u8]) -> Cow<'a, str> {
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        log::warn!("{} is not valid UTF-8; invalid bytes replaced", path.display());
    }
    text
}

/// Drop checksum-marker lines and, in compare mode, rename the module.
fn preprocess(text: &str, options: &LoadOptions, rename: Option<&str>) -> String {
    let declaration = options.declaration(&options.module);
    let mut chunk = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if !options.marker.is_empty() && line.contains(&options.marker) {
            continue;
        }
        match rename {
            Some(module) if line.contains(&declaration) => {
                chunk.push_str(&line.replace(&declaration, &options.declaration(module)));
            }
            _ => chunk.push_str(line),
        }
    }
    chunk
}

fn execute(env: &Environment, path: &Path, chunk: &str) -> Result<()> {
    let name = path.display().to_string();
    env.exec(chunk, &name)
        .map_err(|source| LuaDataError::Exec { chunk: name, source })
}

fn lua_error(path: &Path) -> impl FnOnce(mlua::Error) -> LuaDataError + '_ {
    move |source| LuaDataError::Exec {
        chunk: path.display().to_string(),
        source,
    }
}

fn module_table(env: &Environment, path: &Path, module: &str) -> Result<LuaTable> {
    match env.global(module).map_err(lua_error(path))? {
        LuaValue::Table(table) => Ok(table),
        other => Err(LuaDataError::NotATable {
            name: module.to_string(),
            found: type_name(&other),
        }),
    }
}

fn field(root: &LuaTable, path: &Path, name: &str) -> Result<LuaValue> {
    root.get::<LuaValue>(name).map_err(lua_error(path))
}

/// The string-keyed field not starting with `_`; the alphabetically first if
/// there are several.
fn discover_entry(root: &LuaTable, path: &Path) -> Result<Option<String>> {
    let mut candidates = Vec::new();
    for pair in root.pairs::<LuaValue, LuaValue>() {
        let (key, _) = pair.map_err(lua_error(path))?;
        if let LuaValue::String(name) = key {
            let name: String = name.to_string_lossy().into();
            if !name.starts_with('_') {
                candidates.push(name);
            }
        }
    }
    candidates.sort();
    let mut candidates = candidates.into_iter();
    let Some(entry) = candidates.next() else {
        return Ok(None);
    };
    let ignored: Vec<String> = candidates.collect();
    if !ignored.is_empty() {
        log::warn!(
            "{}: using entry {}, ignoring {}",
            path.display(),
            entry,
            ignored.join(", ")
        );
    }
    Ok(Some(entry))
}
