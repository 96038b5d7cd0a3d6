//! Symbol tables: the mapping between symbol text and symbol IDs (SIDs).
//!
//! A stream's active symbol context is a *local* table layered on top of the system
//! symbols and zero or more imported *shared* tables:
//!
//! ```text
//! SID 1..=9          system symbols ($ion, $ion_1_0, $ion_symbol_table, ...)
//! SID 10..           each import in order, occupying exactly its max_id slots
//! SID imported+1..   local symbols in definition order
//! ```
//!
//! ## Core Types
//!
//! - [`SymbolToken`]: text and/or SID of a symbol
//! - [`SharedSymbolTable`]: an immutable, named and versioned symbol list
//! - [`Catalog`]: shared tables available for import resolution
//! - [`LocalSymbolTable`]: a growable local table; [`LocalSymbolTable::freeze`] turns it into
//!   a [`FrozenSymbolTable`], and [`FrozenSymbolTable::thaw`] derives a new growable table
//!   that starts with every symbol of the frozen one
//! - [`SymbolTable`]: either of the above, with an in-place, idempotent
//!   [`SymbolTable::make_read_only`]
//!
//! ## Examples
//!
//! ```rust
//! use ion_binary::{LocalSymbolTable, SymbolTable};
//!
//! let mut table = SymbolTable::Growable(LocalSymbolTable::new());
//! let a = table.intern("a").unwrap();
//! assert_eq!(a.sid(), Some(10));
//!
//! table.make_read_only();
//! assert_eq!(table.intern("a").unwrap().sid(), Some(10));
//! assert!(table.intern("b").is_err());
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::error::SymbolTableError;
use crate::format::{SYSTEM_MAX_ID, SYSTEM_SYMBOLS};
use crate::Result;

/// A symbol's text and/or SID.
///
/// Either part may be absent: a token built from text has no SID until interned, and a
/// SID read from a stream may have unknown text (`$10` with no definition). Tokens with
/// known text compare by text; tokens without text compare by SID.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymbolToken {
    text: Option<String>,
    sid: Option<u64>,
}

impl SymbolToken {
    #[must_use]
    pub fn new(text: Option<String>, sid: Option<u64>) -> Self {
        SymbolToken { text, sid }
    }

    /// A token with text and no SID.
    #[must_use]
    pub fn text_only(text: impl Into<String>) -> Self {
        SymbolToken {
            text: Some(text.into()),
            sid: None,
        }
    }

    /// A token for a SID whose text is unknown.
    #[must_use]
    pub fn unknown(sid: u64) -> Self {
        SymbolToken {
            text: None,
            sid: Some(sid),
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    #[must_use]
    pub fn sid(&self) -> Option<u64> {
        self.sid
    }
}

impl PartialEq for SymbolToken {
    fn eq(&self, other: &Self) -> bool {
        match (&self.text, &other.text) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.sid == other.sid,
            _ => false,
        }
    }
}

impl Eq for SymbolToken {}

impl Hash for SymbolToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.text {
            Some(text) => text.hash(state),
            None => self.sid.hash(state),
        }
    }
}

/// An immutable symbol list identified by name and version.
///
/// Slots may be empty (`None`), which reserves the SID without giving it text.
///
/// # Examples
///
/// ```rust
/// use ion_binary::SharedSymbolTable;
///
/// let table = SharedSymbolTable::new("com.example.orders", 1, ["id", "total", "id"]);
/// assert_eq!(table.max_id(), 3);
/// assert_eq!(table.sid_for("id"), Some(1));
/// assert_eq!(table.text_for(2), Some("total"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "SharedTableDef", into = "SharedTableDef")]
pub struct SharedSymbolTable {
    name: String,
    version: u32,
    symbols: Vec<Option<String>>,
    index: IndexMap<String, u64>,
}

#[derive(Serialize, Deserialize)]
struct SharedTableDef {
    name: String,
    version: u32,
    symbols: Vec<Option<String>>,
}

impl From<SharedTableDef> for SharedSymbolTable {
    fn from(def: SharedTableDef) -> Self {
        SharedSymbolTable::with_slots(def.name, def.version, def.symbols)
    }
}

impl From<SharedSymbolTable> for SharedTableDef {
    fn from(table: SharedSymbolTable) -> Self {
        SharedTableDef {
            name: table.name,
            version: table.version,
            symbols: table.symbols,
        }
    }
}

impl SharedSymbolTable {
    pub fn new<I, S>(name: impl Into<String>, version: u32, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_slots(
            name,
            version,
            symbols.into_iter().map(|s| Some(s.into())).collect(),
        )
    }

    /// Builds a table whose slots may lack text.
    pub fn with_slots(name: impl Into<String>, version: u32, symbols: Vec<Option<String>>) -> Self {
        let mut index = IndexMap::with_capacity(symbols.len());
        for (i, text) in symbols.iter().enumerate() {
            if let Some(text) = text {
                index.entry(text.clone()).or_insert(i as u64 + 1);
            }
        }
        SharedSymbolTable {
            name: name.into(),
            version: version.max(1),
            symbols,
            index,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn max_id(&self) -> u64 {
        self.symbols.len() as u64
    }

    /// Table-relative SID (starting at 1) of the first slot holding `text`.
    #[must_use]
    pub fn sid_for(&self, text: &str) -> Option<u64> {
        self.index.get(text).copied()
    }

    /// Text of a table-relative SID.
    #[must_use]
    pub fn text_for(&self, sid: u64) -> Option<&str> {
        let idx = usize::try_from(sid.checked_sub(1)?).ok()?;
        self.symbols.get(idx)?.as_deref()
    }
}

/// The `$ion` system table, version 1.
pub fn system_symbol_table() -> &'static Arc<SharedSymbolTable> {
    static SYSTEM: OnceLock<Arc<SharedSymbolTable>> = OnceLock::new();
    SYSTEM.get_or_init(|| Arc::new(SharedSymbolTable::new("$ion", 1, SYSTEM_SYMBOLS)))
}

/// A shared table as it occupies SID space inside a local table.
///
/// `max_id` may differ from the table's own length: a longer declaration pads with
/// unknown-text slots, a shorter one truncates.
#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    table: Arc<SharedSymbolTable>,
    max_id: u64,
}

impl Import {
    #[must_use]
    pub fn new(table: Arc<SharedSymbolTable>) -> Self {
        let max_id = table.max_id();
        Import { table, max_id }
    }

    #[must_use]
    pub fn with_max_id(table: Arc<SharedSymbolTable>, max_id: u64) -> Self {
        Import { table, max_id }
    }

    /// An import that the catalog could not supply: every slot has unknown text.
    #[must_use]
    pub fn unresolved(name: &str, version: u32, max_id: u64) -> Self {
        let table = SharedSymbolTable::with_slots(name, version, Vec::new());
        Import {
            table: Arc::new(table),
            max_id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.table.name()
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.table.version()
    }

    #[must_use]
    pub fn max_id(&self) -> u64 {
        self.max_id
    }

    #[must_use]
    pub fn table(&self) -> &Arc<SharedSymbolTable> {
        &self.table
    }
}

/// An import as declared in a local symbol table definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportDescriptor {
    pub name: String,
    pub version: u32,
    pub max_id: Option<u64>,
}

/// Shared tables available for resolving imports, keyed by name then version.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    tables: IndexMap<String, BTreeMap<u32, Arc<SharedSymbolTable>>>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, replacing any table with the same name and version.
    pub fn register(&mut self, table: impl Into<Arc<SharedSymbolTable>>) -> Arc<SharedSymbolTable> {
        let table = table.into();
        self.tables
            .entry(table.name().to_string())
            .or_default()
            .insert(table.version(), Arc::clone(&table));
        table
    }

    #[must_use]
    pub fn get(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>> {
        self.tables.get(name)?.get(&version).cloned()
    }

    /// The exact version if present, otherwise the highest registered version.
    #[must_use]
    pub fn best_match(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>> {
        let versions = self.tables.get(name)?;
        versions
            .get(&version)
            .or_else(|| versions.values().next_back())
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves a declared import.
    ///
    /// With a declared `max_id` the best registered version is used, cut to that length.
    /// Without one only the exact version is accepted.
    pub fn resolve(&self, descriptor: &ImportDescriptor) -> Result<Import> {
        let version = descriptor.version.max(1);
        match (self.best_match(&descriptor.name, version), descriptor.max_id) {
            (Some(table), Some(max_id)) => Ok(Import::with_max_id(table, max_id)),
            (Some(table), None) if table.version() == version => Ok(Import::new(table)),
            (None, Some(max_id)) => Ok(Import::unresolved(&descriptor.name, version, max_id)),
            (_, None) => Err(SymbolTableError::Malformed(format!(
                "import '{}' version {} is not in the catalog and declares no max_id",
                descriptor.name, version
            ))
            .into()),
        }
    }
}

#[derive(Clone, Debug)]
struct TableData {
    imports: Arc<[Import]>,
    imported_max_id: u64,
    symbols: Vec<Option<String>>,
    index: IndexMap<String, u64>,
}

impl TableData {
    fn new(imports: Vec<Import>) -> Self {
        let imported_max_id = SYSTEM_MAX_ID + imports.iter().map(Import::max_id).sum::<u64>();
        TableData {
            imports: imports.into(),
            imported_max_id,
            symbols: Vec::new(),
            index: IndexMap::new(),
        }
    }

    fn max_id(&self) -> u64 {
        self.imported_max_id + self.symbols.len() as u64
    }

    fn sid_for(&self, text: &str) -> Option<u64> {
        if let Some(sid) = system_symbol_table().sid_for(text) {
            return Some(sid);
        }
        let mut offset = SYSTEM_MAX_ID;
        for import in self.imports.iter() {
            if let Some(sid) = import.table.sid_for(text).filter(|sid| *sid <= import.max_id) {
                return Some(offset + sid);
            }
            offset += import.max_id;
        }
        self.index.get(text).copied()
    }

    fn text_for(&self, sid: u64) -> Result<Option<&str>> {
        if sid == 0 {
            return Ok(None);
        }
        if sid <= SYSTEM_MAX_ID {
            return Ok(system_symbol_table().text_for(sid));
        }
        if sid <= self.imported_max_id {
            let mut offset = SYSTEM_MAX_ID;
            for import in self.imports.iter() {
                if sid <= offset + import.max_id {
                    return Ok(import.table.text_for(sid - offset));
                }
                offset += import.max_id;
            }
        }
        let local = sid - self.imported_max_id - 1;
        match usize::try_from(local).ok().and_then(|i| self.symbols.get(i)) {
            Some(text) => Ok(text.as_deref()),
            None => Err(SymbolTableError::UnknownSid {
                sid,
                max_id: self.max_id(),
            }
            .into()),
        }
    }

    fn push(&mut self, text: Option<String>) -> u64 {
        let sid = self.max_id() + 1;
        if let Some(text) = &text {
            self.index.entry(text.clone()).or_insert(sid);
        }
        self.symbols.push(text);
        sid
    }

    fn find(&self, text: Option<&str>) -> Result<Option<SymbolToken>> {
        let text = text.ok_or(SymbolTableError::MissingText)?;
        Ok(self
            .sid_for(text)
            .map(|sid| SymbolToken::new(Some(text.to_string()), Some(sid))))
    }

    fn token_for(&self, sid: u64) -> Result<SymbolToken> {
        let text = self.text_for(sid)?.map(str::to_string);
        Ok(SymbolToken::new(text, Some(sid)))
    }
}

/// A growable local symbol table.
#[derive(Clone, Debug)]
pub struct LocalSymbolTable {
    data: TableData,
}

impl Default for LocalSymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSymbolTable {
    /// A table holding only the system symbols.
    #[must_use]
    pub fn new() -> Self {
        Self::with_imports(Vec::new())
    }

    #[must_use]
    pub fn with_imports(imports: Vec<Import>) -> Self {
        LocalSymbolTable {
            data: TableData::new(imports),
        }
    }

    /// Returns the token for `text`, adding it as a new local symbol if it is unknown.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ion_binary::LocalSymbolTable;
    ///
    /// let mut table = LocalSymbolTable::new();
    /// assert_eq!(table.intern("name").unwrap().sid(), Some(4));
    /// assert_eq!(table.intern("color").unwrap().sid(), Some(10));
    /// assert_eq!(table.intern("color").unwrap().sid(), Some(10));
    /// assert!(table.intern(None).is_err());
    /// ```
    pub fn intern<'a>(&mut self, text: impl Into<Option<&'a str>>) -> Result<SymbolToken> {
        let text = text.into().ok_or(SymbolTableError::MissingText)?;
        let sid = match self.data.sid_for(text) {
            Some(sid) => sid,
            None => self.data.push(Some(text.to_string())),
        };
        Ok(SymbolToken::new(Some(text.to_string()), Some(sid)))
    }

    /// Looks up `text` without adding it.
    pub fn find<'a>(&self, text: impl Into<Option<&'a str>>) -> Result<Option<SymbolToken>> {
        self.data.find(text.into())
    }

    /// Appends a slot unconditionally, as a symbol table definition does. Returns its SID.
    pub fn add_symbol(&mut self, text: Option<String>) -> u64 {
        self.data.push(text)
    }

    /// Text of `sid`; `Ok(None)` for SID 0 or a slot without text.
    pub fn text_for(&self, sid: u64) -> Result<Option<&str>> {
        self.data.text_for(sid)
    }

    pub fn token_for(&self, sid: u64) -> Result<SymbolToken> {
        self.data.token_for(sid)
    }

    #[must_use]
    pub fn max_id(&self) -> u64 {
        self.data.max_id()
    }

    /// The highest SID supplied by the system table and the imports.
    #[must_use]
    pub fn imported_max_id(&self) -> u64 {
        self.data.imported_max_id
    }

    #[must_use]
    pub fn imports(&self) -> &[Import] {
        &self.data.imports
    }

    #[must_use]
    pub fn local_symbols(&self) -> &[Option<String>] {
        &self.data.symbols
    }

    /// Makes the table immutable.
    #[must_use]
    pub fn freeze(self) -> FrozenSymbolTable {
        FrozenSymbolTable { data: self.data }
    }
}

/// An immutable local symbol table.
#[derive(Clone, Debug)]
pub struct FrozenSymbolTable {
    data: TableData,
}

impl FrozenSymbolTable {
    /// The system-only table.
    #[must_use]
    pub fn system() -> Self {
        LocalSymbolTable::new().freeze()
    }

    /// Returns the token for known `text`; unknown text is a
    /// [`SymbolTableError::ReadOnly`] error.
    pub fn intern<'a>(&self, text: impl Into<Option<&'a str>>) -> Result<SymbolToken> {
        let text = text.into();
        match self.data.find(text)? {
            Some(token) => Ok(token),
            None => Err(SymbolTableError::ReadOnly {
                text: text.unwrap_or_default().to_string(),
            }
            .into()),
        }
    }

    pub fn find<'a>(&self, text: impl Into<Option<&'a str>>) -> Result<Option<SymbolToken>> {
        self.data.find(text.into())
    }

    pub fn text_for(&self, sid: u64) -> Result<Option<&str>> {
        self.data.text_for(sid)
    }

    pub fn token_for(&self, sid: u64) -> Result<SymbolToken> {
        self.data.token_for(sid)
    }

    #[must_use]
    pub fn max_id(&self) -> u64 {
        self.data.max_id()
    }

    #[must_use]
    pub fn imported_max_id(&self) -> u64 {
        self.data.imported_max_id
    }

    #[must_use]
    pub fn imports(&self) -> &[Import] {
        &self.data.imports
    }

    #[must_use]
    pub fn local_symbols(&self) -> &[Option<String>] {
        &self.data.symbols
    }

    /// Derives a growable table that starts with every symbol of this one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ion_binary::LocalSymbolTable;
    ///
    /// let mut table = LocalSymbolTable::new();
    /// table.intern("a").unwrap();
    /// let frozen = table.freeze();
    ///
    /// let mut derived = frozen.thaw();
    /// assert_eq!(derived.intern("b").unwrap().sid(), Some(11));
    /// assert!(frozen.find("b").unwrap().is_none());
    /// ```
    #[must_use]
    pub fn thaw(&self) -> LocalSymbolTable {
        LocalSymbolTable {
            data: self.data.clone(),
        }
    }
}

/// The active symbol table of a reader or writer.
#[derive(Clone, Debug)]
pub enum SymbolTable {
    Growable(LocalSymbolTable),
    Frozen(Arc<FrozenSymbolTable>),
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::Growable(LocalSymbolTable::new())
    }
}

impl SymbolTable {
    /// Interns `text`. A frozen table only accepts text it already holds.
    pub fn intern<'a>(&mut self, text: impl Into<Option<&'a str>>) -> Result<SymbolToken> {
        match self {
            SymbolTable::Growable(table) => table.intern(text),
            SymbolTable::Frozen(table) => table.intern(text),
        }
    }

    pub fn find<'a>(&self, text: impl Into<Option<&'a str>>) -> Result<Option<SymbolToken>> {
        match self {
            SymbolTable::Growable(table) => table.find(text),
            SymbolTable::Frozen(table) => table.find(text),
        }
    }

    pub fn text_for(&self, sid: u64) -> Result<Option<&str>> {
        match self {
            SymbolTable::Growable(table) => table.text_for(sid),
            SymbolTable::Frozen(table) => table.text_for(sid),
        }
    }

    #[must_use]
    pub fn max_id(&self) -> u64 {
        match self {
            SymbolTable::Growable(table) => table.max_id(),
            SymbolTable::Frozen(table) => table.max_id(),
        }
    }

    #[must_use]
    pub fn imports(&self) -> &[Import] {
        match self {
            SymbolTable::Growable(table) => table.imports(),
            SymbolTable::Frozen(table) => table.imports(),
        }
    }

    #[must_use]
    pub fn local_symbols(&self) -> &[Option<String>] {
        match self {
            SymbolTable::Growable(table) => table.local_symbols(),
            SymbolTable::Frozen(table) => table.local_symbols(),
        }
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self, SymbolTable::Frozen(_))
    }

    /// Freezes the table in place and returns the frozen table. Calling it on an already
    /// frozen table returns the same table.
    pub fn make_read_only(&mut self) -> Arc<FrozenSymbolTable> {
        if let SymbolTable::Frozen(table) = self {
            return Arc::clone(table);
        }
        let growable = std::mem::take(self);
        let frozen = match growable {
            SymbolTable::Growable(table) => Arc::new(table.freeze()),
            SymbolTable::Frozen(table) => table,
        };
        *self = SymbolTable::Frozen(Arc::clone(&frozen));
        frozen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn catalog_with(tables: Vec<SharedSymbolTable>) -> Catalog {
        let mut catalog = Catalog::new();
        for table in tables {
            catalog.register(table);
        }
        catalog
    }

    #[test]
    fn test_system_symbols() {
        let table = LocalSymbolTable::new();
        assert_eq!(table.max_id(), 9);
        assert_eq!(table.text_for(3).unwrap(), Some("$ion_symbol_table"));
        assert_eq!(table.find("max_id").unwrap().and_then(|t| t.sid()), Some(8));
        assert_eq!(table.text_for(0).unwrap(), None);
    }

    #[test]
    fn test_sids_follow_imports() {
        let shared = Arc::new(SharedSymbolTable::new("s", 1, ["x", "y"]));
        let mut table = LocalSymbolTable::with_imports(vec![Import::new(shared)]);
        assert_eq!(table.imported_max_id(), 11);
        assert_eq!(table.intern("y").unwrap().sid(), Some(11));
        assert_eq!(table.intern("z").unwrap().sid(), Some(12));
        assert_eq!(table.text_for(10).unwrap(), Some("x"));
    }

    #[test]
    fn test_truncated_import_hides_symbols() {
        let shared = Arc::new(SharedSymbolTable::new("s", 1, ["x", "y", "z"]));
        let table = LocalSymbolTable::with_imports(vec![Import::with_max_id(shared, 1)]);
        assert_eq!(table.find("x").unwrap().and_then(|t| t.sid()), Some(10));
        assert!(table.find("y").unwrap().is_none());
        assert_eq!(table.max_id(), 10);
    }

    #[test]
    fn test_unknown_sid() {
        let table = LocalSymbolTable::new();
        assert!(matches!(
            table.text_for(10),
            Err(Error::SymbolTable(SymbolTableError::UnknownSid { sid: 10, max_id: 9 }))
        ));
    }

    #[test]
    fn test_gaps_have_unknown_text() {
        let mut table = LocalSymbolTable::new();
        table.add_symbol(None);
        table.add_symbol(Some("b".to_string()));
        table.add_symbol(Some("b".to_string()));
        assert_eq!(table.text_for(10).unwrap(), None);
        assert_eq!(table.find("b").unwrap().and_then(|t| t.sid()), Some(11));
        assert_eq!(table.text_for(12).unwrap(), Some("b"));
    }

    #[test]
    fn test_frozen_rejects_new_text() {
        let mut table = LocalSymbolTable::new();
        table.intern("a").unwrap();
        let frozen = table.freeze();
        assert_eq!(frozen.intern("a").unwrap().sid(), Some(10));
        let err = frozen.intern("d").unwrap_err();
        assert!(matches!(
            err,
            Error::SymbolTable(SymbolTableError::ReadOnly { ref text }) if text == "d"
        ));
    }

    #[test]
    fn test_make_read_only_is_idempotent() {
        let mut table = SymbolTable::default();
        table.intern("a").unwrap();
        let first = table.make_read_only();
        let second = table.make_read_only();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(table.is_read_only());
    }

    #[test]
    fn test_missing_text() {
        let mut table = SymbolTable::default();
        assert!(matches!(
            table.intern(None),
            Err(Error::SymbolTable(SymbolTableError::MissingText))
        ));
        assert!(table.find(None).is_err());
    }

    #[test]
    fn test_token_equality() {
        assert_eq!(
            SymbolToken::new(Some("a".into()), Some(10)),
            SymbolToken::new(Some("a".into()), Some(12))
        );
        assert_eq!(SymbolToken::unknown(10), SymbolToken::unknown(10));
        assert_ne!(SymbolToken::unknown(10), SymbolToken::new(Some("a".into()), Some(10)));
    }

    #[test]
    fn test_catalog_resolution() {
        let catalog = catalog_with(vec![
            SharedSymbolTable::new("s", 1, ["a"]),
            SharedSymbolTable::new("s", 2, ["a", "b"]),
        ]);
        let exact = catalog
            .resolve(&ImportDescriptor {
                name: "s".into(),
                version: 1,
                max_id: None,
            })
            .unwrap();
        assert_eq!(exact.max_id(), 1);

        let fallback = catalog
            .resolve(&ImportDescriptor {
                name: "s".into(),
                version: 3,
                max_id: Some(5),
            })
            .unwrap();
        assert_eq!(fallback.version(), 2);
        assert_eq!(fallback.max_id(), 5);

        assert!(catalog
            .resolve(&ImportDescriptor {
                name: "s".into(),
                version: 3,
                max_id: None,
            })
            .is_err());

        let missing = catalog
            .resolve(&ImportDescriptor {
                name: "t".into(),
                version: 1,
                max_id: Some(4),
            })
            .unwrap();
        assert_eq!(missing.max_id(), 4);
        assert_eq!(missing.table().text_for(1), None);

        assert!(catalog
            .resolve(&ImportDescriptor {
                name: "t".into(),
                version: 1,
                max_id: None,
            })
            .is_err());
    }

    #[test]
    fn test_shared_table_serde() {
        let table = SharedSymbolTable::new("s", 2, ["a", "b"]);
        let json = serde_json::to_string(&table).unwrap();
        let back: SharedSymbolTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.sid_for("b"), Some(2));
    }
}
