//! The application-level reader.
//!
//! [`BinaryReader`] drives a [`BinaryCursor`] and hides the stream's system values from the
//! application: version markers reset the symbol context, and top-level structs annotated
//! with `$ion_symbol_table` are consumed and installed as the active symbol table instead
//! of being surfaced. Field names, annotations and symbol values are resolved to
//! [`SymbolToken`]s through that table, and typed accessors decode scalar bodies.
//!
//! ## Examples
//!
//! ```rust
//! use ion_binary::{BinaryReader, BinaryWriter, Event, IonType};
//!
//! let mut writer = BinaryWriter::new(Vec::new());
//! writer.step_in(IonType::Struct).unwrap();
//! writer.set_field_name("greeting").unwrap();
//! writer.write_string("hello").unwrap();
//! writer.step_out().unwrap();
//! let bytes = writer.into_inner().unwrap();
//!
//! let mut reader = BinaryReader::from_slice(&bytes);
//! assert_eq!(reader.next_value().unwrap(), Event::StartContainer);
//! reader.step_into_container().unwrap();
//! assert_eq!(reader.next_value().unwrap(), Event::StartScalar);
//! assert_eq!(reader.field_name().unwrap().unwrap().text(), Some("greeting"));
//! assert_eq!(reader.string_value().unwrap(), "hello");
//! ```

use num_bigint::{BigInt, Sign};
use std::sync::Arc;
use tracing::debug;

use crate::codec;
use crate::cursor::{BinaryCursor, CursorStats, Event, ValueHeader};
use crate::error::SymbolTableError;
use crate::format::sid;
use crate::options::ReaderOptions;
use crate::symbol_table::{
    Catalog, FrozenSymbolTable, Import, ImportDescriptor, LocalSymbolTable, SymbolToken,
};
use crate::value::{Decimal, IonType, Timestamp};
use crate::{Error, Result};

/// Reads Ion 1.0 binary data value by value.
#[derive(Debug)]
pub struct BinaryReader {
    cursor: BinaryCursor,
    catalog: Arc<Catalog>,
    initial_imports: Vec<Import>,
    symbols: Arc<FrozenSymbolTable>,
    ivms_seen: u64,
    loading_symbol_table: bool,
}

impl BinaryReader {
    /// A reader over complete input.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::from_slice_with_options(bytes, ReaderOptions::default())
    }

    #[must_use]
    pub fn from_slice_with_options(bytes: &[u8], options: ReaderOptions) -> Self {
        let (buffer, catalog, imports) = options.into_parts();
        Self::build(
            BinaryCursor::from_slice_with_config(bytes, buffer),
            catalog,
            imports,
        )
    }

    /// A reader that receives its input through [`append`](Self::append).
    #[must_use]
    pub fn streaming() -> Self {
        Self::streaming_with_options(ReaderOptions::default())
    }

    #[must_use]
    pub fn streaming_with_options(options: ReaderOptions) -> Self {
        let (buffer, catalog, imports) = options.into_parts();
        Self::build(BinaryCursor::streaming_with_config(buffer), catalog, imports)
    }

    fn build(cursor: BinaryCursor, catalog: Arc<Catalog>, initial_imports: Vec<Import>) -> Self {
        let symbols = Arc::new(LocalSymbolTable::with_imports(initial_imports.clone()).freeze());
        BinaryReader {
            cursor,
            catalog,
            initial_imports,
            symbols,
            ivms_seen: 0,
            loading_symbol_table: false,
        }
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.cursor.append(bytes)
    }

    pub fn end_of_stream(&mut self) {
        self.cursor.end_of_stream();
    }

    /// Advances to the next application value, consuming system values on the way.
    pub fn next_value(&mut self) -> Result<Event> {
        loop {
            if self.loading_symbol_table {
                match self.cursor.fill_value()? {
                    Event::ValueReady => {
                        self.install_symbol_table()?;
                        self.loading_symbol_table = false;
                    }
                    event => return Ok(event),
                }
            }
            let event = self.cursor.next_value()?;
            self.observe_version_markers();
            let is_table = self.cursor.depth() == 0
                && event == Event::StartContainer
                && self
                    .cursor
                    .current()
                    .is_some_and(ValueHeader::is_symbol_table);
            if !is_table {
                return Ok(event);
            }
            self.loading_symbol_table = true;
        }
    }

    pub fn fill_value(&mut self) -> Result<Event> {
        self.cursor.fill_value()
    }

    pub fn step_into_container(&mut self) -> Result<Event> {
        self.cursor.step_into_container()
    }

    pub fn step_out_of_container(&mut self) -> Result<Event> {
        self.cursor.step_out_of_container()
    }

    fn observe_version_markers(&mut self) {
        let seen = self.cursor.stats().ivms_seen;
        if seen != self.ivms_seen {
            self.ivms_seen = seen;
            self.symbols =
                Arc::new(LocalSymbolTable::with_imports(self.initial_imports.clone()).freeze());
        }
    }

    fn install_symbol_table(&mut self) -> Result<()> {
        let table = {
            let span = self.cursor.value_span()?;
            let start = self.cursor.current().map_or(0, ValueHeader::header_start);
            load_symbol_table(span, &self.symbols, &self.catalog).map_err(|e| e.at(start))?
        };
        debug!(
            max_id = table.max_id(),
            imports = table.imports().len(),
            local = table.local_symbols().len(),
            "installed local symbol table"
        );
        self.symbols = Arc::new(table.freeze());
        Ok(())
    }

    #[must_use]
    pub fn event(&self) -> Event {
        self.cursor.event()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.cursor.depth()
    }

    /// The active symbol table.
    #[must_use]
    pub fn symbol_table(&self) -> &Arc<FrozenSymbolTable> {
        &self.symbols
    }

    #[must_use]
    pub fn cursor(&self) -> &BinaryCursor {
        &self.cursor
    }

    #[must_use]
    pub fn stats(&self) -> CursorStats {
        self.cursor.stats()
    }

    #[must_use]
    pub fn ion_type(&self) -> Option<IonType> {
        self.cursor.current().map(ValueHeader::ion_type)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.cursor.current().is_some_and(ValueHeader::is_null)
    }

    fn header(&self) -> Result<&ValueHeader> {
        self.cursor
            .current()
            .ok_or_else(|| Error::illegal_cursor_state("no current value"))
    }

    /// The current value's field name, when it is inside a struct.
    pub fn field_name(&self) -> Result<Option<SymbolToken>> {
        self.header()?
            .field_sid()
            .map(|sid| self.symbols.token_for(sid))
            .transpose()
    }

    pub fn annotations(&self) -> Result<Vec<SymbolToken>> {
        self.header()?
            .annotations()
            .iter()
            .map(|sid| self.symbols.token_for(*sid))
            .collect()
    }

    /// Makes sure the current value is a non-null `expected` with its body buffered.
    fn ready(&mut self, expected: IonType) -> Result<()> {
        let header = self.header()?;
        if header.ion_type() != expected {
            return Err(Error::type_mismatch(expected, header.ion_type()));
        }
        if header.is_null() {
            return Err(Error::type_mismatch(expected, format!("null.{expected}")));
        }
        if self.cursor.event() != Event::ValueReady
            && self.cursor.fill_value()? != Event::ValueReady
        {
            return Err(Error::illegal_cursor_state(
                "value body is not buffered yet; append more data and call fill_value",
            ));
        }
        Ok(())
    }

    fn body(&self) -> Result<(&[u8], u64)> {
        let start = self.header()?.body_start();
        Ok((self.cursor.value_bytes()?, start))
    }

    pub fn bool_value(&mut self) -> Result<bool> {
        self.ready(IonType::Bool)?;
        self.header()?
            .bool_value()
            .ok_or_else(|| Error::type_mismatch(IonType::Bool, "null.bool"))
    }

    /// The current int; an int outside `i64` is an [`Error::Overflow`].
    pub fn i64_value(&mut self) -> Result<i64> {
        self.ready(IonType::Int)?;
        let negative = self.header()?.is_negative_int();
        let (bytes, start) = self.body()?;
        let magnitude = codec::read_uint(bytes).map_err(|e| e.at(start))?;
        if negative {
            if magnitude > 1 << 63 {
                return Err(Error::overflow("int"));
            }
            Ok((magnitude as i64).wrapping_neg())
        } else {
            i64::try_from(magnitude).map_err(|_| Error::overflow("int"))
        }
    }

    pub fn big_int_value(&mut self) -> Result<BigInt> {
        self.ready(IonType::Int)?;
        let sign = if self.header()?.is_negative_int() {
            Sign::Minus
        } else {
            Sign::Plus
        };
        let (bytes, _) = self.body()?;
        Ok(BigInt::from_biguint(sign, codec::read_big_uint(bytes)))
    }

    pub fn f64_value(&mut self) -> Result<f64> {
        self.ready(IonType::Float)?;
        let (bytes, start) = self.body()?;
        codec::read_float(bytes).map_err(|e| e.at(start))
    }

    pub fn decimal_value(&mut self) -> Result<Decimal> {
        self.ready(IonType::Decimal)?;
        let (bytes, start) = self.body()?;
        codec::read_decimal(bytes).map_err(|e| e.at(start))
    }

    pub fn timestamp_value(&mut self) -> Result<Timestamp> {
        self.ready(IonType::Timestamp)?;
        let (bytes, start) = self.body()?;
        codec::read_timestamp(bytes).map_err(|e| e.at(start))
    }

    /// The current symbol, resolved through the active table. `$0` and undefined slots
    /// yield a token without text; a SID beyond the table is an error.
    pub fn symbol_value(&mut self) -> Result<SymbolToken> {
        self.ready(IonType::Symbol)?;
        let (bytes, start) = self.body()?;
        let sid = codec::read_uint(bytes).map_err(|e| e.at(start))?;
        self.symbols.token_for(sid)
    }

    pub fn string_value(&mut self) -> Result<&str> {
        self.ready(IonType::String)?;
        let (bytes, start) = self.body()?;
        codec::read_string(bytes).map_err(|e| e.at(start))
    }

    pub fn blob_value(&mut self) -> Result<&[u8]> {
        self.ready(IonType::Blob)?;
        Ok(self.body()?.0)
    }

    pub fn clob_value(&mut self) -> Result<&[u8]> {
        self.ready(IonType::Clob)?;
        Ok(self.body()?.0)
    }
}

enum ImportsField {
    Append,
    Tables(Vec<ImportDescriptor>),
}

/// Builds the table defined by an `$ion_symbol_table::{...}` value.
fn load_symbol_table(
    span: &[u8],
    current: &FrozenSymbolTable,
    catalog: &Catalog,
) -> Result<LocalSymbolTable> {
    let mut cursor = BinaryCursor::from_slice(span);
    cursor.next_value()?;
    cursor.step_into_container()?;
    let mut imports = None;
    let mut symbols = None;
    loop {
        if cursor.next_value()? == Event::EndContainer {
            break;
        }
        let field = cursor.current().and_then(ValueHeader::field_sid);
        match field {
            Some(sid::IMPORTS) => {
                if imports.is_some() {
                    return Err(malformed("duplicate imports field"));
                }
                imports = Some(read_imports(&mut cursor)?);
            }
            Some(sid::SYMBOLS) => {
                if symbols.is_some() {
                    return Err(malformed("duplicate symbols field"));
                }
                symbols = Some(read_symbols(&mut cursor)?);
            }
            _ => {}
        }
    }
    let mut table = match imports {
        Some(ImportsField::Append) => current.thaw(),
        Some(ImportsField::Tables(descriptors)) => {
            let resolved = descriptors
                .iter()
                .map(|d| catalog.resolve(d))
                .collect::<Result<Vec<_>>>()?;
            LocalSymbolTable::with_imports(resolved)
        }
        None => LocalSymbolTable::new(),
    };
    for text in symbols.unwrap_or_default() {
        table.add_symbol(text);
    }
    Ok(table)
}

fn malformed(msg: &str) -> Error {
    SymbolTableError::Malformed(msg.to_string()).into()
}

fn current_type(cursor: &BinaryCursor) -> Option<IonType> {
    cursor
        .current()
        .filter(|h| !h.is_null())
        .map(ValueHeader::ion_type)
}

fn read_imports(cursor: &mut BinaryCursor) -> Result<ImportsField> {
    match current_type(cursor) {
        Some(IonType::Symbol) => {
            cursor.fill_value()?;
            let sid = codec::read_uint(cursor.value_bytes()?)?;
            if sid == sid::ION_SYMBOL_TABLE {
                Ok(ImportsField::Append)
            } else {
                Ok(ImportsField::Tables(Vec::new()))
            }
        }
        Some(IonType::List) => {
            let mut descriptors = Vec::new();
            cursor.step_into_container()?;
            while cursor.next_value()? != Event::EndContainer {
                if current_type(cursor) == Some(IonType::Struct) {
                    if let Some(descriptor) = read_import(cursor)? {
                        descriptors.push(descriptor);
                    }
                }
            }
            cursor.step_out_of_container()?;
            Ok(ImportsField::Tables(descriptors))
        }
        _ => Ok(ImportsField::Tables(Vec::new())),
    }
}

fn read_import(cursor: &mut BinaryCursor) -> Result<Option<ImportDescriptor>> {
    let mut name = None;
    let mut version = None;
    let mut max_id = None;
    cursor.step_into_container()?;
    while cursor.next_value()? != Event::EndContainer {
        let field = cursor.current().and_then(ValueHeader::field_sid);
        match (field, current_type(cursor)) {
            (Some(sid::NAME), Some(IonType::String)) => {
                cursor.fill_value()?;
                name = Some(codec::read_string(cursor.value_bytes()?)?.to_string());
            }
            (Some(sid::VERSION), Some(IonType::Int)) => version = read_positive_int(cursor)?,
            (Some(sid::MAX_ID), Some(IonType::Int)) => max_id = read_positive_int(cursor)?,
            _ => {}
        }
    }
    cursor.step_out_of_container()?;
    let Some(name) = name.filter(|n| !n.is_empty() && n != "$ion") else {
        return Ok(None);
    };
    let version = version
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v >= 1)
        .unwrap_or(1);
    Ok(Some(ImportDescriptor {
        name,
        version,
        max_id,
    }))
}

/// A non-negative int field; negative values are ignored.
fn read_positive_int(cursor: &mut BinaryCursor) -> Result<Option<u64>> {
    cursor.fill_value()?;
    let negative = cursor.current().is_some_and(ValueHeader::is_negative_int);
    let magnitude = codec::read_uint(cursor.value_bytes()?)?;
    Ok((!negative).then_some(magnitude))
}

fn read_symbols(cursor: &mut BinaryCursor) -> Result<Vec<Option<String>>> {
    let mut symbols = Vec::new();
    if current_type(cursor) != Some(IonType::List) {
        return Ok(symbols);
    }
    cursor.step_into_container()?;
    while cursor.next_value()? != Event::EndContainer {
        if current_type(cursor) == Some(IonType::String) {
            cursor.fill_value()?;
            symbols.push(Some(codec::read_string(cursor.value_bytes()?)?.to_string()));
        } else {
            symbols.push(None);
        }
    }
    cursor.step_out_of_container()?;
    Ok(symbols)
}
