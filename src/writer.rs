//! Binary writer with container length planning.
//!
//! The writer encodes values bottom-up. Each open container collects its children in its
//! own buffer; when the container closes, [`Header::for_length`] plans the descriptor and
//! length prefix for the finished body and the result is appended to the parent. Completed
//! top-level values wait in a pending buffer until [`BinaryWriter::flush`], which emits the
//! version marker and any symbol table the values depend on before handing the bytes to the
//! sink.
//!
//! ## Symbols
//!
//! Field names, annotations and symbol values are interned as they are written. On flush the
//! writer declares the symbols added since the last flush: the first table of a stream lists
//! every local symbol, later ones append to it with `imports: $ion_symbol_table`. After a
//! flush the table is frozen so earlier output stays valid; a writer that owns its table
//! keeps growing a fresh copy.
//!
//! ```rust
//! use ion_binary::{BinaryReader, BinaryWriter, Event, IonType};
//!
//! let mut writer = BinaryWriter::new(Vec::new());
//! writer.write_symbol("open").unwrap();
//! writer.flush().unwrap();
//! writer.write_symbol("close").unwrap();
//! let bytes = writer.into_inner().unwrap();
//!
//! let mut reader = BinaryReader::from_slice(&bytes);
//! assert_eq!(reader.next_value().unwrap(), Event::StartScalar);
//! assert_eq!(reader.symbol_value().unwrap().text(), Some("open"));
//! assert_eq!(reader.next_value().unwrap(), Event::StartScalar);
//! assert_eq!(reader.symbol_value().unwrap().text(), Some("close"));
//! ```

use std::io::Write;
use std::sync::Arc;

use num_bigint::{BigInt, Sign};
use tracing::debug;

use crate::codec;
use crate::format::{sid, TypeCode, IVM};
use crate::header::{AnnotationWrapper, Header};
use crate::options::{ContainerHooks, InitialSymbols, WriterOptions};
use crate::symbol_table::{FrozenSymbolTable, Import, LocalSymbolTable, SymbolTable};
use crate::{Decimal, Error, IonType, Result, SymbolTableError, Timestamp};

struct Container {
    ion_type: IonType,
    field_sid: Option<u64>,
    annotations: Vec<u64>,
    body: Vec<u8>,
}

/// Writes Ion binary to any [`Write`] sink.
pub struct BinaryWriter<W: Write> {
    sink: W,
    initial: InitialSymbols,
    version_marker: bool,
    symbols: SymbolTable,
    owns_table: bool,
    // Number of local symbols already declared in this stream.
    declared_locals: usize,
    table_declared: bool,
    ivm_written: bool,
    containers: Vec<Container>,
    pending: Vec<u8>,
    field_name: Option<u64>,
    annotations: Vec<u64>,
    hooks: Box<dyn ContainerHooks>,
    bytes_flushed: u64,
}

impl<W: Write> BinaryWriter<W> {
    /// Creates a writer whose streams start with only the system symbol table.
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, WriterOptions::default())
    }

    pub fn with_options(sink: W, options: WriterOptions) -> Self {
        let (initial, hooks, version_marker) = options.into_parts();
        let (symbols, owns_table) = initial_table(&initial);
        BinaryWriter {
            sink,
            initial,
            version_marker,
            symbols,
            owns_table,
            declared_locals: 0,
            table_declared: false,
            ivm_written: false,
            containers: Vec::new(),
            pending: Vec::new(),
            field_name: None,
            annotations: Vec::new(),
            hooks,
            bytes_flushed: 0,
        }
    }

    /// Number of open containers.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.containers.len()
    }

    /// The type of the innermost open container.
    #[must_use]
    pub fn container_type(&self) -> Option<IonType> {
        self.containers.last().map(|c| c.ion_type)
    }

    /// The symbol table values are currently interned into.
    #[must_use]
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Total bytes handed to the sink so far.
    #[must_use]
    pub fn bytes_flushed(&self) -> u64 {
        self.bytes_flushed
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Sets the field name of the next value. Only legal directly inside a struct.
    pub fn set_field_name(&mut self, name: &str) -> Result<()> {
        self.require_struct()?;
        let sid = self.intern(name)?;
        self.field_name = Some(sid);
        Ok(())
    }

    /// Sets the field name of the next value by symbol ID.
    pub fn set_field_name_id(&mut self, sid: u64) -> Result<()> {
        self.require_struct()?;
        self.check_sid(sid)?;
        self.field_name = Some(sid);
        Ok(())
    }

    /// Adds an annotation to the next value.
    pub fn add_annotation(&mut self, text: &str) -> Result<()> {
        let sid = self.intern(text)?;
        self.annotations.push(sid);
        Ok(())
    }

    pub fn add_annotation_id(&mut self, sid: u64) -> Result<()> {
        self.check_sid(sid)?;
        self.annotations.push(sid);
        Ok(())
    }

    /// Replaces the annotations of the next value.
    pub fn set_annotations<'a, I>(&mut self, annotations: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sids = Vec::new();
        for text in annotations {
            sids.push(self.intern(text)?);
        }
        self.annotations = sids;
        Ok(())
    }

    /// Writes a typed null. `IonType::Null` writes the untyped `null`.
    pub fn write_null(&mut self, ion_type: IonType) -> Result<()> {
        self.write_scalar(ion_type, Header::null(TypeCode::for_type(ion_type)), |_| 0)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_scalar(
            IonType::Bool,
            Header::inline(TypeCode::Bool, u8::from(value)),
            |_| 0,
        )
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        let code = if value < 0 {
            TypeCode::NegativeInt
        } else {
            TypeCode::PositiveInt
        };
        let header = Header::for_length(code, codec::int_value_len(value) as u64);
        self.write_scalar(IonType::Int, header, |out| {
            codec::write_uint(out, value.unsigned_abs())
        })
    }

    pub fn write_big_int(&mut self, value: &BigInt) -> Result<()> {
        let code = if value.sign() == Sign::Minus {
            TypeCode::NegativeInt
        } else {
            TypeCode::PositiveInt
        };
        let header = Header::for_length(code, codec::big_int_value_len(value) as u64);
        let magnitude = value.magnitude();
        self.write_scalar(IonType::Int, header, |out| {
            codec::write_big_uint(out, magnitude)
        })
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        let header = Header::for_length(TypeCode::Float, codec::float_len(value) as u64);
        self.write_scalar(IonType::Float, header, |out| codec::write_float(out, value))
    }

    pub fn write_decimal(&mut self, value: &Decimal) -> Result<()> {
        let header = Header::for_length(TypeCode::Decimal, codec::decimal_len(value) as u64);
        self.write_scalar(IonType::Decimal, header, |out| {
            codec::write_decimal(out, value)
        })
    }

    pub fn write_timestamp(&mut self, value: &Timestamp) -> Result<()> {
        let header = Header::for_length(TypeCode::Timestamp, codec::timestamp_len(value) as u64);
        self.write_scalar(IonType::Timestamp, header, |out| {
            codec::write_timestamp(out, value)
        })
    }

    /// Writes a symbol value, interning its text.
    pub fn write_symbol(&mut self, text: &str) -> Result<()> {
        let sid = self.intern(text)?;
        self.write_symbol_value(sid)
    }

    /// Writes a symbol value by ID. The ID must be defined by the current table.
    pub fn write_symbol_id(&mut self, sid: u64) -> Result<()> {
        self.check_sid(sid)?;
        self.write_symbol_value(sid)
    }

    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let header = Header::for_length(TypeCode::String, codec::string_len(value) as u64);
        self.write_scalar(IonType::String, header, |out| {
            out.extend_from_slice(value.as_bytes());
            value.len()
        })
    }

    pub fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        self.write_lob(IonType::Blob, value)
    }

    pub fn write_clob(&mut self, value: &[u8]) -> Result<()> {
        self.write_lob(IonType::Clob, value)
    }

    /// Opens a list, s-expression or struct. Pending field name and annotations apply to it.
    pub fn step_in(&mut self, ion_type: IonType) -> Result<()> {
        if !ion_type.is_container() {
            return Err(Error::illegal_writer_state(format!(
                "cannot step into a {ion_type}"
            )));
        }
        let field_sid = self.take_field_name()?;
        let annotations = std::mem::take(&mut self.annotations);
        self.hooks.before_value(ion_type, self.containers.len());
        self.containers.push(Container {
            ion_type,
            field_sid,
            annotations,
            body: Vec::new(),
        });
        self.hooks.on_step_in(ion_type, self.containers.len());
        Ok(())
    }

    /// Closes the innermost container and appends it to its parent.
    pub fn step_out(&mut self) -> Result<()> {
        if self.field_name.is_some() || !self.annotations.is_empty() {
            return Err(Error::illegal_writer_state(
                "field name or annotations set without a value",
            ));
        }
        let container = self
            .containers
            .pop()
            .ok_or_else(|| Error::illegal_writer_state("step_out at top level"))?;
        let depth = self.containers.len() + 1;
        let body_len = container.body.len();
        let header = Header::for_length(TypeCode::for_type(container.ion_type), body_len as u64);

        let out = self.current_body();
        emit_prefix(out, container.field_sid, &container.annotations, &header);
        out.extend_from_slice(&container.body);

        self.hooks.on_step_out(container.ion_type, depth, body_len);
        self.hooks.after_value(container.ion_type, depth - 1);
        Ok(())
    }

    /// Hands every completed top-level value to the sink, preceded by the version marker
    /// and a symbol table when the values need one. Values inside open containers stay
    /// buffered.
    pub fn flush(&mut self) -> Result<()> {
        let declare = self.needs_symbol_table();
        if self.pending.is_empty() && !declare {
            self.sink.flush()?;
            return Ok(());
        }

        let mut out = Vec::with_capacity(self.pending.len() + IVM.len());
        if self.version_marker && !self.ivm_written {
            out.extend_from_slice(&IVM);
        }
        if declare {
            let locals = self.symbols.local_symbols();
            if self.table_declared {
                encode_symbol_table(&mut out, &[], &locals[self.declared_locals..], true);
            } else {
                encode_symbol_table(&mut out, self.symbols.imports(), locals, false);
            }
            self.declared_locals = locals.len();
            self.table_declared = true;
            self.freeze_symbol_table();
        }
        out.append(&mut self.pending);

        self.sink.write_all(&out)?;
        self.sink.flush()?;
        self.ivm_written = true;
        self.bytes_flushed += out.len() as u64;
        debug!(
            bytes = out.len(),
            declared_table = declare,
            max_id = self.symbols.max_id(),
            "flushed Ion binary"
        );
        self.hooks.on_flush(out.len());
        Ok(())
    }

    /// Flushes and ends the stream. The next value written starts a new stream with a
    /// version marker and the writer's initial symbol table. Finishing twice in a row writes
    /// nothing the second time.
    pub fn finish(&mut self) -> Result<()> {
        if !self.containers.is_empty() {
            return Err(Error::illegal_writer_state(format!(
                "cannot finish with {} open container(s)",
                self.containers.len()
            )));
        }
        if !self.annotations.is_empty() {
            return Err(Error::illegal_writer_state("annotations set without a value"));
        }
        self.flush()?;
        let (symbols, owns_table) = initial_table(&self.initial);
        self.symbols = symbols;
        self.owns_table = owns_table;
        self.declared_locals = 0;
        self.table_declared = false;
        self.ivm_written = false;
        Ok(())
    }

    /// Freezes the current symbols for sharing with readers or other writers. A writer that
    /// owns its table keeps interning into a copy.
    pub fn freeze_symbol_table(&mut self) -> Arc<FrozenSymbolTable> {
        let frozen = self.symbols.make_read_only();
        if self.owns_table {
            self.symbols = SymbolTable::Growable(frozen.thaw());
        }
        frozen
    }

    /// Finishes the stream and returns the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.sink)
    }

    fn write_symbol_value(&mut self, sid: u64) -> Result<()> {
        let header = Header::for_length(TypeCode::Symbol, codec::symbol_len(sid) as u64);
        self.write_scalar(IonType::Symbol, header, |out| codec::write_uint(out, sid))
    }

    fn write_lob(&mut self, ion_type: IonType, value: &[u8]) -> Result<()> {
        let header = Header::for_length(TypeCode::for_type(ion_type), value.len() as u64);
        self.write_scalar(ion_type, header, |out| {
            out.extend_from_slice(value);
            value.len()
        })
    }

    fn write_scalar<F>(&mut self, ion_type: IonType, header: Header, body: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<u8>) -> usize,
    {
        let field_sid = self.take_field_name()?;
        let annotations = std::mem::take(&mut self.annotations);
        let depth = self.containers.len();
        self.hooks.before_value(ion_type, depth);

        let out = self.current_body();
        emit_prefix(out, field_sid, &annotations, &header);
        let written = body(out);
        debug_assert_eq!(written as u64, header.content_len());

        self.hooks.after_value(ion_type, depth);
        Ok(())
    }

    fn current_body(&mut self) -> &mut Vec<u8> {
        match self.containers.last_mut() {
            Some(container) => &mut container.body,
            None => &mut self.pending,
        }
    }

    fn require_struct(&self) -> Result<()> {
        if self.container_type() == Some(IonType::Struct) {
            Ok(())
        } else {
            Err(Error::illegal_writer_state(
                "field names can only be set inside a struct",
            ))
        }
    }

    fn take_field_name(&mut self) -> Result<Option<u64>> {
        let in_struct = self.container_type() == Some(IonType::Struct);
        match (in_struct, self.field_name.take()) {
            (true, Some(sid)) => Ok(Some(sid)),
            (true, None) => Err(Error::illegal_writer_state(
                "values inside a struct need a field name",
            )),
            (false, None) => Ok(None),
            (false, Some(_)) => Err(Error::illegal_writer_state(
                "field name set outside of a struct",
            )),
        }
    }

    fn intern(&mut self, text: &str) -> Result<u64> {
        match self.symbols.intern(text) {
            Ok(token) => token
                .sid()
                .ok_or_else(|| Error::illegal_writer_state(format!("no symbol ID for '{text}'"))),
            Err(Error::SymbolTable(SymbolTableError::ReadOnly { text })) => {
                Err(Error::illegal_writer_state(format!(
                    "symbol '{text}' is not defined by the read-only symbol table"
                )))
            }
            Err(err) => Err(err),
        }
    }

    fn check_sid(&self, sid: u64) -> Result<()> {
        let max_id = self.symbols.max_id();
        if sid > max_id {
            return Err(SymbolTableError::UnknownSid { sid, max_id }.into());
        }
        Ok(())
    }

    fn needs_symbol_table(&self) -> bool {
        let locals = self.symbols.local_symbols().len();
        if self.table_declared {
            locals > self.declared_locals
        } else {
            locals > 0 || !self.symbols.imports().is_empty()
        }
    }
}

impl<W: Write> std::fmt::Debug for BinaryWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryWriter")
            .field("depth", &self.containers.len())
            .field("pending", &self.pending.len())
            .field("max_id", &self.symbols.max_id())
            .field("bytes_flushed", &self.bytes_flushed)
            .finish_non_exhaustive()
    }
}

fn initial_table(initial: &InitialSymbols) -> (SymbolTable, bool) {
    match initial {
        InitialSymbols::System => (SymbolTable::Growable(LocalSymbolTable::new()), true),
        InitialSymbols::Imports { imports, symbols } => {
            let mut table = LocalSymbolTable::with_imports(imports.clone());
            for text in symbols {
                table.add_symbol(Some(text.clone()));
            }
            (SymbolTable::Growable(table), true)
        }
        InitialSymbols::Frozen(table) => (SymbolTable::Frozen(Arc::clone(table)), false),
    }
}

/// Writes the field name, annotation wrapper and header that precede a body.
fn emit_prefix(out: &mut Vec<u8>, field_sid: Option<u64>, annotations: &[u64], header: &Header) {
    if let Some(sid) = field_sid {
        codec::write_var_uint(out, sid);
    }
    if !annotations.is_empty() {
        AnnotationWrapper::plan(annotations, header.total_len()).write(out);
    }
    header.write(out);
}

fn emit_string(out: &mut Vec<u8>, field_sid: Option<u64>, text: &str) {
    let header = Header::for_length(TypeCode::String, text.len() as u64);
    emit_prefix(out, field_sid, &[], &header);
    out.extend_from_slice(text.as_bytes());
}

fn emit_uint(out: &mut Vec<u8>, code: TypeCode, field_sid: Option<u64>, value: u64) {
    let header = Header::for_length(code, codec::uint_len(value) as u64);
    emit_prefix(out, field_sid, &[], &header);
    codec::write_uint(out, value);
}

fn emit_container(
    out: &mut Vec<u8>,
    code: TypeCode,
    field_sid: Option<u64>,
    annotations: &[u64],
    body: &[u8],
) {
    let header = Header::for_length(code, body.len() as u64);
    emit_prefix(out, field_sid, annotations, &header);
    out.extend_from_slice(body);
}

/// Encodes a local symbol table declaration. An appending table refers to the previous one
/// through `imports: $ion_symbol_table` and lists only the new symbols.
fn encode_symbol_table(
    out: &mut Vec<u8>,
    imports: &[Import],
    symbols: &[Option<String>],
    append: bool,
) {
    let mut fields = Vec::new();
    if append {
        emit_uint(
            &mut fields,
            TypeCode::Symbol,
            Some(sid::IMPORTS),
            sid::ION_SYMBOL_TABLE,
        );
    } else if !imports.is_empty() {
        let mut list = Vec::new();
        for import in imports {
            let mut entry = Vec::new();
            emit_string(&mut entry, Some(sid::NAME), import.name());
            emit_uint(
                &mut entry,
                TypeCode::PositiveInt,
                Some(sid::VERSION),
                u64::from(import.version()),
            );
            emit_uint(
                &mut entry,
                TypeCode::PositiveInt,
                Some(sid::MAX_ID),
                import.max_id(),
            );
            emit_container(&mut list, TypeCode::Struct, None, &[], &entry);
        }
        emit_container(&mut fields, TypeCode::List, Some(sid::IMPORTS), &[], &list);
    }
    if !symbols.is_empty() {
        let mut list = Vec::new();
        for text in symbols {
            match text {
                Some(text) => emit_string(&mut list, None, text),
                None => {
                    Header::null(TypeCode::String).write(&mut list);
                }
            }
        }
        emit_container(&mut fields, TypeCode::List, Some(sid::SYMBOLS), &[], &list);
    }
    emit_container(
        out,
        TypeCode::Struct,
        None,
        &[sid::ION_SYMBOL_TABLE],
        &fields,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::NoHooks;
    use crate::symbol_table::SharedSymbolTable;

    fn written(f: impl FnOnce(&mut BinaryWriter<Vec<u8>>)) -> Vec<u8> {
        let mut writer = BinaryWriter::new(Vec::new());
        f(&mut writer);
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_scalars_without_symbols() {
        let bytes = written(|w| {
            w.write_null(IonType::Null).unwrap();
            w.write_bool(true).unwrap();
            w.write_i64(0).unwrap();
            w.write_i64(-1).unwrap();
            w.write_f64(0.0).unwrap();
            w.write_string("hi").unwrap();
        });
        assert_eq!(
            bytes,
            vec![0xE0, 0x01, 0x00, 0xEA, 0x0F, 0x11, 0x20, 0x31, 0x01, 0x40, 0x82, b'h', b'i']
        );
    }

    #[test]
    fn test_typed_nulls() {
        let bytes = written(|w| {
            w.write_null(IonType::Int).unwrap();
            w.write_null(IonType::Struct).unwrap();
            w.write_null(IonType::Blob).unwrap();
        });
        assert_eq!(&bytes[4..], &[0x2F, 0xDF, 0xAF]);
    }

    #[test]
    fn test_nested_container_lengths() {
        let bytes = written(|w| {
            w.step_in(IonType::List).unwrap();
            w.write_i64(1).unwrap();
            w.step_in(IonType::SExp).unwrap();
            w.write_i64(2).unwrap();
            w.step_out().unwrap();
            w.step_out().unwrap();
        });
        assert_eq!(&bytes[4..], &[0xB5, 0x21, 0x01, 0xC2, 0x21, 0x02]);
    }

    #[test]
    fn test_long_container_uses_length_field() {
        let text = "x".repeat(20);
        let bytes = written(|w| {
            w.step_in(IonType::List).unwrap();
            w.write_string(&text).unwrap();
            w.step_out().unwrap();
        });
        // string: 0x8E 0x94 + 20 bytes = 22 bytes of list body
        assert_eq!(&bytes[4..8], &[0xBE, 0x96, 0x8E, 0x94]);
        assert_eq!(bytes.len(), 4 + 2 + 22);
    }

    #[test]
    fn test_struct_declares_field_symbols() {
        let bytes = written(|w| {
            w.step_in(IonType::Struct).unwrap();
            w.set_field_name("foo").unwrap();
            w.write_i64(1).unwrap();
            w.step_out().unwrap();
        });
        let expected = vec![
            0xE0, 0x01, 0x00, 0xEA, // IVM
            0xE9, 0x81, 0x83, // $ion_symbol_table::
            0xD6, 0x87, 0xB4, 0x83, b'f', b'o', b'o', // {symbols:["foo"]}
            0xD3, 0x8A, 0x21, 0x01, // {foo:1}
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_annotated_value() {
        let bytes = written(|w| {
            w.add_annotation("name").unwrap();
            w.write_i64(7).unwrap();
        });
        // "name" is system SID 4, so no table is needed
        assert_eq!(&bytes[4..], &[0xE4, 0x81, 0x84, 0x21, 0x07]);
    }

    #[test]
    fn test_field_name_outside_struct() {
        let mut writer = BinaryWriter::new(Vec::new());
        let err = writer.set_field_name("a").unwrap_err();
        assert!(matches!(err, Error::IllegalWriterState(_)));
        writer.step_in(IonType::List).unwrap();
        assert!(writer.set_field_name("a").is_err());
    }

    #[test]
    fn test_struct_value_needs_field_name() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.step_in(IonType::Struct).unwrap();
        let err = writer.write_i64(1).unwrap_err();
        assert!(matches!(err, Error::IllegalWriterState(_)));
    }

    #[test]
    fn test_step_out_at_top_level() {
        let mut writer = BinaryWriter::new(Vec::new());
        assert!(matches!(
            writer.step_out().unwrap_err(),
            Error::IllegalWriterState(_)
        ));
        assert!(writer.step_in(IonType::Int).is_err());
    }

    #[test]
    fn test_finish_with_open_container() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.step_in(IonType::List).unwrap();
        assert!(matches!(
            writer.finish().unwrap_err(),
            Error::IllegalWriterState(_)
        ));
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_symbol("abc").unwrap();
        writer.finish().unwrap();
        let first = writer.get_ref().len();
        writer.finish().unwrap();
        assert_eq!(writer.get_ref().len(), first);
    }

    #[test]
    fn test_finish_restarts_stream() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_symbol("abc").unwrap();
        writer.finish().unwrap();
        let first = writer.get_ref().clone();
        writer.write_symbol("abc").unwrap();
        let all = writer.into_inner().unwrap();
        assert_eq!(&all[..first.len()], &first[..]);
        assert_eq!(&all[first.len()..], &first[..]);
    }

    #[test]
    fn test_flush_appends_only_new_symbols() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_symbol("a").unwrap();
        writer.flush().unwrap();
        let first = writer.get_ref().len();
        writer.write_symbol("b").unwrap();
        writer.flush().unwrap();
        let bytes = writer.get_ref().clone();
        let second = &bytes[first..];
        let expected = vec![
            0xEA, 0x81, 0x83, // $ion_symbol_table::
            0xD7, 0x86, 0x71, 0x03, // imports: $ion_symbol_table
            0x87, 0xB2, 0x81, b'b', // symbols: ["b"]
            0x71, 0x0B, // $11
        ];
        assert_eq!(second, &expected[..]);
    }

    #[test]
    fn test_flush_without_new_symbols_skips_table() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_symbol("a").unwrap();
        writer.flush().unwrap();
        let first = writer.get_ref().len();
        writer.write_symbol("a").unwrap();
        writer.flush().unwrap();
        assert_eq!(&writer.get_ref()[first..], &[0x71, 0x0A]);
    }

    #[test]
    fn test_frozen_table_rejects_new_symbols() {
        let mut local = LocalSymbolTable::new();
        local.intern("known").unwrap();
        let frozen = Arc::new(local.freeze());
        let options = WriterOptions::new().with_symbol_table(frozen);
        let mut writer = BinaryWriter::with_options(Vec::new(), options);

        writer.write_symbol("known").unwrap();
        let err = writer.write_symbol("unknown").unwrap_err();
        assert!(matches!(err, Error::IllegalWriterState(_)));
        writer.finish().unwrap();
        assert!(writer.symbol_table().is_read_only());
    }

    #[test]
    fn test_flush_freezes_declared_symbols() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_symbol("a").unwrap();
        writer.flush().unwrap();
        assert!(!writer.symbol_table().is_read_only());
        let shared = writer.freeze_symbol_table();
        assert_eq!(shared.find("a").unwrap().and_then(|t| t.sid()), Some(10));
        writer.write_symbol("b").unwrap();
        assert!(shared.find("b").unwrap().is_none());
    }

    #[test]
    fn test_imports_declared_in_table() {
        let shared = Arc::new(SharedSymbolTable::new("t", 1, ["x", "y"]));
        let options = WriterOptions::new().with_imports(vec![Import::new(shared)]);
        let mut writer = BinaryWriter::with_options(Vec::new(), options);
        writer.write_symbol("y").unwrap();
        let bytes = writer.into_inner().unwrap();
        // y is imported SID 11; no local symbols are declared
        assert_eq!(&bytes[bytes.len() - 2..], &[0x71, 0x0B]);
        assert!(bytes.contains(&b't'));
    }

    #[test]
    fn test_unknown_sid_rejected() {
        let mut writer = BinaryWriter::new(Vec::new());
        let err = writer.write_symbol_id(10).unwrap_err();
        assert!(matches!(
            err,
            Error::SymbolTable(SymbolTableError::UnknownSid { sid: 10, max_id: 9 })
        ));
        writer.write_symbol_id(0).unwrap();
    }

    #[test]
    fn test_hooks_see_structure() {
        use std::sync::Mutex;

        struct Record(Arc<Mutex<Vec<String>>>);
        impl ContainerHooks for Record {
            fn on_step_in(&mut self, ion_type: IonType, depth: usize) {
                self.0.lock().unwrap().push(format!("in {ion_type} {depth}"));
            }
            fn on_step_out(&mut self, ion_type: IonType, depth: usize, body_len: usize) {
                self.0
                    .lock()
                    .unwrap()
                    .push(format!("out {ion_type} {depth} {body_len}"));
            }
            fn before_value(&mut self, ion_type: IonType, depth: usize) {
                self.0.lock().unwrap().push(format!("before {ion_type} {depth}"));
            }
            fn after_value(&mut self, ion_type: IonType, depth: usize) {
                self.0.lock().unwrap().push(format!("after {ion_type} {depth}"));
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let options = WriterOptions::new().with_hooks(Record(Arc::clone(&log)));
        let mut writer = BinaryWriter::with_options(Vec::new(), options);
        writer.step_in(IonType::List).unwrap();
        writer.write_i64(5).unwrap();
        writer.step_out().unwrap();
        writer.finish().unwrap();

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                "before list 0",
                "in list 1",
                "before int 1",
                "after int 1",
                "out list 1 2",
                "after list 0",
            ]
        );
    }

    #[test]
    fn test_without_version_marker() {
        let options = WriterOptions::new().with_version_marker(false);
        let mut writer = BinaryWriter::with_options(Vec::new(), options);
        writer.write_i64(3).unwrap();
        assert_eq!(writer.into_inner().unwrap(), vec![0x21, 0x03]);
    }

    #[test]
    fn test_no_hooks_default() {
        let options = WriterOptions::new().with_hooks(NoHooks);
        let mut writer = BinaryWriter::with_options(Vec::new(), options);
        writer.write_bool(false).unwrap();
        assert_eq!(writer.into_inner().unwrap(), vec![0xE0, 0x01, 0x00, 0xEA, 0x10]);
    }
}
