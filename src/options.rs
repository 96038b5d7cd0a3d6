//! Configuration for cursors, readers and writers.
//!
//! This module provides builder-style option types:
//!
//! - [`BufferConfiguration`]: Buffer sizing, the oversized-value policy and the version marker callback
//! - [`ReaderOptions`]: Buffer configuration plus the catalog and initial imports of a reader
//! - [`WriterOptions`]: Initial symbol context and container hooks of a writer
//!
//! ## Examples
//!
//! ```rust
//! use ion_binary::{BufferConfiguration, OversizedAction, ReaderOptions};
//!
//! // Skip anything larger than 1 KiB instead of failing.
//! let buffer = BufferConfiguration::new()
//!     .with_max_value_size(1024)
//!     .with_oversized_handler(|_: &ion_binary::OversizedValue| OversizedAction::Skip);
//! let options = ReaderOptions::new().with_buffer_configuration(buffer);
//! assert_eq!(options.buffer().max_value_size(), 1024);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::symbol_table::{Catalog, FrozenSymbolTable, Import};
use crate::value::IonType;

/// Largest value the cursor buffers by default.
pub const DEFAULT_MAX_VALUE_SIZE: u64 = i32::MAX as u64;

/// Initial capacity of a streaming cursor's buffer.
pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 32 * 1024;

/// Describes a value whose declared size exceeds the configured maximum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OversizedValue {
    /// Absolute stream position of the value's first header byte
    pub position: u64,
    /// Header plus body length
    pub length: u64,
    pub limit: u64,
    pub ion_type: Option<IonType>,
}

/// What the cursor does with an oversized value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum OversizedAction {
    /// Discard the value's bytes without buffering them and continue
    Skip,
    /// Fail with [`Error::OversizedValue`](crate::Error::OversizedValue)
    #[default]
    Abort,
}

/// Decides the fate of values larger than [`BufferConfiguration::max_value_size`].
pub trait OversizedValueHandler: Send {
    fn on_oversized_value(&mut self, value: &OversizedValue) -> OversizedAction;
}

impl<F> OversizedValueHandler for F
where
    F: FnMut(&OversizedValue) -> OversizedAction + Send,
{
    fn on_oversized_value(&mut self, value: &OversizedValue) -> OversizedAction {
        self(value)
    }
}

/// Fails on every oversized value.
#[derive(Copy, Clone, Debug, Default)]
pub struct AbortOnOversized;

impl OversizedValueHandler for AbortOnOversized {
    fn on_oversized_value(&mut self, _value: &OversizedValue) -> OversizedAction {
        OversizedAction::Abort
    }
}

/// Skips every oversized value, logging a warning.
#[derive(Copy, Clone, Debug, Default)]
pub struct SkipOversized;

impl OversizedValueHandler for SkipOversized {
    fn on_oversized_value(&mut self, value: &OversizedValue) -> OversizedAction {
        tracing::warn!(
            position = value.position,
            length = value.length,
            limit = value.limit,
            "skipping oversized value"
        );
        OversizedAction::Skip
    }
}

/// Receives the version of every Ion version marker the cursor consumes.
pub trait IvmConsumer: Send {
    fn on_ivm(&mut self, major: u8, minor: u8);
}

impl<F> IvmConsumer for F
where
    F: FnMut(u8, u8) + Send,
{
    fn on_ivm(&mut self, major: u8, minor: u8) {
        self(major, minor)
    }
}

/// Buffering policy of a cursor.
pub struct BufferConfiguration {
    initial_buffer_size: usize,
    max_value_size: u64,
    oversized_handler: Box<dyn OversizedValueHandler>,
    ivm_consumer: Option<Box<dyn IvmConsumer>>,
}

impl Default for BufferConfiguration {
    fn default() -> Self {
        BufferConfiguration {
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
            oversized_handler: Box::new(AbortOnOversized),
            ivm_consumer: None,
        }
    }
}

impl fmt::Debug for BufferConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferConfiguration")
            .field("initial_buffer_size", &self.initial_buffer_size)
            .field("max_value_size", &self.max_value_size)
            .field("ivm_consumer", &self.ivm_consumer.is_some())
            .finish_non_exhaustive()
    }
}

impl BufferConfiguration {
    /// Creates the default configuration: 32 KiB initial buffer, values up to `i32::MAX`
    /// bytes, oversized values abort.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_initial_buffer_size(mut self, size: usize) -> Self {
        self.initial_buffer_size = size;
        self
    }

    /// Sets the largest value (header plus body) a streaming cursor will buffer.
    ///
    /// Fixed input is already fully in memory and ignores this limit.
    #[must_use]
    pub fn with_max_value_size(mut self, size: u64) -> Self {
        self.max_value_size = size;
        self
    }

    #[must_use]
    pub fn with_oversized_handler(mut self, handler: impl OversizedValueHandler + 'static) -> Self {
        self.oversized_handler = Box::new(handler);
        self
    }

    /// Registers a callback invoked with `(major, minor)` for every version marker.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ion_binary::{BinaryCursor, BufferConfiguration};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let seen = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&seen);
    /// let config = BufferConfiguration::new().with_ivm_consumer(move |major: u8, minor: u8| {
    ///     assert_eq!((major, minor), (1, 0));
    ///     counter.fetch_add(1, Ordering::SeqCst);
    /// });
    ///
    /// let mut cursor = BinaryCursor::from_slice_with_config(&[0xE0, 0x01, 0x00, 0xEA, 0x20], config);
    /// cursor.next_value().unwrap();
    /// assert_eq!(seen.load(Ordering::SeqCst), 1);
    /// ```
    #[must_use]
    pub fn with_ivm_consumer(mut self, consumer: impl IvmConsumer + 'static) -> Self {
        self.ivm_consumer = Some(Box::new(consumer));
        self
    }

    #[must_use]
    pub fn initial_buffer_size(&self) -> usize {
        self.initial_buffer_size
    }

    #[must_use]
    pub fn max_value_size(&self) -> u64 {
        self.max_value_size
    }

    pub(crate) fn handle_oversized(&mut self, value: &OversizedValue) -> OversizedAction {
        self.oversized_handler.on_oversized_value(value)
    }

    pub(crate) fn notify_ivm(&mut self, major: u8, minor: u8) {
        if let Some(consumer) = self.ivm_consumer.as_mut() {
            consumer.on_ivm(major, minor);
        }
    }
}

/// Options for a [`BinaryReader`](crate::BinaryReader).
#[derive(Debug, Default)]
pub struct ReaderOptions {
    buffer: BufferConfiguration,
    catalog: Arc<Catalog>,
    imports: Vec<Import>,
}

impl ReaderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_buffer_configuration(mut self, buffer: BufferConfiguration) -> Self {
        self.buffer = buffer;
        self
    }

    /// Sets the catalog used to resolve the imports of symbol tables found in the stream.
    #[must_use]
    pub fn with_catalog(mut self, catalog: impl Into<Arc<Catalog>>) -> Self {
        self.catalog = catalog.into();
        self
    }

    /// Sets imports that are in effect before the stream declares any symbol table and
    /// after every version marker.
    #[must_use]
    pub fn with_imports(mut self, imports: Vec<Import>) -> Self {
        self.imports = imports;
        self
    }

    #[must_use]
    pub fn buffer(&self) -> &BufferConfiguration {
        &self.buffer
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    #[must_use]
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub(crate) fn into_parts(self) -> (BufferConfiguration, Arc<Catalog>, Vec<Import>) {
        (self.buffer, self.catalog, self.imports)
    }
}

/// Observes a writer's container structure. Every method defaults to a no-op.
///
/// # Examples
///
/// ```rust
/// use ion_binary::{BinaryWriter, ContainerHooks, IonType, WriterOptions};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct CountStructs(Arc<AtomicUsize>);
///
/// impl ContainerHooks for CountStructs {
///     fn on_step_out(&mut self, ion_type: IonType, _depth: usize, _body_len: usize) {
///         if ion_type == IonType::Struct {
///             self.0.fetch_add(1, Ordering::SeqCst);
///         }
///     }
/// }
///
/// let count = Arc::new(AtomicUsize::new(0));
/// let options = WriterOptions::new().with_hooks(CountStructs(Arc::clone(&count)));
/// let mut writer = BinaryWriter::with_options(Vec::new(), options);
/// writer.step_in(IonType::Struct).unwrap();
/// writer.step_out().unwrap();
/// assert_eq!(count.load(Ordering::SeqCst), 1);
/// ```
pub trait ContainerHooks: Send {
    /// Called before a scalar is written or a container is opened, at the depth the value
    /// is written to.
    fn before_value(&mut self, _ion_type: IonType, _depth: usize) {}

    /// Called after a scalar is written or a container is closed.
    fn after_value(&mut self, _ion_type: IonType, _depth: usize) {}

    /// Called after a container is opened; `depth` is the new depth.
    fn on_step_in(&mut self, _ion_type: IonType, _depth: usize) {}

    /// Called after a container is closed; `depth` is the depth it was closed from.
    fn on_step_out(&mut self, _ion_type: IonType, _depth: usize, _body_len: usize) {}

    /// Called after bytes are handed to the sink.
    fn on_flush(&mut self, _bytes: usize) {}
}

/// Hooks that do nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHooks;

impl ContainerHooks for NoHooks {}

/// The symbol context a writer starts each stream with.
#[derive(Clone, Debug, Default)]
pub(crate) enum InitialSymbols {
    #[default]
    System,
    Imports {
        imports: Vec<Import>,
        symbols: Vec<String>,
    },
    Frozen(Arc<FrozenSymbolTable>),
}

/// Options for a [`BinaryWriter`](crate::BinaryWriter).
pub struct WriterOptions {
    symbols: InitialSymbols,
    hooks: Box<dyn ContainerHooks>,
    version_marker: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            symbols: InitialSymbols::System,
            hooks: Box::new(NoHooks),
            version_marker: true,
        }
    }
}

impl fmt::Debug for WriterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterOptions")
            .field("symbols", &self.symbols)
            .field("version_marker", &self.version_marker)
            .finish_non_exhaustive()
    }
}

impl WriterOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts every stream with these imports and, optionally, pre-defined local symbols.
    #[must_use]
    pub fn with_imports(mut self, imports: Vec<Import>) -> Self {
        self.symbols = match self.symbols {
            InitialSymbols::Imports { symbols, .. } => InitialSymbols::Imports { imports, symbols },
            _ => InitialSymbols::Imports {
                imports,
                symbols: Vec::new(),
            },
        };
        self
    }

    #[must_use]
    pub fn with_local_symbols<I, S>(mut self, local: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let symbols = local.into_iter().map(Into::into).collect();
        self.symbols = match self.symbols {
            InitialSymbols::Imports { imports, .. } => InitialSymbols::Imports { imports, symbols },
            _ => InitialSymbols::Imports {
                imports: Vec::new(),
                symbols,
            },
        };
        self
    }

    /// Writes with a caller-supplied read-only table. Symbols it lacks cannot be written.
    #[must_use]
    pub fn with_symbol_table(mut self, table: Arc<FrozenSymbolTable>) -> Self {
        self.symbols = InitialSymbols::Frozen(table);
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: impl ContainerHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Whether each stream starts with a version marker. Disable it when appending to
    /// output that already has one.
    #[must_use]
    pub fn with_version_marker(mut self, enabled: bool) -> Self {
        self.version_marker = enabled;
        self
    }

    pub(crate) fn into_parts(self) -> (InitialSymbols, Box<dyn ContainerHooks>, bool) {
        (self.symbols, self.hooks, self.version_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol_table::SharedSymbolTable;

    #[test]
    fn test_buffer_defaults() {
        let config = BufferConfiguration::new();
        assert_eq!(config.max_value_size(), DEFAULT_MAX_VALUE_SIZE);
        assert_eq!(config.initial_buffer_size(), DEFAULT_INITIAL_BUFFER_SIZE);
    }

    #[test]
    fn test_default_handler_aborts() {
        let mut config = BufferConfiguration::new();
        let value = OversizedValue {
            position: 0,
            length: 10,
            limit: 5,
            ion_type: Some(IonType::String),
        };
        assert_eq!(config.handle_oversized(&value), OversizedAction::Abort);
        let mut config = config.with_oversized_handler(SkipOversized);
        assert_eq!(config.handle_oversized(&value), OversizedAction::Skip);
    }

    #[test]
    fn test_writer_symbol_options_compose() {
        let shared = Arc::new(SharedSymbolTable::new("s", 1, ["a"]));
        let options = WriterOptions::new()
            .with_local_symbols(["x"])
            .with_imports(vec![Import::new(shared)]);
        match options.into_parts().0 {
            InitialSymbols::Imports { imports, symbols } => {
                assert_eq!(imports.len(), 1);
                assert_eq!(symbols, vec!["x".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
