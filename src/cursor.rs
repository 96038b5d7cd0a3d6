//! The incremental binary cursor.
//!
//! [`BinaryCursor`] walks the structure of an Ion 1.0 binary stream without interpreting
//! scalar bodies. Every operation returns an [`Event`] describing where the cursor now
//! stands. When the bytes needed to make progress have not arrived yet, the operation
//! returns [`Event::NeedsData`] and may simply be retried once more bytes have been
//! supplied with [`BinaryCursor::append`]. The cursor never blocks and never pulls input.
//!
//! ## Input Modes
//!
//! - **Fixed**: [`BinaryCursor::from_slice`] holds the complete input. Running out of bytes
//!   inside a value is [`Error::UnexpectedEof`]; running out between top-level values is
//!   `NeedsData`, meaning the stream is exhausted.
//! - **Streaming**: [`BinaryCursor::streaming`] receives bytes through `append`. Consumed
//!   bytes are discarded as the cursor advances, and values that are skipped without being
//!   filled are never buffered.
//!
//! ## Examples
//!
//! ```rust
//! use ion_binary::{BinaryCursor, Event};
//!
//! // IVM, then a struct {$4: 1}
//! let bytes = [0xE0, 0x01, 0x00, 0xEA, 0xD3, 0x84, 0x21, 0x01];
//!
//! let mut cursor = BinaryCursor::streaming();
//! assert_eq!(cursor.next_value().unwrap(), Event::NeedsData);
//!
//! cursor.append(&bytes).unwrap();
//! assert_eq!(cursor.next_value().unwrap(), Event::StartContainer);
//! assert_eq!(cursor.step_into_container().unwrap(), Event::NeedsInstruction);
//! assert_eq!(cursor.next_value().unwrap(), Event::StartScalar);
//! assert_eq!(cursor.current().unwrap().field_sid(), Some(4));
//! assert_eq!(cursor.fill_value().unwrap(), Event::ValueReady);
//! assert_eq!(cursor.value_bytes().unwrap(), &[0x01]);
//! assert_eq!(cursor.next_value().unwrap(), Event::EndContainer);
//! assert_eq!(cursor.step_out_of_container().unwrap(), Event::NeedsInstruction);
//! assert_eq!(cursor.next_value().unwrap(), Event::NeedsData);
//! ```

use tracing::{debug, trace};

use crate::codec::peek_var_uint;
use crate::format::{sid, LengthSource, TypeCode, TypeDescriptor, IVM};
use crate::options::{BufferConfiguration, OversizedAction, OversizedValue};
use crate::value::IonType;
use crate::{Error, Result};

/// Largest length or SID the cursor accepts in a value header.
const MAX_HEADER_VAR_UINT: u64 = i32::MAX as u64;

/// The cursor's position after its most recent operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// More bytes are required; retry the same operation after supplying them
    NeedsData,
    /// Positioned between values; call `next_value`
    NeedsInstruction,
    /// Positioned on a scalar (or a typed null) whose body may not be buffered yet
    StartScalar,
    /// Positioned on a non-null container
    StartContainer,
    /// The current container has no more children
    EndContainer,
    /// The current value's body is fully buffered
    ValueReady,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Budget {
    Unbounded,
    Bounded(u64),
}

impl Budget {
    fn consume(&mut self, n: u64) -> bool {
        match self {
            Budget::Unbounded => true,
            Budget::Bounded(remaining) => match remaining.checked_sub(n) {
                Some(left) => {
                    *remaining = left;
                    true
                }
                None => false,
            },
        }
    }
}

#[derive(Clone, Debug)]
struct Frame {
    ion_type: IonType,
    budget: Budget,
}

/// Header information of the value a cursor is positioned on.
///
/// All positions are absolute offsets from the start of the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueHeader {
    ion_type: IonType,
    descriptor: TypeDescriptor,
    field_sid: Option<u64>,
    annotations: Vec<u64>,
    header_start: u64,
    body_start: u64,
    body_end: u64,
}

impl ValueHeader {
    #[must_use]
    pub fn ion_type(&self) -> IonType {
        self.ion_type
    }

    #[must_use]
    pub fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.descriptor.is_null()
    }

    /// `true` for a non-null list, s-expression or struct.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.ion_type.is_container() && !self.is_null()
    }

    /// The value of a non-null boolean, which lives in the descriptor.
    #[must_use]
    pub fn bool_value(&self) -> Option<bool> {
        (self.ion_type == IonType::Bool && !self.is_null())
            .then_some(self.descriptor.length_nibble == 1)
    }

    /// `true` when the descriptor's type code is negative int.
    #[must_use]
    pub fn is_negative_int(&self) -> bool {
        self.descriptor.code == TypeCode::NegativeInt
    }

    #[must_use]
    pub fn field_sid(&self) -> Option<u64> {
        self.field_sid
    }

    #[must_use]
    pub fn annotations(&self) -> &[u64] {
        &self.annotations
    }

    /// First byte of the annotation wrapper or type descriptor.
    #[must_use]
    pub fn header_start(&self) -> u64 {
        self.header_start
    }

    #[must_use]
    pub fn body_start(&self) -> u64 {
        self.body_start
    }

    #[must_use]
    pub fn body_end(&self) -> u64 {
        self.body_end
    }

    #[must_use]
    pub fn body_len(&self) -> u64 {
        self.body_end - self.body_start
    }

    /// Header (including any annotation wrapper) plus body.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.body_end - self.header_start
    }

    /// A struct annotated first with `$ion_symbol_table`.
    #[must_use]
    pub fn is_symbol_table(&self) -> bool {
        self.ion_type == IonType::Struct
            && !self.is_null()
            && self.annotations.first() == Some(&sid::ION_SYMBOL_TABLE)
    }
}

/// Counters describing the work a cursor has done.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CursorStats {
    /// Absolute position of the next unread byte
    pub bytes_consumed: u64,
    /// Values stepped over without being filled
    pub values_skipped: u64,
    /// Bytes dropped while skipping, without ever being buffered
    pub bytes_discarded: u64,
    /// Oversized values the handler chose to skip
    pub oversized_skipped: u64,
    /// Version markers consumed
    pub ivms_seen: u64,
}

enum Scan {
    Incomplete,
    Ivm { major: u8, minor: u8 },
    NopPad { len: u64 },
    Value { header: ValueHeader, consumed: u64 },
}

/// An incremental, non-blocking cursor over Ion 1.0 binary data.
#[derive(Debug)]
pub struct BinaryCursor {
    buffer: Vec<u8>,
    /// Absolute position of `buffer[0]`
    base: u64,
    /// Absolute position of the next unread byte
    position: u64,
    end_of_input: bool,
    fixed: bool,
    frames: Vec<Frame>,
    value: Option<ValueHeader>,
    event: Event,
    skip_target: Option<u64>,
    stepping_out: bool,
    config: BufferConfiguration,
    stats: CursorStats,
}

impl BinaryCursor {
    /// A cursor over complete input.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::from_vec_with_config(bytes.to_vec(), BufferConfiguration::default())
    }

    #[must_use]
    pub fn from_slice_with_config(bytes: &[u8], config: BufferConfiguration) -> Self {
        Self::from_vec_with_config(bytes.to_vec(), config)
    }

    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self::from_vec_with_config(bytes, BufferConfiguration::default())
    }

    #[must_use]
    pub fn from_vec_with_config(bytes: Vec<u8>, config: BufferConfiguration) -> Self {
        Self::build(bytes, true, config)
    }

    /// A cursor that receives its input through [`append`](Self::append).
    #[must_use]
    pub fn streaming() -> Self {
        Self::streaming_with_config(BufferConfiguration::default())
    }

    #[must_use]
    pub fn streaming_with_config(config: BufferConfiguration) -> Self {
        let buffer = Vec::with_capacity(config.initial_buffer_size());
        Self::build(buffer, false, config)
    }

    fn build(buffer: Vec<u8>, fixed: bool, config: BufferConfiguration) -> Self {
        BinaryCursor {
            buffer,
            base: 0,
            position: 0,
            end_of_input: fixed,
            fixed,
            frames: vec![Frame {
                ion_type: IonType::Null,
                budget: Budget::Unbounded,
            }],
            value: None,
            event: Event::NeedsInstruction,
            skip_target: None,
            stepping_out: false,
            config,
            stats: CursorStats::default(),
        }
    }

    /// Supplies more bytes to a streaming cursor.
    ///
    /// Bytes that fall inside a value being skipped are dropped immediately.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fixed {
            return Err(Error::illegal_cursor_state(
                "cannot append to a cursor over fixed input",
            ));
        }
        if self.end_of_input {
            return Err(Error::illegal_cursor_state(
                "cannot append after end_of_stream",
            ));
        }
        let mut bytes = bytes;
        if let Some(target) = self.skip_target {
            let missing = target.saturating_sub(self.buffer_end());
            let drop = missing.min(bytes.len() as u64);
            bytes = &bytes[drop as usize..];
            self.base += drop;
            self.position += drop;
            self.stats.bytes_discarded += drop;
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Declares that a streaming cursor will receive no more bytes.
    pub fn end_of_stream(&mut self) {
        self.end_of_input = true;
    }

    /// Advances to the next value at the current depth.
    ///
    /// Returns `StartScalar`, `StartContainer`, `EndContainer` at the end of a container,
    /// or `NeedsData`. At the top level of fixed input, `NeedsData` means the stream is
    /// exhausted. Any part of the current value that has not been read is skipped.
    pub fn next_value(&mut self) -> Result<Event> {
        if !self.finish_pending_skip()? {
            return Ok(self.set_event(Event::NeedsData));
        }
        self.stepping_out = false;
        if let Some(value) = self.value.take() {
            if self.event != Event::ValueReady && value.body_end > self.position {
                self.stats.values_skipped += 1;
            }
            if !self.skip_to(value.body_end)? {
                return Ok(self.set_event(Event::NeedsData));
            }
        }
        self.compact();
        loop {
            if self.frame().budget == Budget::Bounded(0) {
                return Ok(self.set_event(Event::EndContainer));
            }
            match self.scan_header()? {
                Scan::Incomplete => return self.out_of_data("value header"),
                Scan::Ivm { major, minor } => {
                    trace!(position = self.position, major, minor, "version marker");
                    self.position += IVM.len() as u64;
                    self.stats.ivms_seen += 1;
                    self.config.notify_ivm(major, minor);
                    if (major, minor) != (1, 0) {
                        return Err(Error::decode(
                            self.position - IVM.len() as u64,
                            format!("unsupported Ion version {major}.{minor}"),
                        ));
                    }
                }
                Scan::NopPad { len } => {
                    self.consume_budget(len)?;
                    if !self.skip_to(self.position + len)? {
                        return Ok(self.set_event(Event::NeedsData));
                    }
                }
                Scan::Value { header, consumed } => {
                    self.consume_budget(header.body_end - self.position)?;
                    self.position += consumed;
                    if self.depth() == 0 && self.is_oversized(&header)? {
                        if !self.skip_to(header.body_end)? {
                            return Ok(self.set_event(Event::NeedsData));
                        }
                        continue;
                    }
                    let event = if header.is_container() {
                        Event::StartContainer
                    } else {
                        Event::StartScalar
                    };
                    self.value = Some(header);
                    return Ok(self.set_event(event));
                }
            }
        }
    }

    /// Buffers the current value's entire body.
    ///
    /// Returns `ValueReady` once the body is available, `NeedsData` if more bytes are
    /// required, or `NeedsInstruction` if the value was oversized and skipped.
    pub fn fill_value(&mut self) -> Result<Event> {
        let Some(header) = self.value.as_ref() else {
            return Err(Error::illegal_cursor_state(
                "fill_value requires a current value",
            ));
        };
        if !matches!(
            self.event,
            Event::StartScalar | Event::StartContainer | Event::ValueReady | Event::NeedsData
        ) {
            return Err(Error::illegal_cursor_state(format!(
                "fill_value is not legal after {:?}",
                self.event
            )));
        }
        let body_end = header.body_end;
        let total = header.total_len();
        if body_end <= self.buffer_end() {
            return Ok(self.set_event(Event::ValueReady));
        }
        if self.end_of_input {
            return Err(Error::unexpected_eof(self.buffer_end(), "value body"));
        }
        let header = header.clone();
        if self.is_oversized(&header)? {
            self.value = None;
            self.skip_to(body_end)?;
            return Ok(self.set_event(Event::NeedsInstruction));
        }
        let missing = (body_end - self.buffer_end()).min(total);
        self.buffer.reserve(usize::try_from(missing).unwrap_or(0));
        Ok(self.set_event(Event::NeedsData))
    }

    /// Enters the current container. Its children are then reached with `next_value`.
    pub fn step_into_container(&mut self) -> Result<Event> {
        let legal = matches!(self.event, Event::StartContainer | Event::ValueReady)
            && self.value.as_ref().is_some_and(ValueHeader::is_container);
        if !legal {
            return Err(Error::illegal_cursor_state(
                "step_into_container requires a container value",
            ));
        }
        if let Some(header) = self.value.take() {
            self.position = header.body_start;
            self.frames.push(Frame {
                ion_type: header.ion_type,
                budget: Budget::Bounded(header.body_len()),
            });
        }
        Ok(self.set_event(Event::NeedsInstruction))
    }

    /// Leaves the current container, skipping whatever part of it was not read.
    ///
    /// Returns `NeedsData` if the rest of the container has not arrived yet; calling it
    /// again after appending more bytes continues the skip.
    pub fn step_out_of_container(&mut self) -> Result<Event> {
        if self.stepping_out {
            return if self.finish_pending_skip()? {
                self.stepping_out = false;
                Ok(self.set_event(Event::NeedsInstruction))
            } else {
                Ok(self.set_event(Event::NeedsData))
            };
        }
        if self.frames.len() <= 1 {
            return Err(Error::illegal_cursor_state(
                "step_out_of_container at the top level",
            ));
        }
        let current_end = match (self.skip_target, self.value.take()) {
            (Some(target), _) => target,
            (None, Some(value)) => value.body_end,
            (None, None) => self.position,
        };
        let remaining = match self.frames.pop().map(|f| f.budget) {
            Some(Budget::Bounded(remaining)) => remaining,
            _ => 0,
        };
        if self.skip_to(current_end + remaining)? {
            Ok(self.set_event(Event::NeedsInstruction))
        } else {
            self.stepping_out = true;
            Ok(self.set_event(Event::NeedsData))
        }
    }

    /// The current value's body. Legal only after `ValueReady`.
    pub fn value_bytes(&self) -> Result<&[u8]> {
        let header = self.ready_value()?;
        Ok(self.slice(header.body_start, header.body_end))
    }

    /// The current value's annotation wrapper, descriptor, length and body.
    pub fn value_span(&self) -> Result<&[u8]> {
        let header = self.ready_value()?;
        Ok(self.slice(header.header_start, header.body_end))
    }

    fn ready_value(&self) -> Result<&ValueHeader> {
        match (&self.value, self.event) {
            (Some(header), Event::ValueReady) => Ok(header),
            _ => Err(Error::illegal_cursor_state(
                "value bytes are only available after ValueReady",
            )),
        }
    }

    fn slice(&self, start: u64, end: u64) -> &[u8] {
        &self.buffer[(start - self.base) as usize..(end - self.base) as usize]
    }

    /// The event returned by the most recent operation.
    #[must_use]
    pub fn event(&self) -> Event {
        self.event
    }

    /// The value the cursor is positioned on, if any.
    #[must_use]
    pub fn current(&self) -> Option<&ValueHeader> {
        self.value.as_ref()
    }

    /// Container nesting depth; 0 at the top level.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Type of the container the cursor is inside, `None` at the top level.
    #[must_use]
    pub fn container_type(&self) -> Option<IonType> {
        (self.depth() > 0).then(|| self.frame().ion_type)
    }

    /// Absolute position of the next unread byte.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        !self.fixed
    }

    #[must_use]
    pub fn stats(&self) -> CursorStats {
        CursorStats {
            bytes_consumed: self.position,
            ..self.stats
        }
    }

    /// Bytes currently held in the buffer.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn frame(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    fn buffer_end(&self) -> u64 {
        self.base + self.buffer.len() as u64
    }

    fn available(&self) -> &[u8] {
        &self.buffer[(self.position - self.base) as usize..]
    }

    fn set_event(&mut self, event: Event) -> Event {
        self.event = event;
        event
    }

    fn out_of_data(&mut self, context: &str) -> Result<Event> {
        let at_boundary = self.depth() == 0 && self.available().is_empty();
        if self.end_of_input && !at_boundary {
            return Err(Error::unexpected_eof(self.position, context));
        }
        Ok(self.set_event(Event::NeedsData))
    }

    fn consume_budget(&mut self, len: u64) -> Result<()> {
        let position = self.position;
        let depth = self.depth();
        let frame = &mut self.frames[depth];
        if frame.budget.consume(len) {
            Ok(())
        } else {
            Err(Error::decode(
                position,
                "value extends past the end of its container",
            ))
        }
    }

    /// Moves to `target`, or discards everything buffered and remembers the target when
    /// it has not arrived yet. Returns `true` once the target is reached.
    fn skip_to(&mut self, target: u64) -> Result<bool> {
        let end = self.buffer_end();
        if target <= end {
            self.position = self.position.max(target);
            self.skip_target = None;
            return Ok(true);
        }
        if self.end_of_input {
            return Err(Error::unexpected_eof(end, "skipped value"));
        }
        self.stats.bytes_discarded += end - self.position;
        self.buffer.clear();
        self.base = end;
        self.position = end;
        self.skip_target = Some(target);
        Ok(false)
    }

    fn finish_pending_skip(&mut self) -> Result<bool> {
        match self.skip_target {
            Some(target) => self.skip_to(target),
            None => Ok(true),
        }
    }

    /// Drops consumed bytes once they make up at least half of a streaming buffer.
    fn compact(&mut self) {
        if self.fixed {
            return;
        }
        let consumed = (self.position - self.base) as usize;
        if consumed > 0 && consumed * 2 >= self.buffer.len() {
            self.buffer.drain(..consumed);
            self.base = self.position;
        }
    }

    fn is_oversized(&mut self, header: &ValueHeader) -> Result<bool> {
        let length = header.total_len();
        let limit = self.config.max_value_size();
        if self.fixed || length <= limit {
            return Ok(false);
        }
        let info = OversizedValue {
            position: header.header_start,
            length,
            limit,
            ion_type: Some(header.ion_type),
        };
        let abort = Error::OversizedValue {
            position: info.position,
            length,
            limit,
        };
        if self.depth() == 0 && header.is_symbol_table() {
            debug!(position = info.position, length, limit, "oversized symbol table");
            return Err(abort);
        }
        match self.config.handle_oversized(&info) {
            OversizedAction::Skip => {
                debug!(position = info.position, length, limit, "skipping oversized value");
                self.stats.oversized_skipped += 1;
                Ok(true)
            }
            OversizedAction::Abort => {
                debug!(position = info.position, length, limit, "aborting on oversized value");
                Err(abort)
            }
        }
    }

    /// Parses the next header without moving. Nothing is committed unless every header
    /// byte is buffered.
    fn scan_header(&self) -> Result<Scan> {
        let start = self.position;
        let bytes = self.available();
        let mut i = 0usize;

        let mut field_sid = None;
        if self.depth() > 0 && self.frame().ion_type == IonType::Struct {
            match header_var_uint(bytes, start)? {
                Some((sid, n)) => {
                    field_sid = Some(sid);
                    i += n;
                }
                None => return Ok(Scan::Incomplete),
            }
        }

        let header_start = start + i as u64;
        let Some(&first) = bytes.get(i) else {
            return Ok(Scan::Incomplete);
        };
        if self.depth() == 0 && first == IVM[0] {
            let Some(marker) = bytes.get(i..i + IVM.len()) else {
                return Ok(Scan::Incomplete);
            };
            if marker[3] != IVM[3] {
                return Err(Error::decode(header_start, "invalid version marker"));
            }
            return Ok(Scan::Ivm {
                major: marker[1],
                minor: marker[2],
            });
        }
        i += 1;
        let mut descriptor = TypeDescriptor::from_byte(first);
        descriptor.validate(header_start)?;

        let mut annotations = Vec::new();
        let mut wrapper_end = None;
        if descriptor.code == TypeCode::Annotation {
            let wrapper_len = match descriptor.length_source() {
                LengthSource::Inline(len) => len,
                LengthSource::VarUInt => match header_var_uint(&bytes[i..], start + i as u64)? {
                    Some((len, n)) => {
                        i += n;
                        len
                    }
                    None => return Ok(Scan::Incomplete),
                },
            };
            wrapper_end = Some(i as u64 + wrapper_len);

            let Some((annotations_len, n)) = header_var_uint(&bytes[i..], start + i as u64)? else {
                return Ok(Scan::Incomplete);
            };
            i += n;
            if annotations_len == 0 {
                return Err(Error::decode(
                    header_start,
                    "annotation wrapper with no annotations",
                ));
            }
            let annotations_end = i + annotations_len as usize;
            if bytes.len() < annotations_end {
                return Ok(Scan::Incomplete);
            }
            while i < annotations_end {
                let Some((sid, n)) =
                    header_var_uint(&bytes[i..annotations_end], start + i as u64)?
                else {
                    return Err(Error::decode(
                        start + i as u64,
                        "annotation SID crosses the annotation length",
                    ));
                };
                annotations.push(sid);
                i += n;
            }

            let Some(&wrapped) = bytes.get(i) else {
                return Ok(Scan::Incomplete);
            };
            descriptor = TypeDescriptor::from_byte(wrapped);
            descriptor.validate(start + i as u64)?;
            if descriptor.code == TypeCode::Annotation {
                return Err(Error::decode(
                    start + i as u64,
                    "annotation wrapper may not wrap another annotation wrapper",
                ));
            }
            if descriptor.is_nop_pad() {
                return Err(Error::decode(
                    start + i as u64,
                    "annotation wrapper may not wrap a NOP pad",
                ));
            }
            i += 1;
        }

        let body_len = match descriptor.length_source() {
            LengthSource::Inline(len) => len,
            LengthSource::VarUInt => match header_var_uint(&bytes[i..], start + i as u64)? {
                Some((len, n)) => {
                    i += n;
                    len
                }
                None => return Ok(Scan::Incomplete),
            },
        };
        if descriptor.is_ordered_struct() && body_len == 0 {
            return Err(Error::decode(header_start, "empty struct marked as ordered"));
        }
        let body_end = i as u64 + body_len;
        if wrapper_end.is_some_and(|end| end != body_end) {
            return Err(Error::decode(
                header_start,
                "annotation wrapper length does not match the wrapped value",
            ));
        }
        if descriptor.is_nop_pad() {
            return Ok(Scan::NopPad { len: body_end });
        }
        let ion_type = descriptor.ion_type().ok_or_else(|| {
            Error::decode(header_start, format!("unexpected type code {:?}", descriptor.code))
        })?;
        Ok(Scan::Value {
            header: ValueHeader {
                ion_type,
                descriptor,
                field_sid,
                annotations,
                header_start,
                body_start: start + i as u64,
                body_end: start + body_end,
            },
            consumed: i as u64,
        })
    }
}

/// Reads a header VarUInt, rejecting values the cursor cannot address.
fn header_var_uint(bytes: &[u8], position: u64) -> Result<Option<(u64, usize)>> {
    match peek_var_uint(bytes) {
        Ok(Some((value, _))) if value > MAX_HEADER_VAR_UINT => Err(Error::overflow(&format!(
            "VarUInt at byte {position}"
        ))),
        other => other,
    }
}
