//! Header planning: the type descriptor and length prefix a value needs.
//!
//! Container lengths are only known once every child is encoded, so the writer keeps each
//! open container's body in its own buffer and asks the planner for the header when the
//! container closes. Annotation wrappers are planned the same way around the value they
//! wrap.

use crate::codec::{var_uint_field_len, write_var_uint};
use crate::format::{TypeCode, MAX_INLINE_LENGTH, NULL_LENGTH, VAR_LENGTH};

/// A planned type descriptor plus optional VarUInt length field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
    descriptor: u8,
    length_field: Option<u64>,
    content_len: u64,
}

impl Header {
    /// Plans the header for a body of `content_len` bytes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ion_binary::format::TypeCode;
    /// use ion_binary::header::Header;
    ///
    /// let short = Header::for_length(TypeCode::String, 13);
    /// assert_eq!(short.descriptor(), 0x8D);
    /// assert_eq!(short.encoded_len(), 1);
    ///
    /// let long = Header::for_length(TypeCode::String, 14);
    /// assert_eq!(long.descriptor(), 0x8E);
    /// assert_eq!(long.encoded_len(), 2);
    /// ```
    #[must_use]
    pub fn for_length(code: TypeCode, content_len: u64) -> Self {
        if content_len > MAX_INLINE_LENGTH {
            Header {
                descriptor: code.high_nibble() | VAR_LENGTH,
                length_field: Some(content_len),
                content_len,
            }
        } else {
            Header {
                descriptor: code.high_nibble() | content_len as u8,
                length_field: None,
                content_len,
            }
        }
    }

    /// A header whose low nibble carries data rather than a length, such as a boolean.
    #[must_use]
    pub fn inline(code: TypeCode, nibble: u8) -> Self {
        Header {
            descriptor: code.high_nibble() | (nibble & 0x0F),
            length_field: None,
            content_len: 0,
        }
    }

    /// The typed null of `code`.
    #[must_use]
    pub fn null(code: TypeCode) -> Self {
        Self::inline(code, NULL_LENGTH)
    }

    #[must_use]
    pub fn descriptor(&self) -> u8 {
        self.descriptor
    }

    #[must_use]
    pub fn length_field(&self) -> Option<u64> {
        self.length_field
    }

    #[must_use]
    pub fn content_len(&self) -> u64 {
        self.content_len
    }

    /// Bytes taken by the descriptor and length field.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + self.length_field.map_or(0, var_uint_field_len)
    }

    /// Header plus body.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.encoded_len() as u64 + self.content_len
    }

    pub fn write(&self, out: &mut Vec<u8>) -> usize {
        out.push(self.descriptor);
        1 + self.length_field.map_or(0, |len| write_var_uint(out, len))
    }
}

/// A planned annotation wrapper around a value of known total length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationWrapper<'a> {
    header: Header,
    sids: &'a [u64],
    sids_len: u64,
}

impl<'a> AnnotationWrapper<'a> {
    /// Plans a wrapper for `sids` around a value occupying `wrapped_len` bytes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ion_binary::header::AnnotationWrapper;
    ///
    /// // One annotation ($10) around `true` (0x11): E3 81 8A 11
    /// let wrapper = AnnotationWrapper::plan(&[10], 1);
    /// let mut out = Vec::new();
    /// wrapper.write(&mut out);
    /// out.push(0x11);
    /// assert_eq!(out, vec![0xE3, 0x81, 0x8A, 0x11]);
    /// assert_eq!(wrapper.total_len(), 4);
    /// ```
    #[must_use]
    pub fn plan(sids: &'a [u64], wrapped_len: u64) -> Self {
        let sids_len: u64 = sids.iter().map(|sid| var_uint_field_len(*sid) as u64).sum();
        let content = var_uint_field_len(sids_len) as u64 + sids_len + wrapped_len;
        AnnotationWrapper {
            header: Header::for_length(TypeCode::Annotation, content),
            sids,
            sids_len,
        }
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Bytes written before the wrapped value.
    #[must_use]
    pub fn prefix_len(&self) -> usize {
        self.header.encoded_len() + var_uint_field_len(self.sids_len) + self.sids_len as usize
    }

    /// Wrapper plus wrapped value.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.header.total_len()
    }

    /// Writes everything up to the wrapped value.
    pub fn write(&self, out: &mut Vec<u8>) -> usize {
        let mut written = self.header.write(out);
        written += write_var_uint(out, self.sids_len);
        for sid in self.sids {
            written += write_var_uint(out, *sid);
        }
        written
    }
}
