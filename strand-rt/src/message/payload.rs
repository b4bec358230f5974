//! Size-classed message payloads.
//!
//! Payload bytes are stored in the smallest class that fits: tiny and
//! small payloads ride inline in the message, medium ones come from the
//! per-thread slot pool, anything larger is heap-owned. The owning /
//! borrowing distinction is carried in the type: [`Payload::Static`] never
//! frees, everything in [`ByteBuf`] frees (or returns to its pool) exactly
//! once, on drop.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::alloc::{self, PoolSlot};

/// Upper bound of the tiny class (inline in the message header).
pub const TINY_MAX: usize = 8;
/// Upper bound of the small class (inline fixed buffer).
pub const SMALL_MAX: usize = 64;
/// Upper bound of the medium class (pooled slots).
pub const MEDIUM_MAX: usize = alloc::POOL_SLOT_SIZE;
/// Upper bound of the large class; above this the buffer is flagged huge.
pub const LARGE_MAX: usize = 64 * 1024;

/// The storage class a byte payload landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// ≤ 8 bytes, inline.
    Tiny,
    /// ≤ 64 bytes, inline fixed buffer.
    Small,
    /// ≤ 1 KiB, pooled slot.
    Medium,
    /// ≤ 64 KiB, heap.
    Large,
    /// > 64 KiB, heap, flagged.
    Huge,
}

/// An owned byte buffer in its smallest fitting size class.
pub enum ByteBuf {
    /// Inline, at most [`TINY_MAX`] bytes.
    Tiny { len: u8, data: [u8; TINY_MAX] },
    /// Inline, at most [`SMALL_MAX`] bytes.
    Small { len: u8, data: [u8; SMALL_MAX] },
    /// Pooled slot, at most [`MEDIUM_MAX`] bytes. Returns to its pool on
    /// drop.
    Pooled { len: u32, slot: PoolSlot },
    /// Heap, at most [`LARGE_MAX`] bytes.
    Heap(Box<[u8]>),
    /// Heap, above [`LARGE_MAX`] bytes.
    Huge(Box<[u8]>),
}

impl ByteBuf {
    /// Copy `data` into the smallest fitting class.
    ///
    /// A medium-sized copy falls back to the heap (counted by the pool)
    /// when the calling thread's shard is exhausted.
    pub fn from_slice(data: &[u8]) -> Self {
        let len = data.len();
        if len <= TINY_MAX {
            let mut buf = [0u8; TINY_MAX];
            buf[..len].copy_from_slice(data);
            ByteBuf::Tiny {
                len: len as u8,
                data: buf,
            }
        } else if len <= SMALL_MAX {
            let mut buf = [0u8; SMALL_MAX];
            buf[..len].copy_from_slice(data);
            ByteBuf::Small {
                len: len as u8,
                data: buf,
            }
        } else if len <= MEDIUM_MAX {
            match alloc::acquire() {
                Some(mut slot) => {
                    slot.bytes_mut()[..len].copy_from_slice(data);
                    ByteBuf::Pooled {
                        len: len as u32,
                        slot,
                    }
                }
                None => ByteBuf::Heap(data.into()),
            }
        } else if len <= LARGE_MAX {
            ByteBuf::Heap(data.into())
        } else {
            ByteBuf::Huge(data.into())
        }
    }

    /// The payload bytes.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            ByteBuf::Tiny { len, data } => &data[..*len as usize],
            ByteBuf::Small { len, data } => &data[..*len as usize],
            ByteBuf::Pooled { len, slot } => &slot.bytes()[..*len as usize],
            ByteBuf::Heap(data) | ByteBuf::Huge(data) => data,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The class this buffer landed in.
    pub fn size_class(&self) -> SizeClass {
        match self {
            ByteBuf::Tiny { .. } => SizeClass::Tiny,
            ByteBuf::Small { .. } => SizeClass::Small,
            ByteBuf::Pooled { .. } => SizeClass::Medium,
            ByteBuf::Heap(data) => {
                if data.len() <= MEDIUM_MAX {
                    // Pool-exhaustion fallback keeps the logical class.
                    SizeClass::Medium
                } else {
                    SizeClass::Large
                }
            }
            ByteBuf::Huge(_) => SizeClass::Huge,
        }
    }
}

impl Clone for ByteBuf {
    fn clone(&self) -> Self {
        // Re-classing on clone keeps the pooled slots single-owner.
        Self::from_slice(self.as_slice())
    }
}

impl PartialEq for ByteBuf {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteBuf {}

impl fmt::Debug for ByteBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuf")
            .field("class", &self.size_class())
            .field("len", &self.len())
            .finish()
    }
}

/// A message payload.
///
/// # Example
/// ```rust
/// use strand_rt::message::{Payload, SizeClass};
///
/// let p = Payload::bytes(b"inc");
/// assert_eq!(p.as_bytes(), Some(&b"inc"[..]));
///
/// let q = Payload::from_static(b"static never frees");
/// assert_eq!(q.as_bytes().unwrap().len(), 18);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No payload.
    None,
    /// Boolean scalar.
    Bool(bool),
    /// Small integer scalar.
    Int(i64),
    /// Small float scalar.
    Float(f64),
    /// Borrowed bytes with static lifetime; never freed.
    Static(&'static [u8]),
    /// Owned bytes, size-classed.
    Bytes(ByteBuf),
    /// Owned bytes known to hold JSON, size-classed.
    Json(ByteBuf),
}

impl Payload {
    /// Copy `data` into an owned, size-classed byte payload.
    pub fn bytes(data: &[u8]) -> Self {
        Payload::Bytes(ByteBuf::from_slice(data))
    }

    /// Copy `data` into an owned, JSON-tagged byte payload.
    pub fn json(data: &[u8]) -> Self {
        Payload::Json(ByteBuf::from_slice(data))
    }

    /// Borrow static bytes without copying.
    pub fn from_static(data: &'static [u8]) -> Self {
        Payload::Static(data)
    }

    /// The payload bytes, when the payload is byte-shaped.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Static(data) => Some(data),
            Payload::Bytes(buf) | Payload::Json(buf) => Some(buf.as_slice()),
            _ => None,
        }
    }

    /// The payload as UTF-8, when byte-shaped and valid.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Byte length for byte-shaped payloads, zero otherwise.
    pub fn len(&self) -> usize {
        self.as_bytes().map_or(0, <[u8]>::len)
    }

    /// Whether the payload carries no data at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::None)
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::None
    }
}
