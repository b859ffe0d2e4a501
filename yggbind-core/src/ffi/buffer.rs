//! Buffer Protocol - Ownership of Bytes Crossing the FFI Boundary
//!
//! Three kinds of memory cross the boundary and each has exactly one owner:
//!
//! - [`Buf`]: a byte region allocated by the native allocator and handed to
//!   us as the result of a call. It must go back through `flat_buf_free`,
//!   never through Rust's allocator. [`ResponseBuffer`] owns one and
//!   releases it on drop, so every exit path (success, decode failure,
//!   early return through `?`) frees it exactly once.
//! - NUL-terminated JSON strings returned by the engine. They have their
//!   own release call (`free_response`); [`NativeString`] owns one.
//! - Request payloads. These are host-owned: a [`RequestBuffer`] builds a
//!   FlatBuffers message and then lends it to the native call as `&[u8]`. The shared borrow
//!   keeps the bytes in place for the duration of the call and ends as soon
//!   as the call returns. The native side never retains the pointer.

use std::ffi::CStr;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use flatbuffers::FlatBufferBuilder;
use libc::{c_char, size_t};

use super::NativeApi;
use crate::codec::Request;
use crate::error::{Result, YggError};

/// Default capacity in bytes for a freshly created request buffer.
pub const DEFAULT_REQUEST_CAPACITY: usize = 256;

/// C-compatible description of a byte region owned by the allocator that
/// produced it.
///
/// The layout mirrors the engine's `Buf` struct field for field.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Buf {
    pub ptr: *mut u8,
    pub len: size_t,
    pub cap: size_t,
}

impl Buf {
    /// A buffer describing no memory at all.
    pub const fn empty() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
            cap: 0,
        }
    }

    /// Leak a `Vec<u8>` into a `Buf`.
    ///
    /// Used by engines implemented in Rust: the returned region must be
    /// handed back to [`Buf::into_vec`] by the same engine's release call.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let mut bytes = std::mem::ManuallyDrop::new(bytes);
        Self {
            ptr: bytes.as_mut_ptr(),
            len: bytes.len(),
            cap: bytes.capacity(),
        }
    }

    /// Reclaim a region produced by [`Buf::from_vec`].
    ///
    /// Returns `None` for a null buffer.
    ///
    /// # Safety
    ///
    /// `self` must come from [`Buf::from_vec`] and must not have been
    /// reclaimed before.
    pub unsafe fn into_vec(self) -> Option<Vec<u8>> {
        if self.ptr.is_null() {
            return None;
        }
        Some(Vec::from_raw_parts(self.ptr, self.len, self.cap))
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}

/// A native-owned response buffer, released through `flat_buf_free` when
/// dropped.
pub struct ResponseBuffer<'a> {
    api: &'a NativeApi,
    buf: Buf,
}

impl<'a> ResponseBuffer<'a> {
    pub(crate) fn new(api: &'a NativeApi, buf: Buf) -> Self {
        Self { api, buf }
    }

    /// The bytes of the response. A null or zero-length buffer reads as an
    /// empty slice.
    pub fn bytes(&self) -> &[u8] {
        if self.buf.ptr.is_null() || self.buf.len == 0 {
            return &[];
        }
        // SAFETY: the engine guarantees `ptr` points at `len` initialised
        // bytes until the buffer is released, which only happens in `drop`.
        unsafe { std::slice::from_raw_parts(self.buf.ptr, self.buf.len) }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }
}

impl Drop for ResponseBuffer<'_> {
    fn drop(&mut self) {
        if self.buf.ptr.is_null() {
            return;
        }
        // SAFETY: the buffer came from this API's engine and is released
        // exactly once, here.
        unsafe { (self.api.symbols().free_buffer)(self.buf) };
    }
}

impl fmt::Debug for ResponseBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBuffer")
            .field("len", &self.buf.len)
            .field("cap", &self.buf.cap)
            .finish()
    }
}

/// A native-owned NUL-terminated JSON response, released through
/// `free_response` when dropped.
pub struct NativeString<'a> {
    api: &'a NativeApi,
    ptr: *mut c_char,
}

impl<'a> NativeString<'a> {
    pub(crate) fn new(api: &'a NativeApi, ptr: *mut c_char) -> Self {
        Self { api, ptr }
    }

    /// Borrow the response as UTF-8.
    ///
    /// JSON responses are mandatory, so a null pointer is a protocol
    /// violation rather than an empty result.
    pub fn to_str(&self) -> Result<&str> {
        if self.ptr.is_null() {
            return Err(YggError::protocol("unexpected null pointer"));
        }
        // SAFETY: non-null and NUL-terminated per the engine's contract;
        // valid until `drop`.
        let raw = unsafe { CStr::from_ptr(self.ptr) };
        raw.to_str()
            .map_err(|e| YggError::protocol(format!("response is not valid UTF-8: {e}")))
    }
}

impl Drop for NativeString<'_> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        // SAFETY: the string came from this API's engine and is released
        // exactly once, here.
        unsafe { (self.api.symbols().free_response)(self.ptr) };
    }
}

/// Host-owned scratch space for encoding request messages.
///
/// One buffer belongs to one worker: the builder is reset and refilled for
/// every request, so after warm-up encoding does not touch the allocator.
pub struct RequestBuffer {
    builder: FlatBufferBuilder<'static>,
    finished: bool,
    encoded: usize,
}

impl RequestBuffer {
    /// Create a buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            builder: FlatBufferBuilder::with_capacity(capacity),
            finished: false,
            encoded: 0,
        }
    }

    /// Encode `request`, replacing any previous contents, and lend out the
    /// encoded bytes.
    ///
    /// A request that cannot be represented leaves the buffer empty and
    /// nothing is lent out. The builder aborts past 2 GiB; that surfaces as
    /// [`YggError::Protocol`].
    pub fn encode<R: Request + ?Sized>(&mut self, request: &R) -> Result<&[u8]> {
        self.clear();
        let builder = &mut self.builder;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<()> {
            let root = request.build(builder)?;
            builder.finish(root, None);
            Ok(())
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.clear();
                return Err(e);
            }
            Err(_) => {
                self.clear();
                return Err(YggError::protocol("request does not fit a flatbuffer"));
            }
        }
        self.finished = true;
        self.encoded += 1;
        Ok(self.builder.finished_data())
    }

    /// The bytes of the last encoded message.
    pub fn as_slice(&self) -> &[u8] {
        if !self.finished {
            return &[];
        }
        self.builder.finished_data()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Number of messages encoded through this buffer.
    pub fn encoded_count(&self) -> usize {
        self.encoded
    }

    /// Drop the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.builder.reset();
        self.finished = false;
    }
}

impl Default for RequestBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_REQUEST_CAPACITY)
    }
}

impl fmt::Debug for RequestBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuffer")
            .field("len", &self.len())
            .field("encoded", &self.encoded)
            .finish()
    }
}
