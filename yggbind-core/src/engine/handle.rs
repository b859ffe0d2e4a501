//! Ownership of one native engine instance.

use std::ffi::CStr;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use libc::c_void;
use tracing::debug;

use crate::error::{Result, YggError};
use crate::ffi::{MessageCall, NativeApi, NativeString, ResponseBuffer};

/// Exclusive owner of a native engine pointer.
///
/// The engine is freed when the handle is dropped, so it is freed exactly
/// once. Every call borrows the handle, which keeps the pointer alive for
/// the duration of the call.
pub struct EngineHandle {
    api: Arc<NativeApi>,
    raw: NonNull<c_void>,
}

// SAFETY: the native engine guards its state with its own lock and may be
// called from any thread. The pointer is only freed by `drop`, which needs
// exclusive access.
unsafe impl Send for EngineHandle {}
unsafe impl Sync for EngineHandle {}

impl EngineHandle {
    pub fn create(api: Arc<NativeApi>) -> Result<Self> {
        let raw = NonNull::new(api.new_engine())
            .ok_or_else(|| YggError::protocol("new_engine returned a null pointer"))?;
        debug!(engine = ?raw, "Native engine created");
        Ok(Self { api, raw })
    }

    pub fn api(&self) -> &NativeApi {
        &self.api
    }

    pub fn send(&self, call: MessageCall, message: &[u8]) -> ResponseBuffer<'_> {
        // SAFETY: `raw` is live for as long as `self` is.
        unsafe { self.api.send(self.raw.as_ptr(), call, message) }
    }

    pub fn take_state(&self, json: &CStr) -> ResponseBuffer<'_> {
        // SAFETY: as above.
        unsafe { self.api.take_state(self.raw.as_ptr(), json) }
    }

    pub fn get_state(&self) -> NativeString<'_> {
        // SAFETY: as above.
        unsafe { self.api.get_state(self.raw.as_ptr()) }
    }

    pub fn list_known_toggles(&self) -> ResponseBuffer<'_> {
        // SAFETY: as above.
        unsafe { self.api.list_known_toggles(self.raw.as_ptr()) }
    }

    pub fn get_metrics(&self) -> ResponseBuffer<'_> {
        // SAFETY: as above.
        unsafe { self.api.get_metrics(self.raw.as_ptr()) }
    }

    pub fn collect_impact_metrics(&self) -> NativeString<'_> {
        // SAFETY: as above.
        unsafe { self.api.collect_impact_metrics(self.raw.as_ptr()) }
    }

    pub fn restore_impact_metrics(&self, json: &CStr) -> NativeString<'_> {
        // SAFETY: as above.
        unsafe { self.api.restore_impact_metrics(self.raw.as_ptr(), json) }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        debug!(engine = ?self.raw, "Freeing native engine");
        // SAFETY: created by this API and never used after this point.
        unsafe { self.api.free_engine(self.raw.as_ptr()) };
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle").field("raw", &self.raw).finish()
    }
}
