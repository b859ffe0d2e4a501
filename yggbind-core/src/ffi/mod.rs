//! FFI Bridge - C ABI of the Native Evaluation Engine
//!
//! The engine exports a flat C interface: an opaque engine pointer, binary
//! request/response calls that exchange [`Buf`] regions, a handful of JSON
//! string calls and two release functions. This module describes that
//! interface as a table of typed function pointers ([`EngineSymbols`]) and
//! wraps each call so that whatever the engine hands back is owned by a
//! guard from [`buffer`] the moment it crosses into Rust.
//!
//! # Design:
//! - The table is plain data. It is resolved from a shared library by
//!   [`loader`], or assembled directly from `extern "C"` functions, which
//!   is how in-process engines plug in.
//! - Nothing in here interprets bytes. Encoding and decoding live in
//!   [`crate::codec`]; this layer only moves pointers.

pub mod buffer;
pub mod loader;

use std::ffi::CStr;
use std::fmt;

use libc::{c_char, c_void, size_t};

pub use buffer::{Buf, NativeString, RequestBuffer, ResponseBuffer};
pub use loader::platform_library_name;

/// Opaque pointer to a native engine instance.
pub type RawEngine = *mut c_void;

pub type NewEngineFn = unsafe extern "C" fn() -> RawEngine;
pub type FreeEngineFn = unsafe extern "C" fn(RawEngine);
pub type JsonQueryFn = unsafe extern "C" fn(RawEngine) -> *mut c_char;
pub type JsonCommandFn = unsafe extern "C" fn(RawEngine, *const c_char) -> *mut c_char;
pub type TakeStateFn = unsafe extern "C" fn(RawEngine, *const c_char) -> Buf;
pub type MessageFn = unsafe extern "C" fn(RawEngine, *const u8, size_t) -> Buf;
pub type EngineQueryFn = unsafe extern "C" fn(RawEngine) -> Buf;
pub type StaticQueryFn = unsafe extern "C" fn() -> Buf;
pub type FreeResponseFn = unsafe extern "C" fn(*mut c_char);
pub type FreeBufFn = unsafe extern "C" fn(Buf);
pub type CoreVersionFn = unsafe extern "C" fn() -> *const c_char;

/// Every entry point of the native engine.
#[derive(Clone, Copy)]
pub struct EngineSymbols {
    pub new_engine: NewEngineFn,
    pub free_engine: FreeEngineFn,
    pub get_state: JsonQueryFn,
    pub take_state: TakeStateFn,
    pub check_enabled: MessageFn,
    pub check_variant: MessageFn,
    pub define_counter: MessageFn,
    pub inc_counter: MessageFn,
    pub define_gauge: MessageFn,
    pub set_gauge: MessageFn,
    pub define_histogram: MessageFn,
    pub observe_histogram: MessageFn,
    pub list_known_toggles: EngineQueryFn,
    pub built_in_strategies: StaticQueryFn,
    pub get_metrics: EngineQueryFn,
    pub collect_impact_metrics: JsonQueryFn,
    pub restore_impact_metrics: JsonCommandFn,
    pub free_response: FreeResponseFn,
    pub free_buffer: FreeBufFn,
    /// Older engine builds do not export a version.
    pub core_version: Option<CoreVersionFn>,
}

impl fmt::Debug for EngineSymbols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSymbols")
            .field("core_version", &self.core_version.is_some())
            .finish_non_exhaustive()
    }
}

/// Binary calls that take an encoded request message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCall {
    CheckEnabled,
    CheckVariant,
    DefineCounter,
    IncCounter,
    DefineGauge,
    SetGauge,
    DefineHistogram,
    ObserveHistogram,
}

impl MessageCall {
    /// Exported symbol name of the call.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::CheckEnabled => "flat_check_enabled",
            Self::CheckVariant => "flat_check_variant",
            Self::DefineCounter => "flat_define_counter",
            Self::IncCounter => "flat_inc_counter",
            Self::DefineGauge => "flat_define_gauge",
            Self::SetGauge => "flat_set_gauge",
            Self::DefineHistogram => "flat_define_histogram",
            Self::ObserveHistogram => "flat_observe_histogram",
        }
    }
}

/// A resolved native engine API.
///
/// When loaded from a shared library the library stays open for as long as
/// the table exists, which keeps every function pointer valid.
pub struct NativeApi {
    symbols: EngineSymbols,
    _library: Option<libloading::Library>,
}

impl NativeApi {
    /// Build an API from function pointers that are valid for the life of
    /// the process, such as `extern "C"` functions compiled into the binary.
    pub fn from_symbols(symbols: EngineSymbols) -> Self {
        Self {
            symbols,
            _library: None,
        }
    }

    pub(crate) fn with_library(symbols: EngineSymbols, library: libloading::Library) -> Self {
        Self {
            symbols,
            _library: Some(library),
        }
    }

    pub fn symbols(&self) -> &EngineSymbols {
        &self.symbols
    }

    /// `true` if the table was resolved from a shared library.
    pub fn is_dynamic(&self) -> bool {
        self._library.is_some()
    }

    /// Version string of the native core, if the library exports one.
    pub fn core_version(&self) -> Option<String> {
        let version = self.symbols.core_version?;
        // SAFETY: the version call takes no arguments and returns a static
        // string that is never freed.
        let ptr = unsafe { version() };
        if ptr.is_null() {
            return None;
        }
        // SAFETY: non-null, NUL-terminated and static.
        let raw = unsafe { CStr::from_ptr(ptr) };
        Some(raw.to_string_lossy().into_owned())
    }

    pub(crate) fn new_engine(&self) -> RawEngine {
        // SAFETY: no arguments; a null result is handled by the caller.
        unsafe { (self.symbols.new_engine)() }
    }

    /// # Safety
    ///
    /// `engine` must come from [`NativeApi::new_engine`] on this API and
    /// must not be used again afterwards.
    pub(crate) unsafe fn free_engine(&self, engine: RawEngine) {
        (self.symbols.free_engine)(engine)
    }

    pub(crate) fn built_in_strategies(&self) -> ResponseBuffer<'_> {
        // SAFETY: no arguments; the buffer is owned by the guard.
        let buf = unsafe { (self.symbols.built_in_strategies)() };
        ResponseBuffer::new(self, buf)
    }

    /// # Safety
    ///
    /// `engine` must be a live engine created by this API.
    pub(crate) unsafe fn send(
        &self,
        engine: RawEngine,
        call: MessageCall,
        message: &[u8],
    ) -> ResponseBuffer<'_> {
        let f = match call {
            MessageCall::CheckEnabled => self.symbols.check_enabled,
            MessageCall::CheckVariant => self.symbols.check_variant,
            MessageCall::DefineCounter => self.symbols.define_counter,
            MessageCall::IncCounter => self.symbols.inc_counter,
            MessageCall::DefineGauge => self.symbols.define_gauge,
            MessageCall::SetGauge => self.symbols.set_gauge,
            MessageCall::DefineHistogram => self.symbols.define_histogram,
            MessageCall::ObserveHistogram => self.symbols.observe_histogram,
        };
        ResponseBuffer::new(self, f(engine, message.as_ptr(), message.len()))
    }

    /// # Safety
    ///
    /// `engine` must be a live engine created by this API.
    pub(crate) unsafe fn take_state(&self, engine: RawEngine, json: &CStr) -> ResponseBuffer<'_> {
        ResponseBuffer::new(self, (self.symbols.take_state)(engine, json.as_ptr()))
    }

    /// # Safety
    ///
    /// `engine` must be a live engine created by this API.
    pub(crate) unsafe fn list_known_toggles(&self, engine: RawEngine) -> ResponseBuffer<'_> {
        ResponseBuffer::new(self, (self.symbols.list_known_toggles)(engine))
    }

    /// # Safety
    ///
    /// `engine` must be a live engine created by this API.
    pub(crate) unsafe fn get_metrics(&self, engine: RawEngine) -> ResponseBuffer<'_> {
        ResponseBuffer::new(self, (self.symbols.get_metrics)(engine))
    }

    /// # Safety
    ///
    /// `engine` must be a live engine created by this API.
    pub(crate) unsafe fn get_state(&self, engine: RawEngine) -> NativeString<'_> {
        NativeString::new(self, (self.symbols.get_state)(engine))
    }

    /// # Safety
    ///
    /// `engine` must be a live engine created by this API.
    pub(crate) unsafe fn collect_impact_metrics(&self, engine: RawEngine) -> NativeString<'_> {
        NativeString::new(self, (self.symbols.collect_impact_metrics)(engine))
    }

    /// # Safety
    ///
    /// `engine` must be a live engine created by this API.
    pub(crate) unsafe fn restore_impact_metrics(
        &self,
        engine: RawEngine,
        json: &CStr,
    ) -> NativeString<'_> {
        NativeString::new(
            self,
            (self.symbols.restore_impact_metrics)(engine, json.as_ptr()),
        )
    }
}

impl fmt::Debug for NativeApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeApi")
            .field("symbols", &self.symbols)
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::ptr;

    thread_local! {
        static FREED: Cell<usize> = const { Cell::new(0) };
    }

    extern "C" fn new_engine() -> RawEngine {
        ptr::null_mut()
    }
    extern "C" fn free_engine(_: RawEngine) {}
    extern "C" fn json_query(_: RawEngine) -> *mut c_char {
        ptr::null_mut()
    }
    extern "C" fn json_command(_: RawEngine, _: *const c_char) -> *mut c_char {
        ptr::null_mut()
    }
    extern "C" fn take_state(_: RawEngine, _: *const c_char) -> Buf {
        Buf::empty()
    }
    extern "C" fn echo(_: RawEngine, msg: *const u8, len: size_t) -> Buf {
        let bytes = unsafe { std::slice::from_raw_parts(msg, len) };
        Buf::from_vec(bytes.to_vec())
    }
    extern "C" fn engine_query(_: RawEngine) -> Buf {
        Buf::empty()
    }
    extern "C" fn static_query() -> Buf {
        Buf::from_vec(b"static".to_vec())
    }
    extern "C" fn free_response(_: *mut c_char) {}
    extern "C" fn free_buffer(buf: Buf) {
        FREED.with(|f| f.set(f.get() + 1));
        drop(unsafe { buf.into_vec() });
    }
    extern "C" fn core_version() -> *const c_char {
        b"0.17.3\0".as_ptr().cast()
    }

    fn symbols() -> EngineSymbols {
        EngineSymbols {
            new_engine,
            free_engine,
            get_state: json_query,
            take_state,
            check_enabled: echo,
            check_variant: echo,
            define_counter: echo,
            inc_counter: echo,
            define_gauge: echo,
            set_gauge: echo,
            define_histogram: echo,
            observe_histogram: echo,
            list_known_toggles: engine_query,
            built_in_strategies: static_query,
            get_metrics: engine_query,
            collect_impact_metrics: json_query,
            restore_impact_metrics: json_command,
            free_response,
            free_buffer,
            core_version: Some(core_version),
        }
    }

    fn freed() -> usize {
        FREED.with(|f| f.get())
    }

    #[test]
    fn test_message_symbols() {
        assert_eq!(MessageCall::CheckEnabled.symbol(), "flat_check_enabled");
        assert_eq!(MessageCall::ObserveHistogram.symbol(), "flat_observe_histogram");
    }

    #[test]
    fn test_send_passes_message_and_releases_response() {
        let api = NativeApi::from_symbols(symbols());
        let before = freed();
        {
            let response = unsafe { api.send(ptr::null_mut(), MessageCall::SetGauge, b"abc") };
            assert_eq!(response.bytes(), b"abc");
        }
        assert_eq!(freed(), before + 1);
    }

    #[test]
    fn test_null_buffer_is_not_released() {
        let api = NativeApi::from_symbols(symbols());
        let before = freed();
        {
            let response = unsafe { api.get_metrics(ptr::null_mut()) };
            assert!(response.is_empty());
        }
        assert_eq!(freed(), before);
    }

    #[test]
    fn test_null_json_is_protocol_error() {
        let api = NativeApi::from_symbols(symbols());
        let response = unsafe { api.get_state(ptr::null_mut()) };
        assert!(matches!(
            response.to_str(),
            Err(crate::error::YggError::Protocol(_))
        ));
    }

    #[test]
    fn test_core_version() {
        let api = NativeApi::from_symbols(symbols());
        assert_eq!(api.core_version().as_deref(), Some("0.17.3"));
        assert!(!api.is_dynamic());

        let mut without = symbols();
        without.core_version = None;
        assert_eq!(NativeApi::from_symbols(without).core_version(), None);
    }

    #[test]
    fn test_built_in_strategies_call() {
        let api = NativeApi::from_symbols(symbols());
        let response = api.built_in_strategies();
        assert_eq!(response.bytes(), b"static");
    }
}
