//! Native Library Loader - Runtime Resolution of the Engine Library
//!
//! The engine ships as a per-platform shared library. It is opened with
//! `libloading` and every symbol of [`EngineSymbols`] is resolved up front,
//! so a library that is missing an entry point fails at load time instead
//! of at the first call.

use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, info, warn};

use super::{
    CoreVersionFn, EngineQueryFn, EngineSymbols, FreeBufFn, FreeEngineFn, FreeResponseFn,
    JsonCommandFn, JsonQueryFn, MessageFn, NativeApi, NewEngineFn, StaticQueryFn, TakeStateFn,
};
use crate::config::BindingConfig;
use crate::error::{Result, YggError};

/// File name of the engine library for the platform this crate was built
/// for, or `None` if no build exists for it.
pub fn platform_library_name() -> Option<String> {
    library_name_for(
        std::env::consts::OS,
        std::env::consts::ARCH,
        cfg!(target_env = "musl"),
    )
}

pub(crate) fn library_name_for(os: &str, arch: &str, musl: bool) -> Option<String> {
    match os {
        "windows" => {
            let arch = match arch {
                "x86_64" => "x86_64",
                "aarch64" => "arm64",
                "x86" => "i686",
                _ => return None,
            };
            Some(format!("yggdrasilffi_{arch}.dll"))
        }
        "macos" | "linux" => {
            let arch = match arch {
                "x86_64" => "x86_64",
                "aarch64" => "arm64",
                _ => return None,
            };
            let suffix = if musl && os == "linux" { "-musl" } else { "" };
            let ext = if os == "macos" { "dylib" } else { "so" };
            Some(format!("libyggdrasilffi_{arch}{suffix}.{ext}"))
        }
        _ => None,
    }
}

/// Resolve a required symbol and copy the function pointer out of it.
///
/// # Safety
///
/// `T` must match the exported function's real signature.
unsafe fn required<T: Copy>(library: &Library, name: &str) -> Result<T> {
    let symbol = library.get::<T>(name.as_bytes())?;
    Ok(*symbol)
}

impl NativeApi {
    /// Open the engine library at `path` and resolve its entry points.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading native engine library");

        // SAFETY: loading runs the library's initialisers. The engine
        // library has none with preconditions.
        let library = unsafe { Library::new(path)? };

        // SAFETY: the function pointer types below mirror the engine's
        // exported C signatures.
        let symbols = unsafe {
            EngineSymbols {
                new_engine: required::<NewEngineFn>(&library, "new_engine")?,
                free_engine: required::<FreeEngineFn>(&library, "free_engine")?,
                get_state: required::<JsonQueryFn>(&library, "get_state")?,
                take_state: required::<TakeStateFn>(&library, "flat_take_state")?,
                check_enabled: required::<MessageFn>(&library, "flat_check_enabled")?,
                check_variant: required::<MessageFn>(&library, "flat_check_variant")?,
                define_counter: required::<MessageFn>(&library, "flat_define_counter")?,
                inc_counter: required::<MessageFn>(&library, "flat_inc_counter")?,
                define_gauge: required::<MessageFn>(&library, "flat_define_gauge")?,
                set_gauge: required::<MessageFn>(&library, "flat_set_gauge")?,
                define_histogram: required::<MessageFn>(&library, "flat_define_histogram")?,
                observe_histogram: required::<MessageFn>(&library, "flat_observe_histogram")?,
                list_known_toggles: required::<EngineQueryFn>(
                    &library,
                    "flat_list_known_toggles",
                )?,
                built_in_strategies: required::<StaticQueryFn>(
                    &library,
                    "flat_built_in_strategies",
                )?,
                get_metrics: required::<EngineQueryFn>(&library, "flat_get_metrics")?,
                collect_impact_metrics: required::<JsonQueryFn>(
                    &library,
                    "collect_impact_metrics",
                )?,
                restore_impact_metrics: required::<JsonCommandFn>(
                    &library,
                    "restore_impact_metrics",
                )?,
                free_response: required::<FreeResponseFn>(&library, "free_response")?,
                free_buffer: required::<FreeBufFn>(&library, "flat_buf_free")?,
                core_version: required::<CoreVersionFn>(&library, "get_core_version").ok(),
            }
        };

        if symbols.core_version.is_none() {
            debug!("Library does not export get_core_version");
        }

        let api = NativeApi::with_library(symbols, library);
        info!(
            version = api.core_version().as_deref().unwrap_or("unknown"),
            "Native engine library loaded"
        );
        Ok(api)
    }

    /// Find and open the engine library described by `config`.
    ///
    /// An explicit `library_path` wins; otherwise each search path is probed
    /// for the platform's library file name.
    pub fn open(config: &BindingConfig) -> Result<Self> {
        let path = locate(config)?;
        Self::load(path)
    }
}

/// Work out which file [`NativeApi::open`] would load.
pub fn locate(config: &BindingConfig) -> Result<PathBuf> {
    if let Some(path) = &config.library_path {
        return Ok(path.clone());
    }

    let name = platform_library_name().ok_or_else(|| {
        YggError::invalid(format!(
            "no native engine build for {}/{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        ))
    })?;

    for dir in &config.search_paths {
        let candidate = dir.join(&name);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "Found native engine library");
            return Ok(candidate);
        }
        debug!(dir = %dir.display(), "Library not in search path, skipping");
    }

    warn!(library = %name, "Native engine library not found in any search path");
    Err(YggError::invalid(format!(
        "{name} not found in search paths {:?}",
        config.search_paths
    )))
}
