//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Block, Func, Pos, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors that come from building a [`Config`] or from configuring the
/// pass driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Only 32-bit and 64-bit pointers are supported.
    #[error("unsupported pointer size {0}, expected 4 or 8")]
    UnsupportedPtrSize(u8),
    /// A pass name that doesn't exist was referenced.
    #[error("unknown pass `{0}`")]
    UnknownPass(String),
    /// A debug flag couldn't be parsed.
    #[error("malformed debug flag `{0}`")]
    MalformedDebugFlag(String),
}

/// The sink for pass diagnostics. Purely advisory, nothing that is logged
/// here can affect the output.
pub trait Logger: Send + Sync {
    /// Logs a general message about what a pass is doing.
    fn logf(&self, args: fmt::Arguments<'_>);

    /// Emits a warning about a specific position, e.g. "removed bounds check".
    fn warnl(&self, pos: Pos, args: fmt::Arguments<'_>);
}

/// The default [`Logger`], forwards everything to the `log` facade.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogLogger;

impl Logger for LogLogger {
    fn logf(&self, args: fmt::Arguments<'_>) {
        log::debug!("{args}");
    }

    fn warnl(&self, pos: Pos, args: fmt::Arguments<'_>) {
        log::warn!("{pos}: {args}");
    }
}

/// A target-specific lowering strategy. This is opaque to the optimizer,
/// the `lower` pass just drives these callbacks through the rewrite
/// engine until neither of them reports a change.
pub trait Backend: Send + Sync {
    /// The name of the backend, for diagnostics.
    fn name(&self) -> &str;

    /// Rewrites a block's kind and controls into target form.
    fn lower_block(&self, f: &mut Func, b: Block) -> bool;

    /// Rewrites a value into target form.
    fn lower_value(&self, f: &mut Func, v: Value) -> bool;
}

/// Describes the target that code is being optimized for.
///
/// A config is immutable once built and is shared between every function
/// being compiled with it.
#[derive(Clone)]
pub struct Config {
    arch: String,
    ptr_size: u8,
    reg_size: u8,
    big_endian: bool,
    backend: Option<Arc<dyn Backend>>,
    logger: Arc<dyn Logger>,
}

impl Config {
    /// Starts building a config. Defaults to a 64-bit little-endian
    /// target with no backend.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The name of the target architecture.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// The size of a pointer in bytes.
    pub fn ptr_size(&self) -> u8 {
        self.ptr_size
    }

    /// The size of a general purpose register in bytes.
    pub fn reg_size(&self) -> u8 {
        self.reg_size
    }

    /// Whether the target is big-endian.
    pub fn big_endian(&self) -> bool {
        self.big_endian
    }

    /// The lowering strategy, if there is one.
    pub fn backend(&self) -> Option<&Arc<dyn Backend>> {
        self.backend.as_ref()
    }

    /// The diagnostic sink.
    pub fn logger(&self) -> &dyn Logger {
        &*self.logger
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arch: "generic64".to_owned(),
            ptr_size: 8,
            reg_size: 8,
            big_endian: false,
            backend: None,
            logger: Arc::new(LogLogger),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("arch", &self.arch)
            .field("ptr_size", &self.ptr_size)
            .field("reg_size", &self.reg_size)
            .field("big_endian", &self.big_endian)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_owned()))
            .finish_non_exhaustive()
    }
}

/// Builds a [`Config`].
///
/// ```
/// # use opal::ir::*;
/// let config = Config::builder()
///     .arch("arm")
///     .ptr_size(4)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.reg_size(), 4);
/// assert!(Config::builder().ptr_size(2).build().is_err());
/// ```
#[derive(Default)]
pub struct ConfigBuilder {
    arch: Option<String>,
    ptr_size: Option<u8>,
    reg_size: Option<u8>,
    big_endian: bool,
    backend: Option<Arc<dyn Backend>>,
    logger: Option<Arc<dyn Logger>>,
}

impl ConfigBuilder {
    /// Sets the architecture name.
    pub fn arch(mut self, name: &str) -> Self {
        self.arch = Some(name.to_owned());
        self
    }

    /// Sets the pointer size in bytes. Must be 4 or 8.
    pub fn ptr_size(mut self, size: u8) -> Self {
        self.ptr_size = Some(size);
        self
    }

    /// Sets the register size in bytes. Defaults to the pointer size.
    pub fn reg_size(mut self, size: u8) -> Self {
        self.reg_size = Some(size);
        self
    }

    /// Sets the endianness.
    pub fn big_endian(mut self, big: bool) -> Self {
        self.big_endian = big;
        self
    }

    /// Sets the lowering strategy.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the diagnostic sink. Defaults to [`LogLogger`].
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Validates the settings and builds the config.
    pub fn build(self) -> Result<Config, ConfigError> {
        let ptr_size = self.ptr_size.unwrap_or(8);

        if ptr_size != 4 && ptr_size != 8 {
            return Err(ConfigError::UnsupportedPtrSize(ptr_size));
        }

        let default_arch = if ptr_size == 8 { "generic64" } else { "generic32" };

        Ok(Config {
            arch: self.arch.unwrap_or_else(|| default_arch.to_owned()),
            ptr_size,
            reg_size: self.reg_size.unwrap_or(ptr_size),
            big_endian: self.big_endian,
            backend: self.backend,
            logger: self.logger.unwrap_or_else(|| Arc::new(LogLogger)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    assert_impl_all!(Config: Send, Sync);

    #[test]
    fn builder_defaults() {
        let config = Config::builder().build().unwrap();

        assert_eq!(config.ptr_size(), 8);
        assert_eq!(config.reg_size(), 8);
        assert_eq!(config.arch(), "generic64");
        assert!(!config.big_endian());
        assert!(config.backend().is_none());
    }

    #[test]
    fn bad_pointer_size_is_rejected() {
        let err = Config::builder().ptr_size(16).build().unwrap_err();

        assert_eq!(err, ConfigError::UnsupportedPtrSize(16));
        assert_eq!(err.to_string(), "unsupported pointer size 16, expected 4 or 8");
    }
}
