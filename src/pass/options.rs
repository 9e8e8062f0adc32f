//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::ConfigError;
use crate::pass::PASS_NAMES;
use crate::utility::{SaHashMap, SaHashSet};
use std::str::FromStr;

/// Per-pass settings for the pass driver.
///
/// These are normally parsed from a comma-separated list of
/// `pass/setting` flags, where the setting is one of `on`, `off` or
/// `debug=N`. The pseudo-pass `check` turns the IR checker on or off.
///
/// ```
/// # use opal::pass::PassOptions;
/// let opts: PassOptions = "prove/debug=2,licm/off,check/on".parse().unwrap();
///
/// assert_eq!(opts.debug_level("prove"), 2);
/// assert!(!opts.is_enabled("licm"));
/// assert!(opts.is_enabled("cse"));
/// assert!(opts.check());
/// ```
#[derive(Clone, Debug, Default)]
pub struct PassOptions {
    debug: SaHashMap<String, u32>,
    disabled: SaHashSet<String>,
    check: bool,
}

impl PassOptions {
    /// Default options: every pass enabled, no debug output, no checking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a flag string. The empty string gives the defaults.
    pub fn parse(flags: &str) -> Result<Self, ConfigError> {
        let mut opts = Self::new();

        for flag in flags.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            opts.apply(flag)?;
        }

        Ok(opts)
    }

    fn apply(&mut self, flag: &str) -> Result<(), ConfigError> {
        let malformed = || ConfigError::MalformedDebugFlag(flag.to_owned());
        let (name, setting) = flag.split_once('/').ok_or_else(malformed)?;

        if name == "check" {
            self.check = match setting {
                "on" => true,
                "off" => false,
                _ => return Err(malformed()),
            };

            return Ok(());
        }

        if !PASS_NAMES.contains(&name) {
            return Err(ConfigError::UnknownPass(name.to_owned()));
        }

        match setting {
            "on" => {
                self.disabled.remove(name);
            }
            "off" => self.disable(name),
            _ => {
                let level = setting
                    .strip_prefix("debug=")
                    .and_then(|n| n.parse::<u32>().ok())
                    .ok_or_else(malformed)?;

                self.set_debug(name, level);
            }
        }

        Ok(())
    }

    /// Sets the debug level of a pass.
    pub fn set_debug(&mut self, pass: &str, level: u32) {
        self.debug.insert(pass.to_owned(), level);
    }

    /// Stops a pass from running.
    pub fn disable(&mut self, pass: &str) {
        self.disabled.insert(pass.to_owned());
    }

    /// Turns the checker on or off.
    pub fn set_check(&mut self, check: bool) {
        self.check = check;
    }

    /// The debug level of a pass, 0 unless set.
    pub fn debug_level(&self, pass: &str) -> u32 {
        self.debug.get(pass).copied().unwrap_or(0)
    }

    /// Whether a pass should run.
    pub fn is_enabled(&self, pass: &str) -> bool {
        !self.disabled.contains(pass)
    }

    /// Whether the IR is checked after every pass.
    pub fn check(&self) -> bool {
        self.check
    }
}

impl FromStr for PassOptions {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
