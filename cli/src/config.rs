// Copyright (C) 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::path::Path;

use anyhow::Context;
use genasm::RegisterSet;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "genasm.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ClassSetting {
    Xmm,
    #[default]
    Ymm,
    Zmm,
}

impl ClassSetting {
    #[must_use]
    pub fn register_set(&self) -> RegisterSet {
        match self {
            Self::Xmm => genasm::XMM,
            Self::Ymm => genasm::YMM,
            Self::Zmm => genasm::ZMM,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigRoot {
    pub log: ConfigSectionLog,
    pub kernel: ConfigSectionKernel,
}

impl ConfigRoot {
    /// Reads the given file, or `genasm.toml` in the working directory if it
    /// exists. Without either, every setting has its default.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("kon configuratie {} niet lezen", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("ongeldige configuratie in {}", path.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigSectionLog {
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigSectionKernel {
    pub register_class: ClassSetting,

    /// Hand out only this many registers of the class.
    pub registers: Option<usize>,

    pub inputs: usize,
    pub rounds: usize,
}

impl Default for ConfigSectionKernel {
    fn default() -> Self {
        Self {
            register_class: ClassSetting::default(),
            registers: None,
            inputs: 8,
            rounds: 4,
        }
    }
}
