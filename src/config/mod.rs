//! Built-in policies and the JSON policy file format.

use serde::Deserialize;

use crate::error::Error;
use crate::policy::Policy;

pub mod basic;
pub mod default;
pub mod file;
pub mod relaxed;
pub mod restricted;

/// Names a built-in policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    None,
    SimpleText,
    Basic,
    BasicWithImages,
    Relaxed,
}

impl Preset {
    pub fn policy(self) -> Policy {
        match self {
            Preset::None => Policy::none(),
            Preset::SimpleText => Policy::simple_text(),
            Preset::Basic => Policy::basic(),
            Preset::BasicWithImages => Policy::basic_with_images(),
            Preset::Relaxed => Policy::relaxed(),
        }
    }
}

/// Builds a static preset. Presets only use fixed, non-empty names, so construction cannot fail.
pub(crate) fn preset(build: fn() -> Result<Policy, Error>) -> Policy {
    build().expect("built-in policy presets only use non-empty names")
}
