use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::{Error, Result};

/// Inclusive integer range a report attribute is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRange {
    pub min: u32,
    pub max: u32,
}

impl ValueRange {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Draw a value uniformly from the range
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<u32> {
        if self.min > self.max {
            return Err(Error::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(rng.gen_range(self.min..=self.max))
    }
}

/// Shape limits for generated reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    pub level: ValueRange,
    pub objects: ValueRange,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            level: ValueRange { min: 1, max: 100 },
            objects: ValueRange { min: 1, max: 10 },
        }
    }
}

/// Formats a report can be rendered and archived in.
///
/// New formats are new variants; parsing an unknown tag fails with
/// [`Error::UnsupportedFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FileFormat {
    Xml,
}

impl FileFormat {
    pub const ALL: &'static [FileFormat] = &[FileFormat::Xml];

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Xml => "xml",
        }
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        FileFormat::ALL
            .iter()
            .copied()
            .find(|format| format.extension().eq_ignore_ascii_case(tag))
            .ok_or_else(|| Error::UnsupportedFormat(tag.to_string()))
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
