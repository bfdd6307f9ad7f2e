use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

/// A widget's dataset. A failed load only disables that widget.
#[derive(Clone, Debug)]
pub enum Dataset<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Dataset<T> {
    pub fn from_result(what: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => {
                info!(dataset = what, "dataset loaded");
                Self::Ready(value)
            }
            Err(error) => {
                let message = format!("{error:#}");
                warn!(dataset = what, error = %message, "dataset unavailable");
                Self::Unavailable(message)
            }
        }
    }

    pub fn not_configured(what: &str) -> Self {
        Self::Unavailable(format!("no {what} file configured"))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Dataset<U> {
        match self {
            Self::Ready(value) => Dataset::Ready(f(value)),
            Self::Unavailable(message) => Dataset::Unavailable(message),
        }
    }
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn read_json(path: &Path) -> Result<Value> {
    let raw = read_text(path)?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn failure_keeps_context_chain() {
        let dataset: Dataset<u32> = Dataset::from_result(
            "map",
            Err::<u32, _>(anyhow!("missing field `features`")).context("failed to parse map"),
        );
        match dataset {
            Dataset::Unavailable(message) => {
                assert_eq!(message, "failed to parse map: missing field `features`")
            }
            Dataset::Ready(_) => panic!("expected an unavailable dataset"),
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let error = read_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(format!("{error:#}").contains("/definitely/not/here.json"));
    }
}
