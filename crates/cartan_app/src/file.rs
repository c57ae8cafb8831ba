use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error while importing or exporting a config file.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize toml: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Returns the path if it is absolute, otherwise transform it into a
/// absolute path by appending it to the current working directory.
pub fn abs_or_relative(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    Ok(std::env::current_dir()?.join(path))
}

/// Deserialize data from toml file.
pub fn import_toml<T: DeserializeOwned>(path: &Path) -> Result<T, FileError> {
    let string = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&string)?)
}

/// Serialize data to toml file.
pub fn export_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), FileError> {
    let string = toml::to_string_pretty(value)?;
    Ok(std::fs::write(path, string)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Sample {
        name: String,
        size: usize,
    }

    #[test]
    fn toml_round_trip() {
        let dir = std::env::temp_dir();
        let path = dir.join("cartan_app_file_test.toml");

        let value = Sample {
            name: "earth".to_string(),
            size: 16,
        };

        export_toml(&path, &value).unwrap();
        let loaded: Sample = import_toml(&path).unwrap();
        assert_eq!(loaded, value);

        std::fs::remove_file(&path).ok();
    }
}
