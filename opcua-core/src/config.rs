// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Common configuration file handling shared by the server and client.

use std::{fs::File, io::{Read, Write}, path::Path};

/// Failure saving, loading or validating a configuration object.
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration was loaded or about to be saved but failed validation,
    /// with one message per problem found.
    Invalid(Vec<String>),
    /// Reading or writing the file failed.
    Io(std::io::Error),
    /// Parsing or serialising the YAML body failed.
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid(errors) => write!(f, "invalid configuration: {}", errors.join("; ")),
            ConfigError::Io(e) => write!(f, "{e}"),
            ConfigError::Yaml(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}

/// Loads, saves and validates a YAML-backed configuration object. Server and
/// client configs implement this the same way; only `validate` differs.
pub trait Config: serde::Serialize + serde::de::DeserializeOwned {
    /// Check the configuration is internally consistent, returning one
    /// message per problem found. An empty vec means valid.
    fn validate(&self) -> Vec<String>;

    /// Serialise and write to `path`, refusing to write an invalid config.
    fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }
        let yaml = serde_yaml::to_string(self)?;
        let mut file = File::create(path)?;
        file.write_all(yaml.as_bytes())?;
        Ok(())
    }

    /// Read and parse from `path`, without validating (callers that need a
    /// guaranteed-valid config should call `validate` themselves).
    fn load(path: &Path) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}
