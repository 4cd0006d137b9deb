use std::path::Path;

use figment::{
    providers::{Format as _, Json, Yaml},
    value::{Dict, Map},
    Error, Metadata, Profile, Provider,
};

/// Format of a configuration file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileFormat {
    /// JSON.
    Json,

    /// YAML.
    Yaml,
}

impl FileFormat {
    /// Picks the format from the file extension: `.json` is JSON, and anything else is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    fn source_name(self) -> &'static str {
        match self {
            Self::Json => "JSON file",
            Self::Yaml => "YAML file",
        }
    }
}

/// A configuration file whose contents are read once, up front.
///
/// Editing or removing the file afterwards never changes an already-built configuration. Picking up changes means
/// loading the file again and swapping in the result.
pub struct ResolvedProvider {
    data: Map<Profile, Dict>,
    metadata: Metadata,
}

impl ResolvedProvider {
    pub fn from_path(path: &Path, format: FileFormat) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::from(format!("failed to read '{}': {}", path.display(), e)))?;

        let data = match format {
            FileFormat::Json => Json::string(&contents).data()?,
            FileFormat::Yaml => Yaml::string(&contents).data()?,
        };

        Ok(Self {
            data,
            metadata: Metadata::from(format.source_name(), path),
        })
    }
}

impl Provider for ResolvedProvider {
    fn metadata(&self) -> Metadata {
        self.metadata.clone()
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        Ok(self.data.clone())
    }
}
