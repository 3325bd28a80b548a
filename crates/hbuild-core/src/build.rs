//! Build requests as accepted by `POST /api/build`.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{PackageInfo, PackageType};

/// How far the server should take the requested packages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildTarget {
    Build,
    Install,
}

impl BuildTarget {
    /// Sources are only built; everything else is installed.
    pub fn for_type(package_type: PackageType) -> Self {
        match package_type {
            PackageType::Source => BuildTarget::Build,
            PackageType::Package | PackageType::Tool => BuildTarget::Install,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildTarget::Build => "build",
            BuildTarget::Install => "install",
        }
    }
}

/// Which stages of a package a build item covers.
///
/// On the wire `AllStages` is `null` and `Stage(s)` is the bare stage name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum StageSelector {
    #[default]
    AllStages,
    Stage(String),
}

impl Serialize for StageSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StageSelector::AllStages => serializer.serialize_none(),
            StageSelector::Stage(name) => serializer.serialize_some(name),
        }
    }
}

impl<'de> Deserialize<'de> for StageSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            Some(name) => StageSelector::Stage(name),
            None => StageSelector::AllStages,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildItem {
    pub name: String,
    #[serde(default)]
    pub stage: StageSelector,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildRequest {
    pub build_to: BuildTarget,
    pub packages: Vec<BuildItem>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("build request names no packages")]
    Empty,
    #[error("duplicate package {0} in build order")]
    DuplicatePackage(String),
}

impl BuildRequest {
    /// All stages of one package, target derived from its type.
    pub fn for_package(package: &PackageInfo) -> Self {
        Self {
            build_to: BuildTarget::for_type(package.package_type),
            packages: vec![BuildItem {
                name: package.name.clone(),
                stage: StageSelector::AllStages,
            }],
        }
    }

    /// Single stage of a package.
    pub fn for_stage(package: &PackageInfo, stage_name: &str) -> Self {
        Self {
            build_to: BuildTarget::for_type(package.package_type),
            packages: vec![BuildItem {
                name: package.name.clone(),
                stage: StageSelector::Stage(stage_name.to_string()),
            }],
        }
    }

    /// Reject requests the server would refuse anyway.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.packages.is_empty() {
            return Err(RequestError::Empty);
        }
        let mut seen = HashSet::new();
        for item in &self.packages {
            if !seen.insert(item.name.as_str()) {
                return Err(RequestError::DuplicatePackage(item.name.clone()));
            }
        }
        Ok(())
    }
}
