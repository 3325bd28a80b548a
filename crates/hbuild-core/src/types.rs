use serde::{Deserialize, Serialize};

/// Kind of package registered on the build server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    Package,
    Tool,
    Source,
}

impl PackageType {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageType::Package => "package",
            PackageType::Tool => "tool",
            PackageType::Source => "source",
        }
    }
}

impl std::fmt::Display for PackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build progress of a stage. Ordered by how far the stage got.
///
/// The server only ever moves a stage forward, but the client takes every
/// snapshot at face value and never checks transitions.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    #[default]
    Unbuilt,
    Configured,
    Built,
    Installed,
}

impl BuildState {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildState::Unbuilt => "unbuilt",
            BuildState::Configured => "configured",
            BuildState::Built => "built",
            BuildState::Installed => "installed",
        }
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stage of a (tool) package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stage {
    pub stage_name: String,
    /// Lookup name on the server, `package[stage]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub package: String,
    #[serde(default)]
    pub status: BuildState,
}

impl Stage {
    pub fn lookup_name(&self) -> String {
        match &self.name {
            Some(n) => n.clone(),
            None => format!("{}[{}]", self.package, self.stage_name),
        }
    }
}

/// Package as reported by `/api/packages`, denormalized with its stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub package_type: PackageType,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BuildState>,
}

impl PackageInfo {
    /// Explicit status if the server sent one, else the furthest stage.
    pub fn aggregate_status(&self) -> BuildState {
        self.status.unwrap_or_else(|| {
            self.stages
                .iter()
                .map(|s| s.status)
                .max()
                .unwrap_or_default()
        })
    }

    pub fn find_stage(&self, stage_name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.stage_name == stage_name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageList {
    pub packages: Vec<PackageInfo>,
}

impl PackageList {
    pub fn get(&self, name: &str) -> Option<&PackageInfo> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|p| p.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }
}

/// Exit status of the last build of a package (`/api/status/{name}`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnCode {
    pub return_code: i32,
}

impl ReturnCode {
    pub fn succeeded(&self) -> bool {
        self.return_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_package_list() {
        let json = r#"{
            "packages": [
                {"name": "gcc", "type": "tool", "stages": [
                    {"stage_name": "pass1", "name": "gcc[pass1]", "package": "gcc"},
                    {"stage_name": "pass2", "name": "gcc[pass2]", "package": "gcc", "status": "built"}
                ]},
                {"name": "libfoo", "type": "source", "status": "unbuilt"},
                {"name": "bash", "type": "package"}
            ]
        }"#;
        let list: PackageList = serde_json::from_str(json).unwrap();
        assert_eq!(list.len(), 3);
        let gcc = list.get("gcc").unwrap();
        assert_eq!(gcc.package_type, PackageType::Tool);
        assert_eq!(gcc.stages[0].status, BuildState::Unbuilt);
        assert_eq!(gcc.aggregate_status(), BuildState::Built);
        assert_eq!(list.get("bash").unwrap().stages.len(), 0);
    }

    #[test]
    fn explicit_status_wins_over_stages() {
        let pkg = PackageInfo {
            name: "x".into(),
            package_type: PackageType::Tool,
            stages: vec![Stage {
                stage_name: "a".into(),
                name: None,
                package: "x".into(),
                status: BuildState::Installed,
            }],
            status: Some(BuildState::Configured),
        };
        assert_eq!(pkg.aggregate_status(), BuildState::Configured);
    }

    #[test]
    fn aggregate_defaults_to_unbuilt() {
        let pkg = PackageInfo {
            name: "x".into(),
            package_type: PackageType::Package,
            stages: vec![],
            status: None,
        };
        assert_eq!(pkg.aggregate_status(), BuildState::Unbuilt);
    }

    #[test]
    fn build_state_ordering() {
        assert!(BuildState::Unbuilt < BuildState::Configured);
        assert!(BuildState::Configured < BuildState::Built);
        assert!(BuildState::Built < BuildState::Installed);
    }

    #[test]
    fn stage_lookup_name_derived_when_missing() {
        let stage: Stage =
            serde_json::from_str(r#"{"stage_name": "pass1", "package": "gcc"}"#).unwrap();
        assert_eq!(stage.lookup_name(), "gcc[pass1]");
    }
}
