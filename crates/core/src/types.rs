//! Data model shared by the scan engine and the remote API clients.

use serde::{Deserialize, Deserializer, Serialize};

/// One managed workload as reported by the orchestration panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(rename = "Id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suspended: bool,
}

impl Instance {
    pub fn new(id: impl Into<String>, suspended: bool) -> Self {
        Self {
            id: id.into(),
            suspended,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Treat an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Classification label the remote filesystem assigns to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilePurpose {
    Script,
    Binary,
    #[default]
    #[serde(other)]
    Other,
}

/// A single directory entry returned by the remote filesystem listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extension: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub purpose: FilePurpose,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_directory: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_editable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: String,
}

impl FileEntry {
    /// Plain, non-editable file with the given size string.
    pub fn file(name: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: String::new(),
            purpose: FilePurpose::Other,
            is_directory: false,
            is_editable: false,
            size: size.into(),
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            is_directory: true,
            ..Self::file(name, "")
        }
    }

    pub fn with_purpose(mut self, purpose: FilePurpose) -> Self {
        self.purpose = purpose;
        self
    }

    pub fn editable(mut self) -> Self {
        self.is_editable = true;
        self
    }

    /// Editable directories are never expanded.
    pub fn should_descend(&self) -> bool {
        self.is_directory && !self.is_editable
    }
}

/// Abuse heuristics, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    SuspiciousScript,
    MoneroMiner,
    UndersizedServerJar,
}

impl Rule {
    pub const ALL: [Rule; 3] = [
        Rule::SuspiciousScript,
        Rule::MoneroMiner,
        Rule::UndersizedServerJar,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Rule::SuspiciousScript => "suspicious_script",
            Rule::MoneroMiner => "monero_miner",
            Rule::UndersizedServerJar => "undersized_server_jar",
        }
    }

    /// Human-readable reason sent with the alert.
    pub fn reason(&self) -> &'static str {
        match self {
            Rule::SuspiciousScript => "Detected a suspicious .sh File",
            Rule::MoneroMiner => {
                "Detected unauthorized activity: Mining Monero (XMR), which is not permitted."
            }
            Rule::UndersizedServerJar => "Detected a suspicious server.jar file",
        }
    }
}

/// A positive classification tied to the instance and path it was found at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub instance_id: String,
    pub path: String,
    pub rule: Rule,
}

impl Detection {
    pub fn new(instance_id: impl Into<String>, path: impl Into<String>, rule: Rule) -> Self {
        Self {
            instance_id: instance_id.into(),
            path: path.into(),
            rule,
        }
    }

    pub fn reason(&self) -> &'static str {
        self.rule.reason()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instance_string_id() {
        let instance: Instance =
            serde_json::from_value(json!({"Id": "abc-123", "suspended": true})).unwrap();
        assert_eq!(instance, Instance::new("abc-123", true));
    }

    #[test]
    fn test_instance_numeric_id_and_missing_suspended() {
        let instance: Instance = serde_json::from_value(json!({"Id": 42, "Name": "x"})).unwrap();
        assert_eq!(instance.id, "42");
        assert!(!instance.suspended);
    }

    #[test]
    fn test_file_entry_camel_case() {
        let entry: FileEntry = serde_json::from_value(json!({
            "name": "start.sh",
            "extension": ".sh",
            "purpose": "script",
            "isDirectory": false,
            "isEditable": true,
            "size": "1KB"
        }))
        .unwrap();

        assert_eq!(entry.purpose, FilePurpose::Script);
        assert!(entry.is_editable);
        assert!(!entry.is_directory);
        assert_eq!(entry.size, "1KB");
    }

    #[test]
    fn test_unknown_purpose_maps_to_other() {
        let entry: FileEntry =
            serde_json::from_value(json!({"name": "notes.txt", "purpose": "text"})).unwrap();
        assert_eq!(entry.purpose, FilePurpose::Other);
        assert_eq!(entry.size, "");
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        let entry: FileEntry = serde_json::from_value(json!({
            "name": "plugins",
            "extension": null,
            "purpose": null,
            "isDirectory": true,
            "isEditable": null,
            "size": null
        }))
        .unwrap();

        assert_eq!(entry, FileEntry::directory("plugins"));
        assert!(entry.should_descend());

        let instance: Instance =
            serde_json::from_value(json!({"Id": "abc", "suspended": null})).unwrap();
        assert_eq!(instance, Instance::new("abc", false));

        assert!(serde_json::from_value::<FileEntry>(json!({"name": null})).is_err());
    }

    #[test]
    fn test_should_descend() {
        assert!(FileEntry::directory("world").should_descend());
        assert!(!FileEntry::directory("plugins").editable().should_descend());
        assert!(!FileEntry::file("server.jar", "40MB").should_descend());
    }

    #[test]
    fn test_rule_reasons_are_distinct() {
        let reasons: std::collections::HashSet<_> =
            Rule::ALL.iter().map(|r| r.reason()).collect();
        assert_eq!(reasons.len(), Rule::ALL.len());
    }
}
