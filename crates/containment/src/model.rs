use crate::error::Result;
use fixcheck_editscript::EditScript;
use fixcheck_signature::Signature;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Effect of one commit on a construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Add,
    Mod,
    Del,
}

/// Net effect of all commits on one repository path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallChangeType {
    Add,
    Mod,
    Del,
    /// Added and deleted again while the fix was developed
    Nul,
}

impl fmt::Display for OverallChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "ADD",
            Self::Mod => "MOD",
            Self::Del => "DEL",
            Self::Nul => "NUL",
        })
    }
}

/// Kind of program element a construct id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConstructKind {
    Pack,
    Clas,
    Intf,
    Enum,
    Meth,
    Cons,
    Init,
}

/// Uniquely addressable program element.
///
/// Java qualified names spell nested classes with `$`, e.g.
/// `org.acme.Outer$Inner.run(int)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstructId {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(rename = "type")]
    pub kind: ConstructKind,
    pub qname: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
}

fn default_lang() -> String {
    "JAVA".to_string()
}

impl ConstructId {
    pub fn java(kind: ConstructKind, qname: impl Into<String>) -> Self {
        Self {
            lang: default_lang(),
            kind,
            qname: qname.into(),
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Qualified name without the parameter list
    fn qualified_member(&self) -> &str {
        self.qname
            .split_once('(')
            .map_or(self.qname.as_str(), |(name, _)| name)
    }

    /// Name of the element itself, e.g. `parse` for `org.acme.Parser.parse(String)`
    pub fn simple_name(&self) -> &str {
        let member = self.qualified_member();
        member
            .rsplit(|c: char| c == '.' || c == '$')
            .next()
            .unwrap_or(member)
    }

    /// Qualified name of the class declaring this construct
    pub fn definition_context(&self) -> &str {
        let member = self.qualified_member();
        match self.kind {
            ConstructKind::Meth | ConstructKind::Init => {
                member.rsplit_once('.').map_or(member, |(class, _)| class)
            }
            _ => member,
        }
    }

    /// Whether the declaring class is nested in another class
    pub fn is_nested_class_member(&self) -> bool {
        match self.kind {
            ConstructKind::Pack => false,
            _ => self.definition_context().contains('$'),
        }
    }

    /// Test method by name or annotation
    pub fn is_test_method(&self) -> bool {
        if self.kind != ConstructKind::Meth {
            return false;
        }
        self.simple_name().starts_with("test")
            || self
                .annotations
                .iter()
                .any(|a| a.trim_start_matches('@').rsplit('.').next() == Some("Test"))
    }
}

impl fmt::Display for ConstructId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.kind, self.qname)
    }
}

/// One commit's effect on one construct.
///
/// Changes are ordered by commit time, then construct name, then commit id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructChange {
    pub repo: String,
    pub commit: String,
    #[serde(default)]
    pub repo_path: Option<String>,
    pub construct_id: ConstructId,
    /// Milliseconds since the Unix epoch
    pub committed_at: i64,
    #[serde(alias = "changeType")]
    pub construct_change_type: ChangeType,
    #[serde(
        default,
        deserialize_with = "snapshot_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub buggy_body: Option<String>,
    #[serde(
        default,
        deserialize_with = "snapshot_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub fixed_body: Option<String>,
    /// Persisted edit script of this single commit
    #[serde(
        default,
        deserialize_with = "snapshot_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub body_change: Option<String>,
}

/// Accept snapshots embedded either as JSON text or as JSON objects
fn snapshot_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

impl ConstructChange {
    pub fn new(
        repo: impl Into<String>,
        commit: impl Into<String>,
        repo_path: impl Into<String>,
        construct_id: ConstructId,
        committed_at: i64,
        change_type: ChangeType,
    ) -> Self {
        Self {
            repo: repo.into(),
            commit: commit.into(),
            repo_path: Some(repo_path.into()),
            construct_id,
            committed_at,
            construct_change_type: change_type,
            buggy_body: None,
            fixed_body: None,
            body_change: None,
        }
    }

    #[must_use]
    pub fn with_bodies(mut self, buggy: Option<String>, fixed: Option<String>) -> Self {
        self.buggy_body = buggy;
        self.fixed_body = fixed;
        self
    }

    #[must_use]
    pub fn with_body_change(mut self, body_change: impl Into<String>) -> Self {
        self.body_change = Some(body_change.into());
        self
    }

    /// Repository path, or an empty string when the record carries none
    pub fn path(&self) -> &str {
        self.repo_path.as_deref().unwrap_or_default()
    }

    /// Freshly decoded snapshot before the commit
    pub fn buggy_signature(&self) -> Result<Option<Signature>> {
        decode_snapshot(self.buggy_body.as_deref())
    }

    /// Freshly decoded snapshot after the commit
    pub fn fixed_signature(&self) -> Result<Option<Signature>> {
        decode_snapshot(self.fixed_body.as_deref())
    }

    pub fn body_change_script(&self) -> Result<Option<EditScript>> {
        self.body_change
            .as_deref()
            .map(EditScript::from_json)
            .transpose()
            .map_err(Into::into)
    }

    fn sort_key(&self) -> (i64, &str, &str, &str) {
        (
            self.committed_at,
            self.construct_id.qname.as_str(),
            self.commit.as_str(),
            self.path(),
        )
    }
}

fn decode_snapshot(text: Option<&str>) -> Result<Option<Signature>> {
    text.map(Signature::from_json)
        .transpose()
        .map_err(Into::into)
}

impl PartialEq for ConstructChange {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for ConstructChange {}

impl PartialOrd for ConstructChange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConstructChange {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}
