use std::collections::BTreeMap;
use std::time::Duration;

use formpilot_core_types::FieldId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{PolicyError, RequestError};

/// Static latency class of a field, resolved to a [`WaitProfile`] by policy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileClass {
    Fast,
    #[default]
    Default,
    Slow,
}

impl ProfileClass {
    pub fn name(self) -> &'static str {
        match self {
            ProfileClass::Fast => "fast",
            ProfileClass::Default => "default",
            ProfileClass::Slow => "slow",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Plain,
    Date,
    Dropdown,
    /// Value picked from a modal grid filtered by the column titled `column`
    Reference { column: String },
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Plain => "plain",
            FieldKind::Date => "date",
            FieldKind::Dropdown => "dropdown",
            FieldKind::Reference { .. } => "reference",
        }
    }
}

/// One logical form field and how to fill it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldTask {
    pub key: FieldId,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub profile: ProfileClass,
    /// Failures of a mandatory field abort the pass
    #[serde(default)]
    pub mandatory: bool,
}

impl FieldTask {
    pub fn plain(key: FieldId) -> Self {
        Self::new(key, FieldKind::Plain)
    }

    pub fn date(key: FieldId) -> Self {
        Self::new(key, FieldKind::Date)
    }

    pub fn dropdown(key: FieldId) -> Self {
        Self::new(key, FieldKind::Dropdown)
    }

    pub fn reference(key: FieldId, column: impl Into<String>) -> Self {
        Self::new(
            key,
            FieldKind::Reference {
                column: column.into(),
            },
        )
    }

    fn new(key: FieldId, kind: FieldKind) -> Self {
        Self {
            key,
            kind,
            profile: ProfileClass::Default,
            mandatory: false,
        }
    }

    pub fn profile(mut self, profile: ProfileClass) -> Self {
        self.profile = profile;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

/// How long to wait for a UI condition and how long it must hold still.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WaitProfile {
    pub timeout_ms: u64,
    pub stable_delay_ms: u64,
}

impl WaitProfile {
    pub fn new(timeout: Duration, stable_delay: Duration) -> Result<Self, PolicyError> {
        let profile = Self {
            timeout_ms: timeout.as_millis() as u64,
            stable_delay_ms: stable_delay.as_millis() as u64,
        };
        profile.validate("custom")?;
        Ok(profile)
    }

    pub fn validate(&self, name: &str) -> Result<(), PolicyError> {
        if self.stable_delay_ms >= self.timeout_ms {
            return Err(PolicyError::InvalidProfile {
                name: name.to_string(),
                timeout_ms: self.timeout_ms,
                stable_delay_ms: self.stable_delay_ms,
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn stable_delay(&self) -> Duration {
        Duration::from_millis(self.stable_delay_ms)
    }
}

/// Code and name pair; scalar codes are kept as their JSON text and any
/// other keys are carried along untouched.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CodedRecord {
    #[serde(default, deserialize_with = "scalar_text")]
    pub code: String,
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn scalar_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

/// Free-form record of named sub-fields rendered verbatim.
pub type SummaryRecord = BTreeMap<String, Value>;

/// Pass-through data for the rendering collaborator; never interpreted here.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SecondaryData {
    #[serde(default)]
    pub operations: Vec<CodedRecord>,
    #[serde(default)]
    pub diagnoses: Vec<CodedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryRecord>,
}

impl SecondaryData {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
            && self.diagnoses.is_empty()
            && self
                .summary
                .as_ref()
                .map_or(true, |summary| summary.values().all(Value::is_null))
    }
}

/// Values to enter for one pass, keyed by field.
///
/// Absent keys are skipped; an empty string is still entered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawFillRequest")]
pub struct FillRequest {
    values: BTreeMap<FieldId, String>,
    secondary: SecondaryData,
}

#[derive(Deserialize)]
struct RawFillRequest {
    #[serde(default)]
    operations: Option<Vec<CodedRecord>>,
    #[serde(default)]
    diagnoses: Option<Vec<CodedRecord>>,
    #[serde(default)]
    summary: Option<SummaryRecord>,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl TryFrom<RawFillRequest> for FillRequest {
    type Error = RequestError;

    fn try_from(raw: RawFillRequest) -> Result<Self, Self::Error> {
        let mut values = BTreeMap::new();
        for (key, value) in raw.fields {
            let text = match value {
                Value::Null => continue,
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(RequestError::UnsupportedValue(key))
                }
            };
            let id = FieldId::parse(&key).map_err(|source| RequestError::InvalidKey {
                key: key.clone(),
                source,
            })?;
            if values.insert(id.clone(), text).is_some() {
                return Err(RequestError::DuplicateKey(id));
            }
        }
        Ok(Self {
            values,
            secondary: SecondaryData {
                operations: raw.operations.unwrap_or_default(),
                diagnoses: raw.diagnoses.unwrap_or_default(),
                summary: raw.summary,
            },
        })
    }
}

impl FillRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(payload: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn with_value(mut self, key: FieldId, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn with_secondary(mut self, secondary: SecondaryData) -> Self {
        self.secondary = secondary;
        self
    }

    pub fn value(&self, key: &FieldId) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldId> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn secondary(&self) -> &SecondaryData {
        &self.secondary
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Filled,
    NotFound,
    NotOffered,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldReport {
    pub field: FieldId,
    pub kind: String,
    pub status: FieldStatus,
}

/// Single report of one pass. Built once by the aggregator and never
/// mutated afterwards.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FillOutcome {
    pass_id: String,
    success: bool,
    all_fields_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<String>,
    #[serde(default)]
    fields: Vec<FieldReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secondary: Option<SecondaryData>,
}

impl FillOutcome {
    pub(crate) fn completed(
        pass_id: String,
        all_fields_resolved: bool,
        fields: Vec<FieldReport>,
        secondary: SecondaryData,
    ) -> Self {
        Self {
            pass_id,
            success: true,
            all_fields_resolved,
            error: None,
            error_kind: None,
            fields,
            secondary: Some(secondary),
        }
    }

    pub(crate) fn aborted(
        pass_id: String,
        error: String,
        error_kind: &str,
        fields: Vec<FieldReport>,
    ) -> Self {
        Self {
            pass_id,
            success: false,
            all_fields_resolved: false,
            error: Some(error),
            error_kind: Some(error_kind.to_string()),
            fields,
            secondary: None,
        }
    }

    pub fn pass_id(&self) -> &str {
        &self.pass_id
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn all_fields_resolved(&self) -> bool {
        self.all_fields_resolved
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn error_kind(&self) -> Option<&str> {
        self.error_kind.as_deref()
    }

    pub fn fields(&self) -> &[FieldReport] {
        &self.fields
    }

    pub fn secondary(&self) -> Option<&SecondaryData> {
        self.secondary.as_ref()
    }
}

/// Second message of a successful pass with secondary data to show.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub title: String,
    pub operations: Vec<CodedRecord>,
    pub diagnoses: Vec<CodedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryRecord>,
}
