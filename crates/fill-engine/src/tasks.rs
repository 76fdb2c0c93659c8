//! Declarative task lists
//!
//! The task list is the one place that says which fields exist, in which
//! order they are filled, how each one is filled and how patient the engine
//! should be with it.

use std::collections::BTreeSet;
use std::path::Path;

use formpilot_core_types::FieldId;
use serde::{Deserialize, Serialize};

use crate::errors::PolicyError;
use crate::model::{FieldKind, FieldTask, ProfileClass};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskList(Vec<FieldTask>);

impl TaskList {
    pub fn new(tasks: Vec<FieldTask>) -> Result<Self, PolicyError> {
        let list = Self(tasks);
        list.validate()?;
        Ok(list)
    }

    pub fn from_yaml(source: &str) -> Result<Self, PolicyError> {
        let tasks: Vec<FieldTask> =
            serde_yaml::from_str(source).map_err(|err| PolicyError::Parse(err.to_string()))?;
        Self::new(tasks)
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let source = std::fs::read_to_string(path)
            .map_err(|err| PolicyError::Parse(format!("{}: {}", path.display(), err)))?;
        Self::from_yaml(&source)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.0.is_empty() {
            return Err(PolicyError::EmptyTaskList);
        }
        let mut seen = BTreeSet::new();
        for task in &self.0 {
            if !seen.insert(&task.key) {
                return Err(PolicyError::DuplicateTask(task.key.clone()));
            }
            if let FieldKind::Reference { column } = &task.kind {
                if column.trim().is_empty() {
                    return Err(PolicyError::EmptyColumn(task.key.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldTask> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &FieldId) -> Option<&FieldTask> {
        self.0.iter().find(|task| &task.key == key)
    }

    /// Hospitalization case form. Reference fields go first because the
    /// form enables some inputs only after they are chosen.
    pub fn hospitalization_case() -> Self {
        let (fast, default, slow) = (ProfileClass::Fast, ProfileClass::Default, ProfileClass::Slow);

        let reference = |name: &'static str, column: &str, profile: ProfileClass, mandatory: bool| {
            let task = FieldTask::reference(FieldId::from_static(name), column).profile(profile);
            if mandatory {
                task.mandatory()
            } else {
                task
            }
        };
        let date = |name: &'static str| FieldTask::date(FieldId::from_static(name)).profile(fast);
        let plain = |name: &'static str| FieldTask::plain(FieldId::from_static(name)).profile(fast);

        Self(vec![
            reference("ReferralHospitalizationMedIndications", "Код", default, true),
            reference("VidMpV008", "Код", default, true),
            reference("HospitalizationInfoV006", "Код", default, true),
            reference("HospitalizationInfoV014", "Код", default, true),
            reference("HospitalizationInfoSpecializedMedicalProfile", "Код", default, false),
            reference("HospitalizationInfoSubdivision", "Краткое наименование", default, true),
            reference("HospitalizationInfoDiagnosisMainDisease", "Код МКБ", default, true),
            reference("HospitalizationInfoV020", "Код", default, true),
            reference("HospitalizationInfoC_ZABV027", "Код", default, false),
            reference("ResultV009", "Код", default, true),
            reference("IshodV012", "Код", default, true),
            reference("ReferralHospitalizationSendingDepartment", "Реестровый номер", slow, false),
            date("ReferralHospitalizationDateTicket"),
            date("DateBirth"),
            date("TreatmentDateStart"),
            date("TreatmentDateEnd"),
            plain("ReferralHospitalizationNumberTicket"),
            plain("Enp"),
            plain("Gender"),
            plain("HospitalizationInfoNameDepartment"),
            plain("HospitalizationInfoOfficeCode"),
            plain("CardNumber"),
        ])
    }
}

impl Default for TaskList {
    fn default() -> Self {
        Self::hospitalization_case()
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a FieldTask;
    type IntoIter = std::slice::Iter<'a, FieldTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_list_is_valid_and_ordered() {
        let list = TaskList::hospitalization_case();
        list.validate().unwrap();
        assert_eq!(list.len(), 22);

        let kinds: Vec<&str> = list.iter().map(|task| task.kind.label()).collect();
        let first_date = kinds.iter().position(|k| *k == "date").unwrap();
        let first_plain = kinds.iter().position(|k| *k == "plain").unwrap();
        assert!(kinds[..first_date].iter().all(|k| *k == "reference"));
        assert!(first_date < first_plain);

        let sending = list
            .get(&FieldId::parse("ReferralHospitalizationSendingDepartment").unwrap())
            .unwrap();
        assert_eq!(sending.profile, ProfileClass::Slow);
        assert!(!sending.mandatory);
        assert!(list
            .iter()
            .filter(|task| task.key != sending.key)
            .filter(|task| task.kind.label() == "reference")
            .all(|task| task.profile == ProfileClass::Default));
    }

    #[test]
    fn yaml_lists_are_validated() {
        let list = TaskList::from_yaml(
            "- key: \"input[name='Enp']\"\n  kind: plain\n- key: Gender\n  kind: dropdown\n  mandatory: true\n",
        )
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().next().unwrap().key.as_str(), "Enp");

        let err = TaskList::from_yaml("- key: Enp\n  kind: plain\n- key: Enp\n  kind: date\n")
            .unwrap_err();
        assert!(matches!(err, PolicyError::DuplicateTask(_)));

        let err = TaskList::from_yaml("[]").unwrap_err();
        assert_eq!(err, PolicyError::EmptyTaskList);

        let err = TaskList::from_yaml("- key: VidMpV008\n  kind: reference\n  column: \" \"\n")
            .unwrap_err();
        assert!(matches!(err, PolicyError::EmptyColumn(_)));
    }
}
