use std::collections::BTreeMap;
use std::time::Duration;

use formpilot_core_types::FieldId;
use serde::{Deserialize, Serialize};

use crate::errors::PolicyError;
use crate::model::{FieldTask, ProfileClass, WaitProfile};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillPolicy {
    pub profiles: WaitProfiles,
    /// Per-field profile class replacing the task list's classification
    pub overrides: BTreeMap<FieldId, ProfileClass>,
    pub timeouts: ProbeTimeouts,
    /// Wait for the picked row to show as selected before confirming
    pub await_row_selection: bool,
    /// Title of the message that carries secondary data
    pub display_title: String,
}

impl Default for FillPolicy {
    fn default() -> Self {
        Self {
            profiles: WaitProfiles::default(),
            overrides: BTreeMap::new(),
            timeouts: ProbeTimeouts::default(),
            await_row_selection: false,
            display_title: "Форма заполнена".to_string(),
        }
    }
}

impl FillPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.profiles.fast.validate(ProfileClass::Fast.name())?;
        self.profiles.default.validate(ProfileClass::Default.name())?;
        self.profiles.slow.validate(ProfileClass::Slow.name())?;
        if self.timeouts.poll_interval_ms == 0 || self.timeouts.modal_poll_interval_ms == 0 {
            return Err(PolicyError::ZeroPollInterval);
        }
        Ok(())
    }

    pub fn class_for(&self, task: &FieldTask) -> ProfileClass {
        self.overrides
            .get(&task.key)
            .copied()
            .unwrap_or(task.profile)
    }

    pub fn profile_for(&self, task: &FieldTask) -> WaitProfile {
        self.profiles.get(self.class_for(task))
    }

    pub fn is_overridden(&self, key: &FieldId) -> bool {
        self.overrides.contains_key(key)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitProfiles {
    pub fast: WaitProfile,
    pub default: WaitProfile,
    pub slow: WaitProfile,
}

impl WaitProfiles {
    pub fn get(&self, class: ProfileClass) -> WaitProfile {
        match class {
            ProfileClass::Fast => self.fast,
            ProfileClass::Default => self.default,
            ProfileClass::Slow => self.slow,
        }
    }
}

impl Default for WaitProfiles {
    fn default() -> Self {
        Self {
            fast: WaitProfile {
                timeout_ms: 5_000,
                stable_delay_ms: 800,
            },
            default: WaitProfile {
                timeout_ms: 10_000,
                stable_delay_ms: 1_500,
            },
            slow: WaitProfile {
                timeout_ms: 20_000,
                stable_delay_ms: 2_500,
            },
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeTimeouts {
    /// Lookup of elements a step cannot continue without
    pub element_ms: u64,
    /// Lookup of plain and date inputs, which are skipped when missing
    pub element_lookup_ms: u64,
    pub mask_ms: u64,
    pub modal_ms: u64,
    pub option_list_ms: u64,
    pub row_selected_ms: u64,
    pub poll_interval_ms: u64,
    pub modal_poll_interval_ms: u64,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            element_ms: 5_000,
            element_lookup_ms: 500,
            mask_ms: 5_000,
            modal_ms: 5_000,
            option_list_ms: 3_000,
            row_selected_ms: 2_000,
            poll_interval_ms: 100,
            modal_poll_interval_ms: 200,
        }
    }
}

impl ProbeTimeouts {
    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    pub fn element_lookup(&self) -> Duration {
        Duration::from_millis(self.element_lookup_ms)
    }

    pub fn mask(&self) -> Duration {
        Duration::from_millis(self.mask_ms)
    }

    pub fn modal(&self) -> Duration {
        Duration::from_millis(self.modal_ms)
    }

    pub fn option_list(&self) -> Duration {
        Duration::from_millis(self.option_list_ms)
    }

    pub fn row_selected(&self) -> Duration {
        Duration::from_millis(self.row_selected_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn modal_poll_interval(&self) -> Duration {
        Duration::from_millis(self.modal_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        FillPolicy::default().validate().unwrap();
    }

    #[test]
    fn overrides_replace_task_class() {
        let mut policy = FillPolicy::default();
        let task = FieldTask::reference(FieldId::parse("VidMpV008").unwrap(), "Код");
        assert_eq!(policy.profile_for(&task).timeout_ms, 10_000);

        policy
            .overrides
            .insert(FieldId::parse("VidMpV008").unwrap(), ProfileClass::Slow);
        assert_eq!(policy.profile_for(&task).timeout_ms, 20_000);
        assert!(policy.is_overridden(&task.key));
    }

    #[test]
    fn override_keys_accept_selector_spelling() {
        let policy: FillPolicy = serde_yaml::from_str(
            "overrides:\n  \"input[name='IshodV012']\": slow\n  Enp: fast\n",
        )
        .unwrap();
        let ishod = FieldTask::reference(FieldId::parse("IshodV012").unwrap(), "Код");
        assert_eq!(policy.class_for(&ishod), ProfileClass::Slow);
        assert!(policy.is_overridden(&FieldId::parse("input[name='Enp']").unwrap()));

        assert!(serde_yaml::from_str::<FillPolicy>("overrides:\n  \" \": slow\n").is_err());
    }

    #[test]
    fn invalid_profile_in_yaml_is_rejected_by_validate() {
        let policy: FillPolicy =
            serde_yaml::from_str("profiles:\n  fast:\n    timeout_ms: 500\n    stable_delay_ms: 900\n")
                .unwrap();
        assert_eq!(policy.profiles.default.timeout_ms, 10_000);
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("fast"));
    }
}
