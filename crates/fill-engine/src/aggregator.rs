//! Result aggregation for one pass

use formpilot_core_types::PassId;
use tracing::debug;

use crate::errors::FillError;
use crate::model::{DisplayMessage, FieldReport, FieldStatus, FieldTask, FillOutcome, SecondaryData};

/// Accumulator threaded through the orchestrator and consumed into the
/// pass's single [`FillOutcome`].
#[derive(Debug)]
pub struct FillTally {
    all_resolved: bool,
    fields: Vec<FieldReport>,
}

impl Default for FillTally {
    fn default() -> Self {
        Self::new()
    }
}

impl FillTally {
    pub fn new() -> Self {
        Self {
            all_resolved: true,
            fields: Vec::new(),
        }
    }

    pub fn record(&mut self, task: &FieldTask, status: FieldStatus) {
        if status != FieldStatus::Filled {
            self.all_resolved = false;
        }
        debug!(field = %task.key, ?status, "field recorded");
        self.fields.push(FieldReport {
            field: task.key.clone(),
            kind: task.kind.label().to_string(),
            status,
        });
    }

    pub fn all_fields_resolved(&self) -> bool {
        self.all_resolved
    }

    pub fn fields(&self) -> &[FieldReport] {
        &self.fields
    }

    /// Outcome of a pass that worked through the whole task list.
    pub fn complete(self, pass_id: &PassId, secondary: SecondaryData) -> FillOutcome {
        FillOutcome::completed(pass_id.to_string(), self.all_resolved, self.fields, secondary)
    }

    /// Outcome of a pass stopped by its first fatal error. Secondary data is
    /// never attached to a failed pass.
    pub fn abort(self, pass_id: &PassId, error: &FillError) -> FillOutcome {
        FillOutcome::aborted(
            pass_id.to_string(),
            error.to_string(),
            error.kind(),
            self.fields,
        )
    }
}

/// Display message owed to the rendering collaborator, if any.
pub fn display_for(outcome: &FillOutcome, title: &str) -> Option<DisplayMessage> {
    if !outcome.success() {
        return None;
    }
    let secondary = outcome.secondary().filter(|secondary| !secondary.is_empty())?;
    Some(DisplayMessage {
        title: title.to_string(),
        operations: secondary.operations.clone(),
        diagnoses: secondary.diagnoses.clone(),
        summary: secondary.summary.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Phase;
    use crate::model::CodedRecord;
    use formpilot_core_types::FieldId;

    fn task(name: &str) -> FieldTask {
        FieldTask::plain(FieldId::parse(name).unwrap())
    }

    #[test]
    fn any_unresolved_field_clears_the_flag() {
        let mut tally = FillTally::new();
        tally.record(&task("Enp"), FieldStatus::Filled);
        assert!(tally.all_fields_resolved());
        tally.record(&task("CardNumber"), FieldStatus::NotFound);
        tally.record(&task("Gender"), FieldStatus::Filled);

        let outcome = tally.complete(&PassId::new(), SecondaryData::default());
        assert!(outcome.success());
        assert!(!outcome.all_fields_resolved());
        assert_eq!(outcome.fields().len(), 3);
        assert!(display_for(&outcome, "Форма заполнена").is_none());
    }

    #[test]
    fn aborted_pass_carries_error_without_secondary() {
        let mut tally = FillTally::new();
        tally.record(&task("Enp"), FieldStatus::Filled);
        let err = FillError::violation(
            &FieldId::parse("VidMpV008").unwrap(),
            Phase::Confirming,
            "confirm button 'Выбрать' not found",
        );

        let outcome = tally.abort(&PassId::new(), &err);
        assert!(!outcome.success());
        assert!(!outcome.all_fields_resolved());
        assert_eq!(outcome.error_kind(), Some("protocol_violation"));
        assert!(outcome.error().unwrap().contains("VidMpV008"));
        assert!(outcome.secondary().is_none());
        assert!(display_for(&outcome, "t").is_none());
    }

    #[test]
    fn display_message_copies_secondary_verbatim() {
        let secondary = SecondaryData {
            operations: vec![CodedRecord {
                code: "A16.18.009".into(),
                name: "Аппендэктомия".into(),
                ..CodedRecord::default()
            }],
            ..SecondaryData::default()
        };
        let outcome = FillTally::new().complete(&PassId::new(), secondary.clone());

        let message = display_for(&outcome, "Форма заполнена").unwrap();
        assert_eq!(message.title, "Форма заполнена");
        assert_eq!(message.operations, secondary.operations);
        assert!(message.diagnoses.is_empty());
    }
}
