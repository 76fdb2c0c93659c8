use tracing::instrument;

use crate::errors::FillError;
use crate::fillers::{fill_text, FillContext};
use crate::model::{FieldStatus, FieldTask};

/// Set the value and notify input, change and blur, as typing would.
#[instrument(skip_all, fields(field = %task.key))]
pub async fn fill_plain(
    ctx: &FillContext<'_>,
    task: &FieldTask,
    value: &str,
) -> Result<FieldStatus, FillError> {
    fill_text(ctx, task, value, &[]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_driver::{MemoryForm, Signal, UiContract};
    use formpilot_core_types::FieldId;

    use crate::policy::FillPolicy;

    #[tokio::test(start_paused = true)]
    async fn notifies_in_typing_order() {
        let form = MemoryForm::builder().input("Enp").build();
        let policy = FillPolicy::default();
        let ui = UiContract::default();
        let ctx = FillContext::new(&form, &policy, &ui);
        let task = FieldTask::plain(FieldId::parse("Enp").unwrap());

        let status = fill_plain(&ctx, &task, "7751234567890123").await.unwrap();

        assert_eq!(status, FieldStatus::Filled);
        assert_eq!(form.field_value("Enp").as_deref(), Some("7751234567890123"));
        assert_eq!(
            form.field_signals("Enp"),
            vec![Signal::Input, Signal::Change, Signal::Blur]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_optional_input_is_not_fatal() {
        let form = MemoryForm::builder().build();
        let policy = FillPolicy::default();
        let ui = UiContract::default();
        let ctx = FillContext::new(&form, &policy, &ui);
        let task = FieldTask::plain(FieldId::parse("CardNumber").unwrap());

        let status = fill_plain(&ctx, &task, "").await.unwrap();
        assert_eq!(status, FieldStatus::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_mandatory_input_is_fatal() {
        let form = MemoryForm::builder().build();
        let policy = FillPolicy::default();
        let ui = UiContract::default();
        let ctx = FillContext::new(&form, &policy, &ui);
        let task = FieldTask::plain(FieldId::parse("CardNumber").unwrap()).mandatory();

        let err = fill_plain(&ctx, &task, "1").await.unwrap_err();
        assert!(matches!(err, FillError::NotFound { .. }));
    }
}
