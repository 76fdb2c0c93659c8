use form_driver::Key;
use tracing::instrument;

use crate::errors::FillError;
use crate::fillers::{fill_text, key_cycle, FillContext};
use crate::model::{FieldStatus, FieldTask};

/// Like a plain fill, with a Tab key cycle before blur so the date widget
/// parses and normalizes the typed text.
#[instrument(skip_all, fields(field = %task.key))]
pub async fn fill_date(
    ctx: &FillContext<'_>,
    task: &FieldTask,
    value: &str,
) -> Result<FieldStatus, FillError> {
    fill_text(ctx, task, value, &key_cycle(Key::Tab)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_driver::{MemoryForm, Signal, UiContract};
    use formpilot_core_types::FieldId;

    use crate::policy::FillPolicy;

    #[tokio::test(start_paused = true)]
    async fn tab_cycle_precedes_blur() {
        let form = MemoryForm::builder().input("DateBirth").build();
        let policy = FillPolicy::default();
        let ui = UiContract::default();
        let ctx = FillContext::new(&form, &policy, &ui);
        let task = FieldTask::date(FieldId::parse("DateBirth").unwrap());

        fill_date(&ctx, &task, "01.02.1980").await.unwrap();

        assert_eq!(form.field_value("DateBirth").as_deref(), Some("01.02.1980"));
        assert_eq!(
            form.field_signals("DateBirth"),
            vec![
                Signal::Input,
                Signal::Change,
                Signal::KeyDown(Key::Tab),
                Signal::KeyPress(Key::Tab),
                Signal::KeyUp(Key::Tab),
                Signal::Blur,
            ]
        );
    }
}
