use form_driver::{Key, Query, Signal};
use tracing::{debug, instrument, warn};

use crate::errors::{FillError, Phase};
use crate::fillers::{key_cycle, FillContext};
use crate::model::{FieldStatus, FieldTask};
use crate::probes::Presence;

/// Open the field's option list and pick the option whose visible text is
/// exactly `value`. No fuzzy matching: a near miss is "not offered".
#[instrument(skip_all, fields(field = %task.key))]
pub async fn fill_dropdown(
    ctx: &FillContext<'_>,
    task: &FieldTask,
    value: &str,
) -> Result<FieldStatus, FillError> {
    let name = task.key.as_str().to_string();
    let Some(trigger) = ctx
        .locate(task, &Query::FieldTrigger { name: name.clone() })
        .await?
    else {
        return Ok(FieldStatus::NotFound);
    };
    ctx.press(task, Phase::Opening, &trigger).await?;

    ctx.probes
        .wait_for_element(
            &Query::OptionList,
            ctx.policy.timeouts.option_list(),
            Presence::Required,
        )
        .await
        .map_err(|err| FillError::from_probe(&task.key, Phase::OptionList, err))?;

    let driver = ctx.driver();
    let option = driver
        .find(&Query::Option {
            text: value.to_string(),
        })
        .await
        .map_err(|err| FillError::driver(&task.key, Phase::Selecting, err))?;
    let input = driver
        .find(&Query::Field { name })
        .await
        .map_err(|err| FillError::driver(&task.key, Phase::Selecting, err))?;

    match option {
        Some(option) => {
            ctx.press(task, Phase::Selecting, &option).await?;
            if let Some(input) = input {
                ctx.signals(task, Phase::Applying, &input, &[Signal::Blur])
                    .await?;
            }
            debug!(value, "option picked");
            Ok(FieldStatus::Filled)
        }
        None => {
            let dismiss_on = input.as_ref().unwrap_or(&trigger);
            ctx.signals(task, Phase::Selecting, dismiss_on, &key_cycle(Key::Escape))
                .await?;
            if task.mandatory {
                return Err(FillError::ValueNotOffered {
                    field: task.key.clone(),
                    value: value.to_string(),
                });
            }
            warn!(value, "value not offered, field left unchanged");
            Ok(FieldStatus::NotOffered)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_driver::{MemoryForm, UiContract};
    use formpilot_core_types::FieldId;

    use crate::policy::FillPolicy;

    fn form() -> MemoryForm {
        MemoryForm::builder()
            .combo("Gender", ["Мужской", "Женский"])
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn picks_exact_option() {
        let form = form();
        let policy = FillPolicy::default();
        let ui = UiContract::default();
        let ctx = FillContext::new(&form, &policy, &ui);
        let task = FieldTask::dropdown(FieldId::parse("Gender").unwrap());

        let status = fill_dropdown(&ctx, &task, "Женский").await.unwrap();

        assert_eq!(status, FieldStatus::Filled);
        assert_eq!(form.field_value("Gender").as_deref(), Some("Женский"));
        assert_eq!(form.field_signals("Gender").last(), Some(&Signal::Blur));
    }

    #[tokio::test(start_paused = true)]
    async fn near_miss_is_not_offered_and_list_is_dismissed() {
        let form = form();
        let policy = FillPolicy::default();
        let ui = UiContract::default();
        let ctx = FillContext::new(&form, &policy, &ui);
        let task = FieldTask::dropdown(FieldId::parse("Gender").unwrap());

        let status = fill_dropdown(&ctx, &task, "женский").await.unwrap();

        assert_eq!(status, FieldStatus::NotOffered);
        assert_eq!(form.field_value("Gender").as_deref(), Some(""));
        assert_eq!(
            form.field_signals("Gender"),
            key_cycle(Key::Escape).to_vec()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn mandatory_value_not_offered_is_fatal() {
        let form = form();
        let policy = FillPolicy::default();
        let ui = UiContract::default();
        let ctx = FillContext::new(&form, &policy, &ui);
        let task = FieldTask::dropdown(FieldId::parse("Gender").unwrap()).mandatory();

        let err = fill_dropdown(&ctx, &task, "Другой").await.unwrap_err();
        assert!(matches!(err, FillError::ValueNotOffered { ref value, .. } if value == "Другой"));
        assert_eq!(
            err.to_string(),
            "value 'Другой' is not offered for field Gender"
        );
    }
}
