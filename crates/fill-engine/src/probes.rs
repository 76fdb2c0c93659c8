//! Readiness probes
//!
//! Every probe samples the driver, suspends on `tokio::time::sleep` between
//! samples and gives up against a monotonic deadline. Comparisons against
//! the deadline and the settle window are strict: a condition that holds for
//! exactly `stable_delay` is not yet settled.

use std::future::Future;
use std::time::Duration;

use form_driver::{DriverError, ElementRef, FormDriver, Query};
use formpilot_core_types::FieldId;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::errors::ProbeError;
use crate::model::WaitProfile;
use crate::policy::ProbeTimeouts;

/// What a missing element means to the caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Presence {
    /// Absence at the deadline is a timeout
    Required,
    /// Absence at the deadline resolves to `None`
    BestEffort,
}

fn waited(start: Instant) -> u64 {
    Instant::now().saturating_duration_since(start).as_millis() as u64
}

/// Poll `check` until it yields a value or `timeout` has strictly elapsed.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<T, ProbeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ProbeError>>,
{
    let start = Instant::now();
    loop {
        if let Some(value) = check().await? {
            return Ok(value);
        }
        if Instant::now().saturating_duration_since(start) > timeout {
            return Err(ProbeError::Timeout {
                what: what.to_string(),
                waited_ms: waited(start),
            });
        }
        sleep(interval).await;
    }
}

/// Debounced wait on a sampled signal.
///
/// The first sample always counts as a change, and every change (including
/// a transient drop to zero while a list reloads) restarts the stability
/// window. Resolves with the value once an unchanged sample arrives more
/// than `stable_delay` after the last change.
pub async fn settle<T, F, Fut>(
    what: &str,
    profile: WaitProfile,
    interval: Duration,
    mut sample: F,
) -> Result<T, ProbeError>
where
    T: PartialEq + std::fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProbeError>>,
{
    let start = Instant::now();
    let mut stable_since = start;
    let mut last: Option<T> = None;
    loop {
        let value = sample().await?;
        let now = Instant::now();
        if last.as_ref() != Some(&value) {
            trace!(?value, "{} changed", what);
            last = Some(value);
            stable_since = now;
        } else if now.saturating_duration_since(stable_since) > profile.stable_delay() {
            debug!(?value, waited_ms = waited(start), "{} settled", what);
            return Ok(value);
        }
        if now.saturating_duration_since(start) > profile.timeout() {
            return Err(ProbeError::Timeout {
                what: format!("{} to settle (last {:?})", what, last),
                waited_ms: waited(start),
            });
        }
        sleep(interval).await;
    }
}

/// Probes bound to one driver and one set of timeouts.
#[derive(Clone, Copy)]
pub struct Probes<'a> {
    driver: &'a dyn FormDriver,
    timeouts: &'a ProbeTimeouts,
}

impl<'a> Probes<'a> {
    pub fn new(driver: &'a dyn FormDriver, timeouts: &'a ProbeTimeouts) -> Self {
        Self { driver, timeouts }
    }

    pub fn driver(&self) -> &'a dyn FormDriver {
        self.driver
    }

    pub fn timeouts(&self) -> &'a ProbeTimeouts {
        self.timeouts
    }

    pub async fn wait_for_element(
        &self,
        query: &Query,
        timeout: Duration,
        presence: Presence,
    ) -> Result<Option<ElementRef>, ProbeError> {
        let driver = self.driver;
        let found = poll_until(
            &query.to_string(),
            timeout,
            self.timeouts.poll_interval(),
            || async move { driver.find(query).await.map_err(ProbeError::from) },
        )
        .await;
        match (found, presence) {
            (Ok(element), _) => Ok(Some(element)),
            (Err(ProbeError::Timeout { .. }), Presence::BestEffort) => {
                debug!(%query, "element absent, continuing");
                Ok(None)
            }
            (Err(err), _) => Err(err),
        }
    }

    pub async fn wait_for_mask_gone(&self, timeout: Duration) -> Result<(), ProbeError> {
        let driver = self.driver;
        poll_until(
            "loading mask to clear",
            timeout,
            self.timeouts.poll_interval(),
            || async move {
                let masks = driver.count(&Query::LoadMask).await?;
                Ok::<_, ProbeError>((masks == 0).then_some(()))
            },
        )
        .await
    }

    pub async fn wait_for_list_settled(&self, profile: WaitProfile) -> Result<usize, ProbeError> {
        let driver = self.driver;
        settle(
            "grid rows",
            profile,
            self.timeouts.poll_interval(),
            || async move { driver.count(&Query::GridRows).await.map_err(ProbeError::from) },
        )
        .await
    }

    /// Wait until a modal whose text contains `title` is open (or closed).
    pub async fn wait_for_modal(
        &self,
        title: &str,
        open: bool,
        timeout: Duration,
    ) -> Result<Option<ElementRef>, ProbeError> {
        let driver = self.driver;
        let query = Query::Modal {
            title: title.to_string(),
        };
        let what = if open {
            format!("{} to open", query)
        } else {
            format!("{} to close", query)
        };
        let query = &query;
        poll_until(
            &what,
            timeout,
            self.timeouts.modal_poll_interval(),
            || async move {
                let modal = driver.find(query).await?;
                Ok::<_, ProbeError>((modal.is_some() == open).then_some(modal))
            },
        )
        .await
    }

    pub async fn wait_for_row_selected(
        &self,
        row: &ElementRef,
        timeout: Duration,
    ) -> Result<(), ProbeError> {
        let driver = self.driver;
        poll_until(
            "row selection",
            timeout,
            self.timeouts.poll_interval(),
            || async move {
                let state = driver.state(row).await?;
                Ok::<_, ProbeError>(state.selected.then_some(()))
            },
        )
        .await
    }
}

/// Single-shot check that the page currently shows the target form.
pub async fn detect_form(driver: &dyn FormDriver, marker: &FieldId) -> Result<bool, DriverError> {
    let found = driver
        .find(&Query::Field {
            name: marker.as_str().to_string(),
        })
        .await?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use form_driver::{ElementState, MemoryForm, Signal};
    use parking_lot::Mutex;

    /// Driver whose grid row count follows a script, one entry per sample.
    struct ScriptedRows {
        counts: Vec<usize>,
        samples: Mutex<Vec<(u64, usize)>>,
        start: Instant,
    }

    impl ScriptedRows {
        fn new(counts: Vec<usize>) -> Self {
            Self {
                counts,
                samples: Mutex::new(Vec::new()),
                start: Instant::now(),
            }
        }
    }

    #[async_trait]
    impl FormDriver for ScriptedRows {
        async fn find(&self, _query: &Query) -> Result<Option<ElementRef>, DriverError> {
            Ok(None)
        }

        async fn count(&self, _query: &Query) -> Result<usize, DriverError> {
            let mut samples = self.samples.lock();
            let index = samples.len();
            let count = self
                .counts
                .get(index)
                .or(self.counts.last())
                .copied()
                .unwrap_or_default();
            let at = Instant::now().duration_since(self.start).as_millis() as u64;
            samples.push((at, count));
            Ok(count)
        }

        async fn state(&self, _element: &ElementRef) -> Result<ElementState, DriverError> {
            Ok(ElementState::default())
        }

        async fn set_value(&self, _element: &ElementRef, _value: &str) -> Result<(), DriverError> {
            Ok(())
        }

        async fn dispatch(&self, _element: &ElementRef, _signal: Signal) -> Result<(), DriverError> {
            Ok(())
        }
    }

    fn profile(timeout_ms: u64, stable_delay_ms: u64) -> WaitProfile {
        WaitProfile {
            timeout_ms,
            stable_delay_ms,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn list_settles_after_third_consecutive_value() {
        let driver = ScriptedRows::new(vec![0, 0, 3, 3, 3, 5, 5, 5, 5, 5]);
        let timeouts = ProbeTimeouts::default();
        let probes = Probes::new(&driver, &timeouts);

        let count = probes.wait_for_list_settled(profile(1000, 200)).await.unwrap();

        assert_eq!(count, 5);
        let samples = driver.samples.lock().clone();
        let (at, value) = *samples.last().unwrap();
        assert_eq!(value, 5);
        assert_eq!(at, 800);
        assert_eq!(samples.iter().filter(|(_, v)| *v == 5).count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn list_that_keeps_changing_times_out() {
        let driver = ScriptedRows::new((1..=20).collect());
        let timeouts = ProbeTimeouts::default();
        let probes = Probes::new(&driver, &timeouts);

        let err = probes
            .wait_for_list_settled(profile(1000, 200))
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::Timeout { waited_ms, .. } if waited_ms > 1000));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_zero_restarts_the_window() {
        let driver = ScriptedRows::new(vec![4, 4, 0, 4, 4, 4, 4]);
        let timeouts = ProbeTimeouts::default();
        let probes = Probes::new(&driver, &timeouts);

        let count = probes.wait_for_list_settled(profile(5000, 200)).await.unwrap();

        assert_eq!(count, 4);
        let (at, _) = *driver.samples.lock().last().unwrap();
        assert_eq!(at, 600);
    }

    #[tokio::test(start_paused = true)]
    async fn best_effort_lookup_resolves_absent() {
        let form = MemoryForm::builder().input("Enp").build();
        let timeouts = ProbeTimeouts::default();
        let probes = Probes::new(&form, &timeouts);
        let missing = Query::Field {
            name: "CardNumber".into(),
        };

        let found = probes
            .wait_for_element(&missing, Duration::from_millis(300), Presence::BestEffort)
            .await
            .unwrap();
        assert!(found.is_none());

        let err = probes
            .wait_for_element(&missing, Duration::from_millis(300), Presence::Required)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn mask_probe_waits_for_mask_to_clear() {
        let form = MemoryForm::builder()
            .input("Enp")
            .mask_for(Duration::from_millis(450))
            .build();
        let timeouts = ProbeTimeouts::default();
        let probes = Probes::new(&form, &timeouts);
        let start = Instant::now();

        probes.wait_for_mask_gone(Duration::from_secs(2)).await.unwrap();
        assert_eq!(start.elapsed().as_millis(), 500);

        let stuck = MemoryForm::builder().mask_for(Duration::from_secs(60)).build();
        let probes = Probes::new(&stuck, &timeouts);
        let err = probes
            .wait_for_mask_gone(Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("loading mask"));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_modal_resolves_immediately() {
        let form = MemoryForm::builder().build();
        let timeouts = ProbeTimeouts::default();
        let probes = Probes::new(&form, &timeouts);

        let modal = probes
            .wait_for_modal("Выбор элемента", false, Duration::from_millis(500))
            .await
            .unwrap();
        assert!(modal.is_none());
        let err = probes
            .wait_for_modal("Выбор элемента", true, Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("to open"));
    }

    #[tokio::test]
    async fn detect_form_checks_marker_field() {
        let form = MemoryForm::builder()
            .input("ReferralHospitalizationNumberTicket")
            .build();
        let marker = FieldId::parse("input[name='ReferralHospitalizationNumberTicket']").unwrap();
        assert!(detect_form(&form, &marker).await.unwrap());
        let other = FieldId::parse("Enp").unwrap();
        assert!(!detect_form(&form, &other).await.unwrap());
    }
}
