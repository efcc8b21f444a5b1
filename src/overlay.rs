use crate::config::SelectorConfig;
use crate::driver::PageDriver;
use crate::pacing::Pacer;
use std::time::Duration;

/// Checks for the feedback overlay and dismisses it when present.
///
/// Returns true only when the overlay was found and the dismiss click went
/// through. A missing overlay and a failed dismissal both come back false,
/// so callers just carry on either way.
pub async fn try_dismiss<D: PageDriver>(
    driver: &D,
    selectors: &SelectorConfig,
    pacer: &Pacer,
    wait: Duration,
) -> bool {
    match driver.appears(&selectors.overlay_marker, wait).await {
        Ok(true) => {}
        Ok(false) => return false,
        Err(err) => {
            ::log::debug!("Overlay probe failed: {}", err);
            return false;
        }
    }

    ::log::info!("Feedback overlay detected, dismissing it");
    pacer.ui_step().await;

    if let Err(err) = driver.wait_for_element(&selectors.overlay_dismiss, wait).await {
        ::log::warn!("Overlay dismiss button never appeared: {}", err);
        return false;
    }

    // A plain click can land on the overlay backdrop instead of the button
    match driver.click_js(&selectors.overlay_dismiss).await {
        Ok(()) => {
            ::log::info!("Feedback overlay dismissed");
            pacer.ui_step().await;
            true
        }
        Err(err) => {
            ::log::warn!("Failed to dismiss the feedback overlay: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::scripted::ScriptedDriver;

    fn wait() -> Duration {
        Duration::from_millis(10)
    }

    #[tokio::test]
    async fn test_absent_overlay_is_not_clicked() {
        let driver = ScriptedDriver::new();
        let selectors = SelectorConfig::default();

        let dismissed = try_dismiss(&driver, &selectors, &Pacer::zero(), wait()).await;

        assert!(!dismissed);
        assert_eq!(driver.count_calls("click_js"), 0);
    }

    #[tokio::test]
    async fn test_present_overlay_is_dismissed() {
        let selectors = SelectorConfig::default();
        let driver = ScriptedDriver::new()
            .with_present(&selectors.overlay_marker)
            .with_present(&selectors.overlay_dismiss);

        let dismissed = try_dismiss(&driver, &selectors, &Pacer::zero(), wait()).await;

        assert!(dismissed);
        assert_eq!(driver.count_calls("click_js"), 1);
    }

    #[tokio::test]
    async fn test_failed_dismiss_click_reports_false() {
        let selectors = SelectorConfig::default();
        let driver = ScriptedDriver::new()
            .with_present(&selectors.overlay_marker)
            .with_present(&selectors.overlay_dismiss)
            .with_click_script(
                &selectors.overlay_dismiss,
                vec![Err(crate::error::DriverError::ClickIntercepted {
                    selector: selectors.overlay_dismiss.clone(),
                })],
            );

        let dismissed = try_dismiss(&driver, &selectors, &Pacer::zero(), wait()).await;

        assert!(!dismissed);
    }
}
