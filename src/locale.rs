use crate::config::SelectorConfig;
use crate::driver::PageDriver;
use crate::error::DriverError;
use crate::pacing::Pacer;
use std::time::Duration;

/// Binds the session to a store: opens the modality picker, switches to
/// pickup, searches the ZIP code and takes the first store result.
///
/// Returns whether the session ended up bound to a store.
pub async fn select_store<D: PageDriver>(
    driver: &D,
    selectors: &SelectorConfig,
    pacer: &Pacer,
    zip: &str,
    wait: Duration,
) -> bool {
    ::log::info!("Starting store selection for ZIP {}", zip);
    match select_store_steps(driver, selectors, pacer, zip, wait).await {
        Ok(()) => {
            ::log::info!("Store selected");
            true
        }
        Err(err) => {
            ::log::warn!("Store selection failed: {}", err);
            false
        }
    }
}

async fn select_store_steps<D: PageDriver>(
    driver: &D,
    selectors: &SelectorConfig,
    pacer: &Pacer,
    zip: &str,
    wait: Duration,
) -> Result<(), DriverError> {
    driver.wait_for_element(&selectors.store_button, wait).await?;
    driver.click(&selectors.store_button).await?;
    pacer.page_settle().await;

    // The picker sometimes opens straight into a stale store dialog that
    // has to be closed before the modality button responds again
    if driver.appears(&selectors.store_dialog_close, wait).await? {
        if let Err(err) = driver.click(&selectors.store_dialog_close).await {
            ::log::info!("Could not close the store dialog: {}", err);
        }
        pacer.load_settle().await;
    } else {
        ::log::info!("No store dialog to close");
    }

    driver.wait_for_element(&selectors.store_button, wait).await?;
    driver.click(&selectors.store_button).await?;
    pacer.page_settle().await;

    driver.wait_for_element(&selectors.pickup_option, wait).await?;
    driver.click(&selectors.pickup_option).await?;
    ::log::info!("Switched the store picker to pickup");

    driver.wait_for_element(&selectors.zip_input, wait).await?;
    driver.clear(&selectors.zip_input).await?;
    driver
        .type_text(&selectors.zip_input, zip, pacer.keystroke())
        .await?;
    ::log::info!("Typed the ZIP code: {}", zip);

    driver.wait_for_element(&selectors.zip_submit, wait).await?;
    driver.click(&selectors.zip_submit).await?;

    driver.wait_for_element(&selectors.store_select, wait).await?;
    driver.click(&selectors.store_select).await?;
    pacer.page_settle().await;

    Ok(())
}
