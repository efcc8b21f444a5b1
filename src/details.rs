use crate::driver::PageDriver;
use crate::error::DriverError;
use crate::extract::{self, RecordSpecs};
use crate::pacing::Pacer;
use crate::results::{ItemReference, ProductRecord};
use tokio_util::sync::CancellationToken;

/// Visits every reference of a batch in a throwaway tab and extracts a
/// product record from each detail page.
///
/// The results listing stays untouched in the primary tab: details are
/// loaded in a second tab that is closed again when the batch is done.
/// Pages that fail to load or carry no product title are skipped; only
/// session-level failures abort the batch, and even then the driver is
/// steered back to the primary tab first.
pub async fn process_batch<D: PageDriver>(
    driver: &D,
    specs: &RecordSpecs,
    pacer: &Pacer,
    refs: &[ItemReference],
    cancel: &CancellationToken,
) -> Result<Vec<ProductRecord>, DriverError> {
    if refs.is_empty() {
        return Ok(Vec::new());
    }

    let primary = driver.current_tab().await?;

    let aux = match driver.open_tab().await {
        Ok(tab) => tab,
        Err(err) if err.is_retryable() => {
            ::log::warn!(
                "Could not open a detail tab, skipping {} references: {}",
                refs.len(),
                err
            );
            return Ok(Vec::new());
        }
        Err(err) => return Err(err),
    };

    let mut records = Vec::new();
    let mut failure: Option<DriverError> = None;

    match driver.switch_tab(&aux).await {
        Ok(()) => {
            for reference in refs {
                if cancel.is_cancelled() {
                    ::log::info!("Cancellation requested, stopping the detail pass");
                    break;
                }
                match visit_one(driver, specs, pacer, reference).await {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {}
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
                pacer.between_items().await;
            }
            if let Err(err) = driver.close_current_tab().await {
                ::log::warn!("Could not close the detail tab: {}", err);
            }
        }
        Err(err) => failure = Some(err),
    }

    if let Err(err) = driver.switch_tab(&primary).await {
        ::log::warn!("Could not return to the primary tab: {}", err);
        if failure.is_none() {
            failure = Some(err);
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(records),
    }
}

async fn visit_one<D: PageDriver>(
    driver: &D,
    specs: &RecordSpecs,
    pacer: &Pacer,
    reference: &ItemReference,
) -> Result<Option<ProductRecord>, DriverError> {
    ::log::info!("Opening product page {}", reference);
    if let Err(err) = driver.goto(reference.as_str()).await {
        if err.is_retryable() {
            ::log::warn!("Skipping {}: {}", reference, err);
            return Ok(None);
        }
        return Err(err);
    }
    pacer.product_settle().await;

    let html = match driver.page_source().await {
        Ok(html) => html,
        Err(err) if err.is_retryable() => {
            ::log::warn!("Skipping {}: {}", reference, err);
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    match extract::product_from_html(&html, specs, reference.clone()) {
        Some(record) => {
            ::log::info!("Extracted product: {}", record.title);
            Ok(Some(record))
        }
        None => {
            ::log::warn!("No product title at {}, dropping the page", reference);
            Ok(None)
        }
    }
}
