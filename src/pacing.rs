use crate::config::PacingConfig;
use std::time::Duration;

/// Injectable delay policy that paces driver interactions like a person.
///
/// Every pause the crawl takes goes through here, so tests swap in
/// [`Pacer::zero`] and run without sleeping.
#[derive(Debug, Clone)]
pub struct Pacer {
    config: PacingConfig,
}

impl Pacer {
    /// Build a pacer from configured delay ranges
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// A pacer that never sleeps
    pub fn zero() -> Self {
        Self {
            config: PacingConfig {
                page_settle: (0.0, 0.0),
                search_settle: (0.0, 0.0),
                pre_click: (0.0, 0.0),
                load_settle: (0.0, 0.0),
                between_items: (0.0, 0.0),
                product_settle: (0.0, 0.0),
                ui_step: (0.0, 0.0),
                keystroke_secs: 0.0,
            },
        }
    }

    /// Settle after the first landing-page load
    pub async fn page_settle(&self) {
        sleep_range(self.config.page_settle).await;
    }

    /// Settle after submitting a category search
    pub async fn search_settle(&self) {
        sleep_range(self.config.search_settle).await;
    }

    /// Pause between scrolling to a control and clicking it
    pub async fn pre_click(&self) {
        sleep_range(self.config.pre_click).await;
    }

    /// Settle after a load-more click while new items render
    pub async fn load_settle(&self) {
        sleep_range(self.config.load_settle).await;
    }

    /// Pause between detail-page visits
    pub async fn between_items(&self) {
        sleep_range(self.config.between_items).await;
    }

    /// Settle on a product page before snapshotting it
    pub async fn product_settle(&self) {
        sleep_range(self.config.product_settle).await;
    }

    /// Pause between dialog steps
    pub async fn ui_step(&self) {
        sleep_range(self.config.ui_step).await;
    }

    /// Delay between typed characters
    pub fn keystroke(&self) -> Duration {
        Duration::from_secs_f64(self.config.keystroke_secs.max(0.0))
    }
}

/// Sleeps for a duration drawn uniformly from the given range of seconds.
async fn sleep_range((low, high): (f64, f64)) {
    let secs = draw((low, high));
    if secs > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}

fn draw((low, high): (f64, f64)) -> f64 {
    let low = low.max(0.0);
    let high = high.max(low);
    if high > low {
        low + fastrand::f64() * (high - low)
    } else {
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_stays_in_range() {
        for _ in 0..100 {
            let secs = draw((1.5, 3.5));
            assert!((1.5..=3.5).contains(&secs));
        }
    }

    #[test]
    fn test_draw_degenerate_range() {
        assert_eq!(draw((3.0, 3.0)), 3.0);
        // An inverted range collapses to its lower bound
        assert_eq!(draw((2.0, 1.0)), 2.0);
    }

    #[test]
    fn test_zero_pacer_never_waits() {
        let pacer = Pacer::zero();
        assert_eq!(pacer.keystroke(), Duration::ZERO);
        assert_eq!(draw((0.0, 0.0)), 0.0);
    }
}
