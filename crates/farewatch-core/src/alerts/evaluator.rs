use tracing::debug;

use crate::models::{parse_price_input, Flight};
use crate::notifications::{NotificationId, NotificationPayload, NotificationRequest, Notifier};
use crate::utils::{format_price, format_route};

const ALERT_TITLE: &str = "Price alert!";

/// A route and the price under which the user wants to hear about it.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertThreshold {
    pub origin: String,
    pub destination: String,
    pub target_price: f64,
}

impl AlertThreshold {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>, target_price: f64) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            target_price,
        }
    }

    /// Build from the raw price field; `None` when the input is not a positive number.
    pub fn from_input(origin: &str, destination: &str, target_price: &str) -> Option<Self> {
        parse_price_input(target_price).map(|price| Self::new(origin, destination, price))
    }

    fn is_valid(&self) -> bool {
        self.target_price.is_finite() && self.target_price > 0.0
    }
}

/// Outcome of a positive evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDecision {
    /// Cheapest price seen in the results
    pub min_price: f64,
    pub notification: NotificationRequest,
}

/// Decide whether `results` beat the threshold.
///
/// Returns `None` for empty results, for an invalid target price, and when
/// the cheapest result is not strictly below the target.
pub fn evaluate(results: &[Flight], threshold: &AlertThreshold) -> Option<AlertDecision> {
    if !threshold.is_valid() {
        debug!(target_price = threshold.target_price, "Invalid alert threshold, skipping");
        return None;
    }

    let min_price = results
        .iter()
        .map(|f| f.price)
        .filter(|p| p.is_finite())
        .fold(None, |min: Option<f64>, p| Some(min.map_or(p, |m| m.min(p))))?;

    if min_price >= threshold.target_price {
        debug!(min_price, target_price = threshold.target_price, "No result under threshold");
        return None;
    }

    let body = format!(
        "The price for {} is below {}!",
        format_route(&threshold.origin, &threshold.destination),
        format_price(threshold.target_price)
    );

    Some(AlertDecision {
        min_price,
        notification: NotificationRequest {
            title: ALERT_TITLE.to_string(),
            body,
            payload: NotificationPayload::PriceAlert {
                origin: threshold.origin.clone(),
                destination: threshold.destination.clone(),
                target_price: threshold.target_price,
            },
        },
    })
}

/// Runs `evaluate` after each search and hands positive decisions to the notifier.
///
/// Every qualifying search notifies again; nothing is deduplicated.
#[derive(Clone)]
pub struct PriceAlertTrigger {
    notifier: Notifier,
}

impl PriceAlertTrigger {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    pub async fn on_search_completed(
        &self,
        results: &[Flight],
        threshold: &AlertThreshold,
    ) -> Option<NotificationId> {
        let decision = evaluate(results, threshold)?;
        debug!(
            min_price = decision.min_price,
            target_price = threshold.target_price,
            "Price under threshold, notifying"
        );
        self.notifier.schedule(decision.notification).await
    }
}
