//! Client-side price alert trigger.
//!
//! After each completed search the cheapest result is compared with the price
//! the user typed; a strictly lower price fires one local notification. This
//! is a convenience check only: durable alerts live on the backend.

pub mod evaluator;

pub use evaluator::{evaluate, AlertDecision, AlertThreshold, PriceAlertTrigger};
