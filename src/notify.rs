//! Notification dispatch
//!
//! Delivery (push, mail, digest batching) belongs to an external service.
//! The engine only hands matches over, fire-and-forget: a failed hand-over
//! is logged and never fails the cycle.

use crate::model::{Urgency, Vehicle};
use crate::storage::SqliteStore;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, user_id: &str, vehicle: &Vehicle, urgency: Urgency);
}

/// Logs matches instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn notify(&self, user_id: &str, vehicle: &Vehicle, urgency: Urgency) {
        tracing::info!(
            "[{}] match for {}: {} ({})",
            urgency,
            user_id,
            vehicle.title,
            vehicle.url.as_deref().unwrap_or("no link")
        );
    }
}

/// Writes matches to the `notifications` outbox table
pub struct OutboxNotifier {
    store: Arc<SqliteStore>,
}

impl OutboxNotifier {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }
}

/// The outbox payload for one match
pub fn payload(vehicle: &Vehicle, urgency: Urgency) -> serde_json::Value {
    json!({
        "vehicle_id": vehicle.id,
        "title": vehicle.title,
        "url": vehicle.url,
        "make": vehicle.make,
        "model": vehicle.model,
        "price": vehicle.price(),
        "year": vehicle.year(),
        "mileage": vehicle.mileage,
        "fuel": vehicle.fuel.as_ref().map(|f| f.as_str()),
        "gearbox": vehicle.gearbox.as_ref().map(|g| g.as_str()),
        "seller": vehicle.seller_name,
        "image": vehicle.images.first(),
        "urgency": urgency.as_str(),
    })
}

#[async_trait]
impl NotificationDispatcher for OutboxNotifier {
    async fn notify(&self, user_id: &str, vehicle: &Vehicle, urgency: Urgency) {
        let body = payload(vehicle, urgency).to_string();
        match self
            .store
            .enqueue_notification(user_id, &vehicle.id, urgency, &body)
        {
            Ok(id) => tracing::debug!("Queued notification {} for {}", id, user_id),
            Err(e) => tracing::error!(
                "Failed to queue notification for {} ({}): {}",
                user_id,
                vehicle.id,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn vehicle() -> Vehicle {
        let mut vehicle = Vehicle::new("v1", "BMW 320d", Utc::now());
        vehicle.url = Some("https://cars.example.com/d/1".to_string());
        vehicle.set_price(Some(24_990));
        vehicle
    }

    #[test]
    fn test_payload() {
        let payload = payload(&vehicle(), Urgency::Digest);
        assert_eq!(payload["vehicle_id"], "v1");
        assert_eq!(payload["price"], 24_990);
        assert_eq!(payload["urgency"], "digest");
        assert!(payload["year"].is_null());
    }

    #[tokio::test]
    async fn test_outbox_notifier_writes_row() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let notifier = OutboxNotifier::new(Arc::clone(&store));

        notifier.notify("user-1", &vehicle(), Urgency::Immediate).await;

        let pending = store.pending_notifications().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, "user-1");
        assert_eq!(pending[0].1, "v1");
        assert!(pending[0].3.contains("BMW 320d"));
    }

    #[tokio::test]
    async fn test_log_notifier_does_not_panic() {
        LogNotifier.notify("user-1", &vehicle(), Urgency::Normal).await;
    }
}
