use std::sync::Arc;

use crate::config::CheckoutSettings;
use crate::domain::errors::DomainError;
use crate::domain::notification::{KnownMetadata, Recipient};
use crate::domain::order::{
    order_number_from_ref, CompletionOutcome, FulfillmentStatus, PaymentStatus,
    PendingFulfillment,
};
use crate::domain::payment::{ConfirmationOutcome, PaymentConfirmation};
use crate::domain::ports::{OrderRepository, PaymentGateway};

use super::notification_service::NotificationService;

/// Result of one reconciliation try for an order awaiting stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentRetry {
    Fulfilled,
    StillShort { attempts: i32 },
    Escalated { attempts: i32 },
}

pub struct PaymentService {
    orders: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifications: Arc<NotificationService>,
    settings: CheckoutSettings,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifications: Arc<NotificationService>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            orders,
            gateway,
            notifications,
            settings,
        }
    }

    /// Confirms the payment behind `tx_ref` and applies its side effects once.
    ///
    /// Called from both the gateway webhook and the customer's polling
    /// redirect, so it must be safe to run any number of times, concurrently.
    pub async fn confirm(&self, tx_ref: &str) -> Result<PaymentConfirmation, DomainError> {
        let verification = self.gateway.verify(tx_ref).await?;
        let order_number = order_number_from_ref(tx_ref)?.to_string();
        let redirect_url = self.redirect_url(&order_number);
        let confirmation = |outcome| PaymentConfirmation {
            order_number: order_number.clone(),
            outcome,
            redirect_url: redirect_url.clone(),
        };

        let snapshot = {
            let orders = self.orders.clone();
            let number = order_number.clone();
            tokio::task::spawn_blocking(move || orders.payment_snapshot(&number)).await??
        }
        .ok_or_else(|| DomainError::OrderNotFound(order_number.clone()))?;

        if snapshot.payment_status == PaymentStatus::Completed {
            log::debug!("Payment for {} already completed", order_number);
            return Ok(confirmation(ConfirmationOutcome::AlreadyCompleted));
        }

        if !verification.status.is_success() {
            let orders = self.orders.clone();
            let number = order_number.clone();
            tokio::task::spawn_blocking(move || orders.mark_payment_failed(&number)).await??;
            log::warn!(
                "Payment for {} not successful (gateway status '{}')",
                order_number,
                verification.status.as_str()
            );
            self.notify(
                Recipient::Customer(snapshot.customer_id),
                "Payment failed",
                format!("We could not confirm the payment for order {order_number}"),
                KnownMetadata::PaymentFailed {
                    order_number: order_number.clone(),
                    gateway_status: verification.status.as_str().to_string(),
                },
            )
            .await;
            return Ok(confirmation(ConfirmationOutcome::Failed));
        }

        let orders = self.orders.clone();
        let number = order_number.clone();
        let completed = tokio::task::spawn_blocking(move || orders.complete_payment(&number)).await?;

        match completed {
            Ok(CompletionOutcome::Completed) => {
                log::info!("Payment for {} completed, stock reserved", order_number);
                self.notify(
                    Recipient::Customer(snapshot.customer_id),
                    "Payment received",
                    format!("Order {order_number} is paid and being processed"),
                    KnownMetadata::PaymentCompleted {
                        order_number: order_number.clone(),
                        amount: snapshot.total.to_string(),
                    },
                )
                .await;
                Ok(confirmation(ConfirmationOutcome::Completed))
            }
            Ok(CompletionOutcome::AlreadyCompleted) => {
                log::debug!("Payment for {} completed concurrently", order_number);
                Ok(confirmation(ConfirmationOutcome::AlreadyCompleted))
            }
            Err(e) if e.is_stock_abort() => {
                // Paid at the gateway but not fulfillable yet: park it for the
                // reconciler, keeping an escalated order escalated.
                log::error!(
                    "Payment for {} verified but fulfillment aborted: {}",
                    order_number,
                    e
                );
                let escalated = snapshot.fulfillment_status == FulfillmentStatus::Escalated;
                let orders = self.orders.clone();
                let number = order_number.clone();
                let note = e.to_string();
                tokio::task::spawn_blocking(move || {
                    orders.record_fulfillment_attempt(&number, &note, escalated)
                })
                .await??;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Re-runs the stock transaction for an order whose payment was already
    /// verified, escalating once `max_attempts` tries have failed.
    pub async fn retry_fulfillment(
        &self,
        pending: &PendingFulfillment,
        max_attempts: i32,
    ) -> Result<FulfillmentRetry, DomainError> {
        let orders = self.orders.clone();
        let number = pending.order_number.clone();
        let result = tokio::task::spawn_blocking(move || orders.complete_payment(&number)).await?;

        match result {
            Ok(CompletionOutcome::Completed) => {
                log::info!("Order {} fulfilled on retry", pending.order_number);
                self.notify(
                    Recipient::Customer(pending.customer_id),
                    "Payment received",
                    format!(
                        "Order {} is paid and being processed",
                        pending.order_number
                    ),
                    KnownMetadata::OrderStatus {
                        order_number: pending.order_number.clone(),
                        status: "processing".to_string(),
                    },
                )
                .await;
                Ok(FulfillmentRetry::Fulfilled)
            }
            Ok(CompletionOutcome::AlreadyCompleted) => Ok(FulfillmentRetry::Fulfilled),
            Err(e) if e.is_stock_abort() => {
                let escalate = pending.attempts + 1 >= max_attempts;
                let orders = self.orders.clone();
                let number = pending.order_number.clone();
                let note = e.to_string();
                let attempts = tokio::task::spawn_blocking(move || {
                    orders.record_fulfillment_attempt(&number, &note, escalate)
                })
                .await??;

                if !escalate {
                    return Ok(FulfillmentRetry::StillShort { attempts });
                }

                log::error!(
                    "Order {} escalated after {} fulfillment attempts: {}",
                    pending.order_number,
                    attempts,
                    e
                );
                self.notify(
                    Recipient::Staff,
                    "Paid order cannot be fulfilled",
                    format!(
                        "Order {} was paid but stock is still short after {} attempts",
                        pending.order_number, attempts
                    ),
                    KnownMetadata::FulfillmentEscalated {
                        order_number: pending.order_number.clone(),
                        attempts,
                        reason: e.to_string(),
                    },
                )
                .await;
                Ok(FulfillmentRetry::Escalated { attempts })
            }
            Err(e) => Err(e),
        }
    }

    /// Where the customer should land after paying for `order_number`.
    pub fn redirect_url(&self, order_number: &str) -> String {
        self.settings.confirmation_url(order_number)
    }

    pub fn orders(&self) -> &Arc<dyn OrderRepository> {
        &self.orders
    }

    async fn notify(
        &self,
        recipient: Recipient,
        title: &'static str,
        message: String,
        metadata: KnownMetadata,
    ) {
        let notifications = self.notifications.clone();
        let sent = tokio::task::spawn_blocking(move || {
            notifications.notify_quietly(recipient, title, message, metadata)
        })
        .await;
        if let Err(e) = sent {
            log::warn!("Notification task failed: {}", e);
        }
    }
}
