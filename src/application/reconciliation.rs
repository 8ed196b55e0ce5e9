use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ReconcileSettings;
use crate::domain::errors::DomainError;

use super::payment_service::{FulfillmentRetry, PaymentService};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub fulfilled: usize,
    pub still_short: usize,
    pub escalated: usize,
    pub failed: usize,
}

/// Periodically retries orders that were paid at the gateway but could not be
/// fulfilled from stock at confirmation time.
pub struct FulfillmentReconciler {
    payments: Arc<PaymentService>,
    settings: ReconcileSettings,
}

impl FulfillmentReconciler {
    pub fn new(payments: Arc<PaymentService>, settings: ReconcileSettings) -> Self {
        Self { payments, settings }
    }

    pub async fn run_once(&self) -> Result<ReconcileReport, DomainError> {
        let orders = self.payments.orders().clone();
        let batch = self.settings.batch_size;
        let pending = tokio::task::spawn_blocking(move || orders.list_awaiting_stock(batch)).await??;

        let mut report = ReconcileReport::default();
        for order in &pending {
            match self
                .payments
                .retry_fulfillment(order, self.settings.max_attempts)
                .await
            {
                Ok(FulfillmentRetry::Fulfilled) => report.fulfilled += 1,
                Ok(FulfillmentRetry::StillShort { .. }) => report.still_short += 1,
                Ok(FulfillmentRetry::Escalated { .. }) => report.escalated += 1,
                Err(e) => {
                    log::error!("Reconciling order {} failed: {}", order.order_number, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Runs [`FulfillmentReconciler::run_once`] on every tick until `shutdown`
    /// is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            log::info!(
                "Fulfillment reconciler started (every {:?}, max {} attempts)",
                self.settings.interval,
                self.settings.max_attempts
            );
            let mut ticker = tokio::time::interval(self.settings.interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        match self.run_once().await {
                            Ok(report) if report == ReconcileReport::default() => {}
                            Ok(report) => log::info!("Fulfillment reconciliation: {:?}", report),
                            Err(e) => log::error!("Fulfillment reconciliation failed: {}", e),
                        }
                    }
                }
            }
            log::info!("Fulfillment reconciler stopped");
        })
    }
}
