use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::notification::{
    NewNotification, NotificationMetadata, NotificationView, Recipient,
};
use crate::domain::ports::{NotificationPublisher, NotificationRepository};

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    publisher: Arc<dyn NotificationPublisher>,
}

impl NotificationService {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        publisher: Arc<dyn NotificationPublisher>,
    ) -> Self {
        Self { repo, publisher }
    }

    /// Stores the notification, then pushes it to live subscribers.
    pub fn notify(
        &self,
        recipient: Recipient,
        title: impl Into<String>,
        message: impl Into<String>,
        metadata: impl Into<NotificationMetadata>,
    ) -> Result<NotificationView, DomainError> {
        let stored = self.repo.create(NewNotification {
            recipient,
            title: title.into(),
            message: message.into(),
            metadata: metadata.into(),
        })?;
        self.publisher.publish(&stored);
        Ok(stored)
    }

    /// Like [`NotificationService::notify`], but a failure is only logged.
    pub fn notify_quietly(
        &self,
        recipient: Recipient,
        title: impl Into<String>,
        message: impl Into<String>,
        metadata: impl Into<NotificationMetadata>,
    ) {
        if let Err(e) = self.notify(recipient, title, message, metadata) {
            log::warn!("Failed to deliver notification to {:?}: {}", recipient, e);
        }
    }

    pub fn list(
        &self,
        recipient: Recipient,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<NotificationView>, DomainError> {
        self.repo.list(recipient, unread_only, limit.clamp(1, 100))
    }

    pub fn mark_read(&self, id: Uuid) -> Result<NotificationView, DomainError> {
        self.repo.mark_read(id)
    }

    pub fn mark_all_read(&self, recipient: Recipient) -> Result<usize, DomainError> {
        self.repo.mark_all_read(recipient)
    }

    pub fn unread_count(&self, recipient: Recipient) -> Result<i64, DomainError> {
        self.repo.unread_count(recipient)
    }
}
