use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::notification::{NewNotification, NotificationView, Recipient};
use crate::domain::ports::NotificationRepository;
use crate::schema::notifications;

use super::models::{NewNotificationRow, NotificationRow};

pub struct DieselNotificationRepository {
    pool: DbPool,
}

impl DieselNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Every notification addressed to `recipient`.
fn addressed_to<'a>(recipient: Recipient) -> notifications::BoxedQuery<'a, Pg> {
    let query = notifications::table
        .filter(notifications::audience.eq(recipient.audience()))
        .into_boxed();
    match recipient.user_id() {
        Some(user_id) => query.filter(notifications::user_id.eq(user_id)),
        None => query,
    }
}

impl NotificationRepository for DieselNotificationRepository {
    fn create(&self, notification: NewNotification) -> Result<NotificationView, DomainError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(notifications::table)
            .values(&NewNotificationRow {
                id: Uuid::new_v4(),
                audience: notification.recipient.audience().to_string(),
                user_id: notification.recipient.user_id(),
                title: notification.title,
                message: notification.message,
                metadata: notification.metadata.to_json(),
            })
            .returning(NotificationRow::as_returning())
            .get_result::<NotificationRow>(&mut conn)?
            .try_into()
    }

    fn list(
        &self,
        recipient: Recipient,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<NotificationView>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = addressed_to(recipient);
        if unread_only {
            query = query.filter(notifications::is_read.eq(false));
        }
        query
            .order(notifications::created_at.desc())
            .limit(limit)
            .select(NotificationRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(NotificationView::try_from)
            .collect()
    }

    fn mark_read(&self, id: Uuid) -> Result<NotificationView, DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(notifications::table.find(id))
            .set(notifications::is_read.eq(true))
            .returning(NotificationRow::as_returning())
            .get_result::<NotificationRow>(&mut conn)
            .optional()?
            .ok_or(DomainError::NotFound)?
            .try_into()
    }

    fn mark_all_read(&self, recipient: Recipient) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;

        let base = notifications::table
            .filter(notifications::audience.eq(recipient.audience()))
            .filter(notifications::is_read.eq(false));
        let updated = match recipient.user_id() {
            Some(user_id) => diesel::update(base.filter(notifications::user_id.eq(user_id)))
                .set(notifications::is_read.eq(true))
                .execute(&mut conn)?,
            None => diesel::update(base)
                .set(notifications::is_read.eq(true))
                .execute(&mut conn)?,
        };
        Ok(updated)
    }

    fn unread_count(&self, recipient: Recipient) -> Result<i64, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(addressed_to(recipient)
            .filter(notifications::is_read.eq(false))
            .count()
            .get_result(&mut conn)?)
    }
}
