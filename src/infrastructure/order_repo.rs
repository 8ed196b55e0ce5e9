use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    CompletionOutcome, FulfillmentStatus, ItemDemand, ListResult, NewOrder, OrderStatus,
    OrderView, PaymentSnapshot, PaymentStatus, PendingFulfillment,
};
use crate::domain::ports::OrderRepository;
use crate::domain::product::decrement;
use crate::schema::{order_items, orders, products};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn completable_statuses() -> Vec<&'static str> {
    PaymentStatus::COMPLETABLE.iter().map(|s| s.as_str()).collect()
}

fn load_view(conn: &mut PgConnection, order: OrderRow) -> Result<OrderView, DomainError> {
    let items = OrderItemRow::belonging_to(&order)
        .select(OrderItemRow::as_select())
        .order(order_items::position.asc())
        .load(conn)?;
    order.into_view(items)
}

fn find_row(conn: &mut PgConnection, order_number: &str) -> Result<Option<OrderRow>, DomainError> {
    Ok(orders::table
        .filter(orders::order_number.eq(order_number))
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?)
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order
            let order_id = Uuid::new_v4();
            let row: OrderRow = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    transaction_ref: Some(crate::domain::order::transaction_ref(
                        &order.order_number,
                    )),
                    order_number: order.order_number,
                    customer_id: order.customer.id,
                    customer_email: order.customer.email,
                    customer_first_name: order.customer.first_name,
                    customer_last_name: order.customer.last_name,
                    shipping_address_id: order.shipping_address_id,
                    billing_address_id: order.billing_address_id,
                    subtotal: order.totals.subtotal,
                    tax: order.totals.tax,
                    shipping: order.totals.shipping,
                    total: order.totals.total,
                    order_status: OrderStatus::Pending.as_str().to_string(),
                    payment_status: PaymentStatus::Pending.as_str().to_string(),
                    fulfillment_status: FulfillmentStatus::None.as_str().to_string(),
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            // 2. Insert the line item snapshots, keeping their order
            let new_items: Vec<NewOrderItemRow> = order
                .items
                .iter()
                .enumerate()
                .map(|(position, item)| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: item.product_id,
                    position: position as i32,
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.clone(),
                    subtotal: item.subtotal(),
                    image_url: item.image_url.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            load_view(conn, row)
        })
    }

    fn find_by_number(&self, order_number: &str) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let Some(order) = find_row(&mut conn, order_number)? else {
            return Ok(None);
        };
        load_view(&mut conn, order).map(Some)
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            let items = OrderItemRow::belonging_to(&rows)
                .select(OrderItemRow::as_select())
                .order(order_items::position.asc())
                .load(conn)?
                .grouped_by(&rows);

            let views = rows
                .into_iter()
                .zip(items)
                .map(|(order, items)| order.into_view(items))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ListResult {
                items: views,
                total,
            })
        })
    }

    fn payment_snapshot(
        &self,
        order_number: &str,
    ) -> Result<Option<PaymentSnapshot>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::order_number.eq(order_number))
            .select((
                orders::id,
                orders::customer_id,
                orders::payment_status,
                orders::fulfillment_status,
                orders::total,
            ))
            .first::<(Uuid, Uuid, String, String, bigdecimal::BigDecimal)>(&mut conn)
            .optional()?;

        let Some((order_id, customer_id, payment_status, fulfillment_status, total)) = order
        else {
            return Ok(None);
        };

        let items = order_items::table
            .filter(order_items::order_id.eq(order_id))
            .order(order_items::position.asc())
            .select((order_items::product_id, order_items::quantity))
            .load::<(Uuid, i32)>(&mut conn)?
            .into_iter()
            .map(|(product_id, quantity)| ItemDemand {
                product_id,
                quantity,
            })
            .collect();

        Ok(Some(PaymentSnapshot {
            order_number: order_number.to_string(),
            customer_id,
            payment_status: payment_status.parse()?,
            fulfillment_status: fulfillment_status.parse()?,
            total,
            items,
        }))
    }

    fn complete_payment(&self, order_number: &str) -> Result<CompletionOutcome, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let now = Utc::now();

            // 1. Claim the order. The row lock taken here serializes concurrent
            //    confirmations; a second caller re-evaluates the filter after the
            //    first commits and matches nothing.
            let claimed: Option<Uuid> = diesel::update(
                orders::table
                    .filter(orders::order_number.eq(order_number))
                    .filter(orders::payment_status.eq_any(completable_statuses()))
                    .filter(orders::order_status.eq(OrderStatus::Pending.as_str())),
            )
            .set((
                orders::payment_status.eq(PaymentStatus::Completed.as_str()),
                orders::order_status.eq(OrderStatus::Processing.as_str()),
                orders::fulfillment_status.eq(FulfillmentStatus::Fulfilled.as_str()),
                orders::fulfillment_note.eq(None::<String>),
                orders::updated_at.eq(now),
            ))
            .returning(orders::id)
            .get_result(conn)
            .optional()?;

            let Some(order_id) = claimed else {
                let current: Option<(String, String)> = orders::table
                    .filter(orders::order_number.eq(order_number))
                    .select((orders::payment_status, orders::order_status))
                    .first(conn)
                    .optional()?;
                let Some((payment, order)) = current else {
                    return Err(DomainError::OrderNotFound(order_number.to_string()));
                };
                if payment == PaymentStatus::Completed.as_str() {
                    return Ok(CompletionOutcome::AlreadyCompleted);
                }
                if order == OrderStatus::Cancelled.as_str() {
                    return Err(DomainError::OrderCancelled(order_number.to_string()));
                }
                return Err(DomainError::InvalidTransition {
                    from: payment,
                    to: PaymentStatus::Completed.to_string(),
                });
            };

            // 2. Take each line item out of stock, in order. Returning an error
            //    here rolls back the claim as well.
            let demands = order_items::table
                .filter(order_items::order_id.eq(order_id))
                .order(order_items::position.asc())
                .select((order_items::product_id, order_items::quantity))
                .load::<(Uuid, i32)>(conn)?;

            for (product_id, requested) in demands {
                let available: i32 = products::table
                    .find(product_id)
                    .select(products::quantity)
                    .for_update()
                    .get_result(conn)
                    .optional()?
                    .ok_or(DomainError::ProductNotFound(product_id))?;

                let level =
                    decrement(available, requested).ok_or(DomainError::InsufficientStock {
                        product_id,
                        requested,
                        available,
                    })?;

                diesel::update(products::table.find(product_id))
                    .set((
                        products::quantity.eq(level.quantity),
                        products::in_stock.eq(level.in_stock),
                        products::updated_at.eq(now),
                    ))
                    .execute(conn)?;
            }

            Ok(CompletionOutcome::Completed)
        })
    }

    fn mark_payment_failed(&self, order_number: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(
            orders::table
                .filter(orders::order_number.eq(order_number))
                .filter(orders::payment_status.eq_any(completable_statuses())),
        )
        .set((
            orders::payment_status.eq(PaymentStatus::Failed.as_str()),
            orders::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;
        Ok(())
    }

    fn list_awaiting_stock(&self, limit: i64) -> Result<Vec<PendingFulfillment>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = orders::table
            .filter(orders::fulfillment_status.eq(FulfillmentStatus::AwaitingStock.as_str()))
            .filter(orders::payment_status.eq_any(completable_statuses()))
            .filter(orders::order_status.eq(OrderStatus::Pending.as_str()))
            .order(orders::updated_at.asc())
            .limit(limit)
            .select((
                orders::order_number,
                orders::customer_id,
                orders::fulfillment_attempts,
            ))
            .load::<(String, Uuid, i32)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(order_number, customer_id, attempts)| PendingFulfillment {
                order_number,
                customer_id,
                attempts,
            })
            .collect())
    }

    fn record_fulfillment_attempt(
        &self,
        order_number: &str,
        note: &str,
        escalate: bool,
    ) -> Result<i32, DomainError> {
        let mut conn = self.pool.get()?;

        let status = if escalate {
            FulfillmentStatus::Escalated
        } else {
            FulfillmentStatus::AwaitingStock
        };

        diesel::update(orders::table.filter(orders::order_number.eq(order_number)))
            .set((
                orders::fulfillment_status.eq(status.as_str()),
                orders::fulfillment_attempts.eq(orders::fulfillment_attempts + 1),
                orders::fulfillment_note.eq(Some(note)),
                orders::updated_at.eq(Utc::now()),
            ))
            .returning(orders::fulfillment_attempts)
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(|| DomainError::OrderNotFound(order_number.to_string()))
    }

    fn update_status(
        &self,
        order_number: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let now = Utc::now();
            let updated = diesel::update(
                orders::table
                    .filter(orders::order_number.eq(order_number))
                    .filter(orders::order_status.eq(from.as_str())),
            )
            .set((
                orders::order_status.eq(to.as_str()),
                orders::updated_at.eq(now),
            ))
            .execute(conn)?;

            if updated == 0 {
                return match find_row(conn, order_number)? {
                    None => Err(DomainError::OrderNotFound(order_number.to_string())),
                    Some(row) => Err(DomainError::InvalidTransition {
                        from: row.order_status,
                        to: to.to_string(),
                    }),
                };
            }

            if to == OrderStatus::Refunded {
                diesel::update(orders::table.filter(orders::order_number.eq(order_number)))
                    .set(orders::payment_status.eq(PaymentStatus::Refunded.as_str()))
                    .execute(conn)?;
            }

            let row = find_row(conn, order_number)?
                .ok_or_else(|| DomainError::OrderNotFound(order_number.to_string()))?;
            load_view(conn, row)
        })
    }
}
