use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductRepository;
use crate::domain::product::{NewProduct, ProductPage, ProductView, StockLevel};
use crate::schema::products;

use super::models::{NewProductRow, ProductRow};

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProductRepository for DieselProductRepository {
    fn create(&self, product: NewProduct) -> Result<ProductView, DomainError> {
        let mut conn = self.pool.get()?;

        let stock = StockLevel::new(product.quantity);
        let row: ProductRow = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                name: product.name,
                description: product.description,
                price: product.price,
                image_url: product.image_url,
                quantity: stock.quantity,
                in_stock: stock.in_stock,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(ProductView::from))
    }

    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(ProductView::from)
            .collect())
    }

    fn list(&self, page: i64, limit: i64) -> Result<ProductPage, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = products::table.count().get_result(conn)?;
            let items = products::table
                .select(ProductRow::as_select())
                .order((products::name.asc(), products::id.asc()))
                .limit(limit)
                .offset(offset)
                .load(conn)?
                .into_iter()
                .map(ProductView::from)
                .collect();
            Ok(ProductPage { items, total })
        })
    }

    fn set_stock(&self, id: Uuid, stock: StockLevel) -> Result<ProductView, DomainError> {
        let mut conn = self.pool.get()?;

        diesel::update(products::table.find(id))
            .set((
                products::quantity.eq(stock.quantity),
                products::in_stock.eq(stock.in_stock),
                products::updated_at.eq(Utc::now()),
            ))
            .returning(ProductRow::as_returning())
            .get_result::<ProductRow>(&mut conn)
            .optional()?
            .map(ProductView::from)
            .ok_or(DomainError::ProductNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::DieselProductRepository;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::ProductRepository;
    use crate::domain::product::{NewProduct, StockLevel};
    use crate::testing::setup_db;

    fn product(name: &str, quantity: i32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: String::new(),
            price: BigDecimal::from_str("7.25").expect("valid decimal"),
            image_url: None,
            quantity,
        }
    }

    #[tokio::test]
    async fn set_stock_recomputes_in_stock() {
        let (_container, pool) = setup_db().await;
        let repo = DieselProductRepository::new(pool);
        let created = repo.create(product("Kaffa", 0)).unwrap();
        assert!(!created.in_stock);

        let updated = repo.set_stock(created.id, StockLevel::new(12)).unwrap();
        assert_eq!(updated.quantity, 12);
        assert!(updated.in_stock);
        assert_eq!(updated.price, BigDecimal::from_str("7.25").unwrap());
    }

    #[tokio::test]
    async fn missing_products_are_reported() {
        let (_container, pool) = setup_db().await;
        let repo = DieselProductRepository::new(pool);
        let id = Uuid::new_v4();

        assert!(repo.find_by_id(id).unwrap().is_none());
        assert!(matches!(
            repo.set_stock(id, StockLevel::new(1)),
            Err(DomainError::ProductNotFound(x)) if x == id
        ));
    }

    #[tokio::test]
    async fn list_is_ordered_by_name_and_find_many_skips_unknown_ids() {
        let (_container, pool) = setup_db().await;
        let repo = DieselProductRepository::new(pool);
        let b = repo.create(product("Bonga", 1)).unwrap();
        let a = repo.create(product("Arsi", 1)).unwrap();
        repo.create(product("Chercher", 1)).unwrap();

        let page = repo.list(1, 2).unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<_> = page.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Arsi", "Bonga"]);

        let found = repo.find_many(&[a.id, Uuid::new_v4(), b.id]).unwrap();
        assert_eq!(found.len(), 2);
    }
}
