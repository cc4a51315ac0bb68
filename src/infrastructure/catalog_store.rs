//! Read-only diesel lookups into the main application's tables.

use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::catalog::{CatalogEntry, RoomEntry};
use crate::domain::errors::DomainError;
use crate::domain::ports::{ApiUser, CatalogStore, UserStore};
use crate::schema::{products, rooms, users};

use super::models::{ProductRow, RoomRow, UserRow};

fn lookup_err<E: std::fmt::Display>(e: E) -> DomainError {
    DomainError::LookupUnavailable(e.to_string())
}

pub struct DieselCatalogStore {
    pool: DbPool,
}

impl DieselCatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogStore for DieselCatalogStore {
    fn products(&self, user_id: i64) -> Result<Vec<CatalogEntry>, DomainError> {
        let mut conn = self.pool.get().map_err(lookup_err)?;

        let rows: Vec<ProductRow> = products::table
            .filter(products::user_id.eq(user_id))
            .select(ProductRow::as_select())
            .load(&mut conn)
            .map_err(lookup_err)?;

        Ok(rows
            .into_iter()
            .map(|r| CatalogEntry {
                id: r.id,
                name: r.name,
                retail_cost: r.retail_cost,
                unit: r.unit,
            })
            .collect())
    }

    fn rooms_by_name(
        &self,
        partial_name: &str,
        user_id: i64,
    ) -> Result<Vec<RoomEntry>, DomainError> {
        let mut conn = self.pool.get().map_err(lookup_err)?;

        let rows: Vec<RoomRow> = rooms::table
            .filter(rooms::user_id.eq(user_id))
            .filter(rooms::name.like(format!("%{}%", partial_name)))
            .limit(1)
            .select(RoomRow::as_select())
            .load(&mut conn)
            .map_err(lookup_err)?;

        Ok(rows
            .into_iter()
            .map(|r| RoomEntry {
                id: r.id,
                name: r.name,
            })
            .collect())
    }
}

pub struct DieselUserStore {
    pool: DbPool,
}

impl DieselUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserStore for DieselUserStore {
    fn user_by_api_key(&self, api_key: &str) -> Result<Option<ApiUser>, DomainError> {
        let mut conn = self.pool.get().map_err(lookup_err)?;

        let row: Option<UserRow> = users::table
            .filter(users::api_key.eq(api_key))
            .limit(1)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(lookup_err)?;

        Ok(row.map(|u| ApiUser {
            id: u.id,
            api_key: u.api_key,
        }))
    }
}
