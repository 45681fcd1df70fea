//! PostgreSQL store
//!
//! Stock changes are a single conditional `UPDATE` guarded by
//! `quantity + delta >= 0` (and by the column's range), run inside the
//! caller's transaction after the row has been taken with `SELECT ... FOR UPDATE`.
//! Warehouse rows are locked `FOR SHARE` by movements and `FOR UPDATE` by edits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    amount_ceiling, check_adjustment, within_amount_range, Movement, MovementLabels,
    MovementQuery, MovementSortKey, MovementType, MovementView, NewAuditEntry, NewMovement,
    PageRequest, Product, Stock, StockDirection, StockError, StockFilter, StockLabels,
    StockSortKey, StockView, Warehouse, WarehouseFilter, WarehouseView,
};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{InventoryStore, LockMode, MovementScope, Page, StockScope, StoreTx};
use crate::error::{AppError, AppResult, Resource};

const STOCK_COLUMNS: &str = "id, product_id, warehouse_id, quantity, minimum_quantity, \
     reserved_quantity, last_entry_at, last_exit_at, updated_at";

const STOCK_VIEW_SELECT: &str = r#"
    SELECT s.id, s.product_id, p.code AS product_code, p.name AS product_name,
           p.category_id, COALESCE(c.name, '') AS category_name,
           s.warehouse_id, w.name AS warehouse_name,
           s.quantity, s.minimum_quantity, s.reserved_quantity,
           s.last_entry_at, s.last_exit_at, s.updated_at
    FROM stock s
    JOIN products p ON p.id = s.product_id
    JOIN warehouses w ON w.id = s.warehouse_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

const STOCK_COUNT_SELECT: &str = r#"
    SELECT COUNT(*)
    FROM stock s
    JOIN products p ON p.id = s.product_id
    JOIN warehouses w ON w.id = s.warehouse_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

const ALERT_LEVEL_SQL: &str = "(CASE \
     WHEN s.quantity - s.reserved_quantity <= 0 THEN 'SIN_STOCK' \
     WHEN s.quantity - s.reserved_quantity <= s.minimum_quantity THEN 'CRITICO' \
     WHEN s.quantity - s.reserved_quantity <= s.minimum_quantity * 1.5 THEN 'BAJO' \
     ELSE 'NORMAL' END)";

const ALERT_URGENCY_SQL: &str = "(CASE \
     WHEN s.quantity - s.reserved_quantity <= 0 THEN 1 \
     WHEN s.quantity - s.reserved_quantity <= s.minimum_quantity THEN 2 \
     WHEN s.quantity - s.reserved_quantity <= s.minimum_quantity * 1.5 THEN 3 \
     ELSE 4 END)";

const MOVEMENT_COLUMNS: &str = "id, product_id, warehouse_id, movement_type, quantity, \
     unit_price, occurred_at, note, user_id, reference, reference_type";

const MOVEMENT_VIEW_SELECT: &str = r#"
    SELECT m.id, m.product_id, p.code AS product_code, p.name AS product_name,
           m.warehouse_id, w.name AS warehouse_name, m.movement_type, m.quantity,
           m.unit_price, m.occurred_at, m.note, m.user_id, u.name AS user_name,
           m.reference, m.reference_type
    FROM inventory_movements m
    JOIN products p ON p.id = m.product_id
    JOIN warehouses w ON w.id = m.warehouse_id
    LEFT JOIN users u ON u.id = m.user_id
"#;

const MOVEMENT_COUNT_SELECT: &str = r#"
    SELECT COUNT(*)
    FROM inventory_movements m
    JOIN products p ON p.id = m.product_id
    JOIN warehouses w ON w.id = m.warehouse_id
"#;

const WAREHOUSE_COLUMNS: &str = "id, name, address, responsible, phone, capacity_m3, active, \
     created_at, updated_at";

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct StockRecord {
    id: Uuid,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: Decimal,
    minimum_quantity: Decimal,
    reserved_quantity: Decimal,
    last_entry_at: Option<DateTime<Utc>>,
    last_exit_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl From<StockRecord> for Stock {
    fn from(row: StockRecord) -> Self {
        Stock {
            id: row.id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            quantity: row.quantity,
            minimum_quantity: row.minimum_quantity,
            reserved_quantity: row.reserved_quantity,
            last_entry_at: row.last_entry_at,
            last_exit_at: row.last_exit_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockViewRecord {
    id: Uuid,
    product_id: Uuid,
    product_code: String,
    product_name: String,
    category_id: Option<Uuid>,
    category_name: String,
    warehouse_id: Uuid,
    warehouse_name: String,
    quantity: Decimal,
    minimum_quantity: Decimal,
    reserved_quantity: Decimal,
    last_entry_at: Option<DateTime<Utc>>,
    last_exit_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl From<StockViewRecord> for StockView {
    fn from(row: StockViewRecord) -> Self {
        let stock = Stock {
            id: row.id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            quantity: row.quantity,
            minimum_quantity: row.minimum_quantity,
            reserved_quantity: row.reserved_quantity,
            last_entry_at: row.last_entry_at,
            last_exit_at: row.last_exit_at,
            updated_at: row.updated_at,
        };
        StockView::new(
            &stock,
            StockLabels {
                product_code: row.product_code,
                product_name: row.product_name,
                category_id: row.category_id,
                category_name: row.category_name,
                warehouse_name: row.warehouse_name,
            },
        )
    }
}

#[derive(Debug, FromRow)]
struct MovementRecord {
    id: Uuid,
    product_id: Uuid,
    warehouse_id: Uuid,
    movement_type: String,
    quantity: Decimal,
    unit_price: Option<Decimal>,
    occurred_at: DateTime<Utc>,
    note: Option<String>,
    user_id: Option<Uuid>,
    reference: Option<String>,
    reference_type: Option<String>,
}

fn parse_movement_type(raw: &str) -> AppResult<MovementType> {
    raw.parse()
        .map_err(|e: String| AppError::Internal(format!("corrupt movement row: {}", e)))
}

impl TryFrom<MovementRecord> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRecord) -> AppResult<Self> {
        Ok(Movement {
            id: row.id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            movement_type: parse_movement_type(&row.movement_type)?,
            quantity: row.quantity,
            unit_price: row.unit_price,
            occurred_at: row.occurred_at,
            note: row.note,
            user_id: row.user_id,
            reference: row.reference,
            reference_type: row.reference_type,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementViewRecord {
    id: Uuid,
    product_id: Uuid,
    product_code: String,
    product_name: String,
    warehouse_id: Uuid,
    warehouse_name: String,
    movement_type: String,
    quantity: Decimal,
    unit_price: Option<Decimal>,
    occurred_at: DateTime<Utc>,
    note: Option<String>,
    user_id: Option<Uuid>,
    user_name: Option<String>,
    reference: Option<String>,
    reference_type: Option<String>,
}

impl TryFrom<MovementViewRecord> for MovementView {
    type Error = AppError;

    fn try_from(row: MovementViewRecord) -> AppResult<Self> {
        let movement = Movement {
            id: row.id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            movement_type: parse_movement_type(&row.movement_type)?,
            quantity: row.quantity,
            unit_price: row.unit_price,
            occurred_at: row.occurred_at,
            note: row.note,
            user_id: row.user_id,
            reference: row.reference,
            reference_type: row.reference_type,
        };
        Ok(MovementView::new(
            &movement,
            MovementLabels {
                product_code: row.product_code,
                product_name: row.product_name,
                warehouse_name: row.warehouse_name,
                user_name: row.user_name,
            },
        ))
    }
}

fn into_movement_views(rows: Vec<MovementViewRecord>) -> AppResult<Vec<MovementView>> {
    rows.into_iter().map(MovementView::try_from).collect()
}

#[derive(Debug, FromRow)]
struct ProductRecord {
    id: Uuid,
    code: String,
    name: String,
    category_id: Option<Uuid>,
    price: Decimal,
    minimum_stock: Decimal,
    supplier_id: Option<Uuid>,
    active: bool,
}

impl From<ProductRecord> for Product {
    fn from(row: ProductRecord) -> Self {
        Product {
            id: row.id,
            code: row.code,
            name: row.name,
            category_id: row.category_id,
            price: row.price,
            minimum_stock: row.minimum_stock,
            supplier_id: row.supplier_id,
            active: row.active,
        }
    }
}

#[derive(Debug, FromRow)]
struct WarehouseRecord {
    id: Uuid,
    name: String,
    address: Option<String>,
    responsible: Option<String>,
    phone: Option<String>,
    capacity_m3: Option<Decimal>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<WarehouseRecord> for Warehouse {
    fn from(row: WarehouseRecord) -> Self {
        Warehouse {
            id: row.id,
            name: row.name,
            address: row.address,
            responsible: row.responsible,
            phone: row.phone,
            capacity_m3: row.capacity_m3,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct WarehouseViewRecord {
    #[sqlx(flatten)]
    warehouse: WarehouseRecord,
    total_products: i64,
}

fn map_unique_violation(err: sqlx::Error, field: &str) -> AppError {
    let unique = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if unique {
        AppError::DuplicateEntry(field.to_string())
    } else {
        AppError::DatabaseError(err)
    }
}

fn like_pattern(term: &str) -> String {
    format!("%{}%", term)
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    if let Some((offset, limit)) = page.window() {
        qb.push(" LIMIT ").push_bind(limit as i64);
        qb.push(" OFFSET ").push_bind(offset as i64);
    }
}

fn direction_sql(descending: bool) -> &'static str {
    if descending {
        " DESC"
    } else {
        " ASC"
    }
}

fn push_stock_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &StockFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(&term);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR w.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(warehouse_id) = filter.id_bodega {
        qb.push(" AND s.warehouse_id = ").push_bind(warehouse_id);
    }

    if let Some(category_id) = filter.id_categoria {
        qb.push(" AND p.category_id = ").push_bind(category_id);
    }

    if let Some(level) = filter.alert_level() {
        qb.push(" AND ")
            .push(ALERT_LEVEL_SQL)
            .push(" = ")
            .push_bind(level.as_str());
    }
}

fn push_movement_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &MovementQuery) {
    let filter = &query.filter;
    qb.push(" WHERE 1 = 1");

    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(&term);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR w.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR m.reference ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(warehouse_id) = filter.id_bodega {
        qb.push(" AND m.warehouse_id = ").push_bind(warehouse_id);
    }

    if let Some(product_id) = filter.id_producto {
        qb.push(" AND m.product_id = ").push_bind(product_id);
    }

    if let Some(movement_type) = query.movement_type {
        qb.push(" AND m.movement_type = ")
            .push_bind(movement_type.as_str());
    }

    if let Some(from) = filter.from_bound() {
        qb.push(" AND m.occurred_at >= ").push_bind(from);
    }

    if let Some(until) = filter.until_bound() {
        qb.push(" AND m.occurred_at < ").push_bind(until);
    }
}

fn push_warehouse_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &WarehouseFilter) {
    qb.push(" WHERE 1 = 1");

    if filter.solo_activas {
        qb.push(" AND w.active = TRUE");
    }

    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(&term);
        qb.push(" AND (w.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR w.responsible ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR w.address ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

// ============================================================================
// Store
// ============================================================================

/// Store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database transaction; rolled back by sqlx when dropped uncommitted
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn lock_stock(&mut self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<Option<Stock>> {
        let row = sqlx::query_as::<_, StockRecord>(&format!(
            "SELECT {} FROM stock WHERE product_id = $1 AND warehouse_id = $2 FOR UPDATE",
            STOCK_COLUMNS
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Stock::from))
    }

    async fn lock_warehouse(&mut self, id: Uuid, mode: LockMode) -> AppResult<Option<Warehouse>> {
        let clause = match mode {
            LockMode::Share => "FOR SHARE",
            LockMode::Update => "FOR UPDATE",
        };
        let row = sqlx::query_as::<_, WarehouseRecord>(&format!(
            "SELECT {} FROM warehouses WHERE id = $1 {}",
            WAREHOUSE_COLUMNS, clause
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Warehouse::from))
    }

    async fn adjust_stock(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
        movement_type: MovementType,
        quantity: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<Stock> {
        check_adjustment(movement_type, quantity)?;

        let increase = movement_type.direction() == StockDirection::Increase;
        let delta = if increase { quantity } else { -quantity };

        // Unseen pair: start from zero with the product's threshold as minimum
        sqlx::query(
            r#"
            INSERT INTO stock (id, product_id, warehouse_id, quantity, minimum_quantity,
                               reserved_quantity, updated_at)
            SELECT $1, p.id, $3, 0, p.minimum_stock, 0, $4
            FROM products p
            WHERE p.id = $2
            ON CONFLICT (product_id, warehouse_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(warehouse_id)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        let updated = sqlx::query_as::<_, StockRecord>(&format!(
            r#"
            UPDATE stock
            SET quantity = quantity + $3,
                last_entry_at = CASE WHEN $4 THEN $5 ELSE last_entry_at END,
                last_exit_at = CASE WHEN $4 THEN last_exit_at ELSE $5 END,
                updated_at = $5
            WHERE product_id = $1 AND warehouse_id = $2
              AND quantity + $3 >= 0 AND quantity + $3 < $6
            RETURNING {}
            "#,
            STOCK_COLUMNS
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .bind(delta)
        .bind(increase)
        .bind(now)
        .bind(amount_ceiling())
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = updated {
            return Ok(row.into());
        }

        let current = sqlx::query_scalar::<_, Decimal>(
            "SELECT quantity FROM stock WHERE product_id = $1 AND warehouse_id = $2",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match current {
            Some(current)
                if current
                    .checked_add(delta)
                    .map_or(true, |next| !within_amount_range(next)) =>
            {
                Err(StockError::Overflow { current, quantity }.into())
            }
            Some(available) => Err(AppError::InsufficientStock {
                available,
                requested: -delta,
            }),
            None => Err(AppError::NotFound(Resource::Product)),
        }
    }

    async fn insert_movement(
        &mut self,
        movement: NewMovement,
        now: DateTime<Utc>,
    ) -> AppResult<Movement> {
        let row = sqlx::query_as::<_, MovementRecord>(&format!(
            r#"
            INSERT INTO inventory_movements (
                id, product_id, warehouse_id, movement_type, quantity, unit_price,
                occurred_at, note, user_id, reference, reference_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(movement.product_id)
        .bind(movement.warehouse_id)
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.unit_price)
        .bind(now)
        .bind(&movement.note)
        .bind(movement.user_id)
        .bind(&movement.reference)
        .bind(&movement.reference_type)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn insert_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO warehouses (id, name, address, responsible, phone, capacity_m3,
                                    active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(warehouse.id)
        .bind(&warehouse.name)
        .bind(&warehouse.address)
        .bind(&warehouse.responsible)
        .bind(&warehouse.phone)
        .bind(warehouse.capacity_m3)
        .bind(warehouse.active)
        .bind(warehouse.created_at)
        .bind(warehouse.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "nombre"))?;

        Ok(())
    }

    async fn update_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE warehouses
            SET name = $2, address = $3, responsible = $4, phone = $5,
                capacity_m3 = $6, active = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(warehouse.id)
        .bind(&warehouse.name)
        .bind(&warehouse.address)
        .bind(&warehouse.responsible)
        .bind(&warehouse.phone)
        .bind(warehouse.capacity_m3)
        .bind(warehouse.active)
        .bind(warehouse.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "nombre"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(Resource::Warehouse));
        }

        Ok(())
    }

    async fn seed_stock_for_warehouse(
        &mut self,
        warehouse_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO stock (id, product_id, warehouse_id, quantity, minimum_quantity,
                               reserved_quantity, updated_at)
            SELECT gen_random_uuid(), p.id, $1, 0, p.minimum_stock, 0, $2
            FROM products p
            WHERE p.active = TRUE
            ON CONFLICT (product_id, warehouse_id) DO NOTHING
            "#,
        )
        .bind(warehouse_id)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn warehouse_holds_stock(&mut self, warehouse_id: Uuid) -> AppResult<bool> {
        let holds = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock WHERE warehouse_id = $1 AND quantity > 0)",
        )
        .bind(warehouse_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(holds)
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> AppResult<PgTx> {
        let tx = self.pool.begin().await?;
        Ok(PgTx { tx })
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRecord>(
            r#"
            SELECT id, code, name, category_id, price, minimum_stock, supplier_id, active
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn find_warehouse(&self, id: Uuid) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, WarehouseRecord>(&format!(
            "SELECT {} FROM warehouses WHERE id = $1",
            WAREHOUSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Warehouse::from))
    }

    async fn list_warehouses(
        &self,
        filter: &WarehouseFilter,
        page: PageRequest,
    ) -> AppResult<Page<WarehouseView>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM warehouses w");
        push_warehouse_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT w.id, w.name, w.address, w.responsible, w.phone, w.capacity_m3, w.active,
                   w.created_at, w.updated_at,
                   (SELECT COUNT(*) FROM stock s WHERE s.warehouse_id = w.id) AS total_products
            FROM warehouses w
            "#,
        );
        push_warehouse_filters(&mut qb, filter);
        qb.push(if filter.sorts_by_creation() {
            " ORDER BY w.created_at"
        } else {
            " ORDER BY w.name"
        });
        qb.push(direction_sql(filter.descendente));
        push_page(&mut qb, page);

        let rows = qb.build_query_as::<WarehouseViewRecord>().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(|row| WarehouseView::new(&Warehouse::from(row.warehouse), row.total_products))
            .collect();

        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }

    async fn warehouse_name_exists(&self, name: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM warehouses
                WHERE LOWER(TRIM(name)) = LOWER(TRIM($1))
                  AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_stock(&self, id: Uuid) -> AppResult<Option<StockView>> {
        let row = sqlx::query_as::<_, StockViewRecord>(&format!(
            "{} WHERE s.id = $1",
            STOCK_VIEW_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StockView::from))
    }

    async fn find_stock_for(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<Option<StockView>> {
        let row = sqlx::query_as::<_, StockViewRecord>(&format!(
            "{} WHERE s.product_id = $1 AND s.warehouse_id = $2",
            STOCK_VIEW_SELECT
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StockView::from))
    }

    async fn list_stock(&self, scope: StockScope) -> AppResult<Vec<StockView>> {
        let mut qb = QueryBuilder::<Postgres>::new(STOCK_VIEW_SELECT);
        match scope {
            StockScope::All => {
                qb.push(" ORDER BY p.name");
            }
            StockScope::Warehouse(id) => {
                qb.push(" WHERE s.warehouse_id = ")
                    .push_bind(id)
                    .push(" ORDER BY p.name");
            }
            StockScope::Product(id) => {
                qb.push(" WHERE s.product_id = ")
                    .push_bind(id)
                    .push(" ORDER BY w.name");
            }
            StockScope::Low => {
                qb.push(
                    " WHERE s.quantity - s.reserved_quantity <= s.minimum_quantity \
                     ORDER BY s.quantity - s.reserved_quantity ASC",
                );
            }
        }

        let rows = qb.build_query_as::<StockViewRecord>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(StockView::from).collect())
    }

    async fn search_stock(
        &self,
        filter: &StockFilter,
        page: PageRequest,
    ) -> AppResult<Page<StockView>> {
        let mut count = QueryBuilder::<Postgres>::new(STOCK_COUNT_SELECT);
        push_stock_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(STOCK_VIEW_SELECT);
        push_stock_filters(&mut qb, filter);
        match filter.sort_key() {
            StockSortKey::Product => {
                qb.push(" ORDER BY p.name").push(direction_sql(filter.descendente));
            }
            StockSortKey::Warehouse => {
                qb.push(" ORDER BY w.name").push(direction_sql(filter.descendente));
            }
            StockSortKey::Available => {
                qb.push(" ORDER BY s.quantity - s.reserved_quantity")
                    .push(direction_sql(filter.descendente));
            }
            StockSortKey::Alert => {
                qb.push(" ORDER BY ")
                    .push(ALERT_URGENCY_SQL)
                    .push(" ASC, p.name ASC");
            }
        }
        push_page(&mut qb, page);

        let rows = qb.build_query_as::<StockViewRecord>().fetch_all(&self.pool).await?;
        Ok(Page {
            items: rows.into_iter().map(StockView::from).collect(),
            total: total.max(0) as u64,
        })
    }

    async fn find_movement(&self, id: Uuid) -> AppResult<Option<MovementView>> {
        let row = sqlx::query_as::<_, MovementViewRecord>(&format!(
            "{} WHERE m.id = $1",
            MOVEMENT_VIEW_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MovementView::try_from).transpose()
    }

    async fn list_movements(&self, scope: MovementScope) -> AppResult<Vec<MovementView>> {
        let mut qb = QueryBuilder::<Postgres>::new(MOVEMENT_VIEW_SELECT);
        match scope {
            MovementScope::All => {}
            MovementScope::Product(id) => {
                qb.push(" WHERE m.product_id = ").push_bind(id);
            }
            MovementScope::Warehouse(id) => {
                qb.push(" WHERE m.warehouse_id = ").push_bind(id);
            }
        }
        qb.push(" ORDER BY m.occurred_at DESC");

        let rows = qb.build_query_as::<MovementViewRecord>().fetch_all(&self.pool).await?;
        into_movement_views(rows)
    }

    async fn search_movements(
        &self,
        query: &MovementQuery,
        page: PageRequest,
    ) -> AppResult<Page<MovementView>> {
        let mut count = QueryBuilder::<Postgres>::new(MOVEMENT_COUNT_SELECT);
        push_movement_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(MOVEMENT_VIEW_SELECT);
        push_movement_filters(&mut qb, query);
        let column = match query.filter.sort_key() {
            MovementSortKey::Product => "p.name",
            MovementSortKey::Warehouse => "w.name",
            MovementSortKey::Quantity => "m.quantity",
            MovementSortKey::Date => "m.occurred_at",
        };
        qb.push(" ORDER BY ")
            .push(column)
            .push(direction_sql(query.filter.descendente));
        push_page(&mut qb, page);

        let rows = qb.build_query_as::<MovementViewRecord>().fetch_all(&self.pool).await?;
        Ok(Page {
            items: into_movement_views(rows)?,
            total: total.max(0) as u64,
        })
    }

    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, user_id, module, action, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(&entry.module)
        .bind(&entry.action)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
