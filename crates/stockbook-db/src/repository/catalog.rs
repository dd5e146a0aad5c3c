//! # Catalog Repository
//!
//! Branches, products and variants as seen by the stock ledger.
//!
//! The full catalog belongs to other services. The ledger only needs to
//! answer "does this exist for the tenant?" and to read a product's reorder
//! level, so this repository keeps the surface small.
//!
//! ## Existence Checks During Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ensure_scope(tenant, product, variant?, branch)                        │
//! │       │                                                                 │
//! │       ├── product missing for tenant     → NotFound("Product")         │
//! │       ├── variant missing for tenant     → NotFound("ProductVariant")  │
//! │       ├── variant of another product     → Validation(Mismatch)        │
//! │       └── branch missing for tenant      → NotFound("Branch")          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockbook_core::validation::{validate_code, validate_name};
use stockbook_core::{Branch, Product, ProductVariant, Quantity, ScopeKey, ValidationError};

const BRANCH_COLUMNS: &str = "id, tenant_id, code, name, is_active, created_at";
const PRODUCT_COLUMNS: &str = "id, tenant_id, sku, name, reorder_level, is_active, created_at";
const VARIANT_COLUMNS: &str = "id, tenant_id, product_id, sku, name, is_active, created_at";

/// Repository for catalog records.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// Registers a branch.
    pub async fn create_branch(&self, tenant_id: i64, code: &str, name: &str) -> DbResult<Branch> {
        validate_code("code", code)?;
        validate_name(name)?;

        let sql = format!(
            "INSERT INTO branches (tenant_id, code, name, is_active, created_at) \
             VALUES (?1, ?2, ?3, 1, ?4) RETURNING {}",
            BRANCH_COLUMNS
        );
        let branch: Branch = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(code.trim())
            .bind(name.trim())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| duplicate_as_validation(e.into(), "code", code))?;

        debug!(branch_id = branch.id, code = %branch.code, "Created branch");
        Ok(branch)
    }

    /// Gets a branch by ID.
    pub async fn get_branch(&self, tenant_id: i64, id: i64) -> DbResult<Option<Branch>> {
        let mut conn = self.pool.acquire().await?;
        fetch_branch(&mut conn, tenant_id, id).await
    }

    pub async fn branch_exists(&self, tenant_id: i64, id: i64) -> DbResult<bool> {
        Ok(self.get_branch(tenant_id, id).await?.is_some())
    }

    /// Lists a tenant's branches ordered by code.
    pub async fn list_branches(&self, tenant_id: i64) -> DbResult<Vec<Branch>> {
        let sql = format!(
            "SELECT {} FROM branches WHERE tenant_id = ?1 ORDER BY code",
            BRANCH_COLUMNS
        );
        let branches = sqlx::query_as(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(branches)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Registers a product.
    ///
    /// ## Arguments
    /// * `reorder_level` - Balance at or below which the product needs reorder
    pub async fn create_product(
        &self,
        tenant_id: i64,
        sku: &str,
        name: &str,
        reorder_level: Option<Quantity>,
    ) -> DbResult<Product> {
        validate_code("sku", sku)?;
        validate_name(name)?;
        if reorder_level.is_some_and(|level| level.is_negative()) {
            return Err(ValidationError::MustNotBeNegative {
                field: "reorder_level".to_string(),
            }
            .into());
        }

        let sql = format!(
            "INSERT INTO products (tenant_id, sku, name, reorder_level, is_active, created_at) \
             VALUES (?1, ?2, ?3, ?4, 1, ?5) RETURNING {}",
            PRODUCT_COLUMNS
        );
        let product: Product = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(sku.trim())
            .bind(name.trim())
            .bind(reorder_level)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| duplicate_as_validation(e.into(), "sku", sku))?;

        debug!(product_id = product.id, sku = %product.sku, "Created product");
        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, tenant_id: i64, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, tenant_id, id).await
    }

    /// Gets a product by its SKU.
    pub async fn get_product_by_sku(&self, tenant_id: i64, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE tenant_id = ?1 AND sku = ?2",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn product_exists(&self, tenant_id: i64, id: i64) -> DbResult<bool> {
        Ok(self.get_product(tenant_id, id).await?.is_some())
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// Registers a variant of a product.
    pub async fn create_variant(
        &self,
        tenant_id: i64,
        product_id: i64,
        sku: &str,
        name: &str,
    ) -> DbResult<ProductVariant> {
        validate_code("sku", sku)?;
        validate_name(name)?;

        let mut conn = self.pool.acquire().await?;
        if fetch_product(&mut conn, tenant_id, product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        let sql = format!(
            "INSERT INTO product_variants (tenant_id, product_id, sku, name, is_active, created_at) \
             VALUES (?1, ?2, ?3, ?4, 1, ?5) RETURNING {}",
            VARIANT_COLUMNS
        );
        let variant: ProductVariant = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(product_id)
            .bind(sku.trim())
            .bind(name.trim())
            .bind(Utc::now())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| duplicate_as_validation(e.into(), "sku", sku))?;

        debug!(variant_id = variant.id, product_id, "Created product variant");
        Ok(variant)
    }

    /// Gets a variant by ID.
    pub async fn get_variant(&self, tenant_id: i64, id: i64) -> DbResult<Option<ProductVariant>> {
        let mut conn = self.pool.acquire().await?;
        fetch_variant(&mut conn, tenant_id, id).await
    }

    pub async fn variant_exists(&self, tenant_id: i64, id: i64) -> DbResult<bool> {
        Ok(self.get_variant(tenant_id, id).await?.is_some())
    }

    /// Lists the variants of a product.
    pub async fn list_variants(&self, tenant_id: i64, product_id: i64) -> DbResult<Vec<ProductVariant>> {
        let sql = format!(
            "SELECT {} FROM product_variants WHERE tenant_id = ?1 AND product_id = ?2 ORDER BY id",
            VARIANT_COLUMNS
        );
        let variants = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(variants)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch_branch(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    id: i64,
) -> DbResult<Option<Branch>> {
    let sql = format!(
        "SELECT {} FROM branches WHERE tenant_id = ?1 AND id = ?2",
        BRANCH_COLUMNS
    );
    let branch = sqlx::query_as(&sql)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(branch)
}

pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    id: i64,
) -> DbResult<Option<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE tenant_id = ?1 AND id = ?2",
        PRODUCT_COLUMNS
    );
    let product = sqlx::query_as(&sql)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

pub(crate) async fn fetch_variant(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    id: i64,
) -> DbResult<Option<ProductVariant>> {
    let sql = format!(
        "SELECT {} FROM product_variants WHERE tenant_id = ?1 AND id = ?2",
        VARIANT_COLUMNS
    );
    let variant = sqlx::query_as(&sql)
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(variant)
}

/// Product must exist; a variant, when given, must exist and belong to it.
pub(crate) async fn ensure_product(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
) -> DbResult<Product> {
    let product = fetch_product(&mut *conn, tenant_id, product_id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product_id))?;

    if let Some(variant_id) = variant_id {
        let variant = fetch_variant(&mut *conn, tenant_id, variant_id)
            .await?
            .ok_or_else(|| DbError::not_found("ProductVariant", variant_id))?;

        if variant.product_id != product_id {
            return Err(ValidationError::Mismatch {
                field: "variant_id".to_string(),
                value: variant_id.to_string(),
                owner: format!("product {}", product_id),
            }
            .into());
        }
    }

    Ok(product)
}

pub(crate) async fn ensure_branch(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    branch_id: i64,
) -> DbResult<Branch> {
    fetch_branch(conn, tenant_id, branch_id)
        .await?
        .ok_or_else(|| DbError::not_found("Branch", branch_id))
}

/// Every record a scope names must exist for the tenant.
pub(crate) async fn ensure_scope(conn: &mut SqliteConnection, scope: &ScopeKey) -> DbResult<Product> {
    let product = ensure_product(&mut *conn, scope.tenant_id, scope.product_id, scope.variant_id).await?;
    ensure_branch(&mut *conn, scope.tenant_id, scope.branch_id).await?;
    Ok(product)
}

/// Turns a UNIQUE violation into a field-level validation error.
fn duplicate_as_validation(err: DbError, field: &str, value: &str) -> DbError {
    match err {
        DbError::UniqueViolation { .. } => ValidationError::Duplicate {
            field: field.to_string(),
            value: value.trim().to_string(),
        }
        .into(),
        other => other,
    }
}
