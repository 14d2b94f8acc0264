use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use feira_common::SearchFilters;

use super::contains_pattern;

// --- Query inputs ---

/// Store-level product constraint. Active-only is always applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Tenant scoping: only products owned by this organization.
    pub organization_id: Option<Uuid>,
    pub category: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    /// Any keyword contained in name or description.
    pub keywords: Vec<String>,
    /// Owning organization's name contains this.
    pub organization: Option<String>,
    /// Free text contained in name or description.
    pub text: Option<String>,
}

impl ProductFilter {
    pub fn from_search(filters: &SearchFilters, organization_id: Option<Uuid>) -> Self {
        Self {
            organization_id,
            category: filters.category.clone(),
            price_min: filters.price_min,
            price_max: filters.price_max,
            keywords: filters.keywords.clone(),
            organization: filters.organization.clone(),
            text: None,
        }
    }

    /// In-memory evaluation with the same semantics as the SQL conditions.
    pub fn matches(&self, product: &Product) -> bool {
        let contains = |haystack: &str, needle: &str| {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        };
        let in_text = |needle: &str| {
            contains(&product.name, needle) || contains(&product.description, needle)
        };

        product.is_active
            && self
                .organization_id
                .map_or(true, |id| product.organization.id == id)
            && self
                .category
                .as_deref()
                .map_or(true, |c| contains(&product.category.name, c))
            && self.price_min.map_or(true, |min| product.price >= min)
            && self.price_max.map_or(true, |max| product.price <= max)
            && (self.keywords.is_empty() || self.keywords.iter().any(|k| in_text(k)))
            && self
                .organization
                .as_deref()
                .map_or(true, |o| contains(&product.organization.name, o))
            && self.text.as_deref().map_or(true, in_text)
    }
}

/// One-based page plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    pub fn pages(&self, total: i64) -> i64 {
        if self.limit == 0 {
            return 0;
        }
        (total + i64::from(self.limit) - 1) / i64::from(self.limit)
    }

    pub fn summary(&self, total: i64) -> serde_json::Value {
        serde_json::json!({
            "page": self.page,
            "limit": self.limit,
            "total": total,
            "pages": self.pages(total),
        })
    }
}

// --- Product ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub stock_qty: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub category: CategoryRef,
    pub organization: OrganizationRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRef {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: f64,
    image_url: Option<String>,
    stock_qty: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    category_id: Uuid,
    category_name: String,
    organization_id: Uuid,
    organization_name: String,
    organization_description: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image_url: row.image_url,
            stock_qty: row.stock_qty,
            is_active: row.is_active,
            created_at: row.created_at,
            category: CategoryRef {
                id: row.category_id,
                name: row.category_name,
            },
            organization: OrganizationRef {
                id: row.organization_id,
                name: row.organization_name,
                description: row.organization_description,
            },
        }
    }
}

// --- Store ---

/// Filtered, paginated product lookup.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Matching page of products (newest first) and the total match count.
    async fn find_matching(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<(Vec<Product>, i64)>;
}

pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PRODUCT_COLUMNS: &str = "SELECT p.id, p.name, p.description, p.price::float8 AS price, \
     p.image_url, p.stock_qty, p.is_active, p.created_at, \
     c.id AS category_id, c.name AS category_name, \
     o.id AS organization_id, o.name AS organization_name, \
     o.description AS organization_description ";

const PRODUCT_FROM: &str = "FROM products p \
     JOIN categories c ON c.id = p.category_id \
     JOIN organizations o ON o.id = p.organization_id \
     WHERE p.is_active = TRUE ";

/// Append the WHERE conditions for `filter`. Expects `PRODUCT_FROM` already pushed.
fn push_conditions(qb: &mut QueryBuilder<'static, Postgres>, filter: &ProductFilter) {
    if let Some(id) = filter.organization_id {
        qb.push("AND p.organization_id = ");
        qb.push_bind(id);
        qb.push(" ");
    }
    if let Some(category) = &filter.category {
        qb.push("AND c.name ILIKE ");
        qb.push_bind(contains_pattern(category));
        qb.push(" ");
    }
    if let Some(min) = filter.price_min {
        qb.push("AND p.price::float8 >= ");
        qb.push_bind(min);
        qb.push(" ");
    }
    if let Some(max) = filter.price_max {
        qb.push("AND p.price::float8 <= ");
        qb.push_bind(max);
        qb.push(" ");
    }
    if !filter.keywords.is_empty() {
        qb.push("AND (");
        for (i, keyword) in filter.keywords.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            let pattern = contains_pattern(keyword);
            qb.push("p.name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR p.description ILIKE ");
            qb.push_bind(pattern);
        }
        qb.push(") ");
    }
    if let Some(organization) = &filter.organization {
        qb.push("AND o.name ILIKE ");
        qb.push_bind(contains_pattern(organization));
        qb.push(" ");
    }
    if let Some(text) = &filter.text {
        let pattern = contains_pattern(text);
        qb.push("AND (p.name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR p.description ILIKE ");
        qb.push_bind(pattern);
        qb.push(") ");
    }
}

fn select_query(filter: &ProductFilter, page: Pagination) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(PRODUCT_COLUMNS);
    qb.push(PRODUCT_FROM);
    push_conditions(&mut qb, filter);
    qb.push("ORDER BY p.created_at DESC OFFSET ");
    qb.push_bind(page.offset());
    qb.push(" LIMIT ");
    qb.push_bind(i64::from(page.limit));
    qb
}

fn count_query(filter: &ProductFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) ");
    qb.push(PRODUCT_FROM);
    push_conditions(&mut qb, filter);
    qb
}

#[async_trait]
impl ProductCatalog for PgProductStore {
    async fn find_matching(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<(Vec<Product>, i64)> {
        let rows: Vec<ProductRow> = select_query(filter, page)
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = count_query(filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Product::from).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Pagination {
        Pagination { page: 2, limit: 20 }
    }

    #[test]
    fn base_query_is_active_only_and_newest_first() {
        let sql = select_query(&ProductFilter::default(), page()).sql().to_string();
        assert!(sql.contains("WHERE p.is_active = TRUE"));
        assert!(sql.contains("ORDER BY p.created_at DESC OFFSET $1 LIMIT $2"));
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn every_filter_adds_a_bound_condition() {
        let filter = ProductFilter {
            organization_id: Some(Uuid::new_v4()),
            category: Some("Doces".into()),
            price_min: Some(10.0),
            price_max: Some(50.0),
            keywords: vec!["bolo".into(), "chocolate".into()],
            organization: Some("Esperança".into()),
            text: None,
        };
        let sql = count_query(&filter).sql().to_string();

        assert!(sql.starts_with("SELECT COUNT(*) FROM products p"));
        assert!(sql.contains("AND p.organization_id = $1"));
        assert!(sql.contains("AND c.name ILIKE $2"));
        assert!(sql.contains("AND p.price::float8 >= $3"));
        assert!(sql.contains("AND p.price::float8 <= $4"));
        assert!(sql.contains(
            "AND (p.name ILIKE $5 OR p.description ILIKE $6 OR p.name ILIKE $7 OR p.description ILIKE $8)"
        ));
        assert!(sql.contains("AND o.name ILIKE $9"));
    }

    #[test]
    fn pagination_math() {
        assert_eq!(page().offset(), 20);
        assert_eq!(Pagination { page: 1, limit: 20 }.offset(), 0);
        assert_eq!(page().pages(0), 0);
        assert_eq!(page().pages(20), 1);
        assert_eq!(page().pages(21), 2);
    }

    fn product(name: &str, price: f64, category: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            price,
            image_url: None,
            stock_qty: 1,
            is_active: true,
            created_at: Utc::now(),
            category: CategoryRef {
                id: Uuid::new_v4(),
                name: category.into(),
            },
            organization: OrganizationRef {
                id: Uuid::new_v4(),
                name: "ONG Esperança".into(),
                description: None,
            },
        }
    }

    #[test]
    fn in_memory_matching_follows_filter() {
        let bolo = product("Bolo de Chocolate", 35.0, "Doces");
        let search = SearchFilters {
            category: Some("doces".into()),
            price_max: Some(50.0),
            keywords: vec!["chocolate".into(), "morango".into()],
            ..Default::default()
        };
        assert!(ProductFilter::from_search(&search, None).matches(&bolo));

        let inverted = ProductFilter {
            price_min: Some(60.0),
            price_max: Some(50.0),
            ..Default::default()
        };
        assert!(!inverted.matches(&bolo));

        let inactive = Product {
            is_active: false,
            ..bolo.clone()
        };
        assert!(!ProductFilter::default().matches(&inactive));

        let other_tenant = ProductFilter::from_search(&SearchFilters::default(), Some(Uuid::new_v4()));
        assert!(!other_tenant.matches(&bolo));
    }
}
