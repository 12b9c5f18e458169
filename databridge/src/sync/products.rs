//! Product import
//!
//! Takes a spreadsheet-shaped listing (header row plus value rows), builds
//! typed products per row and upserts them by article id. A malformed row
//! fails alone; the rest of the sheet still imports.

use crate::db;
use crate::models::Product;
use anyhow::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Outcome of one product import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProductImportReport {
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
}

pub async fn import_products(
    pool: &SqlitePool,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<ProductImportReport> {
    let mut report = ProductImportReport {
        total: rows.len(),
        ..Default::default()
    };

    for (index, cells) in rows.iter().enumerate() {
        match Product::from_row(headers, cells) {
            Ok(product) => {
                db::products::upsert_product(pool, &product).await?;
                report.imported += 1;
            }
            Err(e) => {
                warn!(row = index, error = %e, "Product row import failed");
                report.failed += 1;
            }
        }
    }

    info!(
        total = report.total,
        imported = report.imported,
        failed = report.failed,
        "Product import complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use databridge_common::db::init_memory_database;

    fn headers() -> Vec<String> {
        ["ArticleId", "Name", "TreePath", "ClassMapping", "Price"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn import_is_an_upsert_by_article_id() {
        let pool = init_memory_database().await.unwrap();
        let headers = headers();

        let first = import_products(
            &pool,
            &headers,
            &[row(&["1234", "Widget", "/1000/15500", "30,28", "19.95"])],
        )
        .await
        .unwrap();
        assert_eq!(first.imported, 1);

        let second = import_products(
            &pool,
            &headers,
            &[row(&["1234", "Widget v2", "/1000/15500", "30,28", "24.95"])],
        )
        .await
        .unwrap();
        assert_eq!(second.imported, 1);

        let product = db::products::load_by_article_id(&pool, 1234)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.name.as_deref(), Some("Widget v2"));
        assert_eq!(product.price, Some(24.95));

        let all = db::products::list(&pool, 100, 0).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn malformed_row_fails_alone() {
        let pool = init_memory_database().await.unwrap();

        let report = import_products(
            &pool,
            &headers(),
            &[
                row(&["1", "Good", "/1000", "30", "1.00"]),
                row(&["2", "Bad tree", "/not-a-number", "30", "1.00"]),
                row(&["3", "Also good", "", "", ""]),
            ],
        )
        .await
        .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.imported, 2);
        assert_eq!(report.failed, 1);
    }
}
