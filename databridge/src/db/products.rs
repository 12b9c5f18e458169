//! Product database operations

use crate::models::Product;
use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// Insert or update a product by article id.
///
/// Product rows come from full spreadsheet imports, so the upsert lists
/// every field and last writer wins.
pub async fn upsert_product(pool: &SqlitePool, p: &Product) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO products (
            article_id, name, description, brand, color, tree_path, class_mapping,
            dimension1, dimension2, dimension3, dimension4, dimension5, dimension6,
            class_id1, class_id2, class_id3, class_id4, class_id5,
            price, weight_kg, in_stock, discontinued, launch_date,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(article_id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            brand = excluded.brand,
            color = excluded.color,
            tree_path = excluded.tree_path,
            class_mapping = excluded.class_mapping,
            dimension1 = excluded.dimension1,
            dimension2 = excluded.dimension2,
            dimension3 = excluded.dimension3,
            dimension4 = excluded.dimension4,
            dimension5 = excluded.dimension5,
            dimension6 = excluded.dimension6,
            class_id1 = excluded.class_id1,
            class_id2 = excluded.class_id2,
            class_id3 = excluded.class_id3,
            class_id4 = excluded.class_id4,
            class_id5 = excluded.class_id5,
            price = excluded.price,
            weight_kg = excluded.weight_kg,
            in_stock = excluded.in_stock,
            discontinued = excluded.discontinued,
            launch_date = excluded.launch_date,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(p.article_id)
    .bind(&p.name)
    .bind(&p.description)
    .bind(&p.brand)
    .bind(&p.color)
    .bind(&p.tree_path)
    .bind(&p.class_mapping)
    .bind(p.dimensions[0])
    .bind(p.dimensions[1])
    .bind(p.dimensions[2])
    .bind(p.dimensions[3])
    .bind(p.dimensions[4])
    .bind(p.dimensions[5])
    .bind(p.class_ids[0])
    .bind(p.class_ids[1])
    .bind(p.class_ids[2])
    .bind(p.class_ids[3])
    .bind(p.class_ids[4])
    .bind(p.price)
    .bind(p.weight_kg)
    .bind(p.in_stock)
    .bind(p.discontinued)
    .bind(&p.launch_date)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_by_article_id(pool: &SqlitePool, article_id: i64) -> Result<Option<Product>> {
    let row = sqlx::query(
        r#"
        SELECT article_id, name, description, brand, color, tree_path, class_mapping,
               dimension1, dimension2, dimension3, dimension4, dimension5, dimension6,
               class_id1, class_id2, class_id3, class_id4, class_id5,
               price, weight_kg, in_stock, discontinued, launch_date
        FROM products
        WHERE article_id = ?
        "#,
    )
    .bind(article_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| row_to_product(&row)))
}

pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Product>> {
    let rows = sqlx::query(
        r#"
        SELECT article_id, name, description, brand, color, tree_path, class_mapping,
               dimension1, dimension2, dimension3, dimension4, dimension5, dimension6,
               class_id1, class_id2, class_id3, class_id4, class_id5,
               price, weight_kg, in_stock, discontinued, launch_date
        FROM products
        ORDER BY article_id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row_to_product(&row)).collect())
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Product {
    Product {
        article_id: row.get("article_id"),
        name: row.get("name"),
        description: row.get("description"),
        brand: row.get("brand"),
        color: row.get("color"),
        tree_path: row.get("tree_path"),
        class_mapping: row.get("class_mapping"),
        dimensions: [
            row.get("dimension1"),
            row.get("dimension2"),
            row.get("dimension3"),
            row.get("dimension4"),
            row.get("dimension5"),
            row.get("dimension6"),
        ],
        class_ids: [
            row.get("class_id1"),
            row.get("class_id2"),
            row.get("class_id3"),
            row.get("class_id4"),
            row.get("class_id5"),
        ],
        price: row.get("price"),
        weight_kg: row.get("weight_kg"),
        in_stock: row.get("in_stock"),
        discontinued: row.get("discontinued"),
        launch_date: row.get("launch_date"),
    }
}
