//! SQLite store for one city's reconciled data.
//!
//! Each `replace_city_data` call swaps the whole contents for the new city inside a
//! single transaction, so a failed write never leaves a half-replaced store behind.

use crate::common::constants::{GOOGLE_PLACES_SOURCE, YELP_SOURCE};
use crate::common::error::Result;
use crate::domain::{BusinessRecord, CategoryTally, CityData};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Primary,
    Secondary,
}

impl Source {
    /// Label stored in the category tables
    pub fn label(&self) -> &'static str {
        match self {
            Source::Primary => YELP_SOURCE,
            Source::Secondary => GOOGLE_PLACES_SOURCE,
        }
    }

    fn table(&self) -> &'static str {
        match self {
            Source::Primary => "primary_businesses",
            Source::Secondary => "secondary_businesses",
        }
    }
}

/// `(label, count, primary avg, blended avg, secondary avg)` for one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRatingRow {
    pub label: String,
    pub count: usize,
    pub primary_rating: Option<f64>,
    pub blended_rating: Option<f64>,
    pub secondary_rating: Option<f64>,
}

/// `(name, primary rating, blended rating, secondary rating)` for one matched restaurant
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantRatingRow {
    pub name: String,
    pub primary_rating: f64,
    pub blended_rating: Option<f64>,
    pub secondary_rating: f64,
}

pub struct RestaurantStore {
    conn: Connection,
}

impl RestaurantStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS primary_businesses (
                id           INTEGER PRIMARY KEY,
                name         TEXT NOT NULL,
                rating       REAL,
                avg_rating   REAL,
                review_count INTEGER,
                address      TEXT NOT NULL,
                city         TEXT NOT NULL,
                state        TEXT NOT NULL,
                latitude     REAL NOT NULL,
                longitude    REAL NOT NULL,
                price        TEXT,
                source_count INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS secondary_businesses (
                id           INTEGER PRIMARY KEY,
                name         TEXT NOT NULL,
                rating       REAL,
                avg_rating   REAL,
                review_count INTEGER,
                address      TEXT NOT NULL,
                city         TEXT NOT NULL,
                state        TEXT NOT NULL,
                latitude     REAL NOT NULL,
                longitude    REAL NOT NULL,
                price        TEXT,
                source_count INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS business_categories (
                source       TEXT NOT NULL,
                business_id  INTEGER NOT NULL,
                category     TEXT NOT NULL,
                PRIMARY KEY (source, business_id, category)
            );
            CREATE INDEX IF NOT EXISTS idx_business_categories_category
                ON business_categories (source, category);
            CREATE TABLE IF NOT EXISTS category_tallies (
                source       TEXT NOT NULL,
                category     TEXT NOT NULL,
                count        INTEGER NOT NULL,
                position     INTEGER NOT NULL,
                PRIMARY KEY (source, category)
            );
            CREATE TABLE IF NOT EXISTS city_runs (
                city         TEXT NOT NULL,
                generated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Replace everything with `data`. Run history in `city_runs` is kept.
    pub fn replace_city_data(&mut self, data: &CityData) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            r#"
            DELETE FROM primary_businesses;
            DELETE FROM secondary_businesses;
            DELETE FROM business_categories;
            DELETE FROM category_tallies;
            "#,
        )?;

        insert_records(&tx, Source::Primary, &data.primary)?;
        insert_records(&tx, Source::Secondary, &data.secondary)?;
        insert_tally(&tx, Source::Primary, &data.primary_tally)?;
        insert_tally(&tx, Source::Secondary, &data.secondary_tally)?;

        tx.execute(
            "INSERT INTO city_runs (city, generated_at) VALUES (?1, ?2)",
            params![data.city, chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        info!(
            city = %data.city,
            primary = data.primary.len(),
            secondary = data.secondary.len(),
            "Stored city data"
        );
        Ok(())
    }

    /// City of the most recent successful run, if any
    pub fn last_city(&self) -> Result<Option<String>> {
        let city = self
            .conn
            .query_row(
                "SELECT city FROM city_runs ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(city)
    }

    pub fn record_count(&self, source: Source) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", source.table());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Every stored record for `source`, ordered by id, categories included
    pub fn load_records(&self, source: Source) -> Result<Vec<BusinessRecord>> {
        let sql = format!(
            "SELECT id, name, rating, avg_rating, review_count, address, city, state,
                    latitude, longitude, price, source_count
             FROM {} ORDER BY id",
            source.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(BusinessRecord {
                id: row.get::<_, i64>(0)? as usize,
                name: row.get(1)?,
                rating: row.get(2)?,
                avg_rating: row.get(3)?,
                review_count: row.get::<_, Option<i64>>(4)?.map(|c| c as u32),
                address: row.get(5)?,
                city: row.get(6)?,
                state: row.get(7)?,
                latitude: row.get(8)?,
                longitude: row.get(9)?,
                price: row.get(10)?,
                categories: Vec::new(),
                source_count: row.get::<_, i64>(11)? as u8,
            })
        })?;
        let mut records = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        let mut cats = self.conn.prepare(
            "SELECT category FROM business_categories
             WHERE source = ?1 AND business_id = ?2 ORDER BY rowid",
        )?;
        for record in &mut records {
            record.categories = cats
                .query_map(params![source.label(), record.id as i64], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
        }
        Ok(records)
    }

    /// The `k` most frequent categories stored for `source`
    pub fn top_categories(&self, source: Source, k: usize) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, count FROM category_tallies
             WHERE source = ?1 ORDER BY position LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![source.label(), k as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Average primary, blended and secondary ratings of the matched restaurants in
    /// each primary category. Averages are `None` when no restaurant in the
    /// category was matched.
    pub fn category_rating_summary(
        &self,
        categories: &[(String, usize)],
    ) -> Result<Vec<CategoryRatingRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT AVG(p.rating), AVG(p.avg_rating), AVG(s.rating)
             FROM primary_businesses AS p
             JOIN secondary_businesses AS s ON s.id = p.id
             JOIN business_categories AS c ON c.source = ?1 AND c.business_id = p.id
             WHERE c.category = ?2",
        )?;

        let mut out = Vec::with_capacity(categories.len());
        for (label, count) in categories {
            let (primary_rating, blended_rating, secondary_rating) =
                stmt.query_row(params![Source::Primary.label(), label], |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                    ))
                })?;
            out.push(CategoryRatingRow {
                label: label.clone(),
                count: *count,
                primary_rating,
                blended_rating,
                secondary_rating,
            });
        }
        debug!(rows = out.len(), "Built category rating summary");
        Ok(out)
    }

    /// Ratings of every matched restaurant carrying `category` in the primary source
    pub fn restaurant_ratings(&self, category: &str) -> Result<Vec<RestaurantRatingRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.name, p.rating, p.avg_rating, s.rating
             FROM primary_businesses AS p
             JOIN secondary_businesses AS s ON s.id = p.id
             JOIN business_categories AS c ON c.source = ?1 AND c.business_id = p.id
             WHERE c.category = ?2
             ORDER BY p.id",
        )?;
        let rows = stmt.query_map(params![Source::Primary.label(), category], |row| {
            Ok(RestaurantRatingRow {
                name: row.get(0)?,
                primary_rating: row.get(1)?,
                blended_rating: row.get(2)?,
                secondary_rating: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

fn insert_records(tx: &Transaction<'_>, source: Source, records: &[BusinessRecord]) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} (id, name, rating, avg_rating, review_count, address, city, state,
                         latitude, longitude, price, source_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        source.table()
    );
    let mut insert = tx.prepare(&sql)?;
    let mut insert_category = tx.prepare(
        "INSERT OR IGNORE INTO business_categories (source, business_id, category)
         VALUES (?1, ?2, ?3)",
    )?;

    for r in records {
        insert.execute(params![
            r.id as i64,
            r.name,
            r.rating,
            r.avg_rating,
            r.review_count.map(i64::from),
            r.address,
            r.city,
            r.state,
            r.latitude,
            r.longitude,
            r.price,
            r.source_count as i64,
        ])?;
        for category in &r.categories {
            insert_category.execute(params![source.label(), r.id as i64, category])?;
        }
    }
    Ok(())
}

fn insert_tally(tx: &Transaction<'_>, source: Source, tally: &CategoryTally) -> Result<()> {
    let mut insert = tx.prepare(
        "INSERT INTO category_tallies (source, category, count, position) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, (category, count)) in tally.most_common(tally.len()).into_iter().enumerate() {
        insert.execute(params![source.label(), category, count as i64, position as i64])?;
    }
    Ok(())
}
