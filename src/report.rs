//! Text rendering of the stored ratings.
//!
//! Each view corresponds to one `display` keyword combination. Keywords can come in
//! any order.

use crate::storage::{CategoryRatingRow, RestaurantRatingRow};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRequest {
    /// `ratings categories scatter`
    CategoryRatingsScatter,
    /// `ratings categories pie`
    CategoryRatingsPie,
    /// `ratings restaurants scatter`
    RestaurantRatingsScatter,
    /// `proportions categories pie`
    CategoryProportionsPie,
}

impl DisplayRequest {
    pub fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Option<Self> {
        let has = |word: &str| keywords.iter().any(|k| k.as_ref().eq_ignore_ascii_case(word));

        if has("ratings") && has("categories") && has("scatter") {
            Some(DisplayRequest::CategoryRatingsScatter)
        } else if has("ratings") && has("categories") && has("pie") {
            Some(DisplayRequest::CategoryRatingsPie)
        } else if has("ratings") && has("restaurants") && has("scatter") {
            Some(DisplayRequest::RestaurantRatingsScatter)
        } else if has("proportions") && has("categories") && has("pie") {
            Some(DisplayRequest::CategoryProportionsPie)
        } else {
            None
        }
    }

    pub fn usage() -> &'static [&'static str] {
        &[
            "ratings categories scatter",
            "ratings categories pie",
            "ratings restaurants scatter",
            "proportions categories pie",
        ]
    }
}

fn rating(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn share(part: f64, whole: f64) -> String {
    if whole > 0.0 {
        format!("{:.1}%", part / whole * 100.0)
    } else {
        "-".to_string()
    }
}

/// Left-aligned first column, right-aligned numbers
fn table(title: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let render = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == 0 {
                    format!("{:<w$}", c, w = widths[i])
                } else {
                    format!("{:>w$}", c, w = widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };
    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let _ = writeln!(out, "{}", render(&header[..]));
    let rule_len = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    let _ = writeln!(out, "{}", "-".repeat(rule_len));
    for row in rows {
        let _ = writeln!(out, "{}", render(&row[..]));
    }
    out
}

pub fn render_category_ratings(rows: &[CategoryRatingRow]) -> String {
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.label.clone(),
                r.count.to_string(),
                rating(r.primary_rating),
                rating(r.blended_rating),
                rating(r.secondary_rating),
            ]
        })
        .collect();
    table(
        &format!("Average Ratings for Top {} Categories", rows.len()),
        &["Category", "Count", "Yelp", "Yelp + Google", "Google"],
        &body,
    )
}

pub fn render_category_rating_shares(rows: &[CategoryRatingRow]) -> String {
    let total: f64 = rows.iter().filter_map(|r| r.blended_rating).sum();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.label.clone(),
                rating(r.blended_rating),
                share(r.blended_rating.unwrap_or(0.0), total),
            ]
        })
        .collect();
    table(
        &format!("Top {} Categories' Average Ratings", rows.len()),
        &["Category", "Yelp + Google", "Share"],
        &body,
    )
}

pub fn render_restaurant_ratings(category: &str, rows: &[RestaurantRatingRow]) -> String {
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                rating(Some(r.primary_rating)),
                rating(r.blended_rating),
                rating(Some(r.secondary_rating)),
            ]
        })
        .collect();
    table(
        &format!("Ratings for Restaurants in {}", category),
        &["Restaurant", "Yelp", "Yelp + Google", "Google"],
        &body,
    )
}

pub fn render_category_proportions(top: &[(String, usize)]) -> String {
    let total: usize = top.iter().map(|(_, c)| *c).sum();
    let body: Vec<Vec<String>> = top
        .iter()
        .map(|(label, count)| vec![label.clone(), count.to_string(), share(*count as f64, total as f64)])
        .collect();
    table(
        &format!("Top {} Categories' Sizes", top.len()),
        &["Category", "Restaurants", "Share"],
        &body,
    )
}

/// Numbered list used when asking the user to pick a category
pub fn render_category_menu(top: &[(String, usize)]) -> String {
    let mut out = String::new();
    for (i, (label, _)) in top.iter().enumerate() {
        let _ = writeln!(out, "{} {}", i + 1, label);
    }
    out
}
