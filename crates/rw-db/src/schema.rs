use std::collections::BTreeSet;

use sqlx::PgPool;

/// Columns the reader selects, per table.
pub const EXPECTED_COLUMNS: &[(&str, &[&str])] = &[
    ("game_copies", &["copy_id", "game_id", "status"]),
    (
        "rentals",
        &[
            "rental_id",
            "copy_id",
            "game_id",
            "game_name",
            "user_id",
            "renter_name",
            "type",
            "borrowed_at",
            "due_date",
            "returned_at",
        ],
    ),
];

/// `table.column` entries from [`EXPECTED_COLUMNS`] absent in `found`.
/// Output follows declaration order.
pub fn missing_columns(found: &[(String, String)]) -> Vec<String> {
    let have: BTreeSet<(&str, &str)> = found
        .iter()
        .map(|(t, c)| (t.as_str(), c.as_str()))
        .collect();

    EXPECTED_COLUMNS
        .iter()
        .flat_map(|(table, cols)| cols.iter().map(move |c| (*table, *c)))
        .filter(|key| !have.contains(key))
        .map(|(t, c)| format!("{t}.{c}"))
        .collect()
}

/// Query `information_schema.columns` in the current schema.
pub async fn probe_schema(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    let tables: Vec<String> = EXPECTED_COLUMNS
        .iter()
        .map(|(t, _)| t.to_string())
        .collect();

    let found: Vec<(String, String)> = sqlx::query_as(
        r#"
        select table_name::text, column_name::text
        from information_schema.columns
        where table_schema = current_schema()
          and table_name = any($1)
        "#,
    )
    .bind(tables)
    .fetch_all(pool)
    .await?;

    Ok(missing_columns(&found))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(table: &str, names: &[&str]) -> Vec<(String, String)> {
        names
            .iter()
            .map(|c| (table.to_string(), c.to_string()))
            .collect()
    }

    #[test]
    fn complete_schema_has_nothing_missing() {
        let mut found = Vec::new();
        for (t, c) in EXPECTED_COLUMNS {
            found.extend(cols(t, c));
        }
        found.push(("rentals".into(), "notes".into()));
        assert!(missing_columns(&found).is_empty());
    }

    #[test]
    fn missing_columns_are_named_in_order() {
        let mut found = cols("game_copies", &["copy_id", "game_id", "status"]);
        found.extend(cols(
            "rentals",
            &["rental_id", "copy_id", "game_id", "game_name", "borrowed_at", "returned_at"],
        ));
        assert_eq!(
            missing_columns(&found),
            vec![
                "rentals.user_id",
                "rentals.renter_name",
                "rentals.type",
                "rentals.due_date"
            ]
        );
    }
}
