use serde::Serialize;

/// Snapshot of the database catalog, derived on demand and used only as
/// LLM prompt context.
#[derive(Debug, Clone, Serialize, Default)]
pub struct SchemaDescription {
    pub tables: Vec<TableSchema>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

impl SchemaDescription {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Renders the catalog as prompt text, one block per table:
    ///
    /// ```text
    /// Table: users
    /// Columns: id (INTEGER), name (VARCHAR), email (VARCHAR)
    /// ```
    pub fn to_prompt(&self) -> String {
        if self.is_empty() {
            return "No tables found in database.".to_string();
        }

        self.tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.data_type))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Table: {}\nColumns: {}", table.name, columns)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_table() -> TableSchema {
        TableSchema {
            name: "users".to_string(),
            columns: vec![
                ColumnSchema {
                    name: "id".to_string(),
                    data_type: "INTEGER".to_string(),
                },
                ColumnSchema {
                    name: "name".to_string(),
                    data_type: "VARCHAR".to_string(),
                },
            ],
        }
    }

    #[test]
    fn prompt_rendering() {
        let schema = SchemaDescription {
            tables: vec![users_table()],
        };
        assert_eq!(
            schema.to_prompt(),
            "Table: users\nColumns: id (INTEGER), name (VARCHAR)"
        );
    }

    #[test]
    fn empty_schema_has_placeholder() {
        let schema = SchemaDescription::default();
        assert!(schema.is_empty());
        assert_eq!(schema.to_prompt(), "No tables found in database.");
    }
}
