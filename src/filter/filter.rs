use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, ScopeOptions, SqlResult};

/// Builds a tenant-scoped SELECT from a declarative FilterData. The scope
/// predicates (tenant_id, is_active) are always rendered first so callers
/// cannot drop them.
pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
    scope: ScopeOptions,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            select_columns: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
            scope: ScopeOptions::none(),
        })
    }

    pub fn scope(&mut self, scope: ScopeOptions) -> &mut Self {
        self.scope = scope;
        self
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(select) = data.select {
            self.select(select)?;
        }
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if let Some(limit) = data.limit {
            self.limit(limit, data.offset)?;
        }
        Ok(self)
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        Self::validate_select_columns(&columns)?;
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        let order_info = FilterOrder::validate_and_parse(&order_spec)?;
        self.order_data = order_info;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }

        // Cap to the configured maximum list size
        let max_limit = crate::config::CONFIG.api.max_list_limit;
        let applied_limit = if limit > max_limit {
            tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let select_clause = self.build_select_clause();
        let (where_clause, params) = self.build_where()?;
        let order_clause = FilterOrder::generate(&self.order_data)?;
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM \"{}\"", self.table_name),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.build_where()?;
        let query = if where_clause.is_empty() {
            format!("SELECT COUNT(*) as count FROM \"{}\"", self.table_name)
        } else {
            format!("SELECT COUNT(*) as count FROM \"{}\" WHERE {}", self.table_name, where_clause)
        };
        Ok(SqlResult { query, params })
    }

    fn build_where(&self) -> Result<(String, Vec<Value>), FilterError> {
        if let Some(ref where_data) = self.where_data {
            FilterWhere::generate(where_data, 0, &self.scope)
        } else {
            Ok(FilterWhere::generate_empty(&self.scope))
        }
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if name.is_empty() {
            return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string()));
        }
        let first = name.chars().next().unwrap();
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            || !(first.is_ascii_alphabetic() || first == '_')
        {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn validate_select_columns(columns: &[String]) -> Result<(), FilterError> {
        for column in columns {
            if column == "*" {
                continue;
            }
            if column.is_empty() {
                return Err(FilterError::InvalidColumn("Column name cannot be empty".to_string()));
            }
            let first = column.chars().next().unwrap();
            if !column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                || !(first.is_ascii_alphabetic() || first == '_')
            {
                return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
            }
        }
        Ok(())
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.contains(&"*".to_string()) {
            "*".to_string()
        } else {
            self.select_columns
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn full_query_shape() {
        let tenant = Uuid::new_v4();
        let mut filter = Filter::new("workflows").unwrap();
        filter.scope(ScopeOptions::tenant(tenant));
        filter
            .assign(FilterData {
                select: Some(vec!["id".into(), "name".into()]),
                where_clause: Some(json!({"status": "active"})),
                order: Some(json!("created_at desc")),
                limit: Some(25),
                offset: Some(50),
                ..Default::default()
            })
            .unwrap();

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"id\", \"name\" FROM \"workflows\" WHERE \"tenant_id\" = $1 AND \"is_active\" = TRUE AND \"status\" = $2 ORDER BY \"created_at\" DESC LIMIT 25 OFFSET 50"
        );
        assert_eq!(sql.params.len(), 2);
    }

    #[test]
    fn count_query_drops_order_and_limit() {
        let mut filter = Filter::new("dashboards").unwrap();
        filter.order(json!("name asc")).unwrap();
        filter.limit(10, None).unwrap();
        let sql = filter.to_count_sql().unwrap();
        assert!(sql.query.starts_with("SELECT COUNT(*) as count FROM \"dashboards\""));
        assert!(!sql.query.contains("LIMIT"));
    }

    #[test]
    fn limit_capped_to_config_max() {
        let mut filter = Filter::new("users").unwrap();
        filter.limit(1_000_000, None).unwrap();
        let sql = filter.to_sql().unwrap();
        let max = crate::config::CONFIG.api.max_list_limit;
        assert!(sql.query.contains(&format!("LIMIT {}", max)));
    }

    #[test]
    fn rejects_bad_table_names() {
        assert!(Filter::new("").is_err());
        assert!(Filter::new("users; DROP TABLE users").is_err());
        assert!(Filter::new("1users").is_err());
    }
}
