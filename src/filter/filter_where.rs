use serde_json::{json, Value};

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo, ScopeOptions};

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    pub fn generate(
        where_data: &Value,
        starting_param_index: usize,
        scope: &ScopeOptions,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(where_data, scope)
    }

    pub fn generate_empty(scope: &ScopeOptions) -> (String, Vec<Value>) {
        let mut filter_where = Self::new(0);
        let conditions = filter_where.scope_conditions(scope);
        let where_clause = if conditions.is_empty() { "1=1".to_string() } else { conditions.join(" AND ") };
        (where_clause, filter_where.param_values)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        if where_data.is_null() {
            return Ok(());
        }
        match where_data {
            Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value, scope: &ScopeOptions) -> Result<(String, Vec<Value>), FilterError> {
        let mut sql_conditions = self.scope_conditions(scope);

        self.parse_where_data(where_data)?;

        let conditions_snapshot = self.conditions.clone();
        for condition in &conditions_snapshot {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        Ok((where_clause, self.param_values.clone()))
    }

    /// Tenant ownership and soft-delete predicates, bound before any
    /// caller-supplied condition.
    fn scope_conditions(&mut self, scope: &ScopeOptions) -> Vec<String> {
        let mut conditions = vec![];
        if let Some(tenant_id) = scope.tenant_id {
            conditions.push(format!("\"tenant_id\" = {}", self.param(json!(tenant_id.to_string()))));
        }
        if !scope.include_inactive {
            conditions.push("\"is_active\" = TRUE".to_string());
        }
        conditions
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        self.parse_logical_operator(key, value)?;
                    } else {
                        self.parse_field_condition(key, value)?;
                    }
                }
                Ok(())
            }
            Value::Null => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_logical_operator(&mut self, op: &str, value: &Value) -> Result<(), FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut sql_parts = Vec::new();
                for v in arr {
                    let (sql, params) = Self::generate(v, self.param_index, &ScopeOptions::none())?;
                    self.param_values.extend(params);
                    sql_parts.push(format!("({})", sql));
                    self.param_index = self.param_values.len();
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                let combined = sql_parts.join(joiner);
                self.conditions.push(FilterWhereInfo {
                    column: combined,
                    operator: FilterOp::Composite,
                    data: Value::Null,
                });
                Ok(())
            }
            "$not" => {
                let (sql, params) = Self::generate(value, self.param_index, &ScopeOptions::none())?;
                self.param_values.extend(params);
                self.param_index = self.param_values.len();
                self.conditions.push(FilterWhereInfo {
                    column: format!("NOT ({})", sql),
                    operator: FilterOp::Composite,
                    data: Value::Null,
                });
                Ok(())
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        Self::validate_column(field)?;
        if let Value::Object(obj) = value {
            for (op_key, op_val) in obj {
                let operator = Self::map_operator(op_key)?;
                self.conditions.push(FilterWhereInfo {
                    column: field.to_string(),
                    operator,
                    data: op_val.clone(),
                });
            }
        } else {
            // Implicit equality: { field: value }
            self.conditions.push(FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            });
        }
        Ok(())
    }

    fn validate_column(name: &str) -> Result<(), FilterError> {
        if name.is_empty() {
            return Err(FilterError::InvalidColumn("Column name cannot be empty".to_string()));
        }
        let mut chars = name.chars();
        let first = chars.next().unwrap();
        if !(first.is_ascii_alphabetic() || first == '_')
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", name)));
        }
        Ok(())
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$between" => FilterOp::Between,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        // Composite conditions already carry rendered SQL
        if condition.operator == FilterOp::Composite {
            return Ok(condition.column.clone());
        }

        let quoted_column = format!("\"{}\"", condition.column);
        let sql = match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    format!("{} IS NULL", quoted_column)
                } else {
                    format!("{} = {}", quoted_column, self.param(condition.data.clone()))
                }
            }
            FilterOp::Ne => {
                if condition.data.is_null() {
                    format!("{} IS NOT NULL", quoted_column)
                } else {
                    format!("{} <> {}", quoted_column, self.param(condition.data.clone()))
                }
            }
            FilterOp::Gt => format!("{} > {}", quoted_column, self.param(condition.data.clone())),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(condition.data.clone())),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(condition.data.clone())),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.param(condition.data.clone())),
            FilterOp::Like => format!("{} LIKE {}", quoted_column, self.param(condition.data.clone())),
            FilterOp::ILike => format!("{} ILIKE {}", quoted_column, self.param(condition.data.clone())),
            FilterOp::In | FilterOp::NIn => {
                let negated = condition.operator == FilterOp::NIn;
                if let Value::Array(values) = &condition.data {
                    if values.is_empty() {
                        // IN () is invalid SQL; empty set matches nothing
                        return Ok(if negated { "1=1".to_string() } else { "1=0".to_string() });
                    }
                    let params: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                    let keyword = if negated { "NOT IN" } else { "IN" };
                    format!("{} {} ({})", quoted_column, keyword, params.join(", "))
                } else {
                    return Err(FilterError::InvalidOperatorData("$in requires an array".to_string()));
                }
            }
            FilterOp::Between => {
                if let Value::Array(values) = &condition.data {
                    if values.len() != 2 {
                        return Err(FilterError::InvalidOperatorData(
                            "$between requires exactly 2 values".to_string(),
                        ));
                    }
                    format!(
                        "{} BETWEEN {} AND {}",
                        quoted_column,
                        self.param(values[0].clone()),
                        self.param(values[1].clone())
                    )
                } else {
                    return Err(FilterError::InvalidOperatorData(
                        "$between requires array with 2 values".to_string(),
                    ));
                }
            }
            FilterOp::Composite => unreachable!(),
        };
        Ok(sql)
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn implicit_equality() {
        let (sql, params) =
            FilterWhere::generate(&json!({"name": "sales"}), 0, &ScopeOptions::none()).unwrap();
        assert_eq!(sql, "\"name\" = $1");
        assert_eq!(params, vec![json!("sales")]);
    }

    #[test]
    fn tenant_scope_binds_first_param() {
        let tenant = Uuid::new_v4();
        let (sql, params) =
            FilterWhere::generate(&json!({"kind": "postgresql"}), 0, &ScopeOptions::tenant(tenant)).unwrap();
        assert_eq!(sql, "\"tenant_id\" = $1 AND \"is_active\" = TRUE AND \"kind\" = $2");
        assert_eq!(params[0], json!(tenant.to_string()));
        assert_eq!(params[1], json!("postgresql"));
    }

    #[test]
    fn comparison_operators() {
        let (sql, params) = FilterWhere::generate(
            &json!({"usage_count": {"$gte": 10, "$lt": 100}}),
            0,
            &ScopeOptions::none(),
        )
        .unwrap();
        assert_eq!(sql, "\"usage_count\" >= $1 AND \"usage_count\" < $2");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn in_with_empty_array_matches_nothing() {
        let (sql, params) =
            FilterWhere::generate(&json!({"status": {"$in": []}}), 0, &ScopeOptions::none()).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn or_subclauses() {
        let (sql, params) = FilterWhere::generate(
            &json!({"$or": [{"status": "draft"}, {"status": "active"}]}),
            0,
            &ScopeOptions::none(),
        )
        .unwrap();
        assert_eq!(sql, "(\"status\" = $1) OR (\"status\" = $2)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn null_equality_becomes_is_null() {
        let (sql, params) =
            FilterWhere::generate(&json!({"last_used_at": null}), 0, &ScopeOptions::none()).unwrap();
        assert_eq!(sql, "\"last_used_at\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_malformed_column() {
        assert!(FilterWhere::generate(&json!({"a;drop": 1}), 0, &ScopeOptions::none()).is_err());
    }

    #[test]
    fn rejects_unknown_operator() {
        assert!(FilterWhere::generate(&json!({"a": {"$regex": "x"}}), 0, &ScopeOptions::none()).is_err());
    }
}
