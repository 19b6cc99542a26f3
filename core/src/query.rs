use serde::Serialize;

/// Equality filter on a single column (`column = value`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

/// A related table embedded into each row through a foreign key.
///
/// `Join::new("agents", "agent_id", ["name"])` renders as `agents(name)` and
/// yields rows shaped like `{ ..., "agents": { "name": "..." } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Join {
    pub table: String,
    pub foreign_key: String,
    pub columns: Vec<String>,
}

impl Join {
    pub fn new<I, S>(table: &str, foreign_key: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// A user-scoped list request against one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    pub table: String,
    /// Selected columns. Empty selects every column.
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<Join>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

impl ListQuery {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            filters: Vec::new(),
            join: None,
            order: None,
        }
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.join = Some(join);
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    /// Render the `select` parameter, e.g. `id,name,agents(name)`.
    pub fn select_clause(&self) -> String {
        let mut parts: Vec<String> = if self.columns.is_empty() {
            vec!["*".to_string()]
        } else {
            self.columns.clone()
        };
        if let Some(join) = &self.join {
            let inner = if join.columns.is_empty() {
                "*".to_string()
            } else {
                join.columns.join(",")
            };
            parts.push(format!("{}({inner})", join.table));
        }
        parts.join(",")
    }

    /// Query-string pairs in the hosted table API's filter syntax.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select_clause())];
        for filter in &self.filters {
            params.push((filter.column.clone(), format!("eq.{}", filter.value)));
        }
        if let Some(order) = &self.order {
            let direction = if order.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }
        params
    }
}
