//! Fluent node queries.
//!
//! A [`QueryPlan`] is an owned description of a node query; nothing runs
//! until a terminal (`execute`, `first`, `count`, `exists`) is called on a
//! [`Query`]. Relational filters compile to a single statement:
//!
//! ```text
//! SELECT n.* FROM nodes n
//! WHERE n.type = ? AND <conditions> AND [NOT] EXISTS (<edge join>) ...
//! ORDER BY <fields>, n.id
//! LIMIT ? OFFSET ?
//! ```
//!
//! Post-fetch predicates are plain Rust closures. They run on the rows the
//! statement returned, after LIMIT/OFFSET, so a page can come back shorter
//! than the limit.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use trellis_core::{Direction, Node, SortOrder, TrellisError, TrellisResult, Value};
use trellis_storage::{Access, SqlValue};

use super::filter::{Comparison, Condition};
use super::rows::{node_columns, nodes_from_rows};
use super::validate::{json_path, validate_edge_type, validate_node_type, validate_property_key};

/// Opaque node predicate applied after the statement runs.
pub type NodePredicate = Arc<dyn Fn(&Node) -> bool + Send + Sync>;

/// A connectivity filter: the node must (or must not) have an edge of
/// `edge_type` in `direction` to some node of `node_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Type of the node on the other end.
    pub node_type: String,
    /// Edge type.
    pub edge_type: String,
    /// Edge direction seen from the queried node.
    pub direction: Direction,
    /// `true` for `not_connected_to`.
    pub negated: bool,
}

/// Field a query can be ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderField {
    /// Node id.
    Id,
    /// Node type.
    Type,
    /// Creation time.
    CreatedAt,
    /// Last update time.
    UpdatedAt,
    /// A top-level property.
    Property(String),
}

impl OrderField {
    /// Parse a field name; anything but the built-ins is a property key.
    pub fn parse(field: &str) -> Self {
        match field {
            "id" => OrderField::Id,
            "type" => OrderField::Type,
            "created_at" => OrderField::CreatedAt,
            "updated_at" => OrderField::UpdatedAt,
            other => OrderField::Property(other.to_string()),
        }
    }

    /// SQL expression over node alias `alias`; property paths are bound.
    pub(crate) fn render(&self, alias: &str, params: &mut Vec<SqlValue>) -> TrellisResult<String> {
        Ok(match self {
            OrderField::Id => format!("{}.id", alias),
            OrderField::Type => format!("{}.type", alias),
            OrderField::CreatedAt => format!("{}.created_at", alias),
            OrderField::UpdatedAt => format!("{}.updated_at", alias),
            OrderField::Property(key) => {
                validate_property_key(key)?;
                params.push(SqlValue::Text(json_path(key)));
                format!("json_extract({}.properties, ?)", alias)
            }
        })
    }
}

/// SQL text plus positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Statement text with `?` placeholders.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<SqlValue>,
}

/// Owned description of a node query.
#[derive(Clone)]
pub struct QueryPlan {
    node_type: String,
    conditions: Vec<Condition>,
    joins: Vec<Join>,
    order: Vec<(OrderField, SortOrder)>,
    limit: Option<usize>,
    offset: Option<usize>,
    predicates: Vec<NodePredicate>,
}

impl fmt::Debug for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPlan")
            .field("node_type", &self.node_type)
            .field("conditions", &self.conditions)
            .field("joins", &self.joins)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl QueryPlan {
    /// Match every node of `node_type`.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            conditions: Vec::new(),
            joins: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            predicates: Vec::new(),
        }
    }

    /// AND an equality condition per entry.
    pub fn where_eq<I, K, V>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.conditions.extend(
            props
                .into_iter()
                .map(|(k, v)| Condition::new(k, Comparison::Eq(v.into()))),
        );
        self
    }

    /// AND an arbitrary comparison.
    pub fn where_op(mut self, key: impl Into<String>, cmp: Comparison) -> Self {
        self.conditions.push(Condition::new(key, cmp));
        self
    }

    /// Require an edge of `edge_type` in `direction` to a node of `node_type`.
    pub fn connected_to(
        mut self,
        node_type: impl Into<String>,
        edge_type: impl Into<String>,
        direction: Direction,
    ) -> Self {
        self.joins.push(Join {
            node_type: node_type.into(),
            edge_type: edge_type.into(),
            direction,
            negated: false,
        });
        self
    }

    /// Exclude nodes with an edge of `edge_type` in `direction` to a node of
    /// `node_type`.
    pub fn not_connected_to(
        mut self,
        node_type: impl Into<String>,
        edge_type: impl Into<String>,
        direction: Direction,
    ) -> Self {
        self.joins.push(Join {
            node_type: node_type.into(),
            edge_type: edge_type.into(),
            direction,
            negated: true,
        });
        self
    }

    /// Order by a built-in field (`id`, `type`, `created_at`, `updated_at`)
    /// or a property key. Later calls break ties of earlier ones.
    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order.push((OrderField::parse(field), order));
        self
    }

    /// Return at most `n` rows. Zero is rejected when the plan compiles.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first `n` rows.
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    /// Add a post-fetch predicate.
    pub fn filter<F>(mut self, pred: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(pred));
        self
    }

    /// True when post-fetch predicates are present.
    pub fn has_predicates(&self) -> bool {
        !self.predicates.is_empty()
    }

    /// Check everything that can be checked without the store.
    pub fn validate(&self) -> TrellisResult<()> {
        validate_node_type(&self.node_type)?;
        if self.limit == Some(0) {
            return Err(TrellisError::invalid_input("limit must be positive"));
        }
        for c in &self.conditions {
            c.validate()?;
        }
        for j in &self.joins {
            validate_node_type(&j.node_type)?;
            validate_edge_type(&j.edge_type)?;
        }
        for (field, _) in &self.order {
            if let OrderField::Property(key) = field {
                validate_property_key(key)?;
            }
        }
        Ok(())
    }

    /// Compile the row-returning statement.
    pub fn compile(&self) -> TrellisResult<CompiledQuery> {
        let mut params = Vec::new();
        let mut sql = format!("SELECT {} FROM nodes n", node_columns("n"));
        self.push_where(&mut sql, &mut params)?;
        self.push_order(&mut sql, &mut params)?;
        push_page(&mut sql, &mut params, self.limit, self.offset);
        Ok(CompiledQuery { sql, params })
    }

    /// Compile a `COUNT(*)` over the filtered, paginated id set.
    pub fn compile_count(&self) -> TrellisResult<CompiledQuery> {
        let inner = self.compile_ids()?;
        Ok(CompiledQuery {
            sql: format!("SELECT COUNT(*) FROM ({})", inner.sql),
            params: inner.params,
        })
    }

    /// Compile an `EXISTS` query.
    pub fn compile_exists(&self) -> TrellisResult<CompiledQuery> {
        let inner = self.compile_ids()?;
        Ok(CompiledQuery {
            sql: format!("SELECT EXISTS ({})", inner.sql),
            params: inner.params,
        })
    }

    fn compile_ids(&self) -> TrellisResult<CompiledQuery> {
        let mut params = Vec::new();
        let mut sql = "SELECT n.id FROM nodes n".to_string();
        self.push_where(&mut sql, &mut params)?;
        if self.limit.is_some() || self.offset.is_some() {
            // Pagination only picks the same rows if the order matches.
            self.push_order(&mut sql, &mut params)?;
            push_page(&mut sql, &mut params, self.limit, self.offset);
        }
        Ok(CompiledQuery { sql, params })
    }

    fn push_where(&self, sql: &mut String, params: &mut Vec<SqlValue>) -> TrellisResult<()> {
        self.validate()?;
        sql.push_str(" WHERE n.type = ?");
        params.push(SqlValue::Text(self.node_type.clone()));
        for c in &self.conditions {
            let expr = c.render("n", params)?;
            sql.push_str(" AND ");
            sql.push_str(&expr);
        }
        for (i, j) in self.joins.iter().enumerate() {
            sql.push_str(" AND ");
            sql.push_str(&render_join(i, j, params));
        }
        Ok(())
    }

    fn push_order(&self, sql: &mut String, params: &mut Vec<SqlValue>) -> TrellisResult<()> {
        sql.push_str(" ORDER BY ");
        for (field, dir) in &self.order {
            let expr = field.render("n", params)?;
            sql.push_str(&format!("{} {}, ", expr, dir.as_sql()));
        }
        sql.push_str("n.id ASC");
        Ok(())
    }
}

fn render_join(i: usize, j: &Join, params: &mut Vec<SqlValue>) -> String {
    let (e, m) = (format!("e{}", i), format!("m{}", i));
    let link = match j.direction {
        Direction::Outgoing => format!(
            "{m}.id = {e}.to_id WHERE {e}.from_id = n.id",
            e = e,
            m = m
        ),
        Direction::Incoming => format!(
            "{m}.id = {e}.from_id WHERE {e}.to_id = n.id",
            e = e,
            m = m
        ),
        Direction::Both => format!(
            "{m}.id = CASE WHEN {e}.from_id = n.id THEN {e}.to_id ELSE {e}.from_id END \
             WHERE ({e}.from_id = n.id OR {e}.to_id = n.id)",
            e = e,
            m = m
        ),
    };
    params.push(SqlValue::Text(j.edge_type.clone()));
    params.push(SqlValue::Text(j.node_type.clone()));
    format!(
        "{not}EXISTS (SELECT 1 FROM edges {e} JOIN nodes {m} ON {link} AND {e}.type = ? AND {m}.type = ?)",
        not = if j.negated { "NOT " } else { "" },
        e = e,
        m = m,
        link = link
    )
}

/// Append `LIMIT`/`OFFSET`. SQLite needs a LIMIT before OFFSET; -1 is
/// unbounded.
pub(crate) fn push_page(
    sql: &mut String,
    params: &mut Vec<SqlValue>,
    limit: Option<usize>,
    offset: Option<usize>,
) {
    match (limit, offset) {
        (None, None) => {}
        (limit, offset) => {
            sql.push_str(" LIMIT ?");
            params.push(SqlValue::Integer(limit.map_or(-1, to_i64)));
            if let Some(off) = offset {
                sql.push_str(" OFFSET ?");
                params.push(SqlValue::Integer(to_i64(off)));
            }
        }
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// A [`QueryPlan`] bound to something it can run against.
#[derive(Clone)]
pub struct Query<'a> {
    access: &'a dyn Access,
    plan: QueryPlan,
}

impl fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").field("plan", &self.plan).finish()
    }
}

impl<'a> Query<'a> {
    /// Bind `plan` to `access`.
    pub fn new(access: &'a dyn Access, plan: QueryPlan) -> Self {
        Self { access, plan }
    }

    /// The underlying plan.
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// See [`QueryPlan::where_eq`].
    pub fn where_eq<I, K, V>(self, props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.map(|p| p.where_eq(props))
    }

    /// See [`QueryPlan::where_op`].
    pub fn where_op(self, key: impl Into<String>, cmp: Comparison) -> Self {
        self.map(|p| p.where_op(key, cmp))
    }

    /// See [`QueryPlan::connected_to`].
    pub fn connected_to(
        self,
        node_type: impl Into<String>,
        edge_type: impl Into<String>,
        direction: Direction,
    ) -> Self {
        self.map(|p| p.connected_to(node_type, edge_type, direction))
    }

    /// See [`QueryPlan::not_connected_to`].
    pub fn not_connected_to(
        self,
        node_type: impl Into<String>,
        edge_type: impl Into<String>,
        direction: Direction,
    ) -> Self {
        self.map(|p| p.not_connected_to(node_type, edge_type, direction))
    }

    /// See [`QueryPlan::order_by`].
    pub fn order_by(self, field: &str, order: SortOrder) -> Self {
        self.map(|p| p.order_by(field, order))
    }

    /// See [`QueryPlan::limit`].
    pub fn limit(self, n: usize) -> Self {
        self.map(|p| p.limit(n))
    }

    /// See [`QueryPlan::offset`].
    pub fn offset(self, n: usize) -> Self {
        self.map(|p| p.offset(n))
    }

    /// See [`QueryPlan::filter`].
    pub fn filter<F>(self, pred: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        self.map(|p| p.filter(pred))
    }

    fn map(self, f: impl FnOnce(QueryPlan) -> QueryPlan) -> Self {
        Self {
            access: self.access,
            plan: f(self.plan),
        }
    }

    /// Every matching node.
    pub fn execute(&self) -> TrellisResult<Vec<Node>> {
        run(self.access, &self.plan)
    }

    /// The first match, if any.
    ///
    /// Without post-fetch predicates this fetches a single row. With them,
    /// the predicates see the same page `execute` would.
    pub fn first(&self) -> TrellisResult<Option<Node>> {
        if self.plan.has_predicates() {
            return Ok(self.execute()?.into_iter().next());
        }
        let plan = self.plan.clone().limit(1);
        Ok(run(self.access, &plan)?.into_iter().next())
    }

    /// Number of matches. Counted in SQL unless post-fetch predicates exist.
    pub fn count(&self) -> TrellisResult<u64> {
        if self.plan.has_predicates() {
            return Ok(self.execute()?.len() as u64);
        }
        let q = self.plan.compile_count()?;
        debug!(sql = %q.sql, "counting nodes");
        let row = self
            .access
            .query_first(&q.sql, &q.params)?
            .ok_or_else(|| TrellisError::storage("COUNT returned no row"))?;
        Ok(u64::try_from(row.i64(0)?).unwrap_or(0))
    }

    /// True if anything matches.
    pub fn exists(&self) -> TrellisResult<bool> {
        if self.plan.has_predicates() {
            return Ok(!self.execute()?.is_empty());
        }
        let q = self.plan.compile_exists()?;
        let row = self
            .access
            .query_first(&q.sql, &q.params)?
            .ok_or_else(|| TrellisError::storage("EXISTS returned no row"))?;
        Ok(row.i64(0)? != 0)
    }
}

fn run(access: &dyn Access, plan: &QueryPlan) -> TrellisResult<Vec<Node>> {
    let q = plan.compile()?;
    debug!(sql = %q.sql, params = q.params.len(), "running node query");
    let nodes = nodes_from_rows(&access.query_rows(&q.sql, &q.params)?)?;
    if plan.predicates.is_empty() {
        return Ok(nodes);
    }
    Ok(nodes
        .into_iter()
        .filter(|n| plan.predicates.iter().all(|p| p(n)))
        .collect())
}
