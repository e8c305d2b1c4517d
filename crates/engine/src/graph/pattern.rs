//! Multi-node pattern matching.
//!
//! A pattern is a chain of named slots joined by edges:
//!
//! ```text
//! start("p", "Person").through("WORKS_AT", Outgoing).end("c", "Company")
//!                     .through("LOCATED_IN", Outgoing).end("city", "City")
//! ```
//!
//! The chain compiles to one join with one row per binding. User aliases
//! only label result columns: slot `i` is `s{i}` in SQL and the edge into
//! it is `e{i}`. Every alias may appear once; a repeated alias would close a
//! cycle, which this compiler does not support.
//!
//! Distinct edges: no edge is used twice within one binding. Nodes may
//! repeat across slots. Parallel edges yield one row each unless
//! [`PatternPlan::distinct`] is set.

use std::fmt;

use tracing::debug;
use trellis_core::{Direction, Node, SortOrder, TrellisError, TrellisResult, Value};
use trellis_storage::{Access, SqlValue};

use super::filter::{Comparison, Condition};
use super::query::{push_page, CompiledQuery, OrderField};
use super::rows::{node_columns, node_from_row, NODE_WIDTH};
use super::validate::{validate_alias, validate_edge_type, validate_node_type};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Link {
    edge_type: String,
    direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    alias: String,
    node_type: String,
    /// Edge from the previous slot; `None` for the start slot.
    link: Option<Link>,
}

/// Owned description of a pattern.
#[derive(Debug, Clone, Default)]
pub struct PatternPlan {
    slots: Vec<Slot>,
    pending: Option<Link>,
    misuse: Option<String>,
    conditions: Vec<(String, Condition)>,
    projection: Option<Vec<String>>,
    distinct: bool,
    order: Vec<(String, OrderField, SortOrder)>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl PatternPlan {
    /// An empty pattern.
    pub fn new() -> Self {
        Self::default()
    }

    fn misuse(&mut self, msg: &str) {
        if self.misuse.is_none() {
            self.misuse = Some(msg.to_string());
        }
    }

    /// Open the chain with its first slot.
    pub fn start(mut self, alias: impl Into<String>, node_type: impl Into<String>) -> Self {
        if !self.slots.is_empty() {
            self.misuse("start() called on a pattern that already has a start slot");
            return self;
        }
        self.slots.push(Slot {
            alias: alias.into(),
            node_type: node_type.into(),
            link: None,
        });
        self
    }

    /// Follow an edge from the last slot. Must be followed by `end`.
    pub fn through(mut self, edge_type: impl Into<String>, direction: Direction) -> Self {
        if self.slots.is_empty() {
            self.misuse("through() called before start()");
        } else if self.pending.is_some() {
            self.misuse("through() called twice without end()");
        } else {
            self.pending = Some(Link {
                edge_type: edge_type.into(),
                direction,
            });
        }
        self
    }

    /// Close the pending `through` with a new slot.
    pub fn end(mut self, alias: impl Into<String>, node_type: impl Into<String>) -> Self {
        match self.pending.take() {
            Some(link) => self.slots.push(Slot {
                alias: alias.into(),
                node_type: node_type.into(),
                link: Some(link),
            }),
            None => self.misuse("end() called without a preceding through()"),
        }
        self
    }

    /// Add a condition on a slot's property.
    pub fn filter(mut self, alias: impl Into<String>, key: impl Into<String>, cmp: Comparison) -> Self {
        self.conditions.push((alias.into(), Condition::new(key, cmp)));
        self
    }

    /// Equality shorthand for [`filter`](Self::filter).
    pub fn where_eq(self, alias: impl Into<String>, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(alias, key, Comparison::Eq(value.into()))
    }

    /// Return only these slots, in this order. Default: all slots.
    pub fn select<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(aliases.into_iter().map(Into::into).collect());
        self
    }

    /// Drop duplicate result rows.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Order by a field (`id`, `type`, `created_at`, `updated_at` or a
    /// property key) of one slot.
    pub fn order_by(mut self, alias: impl Into<String>, field: &str, order: SortOrder) -> Self {
        self.order.push((alias.into(), OrderField::parse(field), order));
        self
    }

    /// Return at most `n` rows.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first `n` rows.
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    fn slot_index(&self, alias: &str) -> TrellisResult<usize> {
        self.slots
            .iter()
            .position(|s| s.alias == alias)
            .ok_or_else(|| TrellisError::invalid_input(format!("unknown pattern alias '{}'", alias)))
    }

    /// Projected slot indexes.
    fn projected(&self) -> TrellisResult<Vec<usize>> {
        match &self.projection {
            None => Ok((0..self.slots.len()).collect()),
            Some(aliases) if aliases.is_empty() => {
                Err(TrellisError::invalid_input("select() needs at least one alias"))
            }
            Some(aliases) => aliases.iter().map(|a| self.slot_index(a)).collect(),
        }
    }

    /// Check structure, aliases, types and conditions.
    pub fn validate(&self) -> TrellisResult<()> {
        if let Some(msg) = &self.misuse {
            return Err(TrellisError::invalid_input(msg.clone()));
        }
        if self.slots.is_empty() {
            return Err(TrellisError::invalid_input("pattern has no start slot"));
        }
        if self.pending.is_some() {
            return Err(TrellisError::invalid_input(
                "pattern ends with through() but no end()",
            ));
        }
        for (i, slot) in self.slots.iter().enumerate() {
            validate_alias(&slot.alias)?;
            validate_node_type(&slot.node_type)?;
            if let Some(link) = &slot.link {
                validate_edge_type(&link.edge_type)?;
            }
            if self.slots[..i].iter().any(|s| s.alias == slot.alias) {
                return Err(TrellisError::invalid_input(format!(
                    "alias '{}' appears more than once; cyclic patterns are not supported",
                    slot.alias
                )));
            }
        }
        for (alias, cond) in &self.conditions {
            self.slot_index(alias)?;
            cond.validate()?;
        }
        for (alias, _, _) in &self.order {
            self.slot_index(alias)?;
        }
        self.projected()?;
        if self.limit == Some(0) {
            return Err(TrellisError::invalid_input("limit must be positive"));
        }
        Ok(())
    }

    /// Compile the row-returning statement.
    pub fn compile(&self) -> TrellisResult<CompiledQuery> {
        self.validate()?;
        let projected = self.projected()?;
        let cols: Vec<String> = projected.iter().map(|&i| node_columns(&format!("s{}", i))).collect();
        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {}{}",
            if self.distinct { "DISTINCT " } else { "" },
            cols.join(", ")
        );
        self.push_body(&mut sql, &mut params)?;

        sql.push_str(" ORDER BY ");
        for (alias, field, dir) in &self.order {
            let slot = format!("s{}", self.slot_index(alias)?);
            let expr = field.render(&slot, &mut params)?;
            sql.push_str(&format!("{} {}, ", expr, dir.as_sql()));
        }
        let ties: Vec<String> = projected.iter().map(|i| format!("s{}.id ASC", i)).collect();
        sql.push_str(&ties.join(", "));

        push_page(&mut sql, &mut params, self.limit, self.offset);
        Ok(CompiledQuery { sql, params })
    }

    /// Compile a `COUNT(*)` over the paginated rows.
    pub fn compile_count(&self) -> TrellisResult<CompiledQuery> {
        let inner = self.compile()?;
        Ok(CompiledQuery {
            sql: format!("SELECT COUNT(*) FROM ({})", inner.sql),
            params: inner.params,
        })
    }

    /// FROM, JOINs and WHERE.
    fn push_body(&self, sql: &mut String, params: &mut Vec<SqlValue>) -> TrellisResult<()> {
        sql.push_str(" FROM nodes s0");
        for (i, slot) in self.slots.iter().enumerate().skip(1) {
            let Some(link) = &slot.link else { continue };
            let (prev, e, cur) = (format!("s{}", i - 1), format!("e{}", i), format!("s{}", i));
            let (edge_on, node_on) = match link.direction {
                Direction::Outgoing => (
                    format!("{e}.from_id = {p}.id", e = e, p = prev),
                    format!("{c}.id = {e}.to_id", c = cur, e = e),
                ),
                Direction::Incoming => (
                    format!("{e}.to_id = {p}.id", e = e, p = prev),
                    format!("{c}.id = {e}.from_id", c = cur, e = e),
                ),
                Direction::Both => (
                    format!("({e}.from_id = {p}.id OR {e}.to_id = {p}.id)", e = e, p = prev),
                    format!(
                        "{c}.id = CASE WHEN {e}.from_id = {p}.id THEN {e}.to_id ELSE {e}.from_id END",
                        c = cur,
                        e = e,
                        p = prev
                    ),
                ),
            };
            sql.push_str(&format!(" JOIN edges {} ON {} AND {}.type = ?", e, edge_on, e));
            params.push(SqlValue::Text(link.edge_type.clone()));
            for j in 1..i {
                sql.push_str(&format!(" AND {}.id <> e{}.id", e, j));
            }
            sql.push_str(&format!(" JOIN nodes {} ON {}", cur, node_on));
        }

        let mut clauses = Vec::new();
        for (i, slot) in self.slots.iter().enumerate() {
            clauses.push(format!("s{}.type = ?", i));
            params.push(SqlValue::Text(slot.node_type.clone()));
        }
        for (alias, cond) in &self.conditions {
            let slot = format!("s{}", self.slot_index(alias)?);
            clauses.push(cond.render(&slot, params)?);
        }
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
        Ok(())
    }

    fn aliases(&self, projected: &[usize]) -> Vec<String> {
        projected.iter().map(|&i| self.slots[i].alias.clone()).collect()
    }
}

/// One match: projected aliases bound to nodes, in projection order.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRow {
    bindings: Vec<(String, Node)>,
}

impl PatternRow {
    /// The node bound to `alias`.
    pub fn get(&self, alias: &str) -> Option<&Node> {
        self.bindings
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, n)| n)
    }

    /// All bindings in projection order.
    pub fn bindings(&self) -> &[(String, Node)] {
        &self.bindings
    }

    /// Consume into bindings.
    pub fn into_bindings(self) -> Vec<(String, Node)> {
        self.bindings
    }
}

/// A [`PatternPlan`] bound to something it can run against.
#[derive(Clone)]
pub struct Pattern<'a> {
    access: &'a dyn Access,
    plan: PatternPlan,
}

impl fmt::Debug for Pattern<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern").field("plan", &self.plan).finish()
    }
}

impl<'a> Pattern<'a> {
    /// An empty pattern over `access`.
    pub fn new(access: &'a dyn Access) -> Self {
        Self::with_plan(access, PatternPlan::new())
    }

    /// Bind an existing plan.
    pub fn with_plan(access: &'a dyn Access, plan: PatternPlan) -> Self {
        Self { access, plan }
    }

    /// The underlying plan.
    pub fn plan(&self) -> &PatternPlan {
        &self.plan
    }

    fn map(self, f: impl FnOnce(PatternPlan) -> PatternPlan) -> Self {
        Self {
            access: self.access,
            plan: f(self.plan),
        }
    }

    /// See [`PatternPlan::start`].
    pub fn start(self, alias: impl Into<String>, node_type: impl Into<String>) -> Self {
        self.map(|p| p.start(alias, node_type))
    }

    /// See [`PatternPlan::through`].
    pub fn through(self, edge_type: impl Into<String>, direction: Direction) -> Self {
        self.map(|p| p.through(edge_type, direction))
    }

    /// See [`PatternPlan::end`].
    pub fn end(self, alias: impl Into<String>, node_type: impl Into<String>) -> Self {
        self.map(|p| p.end(alias, node_type))
    }

    /// See [`PatternPlan::filter`].
    pub fn filter(self, alias: impl Into<String>, key: impl Into<String>, cmp: Comparison) -> Self {
        self.map(|p| p.filter(alias, key, cmp))
    }

    /// See [`PatternPlan::where_eq`].
    pub fn where_eq(self, alias: impl Into<String>, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.map(|p| p.where_eq(alias, key, value))
    }

    /// See [`PatternPlan::select`].
    pub fn select<I, S>(self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|p| p.select(aliases))
    }

    /// See [`PatternPlan::distinct`].
    pub fn distinct(self) -> Self {
        self.map(PatternPlan::distinct)
    }

    /// See [`PatternPlan::order_by`].
    pub fn order_by(self, alias: impl Into<String>, field: &str, order: SortOrder) -> Self {
        self.map(|p| p.order_by(alias, field, order))
    }

    /// See [`PatternPlan::limit`].
    pub fn limit(self, n: usize) -> Self {
        self.map(|p| p.limit(n))
    }

    /// See [`PatternPlan::offset`].
    pub fn offset(self, n: usize) -> Self {
        self.map(|p| p.offset(n))
    }

    /// Every match.
    pub fn execute(&self) -> TrellisResult<Vec<PatternRow>> {
        run(self.access, &self.plan)
    }

    /// The first match, if any.
    pub fn first(&self) -> TrellisResult<Option<PatternRow>> {
        let plan = self.plan.clone().limit(1);
        Ok(run(self.access, &plan)?.into_iter().next())
    }

    /// Number of matches.
    pub fn count(&self) -> TrellisResult<u64> {
        let q = self.plan.compile_count()?;
        debug!(sql = %q.sql, "counting pattern matches");
        let row = self
            .access
            .query_first(&q.sql, &q.params)?
            .ok_or_else(|| TrellisError::storage("COUNT returned no row"))?;
        Ok(u64::try_from(row.i64(0)?).unwrap_or(0))
    }

    /// True if anything matches.
    pub fn exists(&self) -> TrellisResult<bool> {
        Ok(self.first()?.is_some())
    }
}

fn run(access: &dyn Access, plan: &PatternPlan) -> TrellisResult<Vec<PatternRow>> {
    let q = plan.compile()?;
    let aliases = plan.aliases(&plan.projected()?);
    debug!(sql = %q.sql, slots = plan.slots.len(), "running pattern");
    access
        .query_rows(&q.sql, &q.params)?
        .iter()
        .map(|row| {
            let bindings = aliases
                .iter()
                .enumerate()
                .map(|(k, alias)| {
                    let node = node_from_row(&row.slice(k * NODE_WIDTH, NODE_WIDTH)?)?;
                    Ok((alias.clone(), node))
                })
                .collect::<TrellisResult<Vec<_>>>()?;
            Ok(PatternRow { bindings })
        })
        .collect()
}
