//! Shared fixtures for integration tests
//!
//! - `registry()`: partners, countries, companies, categories, bank
//!   accounts, users and three small trees
//! - `FixtureBackend`: in-memory capability surface that evaluates plain
//!   domains over JSON records and records every round trip

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use aerodomain::compiler::{
    BackendFuture, CompileContext, DomainCompiler, ModelBackend, SearchOptions,
};
use aerodomain::domain::{normalize, Domain, Leaf, Operand, Operator, RecordId, Token};
use aerodomain::errors::{DomainError, DomainResult};
use aerodomain::query::{SqlFragment, SqlParam};
use aerodomain::schema::{FieldDef, ModelDef, Registry};

// =============================================================================
// Registry
// =============================================================================

pub fn registry() -> Registry {
    let mut registry = Registry::new();
    for model in models() {
        registry.register_model(model).unwrap();
    }
    registry.register_hook(
        "partner_display_name",
        |_model: &ModelDef, operator: Operator, value: &Operand| -> DomainResult<Domain> {
            Ok(Domain::leaf("name", operator, value.clone()))
        },
    );
    registry.validate().unwrap();
    registry
}

fn models() -> Vec<ModelDef> {
    vec![
        ModelDef::new("res.country", "res_country")
            .with_field(FieldDef::char("name"))
            .with_field(FieldDef::char("code")),
        ModelDef::new("res.company", "res_company")
            .with_field(FieldDef::char("name"))
            .with_field(FieldDef::boolean("active")),
        ModelDef::new("res.partner", "res_partner")
            .with_field(FieldDef::char("name"))
            .with_field(FieldDef::boolean("active"))
            .with_field(FieldDef::selection("state"))
            .with_field(FieldDef::char("function").translated())
            .with_field(FieldDef::datetime("create_date"))
            .with_field(FieldDef::binary_attachment("image"))
            .with_field(FieldDef::many2one("parent_id", "res.partner"))
            .with_field(FieldDef::many2one("country_id", "res.country").auto_joined())
            .with_field(FieldDef::many2one("company_id", "res.company"))
            .with_field(FieldDef::one2many("child_ids", "res.partner", "parent_id").auto_joined())
            .with_field(FieldDef::one2many("bank_ids", "res.partner.bank", "partner_id"))
            .with_field(FieldDef::many2many(
                "category_id",
                "res.partner.category",
                "res_partner_res_partner_category_rel",
                "partner_id",
                "category_id",
            ))
            .with_field(
                FieldDef::char("display_name")
                    .not_stored()
                    .searched_by("partner_display_name"),
            )
            .with_field(FieldDef::char("commercial_name").not_stored())
            .with_field(FieldDef::integer("sale_count").not_stored().searched_by("sale_count")),
        ModelDef::new("res.partner.category", "res_partner_category")
            .with_field(FieldDef::char("name"))
            .with_field(FieldDef::many2one("parent_id", "res.partner.category"))
            .with_parent_store(),
        ModelDef::new("res.partner.bank", "res_partner_bank")
            .with_field(FieldDef::char("acc_number"))
            .with_field(FieldDef::many2one("partner_id", "res.partner").auto_joined())
            .with_rec_name("acc_number"),
        ModelDef::new("res.users", "res_users")
            .with_field(FieldDef::char("login"))
            .with_field(FieldDef::many2one("partner_id", "res.partner"))
            .inheriting("res.partner", "partner_id"),
        tree("tree.path", "tree_path").with_parent_store(),
        tree("tree.adjacency", "tree_adjacency"),
        tree("tree.cycle", "tree_cycle"),
        ModelDef::new("sale.order", "sale_order")
            .with_field(FieldDef::char("name"))
            .with_field(FieldDef::one2many("line_ids", "sale.order.line", "order_id")),
        // order_id is computed, so owners of lines are only known in memory
        ModelDef::new("sale.order.line", "sale_order_line")
            .with_field(FieldDef::char("name"))
            .with_field(FieldDef::many2one("order_id", "sale.order").not_stored()),
    ]
}

fn tree(name: &str, table: &str) -> ModelDef {
    ModelDef::new(name, table)
        .with_field(FieldDef::char("name"))
        .with_field(FieldDef::many2one("parent_id", name))
}

// =============================================================================
// Records
// =============================================================================

/// The five partners of the scenario tests
pub fn partners() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Azure Interior", "active": true, "state": "draft", "parent_id": null, "country_id": 1}),
        json!({"id": 2, "name": "Deco Addict", "active": true, "state": "sent", "parent_id": 1, "country_id": 2}),
        json!({"id": 3, "name": "Gemini Furniture", "active": true, "state": "draft", "parent_id": null, "country_id": null}),
        json!({"id": 4, "name": "Ready Mat", "active": false, "state": "draft", "parent_id": null, "country_id": 1}),
        json!({"id": 5, "name": "Wood Corner", "active": true, "state": "done", "parent_id": null, "country_id": 2}),
    ]
}

/// Same tree for every tree model:
///
/// ```text
/// 1 ── 2 ── 4 ── 5
///  └── 3
/// 6
/// ```
pub fn tree_records() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "root", "parent_id": null, "parent_path": "1/"}),
        json!({"id": 2, "name": "left", "parent_id": 1, "parent_path": "1/2/"}),
        json!({"id": 3, "name": "right", "parent_id": 1, "parent_path": "1/3/"}),
        json!({"id": 4, "name": "inner", "parent_id": 2, "parent_path": "1/2/4/"}),
        json!({"id": 5, "name": "leaf", "parent_id": 4, "parent_path": "1/2/4/5/"}),
        json!({"id": 6, "name": "other", "parent_id": null, "parent_path": "6/"}),
    ]
}

pub fn backend() -> FixtureBackend {
    FixtureBackend::new()
        .with_records("res.partner", partners())
        .with_records(
            "res.country",
            vec![
                json!({"id": 1, "name": "Belgium", "code": "BE"}),
                json!({"id": 2, "name": "United States", "code": "US"}),
            ],
        )
        .with_records(
            "res.partner.category",
            vec![
                json!({"id": 1, "name": "Vip", "parent_id": null, "parent_path": "1/"}),
                json!({"id": 2, "name": "Gold", "parent_id": 1, "parent_path": "1/2/"}),
                json!({"id": 3, "name": "Silver", "parent_id": 1, "parent_path": "1/3/"}),
                json!({"id": 4, "name": "Prospect", "parent_id": null, "parent_path": "4/"}),
            ],
        )
        .with_records(
            "res.partner.bank",
            vec![
                json!({"id": 7, "acc_number": "BE71 0961 2345 6769", "partner_id": 1}),
                json!({"id": 8, "acc_number": "US12 3456 7890", "partner_id": 2}),
            ],
        )
        .with_records("tree.path", tree_records())
        .with_records("tree.adjacency", tree_records())
        .with_records(
            "tree.cycle",
            vec![
                json!({"id": 1, "name": "a", "parent_id": 3}),
                json!({"id": 2, "name": "b", "parent_id": 1}),
                json!({"id": 3, "name": "c", "parent_id": 2}),
            ],
        )
        .with_records(
            "sale.order",
            vec![
                json!({"id": 10, "name": "SO010"}),
                json!({"id": 11, "name": "SO011"}),
                json!({"id": 12, "name": "SO012"}),
            ],
        )
        .with_records(
            "sale.order.line",
            vec![
                json!({"id": 1, "name": "desk", "order_id": 10}),
                json!({"id": 2, "name": "chair", "order_id": 11}),
                json!({"id": 3, "name": "desk", "order_id": 10}),
                json!({"id": 4, "name": "lamp", "order_id": null}),
            ],
        )
}

/// Compiler over the fixture registry with archived records visible
pub fn compiler(backend: Arc<FixtureBackend>) -> DomainCompiler {
    DomainCompiler::new(Arc::new(registry()), backend)
        .with_context(CompileContext::default().with_active_test(false))
}

pub fn domain(value: Value) -> Domain {
    Domain::from_json(&value).unwrap()
}

/// WHERE clause and params of `value` compiled on `model`
pub async fn where_sql(compiler: &DomainCompiler, model: &str, value: Value) -> (String, Vec<SqlParam>) {
    let domain = domain(value);
    let query = compiler.where_calc(model, &domain).await.unwrap();
    let clause = query.where_clause();
    (clause.sql, clause.params)
}

// =============================================================================
// Backend
// =============================================================================

/// In-memory capability surface
#[derive(Debug, Default)]
pub struct FixtureBackend {
    records: BTreeMap<String, Vec<Value>>,
    calls: Mutex<Vec<String>>,
}

impl FixtureBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, model: &str, records: Vec<Value>) -> Self {
        self.records.insert(model.to_string(), records);
        self
    }

    /// Round trips made so far, as `<method> <model>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn records(&self, model: &str) -> &[Value] {
        self.records.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    fn record_call(&self, method: &str, model: &ModelDef) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", method, model.name));
    }

    fn rows(&self, model: &ModelDef) -> &[Value] {
        self.records
            .get(&model.name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ids of records of `model` matching `domain`, in id order
    pub fn evaluate(
        &self,
        model: &ModelDef,
        domain: &Domain,
        active_test: bool,
    ) -> DomainResult<Vec<RecordId>> {
        let domain = normalize(domain)?;
        let active = model
            .active_field()
            .filter(|name| active_test && !domain.leaves().any(|leaf| leaf.left == *name));

        let mut ids = Vec::new();
        for row in self.rows(model) {
            if let Some(name) = active {
                if row.get(name) != Some(&Value::Bool(true)) {
                    continue;
                }
            }
            if matches_domain(row, &domain)? {
                ids.extend(row["id"].as_i64());
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

impl ModelBackend for FixtureBackend {
    fn search_ids<'a>(
        &'a self,
        model: &'a ModelDef,
        domain: &'a Domain,
        options: SearchOptions,
    ) -> BackendFuture<'a, Vec<RecordId>> {
        Box::pin(async move {
            self.record_call("search", model);
            let mut ids = self.evaluate(model, domain, options.active_test)?;
            if let Some(limit) = options.limit {
                ids.truncate(limit);
            }
            Ok(ids)
        })
    }

    fn read_references<'a>(
        &'a self,
        model: &'a ModelDef,
        ids: &'a [RecordId],
        field: &'a str,
    ) -> BackendFuture<'a, Vec<RecordId>> {
        Box::pin(async move {
            self.record_call("read", model);
            let found: BTreeSet<RecordId> = self
                .rows(model)
                .iter()
                .filter(|row| row["id"].as_i64().map_or(false, |id| ids.contains(&id)))
                .filter_map(|row| row.get(field).and_then(Value::as_i64))
                .collect();
            Ok(found.into_iter().collect())
        })
    }

    fn read_parent_paths<'a>(
        &'a self,
        model: &'a ModelDef,
        ids: &'a [RecordId],
    ) -> BackendFuture<'a, Vec<(RecordId, String)>> {
        Box::pin(async move {
            self.record_call("read_parent_paths", model);
            Ok(self
                .rows(model)
                .iter()
                .filter_map(|row| {
                    let id = row["id"].as_i64()?;
                    let path = row.get("parent_path")?.as_str()?;
                    ids.contains(&id).then(|| (id, path.to_string()))
                })
                .collect())
        })
    }
}

// =============================================================================
// Compiled clause evaluation
// =============================================================================

/// Ids of `rows` matched by a compiled WHERE clause built from
/// `("alias"."column" = %s)` comparisons combined with AND and OR
pub fn rows_matching(rows: &[Value], clause: &SqlFragment) -> Vec<RecordId> {
    rows.iter()
        .filter(|row| {
            let mut params = clause.params.iter();
            let (matched, rest) = eval_clause(&clause.sql, row, &mut params);
            assert!(rest.is_empty(), "trailing SQL: {}", rest);
            assert!(params.next().is_none(), "unused params in {}", clause.sql);
            matched
        })
        .filter_map(|row| row["id"].as_i64())
        .collect()
}

fn eval_clause<'s>(
    sql: &'s str,
    row: &Value,
    params: &mut std::slice::Iter<'_, SqlParam>,
) -> (bool, &'s str) {
    let inner = sql
        .strip_prefix('(')
        .unwrap_or_else(|| panic!("expected a parenthesized clause: {}", sql));

    if inner.starts_with('(') {
        let (lhs, rest) = eval_clause(inner, row, params);
        let (is_and, rest) = match rest.strip_prefix(" AND ") {
            Some(rest) => (true, rest),
            None => (
                false,
                rest.strip_prefix(" OR ")
                    .unwrap_or_else(|| panic!("expected AND or OR: {}", rest)),
            ),
        };
        let (rhs, rest) = eval_clause(rest, row, params);
        let rest = rest
            .strip_prefix(')')
            .unwrap_or_else(|| panic!("unbalanced clause: {}", rest));
        let matched = if is_and { lhs && rhs } else { lhs || rhs };
        return (matched, rest);
    }

    let (column, rest) = inner
        .split_once(" = %s)")
        .unwrap_or_else(|| panic!("unsupported comparison: {}", inner));
    let name = column.rsplit('.').next().unwrap_or(column).trim_matches('"');
    let expected = match params.next() {
        Some(SqlParam::Bool(b)) => Value::Bool(*b),
        Some(SqlParam::Int(i)) => Value::from(*i),
        Some(SqlParam::Text(t)) => Value::from(t.as_str()),
        other => panic!("unsupported param {:?}", other),
    };
    (row.get(name) == Some(&expected), rest)
}

// =============================================================================
// Domain evaluation
// =============================================================================

fn matches_domain(row: &Value, domain: &Domain) -> DomainResult<bool> {
    let mut stack: Vec<bool> = Vec::new();
    let pop = |stack: &mut Vec<bool>| {
        stack
            .pop()
            .ok_or_else(|| DomainError::Malformed("fixture: missing operand".into()))
    };
    for token in domain.tokens().iter().rev() {
        let value = match token {
            Token::And => pop(&mut stack)? & pop(&mut stack)?,
            Token::Or => pop(&mut stack)? | pop(&mut stack)?,
            Token::Not => !pop(&mut stack)?,
            Token::True => true,
            Token::False => false,
            Token::Leaf(leaf) => matches_leaf(row, leaf)?,
        };
        stack.push(value);
    }
    pop(&mut stack)
}

fn matches_leaf(row: &Value, leaf: &Leaf) -> DomainResult<bool> {
    let right = leaf
        .right
        .as_value()
        .ok_or_else(|| DomainError::backend("fixture cannot evaluate subqueries"))?;
    let value = row.get(&leaf.left).unwrap_or(&Value::Null);
    let unset = |v: &Value| v.is_null() || *v == Value::Bool(false);

    Ok(match leaf.operator {
        Operator::Eq => same(value, right) || (unset(right) && unset(value)),
        Operator::Ne => !(same(value, right) || (unset(right) && unset(value))),
        Operator::EqIfSet => unset(right) || same(value, right),
        Operator::In | Operator::NotIn => {
            let items = right
                .as_array()
                .ok_or_else(|| DomainError::invalid_leaf(leaf, "fixture expects a list"))?;
            let found = items
                .iter()
                .any(|item| same(value, item) || (unset(item) && unset(value)));
            found == (leaf.operator == Operator::In)
        }
        Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
            match (value.as_f64(), right.as_f64(), value.as_str(), right.as_str()) {
                (Some(a), Some(b), _, _) => compare(leaf.operator, a.partial_cmp(&b)),
                (_, _, Some(a), Some(b)) => compare(leaf.operator, Some(a.cmp(b))),
                _ => false,
            }
        }
        Operator::Like
        | Operator::NotLike
        | Operator::Ilike
        | Operator::NotIlike
        | Operator::EqLike
        | Operator::EqIlike => {
            let Some(text) = value.as_str() else {
                return Ok(leaf.operator.is_negative());
            };
            let needle = right.as_str().unwrap_or_default();
            let pattern = if leaf.operator.needs_wildcard() {
                format!("%{}%", needle)
            } else {
                needle.to_string()
            };
            let insensitive = matches!(
                leaf.operator,
                Operator::Ilike | Operator::NotIlike | Operator::EqIlike
            );
            let matched = if insensitive {
                like(&text.to_lowercase(), &pattern.to_lowercase())
            } else {
                like(text, &pattern)
            };
            matched != leaf.operator.is_negative()
        }
        Operator::ChildOf | Operator::ParentOf => {
            return Err(DomainError::invalid_leaf(leaf, "fixture cannot walk hierarchies"))
        }
    })
}

fn same(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(operator: Operator, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match (operator, ordering) {
        (Operator::Lt, Some(Less)) => true,
        (Operator::Le, Some(Less | Equal)) => true,
        (Operator::Gt, Some(Greater)) => true,
        (Operator::Ge, Some(Greater | Equal)) => true,
        _ => false,
    }
}

/// SQL LIKE with `%` and `_` wildcards
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_at(&text, &pattern)
}

fn like_at(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('%', rest)) => (0..=text.len()).any(|skip| like_at(&text[skip..], rest)),
        Some(('_', rest)) => !text.is_empty() && like_at(&text[1..], rest),
        Some((c, rest)) => text.first() == Some(c) && like_at(&text[1..], rest),
    }
}
