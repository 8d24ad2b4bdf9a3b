//! Leaf rewriting
//!
//! Every leaf popped by the compiler is classified by the field its path
//! starts with, then either emitted as SQL or replaced by leaves that are
//! closer to plain columns: delegated fields move to the parent table,
//! related paths become id subqueries, names become ids, hierarchy
//! operators become id sets.

use chrono::NaiveDate;
use serde_json::Value;

use crate::domain::{distribute_not, Domain, Leaf, Operand, Operator, RecordId, Token};
use crate::errors::{DomainError, DomainResult};
use crate::observability::{log_event, Event};
use crate::query::{placeholders, qualified, quote, Query, SqlFragment, SqlParam};
use crate::schema::{FieldDef, FieldLookup, FieldType, ModelDef, Registry, RelationTable};

use super::backend::SearchOptions;
use super::expression::DomainCompiler;
use super::hierarchy::{Direction, Target};
use super::leaf::{is_not_null, is_null, translate_leaf, unaccent, value_text};
use super::names::names_of;

/// A pending token with the model and table alias it applies to
#[derive(Debug, Clone)]
pub(crate) struct WorkItem<'r> {
    pub token: Token,
    pub model: &'r ModelDef,
    pub alias: String,
}

impl<'r> WorkItem<'r> {
    pub fn new(token: Token, model: &'r ModelDef, alias: impl Into<String>) -> Self {
        Self {
            token,
            model,
            alias: alias.into(),
        }
    }
}

/// Outcome of rewriting one leaf
#[derive(Debug)]
pub(crate) enum Step<'r> {
    /// Final SQL for the leaf
    Emit(SqlFragment),
    /// Tokens replacing the leaf, in domain order
    Requeue(Vec<WorkItem<'r>>),
}

impl<'r> Step<'r> {
    fn leaf(leaf: Leaf, model: &'r ModelDef, alias: &str) -> Self {
        Step::Requeue(vec![WorkItem::new(Token::Leaf(leaf), model, alias)])
    }

    fn domain(domain: &Domain, model: &'r ModelDef, alias: &str) -> DomainResult<Self> {
        let domain = distribute_not(domain)?;
        Ok(Step::Requeue(
            domain
                .into_tokens()
                .into_iter()
                .map(|token| WorkItem::new(token, model, alias))
                .collect(),
        ))
    }
}

/// How a leaf is handled, decided by the first field of its path
#[derive(Debug, Clone, Copy)]
pub(crate) enum FieldKind<'r> {
    /// Field of a delegated parent model
    Inherited { parent: &'r ModelDef, link: &'r str },
    /// `id child_of ...` / `id parent_of ...`
    IdHierarchy,
    /// Dotted path through an auto-joined many2one
    AutoJoin { comodel: &'r ModelDef },
    /// Dotted path through an auto-joined one2many
    One2manyAutoJoin { field: &'r FieldDef, comodel: &'r ModelDef },
    /// Dotted path through a stored relational field
    RelatedPath { field: &'r FieldDef, comodel: &'r ModelDef },
    /// Non-stored field
    Computed { field: &'r FieldDef },
    One2many { field: &'r FieldDef, comodel: &'r ModelDef },
    Many2many { field: &'r FieldDef, comodel: &'r ModelDef },
    Many2one { comodel: &'r ModelDef },
    /// Binary field kept in the attachment table
    Binary { field: &'r FieldDef },
    Datetime,
    Translatable,
    Plain,
}

/// Classify `leaf` on `model`
pub(crate) fn classify<'r>(
    registry: &'r Registry,
    model: &'r ModelDef,
    leaf: &Leaf,
) -> DomainResult<FieldKind<'r>> {
    let (head, rest) = leaf.path();
    let field = match registry.resolve_field(model, head) {
        Some(FieldLookup::Local(field)) => field,
        Some(FieldLookup::Inherited { parent, link }) => {
            return Ok(FieldKind::Inherited { parent, link })
        }
        None => return Err(DomainError::invalid_field(&model.name, &leaf.left, leaf)),
    };

    if head == "id" && rest.is_none() && leaf.operator.is_hierarchy() {
        return Ok(FieldKind::IdHierarchy);
    }

    if rest.is_some() {
        if !field.store {
            return Ok(FieldKind::Computed { field });
        }
        if !field.field_type.is_relational() {
            return Err(DomainError::invalid_field(&model.name, &leaf.left, leaf));
        }
        let comodel = registry.comodel(field)?;
        return match (field.auto_join, field.field_type) {
            (true, FieldType::Many2one) => Ok(FieldKind::AutoJoin { comodel }),
            (true, FieldType::One2many) => Ok(FieldKind::One2manyAutoJoin { field, comodel }),
            (true, _) => Err(DomainError::Unsupported(format!(
                "auto_join on {} field {}.{}",
                field.field_type.type_name(),
                model.name,
                field.name
            ))),
            (false, _) => Ok(FieldKind::RelatedPath { field, comodel }),
        };
    }

    if !field.store {
        return Ok(FieldKind::Computed { field });
    }

    Ok(match field.field_type {
        FieldType::One2many => FieldKind::One2many {
            field,
            comodel: registry.comodel(field)?,
        },
        FieldType::Many2many => FieldKind::Many2many {
            field,
            comodel: registry.comodel(field)?,
        },
        FieldType::Many2one => FieldKind::Many2one {
            comodel: registry.comodel(field)?,
        },
        FieldType::Binary if field.attachment => FieldKind::Binary { field },
        FieldType::Datetime => FieldKind::Datetime,
        _ if field.translate => FieldKind::Translatable,
        _ => FieldKind::Plain,
    })
}

/// Ids or subquery on the right of a relational leaf
enum Related {
    Ids(Vec<RecordId>),
    Subquery(SqlFragment),
}

impl DomainCompiler {
    /// Rewrite the leaf of `item`, adding joins to `query` as needed
    pub(crate) async fn rewrite<'s>(
        &'s self,
        item: WorkItem<'s>,
        query: &mut Query,
    ) -> DomainResult<Step<'s>> {
        let WorkItem { token, model, alias } = item;
        let leaf = match token {
            Token::Leaf(leaf) => leaf,
            other => {
                return Err(DomainError::Malformed(format!(
                    "{:?} is not a leaf",
                    other
                )))
            }
        };

        if leaf.operator == Operator::EqIfSet {
            if leaf.right.is_unset() {
                return Ok(Step::Emit(SqlFragment::literal(true)));
            }
            let leaf = Leaf::new(leaf.left.clone(), Operator::Eq, leaf.right.clone());
            return Ok(Step::leaf(leaf, model, &alias));
        }

        let (head, rest) = leaf.path();
        match classify(self.registry(), model, &leaf)? {
            FieldKind::Inherited { parent, link } => {
                let parent_alias = query.left_join(&alias, link, &parent.table, "id", link);
                Ok(Step::leaf(leaf, parent, &parent_alias))
            }

            FieldKind::IdHierarchy => {
                let direction = hierarchy_direction(&leaf)?;
                let ids = self.to_ids(&leaf, model).await?;
                let domain = self
                    .hierarchy_domain(direction, &ids, model, None, Target::Ids)
                    .await?;
                Step::domain(&domain, model, &alias)
            }

            FieldKind::AutoJoin { comodel } => {
                let rest = rest.unwrap_or("id");
                let comodel_alias = query.left_join(&alias, head, &comodel.table, "id", head);
                Ok(Step::leaf(leaf.with_left(rest), comodel, &comodel_alias))
            }

            FieldKind::One2manyAutoJoin { field, comodel } => {
                let inverse = inverse_name(model, field)?;
                let domain = Domain::leaf(rest.unwrap_or("id"), leaf.operator, leaf.right.clone());
                let sub = self.where_calc(&comodel.name, &domain).await?;
                let column = qualified(sub.table_alias(), inverse);
                let subquery = sub.subselect(Some(&column));
                Ok(Step::leaf(Leaf::new("id", Operator::In, subquery), model, &alias))
            }

            FieldKind::RelatedPath { field, comodel } => {
                let domain = Domain::leaf(rest.unwrap_or("id"), leaf.operator, leaf.right.clone());
                let operand = match field.field_type {
                    FieldType::Many2one => {
                        let compiler = self.with_context(self.context().clone().with_active_test(false));
                        compiler.search(&comodel.name, &domain).await?.into_operand()
                    }
                    // Owners of lines are read in memory, which needs line ids
                    FieldType::One2many if !inverse_stored(model, field, comodel)? => {
                        ids_value(&self.line_ids(comodel, &domain).await?).into()
                    }
                    _ => self.search(&comodel.name, &domain).await?.into_operand(),
                };
                let leaf = Leaf::new(head, Operator::In, operand);
                Ok(Step::leaf(leaf, model, &alias))
            }

            FieldKind::Computed { field } => self.rewrite_computed(&leaf, model, &alias, field).await,

            FieldKind::One2many { field, comodel } => {
                self.rewrite_one2many(&leaf, model, &alias, field, comodel).await
            }

            FieldKind::Many2many { field, comodel } => {
                self.rewrite_many2many(&leaf, model, &alias, field, comodel).await
            }

            FieldKind::Many2one { comodel } => {
                if leaf.operator.is_hierarchy() {
                    let direction = hierarchy_direction(&leaf)?;
                    let ids = self.to_ids(&leaf, comodel).await?;
                    let domain = if comodel.name != model.name {
                        self.hierarchy_domain(direction, &ids, comodel, None, Target::Prefixed(head))
                            .await?
                    } else {
                        self.hierarchy_domain(direction, &ids, model, Some(head), Target::Ids)
                            .await?
                    };
                    return Step::domain(&domain, model, &alias);
                }
                if let Some(names) = leaf.right.as_value().filter(|v| names_of(v).is_some()) {
                    let rewritten = self.many2one_name_leaf(&leaf, comodel, names).await?;
                    return Ok(Step::leaf(rewritten, model, &alias));
                }
                Ok(Step::Emit(translate_leaf(&leaf, model, &alias, self.context())?))
            }

            FieldKind::Binary { field } => self.rewrite_binary(&leaf, model, &alias, field),

            FieldKind::Datetime => match widen_date(&leaf) {
                Some(widened) => Ok(Step::leaf(widened, model, &alias)),
                None => Ok(Step::Emit(translate_leaf(&leaf, model, &alias, self.context())?)),
            },

            FieldKind::Translatable if leaf.right.is_truthy() => {
                Ok(Step::Emit(self.translated_leaf(&leaf, &alias)?))
            }

            FieldKind::Translatable | FieldKind::Plain => {
                Ok(Step::Emit(translate_leaf(&leaf, model, &alias, self.context())?))
            }
        }
    }

    async fn rewrite_computed<'s>(
        &'s self,
        leaf: &Leaf,
        model: &'s ModelDef,
        alias: &str,
        field: &'s FieldDef,
    ) -> DomainResult<Step<'s>> {
        let text = leaf.to_string();
        let Some(hook_name) = field.search.as_deref() else {
            log_event(
                Event::ComputedFieldNotSearchable,
                &[("model", model.name.as_str()), ("leaf", text.as_str())],
            );
            return Ok(Step::Emit(SqlFragment::literal(true)));
        };
        let Some(hook) = self.registry().hook(hook_name) else {
            log_event(
                Event::SearchHookMissing,
                &[
                    ("model", model.name.as_str()),
                    ("hook", hook_name),
                    ("leaf", text.as_str()),
                ],
            );
            return Ok(Step::Emit(SqlFragment::literal(true)));
        };

        let domain = match leaf.path() {
            (_, Some(rest)) => {
                // The hook sees the ids of comodel records matching the rest of the path
                let comodel = self.registry().comodel(field)?;
                let related = Domain::leaf(rest, leaf.operator, leaf.right.clone());
                let operand = self.search(&comodel.name, &related).await?.into_operand();
                hook.search(model, Operator::In, &operand)?
            }
            (_, None) => hook.search(model, leaf.operator, &leaf.right)?,
        };
        Step::domain(&domain, model, alias)
    }

    async fn rewrite_one2many<'s>(
        &'s self,
        leaf: &Leaf,
        model: &'s ModelDef,
        alias: &str,
        field: &'s FieldDef,
        comodel: &'s ModelDef,
    ) -> DomainResult<Step<'s>> {
        let inverse_name = inverse_name(model, field)?;
        let inverse = comodel.field(inverse_name).ok_or_else(|| {
            DomainError::schema(format!(
                "{}.{} has no inverse field {} on {}",
                model.name, field.name, inverse_name, comodel.name
            ))
        })?;
        let negative = leaf.operator.is_negative();

        if leaf.operator.is_hierarchy() {
            let direction = hierarchy_direction(leaf)?;
            let ids = self.to_ids(leaf, comodel).await?;
            let domain = if comodel.name != model.name && inverse.store {
                self.hierarchy_domain(direction, &ids, comodel, None, Target::Prefixed(field.name.as_str()))
                    .await?
            } else if comodel.name != model.name {
                let lines = self
                    .hierarchy_domain(direction, &ids, comodel, None, Target::Ids)
                    .await?;
                let lines = self.line_ids(comodel, &lines).await?;
                Domain::leaf(field.name.as_str(), Operator::In, ids_value(&lines))
            } else {
                self.hierarchy_domain(direction, &ids, model, Some(field.name.as_str()), Target::Ids)
                    .await?
            };
            return Step::domain(&domain, model, alias);
        }

        if leaf.right.is_unset() {
            // No lines at all: records never referenced by the inverse
            let operator = if negative { Operator::In } else { Operator::NotIn };
            let operand: Operand = if inverse.store {
                SqlFragment::raw(format!(
                    "SELECT {inv} FROM {table} WHERE {inv} IS NOT NULL",
                    inv = quote(inverse_name),
                    table = quote(&comodel.table),
                ))
                .into()
            } else {
                let domain = Domain::leaf(inverse_name, Operator::Ne, Value::Bool(false));
                let lines = self.line_ids(comodel, &domain).await?;
                let owners = self.backend().read_references(comodel, &lines, inverse_name).await?;
                ids_value(&owners).into()
            };
            return Ok(Step::leaf(Leaf::new("id", operator, operand), model, alias));
        }

        let operator = if negative { Operator::NotIn } else { Operator::In };
        let related = self.related_ids(leaf, comodel).await?;
        let operand: Operand = match (related, inverse.store) {
            (Related::Ids(ids), _) if ids.is_empty() => {
                return Ok(Step::Emit(SqlFragment::literal(negative)));
            }
            (Related::Ids(ids), true) => SqlFragment::new(
                format!(
                    "SELECT {inv} FROM {table} WHERE {id} IN ({marks}) AND {inv} IS NOT NULL",
                    inv = quote(inverse_name),
                    table = quote(&comodel.table),
                    id = quote("id"),
                    marks = placeholders(ids.len()),
                ),
                ids.into_iter().map(SqlParam::Int).collect(),
            )
            .into(),
            (Related::Subquery(sub), true) => SqlFragment::new(
                format!(
                    "SELECT {inv} FROM {table} WHERE {id} IN ({sub}) AND {inv} IS NOT NULL",
                    inv = quote(inverse_name),
                    table = quote(&comodel.table),
                    id = quote("id"),
                    sub = sub.sql,
                ),
                sub.params,
            )
            .into(),
            (Related::Ids(ids), false) => {
                let owners = self.backend().read_references(comodel, &ids, inverse_name).await?;
                ids_value(&owners).into()
            }
            (Related::Subquery(_), false) => {
                return Err(DomainError::Unsupported(format!(
                    "subquery on {}.{} whose inverse {} is not stored",
                    model.name, field.name, inverse_name
                )))
            }
        };
        Ok(Step::leaf(Leaf::new("id", operator, operand), model, alias))
    }

    async fn rewrite_many2many<'s>(
        &'s self,
        leaf: &Leaf,
        model: &'s ModelDef,
        alias: &str,
        field: &'s FieldDef,
        comodel: &'s ModelDef,
    ) -> DomainResult<Step<'s>> {
        let relation = field.relation.as_ref().ok_or_else(|| {
            DomainError::schema(format!(
                "{}.{} has no relation table",
                model.name, field.name
            ))
        })?;
        let negative = leaf.operator.is_negative();

        if leaf.operator.is_hierarchy() {
            let direction = hierarchy_direction(leaf)?;
            let ids = self.to_ids(leaf, comodel).await?;
            let domain = self
                .hierarchy_domain(direction, &ids, comodel, None, Target::Ids)
                .await?;
            let result = self.search(&comodel.name, &domain).await?;
            if comodel.name == model.name {
                let leaf = Leaf::new("id", Operator::In, result.into_operand());
                return Ok(Step::leaf(leaf, model, alias));
            }
            let related = match result.into_operand() {
                Operand::Subquery(sub) => Related::Subquery(sub),
                value => Related::Ids(value.ids()),
            };
            return Ok(Step::Emit(exists(alias, &field.name, relation, related, true)));
        }

        if leaf.right.is_unset() {
            let operator = if negative { Operator::In } else { Operator::NotIn };
            let subquery = SqlFragment::raw(format!(
                "SELECT {c1} FROM {table} WHERE {c1} IS NOT NULL",
                c1 = quote(&relation.column1),
                table = quote(&relation.table),
            ));
            return Ok(Step::leaf(Leaf::new("id", operator, subquery), model, alias));
        }

        let related = self.related_ids(leaf, comodel).await?;
        Ok(Step::Emit(exists(alias, &field.name, relation, related, !negative)))
    }

    fn rewrite_binary<'s>(
        &'s self,
        leaf: &Leaf,
        model: &'s ModelDef,
        alias: &str,
        field: &FieldDef,
    ) -> DomainResult<Step<'s>> {
        let operator = match leaf.operator {
            Operator::Eq if !leaf.right.is_truthy() => Operator::NotIn,
            Operator::Ne if !leaf.right.is_truthy() => Operator::In,
            _ => {
                let text = leaf.to_string();
                log_event(
                    Event::BinarySearchIgnored,
                    &[("model", model.name.as_str()), ("leaf", text.as_str())],
                );
                return Ok(Step::Emit(SqlFragment::literal(true)));
            }
        };
        let subquery = SqlFragment::new(
            format!(
                "SELECT res_id FROM {} WHERE res_model = %s AND res_field = %s AND res_id IS NOT NULL",
                quote(&self.context().attachment_table)
            ),
            vec![
                SqlParam::Text(model.name.clone()),
                SqlParam::Text(field.name.clone()),
            ],
        );
        Ok(Step::leaf(Leaf::new("id", operator, subquery), model, alias))
    }

    /// Comparison on the current-language value of a translated column
    fn translated_leaf(&self, leaf: &Leaf, alias: &str) -> DomainResult<SqlFragment> {
        let ctx = self.context();
        let column = qualified(alias, &leaf.left);
        let (expr, mut params) = if ctx.lang == "en_US" {
            (format!("{}->>'en_US'", column), Vec::new())
        } else {
            (
                format!("COALESCE({c}->>%s, {c}->>'en_US')", c = column),
                vec![SqlParam::Text(ctx.lang.clone())],
            )
        };
        let value = leaf
            .right
            .as_value()
            .ok_or_else(|| DomainError::invalid_leaf(leaf, "translated fields take values"))?;
        let operator = leaf.operator;

        let fragment = match operator {
            Operator::In | Operator::NotIn => {
                let items = value.as_array().ok_or_else(|| {
                    DomainError::invalid_leaf(leaf, format!("{} expects a list of values", operator))
                })?;
                let positive = operator == Operator::In;
                let mut check_null = false;
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Null | Value::Bool(false) => check_null = true,
                        Value::Array(_) | Value::Object(_) => {
                            return Err(DomainError::invalid_leaf(leaf, "nested values are not allowed"))
                        }
                        other => values.push(SqlParam::from_json(other)?),
                    }
                }
                if values.is_empty() {
                    return Ok(match (positive, check_null) {
                        (true, false) => SqlFragment::literal(false),
                        (false, false) => SqlFragment::literal(true),
                        (true, true) => SqlFragment::raw(format!("({} IS NULL)", column)),
                        (false, true) => SqlFragment::raw(format!("({} IS NOT NULL)", column)),
                    });
                }
                let count = values.len();
                params.extend(values);
                let base = SqlFragment::new(
                    format!(
                        "({} {} ({}))",
                        expr,
                        operator.sql_operator().to_uppercase(),
                        placeholders(count)
                    ),
                    params,
                );
                // NULL rows match `in` only when false is listed, and
                // `not in` unless it is
                return Ok(match (positive, check_null) {
                    (true, false) => base,
                    (true, true) | (false, false) => base.or(is_null(&column)),
                    (false, true) => base.and(is_not_null(&column)),
                });
            }
            _ => {
                let pattern = operator.is_pattern();
                let (lhs, rhs) = if pattern {
                    (unaccent(ctx, &expr), unaccent(ctx, "%s"))
                } else {
                    (expr, "%s".to_string())
                };
                params.push(if operator.needs_wildcard() {
                    SqlParam::Text(format!("%{}%", value_text(value)))
                } else {
                    SqlParam::from_json(value)?
                });
                SqlFragment::new(
                    format!("({} {} {})", lhs, operator.sql_operator().to_uppercase(), rhs),
                    params,
                )
            }
        };

        if operator.is_negative() {
            Ok(fragment.or(is_null(&column)))
        } else {
            Ok(fragment)
        }
    }

    /// Ids of `comodel` records matching `domain`, fetched from the backend
    async fn line_ids(&self, comodel: &ModelDef, domain: &Domain) -> DomainResult<Vec<RecordId>> {
        let options = SearchOptions::default().with_active_test(self.context().active_test);
        self.backend().search_ids(comodel, domain, options).await
    }

    /// Comodel ids designated by the right side of a one2many or
    /// many2many leaf. Names are searched with the positive form of the
    /// operator.
    async fn related_ids(&self, leaf: &Leaf, comodel: &ModelDef) -> DomainResult<Related> {
        let value = match &leaf.right {
            Operand::Subquery(sub) => return Ok(Related::Subquery(sub.clone())),
            Operand::Value(value) => value,
        };
        if names_of(value).is_some() {
            let operator = if leaf.operator.is_negative() {
                leaf.operator.negate().unwrap_or(leaf.operator)
            } else {
                leaf.operator
            };
            let options = SearchOptions::default().with_active_test(self.context().active_test);
            let ids = self
                .backend()
                .name_search(comodel, value, operator, options)
                .await?;
            return Ok(Related::Ids(ids));
        }
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(|id| Related::Ids(vec![id]))
                .ok_or_else(|| DomainError::invalid_leaf(leaf, "ids must be integers")),
            Value::Array(items) => items
                .iter()
                .filter(|item| !item.is_null() && item.as_bool() != Some(false))
                .map(|item| {
                    item.as_i64()
                        .ok_or_else(|| DomainError::invalid_leaf(leaf, "ids must be integers"))
                })
                .collect::<DomainResult<Vec<_>>>()
                .map(Related::Ids),
            _ => Err(DomainError::invalid_leaf(leaf, "expected ids or names")),
        }
    }
}

fn hierarchy_direction(leaf: &Leaf) -> DomainResult<Direction> {
    Direction::from_operator(leaf.operator)
        .ok_or_else(|| DomainError::invalid_leaf(leaf, "not a hierarchy operator"))
}

fn inverse_name<'f>(model: &ModelDef, field: &'f FieldDef) -> DomainResult<&'f str> {
    field.inverse_name.as_deref().ok_or_else(|| {
        DomainError::schema(format!(
            "one2many {}.{} has no inverse_name",
            model.name, field.name
        ))
    })
}

/// Whether the inverse many2one of a one2many has a column
fn inverse_stored(model: &ModelDef, field: &FieldDef, comodel: &ModelDef) -> DomainResult<bool> {
    let name = inverse_name(model, field)?;
    Ok(comodel.field(name).map_or(true, |inverse| inverse.store))
}

fn ids_value(ids: &[RecordId]) -> Value {
    Value::Array(ids.iter().map(|id| Value::from(*id)).collect())
}

/// `[NOT] EXISTS` over the relation table of a many2many field
fn exists(
    alias: &str,
    field_name: &str,
    relation: &RelationTable,
    related: Related,
    positive: bool,
) -> SqlFragment {
    let (targets, params) = match related {
        Related::Ids(ids) if ids.is_empty() => return SqlFragment::literal(!positive),
        Related::Ids(ids) => (
            placeholders(ids.len()),
            ids.into_iter().map(SqlParam::Int).collect(),
        ),
        Related::Subquery(sub) => (sub.sql, sub.params),
    };
    let rel_alias = Query::make_alias(alias, field_name);
    SqlFragment::new(
        format!(
            "{}EXISTS (SELECT 1 FROM {} AS {} WHERE {} = {} AND {} IN ({}))",
            if positive { "" } else { "NOT " },
            quote(&relation.table),
            quote(&rel_alias),
            qualified(&rel_alias, &relation.column1),
            qualified(alias, "id"),
            qualified(&rel_alias, &relation.column2),
            targets
        ),
        params,
    )
}

/// A date-only value compared with a datetime column covers the whole day
fn widen_date(leaf: &Leaf) -> Option<Leaf> {
    let Some(Value::String(date)) = leaf.right.as_value() else {
        return None;
    };
    if date.len() != 10 || NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return None;
    }
    let time = match leaf.operator {
        Operator::Gt | Operator::Le => "23:59:59",
        _ => "00:00:00",
    };
    Some(Leaf::new(
        leaf.left.clone(),
        leaf.operator,
        Value::String(format!("{} {}", date, time)),
    ))
}
