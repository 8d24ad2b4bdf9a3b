//! Model registry
//!
//! Holds every model definition the compiler may visit, plus the named
//! search hooks computed fields refer to. The registry is built once and
//! shared read-only behind an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::errors::{DomainError, DomainResult};

use super::hooks::SearchHook;
use super::types::{FieldDef, FieldType, ModelDef};

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

fn model_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z0-9_]+)*$").expect("static regex"))
}

/// Check that `name` can be used as a SQL identifier
pub fn is_identifier(name: &str) -> bool {
    identifier_re().is_match(name)
}

/// Where a field name resolves on a model
#[derive(Debug, Clone, Copy)]
pub enum FieldLookup<'r> {
    /// Defined on the model itself
    Local(&'r FieldDef),
    /// Provided by a delegated parent reached through `link`
    Inherited { parent: &'r ModelDef, link: &'r str },
}

/// Registry of models and search hooks
#[derive(Clone, Default)]
pub struct Registry {
    models: BTreeMap<String, ModelDef>,
    hooks: HashMap<String, Arc<dyn SearchHook>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model.
    ///
    /// Names are checked here; cross-model references are checked by
    /// [`Registry::validate`] once every model is present.
    pub fn register_model(&mut self, mut model: ModelDef) -> DomainResult<()> {
        if !model_name_re().is_match(&model.name) {
            return Err(DomainError::schema(format!(
                "invalid model name '{}'",
                model.name
            )));
        }
        if !is_identifier(&model.table) {
            return Err(DomainError::schema(format!(
                "model {} has invalid table name '{}'",
                model.name, model.table
            )));
        }
        if self.models.contains_key(&model.name) {
            return Err(DomainError::schema(format!(
                "model {} is already registered",
                model.name
            )));
        }
        model.finalize();
        for name in model.fields.keys() {
            if !is_identifier(name) {
                return Err(DomainError::schema(format!(
                    "model {} has invalid field name '{}'",
                    model.name, name
                )));
            }
        }
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    /// Builder form of [`Registry::register_model`]
    pub fn with_model(mut self, model: ModelDef) -> DomainResult<Self> {
        self.register_model(model)?;
        Ok(self)
    }

    /// Register a search hook under `name`
    pub fn register_hook(&mut self, name: impl Into<String>, hook: impl SearchHook + 'static) {
        self.hooks.insert(name.into(), Arc::new(hook));
    }

    pub fn hook(&self, name: &str) -> Option<&dyn SearchHook> {
        self.hooks.get(name).map(|h| h.as_ref())
    }

    /// Model by name
    pub fn model(&self, name: &str) -> DomainResult<&ModelDef> {
        self.models
            .get(name)
            .ok_or_else(|| DomainError::UnknownModel(name.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelDef> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Target model of a relational field
    pub fn comodel(&self, field: &FieldDef) -> DomainResult<&ModelDef> {
        match &field.comodel {
            Some(name) => self.model(name),
            None => Err(DomainError::schema(format!(
                "field {} has no comodel",
                field.name
            ))),
        }
    }

    /// Resolve a field name on `model`, looking through delegated parents
    pub fn resolve_field<'r>(&'r self, model: &'r ModelDef, name: &str) -> Option<FieldLookup<'r>> {
        if let Some(field) = model.field(name) {
            return Some(FieldLookup::Local(field));
        }
        self.inherited_field(model, name, 0)
    }

    /// Field filtering archived records of `model`, its own or one reached
    /// through delegation
    pub fn active_field<'r>(&'r self, model: &'r ModelDef) -> Option<&'r str> {
        self.delegated_active_field(model, 0)
    }

    fn delegated_active_field<'r>(&'r self, model: &'r ModelDef, depth: usize) -> Option<&'r str> {
        if let Some(name) = model.active_field() {
            return Some(name);
        }
        if depth > self.models.len() {
            return None;
        }
        model
            .inherits
            .keys()
            .filter_map(|parent| self.models.get(parent))
            .find_map(|parent| self.delegated_active_field(parent, depth + 1))
    }

    fn inherited_field<'r>(
        &'r self,
        model: &'r ModelDef,
        name: &str,
        depth: usize,
    ) -> Option<FieldLookup<'r>> {
        if depth > self.models.len() {
            return None;
        }
        for (parent_name, link) in &model.inherits {
            let Some(parent) = self.models.get(parent_name) else {
                continue;
            };
            if parent.field(name).is_some()
                || self.inherited_field(parent, name, depth + 1).is_some()
            {
                return Some(FieldLookup::Inherited {
                    parent,
                    link: link.as_str(),
                });
            }
        }
        None
    }

    /// Check cross-model references
    pub fn validate(&self) -> DomainResult<()> {
        for model in self.models.values() {
            for field in model.fields.values() {
                self.validate_field(model, field)?;
            }
            for (parent, link) in &model.inherits {
                self.model(parent)?;
                match model.field(link) {
                    Some(f) if f.field_type == FieldType::Many2one => {}
                    _ => {
                        return Err(DomainError::schema(format!(
                            "model {} delegates to {} through '{}', which is not a many2one",
                            model.name, parent, link
                        )))
                    }
                }
            }
            if model.parent_store && model.field(&model.parent_name).is_none() {
                return Err(DomainError::schema(format!(
                    "model {} stores parent paths without a '{}' field",
                    model.name, model.parent_name
                )));
            }
        }
        Ok(())
    }

    fn validate_field(&self, model: &ModelDef, field: &FieldDef) -> DomainResult<()> {
        let context = |msg: &str| {
            DomainError::schema(format!("field {}.{}: {}", model.name, field.name, msg))
        };
        if field.field_type.is_relational() {
            let comodel = field
                .comodel
                .as_deref()
                .ok_or_else(|| context("relational field without comodel"))?;
            let target = self
                .models
                .get(comodel)
                .ok_or_else(|| context(&format!("unknown comodel {}", comodel)))?;
            if field.field_type == FieldType::One2many {
                let inverse = field
                    .inverse_name
                    .as_deref()
                    .ok_or_else(|| context("one2many without inverse_name"))?;
                if target.field(inverse).is_none() {
                    return Err(context(&format!(
                        "inverse field {}.{} does not exist",
                        comodel, inverse
                    )));
                }
            }
            if field.field_type == FieldType::Many2many && field.store {
                let relation = field
                    .relation
                    .as_ref()
                    .ok_or_else(|| context("many2many without relation table"))?;
                for ident in [&relation.table, &relation.column1, &relation.column2] {
                    if !is_identifier(ident) {
                        return Err(context(&format!("invalid identifier '{}'", ident)));
                    }
                }
            }
        }
        if field.translate && !field.field_type.is_translatable() {
            return Err(context("only text fields can be translated"));
        }
        Ok(())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooks: Vec<&String> = self.hooks.keys().collect();
        hooks.sort();
        f.debug_struct("Registry")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("hooks", &hooks)
            .finish()
    }
}
