//! Field and model metadata
//!
//! Model files describe fields as a JSON map keyed by field name:
//!
//! ```json
//! {
//!   "name": "sale.order",
//!   "table": "sale_order",
//!   "fields": {
//!     "partner_id": {"type": "many2one", "comodel": "res.partner"},
//!     "tag_ids": {"type": "many2many", "comodel": "sale.tag",
//!                 "relation": {"table": "sale_order_tag_rel",
//!                              "column1": "order_id", "column2": "tag_id"}}
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Char,
    Text,
    Html,
    Integer,
    Float,
    Monetary,
    Selection,
    Date,
    Datetime,
    Binary,
    Many2one,
    One2many,
    Many2many,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Char => "char",
            FieldType::Text => "text",
            FieldType::Html => "html",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Monetary => "monetary",
            FieldType::Selection => "selection",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Binary => "binary",
            FieldType::Many2one => "many2one",
            FieldType::One2many => "one2many",
            FieldType::Many2many => "many2many",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            FieldType::Many2one | FieldType::One2many | FieldType::Many2many
        )
    }

    /// Types whose values can be translated per language
    pub fn is_translatable(&self) -> bool {
        matches!(self, FieldType::Char | FieldType::Text | FieldType::Html)
    }
}

/// Join table of a many2many field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTable {
    pub table: String,
    /// Column referencing the model's own records
    pub column1: String,
    /// Column referencing the comodel's records
    pub column2: String,
}

fn default_true() -> bool {
    true
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Filled from the map key when loaded from JSON
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Target model of relational fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comodel: Option<String>,
    /// Whether the field has a column
    #[serde(default = "default_true")]
    pub store: bool,
    /// Per-language values stored as a JSON object keyed by language
    #[serde(default)]
    pub translate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationTable>,
    /// many2one on the comodel pointing back (one2many only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_name: Option<String>,
    /// Name of the registered search hook (non-stored fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Traverse with a SQL join instead of an id subquery
    #[serde(default)]
    pub auto_join: bool,
    /// Binary content lives in the attachment table
    #[serde(default)]
    pub attachment: bool,
}

impl FieldDef {
    /// Create a stored field of the given type
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            comodel: None,
            store: true,
            translate: false,
            relation: None,
            inverse_name: None,
            search: None,
            auto_join: false,
            attachment: false,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn char(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Char)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn selection(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Selection)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Datetime)
    }

    /// Binary field stored in the attachment table
    pub fn binary_attachment(name: impl Into<String>) -> Self {
        Self {
            attachment: true,
            ..Self::new(name, FieldType::Binary)
        }
    }

    pub fn many2one(name: impl Into<String>, comodel: impl Into<String>) -> Self {
        Self {
            comodel: Some(comodel.into()),
            ..Self::new(name, FieldType::Many2one)
        }
    }

    pub fn one2many(
        name: impl Into<String>,
        comodel: impl Into<String>,
        inverse_name: impl Into<String>,
    ) -> Self {
        Self {
            comodel: Some(comodel.into()),
            inverse_name: Some(inverse_name.into()),
            ..Self::new(name, FieldType::One2many)
        }
    }

    pub fn many2many(
        name: impl Into<String>,
        comodel: impl Into<String>,
        table: impl Into<String>,
        column1: impl Into<String>,
        column2: impl Into<String>,
    ) -> Self {
        Self {
            comodel: Some(comodel.into()),
            relation: Some(RelationTable {
                table: table.into(),
                column1: column1.into(),
                column2: column2.into(),
            }),
            ..Self::new(name, FieldType::Many2many)
        }
    }

    /// Mark the field as translatable
    pub fn translated(mut self) -> Self {
        self.translate = true;
        self
    }

    /// Mark the relation as auto-joined
    pub fn auto_joined(mut self) -> Self {
        self.auto_join = true;
        self
    }

    /// Mark the field as computed without a column
    pub fn not_stored(mut self) -> Self {
        self.store = false;
        self
    }

    /// Attach a named search hook
    pub fn searched_by(mut self, hook: impl Into<String>) -> Self {
        self.search = Some(hook.into());
        self
    }
}

fn default_parent_name() -> String {
    "parent_id".to_string()
}

fn default_rec_name() -> String {
    "name".to_string()
}

/// Model definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDef {
    /// Model name (`res.partner`)
    pub name: String,
    /// Backing table (`res_partner`)
    pub table: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDef>,
    /// Delegation: parent model name -> many2one field holding the parent
    #[serde(default)]
    pub inherits: BTreeMap<String, String>,
    /// many2one used by hierarchy operators
    #[serde(default = "default_parent_name")]
    pub parent_name: String,
    /// Whether `parent_path` holds the materialized ancestor chain
    #[serde(default)]
    pub parent_store: bool,
    /// Boolean field filtering archived records (defaults to `active`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_name: Option<String>,
    /// Field matched by name search
    #[serde(default = "default_rec_name")]
    pub rec_name: String,
}

impl ModelDef {
    /// Create a model with only its `id` field
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        let mut model = Self {
            name: name.into(),
            table: table.into(),
            fields: BTreeMap::new(),
            inherits: BTreeMap::new(),
            parent_name: default_parent_name(),
            parent_store: false,
            active_name: None,
            rec_name: default_rec_name(),
        };
        model.finalize();
        model
    }

    /// Add a field
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Delegate to `parent_model` through the many2one `link_field`
    pub fn inheriting(mut self, parent_model: impl Into<String>, link_field: impl Into<String>) -> Self {
        self.inherits.insert(parent_model.into(), link_field.into());
        self
    }

    /// Enable the materialized `parent_path` column
    pub fn with_parent_store(mut self) -> Self {
        self.parent_store = true;
        self.finalize();
        self
    }

    pub fn with_parent_name(mut self, field: impl Into<String>) -> Self {
        self.parent_name = field.into();
        self
    }

    pub fn with_rec_name(mut self, field: impl Into<String>) -> Self {
        self.rec_name = field.into();
        self
    }

    /// Fill field names from map keys and add implicit fields
    pub fn finalize(&mut self) {
        for (name, field) in self.fields.iter_mut() {
            field.name = name.clone();
        }
        self.fields
            .entry("id".to_string())
            .or_insert_with(|| FieldDef::integer("id"));
        if self.parent_store {
            self.fields
                .entry("parent_path".to_string())
                .or_insert_with(|| FieldDef::char("parent_path"));
        }
    }

    /// Local field by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Field filtering archived records, if the model has one
    pub fn active_field(&self) -> Option<&str> {
        match &self.active_name {
            Some(name) => Some(name.as_str()),
            None => self
                .fields
                .get("active")
                .filter(|f| f.field_type == FieldType::Boolean && f.store)
                .map(|f| f.name.as_str()),
        }
    }
}
