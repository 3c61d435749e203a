//! Boolean variables that gate variation conditions
//!
//! Variables are declared by configuration with a default value. Two
//! variables are always declared because the scheduler derives them from
//! the actor's attention target right before choosing a variation.

use crate::error::{Error, Result};
use crate::identity::VariableId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Set while the attention target is above the speaking actor
pub const TARGET_IS_ABOVE: &str = "TargetIsAbove";
/// Set while the attention target is below the speaking actor
pub const TARGET_IS_BELOW: &str = "TargetIsBelow";

/// Declaration of one boolean variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    #[serde(default)]
    pub default: bool,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            default,
        }
    }
}

/// All declared variables, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarations {
    decls: IndexMap<VariableId, VariableDecl>,
}

impl VariableDeclarations {
    /// Create declarations holding only the built-in target variables
    pub fn new() -> Self {
        let mut decls = IndexMap::new();
        for name in [TARGET_IS_ABOVE, TARGET_IS_BELOW] {
            decls.insert(VariableId::from_name(name), VariableDecl::new(name, false));
        }
        Self { decls }
    }

    /// Declare a variable
    ///
    /// Redeclaring a built-in variable only updates its default.
    pub fn declare(&mut self, decl: VariableDecl) -> Result<VariableId> {
        let id = VariableId::from_name(&decl.name);
        if let Some(existing) = self.decls.get_mut(&id) {
            let builtin = [TARGET_IS_ABOVE, TARGET_IS_BELOW]
                .iter()
                .any(|b| b.eq_ignore_ascii_case(&decl.name));
            if builtin {
                existing.default = decl.default;
                return Ok(id);
            }
            return Err(Error::name_clash("variable", &decl.name, &existing.name));
        }
        self.decls.insert(id, decl);
        Ok(id)
    }

    /// Resolve a declared variable by name
    pub fn id_of(&self, name: &str) -> Option<VariableId> {
        let id = VariableId::from_name(name);
        self.decls.contains_key(&id).then_some(id)
    }

    /// Check if a variable is declared
    pub fn contains(&self, id: VariableId) -> bool {
        self.decls.contains_key(&id)
    }

    /// Declared names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.decls.values().map(|d| d.name.as_str())
    }

    /// Number of declared variables
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Check if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Merge another set of declarations into this one
    pub fn extend(&mut self, other: &VariableDeclarations) -> Vec<Error> {
        other
            .decls
            .values()
            .filter_map(|d| self.declare(d.clone()).err())
            .collect()
    }

    /// Runtime values initialised to the declared defaults
    pub fn defaults(&self) -> Variables {
        let mut vars = Variables::default();
        for (id, decl) in &self.decls {
            vars.set(*id, decl.default);
        }
        vars
    }
}

impl Default for VariableDeclarations {
    fn default() -> Self {
        Self::new()
    }
}

/// Current values of the condition variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    values: HashMap<VariableId, bool>,
}

impl Variables {
    /// Get a variable value; unknown variables read as false
    pub fn get(&self, id: VariableId) -> bool {
        self.values.get(&id).copied().unwrap_or(false)
    }

    /// Set a variable value
    pub fn set(&mut self, id: VariableId, value: bool) {
        self.values.insert(id, value);
    }

    /// Set a variable value by name
    pub fn set_named(&mut self, name: &str, value: bool) {
        self.set(VariableId::from_name(name), value);
    }
}
