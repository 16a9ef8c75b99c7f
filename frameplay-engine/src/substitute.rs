//! Parameter substitution over nested templates.
//!
//! Every string leaf is checked against the reference grammar in
//! [`crate::selector`]; matches are replaced by the referenced value, all other
//! leaves are copied as they are. Values taken from the parameter set are
//! inserted verbatim and not substituted again.

use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value};

use crate::config::ParameterSet;
use crate::error::{SelectorError, SubstitutionError};
use crate::permutation::PermutationState;
use crate::selector::{Reference, Selector, parse_reference};

pub struct Substituter<'a, R> {
    params: &'a ParameterSet,
    permutations: &'a mut PermutationState,
    rng: &'a mut R,
}

impl<'a, R: Rng> Substituter<'a, R> {
    pub fn new(
        params: &'a ParameterSet,
        permutations: &'a mut PermutationState,
        rng: &'a mut R,
    ) -> Self {
        Self {
            params,
            permutations,
            rng,
        }
    }

    /// Resolve every reference in `template` into a new value.
    ///
    /// # Errors
    ///
    /// Returns the first reference that cannot be resolved, with its JSON path.
    pub fn substitute(&mut self, template: &Value) -> Result<Value, SubstitutionError> {
        let mut path = Vec::new();
        self.visit(template, &mut path)
    }

    fn visit(&mut self, value: &Value, path: &mut Vec<String>) -> Result<Value, SubstitutionError> {
        match value {
            Value::Object(map) => {
                let mut resolved = Map::new();
                for (key, child) in map {
                    path.push(key.clone());
                    let child = self.visit(child, path)?;
                    path.pop();
                    resolved.insert(key.clone(), child);
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for (index, child) in items.iter().enumerate() {
                    path.push(index.to_string());
                    let child = self.visit(child, path)?;
                    path.pop();
                    resolved.push(child);
                }
                Ok(Value::Array(resolved))
            }
            Value::String(leaf) => self.resolve_leaf(leaf).map_err(|kind| SubstitutionError {
                path: render_path(path),
                kind,
            }),
            scalar => Ok(scalar.clone()),
        }
    }

    fn resolve_leaf(&mut self, leaf: &str) -> Result<Value, SelectorError> {
        let params = self.params;
        let Some(reference) = parse_reference(leaf, params)? else {
            return Ok(Value::String(leaf.to_string()));
        };
        let Reference { name, selector } = reference;
        let Some(value) = params.get(name) else {
            return Ok(Value::String(leaf.to_string()));
        };
        let Some(selector) = selector else {
            return Ok(value.clone());
        };
        let Value::Array(items) = value else {
            return Err(SelectorError::NotAList {
                name: name.to_string(),
                selector: selector.to_string(),
            });
        };
        log::trace!("resolving {name}{selector}");

        let empty = || SelectorError::EmptyList {
            name: name.to_string(),
            selector: selector.to_string(),
        };
        match selector {
            Selector::Index(index) => {
                items
                    .get(index)
                    .cloned()
                    .ok_or_else(|| SelectorError::IndexOutOfRange {
                        name: name.to_string(),
                        index,
                        len: items.len(),
                    })
            }
            Selector::Rand => items.choose(&mut *self.rng).cloned().ok_or_else(empty),
            Selector::Perm => {
                let mut shuffled = items.clone();
                shuffled.shuffle(&mut *self.rng);
                Ok(Value::Array(shuffled))
            }
            Selector::Uniq => self
                .permutations
                .next_unique(name, items, &mut *self.rng)
                .ok_or_else(empty),
        }
    }
}

fn render_path(path: &[String]) -> String {
    if path.is_empty() {
        String::from("/")
    } else {
        path.iter().fold(String::new(), |mut rendered, segment| {
            rendered.push('/');
            rendered.push_str(segment);
            rendered
        })
    }
}
