use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{ListboxError, Result};

static NEXT_OPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity assigned to an option when it is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OptionId(u64);

impl OptionId {
    fn allocate() -> Self {
        Self(NEXT_OPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option-{}", self.0)
    }
}

/// Option as declared by the host, before registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OptionDecl {
    pub label: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl OptionDecl {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
        }
    }

    pub fn with_value(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: Some(value.into()),
        }
    }

    /// Parse an ordered JSON array of `{ "label": .., "value": .. }` objects.
    pub fn list_from_json(json: &str) -> Result<Vec<OptionDecl>> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A registered, immutable option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOption {
    pub id: OptionId,
    pub label: String,
    pub value: String,
}

/// Outcome of matching a requested initial value against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialResolution<'a> {
    /// The request matched an option's label or value.
    Matched(&'a ListOption),
    /// Nothing was requested; the first option applies.
    Default(&'a ListOption),
    /// The request matched nothing; the first option applies instead.
    Fallback(&'a ListOption),
}

impl<'a> InitialResolution<'a> {
    pub fn option(&self) -> &'a ListOption {
        match *self {
            InitialResolution::Matched(option)
            | InitialResolution::Default(option)
            | InitialResolution::Fallback(option) => option,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, InitialResolution::Fallback(_))
    }
}

/// Ordered options of one mounted listbox.
#[derive(Debug, Clone)]
pub struct OptionRegistry {
    options: Vec<ListOption>,
}

impl OptionRegistry {
    /// Register every eligible declaration in order. Declarations whose label
    /// is blank are skipped; zero survivors is an error.
    pub fn scan<I>(decls: I) -> Result<Self>
    where
        I: IntoIterator<Item = OptionDecl>,
    {
        let options: Vec<ListOption> = decls
            .into_iter()
            .filter_map(|decl| {
                let label = decl.label.trim().to_string();
                if label.is_empty() {
                    return None;
                }
                let value = decl.value.unwrap_or_else(|| label.clone());
                Some(ListOption {
                    id: OptionId::allocate(),
                    label,
                    value,
                })
            })
            .collect();

        if options.is_empty() {
            return Err(ListboxError::EmptyRegistry);
        }
        Ok(Self { options })
    }

    /// First option whose label or value equals `requested`, in registration order.
    pub fn resolve_initial(&self, requested: Option<&str>) -> InitialResolution<'_> {
        let first = &self.options[0];
        match requested {
            None => InitialResolution::Default(first),
            Some(wanted) => self
                .options
                .iter()
                .find(|option| option.label == wanted || option.value == wanted)
                .map(InitialResolution::Matched)
                .unwrap_or(InitialResolution::Fallback(first)),
        }
    }

    pub fn get(&self, id: OptionId) -> Option<&ListOption> {
        self.options.iter().find(|option| option.id == id)
    }

    pub fn index_of(&self, id: OptionId) -> Option<usize> {
        self.options.iter().position(|option| option.id == id)
    }

    pub fn contains(&self, id: OptionId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn first(&self) -> &ListOption {
        &self.options[0]
    }

    pub fn last(&self) -> &ListOption {
        &self.options[self.options.len() - 1]
    }

    /// Option after `id`, or `None` when `id` is last or unknown.
    pub fn next(&self, id: OptionId) -> Option<&ListOption> {
        self.index_of(id).and_then(|idx| self.options.get(idx + 1))
    }

    /// Option before `id`, or `None` when `id` is first or unknown.
    pub fn previous(&self, id: OptionId) -> Option<&ListOption> {
        self.index_of(id)
            .and_then(|idx| idx.checked_sub(1))
            .and_then(|idx| self.options.get(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
