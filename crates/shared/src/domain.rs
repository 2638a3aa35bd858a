use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the number of ingredients in one smoothie.
pub const MAX_INGREDIENTS: usize = 5;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(OrderId);

/// One row of the reference table: display name plus the key the nutrition
/// service knows the fruit by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FruitOption {
    pub name: String,
    pub search_key: String,
}

impl FruitOption {
    pub fn new(name: impl Into<String>, search_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            search_key: search_key.into(),
        }
    }
}

/// Case rule applied after trimming a name or an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationRule {
    #[default]
    Upper,
    Trim,
    Capitalize,
}

impl NormalizationRule {
    pub fn apply(self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self {
            Self::Upper => trimmed.to_uppercase(),
            Self::Trim => trimmed.to_string(),
            Self::Capitalize => trimmed
                .split_whitespace()
                .map(capitalize_word)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("selected {count} ingredients, at most {max} allowed")]
    TooMany { count: usize, max: usize },
}

/// Fruit names picked in one render, in the order the user picked them.
///
/// Names are trimmed, blank entries are dropped and duplicates collapse onto
/// their first occurrence. The checked constructor is the only way to build one, so a value
/// of this type never holds more than the cap it was built with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Selection {
    names: Vec<String>,
}

impl Selection {
    pub fn new<I, S>(names: I, max: usize) -> Result<Self, SelectionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name: String = name.into();
            let name = name.trim();
            if name.is_empty() || unique.iter().any(|seen| seen == name) {
                continue;
            }
            unique.push(name.to_string());
        }
        if unique.len() > max {
            return Err(SelectionError::TooMany {
                count: unique.len(),
                max,
            });
        }
        Ok(Self { names: unique })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A confirmed submission, exactly as it is written to the orders table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub ingredients: String,
    pub name_on_order: String,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
