use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FruitOption, OrderId};

pub const FORM_TITLE: &str = ":cup_with_straw: Customize Your Smoothie :cup_with_straw:";
pub const FORM_INSTRUCTIONS: &str = "Choose the fruits you want in your custom smoothie";

/// What the front end posts for one render of the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormInput {
    #[serde(default)]
    pub name_on_order: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub submit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub level: BannerLevel,
    pub message: String,
}

impl Banner {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum NutritionOutcome {
    Record(serde_json::Value),
    Warning(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionPanel {
    pub fruit: String,
    pub heading: String,
    pub outcome: NutritionOutcome,
}

/// Where one render of the form ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    #[default]
    Idle,
    SelectionChanged,
    NutritionDisplayed,
    SubmitRequested,
    Inserted,
    InsertFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderVerification {
    pub ingredients: String,
    pub ingredients_hash: String,
    pub name_hash: String,
}

/// One persisted order as read back from the orders table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrder {
    pub order_id: OrderId,
    pub ingredients: String,
    pub name_on_order: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the front end needs to draw the form after one render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormView {
    pub title: String,
    pub instructions: String,
    pub name_preview: String,
    pub options: Vec<FruitOption>,
    pub max_ingredients: usize,
    pub panels: Vec<NutritionPanel>,
    pub banners: Vec<Banner>,
    pub state: FormState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification: Vec<OrderVerification>,
}
