use std::sync::Arc;

use nutrition::NutritionLookup;
use shared::{
    domain::{FruitOption, NormalizationRule, Order, OrderId, Selection, MAX_INGREDIENTS},
    error::{ApiError, ApiException, ErrorCode},
    protocol::{
        Banner, FormInput, FormState, FormView, NutritionOutcome, NutritionPanel, FORM_INSTRUCTIONS,
        FORM_TITLE,
    },
};
use storage::Storage;
use tracing::{debug, info, warn};

mod state;

pub use state::{FormMachine, InvalidTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormSettings {
    pub max_ingredients: usize,
    pub name_rule: NormalizationRule,
    pub ingredient_rule: NormalizationRule,
    pub verify_after_insert: bool,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            max_ingredients: MAX_INGREDIENTS,
            name_rule: NormalizationRule::Upper,
            ingredient_rule: NormalizationRule::Upper,
            verify_after_insert: false,
        }
    }
}

/// Everything one render needs, handed in explicitly.
#[derive(Clone)]
pub struct OrderFormContext {
    pub storage: Storage,
    pub nutrition: Arc<dyn NutritionLookup>,
    pub settings: FormSettings,
}

pub fn capture_name(raw: &str, rule: NormalizationRule) -> String {
    rule.apply(raw)
}

/// Cap actually enforced for a configured `max_ingredients`: at least one
/// pick, never more than [`MAX_INGREDIENTS`].
pub fn effective_cap(max: usize) -> usize {
    max.clamp(1, MAX_INGREDIENTS)
}

/// Builds the selection for this render. Anything over `max` is refused with
/// the warning the form shows; the cap can never be exceeded downstream.
pub fn capture_selection(
    options: &[FruitOption],
    chosen: &[String],
    max: usize,
) -> Result<Selection, Banner> {
    let max = effective_cap(max);
    let selection = Selection::new(chosen.iter().cloned(), max).map_err(|e| {
        warn!(error = %e, "order form: selection over cap");
        Banner::warning(format!("You can select only up to {max} ingredients."))
    })?;
    for name in selection.names() {
        if lookup_search_key(options, name).is_none() {
            debug!(fruit = %name, "order form: selected fruit not in reference table");
        }
    }
    Ok(selection)
}

/// Search key of the first reference row named `name`. A row with a blank
/// key counts as a miss.
pub fn lookup_search_key<'a>(options: &'a [FruitOption], name: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|option| option.name == name)
        .map(|option| option.search_key.trim())
        .filter(|key| !key.is_empty())
}

pub fn normalize_ingredients(selection: &Selection, rule: NormalizationRule) -> String {
    selection
        .names()
        .iter()
        .map(|name| rule.apply(name))
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Looks a fruit up and turns the result into the panel drawn under its
/// heading. Failures stay local to the panel.
pub async fn nutrition_panel(
    ctx: &OrderFormContext,
    fruit: &str,
    search_key: &str,
) -> NutritionPanel {
    let outcome = match ctx.nutrition.fetch_nutrition(search_key).await {
        Ok(record) => NutritionOutcome::Record(record),
        Err(failure) if failure.is_soft() => {
            info!(fruit, search_key, error = %failure, "order form: nutrition unavailable");
            NutritionOutcome::Warning(format!("Could not fetch nutrition data for {fruit}"))
        }
        Err(failure) => {
            warn!(fruit, search_key, error = %failure, "order form: nutrition lookup failed");
            NutritionOutcome::Error(format!("Error fetching data: {failure}"))
        }
    };
    NutritionPanel {
        fruit: fruit.to_string(),
        heading: format!("{fruit} Nutrition Information"),
        outcome,
    }
}

pub async fn submit_order(
    ctx: &OrderFormContext,
    ingredients: &str,
    name_on_order: &str,
) -> Result<OrderId, ApiException> {
    let order = Order {
        ingredients: ingredients.to_string(),
        name_on_order: name_on_order.to_string(),
    };
    let order_id = ctx.storage.insert_order(&order).await.map_err(|e| {
        warn!(error = %e, "order form: insert failed");
        ApiException::new(ErrorCode::Storage, format!("{e:#}"))
    })?;
    info!(order_id = order_id.0, name_on_order, ingredients, "order form: order placed");
    Ok(order_id)
}

/// Runs one full interaction with the form: load the reference table, read
/// the inputs, show nutrition for each pick, and place the order when asked.
///
/// Only a failure to load the reference table is returned as an error; every
/// other problem ends up as a banner or panel in the view.
pub async fn render(ctx: &OrderFormContext, input: &FormInput) -> Result<FormView, ApiError> {
    let options = ctx
        .storage
        .load_fruit_options()
        .await
        .map_err(storage_error)?;
    let name_on_order = capture_name(&input.name_on_order, ctx.settings.name_rule);

    let mut machine = FormMachine::new();
    let mut view = FormView {
        title: FORM_TITLE.to_string(),
        instructions: FORM_INSTRUCTIONS.to_string(),
        name_preview: name_on_order.clone(),
        options: Vec::new(),
        max_ingredients: effective_cap(ctx.settings.max_ingredients),
        panels: Vec::new(),
        banners: Vec::new(),
        state: FormState::Idle,
        order_id: None,
        verification: Vec::new(),
    };

    let selection = match capture_selection(&options, &input.ingredients, view.max_ingredients) {
        Ok(selection) => selection,
        Err(banner) => {
            machine
                .advance(FormState::SelectionChanged)
                .map_err(invalid_transition)?;
            view.banners.push(banner);
            view.state = machine.state();
            view.options = options;
            return Ok(view);
        }
    };

    if selection.is_empty() {
        if input.submit {
            view.banners
                .push(Banner::warning("Choose at least one ingredient before submitting."));
        }
        view.options = options;
        return Ok(view);
    }

    machine
        .advance(FormState::SelectionChanged)
        .map_err(invalid_transition)?;
    debug!(picks = selection.len(), "order form: selection captured");

    for fruit in selection.names() {
        let Some(search_key) = lookup_search_key(&options, fruit) else {
            continue;
        };
        view.panels.push(nutrition_panel(ctx, fruit, search_key).await);
        machine
            .advance(FormState::NutritionDisplayed)
            .map_err(invalid_transition)?;
    }

    let ingredients = normalize_ingredients(&selection, ctx.settings.ingredient_rule);

    if input.submit {
        if name_on_order.is_empty() {
            view.banners
                .push(Banner::warning("Enter a name for your smoothie before submitting."));
        } else {
            machine
                .advance(FormState::SubmitRequested)
                .map_err(invalid_transition)?;
            match submit_order(ctx, &ingredients, &name_on_order).await {
                Ok(order_id) => {
                    machine
                        .advance(FormState::Inserted)
                        .map_err(invalid_transition)?;
                    view.order_id = Some(order_id);
                    view.banners.push(Banner::success(format!(
                        "Your Smoothie is ordered, {name_on_order}!"
                    )));
                    if ctx.settings.verify_after_insert {
                        match ctx.storage.verify_orders(&name_on_order).await {
                            Ok(rows) => view.verification = rows,
                            Err(e) => {
                                warn!(error = %e, "order form: verification query failed");
                                view.banners.push(Banner::warning(
                                    "Your order was placed but could not be verified.",
                                ));
                            }
                        }
                    }
                }
                Err(e) => {
                    machine
                        .advance(FormState::InsertFailed)
                        .map_err(invalid_transition)?;
                    view.banners.push(Banner::error(format!(
                        "Your order could not be placed: {}",
                        e.message
                    )));
                }
            }
        }
    }

    view.state = machine.state();
    view.options = options;
    Ok(view)
}

fn storage_error(err: anyhow::Error) -> ApiError {
    ApiError::storage(format!("{err:#}"))
}

fn invalid_transition(err: InvalidTransition) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
