use order_form::OrderFormContext;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) form: OrderFormContext,
}
