//! Checkout flow
//!
//! A staged flow over a frozen copy of the cart: address, payment,
//! review, then a strictly sequential place and pay. Each flow instance
//! is independent; the live cart is only touched again when the flow
//! confirms.

use std::sync::Arc;

use shopkit_common::parking_lot::RwLock;
use shopkit_common::rust_decimal::Decimal;
use shopkit_common::{
    ensure_shopkit, CardDetails, CartSnapshot, Order, OrderItem, OrderRequest, PaymentMethod,
    PaymentRequest, PaymentStatus, ShippingAddress, User,
};
use tracing::instrument;
use uuid::Uuid;

use crate::cart::CartStore;
use crate::client::ApiConnector;
use crate::Error;

/// Flat sales tax rate applied to the subtotal (8 %)
fn tax_rate() -> Decimal {
    Decimal::new(8, 2)
}

/// Order total for a subtotal: the subtotal plus sales tax.
///
/// Both the review summary and the submitted payment amount come from
/// this one function, so the buyer is always charged the figure shown.
pub fn order_total(subtotal: Decimal) -> Decimal {
    subtotal + subtotal * tax_rate()
}

/// Steps of the checkout flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    /// Capturing the shipping address
    Address,
    /// Capturing the payment method
    Payment,
    /// Reviewing totals before placing
    Review,
    /// Remote calls running
    Placing,
    /// Order placed and paid
    Confirmed,
}

impl CheckoutStep {
    /// Step name as used in errors and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Address => "address",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Review => "review",
            CheckoutStep::Placing => "placing",
            CheckoutStep::Confirmed => "confirmed",
        }
    }
}

/// Payment method plus the fields captured for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSelection {
    /// Card payment with full card fields
    CreditCard {
        /// Card number
        number: String,
        /// Name on the card
        holder_name: String,
        /// Expiry in MM/YY form
        expiry: String,
        /// Verification code
        cvv: String,
    },
    /// PayPal. The email is checked locally and not submitted.
    PayPal {
        /// Account email
        email: String,
    },
    /// Bank transfer arranged out of band; nothing to capture
    BankTransfer,
}

impl PaymentSelection {
    fn validate(&self) -> Result<(), Error> {
        match self {
            PaymentSelection::CreditCard {
                number,
                holder_name,
                expiry,
                cvv,
            } => {
                ensure_shopkit!(!number.trim().is_empty(), Error::MissingField("cardNumber"));
                ensure_shopkit!(
                    !holder_name.trim().is_empty(),
                    Error::MissingField("cardHolderName")
                );
                ensure_shopkit!(!expiry.trim().is_empty(), Error::MissingField("expiryDate"));
                ensure_shopkit!(!cvv.trim().is_empty(), Error::MissingField("cvv"));
            }
            PaymentSelection::PayPal { email } => {
                ensure_shopkit!(!email.trim().is_empty(), Error::MissingField("paypalEmail"));
            }
            PaymentSelection::BankTransfer => {}
        }
        Ok(())
    }

    fn method(&self) -> PaymentMethod {
        match self {
            PaymentSelection::CreditCard { .. } => PaymentMethod::CreditCard,
            PaymentSelection::PayPal { .. } => PaymentMethod::Paypal,
            PaymentSelection::BankTransfer => PaymentMethod::BankTransfer,
        }
    }

    /// Card fields in wire form. The MM/YY expiry is split and the year
    /// widened to four digits.
    fn card_details(&self) -> Option<CardDetails> {
        match self {
            PaymentSelection::CreditCard {
                number,
                holder_name,
                expiry,
                cvv,
            } => {
                let (month, short_year) = expiry.split_once('/').unwrap_or((expiry.as_str(), ""));
                Some(CardDetails {
                    card_number: number.clone(),
                    card_holder_name: holder_name.clone(),
                    expiry_month: month.trim().to_string(),
                    expiry_year: format!("20{}", short_year.trim()),
                    cvv: cvv.clone(),
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
struct CheckoutState {
    step: CheckoutStep,
    snapshot: CartSnapshot,
    address: ShippingAddress,
    payment: Option<PaymentSelection>,
    /// Order created by an earlier attempt, kept so a payment retry does
    /// not create a duplicate
    placed_order: Option<Order>,
    last_error: Option<String>,
}

#[derive(Debug)]
struct CheckoutInner {
    operation_id: Uuid,
    cart: CartStore,
    client: Arc<dyn ApiConnector + Send + Sync>,
    state: RwLock<CheckoutState>,
}

/// One checkout attempt over a frozen copy of the cart
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct CheckoutFlow {
    inner: Arc<CheckoutInner>,
}

impl CheckoutFlow {
    /// Start a flow for a signed in buyer over a non empty cart.
    ///
    /// The cart is copied here; later cart edits do not affect this
    /// flow. The address draft starts with the buyer's name filled in.
    pub(crate) async fn begin(
        cart: CartStore,
        client: Arc<dyn ApiConnector + Send + Sync>,
        user: Option<User>,
    ) -> Result<Self, Error> {
        let user = user.ok_or(Error::NotAuthenticated)?;
        let snapshot = cart.snapshot().await;
        ensure_shopkit!(!snapshot.is_empty(), Error::EmptyCart);

        let address = ShippingAddress {
            full_name: user.full_name(),
            ..ShippingAddress::default()
        };
        Ok(Self {
            inner: Arc::new(CheckoutInner {
                operation_id: Uuid::new_v4(),
                cart,
                client,
                state: RwLock::new(CheckoutState {
                    step: CheckoutStep::Address,
                    snapshot,
                    address,
                    payment: None,
                    placed_order: None,
                    last_error: None,
                }),
            }),
        })
    }

    /// Step currently presented to the buyer
    pub fn step(&self) -> CheckoutStep {
        self.inner.state.read().step
    }

    /// Cart contents frozen when the flow began
    pub fn summary(&self) -> CartSnapshot {
        self.inner.state.read().snapshot.clone()
    }

    /// Subtotal of the frozen cart
    pub fn subtotal(&self) -> Decimal {
        self.inner.state.read().snapshot.total_price
    }

    /// Total including sales tax; the exact figure submitted for payment
    pub fn total(&self) -> Decimal {
        order_total(self.subtotal())
    }

    /// Current shipping address draft
    pub fn shipping_address(&self) -> ShippingAddress {
        self.inner.state.read().address.clone()
    }

    /// Current payment selection, if one was made
    pub fn payment_selection(&self) -> Option<PaymentSelection> {
        self.inner.state.read().payment.clone()
    }

    /// Most recent placement failure, kept while the buyer retries
    pub fn last_error(&self) -> Option<String> {
        self.inner.state.read().last_error.clone()
    }

    /// Order created by a confirm attempt, retained across payment
    /// failures
    pub fn placed_order(&self) -> Option<Order> {
        self.inner.state.read().placed_order.clone()
    }

    /// Number of the confirmed order
    pub fn confirmed_order_number(&self) -> Option<String> {
        let state = self.inner.state.read();
        if state.step == CheckoutStep::Confirmed {
            state.placed_order.as_ref().map(|o| o.order_number.clone())
        } else {
            None
        }
    }

    /// Replace the shipping address draft. Only valid on the address
    /// step.
    pub fn set_address(&self, address: ShippingAddress) -> Result<(), Error> {
        let mut state = self.inner.state.write();
        ensure_shopkit!(
            state.step == CheckoutStep::Address,
            Error::InvalidStep(state.step.as_str())
        );
        state.address = address;
        Ok(())
    }

    /// Replace the payment selection. Only valid on the payment step.
    pub fn set_payment(&self, payment: PaymentSelection) -> Result<(), Error> {
        let mut state = self.inner.state.write();
        ensure_shopkit!(
            state.step == CheckoutStep::Payment,
            Error::InvalidStep(state.step.as_str())
        );
        state.payment = Some(payment);
        Ok(())
    }

    /// Advance one step, validating the current one first.
    ///
    /// Advancing past review is [`CheckoutFlow::confirm`], not `next`.
    pub fn next(&self) -> Result<CheckoutStep, Error> {
        let mut state = self.inner.state.write();
        match state.step {
            CheckoutStep::Address => {
                state.address.validate()?;
                state.step = CheckoutStep::Payment;
            }
            CheckoutStep::Payment => {
                let payment = state
                    .payment
                    .as_ref()
                    .ok_or(Error::MissingField("paymentMethod"))?;
                payment.validate()?;
                state.step = CheckoutStep::Review;
            }
            step => return Err(Error::InvalidStep(step.as_str())),
        }
        Ok(state.step)
    }

    /// Go back one step. Entered fields are kept.
    pub fn back(&self) -> Result<CheckoutStep, Error> {
        let mut state = self.inner.state.write();
        match state.step {
            CheckoutStep::Payment => state.step = CheckoutStep::Address,
            CheckoutStep::Review => state.step = CheckoutStep::Payment,
            step => return Err(Error::InvalidStep(step.as_str())),
        }
        Ok(state.step)
    }

    /// Place the order and submit its payment.
    ///
    /// Runs the two remote calls strictly in sequence: the order is
    /// created first (or reused from an earlier failed attempt), then
    /// the payment is submitted for it. The flow sits in
    /// [`CheckoutStep::Placing`] while this runs. On a fully settled
    /// payment the cart is cleared and the flow confirms; on any failure
    /// the flow returns to review with the error recorded and the cart
    /// untouched.
    ///
    /// The returned future should be driven to completion; dropping it
    /// mid sequence leaves the flow in the placing step.
    #[instrument(skip(self), fields(operation = %self.inner.operation_id))]
    pub async fn confirm(&self) -> Result<Order, Error> {
        // Validate and enter Placing atomically so two confirms cannot
        // both proceed.
        let (snapshot, address, payment, placed) = {
            let mut state = self.inner.state.write();
            ensure_shopkit!(
                state.step == CheckoutStep::Review,
                Error::InvalidStep(state.step.as_str())
            );
            let payment = state
                .payment
                .clone()
                .ok_or(Error::MissingField("paymentMethod"))?;
            state.step = CheckoutStep::Placing;
            state.last_error = None;
            (
                state.snapshot.clone(),
                state.address.clone(),
                payment,
                state.placed_order.clone(),
            )
        };

        match self.place(snapshot, address, payment, placed).await {
            Ok(order) => {
                {
                    let mut state = self.inner.state.write();
                    state.placed_order = Some(order.clone());
                    state.step = CheckoutStep::Confirmed;
                }
                // Only a fully settled order releases the cart
                self.inner.cart.clear().await;
                tracing::info!("Order {} confirmed", order.order_number);
                Ok(order)
            }
            Err((created, err)) => {
                tracing::warn!("Placement failed: {err}");
                let mut state = self.inner.state.write();
                if let Some(order) = created {
                    state.placed_order = Some(order);
                }
                state.step = CheckoutStep::Review;
                state.last_error = Some(err.to_string());
                drop(state);
                Err(err)
            }
        }
    }

    /// The remote half of a confirm. Returns the created order alongside
    /// the error so a payment failure retains it for retry.
    async fn place(
        &self,
        snapshot: CartSnapshot,
        address: ShippingAddress,
        payment: PaymentSelection,
        placed: Option<Order>,
    ) -> Result<Order, (Option<Order>, Error)> {
        let order = match placed {
            Some(order) => {
                tracing::debug!("Reusing order {} from an earlier attempt", order.order_number);
                order
            }
            None => {
                let request = OrderRequest {
                    items: snapshot.items.iter().map(OrderItem::from).collect(),
                    shipping_address: address,
                };
                self.inner
                    .client
                    .create_order(request)
                    .await
                    .map_err(|err| (None, err))?
            }
        };

        let request = PaymentRequest {
            order_id: order.id,
            amount: order_total(snapshot.total_price),
            payment_method: payment.method(),
            card_details: payment.card_details(),
        };
        let settled = self
            .inner
            .client
            .process_payment(request)
            .await
            .map_err(|err| (Some(order.clone()), err))?;

        if settled.status != PaymentStatus::Completed {
            return Err((Some(order), Error::PaymentNotCompleted(settled.status)));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_utils::{
        create_test_db, test_order, test_payment, test_product, test_user, MockApiConnector,
        RecordedCall,
    };

    async fn flow_at_review(client: Arc<MockApiConnector>) -> (CartStore, CheckoutFlow) {
        let (cart, flow) = fresh_flow(client).await;
        flow.set_address(filled_address()).unwrap();
        flow.next().unwrap();
        flow.set_payment(card_selection()).unwrap();
        flow.next().unwrap();
        assert_eq!(flow.step(), CheckoutStep::Review);
        (cart, flow)
    }

    async fn fresh_flow(client: Arc<MockApiConnector>) -> (CartStore, CheckoutFlow) {
        let cart = CartStore::load(create_test_db()).await;
        // Two units at 50.00 for a 100.00 subtotal
        cart.add_item(&test_product(10, Decimal::new(5000, 2)), 2).await;
        let flow = CheckoutFlow::begin(cart.clone(), client, Some(test_user()))
            .await
            .unwrap();
        (cart, flow)
    }

    fn filled_address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Fox".to_string(),
            address_line1: "12 Market Street".to_string(),
            address_line2: None,
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
            country: "USA".to_string(),
            phone_number: "555 0100".to_string(),
        }
    }

    fn card_selection() -> PaymentSelection {
        PaymentSelection::CreditCard {
            number: "4111111111111111".to_string(),
            holder_name: "Ada Fox".to_string(),
            expiry: "12/26".to_string(),
            cvv: "123".to_string(),
        }
    }

    #[test]
    fn totals_add_eight_percent_sales_tax() {
        assert_eq!(order_total(Decimal::new(10000, 2)), Decimal::new(10800, 2));
        assert_eq!(order_total(Decimal::new(14850, 2)), Decimal::new(16038, 2));
        assert_eq!(order_total(Decimal::ZERO), Decimal::ZERO);
    }

    #[tokio::test]
    async fn begin_requires_a_signed_in_buyer_and_a_non_empty_cart() {
        let client = Arc::new(MockApiConnector::new());
        let cart = CartStore::load(create_test_db()).await;
        let result = CheckoutFlow::begin(cart.clone(), client.clone(), Some(test_user())).await;
        assert!(matches!(result, Err(Error::EmptyCart)));

        cart.add_item(&test_product(10, Decimal::new(5000, 2)), 1).await;
        let result = CheckoutFlow::begin(cart, client, None).await;
        assert!(matches!(result, Err(Error::NotAuthenticated)));
    }

    #[tokio::test]
    async fn address_draft_starts_with_the_buyers_name() {
        let client = Arc::new(MockApiConnector::new());
        let (_cart, flow) = fresh_flow(client).await;
        assert_eq!(flow.shipping_address().full_name, "Ada Fox");
        assert_eq!(flow.step(), CheckoutStep::Address);
    }

    #[tokio::test]
    async fn each_step_validates_before_advancing() {
        let client = Arc::new(MockApiConnector::new());
        let (_cart, flow) = fresh_flow(client).await;

        // Only the name is prefilled; the rest of the address is missing
        assert!(matches!(flow.next(), Err(Error::MissingField("addressLine1"))));
        flow.set_address(filled_address()).unwrap();
        assert_eq!(flow.next().unwrap(), CheckoutStep::Payment);

        assert!(matches!(flow.next(), Err(Error::MissingField("paymentMethod"))));
        flow.set_payment(PaymentSelection::CreditCard {
            number: "4111111111111111".to_string(),
            holder_name: "Ada Fox".to_string(),
            expiry: "12/26".to_string(),
            cvv: String::new(),
        })
        .unwrap();
        assert!(matches!(flow.next(), Err(Error::MissingField("cvv"))));

        flow.set_payment(card_selection()).unwrap();
        assert_eq!(flow.next().unwrap(), CheckoutStep::Review);
        // Advancing past review is confirm, not next
        assert!(matches!(flow.next(), Err(Error::InvalidStep("review"))));
    }

    #[tokio::test]
    async fn back_keeps_entered_fields() {
        let client = Arc::new(MockApiConnector::new());
        let (_cart, flow) = flow_at_review(client).await;

        assert_eq!(flow.back().unwrap(), CheckoutStep::Payment);
        assert_eq!(flow.payment_selection(), Some(card_selection()));
        assert_eq!(flow.back().unwrap(), CheckoutStep::Address);
        assert_eq!(flow.shipping_address(), filled_address());
        assert!(matches!(flow.back(), Err(Error::InvalidStep("address"))));

        // Forward again without retyping anything
        assert_eq!(flow.next().unwrap(), CheckoutStep::Payment);
        assert_eq!(flow.next().unwrap(), CheckoutStep::Review);
    }

    #[tokio::test]
    async fn confirm_places_the_order_then_pays_it() {
        let client = Arc::new(MockApiConnector::new());
        client.push_create_order(Ok(test_order(77, Decimal::new(10800, 2))));
        client.push_process_payment(Ok(test_payment(77, PaymentStatus::Completed)));

        let (cart, flow) = flow_at_review(client.clone()).await;
        let order = flow.confirm().await.unwrap();
        assert_eq!(order.id, 77);
        assert_eq!(flow.step(), CheckoutStep::Confirmed);
        assert_eq!(flow.confirmed_order_number().as_deref(), Some("ORD-2025-000077"));
        assert!(cart.is_empty().await);

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        let RecordedCall::CreateOrder(order_request) = &calls[0] else {
            panic!("expected the order to be created first, got {calls:?}");
        };
        assert_eq!(order_request.items.len(), 1);
        assert_eq!(order_request.items[0].quantity, 2);
        assert_eq!(order_request.shipping_address, filled_address());
        let RecordedCall::ProcessPayment(payment_request) = &calls[1] else {
            panic!("expected the payment to follow the order, got {calls:?}");
        };
        assert_eq!(payment_request.order_id, 77);
        assert_eq!(payment_request.amount, Decimal::new(10800, 2));
        assert_eq!(payment_request.payment_method, PaymentMethod::CreditCard);
        let card = payment_request.card_details.as_ref().unwrap();
        assert_eq!(card.expiry_month, "12");
        assert_eq!(card.expiry_year, "2026");
    }

    #[tokio::test]
    async fn failed_payment_returns_to_review_and_retains_the_order() {
        let client = Arc::new(MockApiConnector::new());
        client.push_create_order(Ok(test_order(77, Decimal::new(10800, 2))));
        client.push_process_payment(Ok(test_payment(77, PaymentStatus::Failed)));

        let (cart, flow) = flow_at_review(client.clone()).await;
        let result = flow.confirm().await;
        assert!(matches!(
            result,
            Err(Error::PaymentNotCompleted(PaymentStatus::Failed))
        ));
        assert_eq!(flow.step(), CheckoutStep::Review);
        assert!(flow.last_error().is_some());
        assert_eq!(flow.placed_order().map(|o| o.id), Some(77));
        // The cart only empties on success
        assert!(!cart.is_empty().await);

        // Retry pays the retained order instead of creating a second one
        client.push_process_payment(Ok(test_payment(77, PaymentStatus::Completed)));
        flow.confirm().await.unwrap();
        assert_eq!(flow.step(), CheckoutStep::Confirmed);
        assert!(flow.last_error().is_none());
        assert!(cart.is_empty().await);

        let calls = client.calls();
        assert_eq!(
            calls
                .iter()
                .filter(|c| matches!(c, RecordedCall::CreateOrder(_)))
                .count(),
            1
        );
        let payment_order_ids: Vec<i64> = calls
            .iter()
            .filter_map(|c| match c {
                RecordedCall::ProcessPayment(request) => Some(request.order_id),
                _ => None,
            })
            .collect();
        assert_eq!(payment_order_ids, vec![77, 77]);
    }

    #[tokio::test]
    async fn failed_order_creation_retains_nothing() {
        let client = Arc::new(MockApiConnector::new());
        client.push_create_order(Err(Error::Timeout));

        let (cart, flow) = flow_at_review(client.clone()).await;
        assert!(flow.confirm().await.is_err());
        assert_eq!(flow.step(), CheckoutStep::Review);
        assert!(flow.placed_order().is_none());
        assert!(!cart.is_empty().await);
        // No payment is attempted when the order never existed
        assert_eq!(client.call_count(|c| matches!(c, RecordedCall::ProcessPayment(_))), 0);

        // A later retry starts the sequence over
        client.push_create_order(Ok(test_order(78, Decimal::new(10800, 2))));
        client.push_process_payment(Ok(test_payment(78, PaymentStatus::Completed)));
        let order = flow.confirm().await.unwrap();
        assert_eq!(order.id, 78);
    }

    #[tokio::test]
    async fn confirm_is_only_valid_on_review() {
        let client = Arc::new(MockApiConnector::new());
        let (_cart, flow) = fresh_flow(client).await;
        assert!(matches!(flow.confirm().await, Err(Error::InvalidStep("address"))));
    }

    #[tokio::test(start_paused = true)]
    async fn the_flow_is_observable_while_placing() {
        let client = Arc::new(MockApiConnector::new());
        client.set_create_order_delay(Duration::from_secs(5));
        client.push_create_order(Ok(test_order(77, Decimal::new(10800, 2))));
        client.push_process_payment(Ok(test_payment(77, PaymentStatus::Completed)));

        let (_cart, flow) = flow_at_review(client).await;
        let background = {
            let flow = flow.clone();
            tokio::spawn(async move { flow.confirm().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(flow.step(), CheckoutStep::Placing);
        // A second confirm while placing is rejected rather than doubled
        assert!(matches!(flow.confirm().await, Err(Error::InvalidStep("placing"))));

        background.await.unwrap().unwrap();
        assert_eq!(flow.step(), CheckoutStep::Confirmed);
    }

    #[tokio::test]
    async fn the_summary_is_frozen_when_the_flow_begins() {
        let client = Arc::new(MockApiConnector::new());
        client.push_create_order(Ok(test_order(77, Decimal::new(10800, 2))));
        client.push_process_payment(Ok(test_payment(77, PaymentStatus::Completed)));

        let (cart, flow) = flow_at_review(client.clone()).await;
        assert_eq!(flow.total(), Decimal::new(10800, 2));

        // Cart edits after entry do not reach the flow
        cart.add_item(&test_product(11, Decimal::new(99900, 2)), 1).await;
        assert_eq!(flow.summary().items.len(), 1);
        assert_eq!(flow.total(), Decimal::new(10800, 2));

        flow.confirm().await.unwrap();
        let calls = client.calls();
        let RecordedCall::ProcessPayment(request) = &calls[1] else {
            panic!("expected a payment call");
        };
        assert_eq!(request.amount, Decimal::new(10800, 2));
    }

    #[tokio::test]
    async fn paypal_submits_no_card_details() {
        let client = Arc::new(MockApiConnector::new());
        client.push_create_order(Ok(test_order(77, Decimal::new(10800, 2))));
        client.push_process_payment(Ok(test_payment(77, PaymentStatus::Completed)));

        let (_cart, flow) = fresh_flow(client.clone()).await;
        flow.set_address(filled_address()).unwrap();
        flow.next().unwrap();
        assert!(matches!(
            flow.set_payment(PaymentSelection::PayPal { email: String::new() })
                .and_then(|()| flow.next()),
            Err(Error::MissingField("paypalEmail"))
        ));
        flow.set_payment(PaymentSelection::PayPal {
            email: "ada@example.com".to_string(),
        })
        .unwrap();
        flow.next().unwrap();
        flow.confirm().await.unwrap();

        let calls = client.calls();
        let RecordedCall::ProcessPayment(request) = &calls[1] else {
            panic!("expected a payment call");
        };
        assert_eq!(request.payment_method, PaymentMethod::Paypal);
        assert!(request.card_details.is_none());
    }
}
