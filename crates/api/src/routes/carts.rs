//! Shopping cart and checkout endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart_store::{CartError, CartId, CartItem, CartStore, CustomerId, ProductId};
use checkout::CheckoutCoordinator;
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub carts: Arc<dyn CartStore>,
    pub checkout: Arc<CheckoutCoordinator>,
}

// -- Request types --
//
// Missing numeric fields decode as 0 so they fail the positivity checks
// with a field-specific message instead of a generic body error.

#[derive(Deserialize)]
pub struct CreateCartRequest {
    #[serde(default)]
    pub customer_id: i64,
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    #[serde(default)]
    pub product_id: i64,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub credit_card_number: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartCreatedResponse {
    pub shopping_cart_id: CartId,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub shopping_cart_id: CartId,
    pub customer_id: CustomerId,
    pub items: Vec<CartItem>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
}

fn parse_cart_id(id: &str) -> Result<CartId, ApiError> {
    id.parse::<i64>()
        .ok()
        .and_then(CartId::from_positive)
        .ok_or_else(ApiError::invalid_cart_id)
}

// -- Handlers --

/// POST /shopping-cart — create an empty cart for a customer.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateCartRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CartCreatedResponse>), ApiError> {
    let Json(req) = body?;
    let customer_id =
        CustomerId::from_positive(req.customer_id).ok_or(CartError::InvalidCustomerId)?;

    let cart_id = state.carts.create_cart(customer_id).await?;
    tracing::info!(%cart_id, %customer_id, "cart created");

    Ok((
        StatusCode::CREATED,
        Json(CartCreatedResponse {
            shopping_cart_id: cart_id,
        }),
    ))
}

/// GET /shopping-carts/{id} — current contents of a cart.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let cart = state.carts.get_cart(cart_id).await?;

    Ok(Json(CartResponse {
        shopping_cart_id: cart.id,
        customer_id: cart.customer_id,
        items: cart.items().to_vec(),
    }))
}

/// POST /shopping-carts/{id}/addItem — add a product to a cart.
#[tracing::instrument(skip(state, body))]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let Json(req) = body?;

    let product_id = ProductId::from_positive(req.product_id).ok_or(CartError::InvalidProductId)?;
    let quantity = u32::try_from(req.quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(CartError::InvalidQuantity)?;

    state.carts.add_item(cart_id, product_id, quantity).await?;
    tracing::debug!(%cart_id, %product_id, quantity, "item added");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /shopping-carts/{id}/checkout — pay for a cart and place the order.
#[tracing::instrument(skip(state, body))]
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let Json(req) = body?;

    let receipt = state
        .checkout
        .checkout(cart_id, &req.credit_card_number)
        .await?;

    Ok(Json(CheckoutResponse {
        order_id: receipt.order_id,
    }))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cart_id() {
        assert_eq!(parse_cart_id("12").unwrap(), CartId::new(12));
        for bad in ["0", "-1", "abc", "1.5", ""] {
            assert!(
                matches!(parse_cart_id(bad), Err(ApiError::InvalidInput(_))),
                "id {bad:?}"
            );
        }
    }
}
