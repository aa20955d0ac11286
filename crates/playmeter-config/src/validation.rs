//! Configuration validation

use crate::schema::{RawConfig, RawMenuItem, RawPrice, RawPriceKind};
use crate::settings::{DEFAULT_UNIT_COUNT, MAX_UNIT_COUNT};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Price '{price_id}': {message}")]
    PriceError { price_id: String, message: String },

    #[error("Menu item '{item_id}': {message}")]
    MenuError { item_id: String, message: String },

    #[error("Duplicate price ID: {0}")]
    DuplicatePriceId(String),

    #[error("Duplicate menu item ID: {0}")]
    DuplicateMenuId(String),

    #[error("Unit count {0} out of range (1-{})", MAX_UNIT_COUNT)]
    UnitCountOutOfRange(u32),

    #[error("{names} unit names given for {count} units")]
    TooManyUnitNames { names: usize, count: u32 },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let count = config.units.count.unwrap_or(DEFAULT_UNIT_COUNT);
    if count == 0 || count > MAX_UNIT_COUNT {
        errors.push(ValidationError::UnitCountOutOfRange(count));
    }
    if config.units.names.len() > count as usize {
        errors.push(ValidationError::TooManyUnitNames {
            names: config.units.names.len(),
            count,
        });
    }
    if config.units.names.iter().any(|n| n.trim().is_empty()) {
        errors.push(ValidationError::GlobalError(
            "unit names cannot be empty".into(),
        ));
    }

    if config.service.tick_interval_ms == Some(0) {
        errors.push(ValidationError::GlobalError(
            "tick_interval_ms must be positive".into(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for price in &config.prices {
        if !seen_ids.insert(&price.id) {
            errors.push(ValidationError::DuplicatePriceId(price.id.clone()));
        }
        errors.extend(validate_price(price));
    }

    let mut seen_ids = HashSet::new();
    for item in &config.menu {
        if !seen_ids.insert(&item.id) {
            errors.push(ValidationError::DuplicateMenuId(item.id.clone()));
        }
        errors.extend(validate_menu_item(item));
    }

    errors
}

fn validate_price(price: &RawPrice) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut fail = |message: &str| {
        errors.push(ValidationError::PriceError {
            price_id: price.id.clone(),
            message: message.into(),
        })
    };

    if price.id.trim().is_empty() {
        fail("id cannot be empty");
    }
    if price.name.trim().is_empty() {
        fail("name cannot be empty");
    }

    match price.kind {
        RawPriceKind::Hourly { rate } => {
            if rate <= 0 {
                fail("hourly rate must be positive");
            }
        }
        RawPriceKind::Package {
            price: amount,
            duration_minutes,
        } => {
            if amount < 0 {
                fail("package price cannot be negative");
            }
            if duration_minutes == 0 {
                fail("package duration must be positive");
            }
        }
    }

    errors
}

fn validate_menu_item(item: &RawMenuItem) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if item.id.trim().is_empty() {
        errors.push(ValidationError::MenuError {
            item_id: item.id.clone(),
            message: "id cannot be empty".into(),
        });
    }
    if item.name.trim().is_empty() {
        errors.push(ValidationError::MenuError {
            item_id: item.id.clone(),
            message: "name cannot be empty".into(),
        });
    }
    if item.price < 0 {
        errors.push(ValidationError::MenuError {
            item_id: item.id.clone(),
            message: "price cannot be negative".into(),
        });
    }

    errors
}
