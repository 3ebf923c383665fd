//! Order pricing
//!
//! line total = unit price x qty + sum(option price x option qty)
//! order total = sum(line totals)
//!
//! All arithmetic is checked; an overflow is reported as `ValueOutOfRange`
//! rather than wrapping into a bogus (possibly negative) total.

use shared::error::{AppError, ErrorCode};
use shared::models::{MenuItem, MenuOption, OrderItem, OrderItemOption, OrderLineRequest};
use std::collections::HashMap;

fn overflow() -> AppError {
    AppError::with_message(ErrorCode::ValueOutOfRange, "Order total is too large")
}

pub fn validate_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(
            AppError::with_message(ErrorCode::ValueOutOfRange, "Quantity must be at least 1")
                .with_detail("quantity", quantity),
        );
    }
    Ok(())
}

/// unit price x quantity
pub fn extend(unit_price: i64, quantity: i32) -> Result<i64, AppError> {
    validate_quantity(quantity)?;
    unit_price
        .checked_mul(i64::from(quantity))
        .ok_or_else(overflow)
}

/// Checked sum of already-computed totals
pub fn sum<I>(totals: I) -> Result<i64, AppError>
where
    I: IntoIterator<Item = i64>,
{
    totals
        .into_iter()
        .try_fold(0_i64, |acc, t| acc.checked_add(t))
        .ok_or_else(overflow)
}

/// Line total from a unit price and `(option price, option qty)` pairs
pub fn line_total(
    unit_price: i64,
    quantity: i32,
    options: impl IntoIterator<Item = (i64, i32)>,
) -> Result<i64, AppError> {
    let base = extend(unit_price, quantity)?;
    let mut option_totals = Vec::new();
    for (price, qty) in options {
        option_totals.push(extend(price, qty)?);
    }
    base.checked_add(sum(option_totals)?).ok_or_else(overflow)
}

/// Price requested lines against resolved catalog entries
///
/// Every menu and option id must already be present in the maps; an option
/// that belongs to a different menu item is rejected as `OptionNotFound`.
pub fn price_lines(
    lines: &[OrderLineRequest],
    menus: &HashMap<i64, MenuItem>,
    options: &HashMap<i64, MenuOption>,
) -> Result<(Vec<OrderItem>, i64), AppError> {
    let mut items = Vec::with_capacity(lines.len());

    for line in lines {
        let menu = menus.get(&line.menu_id).ok_or_else(|| {
            AppError::new(ErrorCode::MenuNotFound).with_detail("menu_id", line.menu_id)
        })?;

        let mut item_options = Vec::with_capacity(line.options.len());
        for selection in &line.options {
            let option = options
                .get(&selection.option_id)
                .filter(|o| o.menu_id == menu.menu_id)
                .ok_or_else(|| {
                    AppError::new(ErrorCode::OptionNotFound)
                        .with_detail("option_id", selection.option_id)
                        .with_detail("menu_id", menu.menu_id)
                })?;
            item_options.push(OrderItemOption {
                option_id: option.option_id,
                option_name: option.name.clone(),
                unit_price: option.price,
                quantity: selection.quantity,
                total_price: extend(option.price, selection.quantity)?,
            });
        }

        let total_price = line_total(
            menu.price,
            line.quantity,
            item_options.iter().map(|o| (o.unit_price, o.quantity)),
        )?;

        items.push(OrderItem {
            menu_id: menu.menu_id,
            menu_name: menu.name.clone(),
            unit_price: menu.price,
            quantity: line.quantity,
            total_price,
            options: item_options,
        });
    }

    let total = sum(items.iter().map(|i| i.total_price))?;
    Ok((items, total))
}
