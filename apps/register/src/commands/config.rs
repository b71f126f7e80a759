//! # Config Commands
//!
//! Read access to the register configuration.

use serde::Serialize;
use tracing::debug;

use crate::state::ConfigState;

/// What the UI needs to label and format things.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub shop_id: String,
    pub shop_name: String,
    pub currency_code: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub utc_offset_minutes: i32,
    pub seller_id: String,
    pub seller_name: String,
}

/// Gets the current configuration. Paths are not exposed.
///
/// ## When Used
/// - Register startup (shop and seller header)
/// - Receipt printing (shop name)
/// - Currency formatting
pub fn get_config(config: &ConfigState) -> ConfigResponse {
    debug!("get_config command");
    ConfigResponse {
        shop_id: config.shop_id.clone(),
        shop_name: config.shop_name.clone(),
        currency_code: config.currency_code.clone(),
        currency_symbol: config.currency_symbol.clone(),
        currency_decimals: config.currency_decimals,
        utc_offset_minutes: config.utc_offset_minutes,
        seller_id: config.seller_id.clone(),
        seller_name: config.seller_name.clone(),
    }
}
