//! Owned-card counts from inventory payloads in the log

use crate::events::extract_balanced_object;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// Payload markers, newest client format first
const INVENTORY_MARKERS: [&str; 2] = ["InventoryInfo", "GetPlayerCardsV3"];

lazy_static! {
    static ref CARD_QUANTITY: Regex =
        Regex::new(r#""cardId"\s*:\s*(\d+)\s*,\s*"quantity"\s*:\s*(\d+)"#)
            .expect("valid card quantity regex");
}

/// Arena id -> owned quantity.
///
/// Reads the object following the last occurrence of each inventory marker.
/// When neither yields any cards, every `"cardId": N, "quantity": M` pair in
/// the text is used instead. Repeated ids keep their highest quantity.
pub fn extract_owned_from_log(text: &str) -> BTreeMap<u32, u32> {
    let mut owned = BTreeMap::new();

    for marker in INVENTORY_MARKERS {
        let Some(position) = text.rfind(marker) else {
            continue;
        };
        let Some(slice) = extract_balanced_object(text, position) else {
            continue;
        };
        match serde_json::from_str::<Value>(slice) {
            Ok(value) => collect_card_counts(&value, &mut owned),
            Err(e) => log::debug!("Unparseable {} payload: {}", marker, e),
        }
    }

    if owned.is_empty() {
        for caps in CARD_QUANTITY.captures_iter(text) {
            if let (Ok(id), Ok(quantity)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
                merge_max(&mut owned, id, quantity);
            }
        }
    }

    owned
}

fn collect_card_counts(node: &Value, owned: &mut BTreeMap<u32, u32>) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect_card_counts(item, owned);
            }
        }
        Value::Object(map) => {
            let id = map.get("cardId").and_then(as_count);
            let quantity = map.get("quantity").and_then(as_count);
            if let (Some(id), Some(quantity)) = (id, quantity) {
                merge_max(owned, id, quantity);
            }
            for value in map.values() {
                collect_card_counts(value, owned);
            }
        }
        _ => {}
    }
}

/// Numbers or numeric strings
fn as_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn merge_max(owned: &mut BTreeMap<u32, u32>, id: u32, quantity: u32) {
    let entry = owned.entry(id).or_insert(0);
    *entry = (*entry).max(quantity);
}
