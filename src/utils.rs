// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Address helpers. MMS addresses carry a "/TYPE=" suffix on the wire
//! (phone numbers are "/TYPE=PLMN"); the handler side never sees it.

pub const ADDRESS_TYPE_SUFFIX: &str = "/TYPE=";
pub const ADDRESS_TYPE_SUFFIX_PHONE: &str = "/TYPE=PLMN";

/// Strips leading/trailing spaces and the "/TYPE=" suffix.
pub fn strip_address_type(address: &str) -> &str {
    let address = address.trim();
    match address.rfind(ADDRESS_TYPE_SUFFIX) {
        Some(at) => &address[..at],
        None => address,
    }
}

/// Splits a comma-separated address list, stripping the type suffix
/// from each element. An empty input yields an empty list.
pub fn split_address_list(list: Option<&str>) -> Vec<String> {
    match list {
        Some(s) if !s.is_empty() => s
            .split(',')
            .map(|a| strip_address_type(a).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Trims the address and appends the phone-number type suffix when no
/// explicit type is present. Returns `None` for empty input.
pub fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains(ADDRESS_TYPE_SUFFIX) {
        Some(trimmed.to_string())
    } else {
        Some(format!("{trimmed}{ADDRESS_TYPE_SUFFIX_PHONE}"))
    }
}

/// Normalizes every element of a comma-separated recipient list.
pub fn normalize_address_list(list: &str) -> Option<String> {
    let parts: Vec<String> =
        list.split(',').filter_map(normalize_address).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(","))
    }
}
