//! Derivation of engineered fields from raw record fields.
//!
//! Mirrors what the web form computes before submitting a record. A derived
//! field is only written when every source it needs is present and usable;
//! otherwise whatever the record already holds for it is kept.

use serde_json::{Map, Number, Value};

fn number(record: &Map<String, Value>, key: &str) -> Option<f64> {
    record.get(key).and_then(Value::as_f64)
}

/// Truthiness of a flag field: booleans, or numbers where non-zero is true.
fn flag(record: &Map<String, Value>, key: &str) -> Option<bool> {
    match record.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|x| x != 0.0),
        _ => None,
    }
}

fn yes_no(record: &Map<String, Value>, key: &str) -> Option<bool> {
    record.get(key).and_then(Value::as_str).map(|s| s == "Yes")
}

fn set_number(record: &mut Map<String, Value>, key: &str, value: f64) -> bool {
    match Number::from_f64(value) {
        Some(n) => {
            record.insert(key.to_string(), Value::Number(n));
            true
        }
        None => false,
    }
}

fn set_indicator(record: &mut Map<String, Value>, key: &str, on: bool) {
    record.insert(key.to_string(), Value::from(u8::from(on)));
}

/// Recompute the engineered fields in place and return how many were written.
///
/// `IsHelicopter` and `IsScheduled` come first because `Precip_Helicopter`
/// reads the updated `IsHelicopter`. `TempRange_Season` reads the record's
/// own `TempRange`, not the recomputed one.
pub fn derive_features(record: &mut Map<String, Value>) -> usize {
    let mut written = 0;
    let supplied_temp_range = number(record, "TempRange");

    if let Some(on) = yes_no(record, "Helicopter") {
        set_indicator(record, "IsHelicopter", on);
        written += 1;
    }
    if let Some(on) = yes_no(record, "ScheduledCommercial") {
        set_indicator(record, "IsScheduled", on);
        written += 1;
    }

    let precip = number(record, "precip");
    let wind = number(record, "wind_avg");
    let altitude = number(record, "Altitude");

    let products = [
        ("TempRange", number(record, "temp_max").zip(number(record, "temp_min")).map(|(hi, lo)| hi - lo)),
        ("Precip_Wind", precip.zip(wind).map(|(p, w)| p * w)),
        (
            "Precip_Night",
            precip.zip(flag(record, "IsNight")).map(|(p, night)| if night { p } else { 0.0 }),
        ),
        ("Precip_Helicopter", precip.zip(number(record, "IsHelicopter")).map(|(p, h)| p * h)),
        ("Precip_Altitude", precip.zip(altitude).map(|(p, a)| p * a)),
        ("Wind_Altitude", wind.zip(altitude).map(|(w, a)| w * a)),
        (
            "TempRange_Season",
            supplied_temp_range.zip(number(record, "Season")).map(|(t, s)| t * s),
        ),
    ];

    for (key, value) in products {
        if let Some(value) = value {
            if set_number(record, key, value) {
                written += 1;
            }
        }
    }

    tracing::debug!(written, "derived engineered features");
    written
}
