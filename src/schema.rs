//! The fixed input schema the risk model was trained against.
//!
//! Column order is load-bearing: values are looked up by name in the input
//! record and placed positionally, so the model sees them in exactly this
//! order. [`ColumnKind::Float`] marks the coercion set.

/// How a schema column is treated while building the input row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Coerced to float64 before prediction.
    Float,
    /// Kept with whatever type the JSON decoder produced.
    Passthrough,
}

/// A named column of the feature schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn float(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Float,
    }
}

const fn pass(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Passthrough,
    }
}

/// Number of columns in the feature schema.
pub const N_FEATURES: usize = 37;

/// The ordered feature schema.
pub static FEATURE_SCHEMA: [Column; N_FEATURES] = [
    pass("StateOfOccurrence"),
    pass("Location"),
    pass("StateOfRegistry"),
    pass("Over2250"),
    pass("Over5700"),
    pass("ScheduledCommercial"),
    pass("Helicopter"),
    pass("Airplane"),
    float("Engines"),
    pass("EngineType"),
    pass("Latitude"),
    pass("Longitude"),
    pass("temp_max"),
    pass("temp_min"),
    pass("precip"),
    float("Altitude"),
    pass("Month"),
    pass("DayOfWeek"),
    pass("IsWeekend"),
    pass("Season"),
    float("PrecipFlag"),
    float("ColdTemp"),
    float("HotTemp"),
    pass("wind_avg"),
    float("Windy"),
    float("IsHelicopter"),
    float("IsScheduled"),
    pass("EngineTypeEnc"),
    pass("Hour"),
    pass("IsNight"),
    float("TempRange"),
    pass("Precip_Wind"),
    pass("Precip_Night"),
    pass("Precip_Helicopter"),
    pass("Precip_Altitude"),
    pass("Wind_Altitude"),
    pass("TempRange_Season"),
];

/// Iterate over column names in schema order.
pub fn column_names() -> impl Iterator<Item = &'static str> {
    FEATURE_SCHEMA.iter().map(|c| c.name)
}

/// Iterate over the names of the columns coerced to float.
pub fn coercion_set() -> impl Iterator<Item = &'static str> {
    FEATURE_SCHEMA
        .iter()
        .filter(|c| c.kind == ColumnKind::Float)
        .map(|c| c.name)
}

/// Position of a column in the schema, if it is part of it.
pub fn position(name: &str) -> Option<usize> {
    FEATURE_SCHEMA.iter().position(|c| c.name == name)
}
