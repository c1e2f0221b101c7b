use serde::{Deserialize, Serialize};

/// One property-for-sale record, keyed by the portal-assigned identifier.
///
/// Every field except the identifier and source URL is optional: the embedded
/// payload omits whole sub-objects for listings without e.g. a building block
/// or energy certificates, and those absences are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub property_id: String,
    pub url: String,
    pub locality: Option<String>,
    pub postal: Option<String>,
    pub address: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Asking price, currency-agnostic. Integer-coerced at extraction time.
    pub price: Option<i64>,
    pub sale_type: Option<String>,
    pub property_type: Option<String>,
    pub number_of_bedrooms: Option<i64>,
    pub living_area: Option<f64>,
    pub basement: Option<bool>,
    pub open_fire: Option<bool>,
    pub terrace: Option<bool>,
    pub terrace_area: Option<f64>,
    pub terrace_orientation: Option<String>,
    pub garden: Option<bool>,
    pub garden_area: Option<f64>,
    pub garden_orientation: Option<String>,
    pub number_of_facades: Option<i64>,
    pub construction_year: Option<i64>,
    pub state_of_building: Option<String>,
    pub swimming_pool: Option<bool>,
    pub epc: Option<String>,
    pub kwh: Option<f64>,
}
