use serde::{Deserialize, Serialize};

/// One measurement row. Parsed once at load time; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
    /// Measured parameter name, e.g. "PM2.5". Queries filter on this.
    pub parameter: String,
    pub value: f64,
    pub unit: String,
    pub aqi: i64,
    pub site_name: String,
    /// YYYYMMDD directory the row was loaded from.
    pub date: String,
}

/// Comparison operator applied to a row's `value` against the query
/// threshold. Wire form is the operator symbol itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Comparator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = ">")]
    Gt,
}

impl Comparator {
    pub fn matches(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Lt => value < threshold,
            Comparator::Le => value <= threshold,
            Comparator::Eq => value == threshold,
            Comparator::Ge => value >= threshold,
            Comparator::Gt => value > threshold,
        }
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Eq => "=",
            Comparator::Ge => ">=",
            Comparator::Gt => ">",
        };
        f.write_str(symbol)
    }
}
