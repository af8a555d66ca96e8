use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum PricingType {
    PerClass,
    PerSessions,
    PerHour,
    PerDay,
    Free,
}

impl PricingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingType::PerClass => "per_class",
            PricingType::PerSessions => "per_sessions",
            PricingType::PerHour => "per_hour",
            PricingType::PerDay => "per_day",
            PricingType::Free => "free",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PricingType::PerClass => "per class",
            PricingType::PerSessions => "per term",
            PricingType::PerHour => "per hour",
            PricingType::PerDay => "per day",
            PricingType::Free => "free",
        }
    }
}

impl std::fmt::Display for PricingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PricingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_class" => Ok(PricingType::PerClass),
            "per_sessions" => Ok(PricingType::PerSessions),
            "per_hour" => Ok(PricingType::PerHour),
            "per_day" => Ok(PricingType::PerDay),
            "free" => Ok(PricingType::Free),
            other => Err(format!("unknown pricing type: {}", other)),
        }
    }
}

/// Price of an activity at a specific location.
///
/// `amount` is kept as a decimal string on the wire; use [`Pricing::amount_value`]
/// for arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Pricing {
    pub id: String,
    pub activity_id: String,
    pub location_id: String,
    pub pricing_type: PricingType,
    pub amount: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub sessions_count: Option<u32>,
    #[serde(default)]
    pub free_trial_class_offered: bool,
}

fn default_currency() -> String {
    "HKD".to_string()
}

impl Pricing {
    pub fn amount_value(&self) -> Option<f64> {
        self.amount.trim().parse().ok()
    }

    pub fn price_display(&self) -> String {
        match self.pricing_type {
            PricingType::Free => "Free".to_string(),
            PricingType::PerSessions => match self.sessions_count {
                Some(n) => format!("{} {} / {} sessions", self.currency, self.amount, n),
                None => format!("{} {} {}", self.currency, self.amount, self.pricing_type.display_name()),
            },
            _ => format!("{} {} {}", self.currency, self.amount, self.pricing_type.display_name()),
        }
    }
}
