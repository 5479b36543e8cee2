use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Degraded-quality notice returned next to a successful payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Raw records that failed normalization
    OffersDropped { count: usize, reasons: Vec<String> },
    /// Batch-level: some or all weather lookups failed
    EnrichmentUnavailable { failed_lookups: usize, total_lookups: usize },
    /// The recommendation text came from the template instead of the model
    GenerationFailure { stage: String, reason: String },
    /// One itinerary day was filled with the template plan
    DayFallback { day_index: usize, date: NaiveDate, reason: String },
    /// Every itinerary day fell back
    AllDaysFallback { days: usize },
    DuplicateActivityRemoved { date: NaiveDate, description: String, duplicate_of: NaiveDate },
}

impl Warning {
    pub fn message(&self) -> String {
        match self {
            Warning::OffersDropped { count, .. } => format!("{} offers could not be normalized and were dropped", count),
            Warning::EnrichmentUnavailable { failed_lookups, total_lookups } => {
                format!("Weather context unavailable for {}/{} lookups", failed_lookups, total_lookups)
            }
            Warning::GenerationFailure { stage, reason } => format!("Generated {} unavailable ({}); using summary", stage, reason),
            Warning::DayFallback { day_index, date, reason } => {
                format!("Day {} ({}) uses a basic plan: {}", day_index + 1, date, reason)
            }
            Warning::AllDaysFallback { days } => format!("All {} days use basic plans", days),
            Warning::DuplicateActivityRemoved { date, description, duplicate_of } => {
                format!("Removed '{}' on {} (already planned on {})", description, date, duplicate_of)
            }
        }
    }
}
