use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use voyage_core::{CallPolicy, CoreError, CoreResult, ItineraryRequest, TextGenerator, Warning};
use voyage_store::app_config::{CheckoutDay, ItineraryConfig};

use crate::prompt::{day_prompt, DaySlot};

/// Meal suggestions kept per day
pub const MAX_MEALS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
    Anytime,
}

impl TimeOfDay {
    fn from_hint(hint: &str) -> Self {
        let hint = hint.to_lowercase();
        if hint.contains("morning") || hint.contains("breakfast") {
            TimeOfDay::Morning
        } else if hint.contains("afternoon") || hint.contains("lunch") || hint.contains("midday") {
            TimeOfDay::Afternoon
        } else if hint.contains("evening") || hint.contains("dinner") {
            TimeOfDay::Evening
        } else if hint.contains("night") {
            TimeOfDay::Night
        } else {
            TimeOfDay::Anytime
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Sightseeing,
    Culture,
    Food,
    Outdoors,
    Shopping,
    Nightlife,
    Relaxation,
    Other,
}

impl ActivityCategory {
    /// Rotation used for template days when the traveler gave no preferences
    const DEFAULT_ROTATION: [ActivityCategory; 4] = [
        ActivityCategory::Sightseeing,
        ActivityCategory::Culture,
        ActivityCategory::Food,
        ActivityCategory::Outdoors,
    ];

    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        let matches = |words: &[&str]| words.iter().any(|w| label.contains(w));
        if matches(&["sight", "landmark", "tour", "attraction"]) {
            ActivityCategory::Sightseeing
        } else if matches(&["museum", "culture", "history", "art", "heritage"]) {
            ActivityCategory::Culture
        } else if matches(&["food", "cuisine", "restaurant", "market", "culinary", "wine", "dinner", "lunch"]) {
            ActivityCategory::Food
        } else if matches(&["outdoor", "nature", "hike", "park", "beach", "adventure"]) {
            ActivityCategory::Outdoors
        } else if matches(&["shop"]) {
            ActivityCategory::Shopping
        } else if matches(&["night", "bar", "club"]) {
            ActivityCategory::Nightlife
        } else if matches(&["relax", "spa", "leisure", "free time"]) {
            ActivityCategory::Relaxation
        } else {
            ActivityCategory::Other
        }
    }

    fn generic_activity(&self, destination: &str) -> String {
        match self {
            ActivityCategory::Sightseeing => format!("Visit the main landmarks of {}", destination),
            ActivityCategory::Culture => format!("Explore a museum or historic quarter in {}", destination),
            ActivityCategory::Food => format!("Try local specialties at a market or restaurant in {}", destination),
            ActivityCategory::Outdoors => format!("Spend time in a park or outdoor area near {}", destination),
            ActivityCategory::Shopping => format!("Browse local shops in {}", destination),
            ActivityCategory::Nightlife => format!("Enjoy an evening out in {}", destination),
            ActivityCategory::Relaxation => format!("Take a slow day around {}", destination),
            ActivityCategory::Other => format!("Discover {} at your own pace", destination),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub time_of_day: TimeOfDay,
    pub description: String,
    pub category: ActivityCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaySource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDay {
    pub date: NaiveDate,
    pub day_index: usize,
    pub activities: Vec<Activity>,
    pub meals: Vec<String>,
    pub source: DaySource,
    /// Arrival and check-out logistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub destination: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub days: Vec<ItineraryDay>,
    pub flight_summary: String,
    pub hotel_summary: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedDay {
    #[serde(default)]
    activities: Vec<GeneratedActivity>,
    #[serde(default)]
    meals: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GeneratedActivity {
    #[serde(default)]
    time_of_day: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
}

/// Strip an optional markdown code fence and surrounding prose
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn meal_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Object(o) => ["description", "name", "suggestion"]
            .iter()
            .find_map(|k| o.get(*k).and_then(Value::as_str))
            .map(str::to_string)?,
        _ => return None,
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Parse one generated day; `Err` carries the fallback reason
fn parse_day(text: &str) -> Result<(Vec<Activity>, Vec<String>), String> {
    let json = extract_json(text).ok_or_else(|| "response contained no JSON object".to_string())?;
    let day: GeneratedDay = serde_json::from_str(json).map_err(|e| format!("malformed day JSON: {}", e))?;

    let activities: Vec<Activity> = day
        .activities
        .into_iter()
        .filter(|a| !a.description.trim().is_empty())
        .map(|a| Activity {
            time_of_day: a.time_of_day.as_deref().map(TimeOfDay::from_hint).unwrap_or(TimeOfDay::Anytime),
            category: a
                .category
                .as_deref()
                .map(ActivityCategory::from_label)
                .unwrap_or_else(|| ActivityCategory::from_label(&a.description)),
            description: a.description.trim().to_string(),
        })
        .collect();

    if activities.is_empty() {
        return Err("no activities in generated day".to_string());
    }

    let meals = day.meals.iter().filter_map(meal_text).take(MAX_MEALS).collect();
    Ok((activities, meals))
}

/// Lower-case, drop punctuation, collapse whitespace
fn comparable(description: &str) -> String {
    description
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds a day-by-day plan, one generator call per day
pub struct ItineraryComposer {
    generator: Arc<dyn TextGenerator>,
    policy: CallPolicy,
    config: ItineraryConfig,
    max_day_chars: usize,
}

impl ItineraryComposer {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: CallPolicy, config: ItineraryConfig, max_day_chars: usize) -> Self {
        Self { generator, policy, config, max_day_chars }
    }

    /// Dates covered by the trip under the configured check-out mode
    fn day_count(&self, check_in: NaiveDate, check_out: NaiveDate) -> i64 {
        let nights = (check_out - check_in).num_days().max(0);
        match self.config.checkout_day {
            CheckoutDay::Exclusive => nights,
            CheckoutDay::Inclusive => nights + 1,
        }
    }

    pub fn trip_dates(&self, check_in: NaiveDate, check_out: NaiveDate) -> Vec<NaiveDate> {
        (0..self.day_count(check_in, check_out)).map(|offset| check_in + Duration::days(offset)).collect()
    }

    fn validate(&self, request: &ItineraryRequest) -> CoreResult<()> {
        if request.destination.trim().is_empty() {
            return Err(CoreError::InvalidRequest("destination must not be empty".to_string()));
        }
        if request.check_out <= request.check_in {
            return Err(CoreError::InvalidRequest(format!(
                "check-out {} must be after check-in {}",
                request.check_out, request.check_in
            )));
        }
        let days = self.day_count(request.check_in, request.check_out);
        if days > i64::from(self.config.max_days) {
            return Err(CoreError::InvalidRequest(format!(
                "trip of {} days exceeds the {} day maximum",
                days, self.config.max_days
            )));
        }
        Ok(())
    }

    pub async fn compose(&self, request: &ItineraryRequest) -> CoreResult<(Itinerary, Vec<Warning>)> {
        self.validate(request)?;

        let dates = self.trip_dates(request.check_in, request.check_out);
        let count = dates.len();
        let mut days: Vec<ItineraryDay> = Vec::with_capacity(count);
        let mut warnings = Vec::new();

        // 1. Generate days in order so each prompt sees what is already planned
        for (index, date) in dates.into_iter().enumerate() {
            let planned: Vec<String> = days
                .iter()
                .flat_map(|d| d.activities.iter().map(|a| a.description.clone()))
                .collect();
            let slot = DaySlot { index, count, date };

            let day = match self.generate_day(request, slot, &planned).await {
                Ok((activities, meals)) => ItineraryDay {
                    date,
                    day_index: index,
                    activities,
                    meals,
                    source: DaySource::Generated,
                    note: None,
                },
                Err(reason) => {
                    warn!("Day {} ({}) falls back to a template plan: {}", index + 1, date, reason);
                    warnings.push(Warning::DayFallback { day_index: index, date, reason });
                    self.fallback_day(request, slot)
                }
            };
            days.push(day);
        }

        // 2. Drop near-identical activities across generated days
        warnings.extend(self.remove_duplicates(&mut days));

        // 3. Logistics notes on the first and last day
        self.add_notes(request, &mut days);

        let fallbacks = days.iter().filter(|d| d.source == DaySource::Fallback).count();
        if fallbacks == days.len() {
            warnings.push(Warning::AllDaysFallback { days: days.len() });
        }

        info!("Composed {}-day itinerary for {} ({} fallback days)", days.len(), request.destination, fallbacks);

        let itinerary = Itinerary {
            destination: request.destination.trim().to_string(),
            check_in: request.check_in,
            check_out: request.check_out,
            days,
            flight_summary: request.flight_summary.clone(),
            hotel_summary: request.hotel_summary.clone(),
        };
        Ok((itinerary, warnings))
    }

    async fn generate_day(
        &self,
        request: &ItineraryRequest,
        slot: DaySlot,
        planned: &[String],
    ) -> Result<(Vec<Activity>, Vec<String>), String> {
        let prompt = day_prompt(request, slot, planned, self.max_day_chars);
        let text = self
            .policy
            .call("day generation", || self.generator.generate(&prompt))
            .await
            .map_err(|e| e.to_string())?;

        let chars = text.chars().count();
        if chars > self.max_day_chars {
            return Err(format!("response of {} characters exceeds the {} limit", chars, self.max_day_chars));
        }
        debug!("Day {} generated ({} chars)", slot.index + 1, chars);
        parse_day(&text)
    }

    fn fallback_day(&self, request: &ItineraryRequest, slot: DaySlot) -> ItineraryDay {
        let destination = request.destination.trim();

        let category = if request.activity_preferences.is_empty() {
            ActivityCategory::DEFAULT_ROTATION[slot.index % ActivityCategory::DEFAULT_ROTATION.len()]
        } else {
            let preference = &request.activity_preferences[slot.index % request.activity_preferences.len()];
            ActivityCategory::from_label(preference)
        };

        ItineraryDay {
            date: slot.date,
            day_index: slot.index,
            activities: vec![
                Activity {
                    time_of_day: TimeOfDay::Morning,
                    description: format!("Free time to explore {}", destination),
                    category: ActivityCategory::Relaxation,
                },
                Activity {
                    time_of_day: TimeOfDay::Afternoon,
                    description: category.generic_activity(destination),
                    category,
                },
            ],
            meals: Vec::new(),
            source: DaySource::Fallback,
            note: None,
        }
    }

    /// At most one removal per pair of generated days, always from the later day
    fn remove_duplicates(&self, days: &mut [ItineraryDay]) -> Vec<Warning> {
        let mut warnings = Vec::new();

        for later in 1..days.len() {
            for earlier in 0..later {
                if days[earlier].source != DaySource::Generated || days[later].source != DaySource::Generated {
                    continue;
                }
                if days[later].activities.len() <= 1 {
                    break;
                }

                let duplicate = days[later].activities.iter().position(|candidate| {
                    let candidate = comparable(&candidate.description);
                    days[earlier].activities.iter().any(|existing| {
                        strsim::normalized_levenshtein(&comparable(&existing.description), &candidate)
                            >= self.config.duplicate_similarity
                    })
                });

                if let Some(position) = duplicate {
                    let removed = days[later].activities.remove(position);
                    debug!("Removed duplicate '{}' from {}", removed.description, days[later].date);
                    warnings.push(Warning::DuplicateActivityRemoved {
                        date: days[later].date,
                        description: removed.description,
                        duplicate_of: days[earlier].date,
                    });
                }
            }
        }

        warnings
    }

    fn add_notes(&self, request: &ItineraryRequest, days: &mut [ItineraryDay]) {
        let flight = request.flight_summary.trim();
        let hotel = request.hotel_summary.trim();

        let arrival = match (flight.is_empty(), hotel.is_empty()) {
            (false, false) => format!("Arrival: {}. Check in at {}.", flight, hotel),
            (false, true) => format!("Arrival: {}. Check in at your accommodation.", flight),
            (true, false) => format!("Check in at {}.", hotel),
            (true, true) => "Arrival day: check in at your accommodation.".to_string(),
        };
        let checkout = if hotel.is_empty() {
            format!("Check out on {}.", request.check_out)
        } else {
            format!("Check out of {} on {}.", hotel, request.check_out)
        };

        let last = days.len().saturating_sub(1);
        if let Some(first) = days.first_mut() {
            first.note = Some(arrival);
        }
        if let Some(day) = days.get_mut(last) {
            day.note = Some(match day.note.take() {
                Some(existing) => format!("{} {}", existing, checkout),
                None => checkout,
            });
        }
    }
}
