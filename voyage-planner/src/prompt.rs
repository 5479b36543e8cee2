//! Prompt construction for recommendation and day generation.

use chrono::NaiveDate;
use std::fmt::Write;

use voyage_core::{FlightSearchCriteria, HotelSearchCriteria, ItineraryRequest, OfferKind, Prompt};
use voyage_offer::{Criterion, Offer, PreferenceProfile, ScoredOffer, Shortlist};

const FLIGHT_ANALYST_ROLE: &str = "You are an AI flight analyst. You compare flight options on price, \
duration, stops and overall convenience and recommend the best one.";

const FLIGHT_ANALYST_INSTRUCTIONS: &str = "Recommend the best flight from the ranked options below. \
Justify the choice with clear reasoning for each attribute:\n\
- Price: why this flight offers the best value compared to the others.\n\
- Duration: how its duration compares to the alternatives.\n\
- Stops: why its number of stops is minimal or acceptable.\n\
- Travel class: what comfort the cabin provides.\n\
Use the provided data as the basis for the recommendation and do not repeat the flight details verbatim.";

const HOTEL_ANALYST_ROLE: &str = "You are an AI hotel analyst. You compare hotel options on price, \
rating, location and amenities and recommend the best one.";

const HOTEL_ANALYST_INSTRUCTIONS: &str = "Recommend the best hotel from the ranked options below. \
Explain clearly why it is the best option:\n\
- Price: the value it offers for its amenities and services.\n\
- Rating: how its rating compares to the alternatives.\n\
- Location: how convenient it is for the traveler.\n\
- Amenities: how its amenities suit different types of travelers.\n\
Compare it against the other options and keep the reasoning concise and well structured.";

const PLANNER_ROLE: &str = "You are an AI travel planner who writes one day of a trip itinerary at a time, \
including must-visit attractions with estimated times, meals and local transport tips.";

pub fn describe_flight_search(criteria: &FlightSearchCriteria) -> String {
    let mut out = format!(
        "Flights from {} to {} departing {}",
        criteria.origin, criteria.destination, criteria.departure_date
    );
    if let Some(return_date) = criteria.return_date {
        let _ = write!(out, ", returning {}", return_date);
    }
    let _ = write!(out, ", {} passenger(s), {} cabin", criteria.passengers, criteria.cabin_class);
    if !criteria.preferences.is_empty() {
        let _ = write!(out, ". Traveler preferences: {}", criteria.preferences.join(", "));
    }
    out
}

pub fn describe_hotel_search(criteria: &HotelSearchCriteria) -> String {
    let mut out = format!(
        "Hotels in {} from {} to {}, {} guest(s), {} room",
        criteria.location, criteria.check_in, criteria.check_out, criteria.guests, criteria.room_type
    );
    if !criteria.amenities.is_empty() {
        let _ = write!(out, ". Wanted amenities: {}", criteria.amenities.join(", "));
    }
    if !criteria.preferences.is_empty() {
        let _ = write!(out, ". Traveler preferences: {}", criteria.preferences.join(", "));
    }
    out
}

/// Amenity tags shown per hotel in a prompt
const MAX_LISTED_AMENITIES: usize = 10;

fn enrichment_flags(offer: &Offer) -> Option<String> {
    let enrichment = offer.enrichment()?;
    let mut flags = Vec::new();
    if let Some(weather) = &enrichment.weather {
        if let Some(conditions) = &weather.conditions {
            flags.push(format!("forecast: {}", conditions));
        }
        if let Some(p) = weather.precipitation_probability {
            flags.push(format!("rain chance {:.0}%", p * 100.0));
        }
    }
    if let Some(good) = enrichment.good_travel_window {
        flags.push(if good { "good travel window".to_string() } else { "poor travel window".to_string() });
    }
    if let Some(outdoor) = enrichment.outdoor_suitability {
        flags.push(if outdoor { "suited to outdoor amenities".to_string() } else { "outdoor amenities unlikely usable".to_string() });
    }
    (!flags.is_empty()).then(|| flags.join(", "))
}

fn shortlist_line(rank: usize, scored: &ScoredOffer) -> String {
    let mut line = format!(
        "{}. {} at {} (score {:.2})",
        rank,
        scored.offer().label(),
        scored.offer().price(),
        scored.score()
    );
    let breakdown: Vec<String> = scored
        .component_scores()
        .iter()
        .map(|(criterion, contribution)| format!("{:?}={:.2}", criterion, contribution).to_lowercase())
        .collect();
    if !breakdown.is_empty() {
        let _ = write!(line, "\n   contributions: {}", breakdown.join(", "));
    }
    if let Offer::Hotel(hotel) = scored.offer() {
        if !hotel.amenities.is_empty() {
            let listed: Vec<&str> = hotel.amenities.iter().take(MAX_LISTED_AMENITIES).map(String::as_str).collect();
            let _ = write!(line, "\n   amenities: {}", listed.join(", "));
        }
    }
    if let Some(flags) = enrichment_flags(scored.offer()) {
        let _ = write!(line, "\n   context: {}", flags);
    }
    line
}

pub fn recommendation_prompt(
    kind: OfferKind,
    search_summary: &str,
    profile: &PreferenceProfile,
    shortlist: &Shortlist,
    max_chars: usize,
) -> Prompt {
    let (role, instructions) = match kind {
        OfferKind::Flight => (FLIGHT_ANALYST_ROLE, FLIGHT_ANALYST_INSTRUCTIONS),
        OfferKind::Hotel => (HOTEL_ANALYST_ROLE, HOTEL_ANALYST_INSTRUCTIONS),
    };

    let weights: Vec<String> = Criterion::for_kind(kind)
        .iter()
        .map(|c| format!("{:?}={:.2}", c, profile.weight(*c)).to_lowercase())
        .collect();

    let mut context = format!("Search: {}\nPreference weights: {}\n\nRanked options:\n", search_summary, weights.join(", "));
    for (i, scored) in shortlist.iter().enumerate() {
        let _ = writeln!(context, "{}", shortlist_line(i + 1, scored));
    }

    Prompt {
        role: role.to_string(),
        instructions: format!("{}\nKeep the answer under {} characters.", instructions, max_chars),
        context,
        max_output_chars: max_chars,
    }
}

/// Position of one day within the trip
#[derive(Debug, Clone, Copy)]
pub struct DaySlot {
    pub index: usize,
    pub count: usize,
    pub date: NaiveDate,
}

pub fn day_prompt(request: &ItineraryRequest, slot: DaySlot, already_planned: &[String], max_chars: usize) -> Prompt {
    let instructions = format!(
        "Plan day {} of {} in {}. Reply with JSON only, in the form \
{{\"activities\": [{{\"time_of_day\": \"morning|afternoon|evening|night\", \"description\": \"...\", \"category\": \"...\"}}], \
\"meals\": [\"...\"]}}. Suggest at most 3 meals. Do not repeat activities already planned on earlier days. \
Keep the answer under {} characters.",
        slot.index + 1,
        slot.count,
        request.destination,
        max_chars
    );

    let mut context = format!(
        "Destination: {}\nTravel dates: {} to {}\nDate of this day: {}\n",
        request.destination, request.check_in, request.check_out, slot.date
    );
    if !request.flight_summary.trim().is_empty() {
        let _ = writeln!(context, "Flight: {}", request.flight_summary.trim());
    }
    if !request.hotel_summary.trim().is_empty() {
        let _ = writeln!(context, "Hotel: {}", request.hotel_summary.trim());
    }
    if !request.activity_preferences.is_empty() {
        let _ = writeln!(context, "Activity preferences: {}", request.activity_preferences.join(", "));
    }
    if slot.index == 0 {
        context.push_str("This is the arrival day; leave time for hotel check-in.\n");
    }
    if !already_planned.is_empty() {
        let _ = writeln!(context, "Already planned:\n- {}", already_planned.join("\n- "));
    }

    Prompt {
        role: PLANNER_ROLE.to_string(),
        instructions,
        context,
        max_output_chars: max_chars,
    }
}
