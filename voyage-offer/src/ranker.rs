use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

use voyage_store::app_config::RankingConfig;

use crate::models::{Offer, ScoredOffer};

/// Total order used for ranking.
///
/// Score descending, then price ascending, then duration ascending for
/// flights or rating descending for hotels (unrated last), then offer id.
/// The id makes the order total, so ranking never depends on input order.
pub fn rank_order(a: &ScoredOffer, b: &ScoredOffer) -> Ordering {
    b.score()
        .total_cmp(&a.score())
        .then_with(|| a.offer().price().cmp(b.offer().price()))
        .then_with(|| secondary(a.offer(), b.offer()))
        .then_with(|| a.offer().id().cmp(b.offer().id()))
}

fn secondary(a: &Offer, b: &Offer) -> Ordering {
    match (a, b) {
        (Offer::Flight(x), Offer::Flight(y)) => x.duration_minutes.cmp(&y.duration_minutes),
        (Offer::Hotel(x), Offer::Hotel(y)) => match (x.rating, y.rating) {
            (Some(rx), Some(ry)) => ry.total_cmp(&rx),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

/// The top offers of a batch, best first
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Shortlist {
    entries: Vec<ScoredOffer>,
}

impl Shortlist {
    pub fn top(&self) -> Option<&ScoredOffer> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredOffer> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deterministic ranking over scored offers
pub struct OfferRanker {
    shortlist_size: usize,
}

impl OfferRanker {
    pub fn new(shortlist_size: usize) -> Self {
        Self { shortlist_size: shortlist_size.max(1) }
    }

    pub fn from_config(config: &RankingConfig) -> Self {
        Self::new(config.shortlist_size)
    }

    pub fn rank(&self, mut scored: Vec<ScoredOffer>) -> Shortlist {
        let total = scored.len();
        scored.sort_by(rank_order);
        scored.truncate(self.shortlist_size);

        if let Some(best) = scored.first() {
            debug!("Ranked {} offers, keeping {}; top {} at {:.3}", total, scored.len(), best.offer().id(), best.score());
        }

        Shortlist { entries: scored }
    }
}

impl Default for OfferRanker {
    fn default() -> Self {
        Self::from_config(&RankingConfig::default())
    }
}
