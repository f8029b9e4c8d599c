//! Five-factor competitive scoring.
//!
//! Each sub-score is a normalized factor in roughly [0, 1.3]; the total
//! weighs them with the segment's weight table (weights sum to 100), so
//! totals land in roughly [0, 130].

use rust_decimal::prelude::ToPrimitive;

use sim_core::{MarketState, Segment, TeamState};

/// Cap on the diminishing bonus above a segment's expectation. Prevents
/// runaway over-investment in quality or features from dominating.
pub const EXPECTATION_BONUS_CAP: f64 = 1.3;

/// Ephemeral per-(team, segment, round) score. Never persisted beyond the
/// round that produced it.
#[derive(Clone, Copy, Debug)]
pub struct SegmentScore {
    pub price: f64,
    pub quality: f64,
    pub brand: f64,
    pub esg: f64,
    pub features: f64,
    pub total: f64,
}

/// Linear up to the expectation, square-root-shaped diminishing bonus above
/// it, capped at [`EXPECTATION_BONUS_CAP`].
fn expectation_curve(value: f64, expectation: f64) -> f64 {
    if expectation <= 0.0 {
        return 1.0;
    }
    if value <= expectation {
        (value / expectation).max(0.0)
    } else {
        (1.0 + 0.3 * ((value - expectation) / expectation).sqrt()).min(EXPECTATION_BONUS_CAP)
    }
}

/// Price sub-score: the product's position between the segment floor and a
/// quality-adjusted ceiling, squeezed as price competition rises. Prices
/// more than 15% under the floor take a multiplicative penalty capped at
/// halving; pricing below cost is discouraged, not forbidden.
fn price_score(price: f64, quality: f64, segment: Segment, market: &MarketState) -> f64 {
    let profile = segment.profile();
    let ceiling = profile.price_ceiling * (0.8 + 0.4 * quality / 100.0)
        / market.price_competition.max(f64::MIN_POSITIVE);
    let span = ceiling - profile.price_floor;
    let mut sub = if span > 0.0 {
        ((ceiling - price) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cut_in = 0.85 * profile.price_floor;
    if price < cut_in && cut_in > 0.0 {
        sub *= (price / cut_in).max(0.5);
    }
    sub
}

/// Score one team in one segment, or `None` if the team offers no product
/// there (ineligible, not an error).
pub fn score_team(team: &TeamState, segment: Segment, market: &MarketState) -> Option<SegmentScore> {
    let product = team.product_for(segment)?;
    let profile = segment.profile();
    let weights = profile.weights;

    let price = product.price.to_f64().unwrap_or(profile.price_ceiling);
    let price_sub = price_score(price, product.quality, segment, market);
    let quality_sub =
        expectation_curve(product.quality, profile.expected_quality * market.quality_bar);
    let features_sub =
        expectation_curve(product.features, profile.expected_features * market.quality_bar);
    // Sub-linear on purpose: strong early returns, weak at the top end.
    let brand_sub = team.brand.clamp(0.0, 1.0).sqrt();
    let esg_sub = (team.esg / 100.0).clamp(0.0, 1.0) * market.sustainability_premium;

    let total = weights.price * price_sub
        + weights.quality * quality_sub
        + weights.brand * brand_sub
        + weights.esg * esg_sub
        + weights.features * features_sub;

    Some(SegmentScore {
        price: price_sub,
        quality: quality_sub,
        brand: brand_sub,
        esg: esg_sub,
        features: features_sub,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use sim_core::TeamId;

    fn team_with(segment: Segment, price: i64, quality: f64, features: f64) -> TeamState {
        let mut t = TeamState::starting(TeamId(0), "T");
        t.products[0].segment = segment;
        t.products[0].price = Decimal::new(price, 0);
        t.products[0].quality = quality;
        t.products[0].features = features;
        t
    }

    #[test]
    fn no_product_means_ineligible() {
        let t = team_with(Segment::Standard, 400, 55.0, 45.0);
        let m = MarketState::initial();
        assert!(score_team(&t, Segment::Premium, &m).is_none());
        assert!(score_team(&t, Segment::Standard, &m).is_some());
    }

    #[test]
    fn cheaper_product_scores_higher_on_price() {
        let m = MarketState::initial();
        let cheap = team_with(Segment::Budget, 100, 40.0, 30.0);
        let dear = team_with(Segment::Budget, 240, 40.0, 30.0);
        let s1 = score_team(&cheap, Segment::Budget, &m).unwrap();
        let s2 = score_team(&dear, Segment::Budget, &m).unwrap();
        assert!(s1.price > s2.price);
        assert!(s1.total > s2.total);
    }

    #[test]
    fn below_floor_penalty_caps_at_half() {
        let m = MarketState::initial();
        // Budget floor is 80; a giveaway price of 1 hits the penalty cap.
        let dumper = team_with(Segment::Budget, 1, 40.0, 30.0);
        let fair = team_with(Segment::Budget, 80, 40.0, 30.0);
        let s_dump = score_team(&dumper, Segment::Budget, &m).unwrap();
        let s_fair = score_team(&fair, Segment::Budget, &m).unwrap();
        assert!(s_dump.price >= 0.5, "penalty overshot: {}", s_dump.price);
        assert!(s_dump.price <= s_fair.price * 1.0 + 1e-12);
    }

    #[test]
    fn quality_bonus_capped() {
        let m = MarketState::initial();
        let maxed = team_with(Segment::Standard, 400, 100.0, 100.0);
        let s = score_team(&maxed, Segment::Standard, &m).unwrap();
        assert!(s.quality <= EXPECTATION_BONUS_CAP + 1e-12);
        assert!(s.features <= EXPECTATION_BONUS_CAP + 1e-12);
        assert!(s.quality > 1.0);
    }

    #[test]
    fn brand_is_sublinear() {
        let m = MarketState::initial();
        let mut low = team_with(Segment::Standard, 400, 55.0, 45.0);
        low.brand = 0.1;
        let mut high = low.clone();
        high.brand = 0.9;
        let s_low = score_team(&low, Segment::Standard, &m).unwrap();
        let s_high = score_team(&high, Segment::Standard, &m).unwrap();
        // Going 0.1 -> 0.9 is a 9x brand ratio but < 3x score ratio.
        assert!(s_high.brand / s_low.brand < 3.01);
        assert!(s_high.brand > s_low.brand);
    }

    #[test]
    fn sustainability_premium_scales_esg() {
        let mut m = MarketState::initial();
        let t = team_with(Segment::Standard, 400, 55.0, 45.0);
        let before = score_team(&t, Segment::Standard, &m).unwrap().esg;
        m.sustainability_premium = 1.5;
        let after = score_team(&t, Segment::Standard, &m).unwrap().esg;
        assert!((after - before * 1.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn subscores_bounded(
            price in 1i64..2000,
            quality in 0.0f64..100.0,
            features in 0.0f64..100.0,
            brand in 0.0f64..1.0,
            esg in 0.0f64..100.0,
        ) {
            let m = MarketState::initial();
            let mut t = team_with(Segment::Standard, price, quality, features);
            t.brand = brand;
            t.esg = esg;
            let s = score_team(&t, Segment::Standard, &m).unwrap();
            prop_assert!((0.0..=1.0).contains(&s.price));
            prop_assert!((0.0..=EXPECTATION_BONUS_CAP).contains(&s.quality));
            prop_assert!((0.0..=EXPECTATION_BONUS_CAP).contains(&s.features));
            prop_assert!((0.0..=1.0).contains(&s.brand));
            prop_assert!(s.total.is_finite() && s.total >= 0.0);
        }
    }
}
