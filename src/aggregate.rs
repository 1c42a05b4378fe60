use crate::tariff::tariff_for;
use crate::types::{ComplexAggregate, RawRecord};

pub const TOTAL_LABEL: &str = "Total";

/// `(1 - generated / potential) * 100`, or 0 when there is no potential.
pub fn unavailability_percent(potential: f64, generated: f64) -> f64 {
    if potential <= 0.0 {
        return 0.0;
    }
    let pct = (1.0 - generated / potential) * 100.0;
    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}

/// Sum a complex's records and derive its metrics.
///
/// Pure: the same record sequence always yields the same aggregate, whether
/// it is the full import or a filtered subset.
pub fn aggregate(complex: &str, records: &[RawRecord]) -> ComplexAggregate {
    #[derive(Default)]
    struct Acc {
        potential: f64,
        generated: f64,
        adjusted_loss: f64,
        ons_loss: f64,
    }
    let acc = records.iter().fold(Acc::default(), |mut acc, r| {
        acc.potential += r.potential_energy_mwh;
        acc.generated += r.generated_energy_mwh;
        acc.adjusted_loss += r.adjusted_loss_mwh.abs();
        acc.ons_loss += r.ons_limitation_loss_mwh.abs();
        acc
    });

    let tariff_rate = tariff_for(complex);
    // Accumulated as magnitudes, so both are already >= 0.
    let adjusted_abs = acc.adjusted_loss;
    let ons_abs = acc.ons_loss;

    ComplexAggregate {
        complex: complex.to_string(),
        potential_energy_mwh: acc.potential,
        generated_energy_mwh: acc.generated,
        adjusted_loss_mwh: negative_magnitude(adjusted_abs),
        ons_limitation_loss_mwh: negative_magnitude(ons_abs),
        tariff_rate,
        unavailability_percent: unavailability_percent(acc.potential, acc.generated),
        total_lost_value_brl: (adjusted_abs + ons_abs) * tariff_rate,
        total_adjusted_lost_value_brl: adjusted_abs * tariff_rate,
        source_records: records.to_vec(),
    }
}

/// Combine per-complex rows into the synthetic "Total" row.
///
/// Quantities and monetary values are plain sums. Unavailability is
/// recomputed from the summed energies so it stays potential-weighted.
pub fn synthesize_total(aggregates: &[ComplexAggregate]) -> Option<ComplexAggregate> {
    if aggregates.is_empty() {
        return None;
    }
    let mut total = ComplexAggregate {
        complex: TOTAL_LABEL.to_string(),
        potential_energy_mwh: 0.0,
        generated_energy_mwh: 0.0,
        adjusted_loss_mwh: 0.0,
        ons_limitation_loss_mwh: 0.0,
        tariff_rate: 0.0,
        unavailability_percent: 0.0,
        total_lost_value_brl: 0.0,
        total_adjusted_lost_value_brl: 0.0,
        source_records: Vec::new(),
    };
    for a in aggregates {
        total.potential_energy_mwh += a.potential_energy_mwh;
        total.generated_energy_mwh += a.generated_energy_mwh;
        total.adjusted_loss_mwh += a.adjusted_loss_mwh;
        total.ons_limitation_loss_mwh += a.ons_limitation_loss_mwh;
        total.total_lost_value_brl += a.total_lost_value_brl;
        total.total_adjusted_lost_value_brl += a.total_adjusted_lost_value_brl;
    }
    total.unavailability_percent =
        unavailability_percent(total.potential_energy_mwh, total.generated_energy_mwh);
    Some(total)
}

// -|x|, without producing -0.0 for an empty sum.
fn negative_magnitude(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        -x.abs()
    }
}
