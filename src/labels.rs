//! Ground-truth labels.
//!
//! Labels derive exclusively from internal fault state (severity timeline,
//! stage, improvement flags), never from synthesized features, so no target
//! leakage is possible. The worst active fault drives the row label:
//! highest stage wins, ties go to the earliest onset.

use crate::constants::{PATH_A_CRITICAL_SEVERITY, RUL_SENTINEL};
use crate::degradation::{DegradationCurve, Stage};
use crate::faults::FaultEpisode;
use serde::{Deserialize, Serialize};

/// Path A three-class target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathALabel {
    Normal,
    Imminent,
    Critical,
}

impl PathALabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathALabel::Normal => "NORMAL",
            PathALabel::Imminent => "IMMINENT",
            PathALabel::Critical => "CRITICAL",
        }
    }
}

/// The four ground-truth labels of one output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowLabels {
    /// "HEALTHY" or the worst active fault's mode, "FM-01".."FM-08".
    pub fault_mode: String,
    /// "HEALTHY" or "STAGE1".."STAGE4".
    pub fault_severity: String,
    /// Hours to end of life for the worst fault; 99999.0 when healthy or
    /// improving.
    pub rul_hours: f64,
    pub path_a_label: PathALabel,
}

impl RowLabels {
    fn healthy() -> Self {
        Self {
            fault_mode: "HEALTHY".to_string(),
            fault_severity: "HEALTHY".to_string(),
            rul_hours: RUL_SENTINEL,
            path_a_label: PathALabel::Normal,
        }
    }
}

/// Compute labels at absolute engine hours `t` from the active fault set.
/// `curves` must align with `faults` index-for-index.
pub fn compute_labels(
    t_hours: f64,
    faults: &[FaultEpisode],
    curves: &[DegradationCurve],
) -> RowLabels {
    // Worst fault: highest stage, ties broken by earliest onset. Faults
    // whose severity is still zero have not begun and do not count.
    let mut worst: Option<(usize, Stage, f64)> = None;
    for (i, (fault, curve)) in faults.iter().zip(curves.iter()).enumerate() {
        let severity = fault.severity_at(curve, t_hours);
        if severity <= 0.0 {
            continue;
        }
        let stage = fault.stage_at(curve, t_hours);
        let better = match &worst {
            None => true,
            Some((_, w_stage, w_onset)) => {
                stage > *w_stage || (stage == *w_stage && fault.onset_hours < *w_onset)
            }
        };
        if better {
            worst = Some((i, stage, fault.onset_hours));
        }
    }

    let Some((idx, stage, _)) = worst else {
        return RowLabels::healthy();
    };
    let fault = &faults[idx];
    let severity = fault.severity_at(&curves[idx], t_hours);

    let rul_hours = if fault.improving.is_some() {
        RUL_SENTINEL
    } else {
        fault.rul_at(t_hours)
    };

    let path_a_label = match stage {
        Stage::Stage1 | Stage::Stage2 => PathALabel::Normal,
        Stage::Stage3 => {
            if severity < PATH_A_CRITICAL_SEVERITY {
                PathALabel::Imminent
            } else {
                PathALabel::Critical
            }
        }
        Stage::Stage4 => PathALabel::Critical,
    };

    RowLabels {
        fault_mode: fault.kind.id().as_str().to_string(),
        fault_severity: stage.severity_label().to_string(),
        rul_hours,
        path_a_label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STAGE_THRESHOLDS;
    use crate::faults::{FaultModeId, Improvement};
    use crate::fleet::EngineVariant;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn episode(id: FaultModeId, onset: f64, seed: u64) -> FaultEpisode {
        let mut rng = StdRng::seed_from_u64(seed);
        FaultEpisode::sample(id, onset, EngineVariant::Modern, &mut rng)
    }

    #[test]
    fn test_no_faults_is_healthy() {
        let labels = compute_labels(100.0, &[], &[]);
        assert_eq!(labels.fault_mode, "HEALTHY");
        assert_eq!(labels.fault_severity, "HEALTHY");
        assert_eq!(labels.rul_hours, RUL_SENTINEL);
        assert_eq!(labels.path_a_label, PathALabel::Normal);
    }

    #[test]
    fn test_fault_before_onset_is_healthy() {
        let ep = episode(FaultModeId::Fm02Cooling, 1000.0, 1);
        let curves = vec![ep.curve()];
        let labels = compute_labels(500.0, &[ep], &curves);
        assert_eq!(labels.fault_mode, "HEALTHY");
        assert_eq!(labels.rul_hours, RUL_SENTINEL);
    }

    #[test]
    fn test_stage1_fault_labels_mode_with_rul() {
        let ep = episode(FaultModeId::Fm02Cooling, 0.0, 1);
        let curves = vec![ep.curve()];
        let t = ep.total_life_hours * 0.3;
        let labels = compute_labels(t, &[ep.clone()], &curves);
        assert_eq!(labels.fault_mode, "FM-02");
        assert_eq!(labels.fault_severity, "STAGE1");
        assert_eq!(labels.path_a_label, PathALabel::Normal);
        assert!((labels.rul_hours - (ep.total_life_hours - t)).abs() < 1e-9);
    }

    #[test]
    fn test_end_of_life_is_critical() {
        let ep = episode(FaultModeId::Fm01Bearing, 0.0, 2);
        let curves = vec![ep.curve()];
        let labels = compute_labels(ep.total_life_hours, &[ep], &curves);
        assert_eq!(labels.fault_mode, "FM-01");
        assert_eq!(labels.fault_severity, "STAGE4");
        assert_eq!(labels.path_a_label, PathALabel::Critical);
        assert_eq!(labels.rul_hours, 0.0);
    }

    #[test]
    fn test_worst_fault_wins() {
        // Late-life bearing versus early-life cooling fault.
        let bearing = episode(FaultModeId::Fm01Bearing, 0.0, 3);
        let cooling = episode(FaultModeId::Fm02Cooling, 0.0, 4);
        let t = bearing.total_life_hours * 0.99;
        let curves = vec![bearing.curve(), cooling.curve()];
        let labels = compute_labels(t, &[bearing, cooling], &curves);
        assert_eq!(labels.fault_mode, "FM-01");
    }

    #[test]
    fn test_tie_breaks_by_earliest_onset() {
        // Two stage-1 faults; the earlier onset labels the row.
        let early = episode(FaultModeId::Fm03ValveTrain, 10.0, 5);
        let late = episode(FaultModeId::Fm04Oil, 200.0, 6);
        let curves = vec![early.curve(), late.curve()];
        let labels = compute_labels(300.0, &[early, late], &curves);
        assert_eq!(labels.fault_mode, "FM-03");
    }

    #[test]
    fn test_improving_fault_gets_sentinel() {
        let mut ep = episode(FaultModeId::Fm05Turbo, 0.0, 7);
        let t_dec = ep.total_life_hours * 0.8;
        let curve = ep.curve();
        let s_dec = ep.severity_at(&curve, t_dec);
        ep.improving = Some(Improvement {
            decided_at_hours: t_dec,
            severity_at_decision: s_dec,
            tau_hours: 300.0,
        });
        let curves = vec![ep.curve()];
        let labels = compute_labels(t_dec + 50.0, &[ep], &curves);
        assert_ne!(labels.fault_mode, "HEALTHY");
        assert_eq!(labels.rul_hours, RUL_SENTINEL);
    }

    #[test]
    fn test_imminent_to_critical_inside_stage3() {
        // Synthetic zero-noise curve makes severity invertible.
        let ep = FaultEpisode {
            sigma: 0.0,
            ..episode(FaultModeId::Fm06Injector, 0.0, 8)
        };
        let curve = ep.curve();
        // Find times where severity crosses into stage 3 and past 0.85.
        let mut t_imminent = None;
        let mut t_critical = None;
        for i in 0..10_000 {
            let t = ep.total_life_hours * i as f64 / 10_000.0;
            let s = ep.severity_at(&curve, t);
            if t_imminent.is_none() && s >= STAGE_THRESHOLDS[1] + 0.01 {
                t_imminent = Some(t);
            }
            if t_critical.is_none() && s >= PATH_A_CRITICAL_SEVERITY + 0.01 {
                t_critical = Some(t);
            }
        }
        let curves = vec![curve];
        let labels = compute_labels(t_imminent.unwrap(), std::slice::from_ref(&ep), &curves);
        assert_eq!(labels.path_a_label, PathALabel::Imminent);
        let labels = compute_labels(t_critical.unwrap(), std::slice::from_ref(&ep), &curves);
        assert_eq!(labels.path_a_label, PathALabel::Critical);
    }
}
