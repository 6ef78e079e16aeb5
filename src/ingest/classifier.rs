/// Clinical anomaly classes derived from heart rate alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    SevereBradycardia,
    Bradycardia,
    Tachycardia,
    SevereTachycardia,
}

impl Anomaly {
    pub fn label(&self) -> &'static str {
        match self {
            Anomaly::SevereBradycardia => "Severe Bradycardia",
            Anomaly::Bradycardia => "Bradycardia",
            Anomaly::Tachycardia => "Tachycardia",
            Anomaly::SevereTachycardia => "Severe Tachycardia",
        }
    }
}

/// Threshold classification of a heart-rate sample (beats per minute).
///
/// Evaluated severest-first; the first matching band wins. Pure and total:
/// the same input always yields the same result. Note that the synthetic
/// demo generator carries its own, different thresholds (see
/// `live::demo`) which must never be folded into this table.
pub fn classify(heart_rate: i32) -> Option<Anomaly> {
    if heart_rate < 50 {
        Some(Anomaly::SevereBradycardia)
    } else if heart_rate < 60 {
        Some(Anomaly::Bradycardia)
    } else if heart_rate > 120 {
        Some(Anomaly::SevereTachycardia)
    } else if heart_rate > 100 {
        Some(Anomaly::Tachycardia)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table_is_exact_at_every_boundary() {
        let cases = [
            (0, Some(Anomaly::SevereBradycardia)),
            (45, Some(Anomaly::SevereBradycardia)),
            (49, Some(Anomaly::SevereBradycardia)),
            (50, Some(Anomaly::Bradycardia)),
            (55, Some(Anomaly::Bradycardia)),
            (59, Some(Anomaly::Bradycardia)),
            (60, None),
            (72, None),
            (100, None),
            (101, Some(Anomaly::Tachycardia)),
            (110, Some(Anomaly::Tachycardia)),
            (120, Some(Anomaly::Tachycardia)),
            (121, Some(Anomaly::SevereTachycardia)),
            (250, Some(Anomaly::SevereTachycardia)),
        ];
        for (hr, expected) in cases {
            assert_eq!(classify(hr), expected, "heart rate {}", hr);
        }
    }

    #[test]
    fn classify_is_deterministic() {
        for hr in -10..300 {
            assert_eq!(classify(hr), classify(hr));
        }
    }

    #[test]
    fn labels_match_clinical_names() {
        assert_eq!(Anomaly::SevereBradycardia.label(), "Severe Bradycardia");
        assert_eq!(Anomaly::Bradycardia.label(), "Bradycardia");
        assert_eq!(Anomaly::Tachycardia.label(), "Tachycardia");
        assert_eq!(Anomaly::SevereTachycardia.label(), "Severe Tachycardia");
    }
}
