use crate::models::profile::MethodProfile;

/// 戦略Bの最大誤差 [mm]（これ以上で精度0%）
pub const MAX_ERROR_MM: f64 = 5.0;

/// スコアの評価区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Rating {
    /// スコアから評価区分を決定（excellent≥80 / good≥60 / fair≥40）
    pub fn from_score(score: u32) -> Self {
        if score >= 80 {
            Rating::Excellent
        } else if score >= 60 {
            Rating::Good
        } else if score >= 40 {
            Rating::Fair
        } else {
            Rating::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Excellent => "excellent",
            Rating::Good => "good",
            Rating::Fair => "fair",
            Rating::Poor => "poor",
        }
    }
}

/// 戦略A: 偏差加重スコア
///
/// 角度・深度の各サブスコアを最大偏差比で算出し、角度0.6:深度0.4で
/// 加重合成します。サブスコアは合成前に個別クランプしません。
/// このため角度の大きな逸脱は深度が完璧でも合成スコアを0まで押し下げます
/// （意図された非対称ペナルティ）。最終値のみ[0,100]にクランプします。
pub fn deviation_weighted_score(
    angle_deviation_deg: f64,
    depth_deviation_mm: f64,
    profile: &MethodProfile,
) -> u32 {
    let angle_score = 100.0 - (angle_deviation_deg / profile.max_angle_deviation_deg) * 100.0;
    let depth_score = 100.0 - (depth_deviation_mm / profile.max_depth_deviation_mm) * 100.0;

    let raw_score = angle_score * 0.6 + depth_score * 0.4;
    raw_score.round().clamp(0.0, 100.0) as u32
}

/// 戦略B: 誤差距離スコア（メソッド難易度倍率つき）
///
/// 事前計算された誤差距離[mm]から精度[%]を求め、メソッドの難易度倍率を
/// 掛けて[0,100]にクランプします。戦略Aとは別の完了経路から呼び出される
/// ため、両者を1つの式に統合してはいけません。
pub fn error_distance_score(error_mm: f64, profile: &MethodProfile) -> u32 {
    let accuracy = ((1.0 - error_mm / MAX_ERROR_MM) * 100.0).clamp(0.0, 100.0);
    (accuracy * profile.score_multiplier).round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::MethodProfileTable;

    #[test]
    fn test_perfect_placement_scores_100() {
        let table = MethodProfileTable::builtin();
        let yomi = table.lookup("yomi").unwrap();
        assert_eq!(deviation_weighted_score(0.0, 0.0, yomi), 100);
    }

    #[test]
    fn test_freehand_full_deflection_scores_0() {
        // angle_dev=10√2, depth_dev=4:
        // angle_score=100-141.4=-41.4, depth_score=100-200=-100
        // raw=-41.4×0.6+(-100)×0.4=-64.84 → clamp(round(-65),0,100)=0
        let table = MethodProfileTable::builtin();
        let freehand = table.lookup("freehand").unwrap();
        let score = deviation_weighted_score(10.0 * 2.0_f64.sqrt(), 4.0, freehand);
        assert_eq!(score, 0);
    }

    #[test]
    fn test_score_always_in_range() {
        let table = MethodProfileTable::builtin();
        let cases = [
            (0.0, 0.0),
            (0.5, 0.1),
            (100.0, 0.0),
            (0.0, 50.0),
            (1e6, 1e6),
        ];
        for profile in table.all() {
            for &(angle, depth) in &cases {
                let score = deviation_weighted_score(angle, depth, profile);
                assert!(score <= 100);
            }
        }
    }

    #[test]
    fn test_angle_overshoot_outweighs_perfect_depth() {
        // 深度サブスコアが満点でも、角度の逸脱だけで合成が0になり得る
        let table = MethodProfileTable::builtin();
        let yomi = table.lookup("yomi").unwrap();
        let score = deviation_weighted_score(10.0, 0.0, yomi);
        assert_eq!(score, 0);
    }

    #[test]
    fn test_monotone_in_angle_deviation() {
        let table = MethodProfileTable::builtin();
        let static_guided = table.lookup("static").unwrap();
        let depth = 0.3;
        let mut previous = deviation_weighted_score(0.0, depth, static_guided);
        for i in 1..=50 {
            let angle = i as f64 * 0.2;
            let score = deviation_weighted_score(angle, depth, static_guided);
            assert!(score <= previous, "score increased at angle {}", angle);
            previous = score;
        }
    }

    #[test]
    fn test_error_distance_zero_error() {
        let table = MethodProfileTable::builtin();
        let freehand = table.lookup("freehand").unwrap();
        assert_eq!(error_distance_score(0.0, freehand), 100);
    }

    #[test]
    fn test_error_distance_multiplier() {
        // 2.5mm → accuracy 50%。yomiは×1.2で60、freehandは×1.0で50
        let table = MethodProfileTable::builtin();
        let yomi = table.lookup("yomi").unwrap();
        let freehand = table.lookup("freehand").unwrap();
        assert_eq!(error_distance_score(2.5, freehand), 50);
        assert_eq!(error_distance_score(2.5, yomi), 60);
    }

    #[test]
    fn test_error_distance_clamped() {
        let table = MethodProfileTable::builtin();
        let yomi = table.lookup("yomi").unwrap();
        // 誤差過大は0、倍率で100超にはならない
        assert_eq!(error_distance_score(10.0, yomi), 0);
        assert_eq!(error_distance_score(0.0, yomi), 100);
    }

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(Rating::from_score(100), Rating::Excellent);
        assert_eq!(Rating::from_score(80), Rating::Excellent);
        assert_eq!(Rating::from_score(79), Rating::Good);
        assert_eq!(Rating::from_score(60), Rating::Good);
        assert_eq!(Rating::from_score(59), Rating::Fair);
        assert_eq!(Rating::from_score(40), Rating::Fair);
        assert_eq!(Rating::from_score(39), Rating::Poor);
        assert_eq!(Rating::from_score(0), Rating::Poor);
    }
}
