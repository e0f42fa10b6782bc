use crate::models::common::{Rgb, Vector3};

/// ガイダンスメソッドの精度プロファイル
///
/// 各埋入手技（フリーハンド・静的ガイド・ロボット支援）の模擬精度特性を
/// 表す不変の設定値です。セッション開始時にIDで1件だけ選択され、
/// セッション中は変更されません。
#[derive(Debug, Clone, PartialEq)]
pub struct MethodProfile {
    /// メソッドの一意識別子（"freehand" 等）
    pub id: String,
    /// 表示名
    pub display_name: String,
    /// 手の安定性（0.0〜1.0、低いほど手ブレが大きい）
    pub stability_factor: f64,
    /// 操作精度（0.0〜1.0、低いほど入力への追従が鈍る）
    pub precision_factor: f64,
    /// 最大角度偏差 [deg]（正値）
    pub max_angle_deviation_deg: f64,
    /// 最大深度偏差 [mm]（正値）
    pub max_depth_deviation_mm: f64,
    /// ターゲット姿勢からの初期オフセット
    pub target_offset: Vector3,
    /// UI表示色
    pub display_color: Rgb,
    /// 戦略B用の難易度倍率（難しいメソッドほど大きい）
    pub score_multiplier: f64,
}

impl MethodProfile {
    /// パラメータが有効範囲内かを検証
    ///
    /// stability_factor / precision_factor は [0,1]、
    /// 最大偏差は正値でなければなりません。
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.stability_factor) {
            return Err(format!(
                "stability_factor must be in [0,1]: {} = {}",
                self.id, self.stability_factor
            ));
        }
        if !(0.0..=1.0).contains(&self.precision_factor) {
            return Err(format!(
                "precision_factor must be in [0,1]: {} = {}",
                self.id, self.precision_factor
            ));
        }
        if self.max_angle_deviation_deg <= 0.0 {
            return Err(format!(
                "max_angle_deviation_deg must be positive: {} = {}",
                self.id, self.max_angle_deviation_deg
            ));
        }
        if self.max_depth_deviation_mm <= 0.0 {
            return Err(format!(
                "max_depth_deviation_mm must be positive: {} = {}",
                self.id, self.max_depth_deviation_mm
            ));
        }
        if self.score_multiplier < 1.0 {
            return Err(format!(
                "score_multiplier must be >= 1.0: {} = {}",
                self.id, self.score_multiplier
            ));
        }
        Ok(())
    }
}

/// メソッドIDからプロファイルを引く静的テーブル
#[derive(Debug, Clone)]
pub struct MethodProfileTable {
    profiles: Vec<MethodProfile>,
}

impl MethodProfileTable {
    /// 組み込みの3メソッド（freehand / static / yomi）でテーブルを構築
    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                MethodProfile {
                    id: "freehand".to_string(),
                    display_name: "Freehand".to_string(),
                    stability_factor: 0.2,
                    precision_factor: 0.3,
                    max_angle_deviation_deg: 10.0,
                    max_depth_deviation_mm: 2.0,
                    target_offset: Vector3::new(0.2, 0.15, 0.1),
                    display_color: Rgb::from_hex(0xff6b6b),
                    score_multiplier: 1.0,
                },
                MethodProfile {
                    id: "static".to_string(),
                    display_name: "Static Guided".to_string(),
                    stability_factor: 0.6,
                    precision_factor: 0.6,
                    max_angle_deviation_deg: 5.0,
                    max_depth_deviation_mm: 1.5,
                    target_offset: Vector3::new(0.1, 0.08, 0.05),
                    display_color: Rgb::from_hex(0x4ecdc4),
                    score_multiplier: 1.1,
                },
                MethodProfile {
                    id: "yomi".to_string(),
                    display_name: "Yomi Robotic-Assisted".to_string(),
                    stability_factor: 0.9,
                    precision_factor: 0.95,
                    max_angle_deviation_deg: 2.0,
                    max_depth_deviation_mm: 0.5,
                    target_offset: Vector3::new(0.02, 0.02, 0.02),
                    display_color: Rgb::from_hex(0xff7f50),
                    score_multiplier: 1.2,
                },
            ],
        }
    }

    /// プロファイル一覧からテーブルを構築（シナリオ上書き用）
    pub fn from_profiles(profiles: Vec<MethodProfile>) -> Self {
        Self { profiles }
    }

    /// IDでプロファイルを検索
    pub fn lookup(&self, id: &str) -> Option<&MethodProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// 登録されている全プロファイル
    pub fn all(&self) -> &[MethodProfile] {
        &self.profiles
    }
}

/// 臨床ベンチマーク値（Neugarten研究に基づく参考値）
///
/// 結果表示でユーザーの偏差と比較するための読み取り専用データです。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Benchmark {
    /// 平均角度偏差 [deg]
    pub angle_deg: f64,
    /// 平均深度偏差 [mm]
    pub depth_mm: f64,
    /// 平均埋入誤差 [mm]
    pub average_error_mm: f64,
}

/// メソッドIDからベンチマーク値を引く
pub fn benchmark_for(method: &str) -> Option<Benchmark> {
    match method {
        "freehand" => Some(Benchmark {
            angle_deg: 7.03,
            depth_mm: 1.1,
            average_error_mm: 2.4,
        }),
        "static" => Some(Benchmark {
            angle_deg: 3.9,
            depth_mm: 1.1,
            average_error_mm: 1.8,
        }),
        "yomi" => Some(Benchmark {
            angle_deg: 1.42,
            depth_mm: 0.14,
            average_error_mm: 0.48,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_valid() {
        let table = MethodProfileTable::builtin();
        assert_eq!(table.all().len(), 3);
        for profile in table.all() {
            assert!(profile.validate().is_ok(), "invalid profile: {}", profile.id);
            assert!((0.0..=1.0).contains(&profile.stability_factor));
            assert!((0.0..=1.0).contains(&profile.precision_factor));
            assert!(profile.max_angle_deviation_deg > 0.0);
            assert!(profile.max_depth_deviation_mm > 0.0);
        }
    }

    #[test]
    fn test_lookup_by_id() {
        let table = MethodProfileTable::builtin();
        let yomi = table.lookup("yomi").unwrap();
        assert_eq!(yomi.stability_factor, 0.9);
        assert_eq!(yomi.precision_factor, 0.95);
        assert_eq!(yomi.max_angle_deviation_deg, 2.0);
        assert_eq!(yomi.max_depth_deviation_mm, 0.5);
        assert!(table.lookup("unknown").is_none());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let table = MethodProfileTable::builtin();
        let mut broken = table.lookup("freehand").unwrap().clone();
        broken.stability_factor = 1.5;
        assert!(broken.validate().is_err());

        let mut broken = table.lookup("freehand").unwrap().clone();
        broken.max_angle_deviation_deg = 0.0;
        assert!(broken.validate().is_err());

        let mut broken = table.lookup("freehand").unwrap().clone();
        broken.precision_factor = -0.1;
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_benchmark_table() {
        let yomi = benchmark_for("yomi").unwrap();
        assert_eq!(yomi.angle_deg, 1.42);
        assert_eq!(yomi.average_error_mm, 0.48);
        assert!(benchmark_for("robotic").is_none());
    }
}
