use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::common::{math_utils, EulerRotation, Pose};
use crate::models::profile::MethodProfile;

/// 手ブレ振幅の基準係数
///
/// jitter_amplitude = (1 - stability_factor) × JITTER_BASE
pub const JITTER_BASE: f64 = 0.1;

/// アイドル時微振動の基準係数
///
/// shake_amount = (1 - stability_factor) × IDLE_SHAKE_BASE
pub const IDLE_SHAKE_BASE: f64 = 0.001;

/// 1回の入力変換で得られる偏差値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    /// 角度偏差 [deg]（常に非負）
    pub angle_deviation_deg: f64,
    /// 深度偏差 [mm]（常に非負）
    pub depth_deviation_mm: f64,
}

/// 入力→動作変換器
///
/// 正規化ポインタ入力（[-1,1]²）とアクティブなメソッドプロファイルから、
/// 器具の回転姿勢と角度・深度偏差を計算します。安定性の低いメソッドほど
/// 大きい手ブレ（jitter）が加算され、精度の低いメソッドほど入力への追従が
/// 原点方向へ減衰します。jitterはポインタの大きさに比例せず加算されるため、
/// 低精度メソッドでは制御の低下と相対ノイズの増大が同時に起こります。
/// これはメソッド間の難易度カーブとして意図された挙動です。
#[derive(Debug)]
pub struct MotionTransform {
    rng: StdRng,
}

impl MotionTransform {
    /// シード値から変換器を作成（スクリプト実行の再現性用）
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// ドラッグ入力を器具姿勢と偏差に変換
    ///
    /// # 引数
    ///
    /// * `pointer` - 正規化ポインタ座標 (x, y) ∈ [-1,1]²
    /// * `profile` - アクティブなメソッドプロファイル
    /// * `target_rotation` - ターゲット姿勢の回転
    /// * `instrument` - 更新対象の器具姿勢
    pub fn apply(
        &mut self,
        pointer: (f64, f64),
        profile: &MethodProfile,
        target_rotation: EulerRotation,
        instrument: &mut Pose,
    ) -> MotionSample {
        let amplitude = (1.0 - profile.stability_factor) * JITTER_BASE;
        let jitter = (
            self.rng.random_range(-0.5..0.5) * amplitude,
            self.rng.random_range(-0.5..0.5) * amplitude,
        );
        Self::apply_with_jitter(pointer, jitter, profile, target_rotation, instrument)
    }

    /// jitterを明示指定した決定的な変換（apply の内側）
    ///
    /// テストからはjitter=(0,0)で呼び出して乱数なしの挙動を検証できます。
    pub fn apply_with_jitter(
        pointer: (f64, f64),
        jitter: (f64, f64),
        profile: &MethodProfile,
        target_rotation: EulerRotation,
        instrument: &mut Pose,
    ) -> MotionSample {
        // 精度係数による入力の減衰 + 手ブレの加算
        let controlled_x = pointer.0 * profile.precision_factor + jitter.0;
        let controlled_y = pointer.1 * profile.precision_factor + jitter.1;

        // [-1,1]の制御値を角度[deg]へ線形写像
        let angle_x = controlled_x * profile.max_angle_deviation_deg;
        let angle_y = controlled_y * profile.max_angle_deviation_deg;

        // 器具回転の更新（X軸にangle_y、Z軸にangle_x）
        instrument.rotation.x = target_rotation.x + math_utils::deg_to_rad(angle_y);
        instrument.rotation.z = target_rotation.z + math_utils::deg_to_rad(angle_x);

        // 合成角度偏差（ユークリッド合成。jitter+精度で単位範囲を超え得るため
        // max_angle_deviationでは打ち切らない）
        let angle_deviation_deg = (angle_x * angle_x + angle_y * angle_y).sqrt();

        // 深度偏差。|x+y|による合成は距離計量ではないが、
        // 挙動互換のため変更しないこと
        let depth_deviation_mm =
            (controlled_x + controlled_y).abs() * profile.max_depth_deviation_mm;

        MotionSample {
            angle_deviation_deg,
            depth_deviation_mm,
        }
    }

    /// アイドル時の微振動を姿勢へ加算
    ///
    /// ドラッグしていないフレームで毎回呼び出し、持続的な手ブレを再現します。
    /// 加算は累積しリセットされないため、長時間のアイドルでは緩やかな
    /// ドリフトが生じます（セッションの実用時間内では有界）。
    pub fn idle_perturbation(&mut self, profile: &MethodProfile, instrument: &mut Pose) {
        let shake_amount = (1.0 - profile.stability_factor) * IDLE_SHAKE_BASE;
        instrument.rotation.x += self.rng.random_range(-0.5..0.5) * shake_amount;
        instrument.rotation.z += self.rng.random_range(-0.5..0.5) * shake_amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::Vector3;
    use crate::models::profile::MethodProfileTable;

    fn instrument_at_origin() -> Pose {
        Pose::new(Vector3::zero(), EulerRotation::zero())
    }

    #[test]
    fn test_centered_pointer_no_jitter_zero_deviation() {
        let table = MethodProfileTable::builtin();
        let yomi = table.lookup("yomi").unwrap();
        let mut instrument = instrument_at_origin();

        let sample = MotionTransform::apply_with_jitter(
            (0.0, 0.0),
            (0.0, 0.0),
            yomi,
            EulerRotation::zero(),
            &mut instrument,
        );

        assert_eq!(sample.angle_deviation_deg, 0.0);
        assert_eq!(sample.depth_deviation_mm, 0.0);
        assert_eq!(instrument.rotation, EulerRotation::zero());
    }

    #[test]
    fn test_full_deflection_freehand() {
        // freehand、precision=1として全偏向: angle_x=angle_y=10,
        // angle_dev=10√2≈14.14, depth_dev=|1+1|×2=4
        let table = MethodProfileTable::builtin();
        let mut profile = table.lookup("freehand").unwrap().clone();
        profile.precision_factor = 1.0;
        let mut instrument = instrument_at_origin();

        let sample = MotionTransform::apply_with_jitter(
            (1.0, 1.0),
            (0.0, 0.0),
            &profile,
            EulerRotation::zero(),
            &mut instrument,
        );

        assert!((sample.angle_deviation_deg - 10.0 * 2.0_f64.sqrt()).abs() < 1e-9);
        assert!((sample.depth_deviation_mm - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_deviations_never_negative() {
        let table = MethodProfileTable::builtin();
        let corners = [
            (-1.0, -1.0),
            (-1.0, 1.0),
            (1.0, -1.0),
            (1.0, 1.0),
            (0.3, -0.7),
        ];
        let mut transform = MotionTransform::new(42);
        for profile in table.all() {
            for &pointer in &corners {
                let mut instrument = instrument_at_origin();
                let sample =
                    transform.apply(pointer, profile, EulerRotation::zero(), &mut instrument);
                assert!(sample.angle_deviation_deg >= 0.0);
                assert!(sample.depth_deviation_mm >= 0.0);
            }
        }
    }

    #[test]
    fn test_precision_attenuates_toward_origin() {
        let table = MethodProfileTable::builtin();
        let yomi = table.lookup("yomi").unwrap();
        let mut instrument = instrument_at_origin();

        // precision=0.95: controlled=(0.95,0), angle_x=1.9deg
        let sample = MotionTransform::apply_with_jitter(
            (1.0, 0.0),
            (0.0, 0.0),
            yomi,
            EulerRotation::zero(),
            &mut instrument,
        );
        assert!((sample.angle_deviation_deg - 1.9).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_axes_assignment() {
        let table = MethodProfileTable::builtin();
        let mut profile = table.lookup("freehand").unwrap().clone();
        profile.precision_factor = 1.0;
        let target = EulerRotation::new(std::f64::consts::FRAC_PI_2, 0.0, 0.0);
        let mut instrument = instrument_at_origin();

        // pointer=(1,0): angle_x=10deg→Z軸、angle_y=0→X軸はターゲットのまま
        MotionTransform::apply_with_jitter(
            (1.0, 0.0),
            (0.0, 0.0),
            &profile,
            target,
            &mut instrument,
        );
        assert!((instrument.rotation.x - target.x).abs() < 1e-12);
        assert!((instrument.rotation.z - math_utils::deg_to_rad(10.0)).abs() < 1e-12);
    }

    #[test]
    fn test_jitter_amplitude_scales_with_instability() {
        // stability=1.0なら振幅0、applyは決定的になる
        let table = MethodProfileTable::builtin();
        let mut profile = table.lookup("yomi").unwrap().clone();
        profile.stability_factor = 1.0;
        let mut transform = MotionTransform::new(7);
        let mut instrument = instrument_at_origin();

        let sample = transform.apply(
            (0.5, 0.5),
            &profile,
            EulerRotation::zero(),
            &mut instrument,
        );
        let expected = 0.5 * profile.precision_factor * profile.max_angle_deviation_deg;
        let expected_dev = (2.0 * expected * expected).sqrt();
        assert!((sample.angle_deviation_deg - expected_dev).abs() < 1e-9);
    }

    #[test]
    fn test_idle_perturbation_accumulates_but_bounded() {
        let table = MethodProfileTable::builtin();
        let freehand = table.lookup("freehand").unwrap();
        let mut transform = MotionTransform::new(99);
        let mut instrument = instrument_at_origin();

        // 60fps×10分相当のアイドルでもドリフトは実用上有界
        // （1ステップの上限 0.5×0.8×0.001 = 4e-4 rad）
        for _ in 0..36_000 {
            transform.idle_perturbation(freehand, &mut instrument);
        }
        let max_step = 0.5 * (1.0 - freehand.stability_factor) * IDLE_SHAKE_BASE;
        let bound = 36_000.0 * max_step;
        assert!(instrument.rotation.x.abs() < bound);
        assert!(instrument.rotation.z.abs() < bound);
        // ランダムウォークの実際の振れ幅は上限よりはるかに小さい
        assert!(instrument.rotation.x.abs() < 0.5);
        assert!(instrument.rotation.z.abs() < 0.5);
    }

    #[test]
    fn test_stable_method_has_no_idle_shake() {
        let table = MethodProfileTable::builtin();
        let mut profile = table.lookup("yomi").unwrap().clone();
        profile.stability_factor = 1.0;
        let mut transform = MotionTransform::new(1);
        let mut instrument = instrument_at_origin();

        transform.idle_perturbation(&profile, &mut instrument);
        assert_eq!(instrument.rotation, EulerRotation::zero());
    }
}
