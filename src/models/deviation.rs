use crate::models::motion::MotionSample;

/// 偏差トラッカー
///
/// Motion Transformが毎フレーム書き込む最新の角度・深度偏差を保持し、
/// セッション完了時に値を凍結します。凍結後は読み取り専用となり、
/// 以降の書き込みは無視されます。
#[derive(Debug, Clone)]
pub struct DeviationTracker {
    angle_deviation_deg: f64,
    depth_deviation_mm: f64,
    frozen: bool,
}

impl DeviationTracker {
    pub fn new() -> Self {
        Self {
            angle_deviation_deg: 0.0,
            depth_deviation_mm: 0.0,
            frozen: false,
        }
    }

    /// 最新の偏差を記録（凍結後は無視）
    pub fn record(&mut self, sample: MotionSample) {
        if self.frozen {
            return;
        }
        self.angle_deviation_deg = sample.angle_deviation_deg;
        self.depth_deviation_mm = sample.depth_deviation_mm;
    }

    /// 現在の角度偏差 [deg]
    pub fn angle_deviation_deg(&self) -> f64 {
        self.angle_deviation_deg
    }

    /// 現在の深度偏差 [mm]
    pub fn depth_deviation_mm(&self) -> f64 {
        self.depth_deviation_mm
    }

    /// 凍結済みかどうか
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// 現在値を凍結して返す（ワンショット・冪等）
    ///
    /// 2回目以降の呼び出しは凍結済みの値をそのまま返し、状態を変更しません。
    pub fn complete(&mut self) -> MotionSample {
        self.frozen = true;
        MotionSample {
            angle_deviation_deg: self.angle_deviation_deg,
            depth_deviation_mm: self.depth_deviation_mm,
        }
    }
}

impl Default for DeviationTracker {
    fn default() -> Self {
        Self::new()
    }
}
