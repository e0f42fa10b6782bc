use rand::Rng;

use crate::models::common::{Rgb, Vector3};
use crate::models::traits::FrameUpdate;

/// ドリル開始エフェクトの粒子数
const DRILLING_PARTICLE_COUNT: usize = 200;
/// クリーニングエフェクトの粒子数
const CLEANING_PARTICLE_COUNT: usize = 50;
/// 近接エフェクトの粒子数
const PROXIMITY_PARTICLE_COUNT: usize = 100;

/// 一時的な視覚フィードバックの粒子バッチ
///
/// 同じ発生時刻と寿命を共有する粒子群です。各バッチは独立に老化し、
/// age ≥ max_age に達したフレームで更新ループから除去されます。
#[derive(Debug, Clone)]
pub struct ParticleBatch {
    pub positions: Vec<Vector3>,
    pub colors: Vec<Rgb>,
    pub velocities: Vec<Vector3>,
    /// 経過寿命 [s]
    pub age: f64,
    /// 最大寿命 [s]（正値）
    pub max_age: f64,
    /// Y方向の重力加速度（未設定なら重力なし）
    pub gravity: Option<f64>,
}

impl ParticleBatch {
    pub fn new(
        positions: Vec<Vector3>,
        colors: Vec<Rgb>,
        velocities: Vec<Vector3>,
        max_age: f64,
        gravity: Option<f64>,
    ) -> Self {
        Self {
            positions,
            colors,
            velocities,
            age: 0.0,
            max_age,
            gravity,
        }
    }

    /// ドリル開始時の骨粉バースト
    ///
    /// 発生点から放射状に飛散し、重力で落下します。
    pub fn drilling_burst(origin: Vector3, rng: &mut impl Rng) -> Self {
        let mut positions = Vec::with_capacity(DRILLING_PARTICLE_COUNT);
        let mut colors = Vec::with_capacity(DRILLING_PARTICLE_COUNT);
        let mut velocities = Vec::with_capacity(DRILLING_PARTICLE_COUNT);

        for _ in 0..DRILLING_PARTICLE_COUNT {
            positions.push(origin);

            // 骨粉色（わずかに明度を散らす）
            let lightness = 0.85 + rng.random_range(0.0..0.15);
            colors.push(Rgb::from_hsl(0.08, 0.2, lightness));

            let angle = rng.random_range(0.0..std::f64::consts::TAU);
            let speed = rng.random_range(0.02..0.07);
            velocities.push(Vector3::new(
                angle.cos() * speed,
                rng.random_range(0.05..0.15),
                angle.sin() * speed,
            ));
        }

        Self::new(positions, colors, velocities, 1.5, Some(-0.01))
    }

    /// クリーニング時のスパークル（発生点の周囲にリング状）
    pub fn cleaning_sparkle(origin: Vector3, rng: &mut impl Rng) -> Self {
        let mut positions = Vec::with_capacity(CLEANING_PARTICLE_COUNT);
        let mut colors = Vec::with_capacity(CLEANING_PARTICLE_COUNT);
        let mut velocities = Vec::with_capacity(CLEANING_PARTICLE_COUNT);

        for i in 0..CLEANING_PARTICLE_COUNT {
            let angle = (i as f64 / CLEANING_PARTICLE_COUNT as f64) * std::f64::consts::TAU;
            let radius = 0.5 + rng.random_range(0.0..0.5);
            positions.push(Vector3::new(
                origin.x + angle.cos() * radius,
                origin.y + rng.random_range(0.0..0.5),
                origin.z + angle.sin() * radius,
            ));

            // 白〜淡青
            colors.push(Rgb::from_hsl(0.55, 0.3, 0.9 + rng.random_range(0.0..0.1)));

            // 外向きにゆっくり拡散
            velocities.push(Vector3::new(
                angle.cos() * 0.02,
                0.01,
                angle.sin() * 0.02,
            ));
        }

        Self::new(positions, colors, velocities, 2.0, None)
    }

    /// ターゲット近接時の微小な発生エフェクト
    pub fn proximity_puff(origin: Vector3, rng: &mut impl Rng) -> Self {
        let mut positions = Vec::with_capacity(PROXIMITY_PARTICLE_COUNT);
        let mut colors = Vec::with_capacity(PROXIMITY_PARTICLE_COUNT);
        let mut velocities = Vec::with_capacity(PROXIMITY_PARTICLE_COUNT);

        for _ in 0..PROXIMITY_PARTICLE_COUNT {
            positions.push(Vector3::new(
                origin.x + rng.random_range(-0.25..0.25),
                origin.y + rng.random_range(-0.25..0.25),
                origin.z + rng.random_range(-0.25..0.25),
            ));

            let hue = 0.05 + rng.random_range(0.0..0.1);
            colors.push(Rgb::from_hsl(hue, 0.9, 0.6));

            velocities.push(Vector3::new(
                rng.random_range(-0.01..0.01),
                rng.random_range(-0.03..-0.01),
                rng.random_range(-0.01..0.01),
            ));
        }

        Self::new(positions, colors, velocities, 2.0, None)
    }

    /// 寿命切れ判定
    pub fn is_expired(&self) -> bool {
        self.age >= self.max_age
    }

    /// 現在の不透明度（線形フェードアウト）
    pub fn opacity(&self) -> f64 {
        (1.0 - self.age / self.max_age).clamp(0.0, 1.0)
    }

    /// 1フレーム分の老化と運動更新
    fn advance(&mut self, dt: f64) {
        self.age += dt;
        if self.is_expired() {
            return;
        }

        for (position, velocity) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            *position = *position + *velocity * dt;
            if let Some(gravity) = self.gravity {
                velocity.y += gravity * dt;
            }
        }
    }
}

/// 描画用のバッチスナップショット（位置・色・不透明度）
#[derive(Debug, Clone)]
pub struct BatchSnapshot {
    pub positions: Vec<Vector3>,
    pub colors: Vec<Rgb>,
    pub opacity: f64,
}

/// パーティクルエフェクトサブシステム
///
/// 複数のバッチを同時に保持し、毎フレーム独立に老化させます。
/// 除去はマーク＆コンパクト方式（生存バッチのみ残すretain）で行い、
/// 反復中のインデックス無効化を避けます。あるバッチの除去が
/// 兄弟バッチの状態へ影響することはありません。
#[derive(Debug, Default)]
pub struct ParticleSystem {
    batches: Vec<ParticleBatch>,
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self {
            batches: Vec::new(),
        }
    }

    /// バッチを追加
    pub fn spawn(&mut self, batch: ParticleBatch) {
        self.batches.push(batch);
    }

    /// 生存バッチ数
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// 生存バッチの参照
    pub fn batches(&self) -> &[ParticleBatch] {
        &self.batches
    }

    /// 描画用スナップショットを生成
    pub fn snapshots(&self) -> Vec<BatchSnapshot> {
        self.batches
            .iter()
            .map(|batch| BatchSnapshot {
                positions: batch.positions.clone(),
                colors: batch.colors.clone(),
                opacity: batch.opacity(),
            })
            .collect()
    }

    /// 全バッチを即時解放（セッション終了処理用）
    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

impl FrameUpdate for ParticleSystem {
    fn update(&mut self, dt: f64) {
        for batch in &mut self.batches {
            batch.advance(dt);
        }
        // 寿命切れバッチをまとめて除去
        self.batches.retain(|batch| !batch.is_expired());
    }
}
