// 基本的なデータ型と数学ユーティリティ
pub mod common;

// コンポーネント間の基本インターフェース（trait）定義
pub mod traits;

// 各コンポーネントモデルの実装
pub mod profile;
pub mod motion;
pub mod deviation;
pub mod scoring;
pub mod camera;
pub mod particles;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use profile::{MethodProfile, MethodProfileTable, Benchmark, benchmark_for};
pub use motion::{MotionTransform, MotionSample};
pub use deviation::DeviationTracker;
pub use scoring::{Rating, deviation_weighted_score, error_distance_score};
pub use camera::{CameraController, CameraView, ViewChange, ViewPose};
pub use particles::{ParticleSystem, ParticleBatch, BatchSnapshot};
