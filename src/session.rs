//! # Session モジュール
//!
//! インプラント埋入シミュレーションの中核となるセッションエンジンを提供します。
//!
//! このモジュールは、協調的な更新ループを管理し、各コンポーネント
//! （入力→動作変換、偏差トラッカー、カメラコントローラ、パーティクル
//! サブシステム）を毎フレーム固定順序で更新します。入力イベントは
//! 同一論理スレッド上で受け付け、次フレームの入力フェーズで反映されるため、
//! フェーズ途中の状態が外部から観測されることはありません。
//!
//! ## フレーム処理順序
//!
//! 1. **入力フェーズ**: 保留中のポインタ入力をMotion Transformへ適用
//!    （ドラッグ中でなければアイドル微振動を適用）
//! 2. **パーティクル更新**: バッチの老化・運動・除去
//! 3. **カメラ更新**: スムーズ遷移の進行
//!
//! ## セッションのライフサイクル
//!
//! 初期化（メソッド検証→描画コンテキスト取得）→ フレームループ →
//! 完了（偏差凍結→スコア確定、冪等）→ 終了処理（ループ停止・入力切断・
//! パーティクル解放）。終了処理の省略は再セッションにまたがるリソース
//! リークとなるため、必ずshutdownを呼び出します。

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::models::camera::{CameraController, CameraView, ViewChange};
use crate::models::common::{EulerRotation, Pose, Vector3};
use crate::models::deviation::DeviationTracker;
use crate::models::motion::MotionTransform;
use crate::models::particles::{BatchSnapshot, ParticleBatch, ParticleSystem};
use crate::models::profile::{benchmark_for, MethodProfile, MethodProfileTable};
use crate::models::scoring::{deviation_weighted_score, Rating};
use crate::models::traits::{EventSink, FrameUpdate, RenderSurface, SessionEvent};
use crate::scenario::{ScenarioConfig, ScriptAction, ScriptedEvent};

/// 近接エフェクトの発生距離閾値
pub const PROXIMITY_THRESHOLD: f64 = 0.5;
/// 近接エフェクトの発生間隔 [s]（毎フレーム発生の抑制）
pub const PROXIMITY_COOLDOWN_S: f64 = 0.25;

/// セッションの実行時状態
///
/// フレームごとの各フェーズ関数へ`&mut`で排他的に渡され、
/// コンポーネント間の隠れた共有（エイリアシング）を持ちません。
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// アクティブなメソッドID
    pub active_method: String,
    /// 器具（インプラント）の現在姿勢
    pub instrument_pose: Pose,
    /// ターゲット姿勢
    pub target_pose: Pose,
    /// 最新の角度偏差 [deg]
    pub angle_deviation_deg: f64,
    /// 最新の深度偏差 [mm]
    pub depth_deviation_mm: f64,
    /// ドラッグ操作中か
    pub is_dragging: bool,
    /// ドリル動作中か
    pub is_drilling: bool,
    /// セッション開始時刻 [s]（シミュレーション時計）
    pub session_start_time: f64,
}

/// 完了したセッションの最終結果
///
/// セッションごとに一度だけ生成される不変のスナップショットです。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResult {
    pub method: String,
    pub angle_deviation_deg: f64,
    pub depth_deviation_mm: f64,
    pub elapsed_seconds: f64,
    /// スコア（0〜100）
    pub score: u32,
    /// 評価区分（"excellent" 等）
    pub rating: String,
}

/// 完了要求の結果シグナル
///
/// アクティブなセッションがない状態での完了要求はエラーではなく
/// Ignoredで応答します（重複入力イベントへの耐性）。
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed(SessionResult),
    Ignored,
}

/// ライブメーター表示の色区分（50%で橙、80%で赤）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterZone {
    Green,
    Orange,
    Red,
}

impl MeterZone {
    /// 偏差比（deviation / max_deviation）から区分を決定
    pub fn from_ratio(ratio: f64) -> Self {
        let percent = ratio * 100.0;
        if percent > 80.0 {
            MeterZone::Red
        } else if percent > 50.0 {
            MeterZone::Orange
        } else {
            MeterZone::Green
        }
    }
}

/// セッションエラー
#[derive(Debug)]
pub enum SessionError {
    /// 描画コンテキストの取得失敗（セッションに対して致命的、リトライなし）
    InitializationFailure(String),
    /// 未知のメソッドID（状態変更前にAPI境界で拒否）
    InvalidMethod(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InitializationFailure(msg) => {
                write!(f, "セッション初期化エラー: {}", msg)
            }
            SessionError::InvalidMethod(id) => {
                write!(f, "未知のメソッドID: {}", id)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// セッションエンジン
///
/// 1回の埋入セッション（メソッド選択から完了まで）の全状態を所有します。
pub struct SessionEngine {
    state: SimulationState,
    profile: MethodProfile,
    motion: MotionTransform,
    tracker: DeviationTracker,
    camera: CameraController,
    particles: ParticleSystem,
    effect_rng: StdRng,
    sink: Box<dyn EventSink>,

    current_time: f64,
    frame_count: u64,
    /// 次フレームの入力フェーズで適用する最新ポインタ座標
    pending_pointer: Option<(f64, f64)>,
    proximity_cooldown: f64,
    result: Option<SessionResult>,
    /// ループ稼働中か（falseで入力・フレームとも無視）
    active: bool,
}

impl SessionEngine {
    /// セッションを初期化
    ///
    /// メソッドIDの検証を状態変更前に行い、続いて描画コンテキストを
    /// 取得します。取得失敗はリトライせず呼び出し側へ返します。
    pub fn new(
        table: &MethodProfileTable,
        method_id: &str,
        seed: u64,
        surface: &mut dyn RenderSurface,
        mut sink: Box<dyn EventSink>,
    ) -> Result<Self, SessionError> {
        let profile = table
            .lookup(method_id)
            .ok_or_else(|| SessionError::InvalidMethod(method_id.to_string()))?
            .clone();
        profile
            .validate()
            .map_err(SessionError::InvalidMethod)?;

        surface
            .acquire()
            .map_err(SessionError::InitializationFailure)?;

        // ターゲット姿勢は固定。器具はメソッド固有のオフセット位置から開始
        let target_pose = Pose::new(
            Vector3::zero(),
            EulerRotation::new(std::f64::consts::FRAC_PI_2, 0.0, 0.0),
        );
        let instrument_pose = Pose::new(
            target_pose.position + profile.target_offset,
            target_pose.rotation,
        );

        info!(
            "セッション初期化: メソッド={} (安定性={:.2}, 精度={:.2})",
            profile.id, profile.stability_factor, profile.precision_factor
        );

        sink.emit(SessionEvent::Started {
            method: profile.id.clone(),
        });

        Ok(Self {
            state: SimulationState {
                active_method: profile.id.clone(),
                instrument_pose,
                target_pose,
                angle_deviation_deg: 0.0,
                depth_deviation_mm: 0.0,
                is_dragging: false,
                is_drilling: false,
                session_start_time: 0.0,
            },
            motion: MotionTransform::new(seed),
            tracker: DeviationTracker::new(),
            camera: CameraController::new(),
            particles: ParticleSystem::new(),
            effect_rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
            sink,
            profile,
            current_time: 0.0,
            frame_count: 0,
            pending_pointer: None,
            proximity_cooldown: 0.0,
            result: None,
            active: true,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn profile(&self) -> &MethodProfile {
        &self.profile
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// ライブメーター用の最新角度偏差 [deg]
    pub fn angle_deviation_deg(&self) -> f64 {
        self.tracker.angle_deviation_deg()
    }

    /// ライブメーター用の最新深度偏差 [mm]
    pub fn depth_deviation_mm(&self) -> f64 {
        self.tracker.depth_deviation_mm()
    }

    /// 角度メーターの色区分
    pub fn angle_meter_zone(&self) -> MeterZone {
        MeterZone::from_ratio(
            self.tracker.angle_deviation_deg() / self.profile.max_angle_deviation_deg,
        )
    }

    /// 深度メーターの色区分
    pub fn depth_meter_zone(&self) -> MeterZone {
        MeterZone::from_ratio(
            self.tracker.depth_deviation_mm() / self.profile.max_depth_deviation_mm,
        )
    }

    /// 描画用のパーティクルスナップショット
    pub fn particle_snapshots(&self) -> Vec<BatchSnapshot> {
        self.particles.snapshots()
    }

    /// 生存パーティクルバッチ数
    pub fn particle_batch_count(&self) -> usize {
        self.particles.len()
    }

    /// 器具とターゲットの位置誤差 [mm]（戦略Bの入力用）
    pub fn placement_error_mm(&self) -> f64 {
        self.state
            .instrument_pose
            .position
            .distance_to(&self.state.target_pose.position)
            * 10.0
    }

    /// ドラッグ開始
    ///
    /// 自由視点中は器具操作を受け付けません（オービット操作と競合するため）。
    pub fn pointer_down(&mut self) {
        if !self.active || self.tracker.is_frozen() {
            return;
        }
        if self.camera.current_view() == CameraView::Free {
            return;
        }
        self.state.is_dragging = true;
    }

    /// ポインタ移動（正規化座標 [-1,1]²）
    ///
    /// 座標の正規化は呼び出し側（コラボレータ）の責務です。
    /// 最新の1サンプルのみ保持し、次フレームの入力フェーズで適用します。
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if !self.active || !self.state.is_dragging || self.tracker.is_frozen() {
            return;
        }
        if self.camera.current_view() == CameraView::Free {
            return;
        }
        self.pending_pointer = Some((x, y));
    }

    /// ドラッグ終了
    pub fn pointer_up(&mut self) {
        self.state.is_dragging = false;
    }

    /// 視点の即時切替（遷移中の要求は拒否）
    pub fn set_view(&mut self, view: CameraView) -> ViewChange {
        if !self.active {
            return ViewChange::Rejected;
        }
        let change = self.camera.set_view(view);
        if change == ViewChange::Rejected {
            debug!("視点変更を拒否: {} (遷移中)", view.name());
        }
        change
    }

    /// 視点のスムーズ遷移（遷移中の要求は拒否）
    pub fn transition_view(&mut self, view: CameraView, duration_s: f64) -> ViewChange {
        if !self.active {
            return ViewChange::Rejected;
        }
        let change = self.camera.transition_to(view, duration_s);
        if change == ViewChange::Rejected {
            debug!("視点遷移を拒否: {} (遷移中)", view.name());
        }
        change
    }

    /// ドリル動作の開始（骨粉バーストを発生）
    pub fn start_drilling(&mut self) {
        if !self.active || self.tracker.is_frozen() {
            return;
        }
        self.state.is_drilling = true;
        let origin = self.state.target_pose.position;
        self.particles
            .spawn(ParticleBatch::drilling_burst(origin, &mut self.effect_rng));
        self.sink.emit(SessionEvent::DrillingStarted);
        debug!("ドリル動作開始 (t={:.2}秒)", self.current_time);
    }

    /// クリーニング動作（スパークルエフェクトを発生）
    pub fn trigger_cleaning(&mut self) {
        if !self.active || self.tracker.is_frozen() {
            return;
        }
        let origin = self.state.target_pose.position;
        self.particles
            .spawn(ParticleBatch::cleaning_sparkle(origin, &mut self.effect_rng));
        self.sink.emit(SessionEvent::Cleaning);
        debug!("クリーニング動作 (t={:.2}秒)", self.current_time);
    }

    /// 1フレーム分の更新
    ///
    /// フェーズ順序: 入力適用 → パーティクル更新 → カメラ更新。
    pub fn frame(&mut self, dt: f64) {
        if !self.active {
            return;
        }

        self.apply_input_phase();
        self.check_proximity(dt);

        self.particles.update(dt);
        self.camera.update(dt);

        self.current_time += dt;
        self.frame_count += 1;

        if self.frame_count % 600 == 0 {
            trace!(
                "フレーム {} (t={:.1}秒, バッチ={})",
                self.frame_count,
                self.current_time,
                self.particles.len()
            );
        }
    }

    /// 入力フェーズ: 保留入力の変換またはアイドル微振動
    fn apply_input_phase(&mut self) {
        if let Some(pointer) = self.pending_pointer.take() {
            if self.tracker.is_frozen() {
                return;
            }
            let sample = self.motion.apply(
                pointer,
                &self.profile,
                self.state.target_pose.rotation,
                &mut self.state.instrument_pose,
            );
            self.state.angle_deviation_deg = sample.angle_deviation_deg;
            self.state.depth_deviation_mm = sample.depth_deviation_mm;
            self.tracker.record(sample);
        } else if !self.state.is_dragging && !self.tracker.is_frozen() {
            // アイドル中の持続的手ブレ（偏差凍結後は停止）
            self.motion
                .idle_perturbation(&self.profile, &mut self.state.instrument_pose);
        }
    }

    /// 近接トリガ: 器具がターゲットに十分近ければエフェクトを発生
    fn check_proximity(&mut self, dt: f64) {
        self.proximity_cooldown = (self.proximity_cooldown - dt).max(0.0);
        if self.tracker.is_frozen() || self.proximity_cooldown > 0.0 {
            return;
        }

        let distance = self
            .state
            .instrument_pose
            .position
            .distance_to(&self.state.target_pose.position);
        if distance < PROXIMITY_THRESHOLD {
            self.particles.spawn(ParticleBatch::proximity_puff(
                self.state.target_pose.position,
                &mut self.effect_rng,
            ));
            self.proximity_cooldown = PROXIMITY_COOLDOWN_S;
        }
    }

    /// セッションを完了し、最終結果を生成（ワンショット・冪等）
    ///
    /// 偏差トラッカーを凍結し、戦略A（偏差加重）でスコアを確定します。
    /// 2回目以降の呼び出しは確定済みの同一結果を返します。
    /// アクティブでないセッションへの要求はIgnoredです。
    pub fn complete(&mut self) -> CompletionOutcome {
        if let Some(result) = &self.result {
            return CompletionOutcome::Completed(result.clone());
        }
        if !self.active {
            warn!("アクティブなセッションがないため完了要求を無視");
            return CompletionOutcome::Ignored;
        }

        let frozen = self.tracker.complete();
        let score = deviation_weighted_score(
            frozen.angle_deviation_deg,
            frozen.depth_deviation_mm,
            &self.profile,
        );
        let rating = Rating::from_score(score);

        let result = SessionResult {
            method: self.profile.id.clone(),
            angle_deviation_deg: frozen.angle_deviation_deg,
            depth_deviation_mm: frozen.depth_deviation_mm,
            elapsed_seconds: self.current_time - self.state.session_start_time,
            score,
            rating: rating.label().to_string(),
        };

        info!(
            "セッション完了: メソッド={} スコア={} ({}) 角度偏差={:.2}度 深度偏差={:.2}mm",
            result.method, result.score, result.rating,
            result.angle_deviation_deg, result.depth_deviation_mm
        );

        self.sink.emit(SessionEvent::Completed {
            result: result.clone(),
        });
        self.result = Some(result.clone());
        CompletionOutcome::Completed(result)
    }

    /// セッション終了処理
    ///
    /// ループを停止し、入力を切断し、全パーティクルバッチを解放します。
    /// メソッド切替・リプレイ・終了のいずれでも必ず呼び出します。
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.state.is_dragging = false;
        self.pending_pointer = None;
        self.particles.clear();
        info!(
            "セッション終了: {}フレーム, {:.1}秒",
            self.frame_count, self.current_time
        );
    }
}

/// スクリプト実行の結果
#[derive(Debug)]
pub struct ScriptOutcome {
    /// 完了結果（スクリプトまたは時間切れ時の自動完了）
    pub result: SessionResult,
    /// 戦略B用の位置誤差 [mm]
    pub placement_error_mm: f64,
    /// 実行フレーム数
    pub frames: u64,
}

/// シナリオの入力スクリプトを実行
///
/// スクリプトイベントを時刻順に適用しながら固定時間刻みでフレームを
/// 進め、完了イベントまたは最大時間到達でセッションを完了します。
pub fn run_scripted(
    scenario: &ScenarioConfig,
    surface: &mut dyn RenderSurface,
    sink: Box<dyn EventSink>,
) -> Result<ScriptOutcome, Box<dyn std::error::Error>> {
    let table = scenario.profile_table()?;
    let mut engine = SessionEngine::new(&table, &scenario.method, scenario.sim.seed, surface, sink)?;

    let dt = scenario.sim.dt_s;
    let mut next_event = 0;

    while engine.current_time() < scenario.sim.t_max_s {
        while next_event < scenario.script.len()
            && scenario.script[next_event].at_s <= engine.current_time()
        {
            apply_scripted_event(&mut engine, &scenario.script[next_event]);
            next_event += 1;
        }

        engine.frame(dt);

        if engine.result().is_some() {
            break;
        }
    }

    // スクリプトに完了イベントがなければ時間切れで完了
    let result = match engine.complete() {
        CompletionOutcome::Completed(result) => result,
        CompletionOutcome::Ignored => unreachable!("active session must complete"),
    };

    let outcome = ScriptOutcome {
        result,
        placement_error_mm: engine.placement_error_mm(),
        frames: engine.frame_count,
    };

    engine.shutdown();
    Ok(outcome)
}

fn apply_scripted_event(engine: &mut SessionEngine, event: &ScriptedEvent) {
    trace!("スクリプトイベント適用 (t={:.2}秒)", event.at_s);
    match &event.action {
        ScriptAction::DragStart => engine.pointer_down(),
        ScriptAction::Pointer { x, y } => engine.pointer_move(*x, *y),
        ScriptAction::DragEnd => engine.pointer_up(),
        ScriptAction::SetView { view, smooth, duration_s } => {
            // 視点名はシナリオ検証済み
            if let Some(view) = CameraView::from_name(view) {
                let change = if *smooth {
                    engine.transition_view(view, *duration_s)
                } else {
                    engine.set_view(view)
                };
                if change == ViewChange::Rejected {
                    debug!("スクリプトの視点変更が拒否されました: {}", view.name());
                }
            }
        }
        ScriptAction::Drill => engine.start_drilling(),
        ScriptAction::Clean => engine.trigger_cleaning(),
        ScriptAction::Complete => {
            engine.complete();
        }
    }
}

/// 結果の概要とベンチマーク比較を表示
pub fn print_result_summary(outcome: &ScriptOutcome, profile: &MethodProfile) {
    let result = &outcome.result;
    println!("=== セッション結果 ===");
    println!("メソッド: {}", profile.display_name);
    println!("角度偏差: {:.2}度", result.angle_deviation_deg);
    println!("深度偏差: {:.2}mm", result.depth_deviation_mm);
    println!("経過時間: {:.1}秒", result.elapsed_seconds);
    println!("スコア (偏差加重): {} ({})", result.score, result.rating);

    let strategy_b = crate::models::scoring::error_distance_score(outcome.placement_error_mm, profile);
    println!(
        "スコア (誤差距離): {} (誤差 {:.2}mm, 倍率 x{:.1})",
        strategy_b, outcome.placement_error_mm, profile.score_multiplier
    );

    if let Some(benchmark) = benchmark_for(&result.method) {
        println!();
        println!("=== ベンチマーク比較 (Neugarten研究) ===");
        println!(
            "角度偏差: {:.2}度 (臨床平均 {:.2}度)",
            result.angle_deviation_deg, benchmark.angle_deg
        );
        println!(
            "深度偏差: {:.2}mm (臨床平均 {:.2}mm)",
            result.depth_deviation_mm, benchmark.depth_mm
        );
    }
}
