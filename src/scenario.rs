use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::models::camera::CameraView;
use crate::models::common::{Rgb, Vector3};
use crate::models::profile::{MethodProfile, MethodProfileTable};

/// シナリオメタデータ
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// フレーム時間刻み [s]
    pub dt_s: f64,
    /// セッション最大時間 [s]
    pub t_max_s: f64,
    /// 乱数シード（手ブレ再現用）
    pub seed: u64,
}

/// 3次元オフセット設定
#[derive(Debug, Deserialize, Serialize)]
pub struct OffsetConfig {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// メソッドプロファイル設定
///
/// 組み込みプロファイルの上書き・追加用です。
#[derive(Debug, Deserialize, Serialize)]
pub struct MethodProfileConfig {
    pub id: String,
    pub display_name: String,
    pub stability_factor: f64,
    pub precision_factor: f64,
    pub max_angle_deviation_deg: f64,
    pub max_depth_deviation_mm: f64,
    pub target_offset: OffsetConfig,
    /// 表示色（"#rrggbb"形式）
    pub display_color: String,
    pub score_multiplier: f64,
}

impl MethodProfileConfig {
    /// 設定値からプロファイルへ変換
    pub fn to_profile(&self) -> Result<MethodProfile, ScenarioError> {
        let color = parse_hex_color(&self.display_color).ok_or_else(|| {
            ScenarioError::ValidationError(format!(
                "invalid display_color for {}: {}",
                self.id, self.display_color
            ))
        })?;
        let profile = MethodProfile {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            stability_factor: self.stability_factor,
            precision_factor: self.precision_factor,
            max_angle_deviation_deg: self.max_angle_deviation_deg,
            max_depth_deviation_mm: self.max_depth_deviation_mm,
            target_offset: Vector3::new(self.target_offset.x, self.target_offset.y, self.target_offset.z),
            display_color: color,
            score_multiplier: self.score_multiplier,
        };
        profile.validate().map_err(ScenarioError::ValidationError)?;
        Ok(profile)
    }
}

/// "#rrggbb"形式の色指定を解析
fn parse_hex_color(s: &str) -> Option<Rgb> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some(Rgb::from_hex(value))
}

/// スクリプト化された入力アクション
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptAction {
    /// ドラッグ開始
    DragStart,
    /// 正規化ポインタ座標の入力（x, y ∈ [-1,1]）
    Pointer { x: f64, y: f64 },
    /// ドラッグ終了
    DragEnd,
    /// 視点変更（smooth指定でスムーズ遷移）
    SetView {
        view: String,
        #[serde(default)]
        smooth: bool,
        #[serde(default = "default_transition_duration")]
        duration_s: f64,
    },
    /// ドリル動作開始
    Drill,
    /// クリーニング動作
    Clean,
    /// セッション完了
    Complete,
}

fn default_transition_duration() -> f64 {
    1.0
}

/// 時刻つきスクリプトイベント
#[derive(Debug, Deserialize, Serialize)]
pub struct ScriptedEvent {
    /// 適用時刻 [s]
    pub at_s: f64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

/// 完全なセッションシナリオ設定
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    /// 使用するメソッドID
    pub method: String,
    /// 組み込みプロファイルへの上書き・追加（省略可）
    #[serde(default)]
    pub profiles: Vec<MethodProfileConfig>,
    /// 入力スクリプト（時刻昇順）
    #[serde(default)]
    pub script: Vec<ScriptedEvent>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.sim.dt_s <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "dt_s must be positive".to_string(),
            ));
        }
        if self.sim.t_max_s <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "t_max_s must be positive".to_string(),
            ));
        }

        // プロファイル上書きの検証（to_profileが範囲検証を行う）
        for config in &self.profiles {
            config.to_profile()?;
        }

        // メソッドIDが解決できること
        let table = self.profile_table()?;
        if table.lookup(&self.method).is_none() {
            return Err(ScenarioError::ValidationError(format!(
                "unknown method id: {}",
                self.method
            )));
        }

        // スクリプトの検証: 時刻昇順・範囲内・視点名と座標の妥当性
        let mut last_time = 0.0;
        for event in &self.script {
            if event.at_s < last_time {
                return Err(ScenarioError::ValidationError(format!(
                    "script events must be in ascending time order (at_s = {})",
                    event.at_s
                )));
            }
            if event.at_s > self.sim.t_max_s {
                return Err(ScenarioError::ValidationError(format!(
                    "script event at {} exceeds t_max_s {}",
                    event.at_s, self.sim.t_max_s
                )));
            }
            last_time = event.at_s;

            match &event.action {
                ScriptAction::Pointer { x, y } => {
                    if !(-1.0..=1.0).contains(x) || !(-1.0..=1.0).contains(y) {
                        return Err(ScenarioError::ValidationError(format!(
                            "pointer coordinates must be in [-1,1]: ({}, {})",
                            x, y
                        )));
                    }
                }
                ScriptAction::SetView { view, duration_s, .. } => {
                    if CameraView::from_name(view).is_none() {
                        return Err(ScenarioError::ValidationError(format!(
                            "unknown view name: {}",
                            view
                        )));
                    }
                    if *duration_s <= 0.0 {
                        return Err(ScenarioError::ValidationError(
                            "transition duration_s must be positive".to_string(),
                        ));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// 組み込みテーブルにシナリオのプロファイルを重ねたテーブルを構築
    pub fn profile_table(&self) -> Result<MethodProfileTable, ScenarioError> {
        let mut profiles: Vec<MethodProfile> = MethodProfileTable::builtin().all().to_vec();
        for config in &self.profiles {
            let profile = config.to_profile()?;
            if let Some(existing) = profiles.iter_mut().find(|p| p.id == profile.id) {
                *existing = profile;
            } else {
                profiles.push(profile);
            }
        }
        Ok(MethodProfileTable::from_profiles(profiles))
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.3}秒", self.sim.dt_s);
        println!("最大時間: {:.1}秒", self.sim.t_max_s);
        println!("シード値: {}", self.sim.seed);
        println!("メソッド: {}", self.method);
        if !self.profiles.is_empty() {
            println!("プロファイル上書き: {}件", self.profiles.len());
        }
        println!();

        println!("=== 入力スクリプト ===");
        println!("イベント数: {}", self.script.len());
        for event in &self.script {
            println!("  {:.2}秒: {}", event.at_s, describe_action(&event.action));
        }
    }
}

fn describe_action(action: &ScriptAction) -> String {
    match action {
        ScriptAction::DragStart => "ドラッグ開始".to_string(),
        ScriptAction::Pointer { x, y } => format!("ポインタ ({:.2}, {:.2})", x, y),
        ScriptAction::DragEnd => "ドラッグ終了".to_string(),
        ScriptAction::SetView { view, smooth, duration_s } => {
            if *smooth {
                format!("視点変更 {} (スムーズ {:.1}秒)", view, duration_s)
            } else {
                format!("視点変更 {}", view)
            }
        }
        ScriptAction::Drill => "ドリル開始".to_string(),
        ScriptAction::Clean => "クリーニング".to_string(),
        ScriptAction::Complete => "セッション完了".to_string(),
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}
