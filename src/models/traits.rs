use crate::session::SessionResult;

/// フレームごとに更新されるコンポーネントの基本インターフェース
///
/// パーティクルサブシステムとカメラコントローラが実装し、
/// セッションエンジンが毎フレーム固定順序で呼び出します。
pub trait FrameUpdate {
    /// 1フレーム分の更新処理（dt: 経過秒数）
    fn update(&mut self, dt: f64);
}

/// セッション中に発生する外部通知イベント
///
/// 音声・アナリティクス等の外部コラボレータに渡すイベントです。
/// 通知はファイア・アンド・フォーゲットであり、コアの更新ループは
/// 通知結果に依存しません。
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// セッション開始（メソッドID）
    Started { method: String },
    /// ドリル動作開始
    DrillingStarted,
    /// クリーニング動作
    Cleaning,
    /// セッション完了（スコア確定）
    Completed { result: SessionResult },
}

/// 外部コラボレータへのイベント通知インターフェース
///
/// 音声・アナリティクス管理はコアの外部にあり、この narrow interface
/// を通じてのみ到達します。コアがグローバル状態へ直接アクセスすることは
/// ありません。
pub trait EventSink {
    /// イベントの通知（失敗してもコアへ影響しない）
    fn emit(&mut self, event: SessionEvent);
}

/// 何も行わないイベントシンク（デフォルト・テスト用）
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: SessionEvent) {}
}

/// 描画コンテキスト（レンダリングサーフェス）のインターフェース
///
/// 取得はセッション開始時に一度だけ行われ、唯一の外部起因の失敗点です。
/// 失敗した場合はセッション初期化エラーとして呼び出し側へ返します。
pub trait RenderSurface {
    /// 描画コンテキストの取得（失敗時はエラーメッセージ）
    fn acquire(&mut self) -> Result<(), String>;
}

/// 描画を行わないサーフェス（CLI・テスト用、常に成功）
#[derive(Debug, Default)]
pub struct HeadlessSurface;

impl RenderSurface for HeadlessSurface {
    fn acquire(&mut self) -> Result<(), String> {
        Ok(())
    }
}
