use crate::models::common::{math_utils, Vector3};
use crate::models::traits::FrameUpdate;

/// カメラ視点
///
/// 固定視点3種とユーザー操作可能な自由視点を持つ列挙型です。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraView {
    /// 頬側（初期視点）
    Buccal,
    /// 舌側
    Lingual,
    /// 咬合面
    Occlusal,
    /// 自由視点（オービット操作可能）
    Free,
}

impl CameraView {
    /// 視点名から変換
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "buccal" => Some(CameraView::Buccal),
            "lingual" => Some(CameraView::Lingual),
            "occlusal" => Some(CameraView::Occlusal),
            "free" => Some(CameraView::Free),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CameraView::Buccal => "buccal",
            CameraView::Lingual => "lingual",
            CameraView::Occlusal => "occlusal",
            CameraView::Free => "free",
        }
    }

    /// 固定視点のカメラ姿勢（Freeはテーブルを持たない）
    pub fn pose(&self) -> Option<ViewPose> {
        match self {
            CameraView::Buccal => Some(ViewPose {
                position: Vector3::new(0.0, 0.0, 10.0),
                target: Vector3::zero(),
                fov: 45.0,
            }),
            CameraView::Lingual => Some(ViewPose {
                position: Vector3::new(0.0, 0.0, -10.0),
                target: Vector3::zero(),
                fov: 45.0,
            }),
            CameraView::Occlusal => Some(ViewPose {
                position: Vector3::new(0.0, 10.0, 0.0),
                target: Vector3::zero(),
                fov: 45.0,
            }),
            CameraView::Free => None,
        }
    }
}

/// 固定視点のカメラ姿勢（位置・注視点・視野角）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPose {
    pub position: Vector3,
    pub target: Vector3,
    pub fov: f64,
}

/// 視点変更要求の受理/拒否シグナル
///
/// 遷移中の再入要求は例外ではなくRejectedで応答します
/// （重複入力イベントは通常運用で発生し得るため）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewChange {
    Accepted,
    Rejected,
}

/// 進行中のスムーズ遷移
#[derive(Debug, Clone)]
struct CameraTransition {
    from: ViewPose,
    to: ViewPose,
    destination: CameraView,
    elapsed: f64,
    duration: f64,
}

/// カメラ/視点コントローラ
///
/// 固定視点間の即時切替とスムーズ遷移を管理する状態機械です。
/// 不変条件: 自由視点のときだけオービット操作がアンロックされます。
/// スムーズ遷移中は全期間オービットをロックし、オービット注視点は
/// 遷移完了時にのみ確定します。
#[derive(Debug)]
pub struct CameraController {
    current_view: CameraView,
    position: Vector3,
    look_target: Vector3,
    fov: f64,
    /// オービット操作の確定済み注視点（遷移完了時のみ更新）
    orbit_target: Vector3,
    orbit_unlocked: bool,
    transition: Option<CameraTransition>,
}

impl CameraController {
    /// 最初の固定視点（頬側）で初期化
    pub fn new() -> Self {
        let initial = CameraView::Buccal;
        let pose = initial.pose().unwrap_or(ViewPose {
            position: Vector3::zero(),
            target: Vector3::zero(),
            fov: 45.0,
        });
        Self {
            current_view: initial,
            position: pose.position,
            look_target: pose.target,
            fov: pose.fov,
            orbit_target: pose.target,
            orbit_unlocked: false,
            transition: None,
        }
    }

    pub fn current_view(&self) -> CameraView {
        self.current_view
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn look_target(&self) -> Vector3 {
        self.look_target
    }

    pub fn fov(&self) -> f64 {
        self.fov
    }

    pub fn orbit_unlocked(&self) -> bool {
        self.orbit_unlocked
    }

    pub fn in_transition(&self) -> bool {
        self.transition.is_some()
    }

    /// 視点の即時切替
    ///
    /// Freeはオービットをアンロックしカメラ姿勢は変更しません。
    /// 固定視点はテーブルの姿勢を設定してオービットをロックします。
    /// 遷移中の要求は拒否され、進行中の遷移は影響を受けません。
    pub fn set_view(&mut self, view: CameraView) -> ViewChange {
        if self.transition.is_some() {
            return ViewChange::Rejected;
        }

        match view.pose() {
            None => {
                // 自由視点: 姿勢は現状維持
                self.current_view = CameraView::Free;
                self.orbit_unlocked = true;
            }
            Some(pose) => {
                self.position = pose.position;
                self.look_target = pose.target;
                self.fov = pose.fov;
                self.orbit_target = pose.target;
                self.current_view = view;
                self.orbit_unlocked = false;
            }
        }
        ViewChange::Accepted
    }

    /// 固定視点へのスムーズ遷移を開始
    ///
    /// イージング付きで位置・注視点・視野角を補間します。
    /// 遷移中に受けた新たな要求は拒否します（再入ガード）。
    pub fn transition_to(&mut self, view: CameraView, duration: f64) -> ViewChange {
        if self.transition.is_some() {
            return ViewChange::Rejected;
        }

        let Some(to) = view.pose() else {
            // Freeへはスムーズ遷移の対象外、即時切替で扱う
            return self.set_view(view);
        };

        if duration <= 0.0 {
            return self.set_view(view);
        }

        self.orbit_unlocked = false;
        self.transition = Some(CameraTransition {
            from: ViewPose {
                position: self.position,
                target: self.look_target,
                fov: self.fov,
            },
            to,
            destination: view,
            elapsed: 0.0,
            duration,
        });
        ViewChange::Accepted
    }
}

impl FrameUpdate for CameraController {
    fn update(&mut self, dt: f64) {
        let Some(transition) = self.transition.as_mut() else {
            return;
        };

        transition.elapsed += dt;
        let progress = (transition.elapsed / transition.duration).clamp(0.0, 1.0);
        let eased = math_utils::ease_in_out_quad(progress);

        self.position = transition.from.position.lerp(&transition.to.position, eased);
        self.look_target = transition.from.target.lerp(&transition.to.target, eased);
        self.fov = math_utils::lerp(transition.from.fov, transition.to.fov, eased);

        if progress >= 1.0 {
            // 完了時にのみ視点とオービット注視点を確定
            self.current_view = transition.destination;
            self.orbit_target = transition.to.target;
            self.transition = None;
        }
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_first_fixed_view() {
        let camera = CameraController::new();
        assert_eq!(camera.current_view(), CameraView::Buccal);
        assert_eq!(camera.position(), Vector3::new(0.0, 0.0, 10.0));
        assert!(!camera.orbit_unlocked());
    }

    #[test]
    fn test_set_view_fixed_locks_orbit() {
        let mut camera = CameraController::new();
        camera.set_view(CameraView::Free);
        assert!(camera.orbit_unlocked());

        let change = camera.set_view(CameraView::Occlusal);
        assert_eq!(change, ViewChange::Accepted);
        assert_eq!(camera.position(), Vector3::new(0.0, 10.0, 0.0));
        assert!(!camera.orbit_unlocked());
    }

    #[test]
    fn test_free_view_keeps_pose() {
        let mut camera = CameraController::new();
        let before = camera.position();
        let change = camera.set_view(CameraView::Free);
        assert_eq!(change, ViewChange::Accepted);
        assert_eq!(camera.position(), before);
        assert_eq!(camera.current_view(), CameraView::Free);
        assert!(camera.orbit_unlocked());
    }

    #[test]
    fn test_transition_interpolates_and_commits_on_completion() {
        let mut camera = CameraController::new();
        let change = camera.transition_to(CameraView::Occlusal, 1.0);
        assert_eq!(change, ViewChange::Accepted);
        assert!(camera.in_transition());

        camera.update(0.5);
        // 中間点: bucal(0,0,10)とocclusal(0,10,0)の間
        assert!(camera.position().y > 0.0 && camera.position().y < 10.0);
        // 未完了: 視点は切り替わっていない
        assert_eq!(camera.current_view(), CameraView::Buccal);

        camera.update(0.6);
        assert!(!camera.in_transition());
        assert_eq!(camera.current_view(), CameraView::Occlusal);
        assert_eq!(camera.position(), Vector3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn test_reentrancy_guard_rejects_mid_transition() {
        let mut camera = CameraController::new();
        assert_eq!(camera.transition_to(CameraView::Occlusal, 1.0), ViewChange::Accepted);
        camera.update(0.3);

        // 遷移中のfree要求は拒否され、状態は変化しない
        let position_before = camera.position();
        assert_eq!(camera.set_view(CameraView::Free), ViewChange::Rejected);
        assert_eq!(camera.transition_to(CameraView::Lingual, 1.0), ViewChange::Rejected);
        assert_eq!(camera.position(), position_before);
        assert!(!camera.orbit_unlocked());
        assert!(camera.in_transition());

        // 進行中の遷移は影響を受けず完了する
        camera.update(0.8);
        assert_eq!(camera.current_view(), CameraView::Occlusal);
        assert_eq!(camera.position(), Vector3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn test_orbit_locked_for_whole_transition() {
        let mut camera = CameraController::new();
        camera.set_view(CameraView::Free);
        camera.transition_to(CameraView::Lingual, 1.0);
        assert!(!camera.orbit_unlocked());
        camera.update(0.5);
        assert!(!camera.orbit_unlocked());
        camera.update(0.5);
        assert!(!camera.orbit_unlocked());
    }

    #[test]
    fn test_view_name_round_trip() {
        for view in [
            CameraView::Buccal,
            CameraView::Lingual,
            CameraView::Occlusal,
            CameraView::Free,
        ] {
            assert_eq!(CameraView::from_name(view.name()), Some(view));
        }
        assert_eq!(CameraView::from_name("overview"), None);
    }
}
