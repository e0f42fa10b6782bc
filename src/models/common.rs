use std::ops::{Add, Mul, Sub};

/// 3次元ベクトル（位置・速度・オフセットを共用）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// ベクトルの長さ（原点からの距離）
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// 2点間の3次元距離を計算
    pub fn distance_to(&self, other: &Vector3) -> f64 {
        (*other - *self).magnitude()
    }

    /// 2点間の線形補間（t∈[0,1]）
    pub fn lerp(&self, other: &Vector3, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// オイラー角による3次元回転（ラジアン）
///
/// 器具（インプラント）の姿勢を各軸まわりの回転角で表現します。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerRotation {
    pub x: f64, // rad
    pub y: f64, // rad
    pub z: f64, // rad
}

impl EulerRotation {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// 位置と回転をまとめた姿勢
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3,
    pub rotation: EulerRotation,
}

impl Pose {
    pub fn new(position: Vector3, rotation: EulerRotation) -> Self {
        Self { position, rotation }
    }
}

/// 表示色（RGB, 各成分0.0〜1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// 0xRRGGBB形式から変換
    pub fn from_hex(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xff) as f64 / 255.0,
            ((hex >> 8) & 0xff) as f64 / 255.0,
            (hex & 0xff) as f64 / 255.0,
        )
    }

    /// HSL色空間から変換（h,s,l ∈ [0,1]）
    pub fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        if s == 0.0 {
            return Self::new(l, l, l);
        }
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Self::new(
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    }
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// 数学ユーティリティ関数
pub mod math_utils {
    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * std::f64::consts::PI / 180.0
    }

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * 180.0 / std::f64::consts::PI
    }

    /// 2次のイーズイン・アウト（カメラ遷移用）
    ///
    /// t∈[0,1]を滑らかな進行度に写像します。
    pub fn ease_in_out_quad(t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if t < 0.5 {
            2.0 * t * t
        } else {
            1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
        }
    }

    /// スカラーの線形補間
    pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector3_lerp() {
        let a = Vector3::new(0.0, 0.0, 10.0);
        let b = Vector3::new(0.0, 10.0, 0.0);
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid, Vector3::new(0.0, 5.0, 5.0));
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
    }

    #[test]
    fn test_vector3_distance() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(1.0, 2.0, 8.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_rgb_from_hex() {
        let c = Rgb::from_hex(0xff6b6b);
        assert!((c.r - 1.0).abs() < 1e-12);
        assert!((c.g - 107.0 / 255.0).abs() < 1e-12);
        assert!((c.b - 107.0 / 255.0).abs() < 1e-12);
    }

    #[test]
    fn test_ease_in_out_quad_endpoints() {
        assert_eq!(math_utils::ease_in_out_quad(0.0), 0.0);
        assert_eq!(math_utils::ease_in_out_quad(1.0), 1.0);
        assert_eq!(math_utils::ease_in_out_quad(0.5), 0.5);
        // 範囲外はクランプ
        assert_eq!(math_utils::ease_in_out_quad(1.5), 1.0);
    }

    #[test]
    fn test_deg_rad_conversion() {
        assert!((math_utils::deg_to_rad(180.0) - std::f64::consts::PI).abs() < 1e-12);
        assert!((math_utils::rad_to_deg(std::f64::consts::PI) - 180.0).abs() < 1e-12);
    }
}
