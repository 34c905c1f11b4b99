use glam::DVec2;
use serde::{Deserialize, Serialize};

/// 2次元ベクトル（スクリーン座標系: x右向き、y下向き）
pub type Vec2 = DVec2;

/// 世界の幾何設定
///
/// 水平方向はトーラス状に折り返し（右端と左端が隣接）、
/// 垂直方向は天井（y=0）と地面の衝突高度で区切られます。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldGeometry {
    /// 世界の幅（px）
    pub width: f64,
    /// 世界の高さ（px）
    pub height: f64,
    /// 画面上端から地面衝突面までの距離（px）
    pub ground_elevation: f64,
    /// 重力加速度（px/s²、下向き）
    pub gravity: f64,
}

impl WorldGeometry {
    pub fn new(width: f64, height: f64, ground_elevation: f64, gravity: f64) -> Self {
        Self {
            width,
            height,
            ground_elevation,
            gravity,
        }
    }

    /// x座標を [0, width) に折り返す
    pub fn wrap_x(&self, x: f64) -> f64 {
        x.rem_euclid(self.width)
    }

    /// 位置ベクトルのx成分を折り返した仮想座標を返す
    pub fn wrap_position(&self, position: Vec2) -> Vec2 {
        Vec2::new(self.wrap_x(position.x), position.y)
    }

    /// 折り返しを考慮した符号付きx差分（from → to、範囲 (-W/2, W/2]）
    pub fn wrapped_dx(&self, from_x: f64, to_x: f64) -> f64 {
        let mut dx = (to_x - from_x).rem_euclid(self.width);
        if dx > self.width / 2.0 {
            dx -= self.width;
        }
        dx
    }

    /// 折り返しを考慮した相対ベクトル（from → to）
    pub fn wrapped_delta(&self, from: Vec2, to: Vec2) -> Vec2 {
        Vec2::new(self.wrapped_dx(from.x, to.x), to.y - from.y)
    }

    /// 折り返しを考慮したユークリッド距離
    ///
    /// 水平成分は `min(|dx|, W - |dx|)`、垂直成分は単純な差の絶対値です。
    pub fn wrapped_distance(&self, a: Vec2, b: Vec2) -> f64 {
        let raw = (a.x - b.x).abs().rem_euclid(self.width);
        let dx = raw.min(self.width - raw);
        let dy = (a.y - b.y).abs();
        (dx * dx + dy * dy).sqrt()
    }
}

/// 軸平行な矩形（当たり判定用）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl BoundingBox {
    /// 中心と寸法から矩形を作成
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        let half = size / 2.0;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// 矩形同士が重なっているか（辺が接するだけの場合は重ならない）
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// エージェントの状態を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Active,    // アクティブ
    Destroyed, // 撃破（被弾・衝突）
    Crashed,   // 地面に墜落
}

/// 知覚されたエンティティの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerceivedKind {
    Target,
    Agent,
}

impl PerceivedKind {
    /// カバレッジマップのターゲット層に書き込む値
    pub fn layer_value(&self) -> f64 {
        match self {
            PerceivedKind::Target => 1.0,
            PerceivedKind::Agent => 2.0,
        }
    }
}

/// オーケストレーターの視界計算から渡される知覚情報 (x, y, kind)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerceivedEntity {
    pub position: Vec2,
    pub kind: PerceivedKind,
}

impl PerceivedEntity {
    pub fn new(x: f64, y: f64, kind: PerceivedKind) -> Self {
        Self {
            position: Vec2::new(x, y),
            kind,
        }
    }
}

/// 数学ユーティリティ関数
///
/// 角度はすべて度で扱います。ピッチの増加はスクリーン上で
/// `(cos(-θ), sin(-θ))` の向きに対応します（y軸が下向きのため符号を反転）。
pub mod math_utils {
    use super::Vec2;

    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * std::f64::consts::PI / 180.0
    }

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * 180.0 / std::f64::consts::PI
    }

    /// ピッチを [0, 360) に折り返す
    pub fn wrap_pitch(pitch_deg: f64) -> f64 {
        let wrapped = pitch_deg.rem_euclid(360.0);
        // rem_euclidは丸めで360.0を返すことがある
        if wrapped >= 360.0 { 0.0 } else { wrapped }
    }

    /// 角度を (-180度, 180度] の範囲に正規化
    pub fn normalize_angle(angle_deg: f64) -> f64 {
        let mut normalized = angle_deg % 360.0;
        if normalized > 180.0 {
            normalized -= 360.0;
        } else if normalized <= -180.0 {
            normalized += 360.0;
        }
        normalized
    }

    /// 2つの角度の差を計算（from → to、(-180度, 180度]）
    pub fn angle_difference(from_deg: f64, to_deg: f64) -> f64 {
        normalize_angle(to_deg - from_deg)
    }

    /// ピッチ角に対応する単位ベクトル
    pub fn pitch_unit_vector(pitch_deg: f64) -> Vec2 {
        let rad = deg_to_rad(-pitch_deg);
        Vec2::new(rad.cos(), rad.sin())
    }

    /// ベクトルの向きをピッチと同じ規約の角度（度）で返す
    pub fn heading_deg(v: Vec2) -> f64 {
        rad_to_deg((-v.y).atan2(v.x))
    }

    /// 正規化。ノルムが0の場合は `fallback` を返す
    pub fn unit_or(v: Vec2, fallback: Vec2) -> Vec2 {
        let norm = v.length();
        if norm > 0.0 && norm.is_finite() {
            v / norm
        } else {
            fallback
        }
    }
}
