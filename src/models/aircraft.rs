use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::models::common::{math_utils, Vec2, WorldGeometry};

/// 機体アーキタイプ（機種ごとの物理パラメータ）
///
/// シナリオ読み込み時に全フィールドの存在が検証されます。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AircraftArchetype {
    /// 質量（kg）
    pub mass: f64,
    /// エンジン推力（スロットル100%時、N）
    pub engine_force: f64,
    /// 最大ピッチレート（deg/s）
    pub agility: f64,
    /// 抗力定数（空気密度・翼面積などをまとめたもの）
    pub c_drag: f64,
    /// 揚力定数（空気密度・翼面積などをまとめたもの）
    pub c_lift: f64,
    /// 負側の失速迎角（度）とその揚力係数
    pub aoa_crit_low: (f64, f64),
    /// 正側の失速迎角（度）とその揚力係数
    pub aoa_crit_high: (f64, f64),
    /// 迎角0での揚力係数
    pub cl0: f64,
    /// 迎角0での抗力係数（抗力曲線の底）
    pub cd_min: f64,
    /// 失速時のピッチ変化係数
    pub stall_torque: f64,
    /// 反転マニューバの遷移時間（秒）
    pub flip_duration: f64,
    /// 初期スロットル（%）
    pub init_throttle: f64,
    /// 初期速度ベクトル（右向き基準）
    pub init_v: [f64; 2],
    /// 機体寸法（長さ, 高さ）
    pub size: [f64; 2],
}

impl AircraftArchetype {
    /// 迎角に対する揚力係数（5区間の区分線形曲線）
    ///
    /// 失速迎角の外側1度で0まで落ち、それより外側では0を返します。
    pub fn lift_coefficient(&self, aoa_deg: f64) -> f64 {
        let (low_angle, low_cl) = self.aoa_crit_low;
        let (high_angle, high_cl) = self.aoa_crit_high;

        if aoa_deg < low_angle - 1.0 {
            0.0
        } else if aoa_deg < low_angle {
            low_cl * (aoa_deg - (low_angle - 1.0))
        } else if aoa_deg < 0.0 {
            low_cl + (self.cl0 - low_cl) * (aoa_deg - low_angle) / -low_angle
        } else if aoa_deg < high_angle {
            self.cl0 + (high_cl - self.cl0) * aoa_deg / high_angle
        } else if aoa_deg < high_angle + 1.0 {
            high_cl * (high_angle + 1.0 - aoa_deg)
        } else {
            0.0
        }
    }

    /// 迎角に対する抗力係数（迎角0を頂点とする放物線）
    pub fn drag_coefficient(&self, aoa_deg: f64) -> f64 {
        (aoa_deg / 40.0_f64.sqrt()).powi(2) + self.cd_min
    }

    /// 迎角が失速域にあるか
    pub fn is_stalled(&self, aoa_deg: f64) -> bool {
        aoa_deg > self.aoa_crit_high.0 || aoa_deg < self.aoa_crit_low.0
    }
}

/// 揚力の基準方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// 通常姿勢
    Upright,
    /// 背面姿勢
    Inverted,
}

impl Orientation {
    pub fn sign(&self) -> f64 {
        match self {
            Orientation::Upright => 1.0,
            Orientation::Inverted => -1.0,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Orientation::Upright => Orientation::Inverted,
            Orientation::Inverted => Orientation::Upright,
        }
    }
}

/// 機体に働く力の内訳（描画用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceBreakdown {
    pub engine: Vec2,
    pub gravity: Vec2,
    pub drag: Vec2,
    pub lift: Vec2,
}

impl ForceBreakdown {
    pub fn net(&self) -> Vec2 {
        self.engine + self.gravity + self.drag + self.lift
    }
}

/// 機体の初期状態
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialState {
    pub throttle: f64,
    pub pitch: f64,
    pub velocity: Vec2,
    pub position: Vec2,
}

/// 飛行力学モデル
///
/// エンジン・重力・揚力・抗力の釣り合いから速度と位置を半陰的オイラー法で
/// 積分します。位置は連続な実座標と、水平方向を折り返した仮想座標の
/// 2つを保持します。
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub params: AircraftArchetype,
    pub world: WorldGeometry,

    /// スロットル（0〜100）
    pub throttle: f64,
    /// ピッチ（度、[0, 360)）
    pub pitch: f64,
    pub velocity: Vec2,
    /// 折り返しなしの実座標
    pub position_real: Vec2,
    /// 水平方向を [0, width) に折り返した座標
    pub position_virtual: Vec2,
    pub orientation: Orientation,
    /// 反転マニューバの残り時間（秒）
    pub flip_timer: f64,

    pub pitch_uv: Vec2,
    pub v_uv: Vec2,
    pub forces: ForceBreakdown,
    /// 迎角（度、(-180, 180]）
    pub aoa_deg: f64,
}

impl Aircraft {
    /// 新しい機体を作成
    ///
    /// 初期速度が左向きの場合は背面姿勢から開始します
    /// （左向き飛行で揚力が上向きになるように）。
    pub fn new(world: WorldGeometry, params: AircraftArchetype, initial: InitialState) -> Self {
        let orientation = if initial.velocity.x < 0.0 {
            Orientation::Inverted
        } else {
            Orientation::Upright
        };
        let pitch = math_utils::wrap_pitch(initial.pitch);
        let pitch_uv = math_utils::pitch_unit_vector(pitch);

        Self {
            params,
            world,
            throttle: initial.throttle.clamp(0.0, 100.0),
            pitch,
            velocity: initial.velocity,
            position_real: initial.position,
            position_virtual: world.wrap_position(initial.position),
            orientation,
            flip_timer: 0.0,
            pitch_uv,
            v_uv: math_utils::unit_or(initial.velocity, pitch_uv),
            forces: ForceBreakdown {
                gravity: Vec2::new(0.0, params.mass * world.gravity),
                ..Default::default()
            },
            aoa_deg: 0.0,
        }
    }

    /// 1ティック分の力学積分
    pub fn tick(&mut self, dt: f64) {
        self.pitch_uv = math_utils::pitch_unit_vector(self.pitch);
        // 速度0では直前の単位ベクトルを保持
        self.v_uv = math_utils::unit_or(self.velocity, self.v_uv);

        self.aoa_deg = math_utils::normalize_angle(self.pitch - math_utils::heading_deg(self.v_uv));

        let speed_sq = self.velocity.length_squared();
        let sign = self.orientation.sign();

        let engine = self.throttle / 100.0 * self.params.engine_force * self.pitch_uv;

        // 背面姿勢では機体基準の迎角が反転する
        let cl = self.params.lift_coefficient(sign * self.aoa_deg);
        let lift_normal = Vec2::new(self.v_uv.y, -self.v_uv.x);
        let lift = cl * self.params.c_lift * speed_sq * sign * lift_normal;

        let cd = self.params.drag_coefficient(self.aoa_deg);
        let drag = -cd * self.params.c_drag * speed_sq * self.v_uv;

        let gravity = Vec2::new(0.0, self.params.mass * self.world.gravity);

        self.forces = ForceBreakdown {
            engine,
            gravity,
            drag,
            lift,
        };

        self.velocity += dt * self.forces.net() / self.params.mass;
        self.position_real += self.velocity * dt;
        self.position_virtual = self.world.wrap_position(self.position_real);

        // 失速判定も揚力と同じ機体基準の迎角で行う
        let wing_aoa = sign * self.aoa_deg;
        if self.params.is_stalled(wing_aoa) {
            let nudge = drag.length() * self.params.stall_torque * dt;
            self.pitch = math_utils::wrap_pitch(self.pitch - sign * wing_aoa.signum() * nudge);
            trace!(aoa = self.aoa_deg, wing_aoa, nudge, "STALL: 失速によるピッチ変化");
        }

        self.flip_timer = (self.flip_timer - dt).max(0.0);
    }

    /// ピッチを `agility × dt` だけ変化させる（負のdtで逆方向）
    pub fn adjust_pitch(&mut self, dt: f64) {
        self.pitch = math_utils::wrap_pitch(self.pitch + self.params.agility * dt);
    }

    /// 反転マニューバ
    ///
    /// 遷移中でなければ揚力の基準方向を反転し、遷移タイマーを開始します。
    /// 反転した場合は true を返します。
    pub fn flip(&mut self) -> bool {
        if self.is_flipping() {
            return false;
        }
        self.orientation = self.orientation.toggled();
        self.flip_timer = self.params.flip_duration;
        true
    }

    pub fn is_flipping(&self) -> bool {
        self.flip_timer > 0.0
    }

    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    /// 機体の外接矩形の下端（y）
    pub fn bottom(&self) -> f64 {
        self.position_virtual.y + self.params.size[1] / 2.0
    }
}
