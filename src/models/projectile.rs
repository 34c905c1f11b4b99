use serde::{Deserialize, Serialize};

use crate::models::{
    common::{math_utils, BoundingBox, Vec2, WorldGeometry},
    traits::IAgent,
};

/// 浮動小数点の累積誤差を吸収する寿命判定の許容値（秒）
const LIFETIME_EPSILON: f64 = 1e-9;

/// 弾丸・銃の設定
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    /// 弾速（px/s）
    pub speed: f64,
    /// 寿命（秒）
    pub lifetime: f64,
    /// 弾の一辺（px）
    pub size: f64,
    /// 連射間隔（秒）
    pub cooldown: f64,
    /// 自動射撃を行う機首方向の許容角（度）
    pub fire_cone_deg: f64,
    /// エージェントへの命中判定距離（px）
    pub agent_hit_radius: f64,
}

impl ProjectileSpec {
    /// 最大射程（px）
    pub fn range(&self) -> f64 {
        self.speed * self.lifetime
    }
}

/// 弾丸
///
/// 発射時のピッチ方向へ一定速度で直進します。水平方向は折り返し、
/// 寿命切れまたは地面到達で消滅します。
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: String,
    /// 発射したエージェントのID
    pub owner_id: String,
    /// 発射したエージェントのチームインデックス
    pub owner_team: usize,
    pub position: Vec2,
    /// 発射時のピッチ（度）
    pub pitch: f64,
    pub speed: f64,
    pub lifetime: f64,
    /// 経過時間（秒）
    pub age: f64,
    pub size: f64,
    pub world: WorldGeometry,
    pub active: bool,
}

impl Projectile {
    pub fn new(
        id: String,
        owner_id: String,
        owner_team: usize,
        origin: Vec2,
        pitch: f64,
        spec: &ProjectileSpec,
        world: WorldGeometry,
    ) -> Self {
        Self {
            id,
            owner_id,
            owner_team,
            position: world.wrap_position(origin),
            pitch,
            speed: spec.speed,
            lifetime: spec.lifetime,
            age: 0.0,
            size: spec.size,
            world,
            active: true,
        }
    }

    /// 1ティック進める
    ///
    /// # 戻り値
    ///
    /// このティックで消滅した場合は true
    pub fn advance(&mut self, dt: f64) -> bool {
        if !self.active {
            return false;
        }

        self.age += dt;
        let step = math_utils::pitch_unit_vector(self.pitch) * self.speed * dt;
        self.position = self.world.wrap_position(self.position + step);

        if self.age >= self.lifetime - LIFETIME_EPSILON
            || self.position.y >= self.world.ground_elevation
        {
            self.active = false;
            return true;
        }
        false
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::centered(self.position, Vec2::splat(self.size))
    }

    pub fn destroy(&mut self) {
        self.active = false;
    }
}

impl IAgent for Projectile {
    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
