//! # Agent モジュール
//!
//! 飛行力学モデル（[`Aircraft`]）の上に反応型の操縦ロジックを載せた
//! 自律エージェントを提供します。
//!
//! ## 操縦の優先順位
//!
//! 1. **脅威回避**: 機首前方の危険領域に入ったエンティティから逃げる
//! 2. **反転判定**: 揚力の基準方向と逆向きに飛んでいれば反転する
//! 3. **地面・天井回避**: 先読み位置が安全マージンを越えたら水平に戻す
//! 4. **追跡**: 割り当てられたターゲットへ機首を向ける
//! 5. **フロンティア探索**: カバレッジマップ上で未探索領域が最も広がる方向へ向かう
//!
//! ピッチの修正量は常に `agility × dt` の符号付き一定量で、
//! 目標方向との角度差の大きさには依存しません。

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::models::{
    aircraft::{Aircraft, AircraftArchetype, ForceBreakdown, InitialState, Orientation},
    common::{math_utils, AgentStatus, PerceivedEntity, Vec2, WorldGeometry},
    coverage::CoverageMap,
    projectile::{Projectile, ProjectileSpec},
    traits::{IAgent, IMovable},
};

/// フロンティア探索の候補方向（第1象限の離散円、半径約9セル）
const FRONTIER_QUADRANT: [[f64; 2]; 14] = [
    [9.0, 0.0],
    [9.0, 1.0],
    [9.0, 2.0],
    [8.0, 3.0],
    [8.0, 4.0],
    [7.0, 5.0],
    [7.0, 6.0],
    [6.0, 7.0],
    [5.0, 7.0],
    [4.0, 8.0],
    [3.0, 8.0],
    [2.0, 9.0],
    [1.0, 9.0],
    [0.0, 9.0],
];

/// 割り当て済みターゲットとの一致判定に使う距離の二乗
const SAME_POSITION_EPSILON_SQ: f64 = 1e-9;

/// 操縦ロジックの設定
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SteeringSpec {
    /// 危険領域（機首前方の長さ, 左右の幅）（px）
    pub evade_zone: [f64; 2],
    /// 視界半径（px）
    pub radius_fov: f64,
    /// 地面・天井からの安全距離（px）
    pub safe_distance: f64,
    /// 地面・天井へ向かっているとみなす速度単位ベクトルの縦成分
    pub safe_slope: f64,
    /// 反転を開始する速度単位ベクトルの横成分（|v_uv.x|）
    pub flip_cone: f64,
}

/// 直近のティックで選択された操縦行動
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SteeringAction {
    None,
    Evade,
    Floor,
    Ceiling,
    Pursue,
    Explore,
    ExploreTiebreak,
    /// 未探索領域が残っていない
    Idle,
}

/// 描画層に渡す読み取り専用のエージェント状態
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub team: usize,
    pub position: Vec2,
    pub pitch: f64,
    pub velocity: Vec2,
    pub speed: f64,
    pub forces: ForceBreakdown,
    pub aoa_deg: f64,
    pub throttle: f64,
    pub target: Option<Vec2>,
    pub orientation: Orientation,
    pub flipping: bool,
    pub action: SteeringAction,
    /// カバレッジマップ上の探索済みセル数
    pub explored_cells: usize,
}

/// 自律エージェント
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: String,
    /// 所属チームのインデックス
    pub team: usize,
    pub aircraft: Aircraft,
    pub coverage: CoverageMap,
    /// 発射済みで飛翔中の弾丸
    pub projectiles: Vec<Projectile>,
    /// 割り当てられたターゲットの座標
    pub target: Option<Vec2>,
    /// 割り当てられたターゲットのチーム内インデックス（割り当て時点）
    pub target_index: Option<usize>,
    pub status: AgentStatus,
    pub steering: SteeringSpec,
    pub gun: ProjectileSpec,
    pub action: SteeringAction,

    /// 次に射撃できるまでの残り時間（秒）
    cooldown: f64,
    /// 経過シミュレーション時刻（秒）
    sim_time: f64,
    shots_fired: u32,
    frontier_offsets: Vec<Vec2>,
}

impl Agent {
    /// 新しいエージェントを作成
    ///
    /// # 引数
    ///
    /// * `id` - エージェントID
    /// * `team` - 所属チームのインデックス
    /// * `world` - 世界の幾何設定
    /// * `params` - 機体アーキタイプ
    /// * `initial` - 初期状態
    /// * `steering` - 操縦ロジックの設定
    /// * `gun` - 銃と弾丸の設定
    /// * `history_scale` - カバレッジマップのセル寸法（px）
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        team: usize,
        world: WorldGeometry,
        params: AircraftArchetype,
        initial: InitialState,
        steering: SteeringSpec,
        gun: ProjectileSpec,
        history_scale: f64,
    ) -> Self {
        Self {
            id,
            team,
            aircraft: Aircraft::new(world, params, initial),
            coverage: CoverageMap::new(&world, history_scale, steering.radius_fov),
            projectiles: Vec::new(),
            target: None,
            target_index: None,
            status: AgentStatus::Active,
            steering,
            gun,
            action: SteeringAction::None,
            cooldown: 0.0,
            sim_time: 0.0,
            shots_fired: 0,
            frontier_offsets: frontier_offsets(),
        }
    }

    /// 仮想座標（水平方向を折り返した位置）
    pub fn position(&self) -> Vec2 {
        self.aircraft.position_virtual
    }

    pub fn world(&self) -> &WorldGeometry {
        &self.aircraft.world
    }

    /// ターゲットを割り当てる
    pub fn assign_target(&mut self, index: usize, position: Vec2) {
        self.target = Some(position);
        self.target_index = Some(index);
    }

    /// ターゲットの割り当てを解除する
    pub fn clear_target(&mut self) {
        self.target = None;
        self.target_index = None;
    }

    /// 1ティック進める
    ///
    /// カバレッジマップの更新、操縦、自動射撃、飛行力学の積分の順に処理します。
    ///
    /// # 引数
    ///
    /// * `dt` - 時間刻み（秒）
    /// * `perceived` - オーケストレーターが計算した視界内のエンティティ
    pub fn tick(&mut self, dt: f64, perceived: &[PerceivedEntity]) {
        if !self.is_active() {
            return;
        }

        self.sim_time += dt;
        self.cooldown = (self.cooldown - dt).max(0.0);

        self.update_history(perceived);
        self.explore(dt, perceived);
        self.try_autofire();
        self.aircraft.tick(dt);

        trace!(
            agent_id = %self.id,
            x = self.aircraft.position_virtual.x,
            y = self.aircraft.position_virtual.y,
            pitch = self.aircraft.pitch,
            aoa = self.aircraft.aoa_deg,
            action = ?self.action,
            "AGENT_TICK"
        );
    }

    /// カバレッジマップを更新
    ///
    /// 現在セルに訪問時刻を記録し、知覚したエンティティをターゲット層に書き込み、
    /// 現在位置の視界円を訪問層に塗ります。
    pub fn update_history(&mut self, perceived: &[PerceivedEntity]) {
        let position = self.position();
        self.coverage.mark_visited(position, self.sim_time + 1.0);
        for entity in perceived {
            self.coverage
                .mark_perceived(entity.position, entity.kind.layer_value());
        }
        self.coverage.paint_fov(position);
    }

    /// 操縦ロジック本体（優先順位付きの反応型制御）
    pub fn explore(&mut self, dt: f64, perceived: &[PerceivedEntity]) {
        if let Some(direction) = self.evade_direction(perceived) {
            self.action = SteeringAction::Evade;
            self.adjust_pitch(dt * direction);
            return;
        }

        let v_uv = self.aircraft.v_uv;
        let flip_cone = self.steering.flip_cone;
        let against_lift = match self.aircraft.orientation {
            Orientation::Upright => v_uv.x < -flip_cone,
            Orientation::Inverted => v_uv.x > flip_cone,
        };
        if against_lift && self.flip() {
            debug!(
                agent_id = %self.id,
                orientation = ?self.aircraft.orientation,
                "AGENT_FLIP: 姿勢を反転しました"
            );
        }

        let ground = self.world().ground_elevation;
        let lookahead_y = self.position().y + v_uv.y * self.steering.radius_fov;
        let safe_d = self.steering.safe_distance;
        let safe_slope = self.steering.safe_slope;
        // 右向き飛行ではピッチを上げると機首が上がる
        let level_up = if v_uv.x > 0.0 { dt } else { -dt };

        if lookahead_y > ground - safe_d && v_uv.y >= -safe_slope {
            self.action = SteeringAction::Floor;
            self.adjust_pitch(level_up);
        } else if lookahead_y < safe_d && v_uv.y <= safe_slope {
            self.action = SteeringAction::Ceiling;
            self.adjust_pitch(-level_up);
        } else if let Some(target) = self.target {
            self.action = SteeringAction::Pursue;
            let delta = self.world().wrapped_delta(self.position(), target);
            self.steer_towards(dt, delta);
        } else {
            match self.frontier_direction() {
                Some((direction, action)) => {
                    self.action = action;
                    self.steer_towards(dt, direction);
                }
                None => self.action = SteeringAction::Idle,
            }
        }
    }

    /// 危険領域内で最も近いエンティティに対する回避方向（+1 / -1）
    fn evade_direction(&self, perceived: &[PerceivedEntity]) -> Option<f64> {
        let [zone_len, zone_half] = self.steering.evade_zone;
        let ground = self.world().ground_elevation;
        let rad = math_utils::deg_to_rad(-self.aircraft.pitch);
        let (sin, cos) = rad.sin_cos();
        let moving_right = self.aircraft.v_uv.x > 0.0;
        let moving_left = self.aircraft.v_uv.x < 0.0;

        let mut nearest = f64::INFINITY;
        let mut direction = None;

        for entity in perceived {
            if self
                .target
                .is_some_and(|t| (t - entity.position).length_squared() < SAME_POSITION_EPSILON_SQ)
            {
                continue;
            }

            let d = self.world().wrapped_delta(self.position(), entity.position);
            // 機体座標系（前方, 横方向）
            let forward = d.x * cos + d.y * sin;
            let lateral = -d.x * sin + d.y * cos;

            if !(0.0 < forward && forward < zone_len && forward < nearest) {
                continue;
            }

            let near_ground = entity.position.y > ground - 2.0 * zone_half;
            let near_ceiling = entity.position.y < 2.0 * zone_half;

            if 0.0 < lateral && lateral < zone_half {
                nearest = forward;
                direction = Some(if (near_ground && moving_left) || (near_ceiling && moving_right) {
                    -1.0
                } else {
                    1.0
                });
            } else if 0.0 < -lateral && -lateral < zone_half {
                nearest = forward;
                direction = Some(if (near_ground && moving_right) || (near_ceiling && moving_left) {
                    1.0
                } else {
                    -1.0
                });
            }
        }

        direction
    }

    /// 未探索領域が最も広がる方向（px単位の相対ベクトル）
    ///
    /// 全候補の新規セル数が0の場合は、地面より上の未探索セルの重心へ向かいます。
    /// 未探索セルが残っていなければ None。
    fn frontier_direction(&self) -> Option<(Vec2, SteeringAction)> {
        let position = self.position();
        let mut best = 0usize;
        let mut best_offset = None;

        for offset in &self.frontier_offsets {
            let gain = self.coverage.diff_overlap_circle(position, *offset);
            if gain > best {
                best = gain;
                best_offset = Some(*offset);
            }
        }

        match best_offset {
            Some(offset) => Some((offset * self.coverage.scale, SteeringAction::Explore)),
            None => {
                let centroid = self.coverage.unexplored_centroid(self.world().ground_elevation)?;
                Some((centroid - position, SteeringAction::ExploreTiebreak))
            }
        }
    }

    /// 相対ベクトル `direction` の方向へピッチを一定量だけ寄せる
    fn steer_towards(&mut self, dt: f64, direction: Vec2) {
        let diff = math_utils::angle_difference(
            math_utils::heading_deg(self.aircraft.v_uv),
            math_utils::heading_deg(direction),
        );
        if diff > 0.0 {
            self.adjust_pitch(dt);
        } else if diff < 0.0 {
            self.adjust_pitch(-dt);
        }
    }

    /// 割り当てターゲットが射界・射程内にあれば射撃
    fn try_autofire(&mut self) {
        let Some(target) = self.target else {
            return;
        };
        let delta = self.world().wrapped_delta(self.position(), target);
        if delta.length() > self.gun.range() {
            return;
        }
        let off_axis =
            math_utils::angle_difference(self.aircraft.pitch, math_utils::heading_deg(delta));
        if off_axis.abs() <= self.gun.fire_cone_deg {
            self.shoot();
        }
    }

    /// ピッチを `agility × dt` だけ変化させる（直接操作用）
    pub fn adjust_pitch(&mut self, dt: f64) {
        self.aircraft.adjust_pitch(dt);
    }

    /// 反転マニューバ（直接操作用）。反転した場合は true
    pub fn flip(&mut self) -> bool {
        self.aircraft.flip()
    }

    /// 現在のピッチ方向へ弾丸を発射
    ///
    /// # 戻り値
    ///
    /// 発射した場合は true。クールダウン中または非アクティブなら false
    pub fn shoot(&mut self) -> bool {
        if !self.is_active() || self.cooldown > 0.0 {
            return false;
        }

        self.shots_fired += 1;
        let projectile = Projectile::new(
            format!("{}_P{:04}", self.id, self.shots_fired),
            self.id.clone(),
            self.team,
            self.position(),
            self.aircraft.pitch,
            &self.gun,
            *self.world(),
        );
        debug!(
            agent_id = %self.id,
            projectile_id = %projectile.id,
            pitch = projectile.pitch,
            "PROJECTILE_FIRED: 弾丸を発射しました"
        );
        self.projectiles.push(projectile);
        self.cooldown = self.gun.cooldown;
        true
    }

    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    /// エージェントを撃破状態にする
    pub fn destroy(&mut self, status: AgentStatus) {
        self.status = status;
        self.clear_target();
    }

    /// 描画用のスナップショット
    pub fn snapshot(&self) -> AgentSnapshot {
        let aircraft = &self.aircraft;
        AgentSnapshot {
            id: self.id.clone(),
            team: self.team,
            position: aircraft.position_virtual,
            pitch: aircraft.pitch,
            velocity: self.get_velocity(),
            speed: aircraft.speed(),
            forces: aircraft.forces,
            aoa_deg: aircraft.aoa_deg,
            throttle: aircraft.throttle,
            target: self.target,
            orientation: aircraft.orientation,
            flipping: aircraft.is_flipping(),
            action: self.action,
            explored_cells: self.coverage.visited_count(),
        }
    }
}

impl IAgent for Agent {
    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

impl IMovable for Agent {
    fn get_position(&self) -> Vec2 {
        self.position()
    }

    fn get_velocity(&self) -> Vec2 {
        self.aircraft.velocity
    }
}

/// 第1象限の候補をx方向に反転し、さらに点対称に複製した56方向
fn frontier_offsets() -> Vec<Vec2> {
    let quadrant = FRONTIER_QUADRANT.iter().map(|[x, y]| Vec2::new(*x, *y));
    let half: Vec<Vec2> = quadrant
        .clone()
        .map(|v| Vec2::new(-v.x, v.y))
        .chain(quadrant)
        .collect();
    half.iter().map(|v| -*v).chain(half.iter().copied()).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::aircraft::tests::{test_archetype, test_world};
    use crate::models::common::PerceivedKind;

    pub(crate) fn test_steering() -> SteeringSpec {
        SteeringSpec {
            evade_zone: [150.0, 30.0],
            radius_fov: 150.0,
            safe_distance: 10.0,
            safe_slope: 0.2,
            flip_cone: 0.9,
        }
    }

    pub(crate) fn test_gun() -> ProjectileSpec {
        ProjectileSpec {
            speed: 400.0,
            lifetime: 0.66,
            size: 4.0,
            cooldown: 0.25,
            fire_cone_deg: 8.0,
            agent_hit_radius: 12.0,
        }
    }

    /// 速度方向に機首を向けたテスト用エージェント
    pub(crate) fn test_agent(position: Vec2, velocity: Vec2) -> Agent {
        let pitch = if velocity == Vec2::ZERO {
            0.0
        } else {
            math_utils::wrap_pitch(math_utils::heading_deg(velocity))
        };
        Agent::new(
            "A1".into(),
            0,
            test_world(),
            test_archetype(),
            InitialState {
                throttle: 100.0,
                pitch,
                velocity,
                position,
            },
            test_steering(),
            test_gun(),
            10.0,
        )
    }

    #[test]
    fn test_frontier_offsets_layout() {
        let offsets = frontier_offsets();
        assert_eq!(offsets.len(), 56);
        assert_eq!(offsets[0], Vec2::new(9.0, 0.0));
        assert_eq!(offsets[14], Vec2::new(-9.0, 0.0));
        assert_eq!(offsets[28], Vec2::new(-9.0, 0.0));
        assert_eq!(offsets[42], Vec2::new(9.0, 0.0));
        for v in &offsets {
            assert!((v.length() - 9.0).abs() < 1.0);
        }
    }

    #[test]
    fn test_entity_ahead_and_below_pitches_up() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        let threat = [PerceivedEntity::new(480.0, 310.0, PerceivedKind::Agent)];
        let before = agent.aircraft.pitch;
        agent.explore(0.1, &threat);
        assert_eq!(agent.action, SteeringAction::Evade);
        assert!((agent.aircraft.pitch - math_utils::wrap_pitch(before + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_entity_ahead_and_above_pitches_down() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        let threat = [PerceivedEntity::new(480.0, 290.0, PerceivedKind::Agent)];
        agent.explore(0.1, &threat);
        assert_eq!(agent.action, SteeringAction::Evade);
        assert!((agent.aircraft.pitch - 350.0).abs() < 1e-9);
    }

    #[test]
    fn test_evade_direction_near_ground_and_ceiling() {
        // (位置, 速度, エンティティ, 回避後のピッチ)
        // 危険領域: 前方150px, 左右30px。地面側の閾値 y > 590, 天井側の閾値 y < 60
        let cases = [
            // 右向き: 天井付近で下方のエンティティ → 機首下げ
            (Vec2::new(400.0, 20.0), Vec2::new(100.0, 0.0), Vec2::new(480.0, 45.0), 350.0),
            // 右向き: 地面付近で上方のエンティティ → 機首上げ
            (Vec2::new(400.0, 620.0), Vec2::new(100.0, 0.0), Vec2::new(480.0, 600.0), 10.0),
            // 左向き: 地面付近で上方のエンティティ → ピッチ減少（機首上げ）
            (Vec2::new(400.0, 620.0), Vec2::new(-100.0, 0.0), Vec2::new(320.0, 600.0), 170.0),
            // 左向き: 天井付近で下方のエンティティ → ピッチ増加（機首下げ）
            (Vec2::new(400.0, 20.0), Vec2::new(-100.0, 0.0), Vec2::new(320.0, 45.0), 190.0),
            // 左向き・中間高度では上方なら機首下げ、下方なら機首上げ
            (Vec2::new(400.0, 300.0), Vec2::new(-100.0, 0.0), Vec2::new(320.0, 290.0), 190.0),
            (Vec2::new(400.0, 300.0), Vec2::new(-100.0, 0.0), Vec2::new(320.0, 310.0), 170.0),
        ];

        for (position, velocity, entity, expected) in cases {
            let mut agent = test_agent(position, velocity);
            let threat = [PerceivedEntity::new(entity.x, entity.y, PerceivedKind::Agent)];
            agent.explore(0.1, &threat);
            assert_eq!(agent.action, SteeringAction::Evade, "{position:?} -> {entity:?}");
            assert!(
                (agent.aircraft.pitch - expected).abs() < 1e-9,
                "{position:?} -> {entity:?}: pitch {} expected {expected}",
                agent.aircraft.pitch
            );
        }
    }

    #[test]
    fn test_entity_behind_is_ignored() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        let behind = [PerceivedEntity::new(350.0, 305.0, PerceivedKind::Agent)];
        agent.explore(0.1, &behind);
        assert_ne!(agent.action, SteeringAction::Evade);
    }

    #[test]
    fn test_assigned_target_is_not_a_threat() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        agent.assign_target(0, Vec2::new(480.0, 310.0));
        let seen = [PerceivedEntity::new(480.0, 310.0, PerceivedKind::Target)];
        agent.explore(0.1, &seen);
        assert_eq!(agent.action, SteeringAction::Pursue);
        // ターゲットは下方なので機首を下げる
        assert!((agent.aircraft.pitch - 350.0).abs() < 1e-9);
    }

    #[test]
    fn test_floor_avoidance_pitches_up() {
        let mut agent = test_agent(Vec2::new(400.0, 630.0), Vec2::new(100.0, 10.0));
        agent.explore(0.1, &[]);
        assert_eq!(agent.action, SteeringAction::Floor);
        // 右向き飛行: ピッチ増加で機首上げ
        let expected = math_utils::wrap_pitch(math_utils::heading_deg(Vec2::new(100.0, 10.0)) + 10.0);
        assert!((agent.aircraft.pitch - expected).abs() < 1e-9);
    }

    #[test]
    fn test_ceiling_avoidance_pitches_down() {
        let mut agent = test_agent(Vec2::new(400.0, 20.0), Vec2::new(-100.0, -10.0));
        agent.explore(0.1, &[]);
        assert_eq!(agent.action, SteeringAction::Ceiling);
        // 左向き飛行ではピッチ増加が機首下げ
        let expected = math_utils::wrap_pitch(math_utils::heading_deg(Vec2::new(-100.0, -10.0)) + 10.0);
        assert!((agent.aircraft.pitch - expected).abs() < 1e-9);
    }

    #[test]
    fn test_flip_when_flying_against_lift_reference() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        agent.aircraft.velocity = Vec2::new(-100.0, 0.0);
        agent.aircraft.v_uv = Vec2::new(-1.0, 0.0);
        agent.aircraft.pitch = 180.0;
        assert_eq!(agent.aircraft.orientation, Orientation::Upright);
        agent.explore(0.01, &[]);
        assert_eq!(agent.aircraft.orientation, Orientation::Inverted);
        assert!(agent.aircraft.is_flipping());
    }

    #[test]
    fn test_unassigned_agent_explores() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        agent.update_history(&[]);
        agent.explore(0.01, &[]);
        assert_eq!(agent.action, SteeringAction::Explore);
    }

    #[test]
    fn test_explore_tiebreak_heads_to_unexplored_centroid() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        // x=950〜1130付近の帯だけ未探索で残す
        for x in (0..=800).step_by(10) {
            for y in (0..720).step_by(10) {
                agent.coverage.paint_fov(Vec2::new(x as f64, y as f64));
            }
        }
        let centroid = agent.coverage.unexplored_centroid(650.0).unwrap();
        assert!((centroid.x - 1040.0).abs() < 1e-9);
        assert!((centroid.y - 320.0).abs() < 1e-9);

        agent.explore(0.1, &[]);
        assert_eq!(agent.action, SteeringAction::ExploreTiebreak);
        // 重心はわずかに下方なので機首を下げる
        assert!((agent.aircraft.pitch - 350.0).abs() < 1e-9);
    }

    #[test]
    fn test_explore_idle_when_everything_explored() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        for x in (0..1280).step_by(10) {
            for y in (0..720).step_by(10) {
                agent.coverage.paint_fov(Vec2::new(x as f64, y as f64));
            }
        }
        assert!(agent.coverage.unexplored_centroid(650.0).is_none());
        agent.explore(0.01, &[]);
        assert_eq!(agent.action, SteeringAction::Idle);
    }

    #[test]
    fn test_update_history_marks_perceived_layers() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        let seen = [
            PerceivedEntity::new(455.0, 305.0, PerceivedKind::Target),
            PerceivedEntity::new(350.0, 250.0, PerceivedKind::Agent),
        ];
        agent.update_history(&seen);
        assert_eq!(agent.coverage.target_at(45, 30), 1.0);
        assert_eq!(agent.coverage.target_at(35, 25), 2.0);
        assert!(agent.coverage.visited_at(40, 30) > 0.0);
    }

    #[test]
    fn test_shoot_respects_cooldown() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        assert!(agent.shoot());
        assert!(!agent.shoot());
        assert_eq!(agent.projectiles.len(), 1);
        assert_eq!(agent.projectiles[0].owner_id, "A1");

        for _ in 0..20 {
            agent.tick(1.0 / 60.0, &[]);
        }
        assert!(agent.shoot());
        assert_eq!(agent.shots_fired(), 2);
    }

    #[test]
    fn test_autofire_when_target_in_cone() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        agent.assign_target(0, Vec2::new(550.0, 300.0));
        agent.tick(1.0 / 60.0, &[]);
        assert_eq!(agent.projectiles.len(), 1);

        let mut out_of_range = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        out_of_range.assign_target(0, Vec2::new(900.0, 300.0));
        out_of_range.tick(1.0 / 60.0, &[]);
        assert!(out_of_range.projectiles.is_empty());
    }

    #[test]
    fn test_destroyed_agent_does_not_tick() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        agent.assign_target(0, Vec2::new(500.0, 300.0));
        agent.destroy(AgentStatus::Crashed);
        let before = agent.position();
        agent.tick(0.1, &[]);
        assert_eq!(agent.position(), before);
        assert!(agent.target.is_none());
        assert!(!agent.shoot());
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut agent = test_agent(Vec2::new(400.0, 300.0), Vec2::new(100.0, 0.0));
        agent.assign_target(2, Vec2::new(700.0, 200.0));
        agent.tick(1.0 / 60.0, &[]);
        let snap = agent.snapshot();
        assert_eq!(snap.id, "A1");
        assert_eq!(snap.target, Some(Vec2::new(700.0, 200.0)));
        assert_eq!(snap.position, agent.position());
        assert_eq!(snap.action, SteeringAction::Pursue);
        assert_eq!(snap.velocity, agent.aircraft.velocity);
        assert!((snap.speed - agent.aircraft.velocity.length()).abs() < 1e-12);
        // 1ティック分の視界円が探索済みになっている
        assert_eq!(snap.explored_cells, agent.coverage.visited_count());
        assert!(snap.explored_cells > 600);
    }
}
