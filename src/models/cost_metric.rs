use serde::{Deserialize, Serialize};

use crate::models::{
    agent::Agent,
    common::{math_utils, Vec2, WorldGeometry},
    traits::ICostMetric,
};

/// コスト評価方式の選択（シナリオ設定用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostMetricKind {
    /// 折り返しを考慮した直線距離
    StraightLine,
    /// 2ホップ経路距離
    TwoHop,
    /// エネルギー近似
    Energy,
}

impl CostMetricKind {
    pub fn build(&self) -> Box<dyn ICostMetric> {
        match self {
            CostMetricKind::StraightLine => Box::new(StraightLineDistance),
            CostMetricKind::TwoHop => Box::new(TwoHopPathDistance),
            CostMetricKind::Energy => Box::new(EnergyCost),
        }
    }
}

/// 折り返しを考慮した直線距離
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineDistance;

impl ICostMetric for StraightLineDistance {
    fn name(&self) -> &'static str {
        "straight_line"
    }

    fn cost(&self, agent: &Agent, target_index: usize, targets: &[Vec2], world: &WorldGeometry) -> f64 {
        world.wrapped_distance(agent.position(), targets[target_index])
    }
}

/// 2ホップ経路距離
///
/// エージェント → T → (Tに最も近い別ターゲット) の距離の和。
/// ターゲットが1つしかない場合は直線距離と同じです。
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoHopPathDistance;

impl ICostMetric for TwoHopPathDistance {
    fn name(&self) -> &'static str {
        "two_hop"
    }

    fn cost(&self, agent: &Agent, target_index: usize, targets: &[Vec2], world: &WorldGeometry) -> f64 {
        let target = targets[target_index];
        let first_hop = world.wrapped_distance(agent.position(), target);

        let second_hop = targets
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != target_index)
            .map(|(_, other)| world.wrapped_distance(target, *other))
            .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.min(d))));

        first_hop + second_hop.unwrap_or(0.0)
    }
}

/// エネルギー近似コスト
///
/// 次の3項の和を、水平オフセット {-W, 0, +W} について評価した最小値です。
///
/// - 位置エネルギー: `m g Δh`（上昇で正）
/// - 速度の向き変更に要する運動エネルギー: `m/2 |v² - v_req²|`（成分ごとの二乗）
/// - 抗力による損失: `|F_drag| × 経路長`
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyCost;

impl ICostMetric for EnergyCost {
    fn name(&self) -> &'static str {
        "energy"
    }

    fn cost(&self, agent: &Agent, target_index: usize, targets: &[Vec2], world: &WorldGeometry) -> f64 {
        let aircraft = &agent.aircraft;
        let mass = aircraft.params.mass;
        let velocity = aircraft.velocity;
        let speed = aircraft.speed();
        let drag = aircraft.forces.drag.length();
        let offset = Vec2::new(world.width, 0.0);

        [-1.0, 0.0, 1.0]
            .iter()
            .map(|&i| {
                let relative = targets[target_index] - agent.position() + i * offset;

                let height_energy = mass * world.gravity * -relative.y;

                // 直線経路上の必要速度（大きさは現在の速さ）
                let required = math_utils::unit_or(relative, aircraft.v_uv) * speed;
                let rotational_energy =
                    mass / 2.0 * (velocity * velocity - required * required).length();

                let drag_energy = drag * relative.length();

                height_energy + rotational_energy + drag_energy
            })
            .fold(f64::INFINITY, f64::min)
    }
}
