use thiserror::Error;
use tracing::debug;

use crate::assignment::{self, AssignmentError};
use crate::models::{
    agent::{Agent, SteeringSpec},
    aircraft::{AircraftArchetype, InitialState},
    common::{Vec2, WorldGeometry},
    projectile::ProjectileSpec,
    target::Target,
    traits::{IAgent, ICostMetric},
};

/// サポートするチーム数
pub const SUPPORTED_TEAMS: usize = 2;

/// チーム構築エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TeamError {
    #[error("チーム番号 {0} は未対応です（0 または 1 のみ）")]
    UnsupportedTeamNumber(usize),

    #[error("チーム {0} のエージェント数が0です")]
    NoAgents(usize),
}

/// エージェント生成に共通するパラメータ
#[derive(Debug, Clone, Copy)]
pub struct AgentTemplate {
    pub world: WorldGeometry,
    pub archetype: AircraftArchetype,
    pub steering: SteeringSpec,
    pub gun: ProjectileSpec,
    pub history_scale: f64,
}

/// チームの初期配置
///
/// チーム0は左端（x=0）から右向き、チーム1は右端（x=W-1）から左向きに出撃します。
/// 両端は折り返しで隣接するため、チーム1の高さは間隔の1/4だけ上にずらします。
///
/// - チーム0: `y = H/n·(i + 1/2)`
/// - チーム1: `y = H/n·(i + 1/4)`
pub fn spawn_layout(
    team_number: usize,
    count: usize,
    world: &WorldGeometry,
    archetype: &AircraftArchetype,
) -> Result<Vec<InitialState>, TeamError> {
    if team_number >= SUPPORTED_TEAMS {
        return Err(TeamError::UnsupportedTeamNumber(team_number));
    }
    if count == 0 {
        return Err(TeamError::NoAgents(team_number));
    }

    let init_v = Vec2::from(archetype.init_v);
    let (x, pitch, velocity, row_offset) = if team_number == 0 {
        (0.0, 0.0, init_v, 0.5)
    } else {
        (world.width - 1.0, 180.0, -init_v, 0.25)
    };
    let spacing = world.height / count as f64;

    Ok((0..count)
        .map(|i| InitialState {
            throttle: archetype.init_throttle,
            pitch,
            velocity,
            position: Vec2::new(x, spacing * (i as f64 + row_offset)),
        })
        .collect())
}

/// チーム
///
/// エージェントとターゲットを所有し、毎ティックの割り当てを行います。
/// 割り当ては前回の結果を引き継がず、毎回最初から計算し直します。
#[derive(Debug)]
pub struct Team {
    pub index: usize,
    pub agents: Vec<Agent>,
    pub targets: Vec<Target>,
    pub cost_metric: Box<dyn ICostMetric>,
    /// 撃破したターゲット数（スコア）
    pub targets_destroyed: usize,
}

impl Team {
    pub fn new(
        index: usize,
        agents: Vec<Agent>,
        targets: Vec<Target>,
        cost_metric: Box<dyn ICostMetric>,
    ) -> Result<Self, TeamError> {
        if index >= SUPPORTED_TEAMS {
            return Err(TeamError::UnsupportedTeamNumber(index));
        }
        Ok(Self {
            index,
            agents,
            targets,
            cost_metric,
            targets_destroyed: 0,
        })
    }

    /// テンプレートからエージェントを生成してチームを構築
    ///
    /// # 引数
    ///
    /// * `team_number` - チーム番号（0: 左から出撃, 1: 右から出撃）
    /// * `count` - エージェント数
    /// * `template` - エージェント生成パラメータ
    /// * `targets` - このチームのターゲット
    /// * `cost_metric` - 割り当てに使うコスト評価方式
    pub fn spawn(
        team_number: usize,
        count: usize,
        template: &AgentTemplate,
        targets: Vec<Target>,
        cost_metric: Box<dyn ICostMetric>,
    ) -> Result<Self, TeamError> {
        let agents = spawn_layout(team_number, count, &template.world, &template.archetype)?
            .into_iter()
            .enumerate()
            .map(|(i, initial)| {
                Agent::new(
                    format!("T{}_A{:02}", team_number, i + 1),
                    team_number,
                    template.world,
                    template.archetype,
                    initial,
                    template.steering,
                    template.gun,
                    template.history_scale,
                )
            })
            .collect();

        Self::new(team_number, agents, targets, cost_metric)
    }

    /// 全エージェントへのターゲット割り当て
    ///
    /// 全ての割り当てを解除してから、ティック開始時点のターゲット座標の
    /// スナップショットに対してコスト行列を作り、最小コストの割り当てを求めます。
    /// ターゲットが0個の場合はソルバーを呼ばずに終了します。
    /// 撃破済みのエージェントは割り当て対象外です。
    pub fn assign_targets(&mut self) -> Result<(), AssignmentError> {
        for agent in &mut self.agents {
            agent.clear_target();
        }

        if self.targets.is_empty() {
            return Ok(());
        }

        let snapshot: Vec<Vec2> = self.targets.iter().map(|t| t.position).collect();
        let active: Vec<usize> = (0..self.agents.len())
            .filter(|&i| self.agents[i].is_active())
            .collect();
        if active.is_empty() {
            return Ok(());
        }

        let world = *self.agents[active[0]].world();
        let cost: Vec<Vec<f64>> = active
            .iter()
            .map(|&i| {
                (0..snapshot.len())
                    .map(|j| self.cost_metric.cost(&self.agents[i], j, &snapshot, &world))
                    .collect()
            })
            .collect();

        let pairs = assignment::solve(&cost)?;
        for (row, col) in pairs {
            let agent = &mut self.agents[active[row]];
            agent.assign_target(col, snapshot[col]);
            debug!(
                team = self.index,
                agent_id = %agent.id,
                target_id = %self.targets[col].id,
                cost = cost[row][col],
                metric = self.cost_metric.name(),
                "TARGET_ASSIGNED"
            );
        }

        Ok(())
    }

    pub fn active_agents(&self) -> usize {
        self.agents.iter().filter(|a| a.is_active()).count()
    }
}
