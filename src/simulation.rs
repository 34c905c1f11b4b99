//! # Simulation モジュール
//!
//! ドッグファイトシミュレーションの中核となるシミュレーションエンジンを提供します。
//!
//! 固定時間刻み（Δt）のループで全チーム・全エージェントを1世代ずつ進め、
//! 弾丸・エージェント・ターゲットの衝突を解決します。
//! 乱数はシナリオのシード値から作る `ChaCha8Rng` のみを使うため、
//! 同じシナリオからは常に同じ結果が得られます。
//!
//! ## シミュレーション処理順序
//!
//! 各時間刻みにおいて、以下の順序で処理が実行されます：
//!
//! 1. **割り当て**: 各チームがターゲットを最初から割り当て直す
//! 2. **知覚**: 全エージェントの視界内エンティティをティック開始時点の状態で計算
//! 3. **エージェント処理**: 操縦、射撃、飛行力学の積分
//! 4. **衝突処理**: 弾丸の移動と命中判定、エージェント同士、地面（マーク＆スイープ）
//! 5. **終了判定**: 時間切れ、全滅、ターゲット消滅
//!
//! 衝突処理では削除対象を集合に集めてから最後にまとめて適用するため、
//! 走査順による偏りは生じません。
//!
//! ## 使用例
//!
//! ```no_run
//! use dogsim::scenario::ScenarioConfig;
//! use dogsim::simulation::SimulationEngine;
//!
//! let config = ScenarioConfig::from_file("scenarios/basic_dogfight.yaml")?;
//! let mut engine = SimulationEngine::new(config, 1);
//! engine.initialize()?;
//! let summary = engine.run()?;
//! summary.print();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::assignment::AssignmentError;
use crate::models::*;
use crate::scenario::{ScenarioConfig, ScenarioError};

/// シミュレーションエラー
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("割り当てエラー: {0}")]
    Assignment(#[from] AssignmentError),

    #[error("チーム構築エラー: {0}")]
    Team(#[from] TeamError),

    #[error("チーム{team}のターゲットを配置できません: {placed}/{requested}")]
    TargetPlacement {
        team: usize,
        placed: usize,
        requested: usize,
    },
}

/// シミュレーション終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    /// 最大時間に到達
    TimeLimit,
    /// チームのエージェントが全滅
    TeamEliminated { team: usize },
    /// チームのターゲットが残っていない
    TargetsExhausted { team: usize },
}

/// チームごとの結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub team_number: usize,
    /// 撃破したターゲット数
    pub score: usize,
    pub agents_remaining: usize,
    pub targets_remaining: usize,
}

/// 実行結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub sim_time: f64,
    pub teams: Vec<TeamSummary>,
    pub end_reason: EndReason,
}

impl RunSummary {
    pub fn print(&self) {
        println!("=== シミュレーション結果 ===");
        println!("終了理由: {:?}", self.end_reason);
        println!("実行時間: {:.2}秒 ({}ステップ)", self.sim_time, self.ticks);
        for team in &self.teams {
            println!(
                "  チーム{}: スコア {} (残存機: {}, 残存ターゲット: {})",
                team.team_number, team.score, team.agents_remaining, team.targets_remaining
            );
        }
    }
}

/// 衝突処理で集める削除対象
#[derive(Debug, Default)]
struct Removals {
    /// (チームスロット, エージェントインデックス) → 状態
    agents: Vec<((usize, usize), AgentStatus)>,
    /// (チームスロット, ターゲットインデックス)
    targets: BTreeSet<(usize, usize)>,
}

impl Removals {
    fn agent_marked(&self, key: (usize, usize)) -> bool {
        self.agents.iter().any(|(k, _)| *k == key)
    }

    fn mark_agent(&mut self, key: (usize, usize), status: AgentStatus) {
        if !self.agent_marked(key) {
            self.agents.push((key, status));
        }
    }
}

/// 衝突判定用のエージェント情報（ティック内で不変）
struct AgentProbe {
    key: (usize, usize),
    id: String,
    position: Vec2,
}

pub struct SimulationEngine {
    pub current_time: f64,
    pub dt: f64,
    pub max_time: f64,
    pub seed: u64,
    pub step_count: u64,

    pub world: WorldGeometry,
    pub teams: Vec<Team>,
    pub end_reason: Option<EndReason>,

    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
}

impl SimulationEngine {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        Self {
            current_time: 0.0,
            dt: scenario.sim.dt_s,
            max_time: scenario.sim.t_max_s,
            seed: scenario.sim.seed,
            step_count: 0,
            world: scenario.world_geometry(),
            teams: Vec::new(),
            end_reason: None,
            scenario_config: scenario,
            verbose_level,
        }
    }

    /// チームとターゲットを生成
    ///
    /// 検証に失敗した場合は何も生成しません。
    pub fn initialize(&mut self) -> Result<(), SimulationError> {
        self.scenario_config.validate()?;

        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
        }

        let config = &self.scenario_config;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut all_targets: Vec<Target> = Vec::new();
        let mut teams = Vec::with_capacity(config.teams.len());

        for team_config in &config.teams {
            let targets = place_targets(
                &mut rng,
                &self.world,
                &config.targets,
                &format!("T{}", team_config.team_number),
                &all_targets,
            )
            .map_err(|placed| SimulationError::TargetPlacement {
                team: team_config.team_number,
                placed,
                requested: config.targets.count,
            })?;
            all_targets.extend(targets.iter().cloned());

            let template = AgentTemplate {
                world: self.world,
                archetype: *config.archetype(&team_config.archetype)?,
                steering: config.steering,
                gun: config.projectile,
                history_scale: config.world.history_scale,
            };
            let team = Team::spawn(
                team_config.team_number,
                team_config.agents,
                &template,
                targets,
                team_config.cost_metric.build(),
            )?;

            if self.verbose_level > 1 {
                debug!(
                    team = team.index,
                    agents = team.agents.len(),
                    targets = team.targets.len(),
                    metric = team.cost_metric.name(),
                    "チーム初期化"
                );
            }
            teams.push(team);
        }

        self.teams = teams;
        self.current_time = 0.0;
        self.step_count = 0;
        self.end_reason = None;

        if self.verbose_level > 0 {
            info!("初期化完了:");
            for team in &self.teams {
                info!(
                    "  チーム{}: {}機, ターゲット{}個 ({})",
                    team.index,
                    team.agents.len(),
                    team.targets.len(),
                    team.cost_metric.name()
                );
            }
        }

        Ok(())
    }

    /// 終了条件を満たすまで実行
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        info!(
            scenario = %self.scenario_config.meta.name,
            seed = self.seed,
            "=== シミュレーション実行開始 ==="
        );

        while self.end_reason.is_none() {
            self.step()?;

            if !self.scenario_config.sim.headless
                && self.verbose_level > 0
                && self.step_count % 60 == 0
            {
                let progress = (self.current_time / self.max_time) * 100.0;
                info!(
                    "進行状況: {:.1}% ({:.1}/{:.1}秒)",
                    progress, self.current_time, self.max_time
                );
            }
        }

        let summary = self.summary();
        info!(
            ticks = summary.ticks,
            sim_time = summary.sim_time,
            end_reason = ?summary.end_reason,
            "=== シミュレーション完了 ==="
        );
        Ok(summary)
    }

    /// 1ティック進める
    pub fn step(&mut self) -> Result<(), SimulationError> {
        if self.end_reason.is_some() {
            return Ok(());
        }

        for team in &mut self.teams {
            team.assign_targets()?;
        }

        let perception = self.compute_perception();
        for (team, team_perception) in self.teams.iter_mut().zip(&perception) {
            for (agent, perceived) in team.agents.iter_mut().zip(team_perception) {
                agent.tick(self.dt, perceived);
            }
        }

        self.resolve_collisions();

        self.current_time += self.dt;
        self.step_count += 1;

        if self.verbose_level > 2 {
            trace!("時刻: {:.3}秒 (ステップ: {})", self.current_time, self.step_count);
        }

        self.end_reason = self.check_termination();
        Ok(())
    }

    /// 全エージェントの視界内エンティティ
    ///
    /// 自チームのターゲットと、自分以外の生存エージェントのうち
    /// 視界半径内（折り返し距離）にあるものを返します。
    fn compute_perception(&self) -> Vec<Vec<Vec<PerceivedEntity>>> {
        let live: Vec<(&str, Vec2)> = self
            .teams
            .iter()
            .flat_map(|t| t.agents.iter())
            .filter(|a| a.is_active())
            .map(|a| (a.id.as_str(), a.get_position()))
            .collect();

        self.teams
            .iter()
            .map(|team| {
                team.agents
                    .iter()
                    .map(|agent| {
                        if !agent.is_active() {
                            return Vec::new();
                        }
                        let origin = agent.get_position();
                        let radius = agent.steering.radius_fov;
                        let targets = team
                            .targets
                            .iter()
                            .filter(|t| self.world.wrapped_distance(origin, t.position) <= radius)
                            .map(|t| {
                                PerceivedEntity::new(t.position.x, t.position.y, PerceivedKind::Target)
                            });
                        let agents = live
                            .iter()
                            .filter(|(id, p)| {
                                *id != agent.id && self.world.wrapped_distance(origin, *p) <= radius
                            })
                            .map(|(_, p)| PerceivedEntity::new(p.x, p.y, PerceivedKind::Agent));
                        targets.chain(agents).collect()
                    })
                    .collect()
            })
            .collect()
    }

    /// 衝突処理（マーク＆スイープ）
    fn resolve_collisions(&mut self) {
        let world = self.world;
        let dt = self.dt;
        let agent_distance = self.scenario_config.collision.agent_distance;
        let mut removals = Removals::default();

        let probes: Vec<AgentProbe> = self
            .teams
            .iter()
            .enumerate()
            .flat_map(|(slot, team)| {
                team.agents
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.is_active())
                    .map(move |(i, a)| AgentProbe {
                        key: (slot, i),
                        id: a.get_id(),
                        position: a.get_position(),
                    })
            })
            .collect();

        // ターゲットの当たり判定矩形（チームスロットごと）
        let target_bounds: Vec<Vec<BoundingBox>> = self
            .teams
            .iter()
            .map(|t| t.targets.iter().map(|target| target.bounds()).collect())
            .collect();
        let slot_of = |team_number: usize| self.teams.iter().position(|t| t.index == team_number);
        let owner_slots: Vec<Vec<Option<usize>>> = self
            .teams
            .iter()
            .map(|t| {
                t.agents
                    .iter()
                    .map(|a| slot_of(a.team))
                    .collect()
            })
            .collect();

        let mut hits_per_slot = vec![0usize; self.teams.len()];

        // 弾丸
        for (slot, team) in self.teams.iter_mut().enumerate() {
            for (ai, agent) in team.agents.iter_mut().enumerate() {
                let owner_slot = owner_slots[slot][ai];
                for projectile in agent.projectiles.iter_mut() {
                    if !projectile.is_active() || projectile.advance(dt) {
                        continue;
                    }

                    let victim = probes.iter().find(|p| {
                        p.id != projectile.owner_id
                            && !removals.agent_marked(p.key)
                            && world.wrapped_distance(projectile.position, p.position)
                                < agent.gun.agent_hit_radius
                    });
                    if let Some(victim) = victim {
                        projectile.destroy();
                        removals.mark_agent(victim.key, AgentStatus::Destroyed);
                        info!(
                            projectile_id = %projectile.id,
                            shooter_id = %projectile.owner_id,
                            victim_id = %victim.id,
                            "AGENT_SHOT_DOWN: エージェントを撃墜しました"
                        );
                        continue;
                    }

                    let Some(target_slot) = owner_slot else {
                        continue;
                    };
                    let bounds = projectile.bounds();
                    let hit = target_bounds[target_slot]
                        .iter()
                        .enumerate()
                        .find(|(ti, b)| {
                            !removals.targets.contains(&(target_slot, *ti)) && b.overlaps(&bounds)
                        })
                        .map(|(ti, _)| ti);
                    if let Some(ti) = hit {
                        projectile.destroy();
                        removals.targets.insert((target_slot, ti));
                        hits_per_slot[target_slot] += 1;
                        info!(
                            projectile_id = %projectile.id,
                            shooter_id = %projectile.owner_id,
                            target_index = ti,
                            "TARGET_DESTROYED: ターゲットを破壊しました"
                        );
                    }
                }
            }
        }

        // エージェント同士
        for (i, a) in probes.iter().enumerate() {
            for b in &probes[i + 1..] {
                if world.wrapped_distance(a.position, b.position) < agent_distance {
                    removals.mark_agent(a.key, AgentStatus::Destroyed);
                    removals.mark_agent(b.key, AgentStatus::Destroyed);
                    info!(
                        agent_a = %a.id,
                        agent_b = %b.id,
                        "AGENT_COLLISION: エージェント同士が衝突しました"
                    );
                }
            }
        }

        // 地面
        for probe in &probes {
            let (slot, i) = probe.key;
            let agent = &self.teams[slot].agents[i];
            if agent.aircraft.bottom() >= world.ground_elevation {
                removals.mark_agent(probe.key, AgentStatus::Crashed);
                info!(
                    agent_id = %probe.id,
                    x = probe.position.x,
                    "AGENT_CRASHED: 地面に墜落しました"
                );
            }
        }

        // スイープ
        for ((slot, i), status) in removals.agents {
            self.teams[slot].agents[i].destroy(status);
        }
        for &(slot, ti) in removals.targets.iter().rev() {
            self.teams[slot].targets.remove(ti);
        }
        for (slot, hits) in hits_per_slot.into_iter().enumerate() {
            self.teams[slot].targets_destroyed += hits;
        }
        for team in &mut self.teams {
            for agent in &mut team.agents {
                agent.projectiles.retain(|p| p.is_active());
            }
        }
    }

    fn check_termination(&self) -> Option<EndReason> {
        for team in &self.teams {
            if team.active_agents() == 0 {
                return Some(EndReason::TeamEliminated { team: team.index });
            }
        }
        for team in &self.teams {
            if team.targets.is_empty() {
                return Some(EndReason::TargetsExhausted { team: team.index });
            }
        }
        // 浮動小数点の累積誤差で1ステップ余分に進まないよう半ステップの余裕を持たせる
        if self.current_time >= self.max_time - self.dt * 0.5 {
            return Some(EndReason::TimeLimit);
        }
        None
    }

    /// 現在の結果
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.step_count,
            sim_time: self.current_time,
            teams: self
                .teams
                .iter()
                .map(|t| TeamSummary {
                    team_number: t.index,
                    score: t.targets_destroyed,
                    agents_remaining: t.active_agents(),
                    targets_remaining: t.targets.len(),
                })
                .collect(),
            end_reason: self.end_reason.unwrap_or(EndReason::TimeLimit),
        }
    }

    /// 描画用の全エージェントのスナップショット（生存機のみ）
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.teams
            .iter()
            .flat_map(|t| t.agents.iter())
            .filter(|a| a.is_active())
            .map(|a| a.snapshot())
            .collect()
    }
}
