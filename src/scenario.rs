use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{
    AircraftArchetype, CostMetricKind, ProjectileSpec, SteeringSpec, TargetSpec, WorldGeometry,
};
use crate::models::team::{spawn_layout, SUPPORTED_TEAMS};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub t_max_s: f64,
    pub seed: u64,
    /// 描画なしのバッチ実行（結果には影響しない）
    pub headless: bool,
}

/// 世界設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    /// 地面衝突面の高さ（画面上端からの距離、px）
    pub ground_elevation: f64,
    pub gravity: f64,
    /// カバレッジマップのセル寸法（px）
    pub history_scale: f64,
}

/// 衝突判定設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollisionConfig {
    /// エージェント同士の衝突距離（px）
    pub agent_distance: f64,
}

/// チーム設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TeamConfig {
    /// 0: 左から出撃, 1: 右から出撃
    pub team_number: usize,
    pub agents: usize,
    /// `aircraft` セクションのキー
    pub archetype: String,
    pub cost_metric: CostMetricKind,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub world: WorldConfig,
    pub aircraft: BTreeMap<String, AircraftArchetype>,
    pub steering: SteeringSpec,
    pub projectile: ProjectileSpec,
    pub targets: TargetSpec,
    pub collision: CollisionConfig,
    pub teams: Vec<TeamConfig>,
}

impl Default for ScenarioConfig {
    /// 組み込みシナリオ: 1280×720 の世界で 3対3、各チーム8ターゲット
    fn default() -> Self {
        let mut aircraft = BTreeMap::new();
        aircraft.insert(
            "trainer".to_string(),
            AircraftArchetype {
                mass: 12.0,
                engine_force: 120.0,
                agility: 100.0,
                c_drag: 0.002,
                c_lift: 0.02,
                aoa_crit_low: (-15.0, -0.95),
                aoa_crit_high: (19.0, 1.4),
                cl0: 0.16,
                cd_min: 0.25,
                stall_torque: 0.01,
                flip_duration: 0.5,
                init_throttle: 100.0,
                init_v: [100.0, 0.0],
                size: [24.0, 13.0],
            },
        );

        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "builtin_dogfight".to_string(),
                description: "組み込みシナリオ（3対3、各チーム8ターゲット）".to_string(),
            },
            sim: SimulationConfig {
                dt_s: 1.0 / 60.0,
                t_max_s: 120.0,
                seed: 42,
                headless: true,
            },
            world: WorldConfig {
                width: 1280.0,
                height: 720.0,
                ground_elevation: 650.0,
                gravity: 9.81,
                history_scale: 10.0,
            },
            aircraft,
            steering: SteeringSpec {
                evade_zone: [150.0, 30.0],
                radius_fov: 150.0,
                safe_distance: 10.0,
                safe_slope: 0.2,
                flip_cone: 0.9,
            },
            projectile: ProjectileSpec {
                speed: 400.0,
                lifetime: 0.66,
                size: 4.0,
                cooldown: 0.25,
                fire_cone_deg: 8.0,
                agent_hit_radius: 12.0,
            },
            targets: TargetSpec {
                count: 8,
                size: 20.0,
                top_margin: 10.0,
                max_placement_attempts: 1000,
            },
            collision: CollisionConfig {
                agent_distance: 15.0,
            },
            teams: vec![
                TeamConfig {
                    team_number: 0,
                    agents: 3,
                    archetype: "trainer".to_string(),
                    cost_metric: CostMetricKind::StraightLine,
                },
                TeamConfig {
                    team_number: 1,
                    agents: 3,
                    archetype: "trainer".to_string(),
                    cost_metric: CostMetricKind::Energy,
                },
            ],
        }
    }
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: ScenarioConfig =
            serde_yaml::from_str(&contents).map_err(|source| ScenarioError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig =
            serde_yaml::from_str(contents).map_err(|source| ScenarioError::Parse {
                path: PathBuf::from("<string>"),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let fail = |msg: String| Err(ScenarioError::Validation(msg));

        // 時間設定
        if !(self.sim.dt_s > 0.0) {
            return fail("dt_s must be positive".to_string());
        }
        if !(self.sim.t_max_s > 0.0) {
            return fail("t_max_s must be positive".to_string());
        }

        // 世界設定
        let w = &self.world;
        if !(w.width > 0.0 && w.height > 0.0) {
            return fail("world width/height must be positive".to_string());
        }
        if !(w.ground_elevation > 0.0 && w.ground_elevation <= w.height) {
            return fail(format!(
                "ground_elevation {} outside world height {}",
                w.ground_elevation, w.height
            ));
        }
        if !(w.history_scale > 0.0 && w.history_scale <= w.width.min(w.height)) {
            return fail("history_scale must be positive and fit inside the world".to_string());
        }

        // 機体アーキタイプ
        for (name, a) in &self.aircraft {
            if !(a.mass > 0.0) {
                return fail(format!("aircraft '{}': mass must be positive", name));
            }
            if !(0.0..=100.0).contains(&a.init_throttle) {
                return fail(format!("aircraft '{}': init_throttle outside [0, 100]", name));
            }
            if !(a.aoa_crit_low.0 < 0.0 && 0.0 < a.aoa_crit_high.0) {
                return fail(format!(
                    "aircraft '{}': critical AoA must satisfy low < 0 < high",
                    name
                ));
            }
            if !(a.agility > 0.0 && a.flip_duration >= 0.0) {
                return fail(format!("aircraft '{}': invalid agility/flip_duration", name));
            }
        }

        // 操縦・弾丸・ターゲット
        if !(self.steering.radius_fov > 0.0) {
            return fail("steering.radius_fov must be positive".to_string());
        }
        if !(self.projectile.speed > 0.0 && self.projectile.lifetime > 0.0) {
            return fail("projectile speed/lifetime must be positive".to_string());
        }
        let t = &self.targets;
        if !(t.size > 0.0
            && t.size * 2.0 < w.width
            && t.top_margin >= 0.0
            && t.top_margin <= w.ground_elevation - t.size)
        {
            return fail("targets do not fit between top_margin and ground".to_string());
        }
        if t.count > 0 && t.max_placement_attempts == 0 {
            return fail("targets.max_placement_attempts must be positive".to_string());
        }

        // チーム構成
        if self.teams.is_empty() {
            return fail("at least one team is required".to_string());
        }
        let mut seen = [false; SUPPORTED_TEAMS];
        for team in &self.teams {
            if team.team_number >= SUPPORTED_TEAMS {
                return fail(format!(
                    "team_number {} not supported (only 0 and 1)",
                    team.team_number
                ));
            }
            if seen[team.team_number] {
                return fail(format!("team_number {} declared twice", team.team_number));
            }
            seen[team.team_number] = true;
            if team.agents == 0 {
                return fail(format!("team {} has no agents", team.team_number));
            }
            let Some(archetype) = self.aircraft.get(&team.archetype) else {
                return fail(format!(
                    "team {}: unknown archetype '{}'",
                    team.team_number, team.archetype
                ));
            };
            let world = self.world_geometry();
            let spawns = spawn_layout(team.team_number, team.agents, &world, archetype)
                .map_err(|e| ScenarioError::Validation(e.to_string()))?;
            if spawns
                .iter()
                .any(|s| s.position.y + archetype.size[1] / 2.0 >= world.ground_elevation)
            {
                return fail(format!("team {}: agents spawn below ground", team.team_number));
            }
        }

        Ok(())
    }

    /// 世界の幾何設定
    pub fn world_geometry(&self) -> WorldGeometry {
        WorldGeometry::new(
            self.world.width,
            self.world.height,
            self.world.ground_elevation,
            self.world.gravity,
        )
    }

    /// 名前から機体アーキタイプを取得
    pub fn archetype(&self, name: &str) -> Result<&AircraftArchetype, ScenarioError> {
        self.aircraft
            .get(name)
            .ok_or_else(|| ScenarioError::Validation(format!("unknown archetype '{}'", name)))
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.4}秒", self.sim.dt_s);
        println!("最大時間: {:.1}秒", self.sim.t_max_s);
        println!("シード値: {}", self.sim.seed);
        println!("ヘッドレス: {}", if self.sim.headless { "有効" } else { "無効" });
        println!();

        println!("=== 世界 ===");
        println!(
            "寸法: {:.0}×{:.0}px (地面: {:.0}px, 重力: {:.2})",
            self.world.width, self.world.height, self.world.ground_elevation, self.world.gravity
        );
        println!("カバレッジセル: {:.0}px", self.world.history_scale);
        println!();

        println!("=== チーム ===");
        for team in &self.teams {
            println!(
                "  チーム{}: {}機 (機種: {}, コスト評価: {:?})",
                team.team_number, team.agents, team.archetype, team.cost_metric
            );
        }
        println!("ターゲット: 各チーム{}個", self.targets.count);
    }
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML解析エラー {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("設定検証エラー: {0}")]
    Validation(String),
}
