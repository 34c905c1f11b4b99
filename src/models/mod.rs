// 基本的なデータ型と数学ユーティリティ
pub mod common;

// エンティティの基本インターフェース（trait）定義
pub mod traits;

// 各モデルの実装
pub mod aircraft;
pub mod coverage;
pub mod agent;
pub mod projectile;
pub mod target;
pub mod cost_metric;
pub mod team;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use aircraft::{Aircraft, AircraftArchetype, ForceBreakdown, InitialState, Orientation};
pub use coverage::CoverageMap;
pub use agent::{Agent, AgentSnapshot, SteeringAction, SteeringSpec};
pub use projectile::{Projectile, ProjectileSpec};
pub use target::{place_targets, Target, TargetSpec};
pub use cost_metric::{CostMetricKind, EnergyCost, StraightLineDistance, TwoHopPathDistance};
pub use team::{spawn_layout, AgentTemplate, Team, TeamError};
