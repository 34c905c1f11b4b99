use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::common::{BoundingBox, Vec2, WorldGeometry};

/// ターゲット配置の設定
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// チームごとのターゲット数
    pub count: usize,
    /// ターゲットの一辺（px）
    pub size: f64,
    /// 画面上端からの最小距離（px）
    pub top_margin: f64,
    /// 1ターゲットあたりの配置試行回数の上限
    pub max_placement_attempts: u32,
}

/// ターゲット
///
/// 地面より上の帯状領域に固定配置される2次元座標です。
/// 被弾すると除去されます。
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: String,
    /// 中心座標
    pub position: Vec2,
    pub size: f64,
}

impl Target {
    pub fn new(id: String, position: Vec2, size: f64) -> Self {
        Self { id, position, size }
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::centered(self.position, Vec2::splat(self.size))
    }
}

/// 既存ターゲットと重ならないように `spec.count` 個のターゲットを配置
///
/// x は [size, width - size]、y は [top_margin, ground_elevation - size] の一様乱数です。
/// 重なった候補は棄却して引き直します。
///
/// # 戻り値
///
/// 配置されたターゲット。試行回数の上限に達した場合は配置できた数を Err で返します。
pub fn place_targets<R: Rng>(
    rng: &mut R,
    world: &WorldGeometry,
    spec: &TargetSpec,
    id_prefix: &str,
    existing: &[Target],
) -> Result<Vec<Target>, usize> {
    let mut placed: Vec<Target> = Vec::with_capacity(spec.count);
    let x_range = spec.size..=(world.width - spec.size);
    let y_range = spec.top_margin..=(world.ground_elevation - spec.size);

    for n in 0..spec.count {
        let mut accepted = None;
        for _ in 0..spec.max_placement_attempts {
            let candidate = Target::new(
                format!("{}_T{:03}", id_prefix, n + 1),
                Vec2::new(
                    rng.gen_range(x_range.clone()),
                    rng.gen_range(y_range.clone()),
                ),
                spec.size,
            );
            let bounds = candidate.bounds();
            let overlaps = existing
                .iter()
                .chain(placed.iter())
                .any(|t| t.bounds().overlaps(&bounds));
            if !overlaps {
                accepted = Some(candidate);
                break;
            }
        }

        match accepted {
            Some(target) => {
                debug!(
                    target_id = %target.id,
                    x = target.position.x,
                    y = target.position.y,
                    "TARGET_PLACED: ターゲットを配置しました"
                );
                placed.push(target);
            }
            None => {
                warn!(
                    placed = placed.len(),
                    requested = spec.count,
                    "TARGET_PLACEMENT_EXHAUSTED: 配置試行回数の上限に達しました"
                );
                return Err(placed.len());
            }
        }
    }

    Ok(placed)
}
