//! # Assignment モジュール
//!
//! エージェントとターゲットの最小コスト二部マッチング（ハンガリアン法 /
//! Kuhn-Munkres法、O(n³)）を提供します。
//!
//! 入力は エージェント数 × ターゲット数 のコスト行列で、行数と列数は
//! 一致している必要はありません。
//!
//! - ターゲット数 ≥ エージェント数: 全エージェントに1つずつ割り当て
//! - ターゲット数 < エージェント数: 全ターゲットに1体ずつ割り当て
//!
//! 計算は `pathfinding` の `kuhn_munkres_min` で行い、コストは固定小数点に丸めてから渡します。
//! 同一の行列に対しては常に同じ結果を返します（決定的）。

use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;
use thiserror::Error;

/// コストの固定小数点化の倍率（1e-6 単位）
const COST_SCALE: f64 = 1.0e6;

/// 固定小数点化したコストの総和の上限
const MAX_FIXED_POINT_TOTAL: f64 = 1.0e15;

/// 割り当て計算のエラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssignmentError {
    #[error("コスト行列に有限でない値があります: agent={agent}, target={target}")]
    NonFiniteCost { agent: usize, target: usize },
    #[error("コスト行列の行 {row} の長さが不正です: 期待値 {expected}, 実際 {found}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// 最小コストの割り当てを計算
///
/// # 引数
///
/// * `cost` - エージェント × ターゲット のコスト行列
///
/// # 戻り値
///
/// (agent_index, target_index) の組のリスト（agent_index 昇順）。
/// 行列が空、またはターゲット数が0の場合は空のリスト。
pub fn solve(cost: &[Vec<f64>]) -> Result<Vec<(usize, usize)>, AssignmentError> {
    let rows = cost.len();
    if rows == 0 {
        return Ok(Vec::new());
    }
    let cols = cost[0].len();

    for (i, row) in cost.iter().enumerate() {
        if row.len() != cols {
            return Err(AssignmentError::RaggedMatrix {
                row: i,
                expected: cols,
                found: row.len(),
            });
        }
        if let Some(j) = row.iter().position(|c| !c.is_finite()) {
            return Err(AssignmentError::NonFiniteCost { agent: i, target: j });
        }
    }

    if cols == 0 {
        return Ok(Vec::new());
    }

    // kuhn_munkres は 行数 ≤ 列数 を要求するため、行 > 列 の場合は転置して解く
    let transposed = rows > cols;
    let (n, m) = if transposed { (cols, rows) } else { (rows, cols) };
    let at = |i: usize, j: usize| if transposed { cost[j][i] } else { cost[i][j] };

    let scale = fixed_point_scale(cost);
    let weights = Matrix::from_fn(n, m, |(i, j)| (at(i, j) * scale).round() as i64);
    let (_, columns) = kuhn_munkres_min(&weights);

    let mut pairs: Vec<(usize, usize)> = columns
        .into_iter()
        .enumerate()
        .map(|(i, j)| if transposed { (j, i) } else { (i, j) })
        .collect();

    pairs.sort_unstable();
    Ok(pairs)
}

/// 割り当ての総コスト
pub fn total_cost(cost: &[Vec<f64>], pairs: &[(usize, usize)]) -> f64 {
    pairs.iter().map(|&(i, j)| cost[i][j]).sum()
}

/// コストを整数に変換する倍率
///
/// 通常は 1e-6 単位で丸めます。コストが大きい場合は総和が `i64` に
/// 収まるよう倍率を下げます。
fn fixed_point_scale(cost: &[Vec<f64>]) -> f64 {
    let max_abs = cost
        .iter()
        .flatten()
        .fold(0.0_f64, |acc, c| acc.max(c.abs()));
    let cells = (cost.len() * cost.first().map_or(0, Vec::len)).max(1) as f64;
    let limit = MAX_FIXED_POINT_TOTAL / cells;
    if max_abs * COST_SCALE > limit {
        limit / max_abs
    } else {
        COST_SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// 全探索による最小コスト（小さい行列用）
    fn brute_force_min(cost: &[Vec<f64>]) -> f64 {
        let rows = cost.len();
        let cols = cost[0].len();
        let k = rows.min(cols);

        fn recurse(
            cost: &[Vec<f64>],
            row: usize,
            used_cols: &mut Vec<bool>,
            picked: usize,
            k: usize,
            acc: f64,
            best: &mut f64,
        ) {
            if picked == k {
                *best = best.min(acc);
                return;
            }
            if row == cost.len() {
                return;
            }
            // 行数 > 列数 の場合は行を飛ばす選択肢もある
            if cost.len() - row > k - picked {
                recurse(cost, row + 1, used_cols, picked, k, acc, best);
            }
            for j in 0..used_cols.len() {
                if !used_cols[j] {
                    used_cols[j] = true;
                    recurse(
                        cost,
                        row + 1,
                        used_cols,
                        picked + 1,
                        k,
                        acc + cost[row][j],
                        best,
                    );
                    used_cols[j] = false;
                }
            }
        }

        let mut best = f64::INFINITY;
        let mut used_cols = vec![false; cols];
        recurse(cost, 0, &mut used_cols, 0, k, 0.0, &mut best);
        best
    }

    #[test]
    fn test_two_by_two_prefers_diagonal() {
        let cost = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        let pairs = solve(&cost).unwrap();
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
        assert_eq!(total_cost(&cost, &pairs), 2.0);
    }

    #[test]
    fn test_anti_diagonal() {
        let cost = vec![vec![5.0, 1.0], vec![1.0, 5.0]];
        assert_eq!(solve(&cost).unwrap(), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(solve(&[]).unwrap().is_empty());
        let no_targets = vec![Vec::new(), Vec::new()];
        assert!(solve(&no_targets).unwrap().is_empty());
    }

    #[test]
    fn test_more_targets_than_agents() {
        let cost = vec![vec![9.0, 3.0, 7.0, 1.0], vec![2.0, 8.0, 6.0, 1.5]];
        let pairs = solve(&cost).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs, vec![(0, 3), (1, 0)]);
    }

    #[test]
    fn test_more_agents_than_targets() {
        let cost = vec![vec![4.0], vec![1.0], vec![3.0]];
        let pairs = solve(&cost).unwrap();
        assert_eq!(pairs, vec![(1, 0)]);
    }

    #[test]
    fn test_rejects_non_finite() {
        let cost = vec![vec![1.0, f64::NAN], vec![0.0, 1.0]];
        assert_eq!(
            solve(&cost),
            Err(AssignmentError::NonFiniteCost { agent: 0, target: 1 })
        );
        let cost = vec![vec![1.0, 2.0], vec![f64::INFINITY, 1.0]];
        assert!(matches!(
            solve(&cost),
            Err(AssignmentError::NonFiniteCost { agent: 1, target: 0 })
        ));
    }

    #[test]
    fn test_rejects_ragged() {
        let cost = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            solve(&cost),
            Err(AssignmentError::RaggedMatrix { row: 1, expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_optimal_against_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let rows = rng.gen_range(1..=5);
            let cols = rng.gen_range(1..=5);
            let cost: Vec<Vec<f64>> = (0..rows)
                .map(|_| (0..cols).map(|_| rng.gen_range(0.0..100.0)).collect())
                .collect();

            let pairs = solve(&cost).unwrap();
            assert_eq!(pairs.len(), rows.min(cols));

            let mut seen_rows = vec![false; rows];
            let mut seen_cols = vec![false; cols];
            for &(i, j) in &pairs {
                assert!(!seen_rows[i] && !seen_cols[j], "duplicate in {pairs:?}");
                seen_rows[i] = true;
                seen_cols[j] = true;
            }

            let got = total_cost(&cost, &pairs);
            let best = brute_force_min(&cost);
            assert!((got - best).abs() < 1e-4, "got {got}, best {best}, cost {cost:?}");
        }
    }

    #[test]
    fn test_deterministic_for_ties() {
        let cost = vec![vec![1.0; 3]; 3];
        let first = solve(&cost).unwrap();
        for _ in 0..10 {
            assert_eq!(solve(&cost).unwrap(), first);
        }
    }
}
